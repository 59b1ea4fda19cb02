//! Receiver-chained request pipelines.
//!
//! Each stage is one request/receiver pair; the stage's completion
//! callback builds the next stage's request from its accumulated state
//! and invokes it with a freshly created downstream receiver. The
//! canonical chain is filter -> range -> histogram -> render; a fresh
//! column plot enters at the range stage.
//!
//! Every error terminates exactly one pipeline at the stage that
//! detected it. Nothing here retries; re-issuing is a caller decision.

use std::sync::Arc;

use serde::Serialize;

use crate::histogram::{
    coarsen, shared_scale_max, BasicColStats, ColumnDescription, FilterRange, GroupedHistograms,
    Histogram,
};
use crate::rpc::{Connection, Receiver, RemoteObjectHandle, RequestHandle};
use crate::trellis::{compute_shape, PanelSize, TrellisShape, DEFAULT_MIN_PANEL, MIN_BAR_WIDTH};

/// Surfaced when the range stage learns the filtered table has no rows.
pub const NO_DATA_IN_RANGE: &str = "No data in range";

/// The outward face of the UI page hosting one plot. Rendering, layout
/// and widgets live behind it; the pipeline only pushes progress,
/// errors and finished data through.
pub trait Page: Send + Sync {
    /// A stage's request went out; the handle cancels it. The page's
    /// progress indicator typically keeps the latest handle so the user
    /// can abandon the pipeline at its current stage.
    fn stage_started(&self, _stage: &str, _operation: &RequestHandle) {}

    fn set_progress(&self, fraction: f64);

    fn report_error(&self, message: &str);

    fn render(&self, output: RenderOutput);

    /// Pixel area available for the chart proper.
    fn available_area(&self) -> (f64, f64);
}

/// What a terminal stage hands the rendering sink: coarsened panels
/// plus everything needed to draw axes and labels around them.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub column: ColumnDescription,
    pub stats: BasicColStats,
    /// Coarsened histograms, one per panel; a single-panel plot has
    /// exactly one.
    pub panels: Vec<Histogram>,
    /// Tiling for multi-panel plots; `None` for a single panel.
    pub shape: Option<TrellisShape>,
    /// Shared vertical-scale maximum across all panels.
    pub scale_max: u64,
    /// False for live updates from partial data, true once the stream
    /// completed.
    pub final_update: bool,
}

/// View footer, e.g. "12 missing, 48039 points".
pub fn summary_line(output: &RenderOutput) -> String {
    let missing: u64 = output.panels.iter().map(|h| h.missing_count).sum();
    if missing != 0 {
        format!("{} missing, {} points", missing, output.stats.row_count)
    } else {
        format!("{} points", output.stats.row_count)
    }
}

#[derive(Debug, Clone)]
pub enum PlotKind {
    Single,
    Trellis { group_by: ColumnDescription },
}

/// Everything a pipeline carries forward besides remote handles: which
/// column, what display shape, and the resolution to ask the server
/// for.
#[derive(Debug, Clone)]
pub struct PlotSpec {
    pub column: ColumnDescription,
    pub kind: PlotKind,
    /// Display bucket budget for a single panel; 0 derives it from the
    /// page width and the minimum bar width.
    pub target_buckets: usize,
    /// Fine resolution requested from the server.
    pub fine_buckets: u32,
    pub sampling_rate: f64,
    pub min_panel: PanelSize,
}

impl PlotSpec {
    pub fn new(column: ColumnDescription, kind: PlotKind) -> Self {
        Self {
            column,
            kind,
            target_buckets: 0,
            fine_buckets: 400,
            sampling_rate: 1.0,
            min_panel: DEFAULT_MIN_PANEL,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterRangeArgs {
    column_name: String,
    min: f64,
    max: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeArgs {
    column_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistogramArgs {
    column_name: String,
    min: f64,
    max: f64,
    bucket_count: u32,
    sampling_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_by: Option<String>,
}

/// Filters the table down to `range` on the spec's column, then plots
/// the filtered result. One `filterRange` invoke; the rest chains.
pub fn start_filter_pipeline(
    conn: &Arc<Connection>,
    table: &RemoteObjectHandle,
    spec: PlotSpec,
    range: FilterRange,
    page: Arc<dyn Page>,
) -> RequestHandle {
    let args = FilterRangeArgs {
        column_name: spec.column.name.clone(),
        min: range.min,
        max: range.max,
    };
    let request = conn.request(&table.remote_object_id, "filterRange", &args);
    let handle = conn.invoke(
        request,
        FilterReceiver {
            conn: Arc::clone(conn),
            spec,
            page: Arc::clone(&page),
            filtered: None,
        },
    );
    page.stage_started("filter", &handle);
    handle
}

/// Plots the spec's column of an existing table: range stage first,
/// histogram chained from its completion.
pub fn start_histogram_pipeline(
    conn: &Arc<Connection>,
    table: &RemoteObjectHandle,
    spec: PlotSpec,
    page: Arc<dyn Page>,
) -> RequestHandle {
    invoke_range(conn, table.clone(), spec, page)
}

fn invoke_range(
    conn: &Arc<Connection>,
    table: RemoteObjectHandle,
    spec: PlotSpec,
    page: Arc<dyn Page>,
) -> RequestHandle {
    let args = RangeArgs { column_name: spec.column.name.clone() };
    let request = conn.request(&table.remote_object_id, "range", &args);
    let handle = conn.invoke(
        request,
        RangeCollector {
            conn: Arc::clone(conn),
            table,
            spec,
            page: Arc::clone(&page),
            stats: None,
        },
    );
    page.stage_started("range", &handle);
    handle
}

/// Stage 1: `filterRange` produced a handle to a new remote table.
struct FilterReceiver {
    conn: Arc<Connection>,
    spec: PlotSpec,
    page: Arc<dyn Page>,
    filtered: Option<String>,
}

impl Receiver for FilterReceiver {
    type Item = String;

    fn on_progress(&mut self, fraction: f64) {
        self.page.set_progress(fraction);
    }

    fn on_next(&mut self, remote_object_id: String) {
        self.filtered = Some(remote_object_id);
    }

    fn on_completed(self) {
        let Some(remote_object_id) = self.filtered else {
            // Completed without a table id: upstream failed without
            // saying so. Stop here; the stalled progress indicator is
            // the only signal.
            return;
        };
        let table = RemoteObjectHandle { remote_object_id };
        invoke_range(&self.conn, table, self.spec, self.page);
    }

    fn on_error(self, message: String) {
        self.page.report_error(&message);
    }
}

/// Stage 2: column statistics, then the histogram request they
/// parameterize.
struct RangeCollector {
    conn: Arc<Connection>,
    table: RemoteObjectHandle,
    spec: PlotSpec,
    page: Arc<dyn Page>,
    stats: Option<BasicColStats>,
}

impl Receiver for RangeCollector {
    type Item = BasicColStats;

    fn on_progress(&mut self, fraction: f64) {
        self.page.set_progress(fraction);
    }

    fn on_next(&mut self, stats: BasicColStats) {
        self.stats = Some(stats);
    }

    fn on_completed(self) {
        let Some(stats) = self.stats else {
            return;
        };
        if stats.row_count == 0 {
            self.page.report_error(NO_DATA_IN_RANGE);
            return;
        }
        let group_by = match &self.spec.kind {
            PlotKind::Trellis { group_by } => Some(group_by.name.clone()),
            PlotKind::Single => None,
        };
        let args = HistogramArgs {
            column_name: self.spec.column.name.clone(),
            min: stats.min,
            max: stats.max,
            bucket_count: self.spec.fine_buckets,
            sampling_rate: self.spec.sampling_rate,
            group_by,
        };
        let request = self.conn.request(&self.table.remote_object_id, "histogram", &args);
        let trellis = matches!(self.spec.kind, PlotKind::Trellis { .. });
        let handle = if trellis {
            self.conn.invoke(
                request,
                TrellisHistogramRenderer {
                    spec: self.spec,
                    page: Arc::clone(&self.page),
                    stats,
                    latest: None,
                },
            )
        } else {
            self.conn.invoke(
                request,
                HistogramRenderer {
                    spec: self.spec,
                    page: Arc::clone(&self.page),
                    stats,
                    latest: None,
                },
            )
        };
        self.page.stage_started("histogram", &handle);
    }

    fn on_error(self, message: String) {
        self.page.report_error(&message);
    }
}

/// Terminal stage, single panel: coarsen and render every partial
/// histogram as it streams in, then mark the last one final.
struct HistogramRenderer {
    spec: PlotSpec,
    page: Arc<dyn Page>,
    stats: BasicColStats,
    latest: Option<Histogram>,
}

impl HistogramRenderer {
    fn display_bucket_count(&self) -> usize {
        if self.spec.target_buckets > 0 {
            self.spec.target_buckets
        } else {
            let (width, _) = self.page.available_area();
            ((width / MIN_BAR_WIDTH) as usize).max(1)
        }
    }

    fn push(&self, coarse: &Histogram, final_update: bool) {
        self.page.render(RenderOutput {
            column: self.spec.column.clone(),
            stats: self.stats.clone(),
            scale_max: coarse.max_bucket_count(),
            panels: vec![coarse.clone()],
            shape: None,
            final_update,
        });
    }
}

impl Receiver for HistogramRenderer {
    type Item = Histogram;

    fn on_progress(&mut self, fraction: f64) {
        self.page.set_progress(fraction);
    }

    fn on_next(&mut self, fine: Histogram) {
        let coarse = coarsen(&fine, self.display_bucket_count());
        self.push(&coarse, false);
        self.latest = Some(coarse);
    }

    fn on_completed(self) {
        let Some(coarse) = self.latest.as_ref() else {
            return;
        };
        self.push(coarse, true);
    }

    fn on_error(self, message: String) {
        self.page.report_error(&message);
    }
}

/// Terminal stage, Trellis: shape from the current page area, every
/// group coarsened to the per-group budget, shared scale computed over
/// all panels before any is drawn.
struct TrellisHistogramRenderer {
    spec: PlotSpec,
    page: Arc<dyn Page>,
    stats: BasicColStats,
    latest: Option<GroupedHistograms>,
}

impl TrellisHistogramRenderer {
    fn push(&self, data: &GroupedHistograms, final_update: bool) {
        let (width, height) = self.page.available_area();
        let shape = compute_shape(width, height, data.groups.len(), self.spec.min_panel);
        let panels: Vec<Histogram> = data
            .groups
            .iter()
            .map(|group| coarsen(group, shape.bucket_count_per_group))
            .collect();
        let scale_max = shared_scale_max(&panels);
        self.page.render(RenderOutput {
            column: self.spec.column.clone(),
            stats: self.stats.clone(),
            panels,
            shape: Some(shape),
            scale_max,
            final_update,
        });
    }
}

impl Receiver for TrellisHistogramRenderer {
    type Item = GroupedHistograms;

    fn on_progress(&mut self, fraction: f64) {
        self.page.set_progress(fraction);
    }

    fn on_next(&mut self, data: GroupedHistograms) {
        self.push(&data, false);
        self.latest = Some(data);
    }

    fn on_completed(self) {
        let Some(data) = self.latest.as_ref() else {
            return;
        };
        self.push(data, true);
    }

    fn on_error(self, message: String) {
        self.page.report_error(&message);
    }
}
