//! Terminal driver: runs one histogram pipeline against a remote
//! dataset and draws the final coarsened result as ASCII bars. Stands
//! in for the browser page during development and smoke testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;

use histoview::config::Config;
use histoview::histogram::{ColumnDescription, ColumnKind};
use histoview::logging::{json_log, log_at, obj, v_num, v_str, Level};
use histoview::pipeline::{
    start_histogram_pipeline, summary_line, Page, PlotKind, PlotSpec, RenderOutput,
};
use histoview::rpc::{Connection, RemoteObjectHandle, RequestHandle, WsDialer};
use histoview::trellis::PanelSize;

const BAR_WIDTH: usize = 50;

struct TermPage {
    area: (f64, f64),
    finished: AtomicBool,
    done: Notify,
}

impl TermPage {
    fn new(width: f64, height: f64) -> Self {
        Self {
            area: (width, height),
            finished: AtomicBool::new(false),
            done: Notify::new(),
        }
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.done.notify_one();
    }

    async fn wait(&self) {
        while !self.finished.load(Ordering::SeqCst) {
            self.done.notified().await;
        }
    }
}

impl Page for TermPage {
    fn stage_started(&self, stage: &str, operation: &RequestHandle) {
        json_log(
            "page",
            obj(&[
                ("event", v_str("stage_started")),
                ("stage", v_str(stage)),
                ("request_id", v_num(operation.request_id() as f64)),
            ]),
        );
    }

    fn set_progress(&self, fraction: f64) {
        json_log("progress", obj(&[("fraction", v_num(fraction))]));
    }

    fn report_error(&self, message: &str) {
        log_at(Level::Error, "page", obj(&[("error", v_str(message))]));
        self.finish();
    }

    fn render(&self, output: RenderOutput) {
        if !output.final_update {
            return;
        }
        draw(&output);
        self.finish();
    }

    fn available_area(&self) -> (f64, f64) {
        self.area
    }
}

fn draw(output: &RenderOutput) {
    println!("{} [{} .. {}]", output.column.name, output.stats.min, output.stats.max);
    if let Some(shape) = &output.shape {
        println!(
            "{} groups in a {}x{} grid, {} buckets each",
            output.panels.len(),
            shape.columns,
            shape.rows,
            shape.bucket_count_per_group
        );
    }
    let scale = output.scale_max.max(1) as f64;
    for (index, panel) in output.panels.iter().enumerate() {
        if output.shape.is_some() {
            println!("-- group {} --", index);
        }
        for bucket in &panel.buckets {
            let bar = ((bucket.count as f64 / scale) * BAR_WIDTH as f64).round() as usize;
            println!(
                "[{:>12.4}, {:>12.4}]  {:>10}  {}",
                bucket.min,
                bucket.max,
                bucket.count,
                "#".repeat(bar)
            );
        }
    }
    println!("{}", summary_line(output));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    json_log(
        "boot",
        obj(&[
            ("server", v_str(&cfg.server_url)),
            ("column", v_str(&cfg.column)),
            ("group_by", v_str(cfg.group_by.as_deref().unwrap_or(""))),
        ]),
    );

    let dialer = WsDialer::new(&cfg.server_url)?;
    let conn = Connection::new(Box::new(dialer));
    let page = Arc::new(TermPage::new(cfg.view_width, cfg.view_height));

    let kind = match &cfg.group_by {
        Some(name) => PlotKind::Trellis {
            group_by: ColumnDescription { name: name.clone(), kind: ColumnKind::String },
        },
        None => PlotKind::Single,
    };
    let mut spec = PlotSpec::new(cfg.column_description(), kind);
    spec.target_buckets = cfg.target_buckets;
    spec.fine_buckets = cfg.fine_buckets;
    spec.sampling_rate = cfg.sampling_rate;
    spec.min_panel = PanelSize { width: cfg.min_panel_width, height: cfg.min_panel_height };

    let table = RemoteObjectHandle { remote_object_id: cfg.table_object_id.clone() };
    let _operation = start_histogram_pipeline(&conn, &table, spec, page.clone());

    page.wait().await;
    Ok(())
}
