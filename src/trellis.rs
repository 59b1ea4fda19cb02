//! Trellis panel layout: tiling a number of small-multiple histogram
//! panels into an available pixel area.

use serde::{Deserialize, Serialize};

/// Narrowest bar worth drawing; panel width divided by this yields the
/// per-group bucket budget.
pub const MIN_BAR_WIDTH: f64 = 15.0;

/// Group-label band above each panel row.
pub const HEADER_HEIGHT: f64 = 15.0;

pub const DEFAULT_MIN_PANEL: PanelSize = PanelSize { width: 40.0, height: 40.0 };

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrellisShape {
    pub columns: usize,
    pub rows: usize,
    pub panel_width: f64,
    pub panel_height: f64,
    pub header_height: f64,
    pub bucket_count_per_group: usize,
}

#[derive(Clone, Copy)]
struct Candidate {
    columns: usize,
    rows: usize,
    panel_width: f64,
    panel_height: f64,
    waste: f64,
    shortfall: f64,
    squareness: f64,
}

impl Candidate {
    fn feasible(&self) -> bool {
        self.shortfall == 0.0
    }

    fn better_than(&self, other: &Candidate) -> bool {
        match (self.feasible(), other.feasible()) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => {
                if (self.waste - other.waste).abs() > 1e-9 {
                    self.waste < other.waste
                } else {
                    self.squareness < other.squareness
                }
            }
            (false, false) => self.shortfall < other.shortfall,
        }
    }
}

/// Chooses a tiling with `columns * rows >= number_of_groups` and every
/// panel at least `min_panel`, minimizing wasted area and preferring
/// near-square panels on ties. When the area cannot admit such a
/// tiling, returns the candidate minimizing the total shortfall below
/// the minimum panel size, with panel dimensions floored at 1.0.
///
/// Pure and idempotent: recomputed in full from the current area on
/// every resize or group-count change, never patched incrementally.
pub fn compute_shape(
    available_width: f64,
    available_height: f64,
    number_of_groups: usize,
    min_panel: PanelSize,
) -> TrellisShape {
    let n = number_of_groups.max(1);
    let candidate_for = |columns: usize| {
        let rows = (n + columns - 1) / columns;
        let panel_width = available_width / columns as f64;
        let panel_height = (available_height - rows as f64 * HEADER_HEIGHT) / rows as f64;
        let shortfall = (min_panel.width - panel_width).max(0.0)
            + (min_panel.height - panel_height).max(0.0);
        let waste = available_width * available_height
            - n as f64 * panel_width * (panel_height + HEADER_HEIGHT);
        let squareness = if panel_width > 0.0 && panel_height > 0.0 {
            (panel_width / panel_height).ln().abs()
        } else {
            f64::INFINITY
        };
        Candidate {
            columns,
            rows,
            panel_width,
            panel_height,
            waste,
            shortfall,
            squareness,
        }
    };

    let mut chosen = candidate_for(1);
    for columns in 2..=n {
        let candidate = candidate_for(columns);
        if candidate.better_than(&chosen) {
            chosen = candidate;
        }
    }

    let panel_width = chosen.panel_width.max(1.0);
    let panel_height = chosen.panel_height.max(1.0);
    TrellisShape {
        columns: chosen.columns,
        rows: chosen.rows,
        panel_width,
        panel_height,
        header_height: HEADER_HEIGHT,
        bucket_count_per_group: ((panel_width / MIN_BAR_WIDTH) as usize).max(1),
    }
}
