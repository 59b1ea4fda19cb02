//! Histogram data model shared by the pipeline stages and the
//! coarsening/layout math.

mod coarsen;

pub use coarsen::{coarsen, shared_scale_max};

use serde::{Deserialize, Serialize};

/// One fine or coarse bucket. Buckets of a histogram are contiguous,
/// non-overlapping, and ascending over the overall range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub buckets: Vec<Bucket>,
    #[serde(default)]
    pub missing_count: u64,
    #[serde(default)]
    pub out_of_range_count: u64,
}

impl Histogram {
    /// Bucket counts plus missing plus out-of-range. At most the total
    /// row count; equal to it when nothing was filtered upstream.
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum::<u64>()
            + self.missing_count
            + self.out_of_range_count
    }

    pub fn max_bucket_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Reply payload of the `"range"` method: basic statistics for one
/// column, used to parameterize the histogram request that follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicColStats {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub moment_count: u32,
    #[serde(default)]
    pub moments: Vec<f64>,
    pub row_count: u64,
}

/// Reply payload of the `"histogram"` method in the Trellis case: one
/// histogram per group value, in group order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedHistograms {
    pub groups: Vec<Histogram>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Double,
    String,
    Date,
}

/// Column identity carried forward through pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub kind: ColumnKind,
}

/// The plain-value output of a drag selection: a numeric filter range
/// on one column. The drag state machine itself is UI-only; the core
/// consumes only this value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterRange {
    pub min: f64,
    pub max: f64,
}

impl FilterRange {
    /// Builds an ordered range from two selection pixels via the
    /// numeric inversion contract.
    pub fn from_pixels(
        x0: f64,
        x1: f64,
        pixel_width: f64,
        stats: &BasicColStats,
        kind: ColumnKind,
    ) -> FilterRange {
        let a = invert_pixel(x0, pixel_width, stats, kind);
        let b = invert_pixel(x1, pixel_width, stats, kind);
        FilterRange {
            min: a.min(b),
            max: a.max(b),
        }
    }
}

/// Maps a horizontal pixel offset back to a data value on the column
/// axis. Degenerate scales (min >= max) invert to the minimum; integer
/// columns round to the nearest value.
pub fn invert_pixel(x: f64, pixel_width: f64, stats: &BasicColStats, kind: ColumnKind) -> f64 {
    if stats.max <= stats.min || pixel_width <= 0.0 {
        return stats.min;
    }
    let fraction = (x / pixel_width).clamp(0.0, 1.0);
    let value = stats.min + fraction * (stats.max - stats.min);
    match kind {
        ColumnKind::Integer => value.round(),
        _ => value,
    }
}
