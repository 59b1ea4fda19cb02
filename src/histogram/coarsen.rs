use super::{Bucket, Histogram};

/// Reduces a fine histogram to `target_bucket_count` display buckets
/// over the same overall range.
///
/// Each fine bucket's entire count lands in the coarse bucket holding
/// the fine bucket's midpoint; counts are never split, so totals are
/// preserved exactly at the price of a small quantization error.
/// Missing and out-of-range counts pass through unchanged.
///
/// A degenerate overall range (min >= max, e.g. a constant column) or
/// an empty fine bucket list collapses to a single coarse bucket
/// holding the entire count. Otherwise the result has exactly
/// `target_bucket_count` buckets; empty ones are present with count 0
/// so consumers can rely on a fixed-length sequence.
pub fn coarsen(fine: &Histogram, target_bucket_count: usize) -> Histogram {
    let k = target_bucket_count.max(1);
    let in_range: u64 = fine.buckets.iter().map(|b| b.count).sum();
    let (lo, hi) = match (fine.buckets.first(), fine.buckets.last()) {
        (Some(first), Some(last)) => (first.min, last.max),
        _ => (0.0, 0.0),
    };

    if lo >= hi {
        return Histogram {
            buckets: vec![Bucket {
                min: lo,
                max: hi,
                count: in_range,
            }],
            missing_count: fine.missing_count,
            out_of_range_count: fine.out_of_range_count,
        };
    }

    let width = (hi - lo) / k as f64;
    let mut counts = vec![0u64; k];
    for bucket in &fine.buckets {
        let midpoint = 0.5 * (bucket.min + bucket.max);
        // Floor to the containing coarse bucket; a midpoint exactly at
        // the overall maximum stays in the last one.
        let mut index = ((midpoint - lo) / width) as usize;
        if index >= k {
            index = k - 1;
        }
        counts[index] += bucket.count;
    }

    let buckets = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| Bucket {
            min: lo + i as f64 * width,
            max: if i + 1 == k { hi } else { lo + (i + 1) as f64 * width },
            count,
        })
        .collect();

    Histogram {
        buckets,
        missing_count: fine.missing_count,
        out_of_range_count: fine.out_of_range_count,
    }
}

/// Global maximum bucket count across panels that will share one
/// vertical scale. Must be computed over every coarsened panel before
/// any panel is drawn.
pub fn shared_scale_max(histograms: &[Histogram]) -> u64 {
    histograms
        .iter()
        .map(|h| h.max_bucket_count())
        .max()
        .unwrap_or(0)
}
