//! Partitioning of a metric's value range into named buckets.

use crate::color::sequential::SequentialScheme;
use crate::error::MosaicScaleError;
use mosaic_common::form_data::DEFAULT_NUM_BUCKETS;
use mosaic_common::types::Rgba;

/// Separator between the bounds of a bucket key, e.g. `"0.0 - 2.5"`
pub const RANGE_DELIMITER: &str = " - ";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricBucket {
    pub key: String,
    pub lower: f64,
    pub upper: f64,
    pub color: Rgba,
}

/// Compute the break points that delimit buckets.
///
/// Explicit break points are sorted numerically and returned verbatim. Otherwise the extent of
/// `values` is cut into `num_buckets` equal-width intervals, each bound rendered with just enough
/// decimals to tell neighbouring bounds apart. One more break point is appended when rounding
/// would otherwise drop the maximum from the last bucket.
pub fn break_points(
    explicit: &[String],
    num_buckets: Option<usize>,
    values: &[f64],
) -> Result<Vec<String>, MosaicScaleError> {
    if !explicit.is_empty() {
        let mut parsed = explicit
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<f64>()
                    .map(|v| (v, s.clone()))
                    .map_err(|_| MosaicScaleError::NonNumericBreakPoint(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_by(|a, b| a.0.total_cmp(&b.0));
        return Ok(parsed.into_iter().map(|(_, s)| s).collect());
    }

    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        return Ok(vec![]);
    }

    let n = num_buckets.unwrap_or(DEFAULT_NUM_BUCKETS).max(1);
    let delta = (max - min) / n as f64;
    let precision = if delta == 0.0 {
        0
    } else {
        (1.0 / delta).log10().ceil().max(0.0) as usize
    };
    let rounded_max = format!("{max:.precision$}").parse::<f64>().unwrap_or(max);
    let extra = usize::from(max > rounded_max);

    Ok((0..n + 1 + extra)
        .map(|i| format!("{:.precision$}", min + i as f64 * delta))
        .collect())
}

/// Turn consecutive break points into colored buckets.
///
/// Bucket `i` of `n` takes the scheme color at `i / (n - 1)`, with alpha set from `opacity`
/// given in percent.
pub fn metric_buckets(
    break_points: &[String],
    scheme: &SequentialScheme,
    opacity: f32,
) -> Result<Vec<MetricBucket>, MosaicScaleError> {
    let bounds = break_points
        .iter()
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| MosaicScaleError::NonNumericBreakPoint(s.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let n = bounds.len().saturating_sub(1);
    let alpha = ((opacity / 100.0).clamp(0.0, 1.0) * 255.0).round() as u8;

    Ok((0..n)
        .map(|i| {
            let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let mut color = scheme.interpolate(t);
            color[3] = alpha;
            MetricBucket {
                key: format!(
                    "{}{}{}",
                    break_points[i], RANGE_DELIMITER, break_points[i + 1]
                ),
                lower: bounds[i],
                upper: bounds[i + 1],
                color,
            }
        })
        .collect())
}
