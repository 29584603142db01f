//! Geometric-mean aggregation of repeated audit runs.
//!
//! Repeated measurements of the same page are noisy; the geometric mean is
//! robust against the occasional outlier run, which is why it is used here
//! instead of the arithmetic mean.

use crate::models::{MetricSample, TimedMetric};

/// Geometric mean of a sequence of values: `exp(mean(ln(x_i)))`.
///
/// A zero anywhere in the input yields zero, matching `(prod x_i)^(1/n)`.
pub fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    (log_sum / values.len() as f64).exp()
}

/// Aggregates a batch of samples into one geometric-mean sample.
///
/// Each field is aggregated independently across the batch. Returns `None`
/// for an empty batch (a site where every run failed); the caller records
/// the failure itself and skips aggregate persistence.
pub fn aggregate(samples: &[MetricSample]) -> Option<MetricSample> {
    if samples.is_empty() {
        return None;
    }

    let field = |get: fn(&MetricSample) -> f64| -> f64 {
        let values: Vec<f64> = samples.iter().map(get).collect();
        geometric_mean(&values)
    };

    let timed = |get: fn(&MetricSample) -> TimedMetric| -> TimedMetric {
        let millis: Vec<f64> = samples.iter().map(|s| get(s).millis).collect();
        let scores: Vec<f64> = samples.iter().map(|s| get(s).score).collect();
        TimedMetric::new(geometric_mean(&millis), geometric_mean(&scores))
    };

    Some(MetricSample {
        performance_score: field(|s| s.performance_score),
        first_contentful_paint: timed(|s| s.first_contentful_paint),
        first_meaningful_paint: timed(|s| s.first_meaningful_paint),
        speed_index: timed(|s| s.speed_index),
        time_to_interactive: timed(|s| s.time_to_interactive),
        first_cpu_idle: timed(|s| s.first_cpu_idle),
        total_byte_weight: field(|s| s.total_byte_weight),
    })
}
