//! Exponential retry backoff (§4.7.5): `(2^(retryCount+1) - 1) * scale`.
//! Geometric sum of the per-attempt wait times `scale * 2^i` for `i` in
//! `0..=retryCount`.
use chrono::Duration;

#[must_use]
pub fn backoff_seconds(retry_count: u32, scale: f64) -> f64 {
    let pow = 2f64.powi(i32::try_from(retry_count + 1).unwrap_or(i32::MAX));
    (pow - 1.0) * scale
}

#[must_use]
pub fn backoff_duration(retry_count: u32, scale: f64) -> Duration {
    Duration::milliseconds((backoff_seconds(retry_count, scale) * 1000.0).round() as i64)
}
