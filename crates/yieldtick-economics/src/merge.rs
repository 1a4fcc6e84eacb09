//! # Accrual & Merge Math
//!
//! Max-wins merging of running totals. A merge never yields less than any
//! candidate it was given, and a NaN candidate is ignored rather than
//! propagated.

/// Larger of two candidate totals, ignoring non-finite and negative values
pub fn merge_earnings(local: f64, remote: f64) -> f64 {
    sanitize(local).max(sanitize(remote))
}

/// Advance `current` by `rate × elapsed_secs`
///
/// A negative or non-finite rate or interval adds nothing, so the result is
/// never below `current`.
pub fn accrue(current: f64, rate: f64, elapsed_secs: f64) -> f64 {
    let delta = sanitize(rate) * sanitize(elapsed_secs);
    if delta.is_finite() {
        sanitize(current) + delta
    } else {
        sanitize(current)
    }
}

/// Session-start merge: best known total plus what accrued since the server's last update
pub fn merge_accrued(local: f64, remote: f64, rate: f64, elapsed_secs: f64) -> f64 {
    accrue(merge_earnings(local, remote), rate, elapsed_secs)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
