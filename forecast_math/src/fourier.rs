//! Fourier terms for periodic seasonality

use std::f64::consts::PI;

/// Length of the yearly cycle in days
pub const YEARLY_PERIOD_DAYS: f64 = 365.25;

/// Fourier features `[sin(2πkt/P), cos(2πkt/P)]` for `k = 1..=order`.
///
/// `t` is measured in days on a fixed epoch so that features are comparable
/// between the training range and future dates.
pub fn fourier_terms(t: f64, period: f64, order: usize) -> Vec<f64> {
    let mut terms = Vec::with_capacity(order * 2);
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * t / period;
        terms.push(angle.sin());
        terms.push(angle.cos());
    }
    terms
}
