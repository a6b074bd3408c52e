//! Crossover detection on lagged views.

use super::IndicatorView;

/// True if `a` crossed above `b` on the current bar:
/// `a[-2] < b[-2] && a[-1] > b[-1]`.
///
/// Any undefined value in the last two positions means no crossover.
pub fn crossover(a: &IndicatorView<'_>, b: &IndicatorView<'_>) -> bool {
    match (a.ago(1), b.ago(1), a.ago(0), b.ago(0)) {
        (Some(a_prev), Some(b_prev), Some(a_now), Some(b_now)) => {
            a_prev < b_prev && a_now > b_now
        }
        _ => false,
    }
}
