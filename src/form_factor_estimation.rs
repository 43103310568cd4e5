//! Fitting a form factor to an observed shot.
//!
//! Range falls roughly in inverse proportion to the form factor, so the search rescales the
//! current estimate by the ratio of simulated to observed range until the two agree.

use crate::angle_calculations::check_tolerance;
use crate::constants::{FORM_FACTOR_MAX_ITER, MIN_FORM_FACTOR};
use crate::error::{BallisticsError, Result};
use crate::trajectory_solver::ShotResult;
use serde::Serialize;
use tracing::{debug, info};

/// Form factor reproducing an observed (angle, range) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormFactorOutcome {
    pub form_factor: f64,
    pub angle: f64, // radians
    pub range: f64, // simulated range with the fitted form factor (m)
    pub iterations: usize,
}

/// Find the form factor for which a shot at `angle_rad` lands within `tolerance / 2` of
/// `target_range`.
///
/// `shoot` fires with the given form factor. Starts from 1.0; an estimate shrinking below
/// 1e-6 means the observed range cannot be reproduced and is reported as
/// [`BallisticsError::FormFactorCollapsed`]. More than 100 shots without landing within
/// tolerance is reported as [`BallisticsError::IterationLimit`].
pub fn match_form_factor<F>(
    angle_rad: f64,
    target_range: f64,
    tolerance: f64,
    mut shoot: F,
) -> Result<FormFactorOutcome>
where
    F: FnMut(f64) -> Result<ShotResult>,
{
    check_tolerance(tolerance)?;
    if !(target_range.is_finite() && target_range > 0.0) {
        return Err(BallisticsError::InvalidParameter {
            name: "range",
            reason: format!("{target_range} must be positive"),
        });
    }

    let mut form_factor = 1.0;
    let mut range = shoot(form_factor)?.range;
    let mut iterations = 1;

    while (target_range - range).abs() > tolerance / 2.0 && form_factor > MIN_FORM_FACTOR {
        form_factor *= range / target_range;
        range = shoot(form_factor)?.range;
        iterations += 1;
        debug!(iteration = iterations, form_factor, range, target = target_range, "form factor");

        if iterations >= FORM_FACTOR_MAX_ITER && (target_range - range).abs() > tolerance / 2.0 {
            return Err(BallisticsError::IterationLimit { iterations });
        }
    }

    if !(form_factor > MIN_FORM_FACTOR) {
        return Err(BallisticsError::FormFactorCollapsed { form_factor, iterations });
    }

    info!(
        form_factor,
        angle_deg = angle_rad.to_degrees(),
        range,
        iterations,
        "form factor matched"
    );
    Ok(FormFactorOutcome { form_factor, angle: angle_rad, range, iterations })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(range: f64) -> Result<ShotResult> {
        Ok(ShotResult {
            departure_angle: 0.5,
            time: 60.0,
            range,
            velocity: 400.0,
            impact_angle: -0.7,
        })
    }

    #[test]
    fn test_inverse_proportional_range_converges_in_one_step() {
        let outcome = match_form_factor(0.5, 20000.0 / 1.25, 1.0, |ff| shot(20000.0 / ff)).unwrap();
        assert!((outcome.form_factor - 1.25).abs() < 1e-9);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.angle, 0.5);
    }

    #[test]
    fn test_weaker_dependence_converges() {
        let target = 20000.0 / 0.8f64.sqrt();
        let outcome = match_form_factor(0.5, target, 1.0, |ff| shot(20000.0 / ff.sqrt())).unwrap();
        assert!((outcome.range - target).abs() <= 0.5);
        assert!((outcome.form_factor - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_already_matching_fires_once() {
        let outcome = match_form_factor(0.5, 15000.0, 1.0, |ff| shot(15000.0 / ff)).unwrap();
        assert_eq!(outcome.form_factor, 1.0);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_collapse_is_reported() {
        // Range grows with the form factor, so every correction overshoots downward
        let result = match_form_factor(0.5, 2000.0, 1.0, |ff| shot(1000.0 * ff));
        assert!(matches!(result, Err(BallisticsError::FormFactorCollapsed { .. })), "{result:?}");
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        for tolerance in [0.0, -1.0, f64::NAN] {
            let result = match_form_factor(0.5, 1000.0, tolerance, |ff| shot(20000.0 / ff));
            assert!(
                matches!(result, Err(BallisticsError::InvalidParameter { name: "tolerance", .. })),
                "{tolerance}: {result:?}"
            );
        }
    }

    #[test]
    fn test_stalled_search_hits_iteration_limit() {
        // Range barely responds to the form factor, so each correction moves it very little
        let mut calls = 0;
        let result = match_form_factor(0.5, 10000.0, 1.0, |ff| {
            calls += 1;
            shot(9000.0 + ff.ln())
        });
        assert!(matches!(result, Err(BallisticsError::IterationLimit { iterations: 100 })), "{result:?}");
        assert_eq!(calls, 100);
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let result = match_form_factor(0.5, 0.0, 1.0, |ff| shot(1000.0 / ff));
        assert!(matches!(result, Err(BallisticsError::InvalidParameter { name: "range", .. })));
    }
}
