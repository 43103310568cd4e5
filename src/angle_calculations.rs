use crate::constants::{
    MAX_RANGE_RESOLUTION_DEG, MIN_DEPARTURE_ANGLE_DEG, RANGE_MATCH_MAX_ITER,
    RANGE_MATCH_MIN_BRACKET_RAD,
};
use crate::error::{BallisticsError, Result};
use crate::trajectory_solver::ShotResult;
use serde::Serialize;
use tracing::{debug, info, warn};

const RIGHT_ANGLE_RAD: f64 = std::f64::consts::FRAC_PI_2;

/// Result of the maximum range search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaxRangeOutcome {
    pub range: f64,        // m
    pub angle: f64,        // radians
    pub iterations: usize, // shots fired
}

/// Result of matching a target range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeMatchOutcome {
    pub time: f64,          // s
    pub range: f64,         // m
    pub velocity: f64,      // m/s
    pub impact_angle: f64,  // radians
    pub angle: f64,         // departure angle, radians
    pub iterations: usize,
    /// False when the search stopped on a narrow bracket without landing within tolerance
    pub converged: bool,
}

impl RangeMatchOutcome {
    fn from_shot(shot: &ShotResult, iterations: usize, converged: bool) -> Self {
        Self {
            time: shot.time,
            range: shot.range,
            velocity: shot.velocity,
            impact_angle: shot.impact_angle,
            angle: shot.departure_angle,
            iterations,
            converged,
        }
    }
}

/// Reject tolerances the searches cannot stop on.
pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance > 0.0 {
        Ok(())
    } else {
        Err(BallisticsError::InvalidParameter {
            name: "tolerance",
            reason: format!("{tolerance} must be positive"),
        })
    }
}

/// Find the departure angle giving the longest range.
///
/// Range is assumed to rise to a single peak and fall again between 0° and 90°. The bracket
/// starts at the full quadrant; each iteration fires at a quarter point on the side that gave the
/// shorter range and pulls that side of the bracket in toward the middle. The best shot seen at
/// any point is returned, not just the last one.
pub fn find_max_range<F>(mut shoot: F) -> Result<MaxRangeOutcome>
where
    F: FnMut(f64) -> Result<ShotResult>,
{
    let resolution = MAX_RANGE_RESOLUTION_DEG.to_radians();
    let mut low = 0.0;
    let mut high = RIGHT_ANGLE_RAD;
    let mut mid = (low + high) / 2.0;
    let mut l = (mid + low) / 2.0;
    let mut h = (mid + high) / 2.0;
    let mut range_low = shoot(l)?.range;
    let mut range_high = shoot(h)?.range;
    let mut iterations = 2;

    let (mut best_range, mut best_angle) = if range_low > range_high {
        (range_low, l)
    } else {
        (range_high, h)
    };

    while (high - low).abs() > resolution {
        // Ties move the high side, so a flat curve drifts toward lower angles
        if range_low < range_high {
            low = l;
            l = (mid + low) / 2.0;
            range_low = shoot(l)?.range;
        } else {
            high = h;
            h = (mid + high) / 2.0;
            range_high = shoot(h)?.range;
        }
        iterations += 1;

        if range_low > best_range {
            best_range = range_low;
            best_angle = l;
        }
        if range_high > best_range {
            best_range = range_high;
            best_angle = h;
        }
        mid = (low + high) / 2.0;

        debug!(
            iteration = iterations,
            low_deg = low.to_degrees(),
            high_deg = high.to_degrees(),
            best_range,
            "max range bracket"
        );
    }

    if !(best_range.is_finite() && best_range > 0.0) {
        return Err(BallisticsError::NoMaximumRange { best_range });
    }

    info!(
        range = best_range,
        angle_deg = best_angle.to_degrees(),
        iterations,
        "maximum range found"
    );
    Ok(MaxRangeOutcome { range: best_range, angle: best_angle, iterations })
}

/// Bisect on departure angle until a shot lands within `tolerance / 2` of `target_range`.
///
/// With a maximum range result the search covers 0.1° up to the angle of maximum range and
/// targets beyond the maximum are rejected before any shot is fired. Without one the search runs
/// up to 90°; an unreachable target then drives the angle to vertical and is reported as
/// [`BallisticsError::Unreachable`].
///
/// A target outside the ranges the bracket can reach (shorter than the range at 0.1°, say) ends
/// at the iteration cap on a narrow bracket; the closest shot is returned with `converged` unset.
pub fn match_range<F>(
    target_range: f64,
    tolerance: f64,
    max_range: Option<&MaxRangeOutcome>,
    mut shoot: F,
) -> Result<RangeMatchOutcome>
where
    F: FnMut(f64) -> Result<ShotResult>,
{
    check_tolerance(tolerance)?;
    let mut high = RIGHT_ANGLE_RAD;
    if let Some(max) = max_range {
        if target_range > max.range {
            return Err(BallisticsError::OutsideAchievableRange {
                target: target_range,
                max_range: max.range,
            });
        }
        high = max.angle;
    }
    let mut low = MIN_DEPARTURE_ANGLE_DEG.to_radians();
    let mut mid = high;
    let mut iterations = 0;
    let mut last: Option<ShotResult> = None;

    loop {
        if let Some(shot) = &last {
            if (target_range - shot.range).abs() <= tolerance / 2.0 {
                break;
            }
            if shot.range > target_range {
                high = mid;
            } else if shot.range < target_range {
                low = mid;
            }
        }
        mid = (high + low) / 2.0;
        let shot = shoot(mid)?;
        iterations += 1;

        debug!(
            iteration = iterations,
            angle_deg = mid.to_degrees(),
            range = shot.range,
            target = target_range,
            "range match"
        );
        last = Some(shot);

        if iterations >= RANGE_MATCH_MAX_ITER {
            if (high - low).abs() < RANGE_MATCH_MIN_BRACKET_RAD {
                break;
            }
            return Err(BallisticsError::IterationLimit { iterations });
        }
    }

    // The loop body always fires before it can exit
    let shot = last.ok_or(BallisticsError::IterationLimit { iterations })?;

    if (RIGHT_ANGLE_RAD - mid).abs() < RANGE_MATCH_MIN_BRACKET_RAD && shot.range.abs() < 0.01 {
        return Err(BallisticsError::Unreachable { target: target_range });
    }

    let converged = (target_range - shot.range).abs() <= tolerance / 2.0;
    if converged {
        info!(
            target = target_range,
            range = shot.range,
            angle_deg = mid.to_degrees(),
            iterations,
            "range matched"
        );
    } else {
        warn!(
            target = target_range,
            range = shot.range,
            angle_deg = mid.to_degrees(),
            iterations,
            "range match stopped on a narrow bracket without converging"
        );
    }
    Ok(RangeMatchOutcome::from_shot(&shot, iterations, converged))
}
