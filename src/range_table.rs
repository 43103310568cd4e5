//! Range tables: a run of shots stepped either by target range or by departure angle.
//!
//! Rows are independent once the maximum range is known, so both tables fire their shots on the
//! rayon pool and then put the rows back in order.

use crate::angle_calculations::{MaxRangeOutcome, RangeMatchOutcome};
use crate::error::{BallisticsError, Result};
use crate::projectile::ProjectileProfile;
use crate::trajectory_solver::ShotResult;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

const RIGHT_ANGLE_RAD: f64 = std::f64::consts::FRAC_PI_2;
const ANGLE_END_SLACK_RAD: f64 = 1e-9;

/// One line of a range table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeTableRow {
    pub range: f64,           // m
    pub departure_angle: f64, // radians
    pub impact_angle: f64,    // angle of fall, radians
    pub time: f64,            // time of flight (s)
    pub velocity: f64,        // striking velocity (m/s)
}

impl From<RangeMatchOutcome> for RangeTableRow {
    fn from(m: RangeMatchOutcome) -> Self {
        Self {
            range: m.range,
            departure_angle: m.angle,
            impact_angle: m.impact_angle,
            time: m.time,
            velocity: m.velocity,
        }
    }
}

impl From<ShotResult> for RangeTableRow {
    fn from(s: ShotResult) -> Self {
        Self {
            range: s.range,
            departure_angle: s.departure_angle,
            impact_angle: s.impact_angle,
            time: s.time,
            velocity: s.velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeTableStep {
    Range,
    Angle,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeTable {
    pub step: RangeTableStep,
    /// Metres for a range step, radians for an angle step
    pub increment: f64,
    pub max_range: MaxRangeOutcome,
    pub rows: Vec<RangeTableRow>,
    /// Targets that were skipped, with the reason
    pub notes: Vec<String>,
}

/// Match every target range from `start` to `end` in steps of `increment`.
///
/// Targets that fail to converge are skipped with a note. The table ends at the last target
/// inside the maximum range.
pub fn range_table_by_range(
    profile: &ProjectileProfile,
    start: f64,
    end: f64,
    increment: f64,
    tolerance: f64,
) -> Result<RangeTable> {
    check_steps(start, end, increment)?;
    let max = profile.max_range()?;

    let targets: Vec<f64> = (0..)
        .map(|i| start + i as f64 * increment)
        .take_while(|&target| target <= end && target <= max.range)
        .collect();
    if end > max.range {
        info!(end, max_range = max.range, "range table stops at maximum range");
    }

    let matched: Vec<(f64, Result<RangeMatchOutcome>)> = targets
        .par_iter()
        .map(|&target| (target, profile.match_range(target, tolerance, Some(&max))))
        .collect();

    let mut rows = Vec::with_capacity(matched.len());
    let mut notes = Vec::new();
    for (target, result) in matched {
        match result {
            Ok(outcome) if outcome.converged => rows.push(outcome.into()),
            Ok(outcome) => {
                warn!(target, closest = outcome.range, "skipping unconverged range table entry");
                notes.push(format!("{target:.1}m: closest range was {:.1}m", outcome.range));
            }
            Err(e) if e.is_convergence_failure() => {
                warn!(target, error = %e, "skipping range table entry");
                notes.push(format!("{target:.1}m: {e}"));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(RangeTable { step: RangeTableStep::Range, increment, max_range: max, rows, notes })
}

/// Fire one shot at every departure angle from `start_rad` to `end_rad` in steps of
/// `increment_rad`, stopping short of vertical.
pub fn range_table_by_angle(
    profile: &ProjectileProfile,
    start_rad: f64,
    end_rad: f64,
    increment_rad: f64,
) -> Result<RangeTable> {
    check_steps(start_rad, end_rad, increment_rad)?;
    let max = profile.max_range()?;

    let angles: Vec<f64> = (0..)
        .map(|i| start_rad + i as f64 * increment_rad)
        .take_while(|&angle| angle <= end_rad + ANGLE_END_SLACK_RAD && angle < RIGHT_ANGLE_RAD)
        .collect();

    let rows = angles
        .par_iter()
        .map(|&angle| profile.one_shot(angle).map(RangeTableRow::from))
        .collect::<Result<Vec<_>>>()?;

    Ok(RangeTable {
        step: RangeTableStep::Angle,
        increment: increment_rad,
        max_range: max,
        rows,
        notes: Vec::new(),
    })
}

fn check_steps(start: f64, end: f64, increment: f64) -> Result<()> {
    if !(increment.is_finite() && increment > 0.0) {
        return Err(BallisticsError::InvalidParameter {
            name: "increment",
            reason: format!("{increment} must be positive"),
        });
    }
    if !(start.is_finite() && end.is_finite()) {
        return Err(BallisticsError::InvalidParameter {
            name: "start",
            reason: format!("table bounds {start}..{end} must be finite"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::DragTable;
    use crate::form_factor::FormFactorTable;
    use std::sync::Arc;

    fn profile() -> ProjectileProfile {
        let drag = DragTable::new(vec![0.0, 0.8, 1.0, 1.2, 2.0, 3.0], vec![0.10, 0.11, 0.16, 0.18, 0.14, 0.12])
            .unwrap();
        let mut p = ProjectileProfile::new(
            20.0,
            105.0,
            300.0,
            Arc::new(drag),
            FormFactorTable::constant(45f64.to_radians(), 1.0),
        )
        .unwrap();
        p.time_step = 0.05;
        p
    }

    #[test]
    fn test_angle_table_is_inclusive_and_ordered() {
        let p = profile();
        let table =
            range_table_by_angle(&p, 5f64.to_radians(), 25f64.to_radians(), 5f64.to_radians()).unwrap();
        assert_eq!(table.step, RangeTableStep::Angle);
        assert_eq!(table.rows.len(), 5);
        for pair in table.rows.windows(2) {
            assert!(pair[1].departure_angle > pair[0].departure_angle);
            assert!(pair[1].range > pair[0].range);
        }
        let last = table.rows[4];
        assert!((last.departure_angle.to_degrees() - 25.0).abs() < 1e-9);
        assert_eq!(last, p.one_shot(last.departure_angle).unwrap().into());
    }

    #[test]
    fn test_angle_table_stops_below_vertical() {
        let p = profile();
        let table =
            range_table_by_angle(&p, 82f64.to_radians(), 120f64.to_radians(), 5f64.to_radians()).unwrap();
        assert!(table.rows.iter().all(|r| r.departure_angle < RIGHT_ANGLE_RAD));
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_range_table_rows_match_targets() {
        let p = profile();
        let table = range_table_by_range(&p, 1000.0, 4000.0, 1000.0, 1.0).unwrap();
        assert_eq!(table.step, RangeTableStep::Range);
        assert_eq!(table.rows.len(), 4);
        for (row, target) in table.rows.iter().zip([1000.0, 2000.0, 3000.0, 4000.0]) {
            assert!((row.range - target).abs() <= 0.5, "{} vs {target}", row.range);
            assert!(row.departure_angle <= table.max_range.angle);
        }
        assert!(table.notes.is_empty());
    }

    #[test]
    fn test_range_table_ends_at_max_range() {
        let p = profile();
        let table = range_table_by_range(&p, 1000.0, 1.0e6, 1000.0, 1.0).unwrap();
        let max = table.max_range.range;
        assert!(!table.rows.is_empty());
        assert!(table.rows.iter().all(|r| r.range <= max + 0.5));
        assert!(table.rows.len() + table.notes.len() == (max / 1000.0).floor() as usize);
    }

    #[test]
    fn test_range_table_notes_targets_below_minimum_range() {
        let p = profile();
        let shortest = p.one_shot(0.1f64.to_radians()).unwrap().range;
        assert!(shortest > 1.0);
        let table = range_table_by_range(&p, 1.0, 1001.0, 1000.0, 1.0).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!((table.rows[0].range - 1001.0).abs() <= 0.5);
        assert_eq!(table.notes.len(), 1);
        assert!(table.notes[0].starts_with("1.0m: closest range was"), "{}", table.notes[0]);
    }

    #[test]
    fn test_rejects_zero_increment() {
        let p = profile();
        assert!(matches!(
            range_table_by_range(&p, 100.0, 1000.0, 0.0, 1.0),
            Err(BallisticsError::InvalidParameter { name: "increment", .. })
        ));
    }
}
