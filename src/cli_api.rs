// CLI API module - command level operations shared by the binary and the tests.
//
// Everything here takes and reports angles in degrees. Reports are plain serde structs so the
// binary can print them either as tables or as JSON.
use crate::angle_calculations::{MaxRangeOutcome, RangeMatchOutcome};
use crate::config::{FormFactorEntry, ProfileConfig};
use crate::error::{BallisticsError, Result};
use crate::form_factor::FormFactorTable;
use crate::form_factor_estimation::FormFactorOutcome;
use crate::projectile::ProjectileProfile;
use crate::range_table::{self, RangeTable, RangeTableRow, RangeTableStep};
use crate::trajectory_solver::{ShotResult, TrajectorySample};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

// Impact conditions of one shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotReport {
    pub departure_angle: f64, // degrees
    pub range: f64,           // m
    pub time: f64,            // s
    pub velocity: f64,        // m/s
    pub impact_angle: f64,    // degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
}

impl From<ShotResult> for ShotReport {
    fn from(s: ShotResult) -> Self {
        Self {
            departure_angle: s.departure_angle.to_degrees(),
            range: s.range,
            time: s.time,
            velocity: s.velocity,
            impact_angle: s.impact_angle.to_degrees(),
            iterations: None,
        }
    }
}

impl From<RangeMatchOutcome> for ShotReport {
    fn from(m: RangeMatchOutcome) -> Self {
        Self {
            departure_angle: m.angle.to_degrees(),
            range: m.range,
            time: m.time,
            velocity: m.velocity,
            impact_angle: m.impact_angle.to_degrees(),
            iterations: Some(m.iterations),
        }
    }
}

impl From<RangeTableRow> for ShotReport {
    fn from(r: RangeTableRow) -> Self {
        Self {
            departure_angle: r.departure_angle.to_degrees(),
            range: r.range,
            time: r.time,
            velocity: r.velocity,
            impact_angle: r.impact_angle.to_degrees(),
            iterations: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub range: f64,
    pub altitude: f64,
    pub velocity: f64,
    pub angle: f64, // degrees
}

impl From<TrajectorySample> for TrajectoryPoint {
    fn from(s: TrajectorySample) -> Self {
        Self {
            time: s.time,
            range: s.range,
            altitude: s.altitude,
            velocity: s.velocity,
            angle: s.angle.to_degrees(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleShotReport {
    pub shot: ShotReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Vec<TrajectoryPoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaxRangeReport {
    pub range: f64,
    pub angle: f64, // degrees
    pub iterations: usize,
}

impl From<MaxRangeOutcome> for MaxRangeReport {
    fn from(m: MaxRangeOutcome) -> Self {
        Self { range: m.range, angle: m.angle.to_degrees(), iterations: m.iterations }
    }
}

impl MaxRangeReport {
    fn to_outcome(self) -> MaxRangeOutcome {
        MaxRangeOutcome { range: self.range, angle: self.angle.to_radians(), iterations: self.iterations }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRangeReport {
    pub max_range: MaxRangeReport,
    pub tolerance: f64,
    pub shots: Vec<ShotReport>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormFactorFit {
    pub departure_angle: f64, // degrees
    pub target_range: f64,
    pub range: f64,
    pub form_factor: f64,
    pub iterations: usize,
}

impl FormFactorFit {
    fn new(target_range: f64, outcome: FormFactorOutcome) -> Self {
        Self {
            departure_angle: outcome.angle.to_degrees(),
            target_range,
            range: outcome.range,
            form_factor: outcome.form_factor,
            iterations: outcome.iterations,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormFactorReport {
    pub tolerance: f64,
    pub fits: Vec<FormFactorFit>,
    pub notes: Vec<String>,
}

impl FormFactorReport {
    /// Table made of the fitted form factors, one entry per shot.
    pub fn form_factor_table(&self) -> FormFactorTable {
        FormFactorTable::from_pairs(self.fits.iter().map(|f| (f.departure_angle.to_radians(), f.form_factor)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeTableReport {
    pub step: RangeTableStep,
    pub increment: f64, // m, or degrees for an angle table
    pub max_range: MaxRangeReport,
    pub rows: Vec<ShotReport>,
    pub notes: Vec<String>,
}

impl From<RangeTable> for RangeTableReport {
    fn from(t: RangeTable) -> Self {
        let increment = match t.step {
            RangeTableStep::Range => t.increment,
            RangeTableStep::Angle => t.increment.to_degrees(),
        };
        Self {
            step: t.step,
            increment,
            max_range: t.max_range.into(),
            rows: t.rows.into_iter().map(ShotReport::from).collect(),
            notes: t.notes,
        }
    }
}

/// Build a profile from an optional config file with command line values layered on top.
pub fn load_profile(config_path: Option<&Path>, overrides: ProfileConfig) -> Result<ProjectileProfile> {
    let mut config = match config_path {
        Some(path) => ProfileConfig::load(path)?,
        None => ProfileConfig::default(),
    };
    config.merge(overrides);
    config.build()
}

/// Save the profile as a projectile file.
pub fn write_config(profile: &ProjectileProfile, path: &Path) -> Result<()> {
    ProfileConfig::from_profile(profile).save(path)
}

pub fn single_shot(profile: &ProjectileProfile, angle_deg: f64, trace: bool) -> Result<SingleShotReport> {
    let angle = angle_deg.to_radians();
    if trace {
        let (shot, samples) = profile.trace(angle)?;
        Ok(SingleShotReport {
            shot: shot.into(),
            trajectory: Some(samples.into_iter().map(TrajectoryPoint::from).collect()),
        })
    } else {
        Ok(SingleShotReport { shot: profile.one_shot(angle)?.into(), trajectory: None })
    }
}

pub fn max_range(profile: &ProjectileProfile) -> Result<MaxRangeReport> {
    Ok(profile.max_range()?.into())
}

/// Match each target in turn against a single maximum range search.
///
/// Targets that cannot be matched are recorded as notes and the rest still run.
pub fn match_ranges(profile: &ProjectileProfile, targets: &[f64], tolerance: f64) -> Result<MatchRangeReport> {
    let max = profile.max_range()?;
    let mut shots = Vec::with_capacity(targets.len());
    let mut notes = Vec::new();

    for &target in targets {
        match profile.match_range(target, tolerance, Some(&max)) {
            Ok(outcome) if outcome.converged => shots.push(outcome.into()),
            Ok(outcome) => notes.push(format!(
                "Unable to match range {target:.1}m: closest was {:.1}m at {:.4}deg",
                outcome.range,
                outcome.angle.to_degrees()
            )),
            Err(e) if e.is_convergence_failure() => {
                warn!(target, error = %e, "unable to match range");
                notes.push(format!("Unable to match range {target:.1}m: {e}"));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(MatchRangeReport { max_range: max.into(), tolerance, shots, notes })
}

/// Fit a form factor to each observed (departure angle in degrees, range) shot.
///
/// Shots are independent and are fitted in parallel on copies of `profile`.
pub fn find_form_factors(
    profile: &ProjectileProfile,
    shots: &[(f64, f64)],
    tolerance: f64,
) -> Result<FormFactorReport> {
    let results: Vec<(f64, f64, Result<FormFactorOutcome>)> = shots
        .par_iter()
        .map(|&(angle_deg, target)| {
            let mut scratch = profile.clone();
            (angle_deg, target, scratch.match_form_factor(angle_deg.to_radians(), target, tolerance))
        })
        .collect();

    let mut fits = Vec::with_capacity(results.len());
    let mut notes = Vec::new();
    for (angle_deg, target, result) in results {
        match result {
            Ok(outcome) => fits.push(FormFactorFit::new(target, outcome)),
            Err(e) if e.is_convergence_failure() => {
                warn!(angle_deg, target, error = %e, "unable to fit form factor");
                notes.push(format!("Unable to fit {target:.1}m at {angle_deg:.4}deg: {e}"));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(FormFactorReport { tolerance, fits, notes })
}

/// Replace the profile's form factors with the fitted ones and save it.
pub fn save_form_factors(profile: &ProjectileProfile, report: &FormFactorReport, path: &Path) -> Result<()> {
    if report.fits.is_empty() {
        return Err(BallisticsError::MissingFormFactor);
    }
    let mut config = ProfileConfig::from_profile(profile);
    config.form_factors = report
        .fits
        .iter()
        .map(|f| FormFactorEntry { angle: f.departure_angle, value: f.form_factor })
        .collect();
    config.save(path)
}

pub fn range_table(
    profile: &ProjectileProfile,
    start: f64,
    end: f64,
    increment: f64,
    tolerance: f64,
) -> Result<RangeTableReport> {
    Ok(range_table::range_table_by_range(profile, start, end, increment, tolerance)?.into())
}

pub fn range_table_angle(
    profile: &ProjectileProfile,
    start_deg: f64,
    end_deg: f64,
    increment_deg: f64,
) -> Result<RangeTableReport> {
    Ok(range_table::range_table_by_angle(
        profile,
        start_deg.to_radians(),
        end_deg.to_radians(),
        increment_deg.to_radians(),
    )?
    .into())
}

/// Summary of the profile, with the maximum range when it is known.
pub fn describe(profile: &ProjectileProfile, max_range: Option<&MaxRangeReport>) -> String {
    let outcome = max_range.map(|m| m.to_outcome());
    profile.describe(outcome.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::DragTable;
    use std::fs;
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
    fn test_single_shot_in_degrees() {
        let p = profile();
        let report = single_shot(&p, 30.0, false).unwrap();
        assert!((report.shot.departure_angle - 30.0).abs() < 1e-12);
        assert!(report.shot.impact_angle < -30.0);
        assert!(report.trajectory.is_none());

        let traced = single_shot(&p, 30.0, true).unwrap();
        assert_eq!(traced.shot, report.shot);
        let trajectory = traced.trajectory.unwrap();
        assert!((trajectory[0].angle - 30.0).abs() < 1e-12);
        assert!(trajectory.last().unwrap().altitude <= 0.0);
    }

    #[test]
    fn test_match_ranges_notes_unreachable_targets() {
        let p = profile();
        let report = match_ranges(&p, &[2000.0, 1.0e6, 4000.0], 1.0).unwrap();
        assert_eq!(report.shots.len(), 2);
        assert!((report.shots[0].range - 2000.0).abs() <= 0.5);
        assert!((report.shots[1].range - 4000.0).abs() <= 0.5);
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].contains("1000000.0m"));
    }

    #[test]
    fn test_match_ranges_notes_targets_below_minimum_range() {
        let p = profile();
        let report = match_ranges(&p, &[1.0, 2000.0], 1.0).unwrap();
        assert_eq!(report.shots.len(), 1);
        assert!((report.shots[0].range - 2000.0).abs() <= 0.5);
        assert_eq!(report.notes.len(), 1);
        assert!(report.notes[0].starts_with("Unable to match range 1.0m: closest was"), "{}", report.notes[0]);
    }

    #[test]
    fn test_match_ranges_rejects_zero_tolerance() {
        let p = profile();
        assert!(matches!(
            match_ranges(&p, &[2000.0], 0.0),
            Err(BallisticsError::InvalidParameter { name: "tolerance", .. })
        ));
    }

    #[test]
    fn test_form_factor_round_trip() {
        let mut p = profile();
        p.form_factors = FormFactorTable::constant(0.0, 1.2);
        let observed = p.one_shot(35f64.to_radians()).unwrap().range;

        p.form_factors = FormFactorTable::constant(0.0, 1.0);
        let report = find_form_factors(&p, &[(35.0, observed)], 1.0).unwrap();
        assert_eq!(report.fits.len(), 1);
        assert!((report.fits[0].form_factor - 1.2).abs() < 0.01, "{:?}", report.fits[0]);
        // The caller's profile is left alone
        assert_eq!(p.form_factors.lookup(0.0).unwrap(), 1.0);

        let table = report.form_factor_table();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_save_form_factors() {
        let dir = tempfile::tempdir().unwrap();
        let drag_path = dir.path().join("drag.csv");
        fs::write(&drag_path, "0.0,0.10\n1.0,0.16\n3.0,0.12\n").unwrap();
        let mut p = profile();
        p.drag_function_file = Some(drag_path);

        let report = FormFactorReport {
            tolerance: 1.0,
            fits: vec![
                FormFactorFit { departure_angle: 20.0, target_range: 1.0, range: 1.0, form_factor: 0.9, iterations: 3 },
                FormFactorFit { departure_angle: 40.0, target_range: 1.0, range: 1.0, form_factor: 1.1, iterations: 3 },
            ],
            notes: Vec::new(),
        };
        let path = dir.path().join("fitted.toml");
        save_form_factors(&p, &report, &path).unwrap();

        let reloaded = load_profile(Some(&path), ProfileConfig::default()).unwrap();
        assert_eq!(reloaded.form_factors.len(), 2);
        assert!((reloaded.form_factors.lookup(30f64.to_radians()).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_table_angle_increment_in_degrees() {
        let p = profile();
        let report = range_table_angle(&p, 10.0, 20.0, 5.0).unwrap();
        assert_eq!(report.rows.len(), 3);
        assert!((report.increment - 5.0).abs() < 1e-9);
        assert!((report.rows[2].departure_angle - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_describe_includes_max_range() {
        let p = profile();
        let max = max_range(&p).unwrap();
        let text = describe(&p, Some(&max));
        assert!(text.contains("Est. max range"));
    }
}
