//! Projectile definition consumed by the integrator and the searches.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::angle_calculations::{self, MaxRangeOutcome, RangeMatchOutcome};
use crate::atmosphere::AtmosphereModel;
use crate::constants::{DEFAULT_INITIAL_ALTITUDE_M, DEFAULT_TIME_STEP_S};
use crate::drag::DragTable;
use crate::error::{BallisticsError, Result};
use crate::form_factor::FormFactorTable;
use crate::form_factor_estimation::{self, FormFactorOutcome};
use crate::trajectory_solver::{ShotResult, TrajectorySample, TrajectorySolver};

/// A projectile and the conditions it is fired in
///
/// Cloning is cheap: the drag table is shared. Each clone is an independent snapshot that can be
/// fired from another thread.
#[derive(Debug, Clone)]
pub struct ProjectileProfile {
    pub name: Option<String>,
    pub mass: f64,                  // kg
    pub caliber: f64,               // mm
    pub muzzle_velocity: f64,       // m/s
    pub air_density_factor: f64,
    pub atmosphere: AtmosphereModel,
    pub drag_table: Arc<DragTable>,
    /// Where the drag table was loaded from, for display and saving
    pub drag_function_file: Option<PathBuf>,
    pub form_factors: FormFactorTable,
    pub time_step: f64,             // s
    pub initial_altitude: f64,      // m
}

impl ProjectileProfile {
    /// Profile with the default atmosphere, air density factor, time step and altitude.
    pub fn new(
        mass: f64,
        caliber: f64,
        muzzle_velocity: f64,
        drag_table: Arc<DragTable>,
        form_factors: FormFactorTable,
    ) -> Result<Self> {
        let profile = Self {
            name: None,
            mass,
            caliber,
            muzzle_velocity,
            air_density_factor: 1.0,
            atmosphere: AtmosphereModel::default(),
            drag_table,
            drag_function_file: None,
            form_factors,
            time_step: DEFAULT_TIME_STEP_S,
            initial_altitude: DEFAULT_INITIAL_ALTITUDE_M,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Check that every field describes something that can be fired.
    pub fn validate(&self) -> Result<()> {
        positive("mass", self.mass)?;
        positive("caliber", self.caliber)?;
        positive("mv", self.muzzle_velocity)?;
        positive("timestep", self.time_step)?;
        if !self.air_density_factor.is_finite() || self.air_density_factor < 0.0 {
            return Err(invalid("air_density_factor", self.air_density_factor, "must be >= 0"));
        }
        if !self.initial_altitude.is_finite() || self.initial_altitude < 0.0 {
            return Err(invalid("altitude", self.initial_altitude, "must be >= 0"));
        }
        if self.form_factors.is_empty() {
            return Err(BallisticsError::MissingFormFactor);
        }
        for &(_, ff) in self.form_factors.entries() {
            positive("form_factor", ff)?;
        }
        Ok(())
    }

    /// Ballistic coefficient for a given form factor.
    ///
    /// Caliber is taken in centimetres here, so the result is in kg/cm².
    pub fn ballistic_coefficient(&self, form_factor: f64) -> f64 {
        let d = self.caliber / 10.0;
        self.mass / (form_factor * self.air_density_factor * d.powi(2))
    }

    /// Ballistic coefficient for a shot departing at `angle_rad`.
    pub fn ballistic_coefficient_at(&self, angle_rad: f64) -> Result<f64> {
        let ff = self.form_factors.lookup(angle_rad)?;
        Ok(self.ballistic_coefficient(ff))
    }

    /// Fire one shot and return its impact conditions.
    pub fn one_shot(&self, angle_rad: f64) -> Result<ShotResult> {
        Ok(TrajectorySolver::new(self, angle_rad)?.solve())
    }

    /// Fire one shot, keeping the whole trajectory.
    pub fn trace(&self, angle_rad: f64) -> Result<(ShotResult, Vec<TrajectorySample>)> {
        Ok(TrajectorySolver::new(self, angle_rad)?.solve_traced())
    }

    /// Departure angle giving the longest range.
    pub fn max_range(&self) -> Result<MaxRangeOutcome> {
        angle_calculations::find_max_range(|angle| self.one_shot(angle))
    }

    /// Departure angle that reaches `target_range` within `tolerance`.
    ///
    /// Pass the profile's maximum range result to search only the rising part of the range curve
    /// and to reject unreachable targets without firing.
    pub fn match_range(
        &self,
        target_range: f64,
        tolerance: f64,
        max_range: Option<&MaxRangeOutcome>,
    ) -> Result<RangeMatchOutcome> {
        angle_calculations::match_range(target_range, tolerance, max_range, |angle| {
            self.one_shot(angle)
        })
    }

    /// Form factor that makes a shot at `angle_rad` land at `target_range`.
    ///
    /// The profile's form factor table is replaced by the single fitted value.
    pub fn match_form_factor(
        &mut self,
        angle_rad: f64,
        target_range: f64,
        tolerance: f64,
    ) -> Result<FormFactorOutcome> {
        form_factor_estimation::match_form_factor(angle_rad, target_range, tolerance, |ff| {
            self.form_factors = FormFactorTable::constant(angle_rad, ff);
            self.one_shot(angle_rad)
        })
    }

    /// Human readable configuration summary.
    pub fn describe(&self, max_range: Option<&MaxRangeOutcome>) -> String {
        let mut text = String::from("Projectile Configuration:\n");
        if let Some(name) = &self.name {
            text += &format!(" Name: {name}\n");
        }
        text += &format!(" Mass: {:.3}kg\n", self.mass);
        text += &format!(" Caliber: {:.3}mm\n", self.caliber);
        match self.form_factors.entries() {
            [] => {}
            [(_, ff)] => text += &format!(" Form Factor: {ff:.4}\n"),
            entries => {
                text += " Form Factor data:\n";
                for (angle, ff) in entries {
                    text += &format!("  {:.4}deg: {ff:.6}\n", angle.to_degrees());
                }
            }
        }
        match &self.drag_function_file {
            Some(path) => text += &format!(" Drag Function from file {}\n", path.display()),
            None => text += &format!(" Drag Function: {} point table\n", self.drag_table.len()),
        }
        text += &format!(" Density Function: {}\n", self.atmosphere);
        if let Some(max) = max_range {
            text += &format!(
                "Est. max range: {:.1}m at {:.4}deg\n",
                max.range,
                max.angle.to_degrees()
            );
        }
        text
    }
}

impl fmt::Display for ProjectileProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(None))?;
        writeln!(f, "Initial Conditions:")?;
        writeln!(f, " Velocity: {:.3}m/s", self.muzzle_velocity)?;
        writeln!(f, " Air Density Factor: {:.6}", self.air_density_factor)
    }
}

fn invalid(name: &'static str, value: f64, reason: &str) -> BallisticsError {
    BallisticsError::InvalidParameter { name, reason: format!("{value} {reason}") }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, value, "must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag() -> Arc<DragTable> {
        Arc::new(DragTable::new(vec![0.0, 1.0, 3.0], vec![0.1, 0.15, 0.12]).unwrap())
    }

    fn profile() -> ProjectileProfile {
        ProjectileProfile::new(
            100.0,
            150.0,
            800.0,
            drag(),
            FormFactorTable::constant(45f64.to_radians(), 1.0),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let p = profile();
        assert_eq!(p.time_step, 0.1);
        assert_eq!(p.initial_altitude, 0.0001);
        assert_eq!(p.air_density_factor, 1.0);
        assert_eq!(p.atmosphere, AtmosphereModel::Us);
    }

    #[test]
    fn test_ballistic_coefficient_uses_centimetres() {
        let p = profile();
        assert!((p.ballistic_coefficient(1.0) - 100.0 / 225.0).abs() < 1e-12);
        assert!((p.ballistic_coefficient(2.0) - 50.0 / 225.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation() {
        let mut p = profile();
        p.mass = 0.0;
        assert!(matches!(
            p.validate(),
            Err(BallisticsError::InvalidParameter { name: "mass", .. })
        ));

        let mut p = profile();
        p.time_step = -0.1;
        assert!(p.validate().is_err());

        let mut p = profile();
        p.air_density_factor = 0.0;
        assert!(p.validate().is_ok());

        let mut p = profile();
        p.form_factors.clear();
        assert!(matches!(p.validate(), Err(BallisticsError::MissingFormFactor)));

        let result = ProjectileProfile::new(100.0, 150.0, f64::NAN, drag(), FormFactorTable::constant(0.0, 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_form_factor_scales_range() {
        let mut p = profile();
        let angle = 30f64.to_radians();
        let base = p.one_shot(angle).unwrap().range;
        p.form_factors = FormFactorTable::constant(angle, 1.5);
        let draggy = p.one_shot(angle).unwrap().range;
        assert!(draggy < base);
    }

    #[test]
    fn test_describe_lists_form_factors() {
        let mut p = profile();
        p.name = Some("15cm test shell".to_string());
        p.form_factors = FormFactorTable::from_pairs([
            (10f64.to_radians(), 0.9),
            (40f64.to_radians(), 1.1),
        ]);
        let text = p.describe(None);
        assert!(text.contains("Name: 15cm test shell"));
        assert!(text.contains("10.0000deg: 0.900000"));
        assert!(text.contains("40.0000deg: 1.100000"));
        assert!(text.contains("Density Function: US"));
        assert!(!text.contains("Est. max range"));
    }
}
