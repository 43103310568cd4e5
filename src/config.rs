//! Projectile configuration files.
//!
//! A projectile file is TOML:
//!
//! ```toml
//! [projectile]
//! name = "15cm shell"
//! mass = 45.5
//! caliber = 149.1
//! drag_function_file = "kd_15cm.csv"
//! density_function = "US"
//!
//! [initial_conditions]
//! mv = 805.0
//! air_density_factor = 1.0
//!
//! [[form_factor]]
//! angle = 45.0
//! value = 0.95
//! ```
//!
//! Every field is optional in the file. Command line values are merged over the file, defaults
//! fill what is left and [`ProfileConfig::build`] reports anything still missing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atmosphere::AtmosphereModel;
use crate::constants::{DEFAULT_INITIAL_ALTITUDE_M, DEFAULT_TIME_STEP_S};
use crate::drag::DragTable;
use crate::error::{BallisticsError, Result};
use crate::form_factor::FormFactorTable;
use crate::projectile::ProjectileProfile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub projectile: ProjectileSection,
    #[serde(default)]
    pub initial_conditions: ConditionsSection,
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default, rename = "form_factor", skip_serializing_if = "Vec::is_empty")]
    pub form_factors: Vec<FormFactorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>, // kg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caliber: Option<f64>, // mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drag_function_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_function: Option<AtmosphereModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>, // m
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mv: Option<f64>, // m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_density_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestep: Option<f64>, // s
}

/// Form factor observed at a departure angle given in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormFactorEntry {
    pub angle: f64,
    pub value: f64,
}

impl ProfileConfig {
    /// Read a projectile file. A relative drag function path is taken relative to the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| BallisticsError::io(path, e))?;
        let mut config: ProfileConfig = toml::from_str(&contents)?;

        if let Some(drag) = config.projectile.drag_function_file.as_mut() {
            if drag.is_relative() {
                if let Some(dir) = path.parent() {
                    *drag = dir.join(&*drag);
                }
            }
        }
        debug!(path = %path.display(), "loaded projectile config");
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|e| BallisticsError::io(path, e))?;
        debug!(path = %path.display(), "saved projectile config");
        Ok(())
    }

    /// Snapshot of a built profile, suitable for saving.
    pub fn from_profile(profile: &ProjectileProfile) -> Self {
        // Saved files may live elsewhere, so store an absolute drag path when one can be found
        let drag_function_file = profile
            .drag_function_file
            .as_ref()
            .map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.clone()));

        Self {
            projectile: ProjectileSection {
                name: profile.name.clone(),
                mass: Some(profile.mass),
                caliber: Some(profile.caliber),
                drag_function_file,
                density_function: Some(profile.atmosphere),
            },
            initial_conditions: ConditionsSection {
                altitude: Some(profile.initial_altitude),
                mv: Some(profile.muzzle_velocity),
                air_density_factor: Some(profile.air_density_factor),
            },
            simulation: SimulationSection { timestep: Some(profile.time_step) },
            form_factors: profile
                .form_factors
                .entries()
                .iter()
                .map(|&(angle, value)| FormFactorEntry { angle: angle.to_degrees(), value })
                .collect(),
        }
    }

    /// Overlay every value set in `overrides`. A non-empty form factor list replaces ours.
    pub fn merge(&mut self, overrides: ProfileConfig) {
        let ProfileConfig { projectile, initial_conditions, simulation, form_factors } = overrides;

        self.projectile.name = projectile.name.or(self.projectile.name.take());
        self.projectile.mass = projectile.mass.or(self.projectile.mass);
        self.projectile.caliber = projectile.caliber.or(self.projectile.caliber);
        self.projectile.drag_function_file =
            projectile.drag_function_file.or(self.projectile.drag_function_file.take());
        self.projectile.density_function =
            projectile.density_function.or(self.projectile.density_function);

        self.initial_conditions.altitude =
            initial_conditions.altitude.or(self.initial_conditions.altitude);
        self.initial_conditions.mv = initial_conditions.mv.or(self.initial_conditions.mv);
        self.initial_conditions.air_density_factor = initial_conditions
            .air_density_factor
            .or(self.initial_conditions.air_density_factor);

        self.simulation.timestep = simulation.timestep.or(self.simulation.timestep);

        if !form_factors.is_empty() {
            self.form_factors = form_factors;
        }
    }

    /// Names of the required values that are not set.
    pub fn missing_attributes(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.projectile.mass.is_none() {
            missing.push("mass");
        }
        if self.projectile.caliber.is_none() {
            missing.push("caliber");
        }
        if self.initial_conditions.mv.is_none() {
            missing.push("mv");
        }
        if self.form_factors.is_empty() {
            missing.push("form_factor");
        }
        if self.projectile.drag_function_file.is_none() {
            missing.push("drag_function_file");
        }
        missing
    }

    /// Form factors with angles converted to radians.
    pub fn form_factor_table(&self) -> FormFactorTable {
        FormFactorTable::from_pairs(self.form_factors.iter().map(|e| (e.angle.to_radians(), e.value)))
    }

    /// Fill in defaults, load the drag function and produce a validated profile.
    pub fn build(&self) -> Result<ProjectileProfile> {
        let missing = self.missing_attributes();
        let (Some(mass), Some(caliber), Some(mv), Some(drag_path)) = (
            self.projectile.mass,
            self.projectile.caliber,
            self.initial_conditions.mv,
            self.projectile.drag_function_file.as_ref(),
        ) else {
            return Err(BallisticsError::MissingAttributes(missing));
        };
        if !missing.is_empty() {
            return Err(BallisticsError::MissingAttributes(missing));
        }

        let drag_table = DragTable::from_file(drag_path)?;
        let mut profile =
            ProjectileProfile::new(mass, caliber, mv, Arc::new(drag_table), self.form_factor_table())?;
        profile.name = self.projectile.name.clone();
        profile.drag_function_file = Some(drag_path.clone());
        profile.atmosphere = self.projectile.density_function.unwrap_or_default();
        profile.air_density_factor = self.initial_conditions.air_density_factor.unwrap_or(1.0);
        profile.initial_altitude =
            self.initial_conditions.altitude.unwrap_or(DEFAULT_INITIAL_ALTITUDE_M);
        profile.time_step = self.simulation.timestep.unwrap_or(DEFAULT_TIME_STEP_S);
        profile.validate()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const DRAG: &str = "0.0,0.10\n0.8,0.11\n1.0,0.16\n1.2,0.18\n2.0,0.14\n3.0,0.12\n";

    const CONFIG: &str = r#"
[projectile]
name = "test shell"
mass = 100.0
caliber = 150.0
drag_function_file = "drag.csv"
density_function = "ICAO"

[initial_conditions]
mv = 800.0

[[form_factor]]
angle = 30.0
value = 0.9

[[form_factor]]
angle = 10.0
value = 0.8
"#;

    #[test]
    fn test_load_and_build() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("drag.csv"), DRAG).unwrap();
        let path = dir.path().join("shell.toml");
        fs::write(&path, CONFIG).unwrap();

        let config = ProfileConfig::load(&path).unwrap();
        assert_eq!(config.projectile.drag_function_file, Some(dir.path().join("drag.csv")));

        let profile = config.build().unwrap();
        assert_eq!(profile.name.as_deref(), Some("test shell"));
        assert_eq!(profile.atmosphere, AtmosphereModel::Icao);
        assert_eq!(profile.time_step, 0.1);
        assert_eq!(profile.initial_altitude, 0.0001);
        assert_eq!(profile.air_density_factor, 1.0);
        assert_eq!(profile.drag_table.len(), 6);
        // Sorted by angle, in radians
        let entries = profile.form_factors.entries();
        assert!((entries[0].0 - 10f64.to_radians()).abs() < 1e-12);
        assert_eq!(entries[1].1, 0.9);
    }

    #[test]
    fn test_missing_attributes_reported_together() {
        let config = ProfileConfig {
            projectile: ProjectileSection { mass: Some(10.0), ..Default::default() },
            ..Default::default()
        };
        match config.build() {
            Err(BallisticsError::MissingAttributes(missing)) => {
                assert_eq!(missing, vec!["caliber", "mv", "form_factor", "drag_function_file"]);
            }
            other => panic!("expected missing attributes, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut base: ProfileConfig = toml::from_str(CONFIG).unwrap();
        let overrides = ProfileConfig {
            initial_conditions: ConditionsSection { mv: Some(600.0), ..Default::default() },
            form_factors: vec![FormFactorEntry { angle: 45.0, value: 1.1 }],
            ..Default::default()
        };
        base.merge(overrides);
        assert_eq!(base.initial_conditions.mv, Some(600.0));
        assert_eq!(base.projectile.mass, Some(100.0));
        assert_eq!(base.projectile.name.as_deref(), Some("test shell"));
        assert_eq!(base.form_factors.len(), 1);

        base.merge(ProfileConfig::default());
        assert_eq!(base.form_factors.len(), 1);
    }

    #[test]
    fn test_save_then_load_builds_same_profile() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("drag.csv"), DRAG).unwrap();
        let path = dir.path().join("shell.toml");
        fs::write(&path, CONFIG).unwrap();
        let original = ProfileConfig::load(&path).unwrap().build().unwrap();

        let saved = dir.path().join("saved").join("copy.toml");
        fs::create_dir_all(saved.parent().unwrap()).unwrap();
        ProfileConfig::from_profile(&original).save(&saved).unwrap();

        let text = fs::read_to_string(&saved).unwrap();
        assert!(text.contains("[[form_factor]]"));
        let reloaded = ProfileConfig::load(&saved).unwrap().build().unwrap();
        assert_eq!(reloaded.mass, original.mass);
        assert_eq!(reloaded.atmosphere, original.atmosphere);
        assert_eq!(reloaded.form_factors.len(), 2);
        assert!((reloaded.form_factors.entries()[1].1 - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_missing_drag_file_is_io_error() {
        let mut config: ProfileConfig = toml::from_str(CONFIG).unwrap();
        config.projectile.drag_function_file = Some(PathBuf::from("/nonexistent/drag.csv"));
        assert!(matches!(config.build(), Err(BallisticsError::Io { .. })));
    }

    #[test]
    fn test_density_function_name_is_case_insensitive() {
        let config: ProfileConfig = toml::from_str(&CONFIG.replace("\"ICAO\"", "\"icao\"")).unwrap();
        assert_eq!(config.projectile.density_function, Some(AtmosphereModel::Icao));
        let config: ProfileConfig = toml::from_str(&CONFIG.replace("\"ICAO\"", "\" Uk \"")).unwrap();
        assert_eq!(config.projectile.density_function, Some(AtmosphereModel::Uk));

        // Saved in the canonical spelling
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("density_function = \"UK\""), "{text}");
    }

    #[test]
    fn test_unknown_density_function_rejected() {
        let text = CONFIG.replace("ICAO", "MARS");
        assert!(toml::from_str::<ProfileConfig>(&text).is_err());
    }
}
