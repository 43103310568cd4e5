//! Relative air density and gravity as a function of altitude.
//!
//! Three density models are available. All of them return the ratio of air density at the
//! given altitude to surface density, so `density_ratio(0.0) == 1.0` for every model.

use crate::constants::{G_ACCEL_MPS2, GRAVITY_LAPSE_PER_M};
use crate::error::BallisticsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ICAO polynomial coefficients, highest power first
const ICAO_Z4: f64 = 1.34279408e-18;
const ICAO_Z3: f64 = -9.87941429e-14;
const ICAO_Z2: f64 = 3.90848966e-9;
const ICAO_Z1: f64 = -9.69888125e-5;

/// Density function selected for a projectile
///
/// Deserialized through [`FromStr`], so config files accept the names in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AtmosphereModel {
    /// US pre-1945 standard
    #[default]
    #[serde(rename = "US")]
    Us,
    /// British standard
    #[serde(rename = "UK")]
    Uk,
    /// ICAO standard atmosphere, quartic fit
    #[serde(rename = "ICAO")]
    Icao,
}

impl AtmosphereModel {
    pub const ALL: [AtmosphereModel; 3] =
        [AtmosphereModel::Us, AtmosphereModel::Uk, AtmosphereModel::Icao];

    /// Relative air density at `altitude_m`.
    pub fn density_ratio(&self, altitude_m: f64) -> f64 {
        match self {
            AtmosphereModel::Us => 10f64.powf(-(0.000045 * altitude_m)),
            AtmosphereModel::Uk => 0.1f64.powf(0.141 * (altitude_m / 3048.0)),
            AtmosphereModel::Icao => {
                let h = altitude_m;
                ICAO_Z4 * h.powi(4) + ICAO_Z3 * h.powi(3) + ICAO_Z2 * h.powi(2) + ICAO_Z1 * h + 1.0
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AtmosphereModel::Us => "US",
            AtmosphereModel::Uk => "UK",
            AtmosphereModel::Icao => "ICAO",
        }
    }
}

impl FromStr for AtmosphereModel {
    type Err = BallisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "US" => Ok(AtmosphereModel::Us),
            "UK" => Ok(AtmosphereModel::Uk),
            "ICAO" => Ok(AtmosphereModel::Icao),
            _ => Err(BallisticsError::UnknownAtmosphere(s.to_string())),
        }
    }
}

impl TryFrom<String> for AtmosphereModel {
    type Error = BallisticsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for AtmosphereModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Gravitational acceleration (m/s²) at `altitude_m`.
pub fn gravity(altitude_m: f64) -> f64 {
    G_ACCEL_MPS2 - GRAVITY_LAPSE_PER_M * altitude_m
}
