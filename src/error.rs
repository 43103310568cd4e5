//! Error type shared by the whole crate.
//!
//! Two families live in one enum. Configuration errors mean the projectile cannot be
//! simulated at all and should abort the command. Convergence failures are local to a single
//! search; batch operations check [`BallisticsError::is_convergence_failure`] and move on to the
//! next target.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BallisticsError {
    #[error("drag table needs at least two entries, found {0}")]
    DragTableTooShort(usize),

    #[error("drag table Mach values must be strictly increasing (entry {index}: {mach})")]
    DragTableNotIncreasing { index: usize, mach: f64 },

    #[error("drag table has {mach} Mach values but {coefficients} coefficients")]
    DragTableLengthMismatch { mach: usize, coefficients: usize },

    #[error("invalid drag function data on line {line}: {content:?}")]
    MalformedDragTable { line: usize, content: String },

    #[error("missing form factor")]
    MissingFormFactor,

    #[error("projectile not fully configured, missing: {}", .0.join(", "))]
    MissingAttributes(Vec<&'static str>),

    #[error("invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unknown density function {0:?} (expected US, UK or ICAO)")]
    UnknownAtmosphere(String),

    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse projectile config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write projectile config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("target range {target:.1}m is outside maximum range {max_range:.1}m")]
    OutsideAchievableRange { target: f64, max_range: f64 },

    #[error("could not converge - iteration limit exceeded after {iterations} iterations")]
    IterationLimit { iterations: usize },

    #[error("could not find a maximum range (best range {best_range})")]
    NoMaximumRange { best_range: f64 },

    #[error("could not converge on range {target:.1}m")]
    Unreachable { target: f64 },

    #[error("could not converge - form factor at {form_factor:.6} after {iterations} iterations")]
    FormFactorCollapsed { form_factor: f64, iterations: usize },
}

impl BallisticsError {
    /// True for failures that only affect one search and can be skipped in a batch.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(
            self,
            BallisticsError::OutsideAchievableRange { .. }
                | BallisticsError::NoMaximumRange { .. }
                | BallisticsError::IterationLimit { .. }
                | BallisticsError::Unreachable { .. }
                | BallisticsError::FormFactorCollapsed { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BallisticsError::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, BallisticsError>;
