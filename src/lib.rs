//! # Artillery Ballistics
//!
//! Point-mass exterior ballistics for artillery shells: single shots, the departure angle for
//! maximum range, the departure angle for a given range, form factor fitting against observed
//! shots and range tables.
//!
//! Library functions take and return angles in radians; the CLI layer ([`cli_api`]) works in
//! degrees.

// Re-export the main types and functions
pub use angle_calculations::{find_max_range, match_range, MaxRangeOutcome, RangeMatchOutcome};
pub use atmosphere::{gravity, AtmosphereModel};
pub use config::ProfileConfig;
pub use drag::{mach_number, DragTable};
pub use error::{BallisticsError, Result};
pub use form_factor::FormFactorTable;
pub use form_factor_estimation::{match_form_factor, FormFactorOutcome};
pub use projectile::ProjectileProfile;
pub use range_table::{range_table_by_angle, range_table_by_range, RangeTable, RangeTableRow, RangeTableStep};
pub use trajectory_solver::{Flight, ShotResult, StepIncrement, TrajectorySample, TrajectorySolver};

// Module declarations
pub mod angle_calculations;
pub mod atmosphere;
pub mod cli_api;
pub mod config;
pub mod constants;
pub mod drag;
pub mod error;
pub mod form_factor;
pub mod form_factor_estimation;
pub mod projectile;
pub mod range_table;
pub mod trajectory_solver;
