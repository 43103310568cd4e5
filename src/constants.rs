//! Physical constants used in ballistics calculations

/// Surface gravitational acceleration in m/s²
pub const G_ACCEL_MPS2: f64 = 9.80665;

/// Decrease of gravitational acceleration per metre of altitude
pub const GRAVITY_LAPSE_PER_M: f64 = 0.000003665;

/// Surface air density (kg/m³)
pub const SURFACE_AIR_DENSITY: f64 = 1.2250;

/// Drag force proxy scaling
///
/// Retardation is computed as `KD * (SURFACE_AIR_DENSITY / 10000) * v²`. The 10000 folds the
/// caliber-in-centimetres convention of the ballistic coefficient back into SI units.
pub const DRAG_FORCE_SCALE: f64 = SURFACE_AIR_DENSITY / 10000.0;

/// Speed of sound at the surface (m/s) used for Mach number calculations
pub const SURFACE_SPEED_OF_SOUND_MPS: f64 = 344.0;

/// Decrease in speed of sound per metre of altitude
pub const SPEED_OF_SOUND_LAPSE_PER_M: f64 = 0.004;

/// Starting altitude when none is configured. Slightly above zero so the first step of a
/// shot is not already on the ground.
pub const DEFAULT_INITIAL_ALTITUDE_M: f64 = 0.0001;

/// Default integration time step (s)
pub const DEFAULT_TIME_STEP_S: f64 = 0.1;

/// Default convergence tolerance for range and form factor matching (m)
pub const DEFAULT_TOLERANCE_M: f64 = 1.0;

// Search constants

/// Maximum range search stops once its bracket is this narrow (degrees)
pub const MAX_RANGE_RESOLUTION_DEG: f64 = 0.05;

/// Lowest departure angle considered by range matching (degrees)
pub const MIN_DEPARTURE_ANGLE_DEG: f64 = 0.1;

/// Iteration cap for range matching bisection
pub const RANGE_MATCH_MAX_ITER: usize = 100;

/// At the iteration cap a bracket narrower than this (radians) is still accepted
pub const RANGE_MATCH_MIN_BRACKET_RAD: f64 = 0.0001;

/// Iteration cap for the form factor search
pub const FORM_FACTOR_MAX_ITER: usize = 100;

/// Below this form factor the form factor search gives up
pub const MIN_FORM_FACTOR: f64 = 0.000001;
