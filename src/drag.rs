//! Drag coefficient lookup from tabulated drag function data

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::constants::{SPEED_OF_SOUND_LAPSE_PER_M, SURFACE_SPEED_OF_SOUND_MPS};
use crate::error::{BallisticsError, Result};

/// Mach number for a projectile moving at `velocity_mps` at `altitude_m`.
///
/// Uses a linear fall-off of the speed of sound with altitude.
pub fn mach_number(velocity_mps: f64, altitude_m: f64) -> f64 {
    velocity_mps / (SURFACE_SPEED_OF_SOUND_MPS - SPEED_OF_SOUND_LAPSE_PER_M * altitude_m)
}

/// Index of the upper end of the interval used to interpolate at `x`.
///
/// Returns the first index from 1 whose value exceeds `x`, stopping at the last index. A query
/// below the first value therefore lands in the first interval and one at or above the last
/// value lands in the final interval; both extrapolate along that interval.
pub(crate) fn bracket_index(xs: &[f64], x: f64) -> usize {
    let mut i = 1;
    while i < xs.len() - 1 {
        if x < xs[i] {
            break;
        }
        i += 1;
    }
    i
}

/// Straight-line interpolation of `y` at `x` between `(x1, y1)` and `(x2, y2)`.
pub(crate) fn interpolate(x: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    y1 + (y2 - y1) * ((x - x1) / (x2 - x1))
}

/// Drag function: drag coefficient (KD) against Mach number
#[derive(Debug, Clone, PartialEq)]
pub struct DragTable {
    mach_values: Vec<f64>,
    kd_values: Vec<f64>,
}

impl DragTable {
    /// Build a drag table, checking that it can be interpolated.
    pub fn new(mach_values: Vec<f64>, kd_values: Vec<f64>) -> Result<Self> {
        if mach_values.len() != kd_values.len() {
            return Err(BallisticsError::DragTableLengthMismatch {
                mach: mach_values.len(),
                coefficients: kd_values.len(),
            });
        }
        if mach_values.len() < 2 {
            return Err(BallisticsError::DragTableTooShort(mach_values.len()));
        }
        for (index, pair) in mach_values.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(BallisticsError::DragTableNotIncreasing {
                    index: index + 1,
                    mach: pair[1],
                });
            }
        }
        Ok(Self { mach_values, kd_values })
    }

    /// Parse `mach,kd` lines. Blank lines are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut mach_values = Vec::new();
        let mut kd_values = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BallisticsError::io("<drag function>", e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let malformed = || BallisticsError::MalformedDragTable {
                line: idx + 1,
                content: trimmed.to_string(),
            };
            let (mach, kd) = trimmed.split_once(',').ok_or_else(malformed)?;
            let mach: f64 = mach.trim().parse().map_err(|_| malformed())?;
            let kd: f64 = kd.trim().parse().map_err(|_| malformed())?;
            mach_values.push(mach);
            kd_values.push(kd);
        }

        Self::new(mach_values, kd_values)
    }

    /// Load a drag function file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BallisticsError::io(path, e))?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            BallisticsError::Io { source, .. } => BallisticsError::io(path, source),
            other => other,
        })
    }

    /// Drag coefficient at `mach`, linearly interpolated.
    ///
    /// NOTE: queries outside the table are *not* rejected. Below the first entry or at/above the
    /// last entry the end interval is extended in a straight line, which is what the drag
    /// functions this was calibrated against expect.
    pub fn lookup(&self, mach: f64) -> f64 {
        let i = bracket_index(&self.mach_values, mach);
        interpolate(
            mach,
            self.mach_values[i - 1],
            self.mach_values[i],
            self.kd_values[i - 1],
            self.kd_values[i],
        )
    }

    /// Drag coefficient for a projectile at `velocity_mps` and `altitude_m`.
    pub fn kd_at(&self, velocity_mps: f64, altitude_m: f64) -> f64 {
        self.lookup(mach_number(velocity_mps, altitude_m))
    }

    pub fn mach_values(&self) -> &[f64] {
        &self.mach_values
    }

    pub fn kd_values(&self) -> &[f64] {
        &self.kd_values
    }

    pub fn len(&self) -> usize {
        self.mach_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mach_values.is_empty()
    }
}
