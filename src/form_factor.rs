//! Form factor calibration, optionally varying with departure angle

use crate::drag::{bracket_index, interpolate};
use crate::error::{BallisticsError, Result};

/// (departure angle, form factor) pairs sorted by angle
///
/// A single entry means a constant form factor. With more entries the form factor for a shot is
/// interpolated on its departure angle, extending the end intervals in a straight line outside
/// the tabulated angles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFactorTable {
    // (angle in radians, form factor)
    entries: Vec<(f64, f64)>,
}

impl FormFactorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding one form factor used for every departure angle.
    pub fn constant(angle_rad: f64, form_factor: f64) -> Self {
        Self { entries: vec![(angle_rad, form_factor)] }
    }

    /// Build from unordered pairs. A repeated angle keeps the last value given for it.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut table = Self::new();
        for (angle, ff) in pairs {
            table.insert(angle, ff);
        }
        table
    }

    /// Insert or replace the form factor for `angle_rad`, keeping the table sorted.
    pub fn insert(&mut self, angle_rad: f64, form_factor: f64) {
        match self.entries.binary_search_by(|(a, _)| a.total_cmp(&angle_rad)) {
            Ok(pos) => self.entries[pos].1 = form_factor,
            Err(pos) => self.entries.insert(pos, (angle_rad, form_factor)),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Form factor for a shot departing at `angle_rad`.
    pub fn lookup(&self, angle_rad: f64) -> Result<f64> {
        match self.entries.as_slice() {
            [] => Err(BallisticsError::MissingFormFactor),
            [(_, ff)] => Ok(*ff),
            entries => {
                let angles: Vec<f64> = entries.iter().map(|(a, _)| *a).collect();
                let i = bracket_index(&angles, angle_rad);
                let (a1, f1) = entries[i - 1];
                let (a2, f2) = entries[i];
                Ok(interpolate(angle_rad, a1, a2, f1, f2))
            }
        }
    }

    pub fn entries(&self) -> &[(f64, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
