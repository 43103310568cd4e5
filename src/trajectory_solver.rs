//! Point-mass trajectory integration for a single shot.
//!
//! The integrator works on the velocity magnitude and flight-path angle. Each time step is a
//! predictor followed by two midpoint corrections: the retardation at the start of the step is
//! averaged with the retardation at the predicted end of the step, and that correction is
//! applied twice. A shot is integrated until the altitude first reaches zero and the impact
//! point is then interpolated between the last two samples.

use crate::atmosphere::gravity;
use crate::constants::DRAG_FORCE_SCALE;
use crate::drag::interpolate;
use crate::error::Result;
use crate::projectile::ProjectileProfile;
use nalgebra::Vector2;
use serde::Serialize;

/// One point on a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub altitude: f64,     // m
    pub time: f64,         // s
    pub range: f64,        // m, horizontal distance from the gun
    pub velocity: f64,     // m/s
    pub angle: f64,        // radians above horizontal
}

/// Impact conditions of a shot, interpolated to zero altitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShotResult {
    pub departure_angle: f64, // radians
    pub time: f64,            // time of flight (s)
    pub range: f64,           // m
    pub velocity: f64,        // striking velocity (m/s)
    pub impact_angle: f64,    // radians, negative when descending
}

/// Change of state over one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepIncrement {
    pub distance: f64,
    pub altitude: f64,
    pub velocity: f64,
    pub angle: f64,
}

/// Integrator for shots fired at one departure angle
#[derive(Debug, Clone, Copy)]
pub struct TrajectorySolver<'a> {
    profile: &'a ProjectileProfile,
    departure_angle: f64,
    ballistic_coefficient: f64,
}

impl<'a> TrajectorySolver<'a> {
    /// Fails only when the profile has no form factor for the angle.
    pub fn new(profile: &'a ProjectileProfile, departure_angle: f64) -> Result<Self> {
        let ballistic_coefficient = profile.ballistic_coefficient_at(departure_angle)?;
        Ok(Self { profile, departure_angle, ballistic_coefficient })
    }

    pub fn ballistic_coefficient(&self) -> f64 {
        self.ballistic_coefficient
    }

    /// Horizontal and vertical deceleration (H, J) at the given state.
    ///
    /// J includes gravity; both are positive when they slow the projectile.
    pub fn retardation(&self, altitude: f64, velocity: f64, angle: f64) -> Vector2<f64> {
        let density = self.profile.atmosphere.density_ratio(altitude);
        let kd = self.profile.drag_table.kd_at(velocity, altitude);
        let drag = kd * DRAG_FORCE_SCALE * velocity.powi(2);
        let e = drag / (self.ballistic_coefficient / density);
        Vector2::new(e * angle.cos(), e * angle.sin() + gravity(altitude))
    }

    /// Corrected velocity estimate using the mean of the initial retardation and the
    /// retardation at the estimated state.
    fn iterate_estimate(
        &self,
        altitude: f64,
        velocity: f64,
        angle: f64,
        v0: &Vector2<f64>,
        r0: &Vector2<f64>,
    ) -> (Vector2<f64>, f64, f64) {
        let r1 = self.retardation(altitude, velocity, angle);
        let mean = (r0 + r1) / 2.0;
        let v2 = v0 - mean * self.profile.time_step;
        let (speed, angle) = to_polar(&v2);
        (v2, speed, angle)
    }

    /// Advance the state by one time step.
    pub fn advance(&self, altitude: f64, velocity: f64, angle: f64) -> StepIncrement {
        let dt = self.profile.time_step;
        let v0 = Vector2::new(velocity * angle.cos(), velocity * angle.sin());
        let r0 = self.retardation(altitude, velocity, angle);

        // Predictor
        let v1 = v0 - r0 * dt;
        let (speed1, angle1) = to_polar(&v1);
        let a1 = (v0.y + v1.y) / 2.0 * dt;

        // Two corrections, each at the altitude implied by the previous estimate
        let (v2, speed2, angle2) = self.iterate_estimate(altitude + a1, speed1, angle1, &v0, &r0);
        let a2 = (v0.y + v2.y) / 2.0 * dt;
        let (v3, speed3, angle3) = self.iterate_estimate(altitude + a2, speed2, angle2, &v0, &r0);

        let mean = (v0 + v3) / 2.0;
        StepIncrement {
            distance: mean.x * dt,
            altitude: mean.y * dt,
            velocity: speed3,
            angle: angle3,
        }
    }

    fn launch_sample(&self) -> TrajectorySample {
        TrajectorySample {
            altitude: self.profile.initial_altitude,
            time: 0.0,
            range: 0.0,
            velocity: self.profile.muzzle_velocity,
            angle: self.departure_angle,
        }
    }

    /// Lazily produced trajectory, from launch to the first sample at or below the ground.
    pub fn flight(&self) -> Flight<'a> {
        Flight {
            solver: *self,
            pending: Some(self.launch_sample()),
            steps: 0,
        }
    }

    /// Integrate the shot and interpolate the impact point.
    pub fn solve(&self) -> ShotResult {
        let mut above = self.launch_sample();
        let mut below = above;
        for sample in self.flight() {
            above = below;
            below = sample;
        }
        impact(self.departure_angle, &above, &below)
    }

    /// Integrate the shot, keeping every sample.
    pub fn solve_traced(&self) -> (ShotResult, Vec<TrajectorySample>) {
        let samples: Vec<TrajectorySample> = self.flight().collect();
        let n = samples.len();
        // A flight always holds the launch sample and at least one step
        let result = impact(self.departure_angle, &samples[n - 2], &samples[n - 1]);
        (result, samples)
    }
}

fn to_polar(v: &Vector2<f64>) -> (f64, f64) {
    (v.norm(), (v.y / v.x).atan())
}

/// Linear interpolation of the impact state at zero altitude.
fn impact(departure_angle: f64, above: &TrajectorySample, below: &TrajectorySample) -> ShotResult {
    let at_ground = |y1: f64, y2: f64| interpolate(0.0, above.altitude, below.altitude, y1, y2);
    ShotResult {
        departure_angle,
        time: at_ground(above.time, below.time),
        range: at_ground(above.range, below.range),
        velocity: at_ground(above.velocity, below.velocity),
        impact_angle: at_ground(above.angle, below.angle),
    }
}

/// Iterator over the samples of one shot
///
/// The launch sample is always followed by at least one step. Iteration ends after the first
/// sample whose altitude is zero or below.
#[derive(Debug, Clone)]
pub struct Flight<'a> {
    solver: TrajectorySolver<'a>,
    pending: Option<TrajectorySample>,
    steps: usize,
}

impl Iterator for Flight<'_> {
    type Item = TrajectorySample;

    fn next(&mut self) -> Option<TrajectorySample> {
        let sample = self.pending.take()?;
        if self.steps == 0 || sample.altitude > 0.0 {
            let dt = self.solver.profile.time_step;
            let inc = self.solver.advance(sample.altitude, sample.velocity, sample.angle);
            self.pending = Some(TrajectorySample {
                altitude: sample.altitude + inc.altitude,
                time: sample.time + dt,
                range: sample.range + inc.distance,
                velocity: inc.velocity,
                angle: inc.angle,
            });
            self.steps += 1;
        }
        Some(sample)
    }
}
