//! Scan waves
//!
//! A scan is an expanding ring on the ground plane. Each tick the ring sweeps
//! from its previous radius to the new one and exposes every mob in that band.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mob::MobPool;
use crate::tuning::ScanTuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanWave {
    pub origin: Vec3,
    pub radius: f32,
}

impl ScanWave {
    pub fn new(origin: Vec3) -> Self {
        Self {
            origin,
            radius: 0.0,
        }
    }

    /// Grow the ring and mark mobs it passed over
    ///
    /// Returns false once the wave has reached its maximum radius and should
    /// be dropped.
    pub fn advance(&mut self, dt: f32, mobs: &mut MobPool, tuning: &ScanTuning) -> bool {
        let previous = self.radius;
        self.radius = (self.radius + tuning.speed * dt).min(tuning.max_radius);
        mobs.mark_vulnerable_in_band(
            self.origin,
            previous,
            self.radius,
            tuning.vulnerable_window,
        );
        self.radius < tuning.max_radius
    }
}

/// Advance all waves, dropping finished ones
pub fn update(waves: &mut Vec<ScanWave>, dt: f32, mobs: &mut MobPool, tuning: &ScanTuning) {
    waves.retain_mut(|wave| wave.advance(dt, mobs, tuning));
}
