//! Dungeon Sim - combat and hostile-entity core of a first-person dungeon crawler
//!
//! Core modules:
//! - `sim`: Deterministic simulation (projectiles, mobs, contagion, boss encounter)
//! - `tuning`: Data-driven combat balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

use glam::{Vec2, Vec3};

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one tick per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Projectile ring capacity
    pub const P_MAX: usize = 200;
    /// Mob list capacity
    pub const M_MAX: usize = 50;

    /// Player level at which the contagion feature unlocks
    pub const CONTAGION_UNLOCK_LEVEL: u32 = 5;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Rotate `current` toward `target` along the shortest arc, by at most `max_delta`
#[inline]
pub fn turn_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = normalize_angle(target - current);
    normalize_angle(current + delta.clamp(-max_delta, max_delta))
}

/// Project a world position onto the ground (xz) plane
#[inline]
pub fn ground(pos: Vec3) -> Vec2 {
    Vec2::new(pos.x, pos.z)
}

/// Distance between two positions measured on the ground plane
#[inline]
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    ground(a).distance(ground(b))
}

/// Unit heading on the ground plane for an angle (0 = +X, π/2 = +Z)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
