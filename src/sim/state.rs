//! Simulation state
//!
//! `Simulation` is the single owner of every pool. Callers feed it fire, spawn
//! and scan requests and read back through accessors; only `tick` mutates the
//! world over time.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::events::{BossStatus, EventSink};
use super::mob::{Archetype, Mob, MobPool, MovementMode};
use super::projectile::{ProjectilePool, WeaponKind};
use super::scan::ScanWave;
use crate::tuning::Tuning;

/// Tracks what the presentation layer last heard about the boss
#[derive(Debug, Clone, Default)]
pub(crate) struct BossStatusTracker {
    pub last_active: bool,
    /// Seconds until the next periodic push while active
    pub refresh_timer: f32,
}

/// Complete combat state for one floor
#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) tuning: Tuning,
    pub(crate) projectiles: ProjectilePool,
    pub(crate) mobs: MobPool,
    pub(crate) scans: Vec<ScanWave>,
    pub(crate) rng: Pcg32,
    pub(crate) boss_tracker: BossStatusTracker,
    pub(crate) seed: u64,
    /// Simulated seconds
    pub(crate) time: f32,
    pub(crate) ticks: u64,
}

impl Simulation {
    /// Create an empty simulation with the given seed
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        log::info!(
            "New simulation: seed {seed}, {} projectile slots, {} mob slots",
            tuning.pools.projectile_capacity,
            tuning.pools.mob_capacity
        );
        Self {
            projectiles: ProjectilePool::new(tuning.pools.projectile_capacity),
            mobs: MobPool::new(tuning.pools.mob_capacity),
            scans: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            boss_tracker: BossStatusTracker::default(),
            seed,
            time: 0.0,
            ticks: 0,
            tuning,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    pub fn mobs(&self) -> &MobPool {
        &self.mobs
    }

    pub fn scans(&self) -> &[ScanWave] {
        &self.scans
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Fire a projectile; returns the ring slot it took
    pub fn fire(&mut self, origin: Vec3, direction: Vec3, weapon_kind: WeaponKind) -> usize {
        self.projectiles
            .fire(origin, direction, weapon_kind, &self.tuning.projectile)
    }

    /// Queue a mob to join at the start of the next tick
    pub fn spawn(&mut self, archetype: Archetype, position: Vec3, level: u32) {
        self.mobs.request_spawn(archetype, position, level);
    }

    /// Start a scan wave at `origin`
    pub fn scan(&mut self, origin: Vec3) {
        log::debug!("Scan wave from {origin}");
        self.scans.push(ScanWave::new(origin));
    }

    /// Apply nominal damage to a mob slot, returning what it actually lost
    pub fn apply_damage(&mut self, slot: usize, amount: f32) -> f32 {
        self.mobs.apply_damage(slot, amount, &self.tuning)
    }

    /// Run death handling for a slot right away
    ///
    /// Safe to call more than once; only the first call after the mob drops to
    /// zero hp has any effect.
    pub fn handle_death(
        &mut self,
        slot: usize,
        player_level: u32,
        sink: &mut dyn EventSink,
    ) -> bool {
        self.mobs
            .handle_death(slot, &self.tuning, player_level, &mut self.rng, sink)
    }

    /// Override a mob's movement mode (e.g. stasis from a player ability)
    pub fn set_movement_mode(&mut self, slot: usize, mode: MovementMode) -> bool {
        self.mobs.set_movement_mode(slot, mode)
    }

    /// The living boss, if any
    pub fn boss(&self) -> Option<&Mob> {
        self.mobs.boss().filter(|m| m.is_alive())
    }

    /// Current boss status as the presentation layer sees it
    pub fn boss_status(&self) -> BossStatus {
        boss_status_of(&self.mobs, &self.tuning)
    }

    /// Immediate spawn for tests, bypassing the queue
    #[cfg(test)]
    pub(crate) fn insert_mob(&mut self, archetype: Archetype, position: Vec3, level: u32) -> usize {
        self.mobs
            .insert_for_test(archetype, position, level, &self.tuning)
    }
}

/// Boss projection straight from the mob list
pub(crate) fn boss_status_of(mobs: &MobPool, tuning: &Tuning) -> BossStatus {
    match mobs.boss().filter(|m| m.is_alive()) {
        Some(boss) => BossStatus {
            active: true,
            name: boss.name(tuning).to_string(),
            hp: boss.hp.max(0.0),
            max_hp: boss.max_hp,
        },
        None => BossStatus::inactive(),
    }
}
