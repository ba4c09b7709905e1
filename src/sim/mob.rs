//! Hostile entities
//!
//! Mobs live in a bounded list. Spawns are queued and only merged at the start
//! of a tick, so nothing is appended while the list is being iterated. Dead
//! mobs stay in place for the rest of the tick they died in.

use glam::Vec3;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::boss::BossState;
use super::collision::slide_against_walls;
use super::contagion;
use super::events::{EventSink, Reward};
use super::level::LevelOracle;
use crate::tuning::{ArchetypeStats, Tuning};
use crate::{ground, ground_distance};

/// Mob archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Fast swarmer
    Mite,
    /// Skittish caster that keeps its distance
    Wisp,
    Hunter,
    /// Immobile turret
    Sentry,
    Boss,
}

impl Archetype {
    /// Movement mode a fresh spawn starts in
    pub fn default_mode(self) -> MovementMode {
        match self {
            Archetype::Mite | Archetype::Wisp | Archetype::Hunter => MovementMode::Chase,
            // Boss only becomes mobile in phase 2
            Archetype::Sentry | Archetype::Boss => MovementMode::Stationary,
        }
    }

    pub fn is_boss(self) -> bool {
        matches!(self, Archetype::Boss)
    }
}

/// How a mob moves each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementMode {
    Chase,
    Stationary,
    /// Frozen by an outside effect until released
    Stasis,
}

/// Timed status effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub infected: bool,
    /// Seconds until the infection burns out
    pub infection_timer: f32,
    /// Time banked toward the next damage tick
    pub tick_accumulator: f32,
    /// Marked by a scan: double damage, no armour
    pub scan_vulnerable: bool,
    pub vulnerable_timer: f32,
}

/// Queued spawn, merged at the start of the next tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub archetype: Archetype,
    pub position: Vec3,
    /// Floor level the stats are scaled for
    pub level: u32,
}

/// A hostile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mob {
    pub id: u32,
    pub archetype: Archetype,
    pub position: Vec3,
    pub hp: f32,
    pub max_hp: f32,
    pub level: u32,
    pub movement_mode: MovementMode,
    pub status: StatusEffects,
    /// Set exactly once; gates rewards and retirement
    pub is_dead: bool,
    /// Encounter state, present only on the boss
    pub boss: Option<BossState>,
}

impl Mob {
    pub fn new(id: u32, archetype: Archetype, position: Vec3, level: u32, tuning: &Tuning) -> Self {
        let max_hp = tuning.scaled_hp(archetype, level);
        Self {
            id,
            archetype,
            position,
            hp: max_hp,
            max_hp,
            level,
            movement_mode: archetype.default_mode(),
            status: StatusEffects::default(),
            is_dead: false,
            boss: archetype.is_boss().then(|| BossState::new(&tuning.boss)),
        }
    }

    /// Still a valid target: not marked dead and has health left
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.is_dead && self.hp > 0.0
    }

    pub fn stats<'a>(&self, tuning: &'a Tuning) -> &'a ArchetypeStats {
        tuning.archetypes.get(self.archetype)
    }

    pub fn name<'a>(&self, tuning: &'a Tuning) -> &'a str {
        &self.stats(tuning).name
    }

    pub fn hitbox_radius(&self, tuning: &Tuning) -> f32 {
        self.stats(tuning).hitbox_radius
    }

    /// Scale nominal damage by vulnerability and boss armour
    pub fn effective_damage(&self, amount: f32, tuning: &Tuning) -> f32 {
        let mut damage = amount;
        if self.status.scan_vulnerable {
            damage *= 2.0;
        }
        let armored =
            self.archetype.is_boss() && !self.status.scan_vulnerable && !self.status.infected;
        if armored {
            damage *= tuning.boss.armor_factor;
        }
        damage
    }

    /// Apply nominal damage, returning what actually came off the hp
    ///
    /// Damage against a mob that is already down is ignored.
    pub fn take_damage(&mut self, amount: f32, tuning: &Tuning) -> f32 {
        if !self.is_alive() || amount <= 0.0 {
            return 0.0;
        }
        let damage = self.effective_damage(amount, tuning);
        self.hp -= damage;

        let threshold = tuning.boss.phase_two_threshold * self.max_hp;
        if let Some(boss) = self.boss.as_mut() {
            if self.hp < threshold && boss.enter_phase_two(&tuning.boss) {
                log::info!("Boss {} entered phase 2 at {:.1}/{:.1} hp", self.id, self.hp, self.max_hp);
                if self.movement_mode == MovementMode::Stationary {
                    self.movement_mode = MovementMode::Chase;
                }
            }
        }
        damage
    }

    /// XP and currency for killing this mob
    pub fn reward(&self, tuning: &Tuning) -> Reward {
        let stats = self.stats(tuning);
        Reward {
            xp: stats.xp * self.level.max(1),
            currency: stats.currency,
            mob_name: stats.name.clone(),
        }
    }

    fn mark_vulnerable(&mut self, window: f32) {
        self.status.scan_vulnerable = true;
        self.status.vulnerable_timer = window;
    }

    fn update_vulnerability(&mut self, dt: f32) {
        if !self.status.scan_vulnerable {
            return;
        }
        self.status.vulnerable_timer -= dt;
        if self.status.vulnerable_timer <= 0.0 {
            self.status.scan_vulnerable = false;
            self.status.vulnerable_timer = 0.0;
        }
    }

    fn step_movement(&mut self, dt: f32, player_position: Vec3, stats: &ArchetypeStats) {
        if self.movement_mode != MovementMode::Chase || !self.is_alive() {
            return;
        }
        let to_player = ground(player_position) - ground(self.position);
        let dist = to_player.length();
        if dist < 1e-4 || dist > stats.activation_radius {
            return;
        }
        let dir = to_player / dist;
        let step = stats.speed * dt;

        let advance = match self.archetype {
            Archetype::Wisp if dist < stats.standoff => -step.min(stats.standoff - dist),
            Archetype::Wisp | Archetype::Boss => (dist - stats.standoff).clamp(0.0, step),
            Archetype::Mite | Archetype::Hunter | Archetype::Sentry => step.min(dist),
        };
        self.position.x += dir.x * advance;
        self.position.z += dir.y * advance;
    }
}

/// Bounded list of mobs plus the spawn queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobPool {
    mobs: Vec<Mob>,
    pending: Vec<SpawnRequest>,
    capacity: usize,
    next_id: u32,
}

impl MobPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            mobs: Vec::with_capacity(capacity),
            pending: Vec::new(),
            capacity,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.iter()
    }

    pub fn get(&self, slot: usize) -> Option<&Mob> {
        self.mobs.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Mob> {
        self.mobs.get_mut(slot)
    }

    /// Slot of the mob with the given id
    pub fn slot_of(&self, id: u32) -> Option<usize> {
        self.mobs.iter().position(|m| m.id == id)
    }

    pub fn pending(&self) -> &[SpawnRequest] {
        &self.pending
    }

    pub fn boss(&self) -> Option<&Mob> {
        self.mobs.iter().find(|m| m.archetype.is_boss())
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Mob] {
        &mut self.mobs
    }

    /// The boss together with the spawn queue it summons into
    pub(crate) fn boss_with_queue(&mut self) -> Option<(&mut Mob, &mut Vec<SpawnRequest>)> {
        let queue = &mut self.pending;
        self.mobs
            .iter_mut()
            .find(|m| m.archetype.is_boss())
            .map(move |boss| (boss, queue))
    }

    /// Queue a spawn for the start of the next tick
    pub fn request_spawn(&mut self, archetype: Archetype, position: Vec3, level: u32) {
        self.pending.push(SpawnRequest {
            archetype,
            position,
            level,
        });
    }

    /// Drop mobs whose death was handled on an earlier tick
    pub fn retire_dead(&mut self) -> usize {
        let before = self.mobs.len();
        self.mobs.retain(|m| !m.is_dead);
        before - self.mobs.len()
    }

    /// Move queued spawns into the active list
    ///
    /// Requests beyond capacity, and a second boss while one is present, are
    /// dropped and reported.
    pub fn merge_pending(&mut self, tuning: &Tuning, sink: &mut dyn EventSink) {
        if self.pending.is_empty() {
            return;
        }
        let mut dropped = 0usize;
        for request in std::mem::take(&mut self.pending) {
            if self.mobs.len() >= self.capacity {
                dropped += 1;
                continue;
            }
            if request.archetype.is_boss() && self.boss().is_some() {
                log::warn!("Ignoring boss spawn: a boss is already active");
                sink.notify("A second boss tried to enter and was turned away".to_string());
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            self.mobs.push(Mob::new(
                id,
                request.archetype,
                request.position,
                request.level,
                tuning,
            ));
        }
        if dropped > 0 {
            log::warn!(
                "Mob capacity {} reached, dropped {} spawn request(s)",
                self.capacity,
                dropped
            );
            sink.notify(format!("{dropped} spawn(s) dropped: too many hostiles"));
        }
    }

    /// Apply nominal damage to a slot; out-of-range or dead slots take nothing
    pub fn apply_damage(&mut self, slot: usize, amount: f32, tuning: &Tuning) -> f32 {
        self.mobs
            .get_mut(slot)
            .map(|mob| mob.take_damage(amount, tuning))
            .unwrap_or(0.0)
    }

    /// Force a movement mode. The boss cannot chase before phase 2.
    pub fn set_movement_mode(&mut self, slot: usize, mode: MovementMode) -> bool {
        let Some(mob) = self.mobs.get_mut(slot) else {
            return false;
        };
        if mode == MovementMode::Chase {
            if let Some(boss) = &mob.boss {
                if boss.phase < 2 {
                    return false;
                }
            }
        }
        mob.movement_mode = mode;
        true
    }

    /// Mark every living mob within `radius` band of `origin` as vulnerable
    pub fn mark_vulnerable_in_band(&mut self, origin: Vec3, inner: f32, outer: f32, window: f32) {
        for mob in self.mobs.iter_mut().filter(|m| m.is_alive()) {
            let dist = ground_distance(origin, mob.position);
            if dist >= inner && dist <= outer {
                mob.mark_vulnerable(window);
            }
        }
    }

    /// Count down vulnerability windows
    pub fn update_status(&mut self, dt: f32) {
        for mob in self.mobs.iter_mut() {
            mob.update_vulnerability(dt);
        }
    }

    /// Move chasing mobs, then push overlapping ones apart
    ///
    /// Neither step carries a mob into a blocked cell.
    pub fn update_movement(
        &mut self,
        dt: f32,
        player_position: Vec3,
        level: &dyn LevelOracle,
        tuning: &Tuning,
    ) {
        let cell_size = tuning.world.cell_size;
        for mob in self.mobs.iter_mut() {
            let stats = tuning.archetypes.get(mob.archetype);
            let before = mob.position;
            mob.step_movement(dt, player_position, stats);
            mob.position = slide_against_walls(level, before, mob.position, cell_size);
        }
        self.separate(tuning.world.separation_distance, level, cell_size);
    }

    fn separate(&mut self, min_dist: f32, level: &dyn LevelOracle, cell_size: f32) {
        let n = self.mobs.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.mobs.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];
                if !a.is_alive() || !b.is_alive() {
                    continue;
                }
                let a_moves = a.movement_mode == MovementMode::Chase;
                let b_moves = b.movement_mode == MovementMode::Chase;
                if !a_moves && !b_moves {
                    continue;
                }

                let delta = ground(b.position) - ground(a.position);
                let dist = delta.length();
                if dist >= min_dist {
                    continue;
                }
                // Exactly stacked: split along +X so the result is deterministic
                let normal = if dist > 1e-4 {
                    delta / dist
                } else {
                    glam::Vec2::X
                };
                let overlap = min_dist - dist;
                let (share_a, share_b) = match (a_moves, b_moves) {
                    (true, true) => (0.5, 0.5),
                    (true, false) => (1.0, 0.0),
                    _ => (0.0, 1.0),
                };
                let push = Vec3::new(normal.x, 0.0, normal.y) * overlap;
                let a_to = a.position - push * share_a;
                let b_to = b.position + push * share_b;
                a.position = slide_against_walls(level, a.position, a_to, cell_size);
                b.position = slide_against_walls(level, b.position, b_to, cell_size);
            }
        }
    }

    /// Run death handling for every mob at or below zero hp
    pub fn process_deaths(
        &mut self,
        tuning: &Tuning,
        player_level: u32,
        rng: &mut Pcg32,
        sink: &mut dyn EventSink,
    ) {
        for slot in 0..self.mobs.len() {
            if self.mobs[slot].hp <= 0.0 && !self.mobs[slot].is_dead {
                self.handle_death(slot, tuning, player_level, rng, sink);
            }
        }
    }

    /// Mark a slot dead and emit its reward, once
    ///
    /// Returns false when the slot was already handled, is still alive or does
    /// not exist. An infected host gets a single death-jump roll.
    pub fn handle_death(
        &mut self,
        slot: usize,
        tuning: &Tuning,
        player_level: u32,
        rng: &mut Pcg32,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some(mob) = self.mobs.get_mut(slot) else {
            return false;
        };
        if mob.is_dead || mob.hp > 0.0 {
            return false;
        }
        mob.is_dead = true;
        mob.hp = 0.0;
        let reward = mob.reward(tuning);
        let was_infected = mob.status.infected;
        mob.status.infected = false;

        log::debug!("{} {} died", reward.mob_name, mob.id);
        sink.reward(reward);

        if was_infected {
            if let Some(target) =
                contagion::death_jump(&mut self.mobs, slot, player_level, &tuning.contagion, rng)
            {
                log::debug!("Infection jumped from dying slot {slot} to slot {target}");
            }
        }
        true
    }

    /// Insert a mob immediately, bypassing the queue
    #[cfg(test)]
    pub(crate) fn insert_for_test(
        &mut self,
        archetype: Archetype,
        position: Vec3,
        level: u32,
        tuning: &Tuning,
    ) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.mobs.push(Mob::new(id, archetype, position, level, tuning));
        self.mobs.len() - 1
    }
}
