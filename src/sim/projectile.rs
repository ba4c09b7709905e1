//! Projectile ring buffer
//!
//! Fixed slot array written at a wrapping cursor. A new shot always takes the
//! cursor slot, even when the shot already there is still flying.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{floor_hit, segment_sphere_hit, wall_hit};
use super::contagion;
use super::events::{EventSink, ImpactColor};
use super::level::LevelOracle;
use super::mob::MobPool;
use crate::tuning::{ProjectileTuning, Tuning};

/// Weapon that fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Kinetic,
    /// Low damage, infects what it hits
    Viral,
}

impl WeaponKind {
    pub fn speed(self, tuning: &ProjectileTuning) -> f32 {
        match self {
            WeaponKind::Kinetic => tuning.kinetic_speed,
            WeaponKind::Viral => tuning.viral_speed,
        }
    }

    /// Nominal damage at a player level, before target modifiers
    pub fn damage(self, player_level: u32, tuning: &ProjectileTuning) -> f32 {
        let level = player_level as f32;
        match self {
            WeaponKind::Kinetic => {
                tuning.kinetic_base_damage + tuning.kinetic_damage_per_level * level
            }
            WeaponKind::Viral => tuning.viral_base_damage + tuning.viral_damage_per_level * level,
        }
    }
}

/// A projectile slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left; the slot is inert at or below zero
    pub remaining_life: f32,
    pub weapon_kind: WeaponKind,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            remaining_life: 0.0,
            weapon_kind: WeaponKind::Kinetic,
        }
    }
}

impl Projectile {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining_life > 0.0
    }

    fn deactivate(&mut self) {
        self.remaining_life = 0.0;
    }
}

/// What a projectile struck this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Mob(usize),
    Wall,
    Floor,
}

/// Fixed-capacity projectile pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectilePool {
    slots: Vec<Projectile>,
    cursor: usize,
}

impl ProjectilePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Projectile::default(); capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next shot will be written to
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slots(&self) -> &[Projectile] {
        &self.slots
    }

    pub fn get(&self, slot: usize) -> Option<&Projectile> {
        self.slots.get(slot)
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|p| p.is_active()).count()
    }

    /// Write a shot at the cursor and advance it, returning the slot used
    pub fn fire(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        weapon_kind: WeaponKind,
        tuning: &ProjectileTuning,
    ) -> usize {
        let dir = direction.try_normalize().unwrap_or(Vec3::X);
        let slot = self.cursor;
        self.slots[slot] = Projectile {
            position: origin,
            velocity: dir * weapon_kind.speed(tuning),
            remaining_life: tuning.life,
            weapon_kind,
        };
        self.cursor = (self.cursor + 1) % self.slots.len();
        slot
    }

    /// Advance every live projectile and resolve its first collision
    ///
    /// Order per slot: mobs, then level walls, then the floor. Mobs are tested
    /// along the whole path covered this tick, so a fast shot cannot skip
    /// over one. A hit ends the projectile at the contact point.
    pub fn step(
        &mut self,
        dt: f32,
        mobs: &mut MobPool,
        level: &dyn LevelOracle,
        tuning: &Tuning,
        player_level: u32,
        sink: &mut dyn EventSink,
    ) {
        for projectile in self.slots.iter_mut() {
            if !projectile.is_active() {
                continue;
            }

            projectile.remaining_life -= dt;
            if projectile.remaining_life <= 0.0 {
                projectile.deactivate();
                continue;
            }

            let start = projectile.position;
            projectile.position += projectile.velocity * dt;

            let Some((hit, at)) = find_hit(start, projectile.position, mobs, level, tuning)
            else {
                continue;
            };
            projectile.deactivate();
            projectile.position = at;

            let color = match hit {
                Hit::Mob(idx) => {
                    let weapon = projectile.weapon_kind;
                    let damage = weapon.damage(player_level, &tuning.projectile);
                    mobs.apply_damage(idx, damage, tuning);
                    if weapon == WeaponKind::Viral && player_level >= tuning.contagion.unlock_level
                    {
                        if let Some(mob) = mobs.get_mut(idx).filter(|m| m.is_alive()) {
                            contagion::infect(mob, &tuning.contagion);
                        }
                    }
                    ImpactColor::for_mob_hit(weapon)
                }
                Hit::Wall => ImpactColor::Wall,
                Hit::Floor => ImpactColor::Floor,
            };
            sink.impact(projectile.position, color);
        }
    }
}

/// First collision along this tick's path, and where it happened
///
/// Mobs are swept over `start..end` in list order; walls and the floor are
/// checked at `end`.
fn find_hit(
    start: Vec3,
    end: Vec3,
    mobs: &MobPool,
    level: &dyn LevelOracle,
    tuning: &Tuning,
) -> Option<(Hit, Vec3)> {
    let mob_hit = mobs.iter().enumerate().find_map(|(idx, mob)| {
        if !mob.is_alive() {
            return None;
        }
        segment_sphere_hit(start, end, mob.position, mob.hitbox_radius(tuning))
            .map(|at| (Hit::Mob(idx), at))
    });
    if mob_hit.is_some() {
        return mob_hit;
    }
    if wall_hit(level, end, tuning.world.cell_size) {
        return Some((Hit::Wall, end));
    }
    if floor_hit(end, tuning.world.floor_y) {
        return Some((Hit::Floor, end));
    }
    None
}
