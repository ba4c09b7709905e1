//! Data-driven combat balance
//!
//! Loaded from JSON. Every field has a default, so a tuning file only needs to
//! name the values it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{CONTAGION_UNLOCK_LEVEL, M_MAX, P_MAX};
use crate::sim::Archetype;

/// Failure to read or parse a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tuning data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Pool capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolTuning {
    pub projectile_capacity: usize,
    pub mob_capacity: usize,
}

impl Default for PoolTuning {
    fn default() -> Self {
        Self {
            projectile_capacity: P_MAX,
            mob_capacity: M_MAX,
        }
    }
}

/// Weapon kinematics and damage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Seconds a shot lives if it never hits anything
    pub life: f32,
    pub kinetic_speed: f32,
    pub viral_speed: f32,
    pub kinetic_base_damage: f32,
    pub kinetic_damage_per_level: f32,
    pub viral_base_damage: f32,
    pub viral_damage_per_level: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            life: 100.0,
            kinetic_speed: 30.0,
            viral_speed: 20.0,
            kinetic_base_damage: 2.0,
            kinetic_damage_per_level: 1.5,
            viral_base_damage: 1.0,
            viral_damage_per_level: 0.5,
        }
    }
}

/// Per-archetype base stats (before level scaling)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeStats {
    pub name: String,
    pub base_hp: f32,
    /// Movement speed (units/sec)
    pub speed: f32,
    /// Chase only starts inside this radius
    pub activation_radius: f32,
    /// Minimum distance kept from the player (0 = none)
    pub standoff: f32,
    pub hitbox_radius: f32,
    pub xp: u32,
    pub currency: u32,
}

impl ArchetypeStats {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: &str,
        base_hp: f32,
        speed: f32,
        activation_radius: f32,
        standoff: f32,
        hitbox_radius: f32,
        xp: u32,
        currency: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_hp,
            speed,
            activation_radius,
            standoff,
            hitbox_radius,
            xp,
            currency,
        }
    }
}

/// Stats table keyed by archetype
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeTable {
    pub mite: ArchetypeStats,
    pub wisp: ArchetypeStats,
    pub hunter: ArchetypeStats,
    pub sentry: ArchetypeStats,
    pub boss: ArchetypeStats,
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self {
            mite: ArchetypeStats::new("Mite", 10.0, 3.0, 12.0, 0.0, 0.45, 5, 1),
            wisp: ArchetypeStats::new("Wisp", 8.0, 2.5, 14.0, 4.0, 0.5, 8, 2),
            hunter: ArchetypeStats::new("Hunter", 25.0, 2.0, 18.0, 0.0, 0.6, 15, 4),
            sentry: ArchetypeStats::new("Sentry", 40.0, 0.0, 0.0, 0.0, 0.8, 20, 5),
            // Boss hitbox covers its multi-part body
            boss: ArchetypeStats::new("The Warden", 500.0, 1.5, 40.0, 8.0, 2.5, 250, 100),
        }
    }
}

impl ArchetypeTable {
    pub fn get(&self, archetype: Archetype) -> &ArchetypeStats {
        match archetype {
            Archetype::Mite => &self.mite,
            Archetype::Wisp => &self.wisp,
            Archetype::Hunter => &self.hunter,
            Archetype::Sentry => &self.sentry,
            Archetype::Boss => &self.boss,
        }
    }
}

/// Infection (damage-over-time) behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContagionTuning {
    /// Player level below which infections are cleared
    pub unlock_level: u32,
    /// Seconds an infection lasts before it burns out
    pub duration: f32,
    pub base_interval: f32,
    pub interval_per_level: f32,
    pub min_interval: f32,
    /// Per-second chance a host tries to spread
    pub spread_attempt_rate: f32,
    pub spread_base: f32,
    pub spread_per_level: f32,
    pub death_jump_base: f32,
    pub death_jump_per_level: f32,
    pub radius_base: f32,
    pub radius_per_level: f32,
}

impl Default for ContagionTuning {
    fn default() -> Self {
        Self {
            unlock_level: CONTAGION_UNLOCK_LEVEL,
            duration: 8.0,
            base_interval: 2.0,
            interval_per_level: 0.1,
            min_interval: 0.5,
            spread_attempt_rate: 0.1,
            spread_base: 0.05,
            spread_per_level: 0.01,
            death_jump_base: 0.15,
            death_jump_per_level: 0.01,
            radius_base: 3.0,
            radius_per_level: 0.2,
        }
    }
}

impl ContagionTuning {
    /// Seconds between damage ticks
    pub fn tick_interval(&self, level: u32) -> f32 {
        (self.base_interval - self.interval_per_level * level as f32).max(self.min_interval)
    }

    /// Damage per tick, banded by player level
    pub fn tick_damage(&self, level: u32) -> f32 {
        match level {
            0..=2 => 2.0,
            3..=4 => 3.0,
            _ => 4.0,
        }
    }

    /// Reach of spread and death jumps
    pub fn radius(&self, level: u32) -> f32 {
        self.radius_base + self.radius_per_level * level as f32
    }

    pub fn spread_chance(&self, level: u32) -> f32 {
        self.spread_base + self.spread_per_level * level as f32
    }

    pub fn death_jump_chance(&self, level: u32) -> f32 {
        self.death_jump_base + self.death_jump_per_level * level as f32
    }
}

/// Boss encounter timings and beam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub idle_time: f32,
    pub charging_time: f32,
    pub firing_time: f32,
    pub cooldown_time: f32,
    /// Radians/sec
    pub turn_rate: f32,
    /// Slower while firing so the beam stays readable
    pub firing_turn_rate: f32,
    pub beam_dps: f32,
    pub beam_width: f32,
    pub beam_range: f32,
    /// Fraction of max hp below which phase 2 begins
    pub phase_two_threshold: f32,
    /// Fraction of damage that gets through the armour
    pub armor_factor: f32,
    pub summon_interval: f32,
    pub summon_min: u32,
    pub summon_max: u32,
    pub summon_radius_min: f32,
    pub summon_radius_max: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            idle_time: 1.0,
            charging_time: 2.0,
            firing_time: 4.0,
            cooldown_time: 3.0,
            turn_rate: 1.2,
            firing_turn_rate: 0.35,
            beam_dps: 15.0,
            beam_width: 1.0,
            beam_range: 30.0,
            phase_two_threshold: 0.6,
            armor_factor: 0.2,
            summon_interval: 25.0,
            summon_min: 3,
            summon_max: 5,
            summon_radius_min: 3.0,
            summon_radius_max: 6.0,
        }
    }
}

/// Scan wave
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanTuning {
    /// Growth of the wave front (units/sec)
    pub speed: f32,
    pub max_radius: f32,
    /// Seconds a scanned mob stays vulnerable
    pub vulnerable_window: f32,
}

impl Default for ScanTuning {
    fn default() -> Self {
        Self {
            speed: 20.0,
            max_radius: 25.0,
            vulnerable_window: 5.0,
        }
    }
}

/// World geometry and bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// World units per level-grid cell
    pub cell_size: f32,
    pub floor_y: f32,
    /// Mobs closer than this on the ground plane get pushed apart
    pub separation_distance: f32,
    /// Ray march step for line of sight (world units)
    pub los_step: f32,
    /// Minimum seconds between boss status pushes
    pub boss_status_refresh: f32,
    /// Extra hp fraction per floor level above 1
    pub level_hp_scale: f32,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            floor_y: 0.0,
            separation_distance: 0.8,
            los_step: 0.25,
            boss_status_refresh: 0.25,
            level_hp_scale: 0.25,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub pools: PoolTuning,
    pub projectile: ProjectileTuning,
    pub archetypes: ArchetypeTable,
    pub contagion: ContagionTuning,
    pub boss: BossTuning,
    pub scan: ScanTuning,
    pub world: WorldTuning,
}

impl Tuning {
    /// Parse tuning from a JSON string
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON (useful as a template for tuning files)
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and parse a tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load a tuning file, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(tuning) => {
                log::info!("Loaded tuning");
                tuning
            }
            Err(err) => {
                log::warn!("{err}; using default tuning");
                Self::default()
            }
        }
    }

    /// Max hp of an archetype spawned for a given floor level
    pub fn scaled_hp(&self, archetype: Archetype, level: u32) -> f32 {
        let multiplier = 1.0 + self.world.level_hp_scale * level.saturating_sub(1) as f32;
        self.archetypes.get(archetype).base_hp * multiplier
    }
}
