//! Deterministic simulation module
//!
//! All combat logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (mob list order, projectile slot order)
//! - No rendering or platform dependencies

pub mod boss;
pub mod collision;
pub mod contagion;
pub mod events;
pub mod level;
pub mod mob;
pub mod projectile;
pub mod scan;
pub mod state;
pub mod tick;

pub use boss::{AttackState, BossState};
pub use collision::{BeamOffset, beam_offset, line_of_sight};
pub use events::{BossStatus, EventSink, ImpactColor, Reward, SimEvent};
pub use level::{GridLevel, LevelOracle, world_to_cell};
pub use mob::{Archetype, Mob, MobPool, MovementMode, SpawnRequest, StatusEffects};
pub use projectile::{Projectile, ProjectilePool, WeaponKind};
pub use scan::ScanWave;
pub use state::Simulation;
pub use tick::{FrameClock, TickInput, tick};
