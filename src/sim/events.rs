//! Outbound events
//!
//! The core pushes rewards, notifications, impacts and boss status into an
//! [`EventSink`] owned by the caller. It never reads anything back.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::projectile::WeaponKind;

/// XP and currency granted for a kill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u32,
    pub currency: u32,
    pub mob_name: String,
}

/// Read projection of the boss encounter for HUD consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossStatus {
    pub active: bool,
    pub name: String,
    pub hp: f32,
    pub max_hp: f32,
}

impl BossStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            name: String::new(),
            hp: 0.0,
            max_hp: 0.0,
        }
    }
}

/// Visual tag for an impact, keyed by weapon and what was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactColor {
    KineticHit,
    ViralHit,
    Wall,
    Floor,
}

impl ImpactColor {
    pub fn for_mob_hit(weapon: WeaponKind) -> Self {
        match weapon {
            WeaponKind::Kinetic => ImpactColor::KineticHit,
            WeaponKind::Viral => ImpactColor::ViralHit,
        }
    }

    /// Packed 0xRRGGBB for renderers
    pub fn rgb(self) -> u32 {
        match self {
            ImpactColor::KineticHit => 0xffc040,
            ImpactColor::ViralHit => 0x40ff70,
            ImpactColor::Wall => 0xa0a0a0,
            ImpactColor::Floor => 0x604830,
        }
    }
}

/// Receiver for everything the simulation reports
pub trait EventSink {
    fn reward(&mut self, reward: Reward);
    /// Free-form UI log line
    fn notify(&mut self, message: String);
    fn impact(&mut self, position: Vec3, color: ImpactColor);
    fn boss_status(&mut self, status: BossStatus);
    /// Boss beam damage to the player
    fn player_damaged(&mut self, amount: f32);
}

/// Recorded event, for sinks that just queue everything
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Reward(Reward),
    Notification(String),
    Impact { position: Vec3, color: ImpactColor },
    BossStatus(BossStatus),
    PlayerDamaged { amount: f32 },
}

impl EventSink for Vec<SimEvent> {
    fn reward(&mut self, reward: Reward) {
        self.push(SimEvent::Reward(reward));
    }

    fn notify(&mut self, message: String) {
        self.push(SimEvent::Notification(message));
    }

    fn impact(&mut self, position: Vec3, color: ImpactColor) {
        self.push(SimEvent::Impact { position, color });
    }

    fn boss_status(&mut self, status: BossStatus) {
        self.push(SimEvent::BossStatus(status));
    }

    fn player_damaged(&mut self, amount: f32) {
        self.push(SimEvent::PlayerDamaged { amount });
    }
}
