//! Dungeon Sim headless harness
//!
//! Runs a scripted encounter against the simulation core with no renderer:
//! a walled arena, a roster of hostiles plus the boss, and a player that
//! fires at the nearest target and scans on a timer.
//!
//! Usage: `dungeon-sim [tuning.json] [seed]`. Set `RUST_LOG=debug` for detail.

use glam::Vec3;

use dungeon_sim::Tuning;
use dungeon_sim::consts::SIM_DT;
use dungeon_sim::sim::{
    Archetype, BossStatus, EventSink, FrameClock, GridLevel, ImpactColor, Reward, Simulation,
    TickInput, WeaponKind,
};

const DEFAULT_SEED: u64 = 0x00D0_6E0A;
/// Simulated seconds to run
const RUN_SECONDS: f32 = 120.0;
const FIRE_INTERVAL: f32 = 0.25;
const SCAN_INTERVAL: f32 = 6.0;
const PLAYER_LEVEL: u32 = 6;

/// Event sink that keeps running totals for the summary
#[derive(Debug, Default)]
struct Tally {
    kills: u32,
    xp: u64,
    currency: u64,
    impacts: u32,
    mob_hits: u32,
    damage_taken: f32,
    boss_pushes: u32,
    last_boss: Option<BossStatus>,
}

impl EventSink for Tally {
    fn reward(&mut self, reward: Reward) {
        log::debug!("Killed {} (+{} xp, +{} gold)", reward.mob_name, reward.xp, reward.currency);
        self.kills += 1;
        self.xp += u64::from(reward.xp);
        self.currency += u64::from(reward.currency);
    }

    fn notify(&mut self, message: String) {
        log::info!("[notice] {message}");
    }

    fn impact(&mut self, _position: Vec3, color: ImpactColor) {
        self.impacts += 1;
        if matches!(color, ImpactColor::KineticHit | ImpactColor::ViralHit) {
            self.mob_hits += 1;
        }
    }

    fn boss_status(&mut self, status: BossStatus) {
        self.boss_pushes += 1;
        self.last_boss = Some(status);
    }

    fn player_damaged(&mut self, amount: f32) {
        self.damage_taken += amount;
    }
}

fn spawn_roster(sim: &mut Simulation, center: Vec3) {
    let ring = [
        (Archetype::Mite, 8.0, 0.0),
        (Archetype::Mite, 8.0, 1.2),
        (Archetype::Mite, 9.0, 2.4),
        (Archetype::Wisp, 10.0, 3.6),
        (Archetype::Wisp, 10.0, 4.8),
        (Archetype::Hunter, 12.0, 0.6),
        (Archetype::Hunter, 12.0, 3.0),
        (Archetype::Sentry, 6.0, 5.4),
    ];
    for (archetype, radius, angle) in ring {
        let offset = dungeon_sim::heading(angle) * radius;
        sim.spawn(archetype, center + Vec3::new(offset.x, 0.0, offset.y), 2);
    }
    sim.spawn(Archetype::Boss, center, 2);
}

fn nearest_target(sim: &Simulation, from: Vec3) -> Option<Vec3> {
    sim.mobs()
        .iter()
        .filter(|m| m.is_alive())
        .min_by(|a, b| {
            a.position
                .distance_squared(from)
                .total_cmp(&b.position.distance_squared(from))
        })
        .map(|m| m.position)
}

fn main() {
    env_logger::init();
    log::info!("Dungeon Sim (headless) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => Tuning::load_or_default(path),
        None => Tuning::default(),
    };
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);

    let level = GridLevel::walled(32, 32);
    let mut sim = Simulation::new(seed, tuning);
    let center = Vec3::new(32.0, 1.0, 32.0);
    spawn_roster(&mut sim, center);

    let input = TickInput {
        player_position: Vec3::new(32.0, 1.0, 8.0),
        player_level: PLAYER_LEVEL,
    };
    let mut clock = FrameClock::new();
    let mut tally = Tally::default();
    let mut fire_timer = 0.0;
    let mut scan_timer = 0.0;
    let mut shots = 0u32;

    // Alternate short and long frames to exercise substepping
    let frames = (RUN_SECONDS / SIM_DT) as u32;
    for frame in 0..frames {
        let frame_dt = if frame % 2 == 0 { SIM_DT * 0.5 } else { SIM_DT * 1.5 };
        clock.advance(frame_dt, &mut sim, &input, &level, &mut tally);

        fire_timer -= frame_dt;
        if fire_timer <= 0.0 {
            fire_timer += FIRE_INTERVAL;
            if let Some(target) = nearest_target(&sim, input.player_position) {
                let weapon = if shots % 3 == 2 {
                    WeaponKind::Viral
                } else {
                    WeaponKind::Kinetic
                };
                sim.fire(input.player_position, target - input.player_position, weapon);
                shots += 1;
            }
        }

        scan_timer -= frame_dt;
        if scan_timer <= 0.0 {
            scan_timer += SCAN_INTERVAL;
            sim.scan(input.player_position);
        }

        if sim.mobs().is_empty() && sim.mobs().pending().is_empty() {
            log::info!("Arena cleared after {:.1}s", sim.time());
            break;
        }
    }

    log::info!(
        "Ran {} ticks ({:.1}s simulated), seed {}",
        sim.ticks(),
        sim.time(),
        sim.seed()
    );
    log::info!(
        "Shots {}, impacts {} ({} on mobs), kills {}, xp {}, gold {}",
        shots,
        tally.impacts,
        tally.mob_hits,
        tally.kills,
        tally.xp,
        tally.currency
    );
    log::info!(
        "Beam damage taken {:.1}, boss status pushes {}",
        tally.damage_taken,
        tally.boss_pushes
    );
    match &tally.last_boss {
        Some(status) if status.active => log::info!(
            "{} still standing at {:.0}/{:.0}",
            status.name,
            status.hp,
            status.max_hp
        ),
        Some(_) => log::info!("Boss defeated"),
        None => log::info!("Boss never appeared"),
    }
    log::info!("{} hostiles remain", sim.mobs().iter().filter(|m| m.is_alive()).count());
}
