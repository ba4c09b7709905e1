//! Fixed timestep simulation tick
//!
//! One call advances the whole combat world in a fixed order:
//! 1. retire mobs handled last tick, merge queued spawns
//! 2. vulnerability timers, scan waves, contagion, movement
//! 3. projectiles
//! 4. deaths and rewards
//! 5. boss encounter
//! 6. boss status projection

use glam::Vec3;

use super::boss;
use super::contagion;
use super::events::EventSink;
use super::level::LevelOracle;
use super::mob::MobPool;
use super::scan;
use super::state::{BossStatusTracker, Simulation, boss_status_of};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::tuning::Tuning;

/// Player telemetry for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub player_position: Vec3,
    pub player_level: u32,
}

/// Advance the simulation by one fixed timestep
pub fn tick(
    sim: &mut Simulation,
    input: &TickInput,
    level: &dyn LevelOracle,
    sink: &mut dyn EventSink,
    dt: f32,
) {
    let Simulation {
        tuning,
        projectiles,
        mobs,
        scans,
        rng,
        boss_tracker,
        time,
        ticks,
        ..
    } = sim;

    let retired = mobs.retire_dead();
    if retired > 0 {
        log::debug!("Retired {retired} dead mob(s)");
    }
    mobs.merge_pending(tuning, sink);

    // Count down before scanning so a fresh mark keeps its full window
    mobs.update_status(dt);
    scan::update(scans, dt, mobs, &tuning.scan);
    contagion::update(mobs.as_mut_slice(), dt, input.player_level, tuning, rng);
    mobs.update_movement(dt, input.player_position, level, tuning);

    projectiles.step(dt, mobs, level, tuning, input.player_level, sink);

    mobs.process_deaths(tuning, input.player_level, rng, sink);

    if let Some((boss_mob, queue)) = mobs.boss_with_queue() {
        boss::advance(
            boss_mob,
            queue,
            dt,
            input.player_position,
            level,
            tuning,
            rng,
            sink,
        );
    }

    publish_boss_status(mobs, tuning, boss_tracker, dt, sink);

    *time += dt;
    *ticks += 1;
}

/// Push boss status on activation changes, then on a fixed cadence while active
fn publish_boss_status(
    mobs: &MobPool,
    tuning: &Tuning,
    tracker: &mut BossStatusTracker,
    dt: f32,
    sink: &mut dyn EventSink,
) {
    let refresh = tuning.world.boss_status_refresh;
    let status = boss_status_of(mobs, tuning);

    if status.active != tracker.last_active {
        tracker.last_active = status.active;
        tracker.refresh_timer = refresh;
        sink.boss_status(status);
        return;
    }
    if !status.active {
        return;
    }

    tracker.refresh_timer -= dt;
    if tracker.refresh_timer <= 0.0 {
        tracker.refresh_timer += refresh.max(dt);
        sink.boss_status(status);
    }
}

/// Converts variable frame times into fixed ticks
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as many fixed ticks as the frame time allows, up to `MAX_SUBSTEPS`
    ///
    /// Returns the number of ticks run. Long frames are clamped so a stall
    /// does not snowball into ever longer catch-up bursts.
    pub fn advance(
        &mut self,
        frame_dt: f32,
        sim: &mut Simulation,
        input: &TickInput,
        level: &dyn LevelOracle,
        sink: &mut dyn EventSink,
    ) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, 0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(sim, input, level, sink, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Hit the substep cap: keep at most one tick of backlog
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    /// Drop any banked time (e.g. after a pause)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::AttackState;
    use crate::sim::events::{BossStatus, ImpactColor, SimEvent};
    use crate::sim::level::GridLevel;
    use crate::sim::mob::{Archetype, MovementMode};
    use crate::sim::projectile::WeaponKind;
    use crate::{Tuning, ground_distance};

    const BOSS_POS: Vec3 = Vec3::new(20.0, 1.0, 20.0);
    const PLAYER_POS: Vec3 = Vec3::new(30.0, 1.0, 20.0);

    fn input(level: u32) -> TickInput {
        TickInput {
            player_position: PLAYER_POS,
            player_level: level,
        }
    }

    fn boss_statuses(events: &[SimEvent]) -> Vec<&BossStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::BossStatus(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn beam_damage(events: &[SimEvent]) -> f32 {
        events
            .iter()
            .filter_map(|e| match e {
                SimEvent::PlayerDamaged { amount } => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Simulation with the boss already merged into the mob list
    fn boss_arena() -> (Simulation, GridLevel, Vec<SimEvent>) {
        let mut sim = Simulation::new(99, Tuning::default());
        let level = GridLevel::walled(40, 40);
        let mut events = Vec::new();
        sim.spawn(Archetype::Boss, BOSS_POS, 1);
        tick(&mut sim, &input(1), &level, &mut events, SIM_DT);
        (sim, level, events)
    }

    #[test]
    fn test_spawn_joins_next_tick() {
        let (sim, _, _) = boss_arena();
        assert_eq!(sim.mobs().len(), 1);
        assert!(sim.mobs().pending().is_empty());
        assert_eq!(sim.ticks(), 1);
    }

    #[test]
    fn test_boss_phase_two_scenario() {
        let (mut sim, level, mut events) = boss_arena();
        let slot = 0;
        assert_eq!(
            sim.mobs().get(slot).unwrap().movement_mode,
            MovementMode::Stationary
        );

        // 1500 nominal through 0.2 armour leaves 200 of 500
        let dealt = sim.apply_damage(slot, 1500.0);
        assert!((dealt - 300.0).abs() < 1e-3);
        let boss = sim.boss().unwrap();
        assert_eq!(boss.boss.as_ref().unwrap().phase, 2);
        assert_eq!(boss.movement_mode, MovementMode::Chase);

        // A second heavy hit does not re-enter phase 2
        sim.apply_damage(slot, 10.0);
        assert_eq!(sim.boss().unwrap().boss.as_ref().unwrap().phase, 2);

        let start = ground_distance(sim.boss().unwrap().position, PLAYER_POS);
        for _ in 0..30 {
            tick(&mut sim, &input(1), &level, &mut events, SIM_DT);
        }
        let boss = sim.boss().unwrap();
        let now = ground_distance(boss.position, PLAYER_POS);
        assert!(now < start, "boss should close in ({start} -> {now})");
        assert!(now >= sim.tuning().archetypes.boss.standoff - 1e-3);

        let phase_notes = events
            .iter()
            .filter(|e| matches!(e, SimEvent::Notification(m) if m.contains("tears free")))
            .count();
        assert_eq!(phase_notes, 1);
    }

    #[test]
    fn test_summons_join_on_following_tick() {
        let (mut sim, level, mut events) = boss_arena();
        sim.apply_damage(0, 1500.0);

        let mut queued = 0;
        for _ in 0..60 {
            tick(&mut sim, &input(1), &level, &mut events, 0.5);
            queued = sim.mobs().pending().len();
            if queued > 0 {
                break;
            }
        }
        assert!((3..=5).contains(&queued), "queued {queued}");
        assert_eq!(sim.mobs().len(), 1);

        tick(&mut sim, &input(1), &level, &mut events, 0.5);
        assert_eq!(sim.mobs().len(), 1 + queued);
        assert!(sim
            .mobs()
            .iter()
            .skip(1)
            .all(|m| matches!(m.archetype, Archetype::Mite | Archetype::Wisp)));
    }

    #[test]
    fn test_boss_status_cadence() {
        let mut sim = Simulation::new(3, Tuning::default());
        let level = GridLevel::walled(40, 40);
        let mut events = Vec::new();
        sim.spawn(Archetype::Boss, BOSS_POS, 1);

        for _ in 0..5 {
            tick(&mut sim, &input(1), &level, &mut events, 0.125);
        }
        // Activation push, then one every 0.25 s
        let pushes = boss_statuses(&events);
        assert_eq!(pushes.len(), 3);
        assert!(pushes.iter().all(|s| s.active));

        events.clear();
        sim.mobs.get_mut(0).unwrap().hp = 0.0;
        tick(&mut sim, &input(1), &level, &mut events, 0.125);
        let pushes = boss_statuses(&events);
        assert_eq!(pushes.len(), 1);
        assert!(!pushes[0].active);
        assert!(events.iter().any(|e| matches!(e, SimEvent::Reward(r) if r.xp == 250)));

        events.clear();
        for _ in 0..4 {
            tick(&mut sim, &input(1), &level, &mut events, 0.125);
        }
        assert!(boss_statuses(&events).is_empty());
        assert!(sim.mobs().is_empty());
    }

    #[test]
    fn test_beam_respects_walls() {
        let (mut open_sim, open_level, _) = boss_arena();
        let (mut walled_sim, mut walled_level, _) = boss_arena();
        // Cell between boss (10, 10) and player (15, 10)
        walled_level.set_blocked(12, 10, true);

        for sim in [&mut open_sim, &mut walled_sim] {
            let state = sim.mobs.get_mut(0).unwrap().boss.as_mut().unwrap();
            state.attack_state = AttackState::Firing;
            state.attack_timer = 4.0;
        }

        let mut open_events = Vec::new();
        let mut walled_events = Vec::new();
        tick(&mut open_sim, &input(1), &open_level, &mut open_events, 0.1);
        tick(&mut walled_sim, &input(1), &walled_level, &mut walled_events, 0.1);

        assert!((beam_damage(&open_events) - 1.5).abs() < 1e-4);
        assert_eq!(beam_damage(&walled_events), 0.0);
    }

    #[test]
    fn test_kill_is_rewarded_then_retired() {
        let mut sim = Simulation::new(5, Tuning::default());
        let level = GridLevel::open(40, 40);
        let mut events = Vec::new();
        // Player far enough that the mite never activates
        let input = TickInput {
            player_position: Vec3::new(10.0, 1.0, 40.0),
            player_level: 6,
        };
        sim.spawn(Archetype::Mite, Vec3::new(13.0, 1.0, 10.0), 1);
        tick(&mut sim, &input, &level, &mut events, SIM_DT);

        // Kinetic at level 6 deals 11, enough for a 10 hp mite
        sim.fire(Vec3::new(10.0, 1.0, 10.0), Vec3::X, WeaponKind::Kinetic);
        let mut killed_on = None;
        for i in 0..20 {
            tick(&mut sim, &input, &level, &mut events, SIM_DT);
            if events.iter().any(|e| matches!(e, SimEvent::Reward(_))) {
                killed_on = Some(i);
                break;
            }
        }
        assert!(killed_on.is_some());
        assert_eq!(sim.mobs().len(), 1);
        assert!(sim.mobs().get(0).unwrap().is_dead);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Impact {
                color: ImpactColor::KineticHit,
                ..
            }
        )));

        tick(&mut sim, &input, &level, &mut events, SIM_DT);
        assert!(sim.mobs().is_empty());
        let rewards = events
            .iter()
            .filter(|e| matches!(e, SimEvent::Reward(r) if r.xp == 5 && r.currency == 1))
            .count();
        assert_eq!(rewards, 1);
    }

    #[test]
    fn test_viral_shot_infects_at_unlock_level() {
        let mut sim = Simulation::new(5, Tuning::default());
        let level = GridLevel::open(40, 40);
        let mut events = Vec::new();
        let input = TickInput {
            player_position: Vec3::new(10.0, 1.0, 40.0),
            player_level: 5,
        };
        sim.spawn(Archetype::Sentry, Vec3::new(13.0, 1.0, 10.0), 1);
        tick(&mut sim, &input, &level, &mut events, SIM_DT);

        sim.fire(Vec3::new(10.0, 1.0, 10.0), Vec3::X, WeaponKind::Viral);
        for _ in 0..20 {
            tick(&mut sim, &input, &level, &mut events, SIM_DT);
        }
        let sentry = sim.mobs().get(0).unwrap();
        assert!(sentry.status.infected);
        // Viral hit for 1 + 0.5 * 5
        assert!((sentry.max_hp - sentry.hp - 3.5).abs() < 1e-3);
    }

    #[test]
    fn test_frame_clock_clamps_substeps() {
        let mut sim = Simulation::new(1, Tuning::default());
        let level = GridLevel::open(4, 4);
        let mut events = Vec::new();
        let mut clock = FrameClock::new();

        assert_eq!(clock.advance(SIM_DT, &mut sim, &input(1), &level, &mut events), 1);
        assert_eq!(clock.advance(0.5, &mut sim, &input(1), &level, &mut events), MAX_SUBSTEPS);
        clock.reset();
        assert_eq!(clock.advance(0.0, &mut sim, &input(1), &level, &mut events), 0);
        assert_eq!(sim.ticks(), 1 + MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_frame_clock_drops_backlog_after_stall() {
        let mut sim = Simulation::new(1, Tuning::default());
        let level = GridLevel::open(4, 4);
        let mut events = Vec::new();
        let mut clock = FrameClock::new();

        // A minute of slow frames, each banking more than the cap can drain
        for _ in 0..600 {
            clock.advance(0.1, &mut sim, &input(1), &level, &mut events);
        }
        let before = sim.ticks();
        let mut idle_ticks = 0;
        for _ in 0..10 {
            idle_ticks += clock.advance(0.0, &mut sim, &input(1), &level, &mut events);
        }
        assert!(idle_ticks <= 1, "ran {idle_ticks} ticks on empty frames");
        assert_eq!(sim.ticks(), before + u64::from(idle_ticks));
    }

    #[test]
    fn test_fresh_scan_mark_keeps_full_window() {
        let mut sim = Simulation::new(3, Tuning::default());
        let level = GridLevel::open(40, 40);
        let mut events = Vec::new();
        let input = TickInput {
            player_position: Vec3::new(10.0, 1.0, 40.0),
            player_level: 1,
        };
        sim.spawn(Archetype::Sentry, Vec3::new(13.0, 1.0, 10.0), 1);
        tick(&mut sim, &input, &level, &mut events, SIM_DT);

        // 20 u/s for 0.25 s: the ring reaches 5 and passes the sentry at 3
        sim.scan(Vec3::new(10.0, 1.0, 10.0));
        tick(&mut sim, &input, &level, &mut events, 0.25);

        let sentry = sim.mobs().get(0).unwrap();
        assert!(sentry.status.scan_vulnerable);
        assert_eq!(
            sentry.status.vulnerable_timer,
            sim.tuning().scan.vulnerable_window
        );
    }

    #[test]
    fn test_same_seed_same_run() {
        fn run(seed: u64) -> Vec<SimEvent> {
            let mut sim = Simulation::new(seed, Tuning::default());
            let level = GridLevel::walled(40, 40);
            let mut events = Vec::new();
            sim.spawn(Archetype::Boss, BOSS_POS, 1);
            for i in 0..6 {
                sim.spawn(Archetype::Mite, Vec3::new(6.0 + i as f32 * 4.0, 1.0, 8.0), 1);
            }
            tick(&mut sim, &input(8), &level, &mut events, 0.1);
            sim.apply_damage(0, 1500.0);
            for i in 0..400 {
                if i % 10 == 0 {
                    sim.fire(PLAYER_POS, Vec3::NEG_X, WeaponKind::Viral);
                }
                tick(&mut sim, &input(8), &level, &mut events, 0.1);
            }
            events
        }
        assert_eq!(run(1234), run(1234));
    }
}
