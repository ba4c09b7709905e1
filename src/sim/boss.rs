//! Boss encounter state machine
//!
//! The boss cycles Idle → Charging → Firing → Cooldown, turning to track the
//! player and sweeping a beam while firing. Dropping below the phase threshold
//! makes it mobile and starts periodic minion summons. All encounter state,
//! including one-shot announcement flags, lives on the boss entity.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{beam_offset, line_of_sight, wall_hit};
use super::events::EventSink;
use super::level::LevelOracle;
use super::mob::{Archetype, Mob, SpawnRequest};
use crate::tuning::{BossTuning, Tuning};
use crate::{ground, heading, turn_toward};

/// Attack cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttackState {
    Idle,
    Charging,
    Firing,
    Cooldown,
    /// Unrecognised tag from a restored snapshot
    Unknown,
}

impl AttackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackState::Idle => "Idle",
            AttackState::Charging => "Charging",
            AttackState::Firing => "Firing",
            AttackState::Cooldown => "Cooldown",
            AttackState::Unknown => "Unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Idle" => AttackState::Idle,
            "Charging" => AttackState::Charging,
            "Firing" => AttackState::Firing,
            "Cooldown" => AttackState::Cooldown,
            _ => AttackState::Unknown,
        }
    }

    fn next(self) -> Self {
        match self {
            AttackState::Idle => AttackState::Charging,
            AttackState::Charging => AttackState::Firing,
            AttackState::Firing => AttackState::Cooldown,
            AttackState::Cooldown | AttackState::Unknown => AttackState::Idle,
        }
    }

    fn dwell(self, tuning: &BossTuning) -> f32 {
        match self {
            AttackState::Idle | AttackState::Unknown => tuning.idle_time,
            AttackState::Charging => tuning.charging_time,
            AttackState::Firing => tuning.firing_time,
            AttackState::Cooldown => tuning.cooldown_time,
        }
    }
}

impl From<String> for AttackState {
    fn from(tag: String) -> Self {
        AttackState::from_tag(&tag)
    }
}

impl From<AttackState> for String {
    fn from(state: AttackState) -> Self {
        state.as_str().to_string()
    }
}

/// Encounter state carried by the boss mob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossState {
    /// 1 or 2; never goes back down
    pub phase: u8,
    pub attack_state: AttackState,
    /// Seconds left in the current attack state
    pub attack_timer: f32,
    /// Ground-plane heading in radians (0 = +X)
    pub facing: f32,
    /// Seconds until the next summon (phase 2 only)
    pub summon_timer: f32,
    #[serde(default)]
    pub announced_arrival: bool,
    #[serde(default)]
    pub announced_phase_two: bool,
}

impl BossState {
    pub fn new(tuning: &BossTuning) -> Self {
        Self {
            phase: 1,
            attack_state: AttackState::Idle,
            attack_timer: tuning.idle_time,
            facing: 0.0,
            summon_timer: 0.0,
            announced_arrival: false,
            announced_phase_two: false,
        }
    }

    /// Escalate to phase 2. Returns false if already there.
    pub fn enter_phase_two(&mut self, tuning: &BossTuning) -> bool {
        if self.phase >= 2 {
            return false;
        }
        self.phase = 2;
        self.summon_timer = tuning.summon_interval;
        true
    }

    /// Unit beam direction in world space
    pub fn beam_direction(&self) -> Vec3 {
        let dir = heading(self.facing);
        Vec3::new(dir.x, 0.0, dir.y)
    }
}

/// Whether the beam from `origin` along `facing` reaches the player
pub fn player_in_beam(
    origin: Vec3,
    facing: f32,
    player_position: Vec3,
    level: &dyn LevelOracle,
    tuning: &Tuning,
) -> bool {
    let offset = beam_offset(origin, facing, player_position);
    if offset.along < 0.0 || offset.along > tuning.boss.beam_range {
        return false;
    }
    if offset.perpendicular >= tuning.boss.beam_width {
        return false;
    }
    line_of_sight(
        level,
        origin,
        player_position,
        tuning.world.cell_size,
        tuning.world.los_step,
    )
}

/// Advance the boss by one tick
///
/// Summoned minions are pushed onto `spawn_queue` and join the fight on the
/// next tick.
#[allow(clippy::too_many_arguments)]
pub fn advance(
    mob: &mut Mob,
    spawn_queue: &mut Vec<SpawnRequest>,
    dt: f32,
    player_position: Vec3,
    level: &dyn LevelOracle,
    tuning: &Tuning,
    rng: &mut Pcg32,
    sink: &mut dyn EventSink,
) {
    if !mob.is_alive() {
        return;
    }
    let name = &tuning.archetypes.get(mob.archetype).name;
    let origin = mob.position;
    let Some(boss) = mob.boss.as_mut() else {
        return;
    };

    if !boss.announced_arrival {
        boss.announced_arrival = true;
        sink.notify(format!("{name} stirs in the dark"));
    }
    if boss.phase >= 2 && !boss.announced_phase_two {
        boss.announced_phase_two = true;
        sink.notify(format!("{name} tears free of its anchor!"));
    }

    let to_player = ground(player_position) - ground(origin);
    if to_player.length_squared() > 1e-8 {
        let target = to_player.y.atan2(to_player.x);
        let rate = if boss.attack_state == AttackState::Firing {
            tuning.boss.firing_turn_rate
        } else {
            tuning.boss.turn_rate
        };
        boss.facing = turn_toward(boss.facing, target, rate * dt);
    }

    match boss.attack_state {
        AttackState::Unknown => {
            log::warn!("Boss {} had an unknown attack state; resetting to Idle", mob.id);
            sink.notify(format!("{name} falters"));
            boss.attack_state = AttackState::Idle;
            boss.attack_timer = AttackState::Idle.dwell(&tuning.boss);
        }
        state => {
            if state == AttackState::Firing
                && player_in_beam(origin, boss.facing, player_position, level, tuning)
            {
                sink.player_damaged(tuning.boss.beam_dps * dt);
            }
            boss.attack_timer -= dt;
            if boss.attack_timer <= 0.0 {
                let next = state.next();
                log::debug!("Boss {:?} -> {:?}", state, next);
                boss.attack_state = next;
                boss.attack_timer = next.dwell(&tuning.boss);
            }
        }
    }

    if boss.phase >= 2 {
        boss.summon_timer -= dt;
        if boss.summon_timer <= 0.0 {
            boss.summon_timer += tuning.boss.summon_interval.max(dt);
            let count = summon(origin, mob.level, level, tuning, rng, spawn_queue);
            log::info!("Boss {} summoned {} minions", mob.id, count);
            if count > 0 {
                sink.notify(format!("{name} calls {count} minions from the walls"));
            }
        }
    }
}

/// Placement attempts per minion before it is given up
const SUMMON_PLACEMENT_TRIES: u32 = 4;

/// Queue 3-5 minions at random open spots around the boss
///
/// Returns how many were actually queued; a minion with no open spot after
/// a few tries is skipped.
fn summon(
    origin: Vec3,
    mob_level: u32,
    level: &dyn LevelOracle,
    tuning: &Tuning,
    rng: &mut Pcg32,
    spawn_queue: &mut Vec<SpawnRequest>,
) -> u32 {
    let boss = &tuning.boss;
    let lo = boss.summon_min;
    let hi = boss.summon_max.max(lo);
    let wanted = rng.random_range(lo..=hi);
    let mut queued = 0;
    for _ in 0..wanted {
        let archetype = if rng.random_bool(0.3) {
            Archetype::Wisp
        } else {
            Archetype::Mite
        };
        let spot = (0..SUMMON_PLACEMENT_TRIES)
            .map(|_| summon_spot(origin, boss, rng))
            .find(|&spot| !wall_hit(level, spot, tuning.world.cell_size));
        let Some(position) = spot else {
            log::debug!("No open spot for a summoned {archetype:?} near {origin}");
            continue;
        };
        spawn_queue.push(SpawnRequest {
            archetype,
            position,
            level: mob_level,
        });
        queued += 1;
    }
    queued
}

fn summon_spot(origin: Vec3, tuning: &BossTuning, rng: &mut Pcg32) -> Vec3 {
    let angle = rng.random_range(0.0..TAU);
    let radius = if tuning.summon_radius_max > tuning.summon_radius_min {
        rng.random_range(tuning.summon_radius_min..tuning.summon_radius_max)
    } else {
        tuning.summon_radius_min
    };
    let offset = heading(angle) * radius;
    origin + Vec3::new(offset.x, 0.0, offset.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground_distance;
    use crate::sim::events::SimEvent;
    use crate::sim::level::GridLevel;
    use rand::SeedableRng;

    struct Rig {
        tuning: Tuning,
        boss: Mob,
        queue: Vec<SpawnRequest>,
        level: GridLevel,
        rng: Pcg32,
        events: Vec<SimEvent>,
    }

    impl Rig {
        fn new() -> Self {
            let tuning = Tuning::default();
            let boss = Mob::new(1, Archetype::Boss, Vec3::new(20.0, 1.0, 20.0), 1, &tuning);
            Self {
                tuning,
                boss,
                queue: Vec::new(),
                level: GridLevel::open(40, 40),
                rng: Pcg32::seed_from_u64(42),
                events: Vec::new(),
            }
        }

        fn step(&mut self, dt: f32, player: Vec3) {
            advance(
                &mut self.boss,
                &mut self.queue,
                dt,
                player,
                &self.level,
                &self.tuning,
                &mut self.rng,
                &mut self.events,
            );
        }

        fn state(&self) -> &BossState {
            self.boss.boss.as_ref().unwrap()
        }

        fn state_mut(&mut self) -> &mut BossState {
            self.boss.boss.as_mut().unwrap()
        }

        fn beam_damage(&self) -> f32 {
            self.events
                .iter()
                .filter_map(|e| match e {
                    SimEvent::PlayerDamaged { amount } => Some(*amount),
                    _ => None,
                })
                .sum()
        }
    }

    // Directly down +X from the boss, so facing 0 points at the player
    const PLAYER: Vec3 = Vec3::new(30.0, 1.0, 20.0);

    #[test]
    fn test_attack_cycle_dwell_times() {
        let mut rig = Rig::new();
        let mut seen = vec![rig.state().attack_state];
        // 10 seconds covers one full cycle
        for _ in 0..20 {
            rig.step(0.5, PLAYER);
            let state = rig.state().attack_state;
            if *seen.last().unwrap() != state {
                seen.push(state);
            }
        }
        assert_eq!(
            seen,
            vec![
                AttackState::Idle,
                AttackState::Charging,
                AttackState::Firing,
                AttackState::Cooldown,
                AttackState::Idle,
            ]
        );
    }

    #[test]
    fn test_state_transitions_land_on_schedule() {
        let mut rig = Rig::new();
        rig.step(0.5, PLAYER);
        assert_eq!(rig.state().attack_state, AttackState::Idle);
        rig.step(0.5, PLAYER);
        assert_eq!(rig.state().attack_state, AttackState::Charging);
        for _ in 0..4 {
            rig.step(0.5, PLAYER);
        }
        assert_eq!(rig.state().attack_state, AttackState::Firing);
        for _ in 0..8 {
            rig.step(0.5, PLAYER);
        }
        assert_eq!(rig.state().attack_state, AttackState::Cooldown);
        for _ in 0..6 {
            rig.step(0.5, PLAYER);
        }
        assert_eq!(rig.state().attack_state, AttackState::Idle);
    }

    #[test]
    fn test_facing_turns_slower_while_firing() {
        let mut rig = Rig::new();
        // Player straight along +Z: target heading π/2
        let player = Vec3::new(20.0, 1.0, 30.0);
        rig.step(0.1, player);
        let idle_turn = rig.state().facing;
        assert!((idle_turn - rig.tuning.boss.turn_rate * 0.1).abs() < 1e-5);

        let mut rig = Rig::new();
        rig.state_mut().attack_state = AttackState::Firing;
        rig.state_mut().attack_timer = 4.0;
        rig.step(0.1, player);
        let firing_turn = rig.state().facing;
        assert!((firing_turn - rig.tuning.boss.firing_turn_rate * 0.1).abs() < 1e-5);
        assert!(firing_turn < idle_turn);
    }

    #[test]
    fn test_facing_takes_shortest_arc() {
        let mut rig = Rig::new();
        rig.state_mut().facing = 3.0;
        // Player behind-left at heading ≈ -3.0; shortest way is through ±π
        let player = Vec3::new(20.0 + 10.0 * (-3.0f32).cos(), 1.0, 20.0 + 10.0 * (-3.0f32).sin());
        rig.step(0.1, player);
        assert!(rig.state().facing > 3.0 || rig.state().facing < -3.0);
    }

    #[test]
    fn test_beam_hits_aligned_player_with_clear_line() {
        let mut rig = Rig::new();
        rig.state_mut().attack_state = AttackState::Firing;
        rig.state_mut().attack_timer = 4.0;
        rig.step(0.1, PLAYER);
        assert!((rig.beam_damage() - rig.tuning.boss.beam_dps * 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_beam_blocked_by_wall() {
        let mut rig = Rig::new();
        // Cell covering x 24..26, z 20..22 sits between boss and player
        rig.level.set_blocked(12, 10, true);
        rig.state_mut().attack_state = AttackState::Firing;
        rig.state_mut().attack_timer = 4.0;
        rig.step(0.1, PLAYER);
        assert_eq!(rig.beam_damage(), 0.0);
    }

    #[test]
    fn test_beam_misses_off_axis_and_out_of_range() {
        let tuning = Tuning::default();
        let level = GridLevel::open(200, 200);
        let origin = Vec3::new(20.0, 1.0, 20.0);
        assert!(player_in_beam(origin, 0.0, Vec3::new(30.0, 1.0, 20.5), &level, &tuning));
        assert!(!player_in_beam(origin, 0.0, Vec3::new(30.0, 1.0, 22.0), &level, &tuning));
        assert!(!player_in_beam(origin, 0.0, Vec3::new(60.0, 1.0, 20.0), &level, &tuning));
        assert!(!player_in_beam(origin, 0.0, Vec3::new(10.0, 1.0, 20.0), &level, &tuning));
    }

    #[test]
    fn test_no_beam_damage_outside_firing() {
        let mut rig = Rig::new();
        for _ in 0..5 {
            rig.step(0.5, PLAYER);
        }
        // Idle 1s then Charging 2s; still short of firing
        assert_eq!(rig.beam_damage(), 0.0);
    }

    #[test]
    fn test_unknown_state_resets_to_idle() {
        let mut rig = Rig::new();
        let json = r#"{
            "phase": 1,
            "attack_state": "Enraged",
            "attack_timer": 2.0,
            "facing": 0.0,
            "summon_timer": 0.0
        }"#;
        let restored: BossState = serde_json::from_str(json).unwrap();
        assert_eq!(restored.attack_state, AttackState::Unknown);
        rig.boss.boss = Some(restored);

        rig.step(0.1, PLAYER);
        assert_eq!(rig.state().attack_state, AttackState::Idle);
        assert_eq!(rig.state().attack_timer, rig.tuning.boss.idle_time);
        assert!(rig
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::Notification(msg) if msg.contains("falters"))));
    }

    #[test]
    fn test_attack_state_serializes_as_tag() {
        let json = serde_json::to_string(&AttackState::Charging).unwrap();
        assert_eq!(json, "\"Charging\"");
    }

    #[test]
    fn test_phase_two_summons_on_interval() {
        let mut rig = Rig::new();
        rig.step(1.0, PLAYER);
        assert!(rig.queue.is_empty());

        let boss_tuning = rig.tuning.boss.clone();
        assert!(rig.state_mut().enter_phase_two(&boss_tuning));
        for _ in 0..24 {
            rig.step(1.0, PLAYER);
        }
        assert!(rig.queue.is_empty());
        rig.step(1.0, PLAYER);
        let count = rig.queue.len();
        assert!((3..=5).contains(&count), "summoned {count}");
        for request in &rig.queue {
            let dist = ground_distance(request.position, rig.boss.position);
            assert!((2.99..=6.01).contains(&dist), "distance {dist}");
            assert!(matches!(request.archetype, Archetype::Mite | Archetype::Wisp));
            assert_eq!(request.level, rig.boss.level);
        }
    }

    #[test]
    fn test_summons_land_only_on_open_cells() {
        let mut rig = Rig::new();
        // Everything west of the boss (world x < 20) is solid rock
        for x in 0..10 {
            for z in 0..40 {
                rig.level.set_blocked(x, z, true);
            }
        }
        let boss_tuning = rig.tuning.boss.clone();
        rig.state_mut().enter_phase_two(&boss_tuning);
        rig.state_mut().summon_timer = 0.5;
        rig.step(1.0, PLAYER);

        assert!(!rig.queue.is_empty());
        assert!(rig.queue.len() <= 5);
        let cell_size = rig.tuning.world.cell_size;
        for request in &rig.queue {
            assert!(
                !wall_hit(&rig.level, request.position, cell_size),
                "minion placed in rock at {}",
                request.position
            );
        }
    }

    #[test]
    fn test_summons_skipped_when_no_room() {
        let mut rig = Rig::new();
        for x in 0..40 {
            for z in 0..40 {
                rig.level.set_blocked(x, z, true);
            }
        }
        let boss_tuning = rig.tuning.boss.clone();
        rig.state_mut().enter_phase_two(&boss_tuning);
        rig.state_mut().summon_timer = 0.5;
        rig.step(1.0, PLAYER);

        assert!(rig.queue.is_empty());
        assert!(!rig.events.iter().any(
            |e| matches!(e, SimEvent::Notification(m) if m.contains("minions"))
        ));
    }

    #[test]
    fn test_announcements_fire_once() {
        let mut rig = Rig::new();
        rig.step(0.1, PLAYER);
        rig.step(0.1, PLAYER);
        let boss_tuning = rig.tuning.boss.clone();
        rig.state_mut().enter_phase_two(&boss_tuning);
        rig.step(0.1, PLAYER);
        rig.step(0.1, PLAYER);
        let notes = rig
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::Notification(_)))
            .count();
        assert_eq!(notes, 2);
        assert!(rig.state().announced_arrival);
        assert!(rig.state().announced_phase_two);
    }

    #[test]
    fn test_dead_boss_does_nothing() {
        let mut rig = Rig::new();
        rig.boss.hp = 0.0;
        rig.step(5.0, PLAYER);
        assert!(rig.events.is_empty());
        assert_eq!(rig.state().attack_state, AttackState::Idle);
    }
}
