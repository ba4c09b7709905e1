//! Infection: damage over time that spreads between mobs
//!
//! An infected mob takes damage on a fixed cadence, occasionally jumps to a
//! random uninfected neighbour, and on death may hand the infection to the
//! nearest one. A mob carries at most one infection; re-infection only
//! refreshes its timer.

use rand::Rng;
use rand_pcg::Pcg32;

use super::mob::Mob;
use crate::ground_distance;
use crate::tuning::{ContagionTuning, Tuning};

/// Infect a mob, or refresh the timer if it already is
pub fn infect(mob: &mut Mob, tuning: &ContagionTuning) {
    if !mob.status.infected {
        mob.status.tick_accumulator = 0.0;
    }
    mob.status.infected = true;
    mob.status.infection_timer = tuning.duration;
}

/// Remove an infection outright
pub fn clear(mob: &mut Mob) {
    mob.status.infected = false;
    mob.status.infection_timer = 0.0;
    mob.status.tick_accumulator = 0.0;
}

#[inline]
fn susceptible(mob: &Mob) -> bool {
    mob.is_alive() && !mob.status.infected
}

/// Advance every infection by `dt`
///
/// Only mobs infected when the update starts act as hosts, so an infection
/// moves at most one hop per call. Hosts killed by a tick stay flagged as
/// infected so death handling can roll the death jump.
pub fn update(mobs: &mut [Mob], dt: f32, player_level: u32, tuning: &Tuning, rng: &mut Pcg32) {
    let contagion = &tuning.contagion;
    let hosts: Vec<usize> = (0..mobs.len())
        .filter(|&i| mobs[i].status.infected && mobs[i].is_alive())
        .collect();
    for host in hosts {
        if player_level < contagion.unlock_level {
            log::debug!(
                "Clearing infection on mob {}: player level {} is below {}",
                mobs[host].id,
                player_level,
                contagion.unlock_level
            );
            clear(&mut mobs[host]);
            continue;
        }

        tick_damage(&mut mobs[host], dt, player_level, tuning);

        if mobs[host].is_alive() && mobs[host].status.infected {
            try_spread(mobs, host, dt, player_level, contagion, rng);
        }
    }
}

fn tick_damage(mob: &mut Mob, dt: f32, player_level: u32, tuning: &Tuning) {
    let contagion = &tuning.contagion;
    let interval = contagion.tick_interval(player_level).max(1e-3);
    let amount = contagion.tick_damage(player_level);

    mob.status.tick_accumulator += dt;
    while mob.status.tick_accumulator >= interval && mob.is_alive() {
        mob.status.tick_accumulator -= interval;
        mob.take_damage(amount, tuning);
    }

    mob.status.infection_timer -= dt;
    if mob.is_alive() && mob.status.infection_timer <= 0.0 {
        clear(mob);
    }
}

/// Per-frame spread roll from a living host to a random neighbour in range
fn try_spread(
    mobs: &mut [Mob],
    host: usize,
    dt: f32,
    player_level: u32,
    tuning: &ContagionTuning,
    rng: &mut Pcg32,
) -> Option<usize> {
    if rng.random::<f32>() >= tuning.spread_attempt_rate * dt {
        return None;
    }
    let origin = mobs[host].position;
    let radius = tuning.radius(player_level);
    let candidates: Vec<usize> = (0..mobs.len())
        .filter(|&i| {
            i != host
                && susceptible(&mobs[i])
                && ground_distance(origin, mobs[i].position) <= radius
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let target = candidates[rng.random_range(0..candidates.len())];
    if rng.random::<f32>() >= tuning.spread_chance(player_level) {
        return None;
    }
    infect(&mut mobs[target], tuning);
    log::debug!("Infection spread from mob {} to mob {}", mobs[host].id, mobs[target].id);
    Some(target)
}

/// One-shot transfer from a dying host to its nearest uninfected neighbour
pub fn death_jump(
    mobs: &mut [Mob],
    host: usize,
    player_level: u32,
    tuning: &ContagionTuning,
    rng: &mut Pcg32,
) -> Option<usize> {
    let origin = mobs.get(host)?.position;
    if rng.random::<f32>() >= tuning.death_jump_chance(player_level) {
        return None;
    }
    let radius = tuning.radius(player_level);
    let target = (0..mobs.len())
        .filter(|&i| i != host && susceptible(&mobs[i]))
        .map(|i| (i, ground_distance(origin, mobs[i].position)))
        .filter(|&(_, dist)| dist <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)?;
    infect(&mut mobs[target], tuning);
    Some(target)
}
