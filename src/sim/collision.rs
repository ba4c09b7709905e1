//! Collision primitives
//!
//! Sphere tests for projectiles against mobs, ground-plane beam geometry for
//! the boss, and grid ray marching for walls and line of sight.

use glam::{Vec2, Vec3};

use super::level::{LevelOracle, world_to_cell};
use crate::{ground, heading};

/// Point inside a sphere
#[inline]
pub fn sphere_hit(point: Vec3, center: Vec3, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Closest point to `center` on the segment `start..end`
#[inline]
pub fn closest_on_segment(start: Vec3, end: Vec3, center: Vec3) -> Vec3 {
    let seg = end - start;
    let len_sq = seg.length_squared();
    if len_sq < 1e-12 {
        return start;
    }
    let t = ((center - start).dot(seg) / len_sq).clamp(0.0, 1.0);
    start + seg * t
}

/// Swept point against a sphere
///
/// Returns where the path `start..end` comes closest to `center` if that is
/// within `radius`, so fast shots cannot step over small hitboxes.
pub fn segment_sphere_hit(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> Option<Vec3> {
    let closest = closest_on_segment(start, end, center);
    sphere_hit(closest, center, radius).then_some(closest)
}

/// Point inside a blocked level cell
#[inline]
pub fn wall_hit(level: &dyn LevelOracle, point: Vec3, cell_size: f32) -> bool {
    let (cx, cz) = world_to_cell(point, cell_size);
    level.is_blocked(cx, cz)
}

/// Point at or below the floor plane
#[inline]
pub fn floor_hit(point: Vec3, floor_y: f32) -> bool {
    point.y <= floor_y
}

/// Move from `from` to `to` without entering a blocked cell
///
/// A blocked move slides along one axis when the other is free. A mob that
/// already stands in a blocked cell moves freely so it can get out.
pub fn slide_against_walls(level: &dyn LevelOracle, from: Vec3, to: Vec3, cell_size: f32) -> Vec3 {
    if !wall_hit(level, to, cell_size) || wall_hit(level, from, cell_size) {
        return to;
    }
    let x_only = Vec3::new(to.x, to.y, from.z);
    if !wall_hit(level, x_only, cell_size) {
        return x_only;
    }
    let z_only = Vec3::new(from.x, to.y, to.z);
    if !wall_hit(level, z_only, cell_size) {
        return z_only;
    }
    Vec3::new(from.x, to.y, from.z)
}

/// Where a target sits relative to a beam on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamOffset {
    /// Distance along the beam (negative = behind the emitter)
    pub along: f32,
    /// Perpendicular distance from the beam axis
    pub perpendicular: f32,
}

/// Decompose `target - origin` against a beam pointing at `facing` radians
pub fn beam_offset(origin: Vec3, facing: f32, target: Vec3) -> BeamOffset {
    let dir = heading(facing);
    let to_target = ground(target) - ground(origin);
    let along = to_target.dot(dir);
    let perpendicular = (to_target - dir * along).length();
    BeamOffset {
        along,
        perpendicular,
    }
}

/// Ray march across the level grid between two points
///
/// Returns false as soon as a sample lands in a blocked cell. The start and
/// end cells are not sampled, so an emitter standing flush against a wall
/// still sees out.
pub fn line_of_sight(
    level: &dyn LevelOracle,
    from: Vec3,
    to: Vec3,
    cell_size: f32,
    step: f32,
) -> bool {
    let start = ground(from);
    let end = ground(to);
    let delta = end - start;
    let total_dist = delta.length();
    if total_dist < 0.001 {
        return true;
    }
    let dir = delta / total_dist;
    let step = step.max(0.01);

    let start_cell = cell_of(start, cell_size);
    let end_cell = cell_of(end, cell_size);

    let mut t = step;
    while t < total_dist {
        let cell = cell_of(start + dir * t, cell_size);
        if cell != start_cell && cell != end_cell && level.is_blocked(cell.0, cell.1) {
            return false;
        }
        t += step;
    }
    true
}

#[inline]
fn cell_of(p: Vec2, cell_size: f32) -> (i32, i32) {
    world_to_cell(Vec3::new(p.x, 0.0, p.y), cell_size)
}
