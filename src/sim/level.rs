//! Static level geometry as seen by the simulation
//!
//! The maze itself is generated elsewhere; the core only asks whether a grid
//! cell is blocked.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Read-only occupancy query over the level grid
pub trait LevelOracle {
    /// True when the cell is solid. Cells outside the grid should report blocked.
    fn is_blocked(&self, cell_x: i32, cell_z: i32) -> bool;
}

/// Map a world position to the grid cell containing it
#[inline]
pub fn world_to_cell(pos: Vec3, cell_size: f32) -> (i32, i32) {
    (
        (pos.x / cell_size).floor() as i32,
        (pos.z / cell_size).floor() as i32,
    )
}

/// Rectangular boolean grid, row-major by z
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridLevel {
    width: i32,
    depth: i32,
    cells: Vec<bool>,
}

impl GridLevel {
    /// Fully open grid
    pub fn open(width: i32, depth: i32) -> Self {
        let width = width.max(0);
        let depth = depth.max(0);
        Self {
            width,
            depth,
            cells: vec![false; (width * depth) as usize],
        }
    }

    /// Open grid ringed by a one-cell wall
    pub fn walled(width: i32, depth: i32) -> Self {
        let mut level = Self::open(width, depth);
        for x in 0..level.width {
            level.set_blocked(x, 0, true);
            level.set_blocked(x, level.depth - 1, true);
        }
        for z in 0..level.depth {
            level.set_blocked(0, z, true);
            level.set_blocked(level.width - 1, z, true);
        }
        level
    }

    /// Parse an ASCII map: `#` is a wall, anything else is open
    pub fn from_ascii(rows: &[&str]) -> Self {
        let depth = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut level = Self::open(width, depth);
        for (z, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    level.set_blocked(x as i32, z as i32, true);
                }
            }
        }
        level
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Mark a cell; out-of-range coordinates are ignored
    pub fn set_blocked(&mut self, cell_x: i32, cell_z: i32, blocked: bool) {
        if let Some(idx) = self.index(cell_x, cell_z) {
            self.cells[idx] = blocked;
        }
    }

    fn index(&self, cell_x: i32, cell_z: i32) -> Option<usize> {
        if cell_x < 0 || cell_z < 0 || cell_x >= self.width || cell_z >= self.depth {
            return None;
        }
        Some((cell_z * self.width + cell_x) as usize)
    }
}

impl LevelOracle for GridLevel {
    fn is_blocked(&self, cell_x: i32, cell_z: i32) -> bool {
        self.index(cell_x, cell_z)
            .map(|idx| self.cells[idx])
            .unwrap_or(true)
    }
}
