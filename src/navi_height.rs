// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use binrw::BinReaderExt;
use glam::Vec3;

use crate::common_file_operations::{read_vec3, reserve_count};
use crate::{ByteSpan, Error, Result, mip};

/// Vertical slack when probing the coarse table: a query this close under a
/// column's top resolves without touching the fine table.
const HEIGHT_TOLERANCE: f32 = 50.0;

/// One sample in either lookup table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightEntry {
    pub octree_index: i32,
    pub navi_index: i32,
    pub height: f32,
}

/// The result of a successful height probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightHit {
    pub height: f32,
    pub octree_index: i32,
    pub navi_index: i32,
}

/// Navigation height-grid file: a uniform grid of height samples over the
/// map, with a coarse per-column table and a fine per-cell table.
#[derive(Debug)]
pub struct NaviHeightFile {
    pub version: i32,
    pub step_xz: f32,
    pub step_y: f32,
    pub min: Vec3,

    max_y: HashMap<(i32, i32), HeightEntry>,
    full: HashMap<(i32, i32, i32), HeightEntry>,
}

impl NaviHeightFile {
    /// Reads an existing height-grid file from a MIP-wrapped buffer.
    pub fn from_existing(buffer: ByteSpan) -> Result<Self> {
        let raw = mip::decompress(buffer)?;
        let mut cursor = Cursor::new(raw.as_slice());

        let version: i32 = cursor.read_le()?;
        let step_xz: f32 = cursor.read_le()?;
        let step_y: f32 = cursor.read_le()?;
        if step_xz <= 0.0 || step_y <= 0.0 {
            return Err(Error::format("non-positive grid step"));
        }
        let min = read_vec3(&mut cursor)?;

        let max_y_count: u32 = cursor.read_le()?;
        let mut max_y = HashMap::with_capacity(reserve_count(max_y_count));
        for _ in 0..max_y_count {
            let ix: i32 = cursor.read_le()?;
            let iz: i32 = cursor.read_le()?;
            let entry = read_entry(&mut cursor)?;
            if max_y.insert((ix, iz), entry).is_some() {
                return Err(Error::format(format!(
                    "duplicate max-y column ({ix}, {iz})"
                )));
            }
        }

        let full_count: u32 = cursor.read_le()?;
        let mut full = HashMap::with_capacity(reserve_count(full_count));
        for _ in 0..full_count {
            let ix: i32 = cursor.read_le()?;
            let iy: i32 = cursor.read_le()?;
            let iz: i32 = cursor.read_le()?;
            let entry = read_entry(&mut cursor)?;
            if full.insert((ix, iy, iz), entry).is_some() {
                return Err(Error::format(format!(
                    "duplicate height cell ({ix}, {iy}, {iz})"
                )));
            }
        }

        tracing::debug!(
            version,
            columns = max_y.len(),
            cells = full.len(),
            "parsed height grid"
        );

        Ok(Self {
            version,
            step_xz,
            step_y,
            min,
            max_y,
            full,
        })
    }

    /// Reads an existing height-grid file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_existing(&std::fs::read(path)?)
    }

    pub fn num_columns(&self) -> usize {
        self.max_y.len()
    }

    pub fn num_cells(&self) -> usize {
        self.full.len()
    }

    /// Looks up the terrain height under a world position.
    ///
    /// The coarse per-column table answers first whenever the query is
    /// within [`HEIGHT_TOLERANCE`] below the column top; only queries near
    /// complex terrain fall through to the fine per-cell table.
    pub fn try_get_height(&self, world: Vec3) -> Option<HeightHit> {
        let ix = ((world.x - self.min.x) / self.step_xz).floor() as i32;
        let iz = ((world.z - self.min.z) / self.step_xz).floor() as i32;

        if let Some(entry) = self.max_y.get(&(ix, iz)) {
            if world.y + HEIGHT_TOLERANCE >= entry.height {
                return Some(hit(entry));
            }
        }

        let iy = ((world.y - self.min.y) / self.step_y).floor() as i32;
        self.full.get(&(ix, iy, iz)).map(hit)
    }
}

fn hit(entry: &HeightEntry) -> HeightHit {
    HeightHit {
        height: entry.height,
        octree_index: entry.octree_index,
        navi_index: entry.navi_index,
    }
}

fn read_entry(cursor: &mut Cursor<&[u8]>) -> Result<HeightEntry> {
    Ok(HeightEntry {
        octree_index: cursor.read_le()?,
        navi_index: cursor.read_le()?,
        height: cursor.read_le()?,
    })
}
