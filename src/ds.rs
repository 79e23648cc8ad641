// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::Cursor;

use binrw::BinReaderExt;
use glam::Mat4;

use crate::common_file_operations::{read_mat4, read_unicode256_count, reserve_count};
use crate::{ByteSpan, Result};

/// One sampled transform at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DsFrame {
    pub time: f32,
    pub transform: Mat4,
}

/// One dummy bone's frames.
#[derive(Debug, Clone)]
pub struct DsBoneTrack {
    pub name: String,
    pub frames: Vec<DsFrame>,
}

/// One named animation.
#[derive(Debug, Clone)]
pub struct DsAnimation {
    pub name: String,
    pub bones: Vec<DsBoneTrack>,
}

/// Dummy-bone animation (DS) file: a flat list of named animations with
/// unquantized matrix frames. No magic, no version branching.
#[derive(Debug)]
pub struct DsFile {
    pub animations: Vec<DsAnimation>,
}

impl DsFile {
    /// Reads an existing DS animation file.
    pub fn from_existing(buffer: ByteSpan) -> Result<Self> {
        let mut cursor = Cursor::new(buffer);

        let num_animations: u32 = cursor.read_le()?;
        let mut animations = Vec::with_capacity(reserve_count(num_animations));

        for _ in 0..num_animations {
            let name = read_unicode256_count(&mut cursor)?;
            // Block size is informational only; decoding never seeks by it
            let _block_size: u32 = cursor.read_le()?;
            let num_bones: u32 = cursor.read_le()?;

            let mut bones = Vec::with_capacity(reserve_count(num_bones));
            for _ in 0..num_bones {
                let bone_name = read_unicode256_count(&mut cursor)?;
                let num_frames: u32 = cursor.read_le()?;

                let mut frames = Vec::with_capacity(reserve_count(num_frames));
                for _ in 0..num_frames {
                    frames.push(DsFrame {
                        time: cursor.read_le()?,
                        transform: read_mat4(&mut cursor, true)?,
                    });
                }

                bones.push(DsBoneTrack {
                    name: bone_name,
                    frames,
                });
            }

            animations.push(DsAnimation { name, bones });
        }

        Ok(Self { animations })
    }
}
