// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Read, Seek, SeekFrom};

use binrw::binrw;

use crate::{Error, Result};

/// The container header shared by the navigation mesh and MA animation
/// formats: three parallel arrays describing independently-addressable
/// objects by absolute byte offset, byte length and type tag.
#[binrw]
#[brw(little)]
#[derive(Debug)]
pub(crate) struct ObjectTable {
    pub num_objects: u32,

    #[br(count = num_objects)]
    pub offsets: Vec<u32>,
    #[br(count = num_objects)]
    pub lengths: Vec<u32>,
    #[br(count = num_objects)]
    pub class_ids: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectEntry {
    pub offset: u32,
    pub length: u32,
    pub class_id: u32,
}

impl ObjectTable {
    pub fn entries(&self) -> impl Iterator<Item = ObjectEntry> + '_ {
        (0..self.num_objects as usize).map(|i| ObjectEntry {
            offset: self.offsets[i],
            length: self.lengths[i],
            class_id: self.class_ids[i],
        })
    }
}

/// Seeks to an object, runs its decoder, and verifies that exactly the
/// declared number of bytes was consumed.
///
/// Decode failures are wrapped with the object's type and offset;
/// cancellation passes through untouched so callers can tell it apart
/// from corruption.
pub(crate) fn decode_object<R, T, F>(reader: &mut R, entry: ObjectEntry, decode: F) -> Result<T>
where
    R: Read + Seek,
    F: FnOnce(&mut R) -> Result<T>,
{
    reader.seek(SeekFrom::Start(entry.offset.into()))?;

    let value = decode(reader).map_err(|e| match e {
        Error::Cancelled => Error::Cancelled,
        other => Error::Object {
            type_id: entry.class_id,
            offset: entry.offset.into(),
            source: Box::new(other),
        },
    })?;

    let consumed = reader.stream_position()? - u64::from(entry.offset);
    if consumed != u64::from(entry.length) {
        return Err(Error::StructuralMismatch {
            type_id: entry.class_id,
            offset: entry.offset.into(),
            declared: entry.length.into(),
            actual: consumed,
        });
    }

    Ok(value)
}
