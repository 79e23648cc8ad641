// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Read, Seek, Write};

use binrw::{BinReaderExt, BinWriterExt};
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::{Error, Result};

/// Longest length-prefixed string the newer formats are known to store.
/// Anything larger is treated as a corrupt length field rather than allocated.
const MAX_STRING_UNITS: u32 = 4096;

/// Cap on speculative preallocation driven by counts read from a file. A
/// corrupt count then surfaces as `TruncatedData` on the first element read
/// instead of aborting on a multi-gigabyte reserve.
const PREALLOC_LIMIT: usize = 1 << 16;

pub(crate) fn reserve_count(count: u32) -> usize {
    (count as usize).min(PREALLOC_LIMIT)
}

pub(crate) fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedData
        } else {
            Error::Io(e)
        }
    })
}

/// Reads exactly `len` UTF-16 code units.
pub(crate) fn read_utf16_string<R: Read + Seek>(reader: &mut R, len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len * 2];
    read_exact(reader, &mut bytes)?;

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    String::from_utf16(&units).map_err(|_| Error::format("invalid UTF-16 string data"))
}

/// Reads the legacy fixed-buffer string encoding: a 32-bit code unit count
/// followed by a 256-unit UTF-16 buffer, of which only `count` units are used.
pub(crate) fn read_unicode256_count<R: Read + Seek>(reader: &mut R) -> Result<String> {
    let count: u32 = reader.read_le()?;
    if count > 256 {
        return Err(Error::format(format!(
            "string count {count} exceeds the fixed 256-unit buffer"
        )));
    }

    let mut bytes = [0u8; 512];
    read_exact(reader, &mut bytes)?;

    let units: Vec<u16> = bytes[..count as usize * 2]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    String::from_utf16(&units).map_err(|_| Error::format("invalid UTF-16 string data"))
}

/// Reads the newer explicit-length string encoding: a 32-bit code unit count
/// followed by exactly that many UTF-16 units.
pub(crate) fn read_len_prefixed_utf16<R: Read + Seek>(reader: &mut R) -> Result<String> {
    let len: u32 = reader.read_le()?;
    if len > MAX_STRING_UNITS {
        return Err(Error::format(format!("string length {len} out of range")));
    }

    read_utf16_string(reader, len as usize)
}

/// Writes a string as a 32-bit code unit count followed by UTF-16 units.
pub(crate) fn write_len_prefixed_utf16<W: Write + Seek>(
    writer: &mut W,
    value: &str,
) -> Result<()> {
    let units: Vec<u16> = value.encode_utf16().collect();
    writer.write_le(&(units.len() as u32))?;
    writer.write_le(&units)?;

    Ok(())
}

pub(crate) fn read_vec3<R: Read + Seek>(reader: &mut R) -> Result<Vec3> {
    let values: [f32; 3] = reader.read_le()?;
    Ok(Vec3::from_array(values))
}

pub(crate) fn read_vec4<R: Read + Seek>(reader: &mut R) -> Result<Vec4> {
    let values: [f32; 4] = reader.read_le()?;
    Ok(Vec4::from_array(values))
}

pub(crate) fn read_quat<R: Read + Seek>(reader: &mut R) -> Result<Quat> {
    let values: [f32; 4] = reader.read_le()?;
    Ok(Quat::from_xyzw(values[0], values[1], values[2], values[3]))
}

/// Reads 16 floats in storage order. When `column_major` is set each
/// consecutive group of four floats is one column, otherwise one row.
pub(crate) fn read_mat4<R: Read + Seek>(reader: &mut R, column_major: bool) -> Result<Mat4> {
    let values: [f32; 16] = reader.read_le()?;

    let matrix = Mat4::from_cols_array(&values);
    Ok(if column_major {
        matrix
    } else {
        matrix.transpose()
    })
}

/// Maps a quantized signed 16-bit component back to [-1, 1].
pub(crate) fn dequantize(value: i16) -> f32 {
    f32::from(value) / 32767.0
}

/// Converts a 16-bit tick time to seconds within a clip.
pub(crate) fn ticks_to_seconds(tick: u16, clip_length: f32) -> f32 {
    f32::from(tick) * clip_length / 65535.0
}
