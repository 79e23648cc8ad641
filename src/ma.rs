// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Keyframe animation (MA) files: a `"DoBal"`-tagged object-table container
//! holding the clip length, one quantized track per animated bone, and named
//! bounding volumes.

use std::io::{Cursor, Read, Seek};

use binrw::BinReaderExt;
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::common::CancelToken;
use crate::common_file_operations::{
    dequantize, read_len_prefixed_utf16, read_mat4, read_quat, read_unicode256_count, read_vec3,
    read_vec4, reserve_count, ticks_to_seconds,
};
use crate::object_table::{ObjectTable, decode_object};
use crate::{ByteSpan, Error, Result};

pub(crate) const MAGIC: &[u8; 5] = b"DoBal";

const TYPE_CLIP_LENGTH: u32 = 0;
const TYPE_TRACK: u32 = 3;
const TYPE_BOUNDING_VOLUME: u32 = 7;

/// A single keyed sample. Times are always seconds; quantized encodings are
/// resolved at decode time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f32,
    pub value: T,
}

/// The fixed block used to reconstruct true-space values from a track's
/// quantized [-1, 1] keys. Carried as stored; the crate does not apply it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompressionBasis {
    pub matrices: [Mat4; 3],
    pub offset: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// A named time range within the clip. `wraps` marks ranges that span the
/// clip's end back to its start; they are kept as stored, never normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxWindow {
    pub start: f32,
    pub end: f32,
    pub wraps: bool,
}

/// Root-bone displacement data used for animation blending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveWeight {
    Full {
        start_time: f32,
        end_time: f32,
        start: Vec3,
        end: Vec3,
    },
    Delta {
        time: f32,
        delta: Vec3,
    },
}

/// One animated bone.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub parent_name: String,
    pub alias: String,
    pub name_hash: u32,
    pub parent_hash: u32,
    pub alias_hash: u32,

    pub target_bone_type: i32,
    pub flags: i32,

    pub basis: DecompressionBasis,

    pub position: Vec<Keyframe<Vec3>>,
    pub rotation: Vec<Keyframe<Quat>>,
    pub scale: Vec<Keyframe<Vec3>>,

    pub aux_windows: Vec<AuxWindow>,
    pub move_weights: Vec<MoveWeight>,
    pub move_weight_scale: f32,
    pub bounding_volume_anim: Vec<Vec4>,

    pub has_move_weight: bool,
    pub has_bounding_volume_anim: bool,
}

impl Track {
    /// Only tracks without a parent carry move-weight and bounding-volume
    /// animation data.
    pub fn is_root_bone(&self) -> bool {
        self.parent_hash == 0
    }
}

/// A named bounding sphere plus AABB, independent of any track.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingVolume {
    pub name: String,
    pub name_hash: u32,
    pub is_main: bool,
    pub center: Vec3,
    pub radius: f32,
    pub min: Vec3,
    pub max: Vec3,
}

/// A decoded MA animation file.
#[derive(Debug)]
pub struct MaAnimation {
    pub version: i32,
    pub clip_length: f32,
    pub tracks: Vec<Track>,
    pub bounding_volumes: Vec<BoundingVolume>,
}

impl MaAnimation {
    /// Reads an existing MA animation file.
    pub fn from_existing(buffer: ByteSpan) -> Result<Self> {
        Self::from_existing_cancellable(buffer, &CancelToken::new())
    }

    /// Reads an existing MA animation file, checking `cancel` before each
    /// object.
    pub fn from_existing_cancellable(buffer: ByteSpan, cancel: &CancelToken) -> Result<Self> {
        let mut cursor = Cursor::new(buffer);

        let mut magic = [0u8; 5];
        crate::common_file_operations::read_exact(&mut cursor, &mut magic)?;
        if &magic != MAGIC {
            return Err(Error::format("not an MA animation file"));
        }

        let version: i32 = cursor.read_le()?;
        let table: ObjectTable = cursor.read_le()?;

        // The clip length scales every tick time, so its object is decoded
        // before any track regardless of table order.
        let mut clip_length: Option<f32> = None;
        for entry in table.entries() {
            if entry.class_id == TYPE_CLIP_LENGTH {
                cancel.check()?;
                clip_length = Some(decode_object(&mut cursor, entry, |r| Ok(r.read_le()?))?);
            }
        }

        let clip_length = match clip_length {
            Some(length) => length,
            None if table.entries().any(|e| e.class_id == TYPE_TRACK) => {
                return Err(Error::format("missing clip-length object"));
            }
            None => 0.0,
        };

        let mut tracks = Vec::new();
        let mut bounding_volumes = Vec::new();
        for entry in table.entries() {
            cancel.check()?;

            match entry.class_id {
                TYPE_CLIP_LENGTH => {}
                TYPE_TRACK => tracks.push(decode_object(&mut cursor, entry, |r| {
                    read_track(r, version, clip_length)
                })?),
                TYPE_BOUNDING_VOLUME => {
                    bounding_volumes.push(decode_object(&mut cursor, entry, |r| {
                        read_bounding_volume(r, version)
                    })?)
                }
                other => {
                    return Err(Error::format(format!(
                        "unknown MA object type {other}"
                    )));
                }
            }
        }

        tracing::debug!(
            version,
            clip_length,
            tracks = tracks.len(),
            bounding_volumes = bounding_volumes.len(),
            "parsed MA animation"
        );

        Ok(Self {
            version,
            clip_length,
            tracks,
            bounding_volumes,
        })
    }
}

fn read_name<R: Read + Seek>(reader: &mut R, version: i32) -> Result<String> {
    if version >= 6 {
        read_len_prefixed_utf16(reader)
    } else {
        read_unicode256_count(reader)
    }
}

fn read_track<R: Read + Seek>(reader: &mut R, version: i32, clip_length: f32) -> Result<Track> {
    let name_hash: u32 = reader.read_le()?;
    let parent_hash: u32 = reader.read_le()?;
    let alias_hash: u32 = reader.read_le()?;

    let name = read_name(reader, version)?;
    let parent_name = read_name(reader, version)?;
    let alias = read_name(reader, version)?;

    let target_bone_type: i32 = reader.read_le()?;
    let flags: i32 = reader.read_le()?;

    let num_position: u32 = reader.read_le()?;
    let num_rotation: u32 = reader.read_le()?;
    let num_scale: u32 = reader.read_le()?;
    let num_aux: u32 = reader.read_le()?;

    let has_move_weight = reader.read_le::<u8>()? != 0;
    let has_bounding_volume_anim = if version >= 7 {
        reader.read_le::<u8>()? != 0
    } else {
        false
    };

    let basis = DecompressionBasis {
        matrices: [
            read_mat4(reader, false)?,
            read_mat4(reader, false)?,
            read_mat4(reader, false)?,
        ],
        offset: read_vec3(reader)?,
        rotation: read_quat(reader)?,
        scale: read_vec3(reader)?,
    };

    let position = read_vec3_channel(reader, version, clip_length, num_position, true)?;
    let rotation = read_quat_channel(reader, version, clip_length, num_rotation)?;
    let scale = read_vec3_channel(reader, version, clip_length, num_scale, false)?;

    let aux_windows = read_aux_windows(reader, version, clip_length, num_aux)?;

    let mut move_weights = Vec::new();
    let mut move_weight_scale = 0.0f32;
    if parent_hash == 0 && has_move_weight {
        let count: u32 = reader.read_le()?;
        move_weight_scale = reader.read_le()?;
        move_weights = read_move_weights(reader, version, count)?;
    }

    let mut bounding_volume_anim = Vec::new();
    if has_bounding_volume_anim {
        let count: u32 = reader.read_le()?;
        for _ in 0..count {
            bounding_volume_anim.push(read_vec4(reader)?);
        }
    }

    Ok(Track {
        name,
        parent_name,
        alias,
        name_hash,
        parent_hash,
        alias_hash,
        target_bone_type,
        flags,
        basis,
        position,
        rotation,
        scale,
        aux_windows,
        move_weights,
        move_weight_scale,
        bounding_volume_anim,
        has_move_weight,
        has_bounding_volume_anim,
    })
}

fn read_ticks<R: Read + Seek>(reader: &mut R, count: u32) -> Result<Vec<u16>> {
    let mut ticks = Vec::with_capacity(reserve_count(count));
    for _ in 0..count {
        ticks.push(reader.read_le()?);
    }
    Ok(ticks)
}

fn read_times<R: Read + Seek>(reader: &mut R, count: u32) -> Result<Vec<f32>> {
    let mut times = Vec::with_capacity(reserve_count(count));
    for _ in 0..count {
        times.push(reader.read_le()?);
    }
    Ok(times)
}

/// Decodes a position or scale channel. Only the position channel may carry
/// the leading root-encoding byte, which switches it from quantized 16-bit
/// components to raw floats.
fn read_vec3_channel<R: Read + Seek>(
    reader: &mut R,
    version: i32,
    clip_length: f32,
    count: u32,
    allow_root_encoding: bool,
) -> Result<Vec<Keyframe<Vec3>>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut keys = Vec::with_capacity(reserve_count(count));
    if version >= 8 {
        let raw_floats = allow_root_encoding && reader.read_le::<u8>()? != 0;
        let ticks = read_ticks(reader, count)?;

        if raw_floats {
            for tick in ticks {
                keys.push(Keyframe {
                    time: ticks_to_seconds(tick, clip_length),
                    value: read_vec3(reader)?,
                });
            }
        } else {
            for tick in ticks {
                let components: [i16; 3] = reader.read_le()?;
                keys.push(Keyframe {
                    time: ticks_to_seconds(tick, clip_length),
                    value: Vec3::new(
                        dequantize(components[0]),
                        dequantize(components[1]),
                        dequantize(components[2]),
                    ),
                });
            }
        }
    } else {
        let times = read_times(reader, count)?;
        for time in times {
            keys.push(Keyframe {
                time,
                value: read_vec3(reader)?,
            });
        }
    }

    Ok(keys)
}

fn read_quat_channel<R: Read + Seek>(
    reader: &mut R,
    version: i32,
    clip_length: f32,
    count: u32,
) -> Result<Vec<Keyframe<Quat>>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut keys = Vec::with_capacity(reserve_count(count));
    if version >= 8 {
        let ticks = read_ticks(reader, count)?;
        for tick in ticks {
            let components: [i16; 4] = reader.read_le()?;
            keys.push(Keyframe {
                time: ticks_to_seconds(tick, clip_length),
                value: Quat::from_xyzw(
                    dequantize(components[0]),
                    dequantize(components[1]),
                    dequantize(components[2]),
                    dequantize(components[3]),
                ),
            });
        }
    } else {
        let times = read_times(reader, count)?;
        for time in times {
            keys.push(Keyframe {
                time,
                value: read_quat(reader)?,
            });
        }
    }

    Ok(keys)
}

fn read_aux_windows<R: Read + Seek>(
    reader: &mut R,
    version: i32,
    clip_length: f32,
    count: u32,
) -> Result<Vec<AuxWindow>> {
    let mut windows = Vec::with_capacity(reserve_count(count));

    if version >= 8 {
        let starts = read_ticks(reader, count)?;
        let ends = read_ticks(reader, count)?;
        for (start, end) in starts.into_iter().zip(ends) {
            windows.push(AuxWindow {
                start: ticks_to_seconds(start, clip_length),
                end: ticks_to_seconds(end, clip_length),
                wraps: start > end,
            });
        }
    } else {
        for _ in 0..count {
            let start: f32 = reader.read_le()?;
            let end: f32 = reader.read_le()?;
            windows.push(AuxWindow {
                start,
                end,
                wraps: start > end,
            });
        }
    }

    Ok(windows)
}

/// Newer files mix full records with marker-delimited delta records; a first
/// float of exactly -1.0 announces a delta, except on the first record whose
/// start time may legitimately coincide. This sentinel must match the
/// on-disk format bit-for-bit.
fn read_move_weights<R: Read + Seek>(
    reader: &mut R,
    version: i32,
    count: u32,
) -> Result<Vec<MoveWeight>> {
    let mut records = Vec::with_capacity(reserve_count(count));

    for index in 0..count {
        if version >= 8 {
            let first: f32 = reader.read_le()?;
            if index > 0 && first == -1.0 {
                records.push(MoveWeight::Delta {
                    time: reader.read_le()?,
                    delta: read_vec3(reader)?,
                });
                continue;
            }

            records.push(MoveWeight::Full {
                start_time: first,
                end_time: reader.read_le()?,
                start: read_vec3(reader)?,
                end: read_vec3(reader)?,
            });
        } else {
            records.push(MoveWeight::Full {
                start_time: reader.read_le()?,
                end_time: reader.read_le()?,
                start: read_vec3(reader)?,
                end: read_vec3(reader)?,
            });
        }
    }

    Ok(records)
}

fn read_bounding_volume<R: Read + Seek>(reader: &mut R, version: i32) -> Result<BoundingVolume> {
    let name_hash: u32 = reader.read_le()?;
    let name = read_name(reader, version)?;

    let is_main = reader.read_le::<u8>()? != 0;
    let center = read_vec3(reader)?;
    let radius: f32 = reader.read_le()?;
    let min = read_vec3(reader)?;
    let max = read_vec3(reader)?;

    Ok(BoundingVolume {
        name,
        name_hash,
        is_main,
        center,
        radius,
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Object {
        class_id: u32,
        data: Vec<u8>,
        /// Overrides the declared length when set, for corruption tests.
        declared: Option<u32>,
    }

    impl Object {
        fn new(class_id: u32, data: Vec<u8>) -> Self {
            Self {
                class_id,
                data,
                declared: None,
            }
        }
    }

    fn build_file(version: i32, objects: &[Object]) -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(MAGIC);
        file.extend_from_slice(&version.to_le_bytes());
        file.extend_from_slice(&(objects.len() as u32).to_le_bytes());

        let header_len = 5 + 4 + 4 + objects.len() * 12;
        let mut offset = header_len as u32;
        for object in objects {
            file.extend_from_slice(&offset.to_le_bytes());
            offset += object.declared.unwrap_or(object.data.len() as u32);
        }
        for object in objects {
            let declared = object.declared.unwrap_or(object.data.len() as u32);
            file.extend_from_slice(&declared.to_le_bytes());
        }
        for object in objects {
            file.extend_from_slice(&object.class_id.to_le_bytes());
        }
        for object in objects {
            file.extend_from_slice(&object.data);
            if let Some(declared) = object.declared {
                // Pad so later objects stay addressable
                file.resize(file.len() + (declared as usize - object.data.len()), 0);
            }
        }
        file
    }

    fn put_f32(data: &mut Vec<u8>, v: f32) {
        data.extend_from_slice(&v.to_le_bytes());
    }

    fn put_vec3(data: &mut Vec<u8>, x: f32, y: f32, z: f32) {
        put_f32(data, x);
        put_f32(data, y);
        put_f32(data, z);
    }

    fn put_len_utf16(data: &mut Vec<u8>, name: &str) {
        let units: Vec<u16> = name.encode_utf16().collect();
        data.extend_from_slice(&(units.len() as u32).to_le_bytes());
        for unit in units {
            data.extend_from_slice(&unit.to_le_bytes());
        }
    }

    fn put_unicode256(data: &mut Vec<u8>, name: &str) {
        let units: Vec<u16> = name.encode_utf16().collect();
        data.extend_from_slice(&(units.len() as u32).to_le_bytes());
        let mut buffer = [0u8; 512];
        for (i, unit) in units.iter().enumerate() {
            buffer[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        data.extend_from_slice(&buffer);
    }

    fn put_basis(data: &mut Vec<u8>) {
        for _ in 0..48 {
            put_f32(data, 0.0); // three matrices
        }
        put_vec3(data, 0.0, 0.0, 0.0);
        for _ in 0..4 {
            put_f32(data, 0.0); // quaternion
        }
        put_vec3(data, 1.0, 1.0, 1.0);
    }

    fn clip_length_object(length: f32) -> Object {
        Object::new(TYPE_CLIP_LENGTH, length.to_le_bytes().to_vec())
    }

    /// A version-8 root track: two quantized position keys, one rotation
    /// key, a wrapping aux window, and a full + delta move-weight pair.
    fn v8_root_track() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x1111u32.to_le_bytes()); // name hash
        data.extend_from_slice(&0u32.to_le_bytes()); // parent hash: root
        data.extend_from_slice(&0u32.to_le_bytes()); // alias hash
        put_len_utf16(&mut data, "Bip01");
        put_len_utf16(&mut data, "");
        put_len_utf16(&mut data, "root");

        data.extend_from_slice(&1i32.to_le_bytes()); // target bone type
        data.extend_from_slice(&0i32.to_le_bytes()); // flags

        data.extend_from_slice(&2u32.to_le_bytes()); // position keys
        data.extend_from_slice(&1u32.to_le_bytes()); // rotation keys
        data.extend_from_slice(&0u32.to_le_bytes()); // scale keys
        data.extend_from_slice(&1u32.to_le_bytes()); // aux windows

        data.push(1); // has move weight
        data.push(0); // no bounding volume anim

        put_basis(&mut data);

        // position: quantized encoding, ticks then components
        data.push(0); // not the raw-float root encoding
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&65535u16.to_le_bytes());
        for c in [32767i16, 0, -32767] {
            data.extend_from_slice(&c.to_le_bytes());
        }
        for c in [0i16, 0, 0] {
            data.extend_from_slice(&c.to_le_bytes());
        }

        // rotation: one identity-ish key
        data.extend_from_slice(&0u16.to_le_bytes());
        for c in [0i16, 0, 0, 32767] {
            data.extend_from_slice(&c.to_le_bytes());
        }

        // aux window that wraps past the clip end
        data.extend_from_slice(&60000u16.to_le_bytes());
        data.extend_from_slice(&100u16.to_le_bytes());

        // move weights: one full record, one delta record
        data.extend_from_slice(&2u32.to_le_bytes());
        put_f32(&mut data, 1.0); // header
        put_f32(&mut data, 0.0); // full: start time
        put_f32(&mut data, 0.5);
        put_vec3(&mut data, 1.0, 2.0, 3.0);
        put_vec3(&mut data, 4.0, 5.0, 6.0);
        put_f32(&mut data, -1.0); // delta marker
        put_f32(&mut data, 0.25);
        put_vec3(&mut data, 0.1, 0.2, 0.3);

        data
    }

    /// A keyless version-8 root track whose only payload is the
    /// bounding-volume animation trailer.
    fn v8_track_with_volume_anim() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x4444u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        put_len_utf16(&mut data, "Bip01");
        put_len_utf16(&mut data, "");
        put_len_utf16(&mut data, "");

        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());

        for _ in 0..4 {
            data.extend_from_slice(&0u32.to_le_bytes()); // no keys, no windows
        }

        data.push(0); // no move weight
        data.push(1); // has bounding volume anim

        put_basis(&mut data);

        data.extend_from_slice(&2u32.to_le_bytes());
        for v in [0.0f32, 1.0, 0.0, 2.5] {
            put_f32(&mut data, v);
        }
        for v in [0.0f32, 1.5, 0.0, 3.0] {
            put_f32(&mut data, v);
        }

        data
    }

    fn v8_bounding_volume() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x2222u32.to_le_bytes());
        put_len_utf16(&mut data, "body");
        data.push(1); // is main
        put_vec3(&mut data, 0.0, 1.0, 0.0);
        put_f32(&mut data, 2.5);
        put_vec3(&mut data, -1.0, 0.0, -1.0);
        put_vec3(&mut data, 1.0, 2.0, 1.0);
        data
    }

    fn v8_file() -> Vec<u8> {
        build_file(
            8,
            &[
                clip_length_object(2.0),
                Object::new(TYPE_TRACK, v8_root_track()),
                Object::new(TYPE_BOUNDING_VOLUME, v8_bounding_volume()),
            ],
        )
    }

    #[test]
    fn decodes_v8_track() {
        let animation = MaAnimation::from_existing(&v8_file()).unwrap();

        assert_eq!(animation.version, 8);
        assert_eq!(animation.clip_length, 2.0);
        assert_eq!(animation.tracks.len(), 1);

        let track = &animation.tracks[0];
        assert_eq!(track.name, "Bip01");
        assert_eq!(track.alias, "root");
        assert!(track.is_root_bone());

        // Quantization boundaries decode exactly
        assert_eq!(track.position[0].value, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(track.position[0].time, 0.0);
        // Tick 65535 at clip length 2.0 is exactly two seconds
        assert_eq!(track.position[1].time, 2.0);

        assert_eq!(track.rotation[0].value.w, 1.0);
        assert!(track.scale.is_empty());
    }

    #[test]
    fn aux_window_wrap_is_flagged() {
        let animation = MaAnimation::from_existing(&v8_file()).unwrap();

        let window = &animation.tracks[0].aux_windows[0];
        assert!(window.wraps);
        assert!(window.start > window.end);
    }

    #[test]
    fn move_weight_sentinel_selects_delta() {
        let animation = MaAnimation::from_existing(&v8_file()).unwrap();

        let weights = &animation.tracks[0].move_weights;
        assert_eq!(weights.len(), 2);
        assert!(matches!(weights[0], MoveWeight::Full { start_time, .. } if start_time == 0.0));

        let MoveWeight::Delta { time, delta } = weights[1] else {
            panic!("the -1.0 sentinel must produce a delta record");
        };
        assert_eq!(time, 0.25);
        assert_eq!(delta, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn decodes_bounding_volume_anim_trailer() {
        let file = build_file(
            8,
            &[
                clip_length_object(2.0),
                Object::new(TYPE_TRACK, v8_track_with_volume_anim()),
            ],
        );
        let animation = MaAnimation::from_existing(&file).unwrap();

        let track = &animation.tracks[0];
        assert!(track.has_bounding_volume_anim);
        assert_eq!(
            track.bounding_volume_anim,
            vec![
                Vec4::new(0.0, 1.0, 0.0, 2.5),
                Vec4::new(0.0, 1.5, 0.0, 3.0),
            ]
        );
    }

    #[test]
    fn missing_clip_length_is_rejected() {
        let file = build_file(8, &[Object::new(TYPE_TRACK, v8_root_track())]);
        assert!(matches!(
            MaAnimation::from_existing(&file),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn corrupt_key_count_is_an_error() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x6666u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        put_len_utf16(&mut data, "Bip01");
        put_len_utf16(&mut data, "");
        put_len_utf16(&mut data, "");

        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());

        // Declares billions of position keys that are not present
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        data.push(0);
        data.push(0);
        put_basis(&mut data);
        data.push(0); // position encoding byte, then the ticks are missing

        let file = build_file(8, &[clip_length_object(2.0), Object::new(TYPE_TRACK, data)]);
        let Err(Error::Object { source, .. }) = MaAnimation::from_existing(&file) else {
            panic!("expected a wrapped decode error");
        };
        assert!(matches!(*source, Error::TruncatedData));
    }

    #[test]
    fn decodes_bounding_volume() {
        let animation = MaAnimation::from_existing(&v8_file()).unwrap();

        let volume = &animation.bounding_volumes[0];
        assert_eq!(volume.name, "body");
        assert!(volume.is_main);
        assert_eq!(volume.radius, 2.5);
        assert_eq!(volume.min, Vec3::new(-1.0, 0.0, -1.0));
    }

    #[test]
    fn decode_is_idempotent() {
        let file = v8_file();
        let first = MaAnimation::from_existing(&file).unwrap();
        let second = MaAnimation::from_existing(&file).unwrap();

        assert_eq!(first.clip_length, second.clip_length);
        assert_eq!(first.tracks.len(), second.tracks.len());
        for (a, b) in first.tracks.iter().zip(&second.tracks) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.rotation, b.rotation);
            assert_eq!(a.move_weights, b.move_weights);
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut file = v8_file();
        file[0] = b'X';
        assert!(matches!(
            MaAnimation::from_existing(&file),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn short_track_is_structural_mismatch() {
        let track = v8_root_track();
        let declared = track.len() as u32 + 1;
        let mut object = Object::new(TYPE_TRACK, track);
        object.declared = Some(declared);

        let file = build_file(8, &[clip_length_object(2.0), object]);
        assert!(matches!(
            MaAnimation::from_existing(&file),
            Err(Error::StructuralMismatch { type_id: 3, .. })
        ));
    }

    #[test]
    fn unknown_object_type_is_fatal() {
        let file = build_file(8, &[Object::new(5, vec![0; 4])]);
        assert!(matches!(
            MaAnimation::from_existing(&file),
            Err(Error::Format { .. })
        ));
    }

    /// Version 5: legacy fixed-buffer names, float channels, no second flag
    /// byte, fixed full move-weight records.
    fn v5_track() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x3333u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        put_unicode256(&mut data, "Bip01");
        put_unicode256(&mut data, "");
        put_unicode256(&mut data, "root");

        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());

        data.extend_from_slice(&1u32.to_le_bytes()); // position keys
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes()); // aux windows

        data.push(1); // has move weight; no second flag byte before v7

        put_basis(&mut data);

        // position: float times then float values
        put_f32(&mut data, 0.75);
        put_vec3(&mut data, 10.0, 20.0, 30.0);

        // aux window as float pairs
        put_f32(&mut data, 1.5);
        put_f32(&mut data, 0.25);

        // move weights: fixed full records
        data.extend_from_slice(&1u32.to_le_bytes());
        put_f32(&mut data, 1.0);
        put_f32(&mut data, -1.0); // a start time of -1.0 stays a full record
        put_f32(&mut data, 0.5);
        put_vec3(&mut data, 1.0, 1.0, 1.0);
        put_vec3(&mut data, 2.0, 2.0, 2.0);

        data
    }

    #[test]
    fn decodes_v5_track() {
        let file = build_file(
            5,
            &[clip_length_object(3.0), Object::new(TYPE_TRACK, v5_track())],
        );
        let animation = MaAnimation::from_existing(&file).unwrap();

        let track = &animation.tracks[0];
        assert_eq!(track.name, "Bip01");
        assert_eq!(track.position[0].time, 0.75);
        assert_eq!(track.position[0].value, Vec3::new(10.0, 20.0, 30.0));

        let window = &track.aux_windows[0];
        assert!(window.wraps);
        assert_eq!(window.start, 1.5);

        // Old files never use the delta encoding
        assert!(matches!(
            track.move_weights[0],
            MoveWeight::Full { start_time, .. } if start_time == -1.0
        ));
    }
}
