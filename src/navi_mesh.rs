// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Cursor, Read, Seek};

use binrw::BinReaderExt;
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::common::CancelToken;
use crate::common_file_operations::{
    read_mat4, read_quat, read_unicode256_count, read_vec3, read_vec4, reserve_count,
};
use crate::object_table::{ObjectTable, decode_object};
use crate::{ByteSpan, Error, Result};

const CLASS_OCTREE: u32 = 0;
const CLASS_TRANSFORM: u32 = 1;
const CLASS_MESH: u32 = 2;

/// An axis-aligned box with its derived extents. Size, center and bounding
/// radius are computed from min/max at decode time, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryBounds {
    pub min: Vec3,
    pub max: Vec3,
    pub size: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl GeometryBounds {
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        Self {
            min,
            max,
            size: max - min,
            center,
            radius: (max - center).length(),
        }
    }
}

/// A spatial-partition cell. Leaves enumerate the mesh triangles they
/// contain; internal nodes carry splitting planes instead.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub subdivided: bool,
    pub width: f32,
    pub bounds: GeometryBounds,
    /// Up to six plane equations, present only on subdivided nodes.
    pub planes: Vec<Vec4>,
    /// Indices into the triangle list of the owning mesh.
    pub triangle_indices: Vec<u32>,
}

/// A named bone-like entry. The bind matrix is conventionally the inverse of
/// the world matrix, but files in the wild do not always honor that.
#[derive(Debug, Clone)]
pub struct TransformNode {
    pub name: String,
    pub name_hash: u32,
    pub world: Mat4,
    pub bind: Mat4,
    pub duplicate: Mat4,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// A named vertex/index buffer. Parent names link entries into a tree of
/// named parts; there are no back-pointers.
#[derive(Debug, Clone)]
pub struct MeshEntry {
    pub name: String,
    pub name_hash: u32,
    pub parent_name: String,
    pub parent_hash: u32,
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

/// Navigation mesh file: an object-table container owning octree nodes,
/// transform nodes and mesh entries.
#[derive(Debug)]
pub struct NaviMeshFile {
    pub version: i32,
    pub octree_nodes: Vec<OctreeNode>,
    pub transform_nodes: Vec<TransformNode>,
    pub meshes: Vec<MeshEntry>,
}

impl NaviMeshFile {
    /// Reads an existing navigation mesh file.
    pub fn from_existing(buffer: ByteSpan) -> Result<Self> {
        Self::from_existing_cancellable(buffer, &CancelToken::new())
    }

    /// Reads an existing navigation mesh file, checking `cancel` before
    /// each object.
    pub fn from_existing_cancellable(buffer: ByteSpan, cancel: &CancelToken) -> Result<Self> {
        let mut cursor = Cursor::new(buffer);

        let version: i32 = cursor.read_le()?;
        let table: ObjectTable = cursor.read_le()?;

        let mut octree_nodes = Vec::new();
        let mut transform_nodes = Vec::new();
        let mut meshes = Vec::new();

        for entry in table.entries() {
            cancel.check()?;

            match entry.class_id {
                CLASS_OCTREE => {
                    octree_nodes.push(decode_object(&mut cursor, entry, read_octree_node)?)
                }
                CLASS_TRANSFORM => {
                    transform_nodes.push(decode_object(&mut cursor, entry, read_transform_node)?)
                }
                CLASS_MESH => meshes.push(decode_object(&mut cursor, entry, read_mesh_entry)?),
                other => {
                    return Err(Error::format(format!(
                        "unknown navigation mesh object class {other}"
                    )));
                }
            }
        }

        tracing::debug!(
            version,
            octree_nodes = octree_nodes.len(),
            transform_nodes = transform_nodes.len(),
            meshes = meshes.len(),
            "parsed navigation mesh"
        );

        Ok(Self {
            version,
            octree_nodes,
            transform_nodes,
            meshes,
        })
    }
}

fn read_octree_node<R: Read + Seek>(reader: &mut R) -> Result<OctreeNode> {
    let subdivided: u8 = reader.read_le()?;
    let subdivided = subdivided != 0;
    let width: f32 = reader.read_le()?;

    let min = read_vec3(reader)?;
    let max = read_vec3(reader)?;
    let bounds = GeometryBounds::from_min_max(min, max);

    let mut planes = Vec::new();
    if subdivided {
        for _ in 0..6 {
            planes.push(read_vec4(reader)?);
        }
    }

    let num_triangles: u32 = reader.read_le()?;
    let mut triangle_indices = Vec::with_capacity(reserve_count(num_triangles));
    for _ in 0..num_triangles {
        triangle_indices.push(reader.read_le()?);
    }

    Ok(OctreeNode {
        subdivided,
        width,
        bounds,
        planes,
        triangle_indices,
    })
}

fn read_transform_node<R: Read + Seek>(reader: &mut R) -> Result<TransformNode> {
    let name_hash: u32 = reader.read_le()?;
    let name = read_unicode256_count(reader)?;

    let world = read_mat4(reader, false)?;
    let bind = read_mat4(reader, false)?;
    let duplicate = read_mat4(reader, false)?;

    let translation = read_vec3(reader)?;
    let rotation = read_quat(reader)?;
    let scale = read_vec3(reader)?;

    Ok(TransformNode {
        name,
        name_hash,
        world,
        bind,
        duplicate,
        translation,
        rotation,
        scale,
    })
}

fn read_mesh_entry<R: Read + Seek>(reader: &mut R) -> Result<MeshEntry> {
    let name_hash: u32 = reader.read_le()?;
    let name = read_unicode256_count(reader)?;
    let parent_hash: u32 = reader.read_le()?;
    let parent_name = read_unicode256_count(reader)?;

    let num_vertices: u32 = reader.read_le()?;
    let mut vertices = Vec::with_capacity(reserve_count(num_vertices));
    for _ in 0..num_vertices {
        vertices.push(read_vec3(reader)?);
    }

    let num_triangles: u32 = reader.read_le()?;
    let mut triangles = Vec::with_capacity(reserve_count(num_triangles));
    for _ in 0..num_triangles {
        let indices: [u32; 3] = reader.read_le()?;
        triangles.push(indices);
    }

    Ok(MeshEntry {
        name,
        name_hash,
        parent_name,
        parent_hash,
        vertices,
        triangles,
    })
}
