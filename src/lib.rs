// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Codecs for the DoBal game client's proprietary file formats: navigation
//! meshes and height grids, keyframe animation, dummy-bone animation and the
//! PCK packed archive, plus the MIP compression wrapper they share.
//!
//! Each format module exposes a `from_existing` entry point taking an
//! in-memory buffer (or a path for archive-shaped formats) and returns a
//! fully-decoded model, or a typed [`Error`] carrying enough context (byte
//! offset, object type) to present a useful message.

/// Common structures and helpers used by other modules.
pub mod common;

/// Typed errors shared by every codec.
pub mod error;

pub use error::{Error, Result};

mod common_file_operations;
mod object_table;

/// The MIP compression wrapper: zlib plus a positional obfuscation pass.
pub mod mip;

/// Reading navigation height-grid (NAVI height) files.
pub mod navi_height;

/// Reading navigation mesh (NAVI) files.
pub mod navi_mesh;

/// Reading keyframe animation (MA) files.
pub mod ma;

/// Reading dummy-bone animation (DS) files.
pub mod ds;

/// Reading, unpacking and packing PCK archives.
pub mod pck;

/// An immutable borrowed byte buffer, usually the contents of a whole file.
pub type ByteSpan<'a> = &'a [u8];

/// An owned byte buffer produced by decompression or serialization.
pub type ByteBuffer = Vec<u8>;
