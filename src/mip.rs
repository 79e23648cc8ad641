// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! The MIP wrapper: zlib compression with a byte-wise obfuscation pass
//! applied over the compressed stream. Several formats (the navigation
//! height grid, the PCK archive directory) store their payload this way.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{ByteBuffer, ByteSpan, Error, Result};

/// The rolling key table the client XORs over compressed payloads. The
/// mask depends only on the byte offset, so applying it twice restores
/// the original bytes. Must stay bit-identical to the client's table.
const CODE_KEY: [u8; 32] = [
    0x4D, 0x49, 0x50, 0x8B, 0x27, 0xE4, 0x71, 0x3A, 0x9C, 0x05, 0xD2, 0x66, 0xF8, 0x13, 0xAF,
    0x58, 0xC1, 0x7E, 0x32, 0xB9, 0x0D, 0xE7, 0x44, 0x96, 0x2B, 0xDC, 0x61, 0x0F, 0x85, 0x3E,
    0xFA, 0x79,
];

#[inline]
fn mask(offset: usize) -> u8 {
    CODE_KEY[offset & 0x1F] ^ (offset >> 5) as u8
}

/// Applies the positional obfuscation pass in place. Self-inverse.
pub fn code(data: &mut [u8]) {
    for (offset, byte) in data.iter_mut().enumerate() {
        *byte ^= mask(offset);
    }
}

/// Deflates `data` at the best compression level, then obfuscates the
/// compressed stream.
pub fn compress(data: ByteSpan) -> Result<ByteBuffer> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    let mut compressed = encoder.finish()?;

    code(&mut compressed);
    Ok(compressed)
}

/// Reverses the obfuscation pass, then inflates the zlib stream.
pub fn decompress(data: ByteSpan) -> Result<ByteBuffer> {
    let mut decoded = data.to_vec();
    code(&mut decoded);

    let mut output = Vec::new();
    ZlibDecoder::new(decoded.as_slice())
        .read_to_end(&mut output)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::TruncatedData
            } else {
                Error::format(format!("bad zlib stream: {e}"))
            }
        })?;

    Ok(output)
}
