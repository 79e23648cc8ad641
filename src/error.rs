// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

/// Errors shared by every codec in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Magic mismatch, invalid header field, or an unknown type tag.
    #[error("invalid data: {reason}")]
    Format { reason: String },

    /// The stream ended before a declared count or length was satisfied.
    #[error("unexpected end of data")]
    TruncatedData,

    /// An object consumed a different number of bytes than its declared length.
    #[error(
        "object type {type_id} at offset {offset:#x} consumed {actual} bytes, declared {declared}"
    )]
    StructuralMismatch {
        type_id: u32,
        offset: u64,
        declared: u64,
        actual: u64,
    },

    /// A per-object decode failure, annotated with the object's type and file offset.
    #[error("failed to decode object type {type_id} at offset {offset:#x}")]
    Object {
        type_id: u32,
        offset: u64,
        #[source]
        source: Box<Error>,
    },

    /// The operation was aborted via its cancellation token. Not a failure.
    #[error("operation cancelled")]
    Cancelled,

    /// Underlying file or stream failure.
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        Error::Format {
            reason: reason.into(),
        }
    }

    /// True when the operation was aborted by its cancellation token rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(e) => {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::TruncatedData
                } else {
                    Error::Io(e)
                }
            }
            binrw::Error::BadMagic { pos, .. } => {
                Error::format(format!("bad magic at offset {pos:#x}"))
            }
            binrw::Error::AssertFail { pos, message } => {
                Error::format(format!("{message} at offset {pos:#x}"))
            }
            binrw::Error::Backtrace(backtrace) => Self::from(*backtrace.error),
            other => Error::format(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
