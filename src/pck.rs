// SPDX-FileCopyrightText: 2026 The Dobal Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! PCK archives: a MIP-wrapped directory file mapping virtual paths to byte
//! ranges inside one or more pack data files. Supports browsing, unpacking
//! selected entries, and packing a folder by diffing it against the existing
//! directory.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use binrw::{BinReaderExt, BinWriterExt};
use walkdir::WalkDir;

use crate::common::CancelToken;
use crate::common_file_operations::{
    read_len_prefixed_utf16, reserve_count, write_len_prefixed_utf16,
};
use crate::{ByteBuffer, Error, Result, mip};

const MAGIC: &[u8; 4] = b"PCKD";
const DIRECTORY_VERSION: u32 = 1;

/// One archive entry: a virtual path and the byte range holding its data.
/// Names are compared by exact ordinal match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PckEntry {
    pub name: String,
    pub file_id: u32,
    pub offset: u64,
    pub length: u64,
}

/// A node in the name-prefix tree built for browsing and filtering.
/// Leaves carry the index of their entry in the archive's entry list.
#[derive(Debug, Default)]
pub struct PckTreeNode {
    pub children: BTreeMap<String, PckTreeNode>,
    pub entry: Option<usize>,
}

impl PckTreeNode {
    fn insert(&mut self, name: &str, index: usize) {
        let mut node = self;
        for part in name.split('/') {
            node = node.children.entry(part.to_string()).or_default();
        }
        node.entry = Some(index);
    }

    /// Walks the tree along a `/`-separated prefix.
    pub fn find(&self, prefix: &str) -> Option<&PckTreeNode> {
        let mut node = self;
        for part in prefix.split('/') {
            node = node.children.get(part)?;
        }
        Some(node)
    }
}

/// What `unpack` did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UnpackReport {
    pub written: usize,
    pub skipped: usize,
}

/// What `pack` did per candidate file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// An open PCK archive directory.
///
/// All mutations rebuild the serialized directory and data streams from the
/// in-memory model; the source files are never patched in place.
#[derive(Debug)]
pub struct PckArchive {
    directory_path: PathBuf,
    pub entries: Vec<PckEntry>,
}

impl PckArchive {
    /// Opens an existing archive by its directory file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        if data.len() < 8 {
            return Err(Error::TruncatedData);
        }
        if &data[0..4] != MAGIC {
            return Err(Error::format("not a PCK directory file"));
        }

        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        if version != DIRECTORY_VERSION {
            return Err(Error::format(format!(
                "unsupported PCK directory version {version}"
            )));
        }

        let body = mip::decompress(&data[8..])?;
        let mut cursor = Cursor::new(body.as_slice());

        let count: u32 = cursor.read_le()?;
        let mut entries = Vec::with_capacity(reserve_count(count));
        for _ in 0..count {
            let name = read_len_prefixed_utf16(&mut cursor)?;
            entries.push(PckEntry {
                name,
                file_id: cursor.read_le()?,
                offset: cursor.read_le()?,
                length: cursor.read_le()?,
            });
        }

        Ok(Self {
            directory_path: path.to_path_buf(),
            entries,
        })
    }

    /// Creates a new, empty archive rooted at the given directory file path.
    /// Nothing is written until the first `pack`.
    pub fn create(path: &Path) -> Self {
        Self {
            directory_path: path.to_path_buf(),
            entries: Vec::new(),
        }
    }

    fn data_file_path(&self, file_id: u32) -> PathBuf {
        self.directory_path.with_extension(format!("dat{file_id}"))
    }

    /// Enumerates all entries, reporting progress per entry.
    pub fn read_file_list(
        &self,
        mut progress: impl FnMut(usize, usize, &str),
        cancel: &CancelToken,
    ) -> Result<Vec<PckEntry>> {
        let total = self.entries.len();
        let mut list = Vec::with_capacity(total);

        for (index, entry) in self.entries.iter().enumerate() {
            cancel.check()?;
            progress(index, total, &entry.name);
            list.push(entry.clone());
        }

        Ok(list)
    }

    /// Finds an entry by exact name.
    pub fn find_entry(&self, name: &str) -> Option<&PckEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Builds the name-prefix tree over all entries.
    pub fn entry_tree(&self) -> PckTreeNode {
        let mut root = PckTreeNode::default();
        for (index, entry) in self.entries.iter().enumerate() {
            root.insert(&entry.name, index);
        }
        root
    }

    /// Reads one entry's bytes out of its pack data file.
    pub fn extract(&self, name: &str) -> Result<ByteBuffer> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| Error::format(format!("no entry named {name}")))?;

        let mut file = fs::File::open(self.data_file_path(entry.file_id))?;
        file.seek(SeekFrom::Start(entry.offset))?;

        // Read up to the declared length so a corrupt directory cannot
        // force a huge upfront allocation
        let mut data = Vec::new();
        file.take(entry.length).read_to_end(&mut data)?;
        if data.len() as u64 != entry.length {
            return Err(Error::TruncatedData);
        }
        Ok(data)
    }

    /// Writes entries out to `out_dir`, preserving their virtual paths.
    ///
    /// `selection` limits the operation to the named entries; `None` unpacks
    /// everything. Existing files are skipped unless `replace_existing` is
    /// set. Cancellation is honored at each file boundary; files already
    /// written stay on disk.
    pub fn unpack(
        &self,
        selection: Option<&[String]>,
        out_dir: &Path,
        replace_existing: bool,
        mut progress: impl FnMut(usize, usize, &str),
        cancel: &CancelToken,
    ) -> Result<UnpackReport> {
        let selected: Vec<&PckEntry> = match selection {
            Some(names) => {
                let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
                self.entries
                    .iter()
                    .filter(|e| wanted.contains(e.name.as_str()))
                    .collect()
            }
            None => self.entries.iter().collect(),
        };

        let total = selected.len();
        let mut report = UnpackReport::default();

        for (index, entry) in selected.into_iter().enumerate() {
            cancel.check()?;
            progress(index, total, &entry.name);

            let destination = entry_destination(out_dir, &entry.name)?;
            if destination.exists() && !replace_existing {
                report.skipped += 1;
                continue;
            }

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&destination, self.extract(&entry.name)?)?;
            report.written += 1;
        }

        tracing::debug!(
            written = report.written,
            skipped = report.skipped,
            "unpacked archive entries"
        );
        Ok(report)
    }

    /// Packs a folder's files into the archive.
    ///
    /// Candidates are diffed against existing entries by exact name: unseen
    /// names are additions, matching names are updates, and matches with
    /// identical length and content are skipped so unchanged files are not
    /// rewritten. The directory and data streams are fully rebuilt and
    /// written back; existing entry order is preserved, additions follow in
    /// walk order. Cancellation is honored per candidate file, before any
    /// output is written.
    pub fn pack(
        &mut self,
        folder: &Path,
        mut progress: impl FnMut(usize, usize, &str),
        cancel: &CancelToken,
    ) -> Result<PackReport> {
        let mut candidates = Vec::new();
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(folder)
                .map_err(|_| Error::format("walked path escapes the pack folder"))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            candidates.push((name, entry.path().to_path_buf()));
        }

        let total = candidates.len();
        let mut report = PackReport::default();

        // name -> contents for the rebuilt archive, in final entry order
        let mut contents: Vec<(String, ByteBuffer)> = Vec::new();
        for entry in &self.entries {
            contents.push((entry.name.clone(), self.extract(&entry.name)?));
        }

        for (index, (name, path)) in candidates.into_iter().enumerate() {
            cancel.check()?;
            progress(index, total, &name);

            let data = fs::read(&path)?;
            match contents.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => {
                    if *existing == data {
                        report.skipped += 1;
                    } else {
                        *existing = data;
                        report.updated += 1;
                    }
                }
                None => {
                    contents.push((name, data));
                    report.added += 1;
                }
            }
        }

        self.write_archive(contents)?;

        tracing::debug!(
            added = report.added,
            updated = report.updated,
            skipped = report.skipped,
            "packed archive"
        );
        Ok(report)
    }

    /// Serializes the whole archive: a single pack data stream plus the
    /// MIP-wrapped directory.
    fn write_archive(&mut self, contents: Vec<(String, ByteBuffer)>) -> Result<()> {
        let mut data_stream = ByteBuffer::new();
        let mut entries = Vec::with_capacity(contents.len());

        for (name, data) in contents {
            entries.push(PckEntry {
                name,
                file_id: 0,
                offset: data_stream.len() as u64,
                length: data.len() as u64,
            });
            data_stream.extend_from_slice(&data);
        }

        let mut body = Cursor::new(Vec::new());
        body.write_le(&(entries.len() as u32))?;
        for entry in &entries {
            write_len_prefixed_utf16(&mut body, &entry.name)?;
            body.write_le(&entry.file_id)?;
            body.write_le(&entry.offset)?;
            body.write_le(&entry.length)?;
        }

        let mut directory = MAGIC.to_vec();
        directory.extend_from_slice(&DIRECTORY_VERSION.to_le_bytes());
        directory.extend_from_slice(&mip::compress(&body.into_inner())?);

        self.entries = entries;
        fs::write(self.data_file_path(0), data_stream)?;
        fs::write(&self.directory_path, directory)?;

        Ok(())
    }
}

/// Joins an entry name under `out_dir`, rejecting absolute names and any
/// `..` component so a hostile directory cannot write outside it.
fn entry_destination(out_dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let safe = relative.is_relative()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(Error::format(format!(
            "entry name {name} escapes the output directory"
        )));
    }

    Ok(out_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_with_names(names: &[&str]) -> PckArchive {
        let mut archive = PckArchive::create(Path::new("unused.pck"));
        for (i, name) in names.iter().enumerate() {
            archive.entries.push(PckEntry {
                name: name.to_string(),
                file_id: 0,
                offset: i as u64 * 16,
                length: 16,
            });
        }
        archive
    }

    #[test]
    fn entry_tree_groups_by_prefix() {
        let archive = archive_with_names(&[
            "item/sword.mdl",
            "item/shield.mdl",
            "map/town.navi",
        ]);

        let tree = archive.entry_tree();
        assert_eq!(tree.children.len(), 2);

        let item = tree.find("item").unwrap();
        assert_eq!(item.children.len(), 2);
        assert!(item.entry.is_none());

        let sword = tree.find("item/sword.mdl").unwrap();
        assert_eq!(sword.entry, Some(0));

        assert!(tree.find("item/axe.mdl").is_none());
    }

    #[test]
    fn find_entry_is_case_sensitive() {
        let archive = archive_with_names(&["Item/Sword.mdl"]);
        assert!(archive.find_entry("Item/Sword.mdl").is_some());
        assert!(archive.find_entry("item/sword.mdl").is_none());
    }

    #[test]
    fn read_file_list_reports_progress() {
        let archive = archive_with_names(&["a", "b", "c"]);

        let mut seen = Vec::new();
        let list = archive
            .read_file_list(
                |index, total, name| seen.push((index, total, name.to_string())),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(seen[0], (0, 3, "a".to_string()));
        assert_eq!(seen[2], (2, 3, "c".to_string()));
    }

    #[test]
    fn read_file_list_honors_cancellation() {
        let archive = archive_with_names(&["a", "b"]);
        let token = CancelToken::new();
        token.cancel();

        let result = archive.read_file_list(|_, _, _| {}, &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn destination_rejects_escaping_names() {
        let out = Path::new("out");
        assert!(entry_destination(out, "item/sword.mdl").is_ok());

        for name in ["../escaped.txt", "/etc/passwd", "item/../../escaped.txt"] {
            assert!(
                matches!(entry_destination(out, name), Err(Error::Format { .. })),
                "{name} must be rejected"
            );
        }
    }

    #[test]
    fn open_rejects_wrong_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pck");
        fs::write(&path, b"NOPE0000").unwrap();

        assert!(matches!(
            PckArchive::open(&path),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn open_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.pck");
        fs::write(&path, b"PC").unwrap();

        assert!(matches!(
            PckArchive::open(&path),
            Err(Error::TruncatedData)
        ));
    }
}
