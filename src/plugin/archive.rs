use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};

use crate::plugin::error::ArchiveError;

/// What the archive says about an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// No marker available (plain path listings).
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub kind: EntryKind,
    pub data: Vec<u8>,
}

/// Decoded archive: forward-slash paths (no trailing slash) to entries.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    entries: BTreeMap<String, ArchiveEntry>,
}

/// Top-level layout of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveShape {
    Rooted(String),
    Flat,
}

impl ArchiveShape {
    pub fn root_name(&self) -> Option<&str> {
        match self {
            ArchiveShape::Rooted(name) => Some(name),
            ArchiveShape::Flat => None,
        }
    }
}

impl ArchiveContents {
    /// Decode a deflate/stored zip blob.
    pub fn decode(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let raw_name = file.name().to_string();
            let is_dir = file.is_dir();
            let name = raw_name.trim_end_matches('/').to_string();
            if name.is_empty() {
                continue;
            }

            let entry = if is_dir {
                ArchiveEntry {
                    kind: EntryKind::Directory,
                    data: Vec::new(),
                }
            } else {
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)
                    .map_err(|source| ArchiveError::Entry {
                        name: raw_name.clone(),
                        source,
                    })?;
                ArchiveEntry {
                    kind: EntryKind::File,
                    data,
                }
            };
            entries.insert(name, entry);
        }

        tracing::debug!("decoded archive with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Build contents from bare paths. A trailing slash marks a directory;
    /// anything else carries no marker.
    #[cfg(test)]
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                let name = path.trim_end_matches('/');
                if name.is_empty() {
                    return None;
                }
                let kind = if path.ends_with('/') {
                    EntryKind::Directory
                } else {
                    EntryKind::Unknown
                };
                Some((
                    name.to_string(),
                    ArchiveEntry {
                        kind,
                        data: Vec::new(),
                    },
                ))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArchiveEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// One top-level directory means `Rooted`, otherwise `Flat`.
    pub fn shape(&self) -> ArchiveShape {
        let mut first_level = BTreeSet::new();
        for (path, entry) in &self.entries {
            match path.split_once('/') {
                Some((first, _)) => {
                    first_level.insert(first);
                }
                None if entry.kind == EntryKind::Directory => {
                    first_level.insert(path.as_str());
                }
                None => {}
            }
        }

        let mut dirs = first_level.into_iter();
        match (dirs.next(), dirs.next()) {
            (Some(root), None) => ArchiveShape::Rooted(root.to_string()),
            _ => ArchiveShape::Flat,
        }
    }
}
