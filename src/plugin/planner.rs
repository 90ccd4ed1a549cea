//! Extraction planning: which archive entries to materialize and where.
//!
//! The planner is pure. It never touches the filesystem, so every layout
//! rule (root stripping, common-prefix flattening, wrapping, single-file
//! rename) is decided here and the installer only executes the result.

use std::collections::HashMap;

use serde::Deserialize;

use crate::plugin::archive::{ArchiveContents, ArchiveShape, EntryKind};
use crate::plugin::descriptor::PackageDescriptor;
use crate::plugin::error::PlanError;

/// Decides whether an archive entry is a directory.
pub trait EntryClassifier {
    fn is_directory(&self, path: &str, kind: EntryKind) -> bool;
}

/// A final segment without a dot is a directory. Misreads extension-less
/// files and dotted directory names.
#[derive(Debug, Default, Clone, Copy)]
pub struct DotHeuristic;

impl EntryClassifier for DotHeuristic {
    fn is_directory(&self, path: &str, _kind: EntryKind) -> bool {
        !last_segment(path).contains('.')
    }
}

/// Trusts the archive's own file/directory markers and only falls back to
/// another classifier for entries that carry none.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveMarkers<F = DotHeuristic> {
    fallback: F,
}

impl<F: EntryClassifier> EntryClassifier for ArchiveMarkers<F> {
    fn is_directory(&self, path: &str, kind: EntryKind) -> bool {
        match kind {
            EntryKind::File => false,
            EntryKind::Directory => true,
            EntryKind::Unknown => self.fallback.is_directory(path, kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    #[default]
    Markers,
    DotHeuristic,
}

impl Classification {
    pub fn classifier(self) -> Box<dyn EntryClassifier + Send + Sync> {
        match self {
            Classification::Markers => Box::new(ArchiveMarkers::<DotHeuristic>::default()),
            Classification::DotHeuristic => Box::new(DotHeuristic),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub source: String,
    /// Relative to the installation root, forward-slash delimited.
    pub destination: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub shape: ArchiveShape,
    pub common_prefix: Vec<String>,
    pub entries: Vec<PlannedEntry>,
    /// Selection patterns that matched nothing. They are a no-op, not an error.
    pub unmatched_patterns: Vec<String>,
    /// Set when a single file was renamed to the destination name while planning.
    pub renamed_to: Option<String>,
}

impl ExtractionPlan {
    pub fn root_dir_name(&self) -> &str {
        self.shape.root_name().unwrap_or("")
    }

    pub fn common_prefix_path(&self) -> String {
        self.common_prefix.join("/")
    }

    pub fn directories(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.iter().filter(|entry| entry.is_dir)
    }

    pub fn files(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.iter().filter(|entry| !entry.is_dir)
    }

    pub fn file_count(&self) -> usize {
        self.files().count()
    }
}

/// Selection patterns after normalization, with their flattening prefix.
struct Selection<'a> {
    patterns: Vec<&'a str>,
    prefix: Vec<&'a str>,
}

/// Map archive entries to destinations relative to the installation root.
///
/// Fails only when an archive path or the destination name would leave the
/// root. Patterns that match nothing are reported, not rejected.
pub fn plan(
    contents: &ArchiveContents,
    descriptor: &PackageDescriptor,
    classifier: &dyn EntryClassifier,
) -> Result<ExtractionPlan, PlanError> {
    validate_destination_name(&descriptor.destination_name)?;
    for (path, _) in contents.iter() {
        if escapes_root(path) {
            return Err(PlanError::EscapesRoot(path.to_string()));
        }
    }

    let shape = contents.shape();
    let root = shape.root_name();
    // Flattening folds the shared prefix into the destination name, so there
    // is nothing to fold into when installing straight into the root.
    let flatten = !descriptor.destination_name.is_empty();
    let selection = descriptor
        .patterns()
        .map(|patterns| Selection::new(patterns, contents, root, classifier, flatten));

    let mut matched = vec![false; selection.as_ref().map_or(0, |s| s.patterns.len())];
    let mut entries = Vec::new();

    for (path, entry) in contents.iter() {
        let rel = strip_root(path, root);
        if rel.is_empty() {
            continue;
        }

        let destination = match &selection {
            None => rel.to_string(),
            Some(selection) => {
                let Some(index) = selection.match_index(path, rel, contents, root, classifier)
                else {
                    continue;
                };
                matched[index] = true;
                match selection.strip_prefix(rel) {
                    Some(rest) => rest.to_string(),
                    None => continue,
                }
            }
        };

        entries.push(PlannedEntry {
            source: path.to_string(),
            destination,
            is_dir: classifier.is_directory(path, entry.kind),
        });
    }

    if descriptor.wraps_in_directory() {
        for entry in &mut entries {
            entry.destination = format!("{}/{}", descriptor.destination_name, entry.destination);
        }
    }
    let mut entries = dedupe_destinations(entries);

    let mut renamed_to = None;
    if descriptor.is_single_file_target() {
        let file_count = entries.iter().filter(|entry| !entry.is_dir).count();
        if file_count == 1 {
            entries.retain(|entry| !entry.is_dir);
            if let Some(file) = entries.first_mut() {
                file.destination = descriptor.destination_name.clone();
                renamed_to = Some(descriptor.destination_name.clone());
            }
        }
    }

    for entry in &entries {
        if escapes_root(&entry.destination) {
            return Err(PlanError::EscapesRoot(entry.source.clone()));
        }
    }

    let (common_prefix, unmatched_patterns) = match selection {
        Some(selection) => {
            let unmatched = selection
                .patterns
                .iter()
                .zip(&matched)
                .filter(|(_, hit)| !**hit)
                .map(|(pattern, _)| pattern.to_string())
                .collect();
            let prefix = selection.prefix.iter().map(|s| s.to_string()).collect();
            (prefix, unmatched)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(ExtractionPlan {
        shape,
        common_prefix,
        entries,
        unmatched_patterns,
        renamed_to,
    })
}

impl<'a> Selection<'a> {
    fn new(
        raw: &'a [String],
        contents: &ArchiveContents,
        root: Option<&str>,
        classifier: &dyn EntryClassifier,
        flatten: bool,
    ) -> Self {
        let patterns: Vec<&str> = raw
            .iter()
            .map(|pattern| pattern.trim().trim_matches('/'))
            .filter(|pattern| !pattern.is_empty())
            .collect();

        let segments: Vec<Vec<&str>> = patterns
            .iter()
            .map(|&pattern| directory_segments(pattern, contents, root, classifier))
            .collect();

        // A top-level file pattern shares no directory with anything else.
        let prefix = if !flatten || segments.iter().any(Vec::is_empty) {
            Vec::new()
        } else {
            let mut segments = segments.into_iter();
            match segments.next() {
                Some(first) => segments.fold(first, |acc, next| {
                    acc.iter()
                        .zip(&next)
                        .take_while(|(a, b)| a == b)
                        .map(|(a, _)| *a)
                        .collect()
                }),
                None => Vec::new(),
            }
        };

        Self { patterns, prefix }
    }

    fn has_prefix(&self) -> bool {
        !self.prefix.is_empty()
    }

    fn match_index(
        &self,
        path: &str,
        rel: &str,
        contents: &ArchiveContents,
        root: Option<&str>,
        classifier: &dyn EntryClassifier,
    ) -> Option<usize> {
        self.patterns.iter().position(|pattern| {
            if self.has_prefix() {
                return is_within(rel, pattern);
            }

            path == *pattern
                || path.ends_with(&format!("/{pattern}"))
                || rel == *pattern
                || (pattern_is_directory(pattern, contents, root, classifier)
                    && is_within(rel, pattern))
        })
    }

    /// Strip the common prefix. `None` means the entry is the prefix itself.
    fn strip_prefix<'p>(&self, rel: &'p str) -> Option<&'p str> {
        if !self.has_prefix() {
            return Some(rel);
        }

        let prefix = self.prefix.join("/");
        if rel == prefix {
            return None;
        }
        Some(
            rel.strip_prefix(&prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(rel),
        )
    }
}

/// One entry per destination. A later archive path replaces an earlier one,
/// so `root/README.md` wins over a stray top-level `README.md`.
fn dedupe_destinations(entries: Vec<PlannedEntry>) -> Vec<PlannedEntry> {
    let mut deduped: Vec<PlannedEntry> = Vec::with_capacity(entries.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match seen.get(&entry.destination) {
            Some(&index) => {
                tracing::warn!(
                    "{} and {} both land on {}, keeping {}",
                    deduped[index].source,
                    entry.source,
                    entry.destination,
                    entry.source
                );
                deduped[index] = entry;
            }
            None => {
                seen.insert(entry.destination.clone(), deduped.len());
                deduped.push(entry);
            }
        }
    }
    deduped
}

fn directory_segments<'a>(
    pattern: &'a str,
    contents: &ArchiveContents,
    root: Option<&str>,
    classifier: &dyn EntryClassifier,
) -> Vec<&'a str> {
    let mut segments: Vec<&str> = pattern.split('/').collect();
    if !pattern_is_directory(pattern, contents, root, classifier) {
        segments.pop();
    }
    segments
}

fn pattern_is_directory(
    pattern: &str,
    contents: &ArchiveContents,
    root: Option<&str>,
    classifier: &dyn EntryClassifier,
) -> bool {
    let in_archive = match root {
        Some(root) => format!("{root}/{pattern}"),
        None => pattern.to_string(),
    };
    let kind = contents
        .get(&in_archive)
        .map_or(EntryKind::Unknown, |entry| entry.kind);
    classifier.is_directory(pattern, kind)
}

/// `path` equals `base` or lies below it, on segment boundaries.
fn is_within(path: &str, base: &str) -> bool {
    path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn strip_root<'p>(path: &'p str, root: Option<&str>) -> &'p str {
    let Some(root) = root else {
        return path;
    };
    if path == root {
        return "";
    }
    path.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

fn escapes_root(path: &str) -> bool {
    path.is_empty() || path.starts_with('/') || path.split('/').any(|segment| segment == "..")
}

fn validate_destination_name(name: &str) -> Result<(), PlanError> {
    if name.is_empty() {
        return Ok(());
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(PlanError::InvalidDestination(name.to_string()));
    }
    Ok(())
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
