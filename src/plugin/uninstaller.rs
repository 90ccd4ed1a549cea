use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::plugin::descriptor::PackageDescriptor;
use crate::plugin::error::{InstallError, InstallResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub removed: Vec<PathBuf>,
    pub pruned_dirs: Vec<PathBuf>,
}

/// Remove what `install` put under `root` for `descriptor`.
///
/// Absent paths are fine, so running this twice is harmless. Parent
/// directories are only removed when they end up empty, and the root itself
/// is never removed.
pub fn uninstall(root: &Path, descriptor: &PackageDescriptor) -> InstallResult<UninstallReport> {
    let mut report = UninstallReport::default();

    let patterns = descriptor
        .patterns()
        .filter(|patterns| !patterns.is_empty());

    match patterns {
        Some(patterns) => {
            let mut parents = BTreeSet::new();
            for pattern in patterns {
                let installed = if descriptor.destination_name.is_empty() {
                    pattern.trim().trim_matches('/')
                } else {
                    descriptor.destination_name.as_str()
                };
                let Some(full) = confined_join(root, installed) else {
                    tracing::warn!("skipping uninstall of {installed:?}: not under the root");
                    continue;
                };

                if remove_path(&full)? {
                    report.removed.push(full.clone());
                }
                if let Some(parent) = full.parent() {
                    parents.insert(parent.to_path_buf());
                }
            }

            for dir in parents {
                report.pruned_dirs.extend(prune_empty_ancestors(root, &dir)?);
            }
        }
        None => {
            let target = if descriptor.destination_name.is_empty() {
                tracing::warn!(
                    "{} has no destination name, removing its lookup key {}",
                    descriptor.name,
                    descriptor.lookup_key
                );
                descriptor.lookup_key.as_str()
            } else {
                descriptor.destination_name.as_str()
            };

            if let Some(full) = confined_join(root, target)
                && remove_path(&full)?
            {
                report.removed.push(full);
            }
        }
    }

    tracing::info!(
        "uninstalled {}: {} removed, {} empty dirs pruned",
        descriptor.name,
        report.removed.len(),
        report.pruned_dirs.len()
    );
    Ok(report)
}

/// Remove a file or directory tree. `Ok(false)` if it was already gone.
pub(crate) fn remove_path(path: &Path) -> InstallResult<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(InstallError::fs("inspect", path, err)),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(InstallError::fs("remove", path, err)),
    }
}

/// Remove `dir` only if it has no entries left.
pub(crate) fn remove_dir_if_empty(dir: &Path) -> InstallResult<bool> {
    let mut entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(InstallError::fs("read directory", dir, err)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }

    match std::fs::remove_dir(dir) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(InstallError::fs("remove directory", dir, err)),
    }
}

/// Remove empty directories from `start` upwards, stopping below `root`.
pub(crate) fn prune_empty_ancestors(root: &Path, start: &Path) -> InstallResult<Vec<PathBuf>> {
    let mut pruned = Vec::new();
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) || !remove_dir_if_empty(dir)? {
            break;
        }
        pruned.push(dir.to_path_buf());
        current = dir.parent();
    }
    Ok(pruned)
}

fn confined_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let escapes = relative.is_empty()
        || relative.starts_with('/')
        || relative.split('/').any(|segment| segment == "..");
    (!escapes).then(|| root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::test_support::tree;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
        fs::write(path, b"x").expect("write");
    }

    #[test]
    fn removes_wrapped_directory_wholesale_without_patterns() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "myPlugin/index.ts");
        touch(dir.path(), "myPlugin/deep/style.css");
        touch(dir.path(), "other/index.ts");

        let descriptor = PackageDescriptor::new("My Plugin", "myPlugin", "myPlugin", "u");
        let report = uninstall(dir.path(), &descriptor).expect("uninstalls");

        assert_eq!(report.removed, vec![dir.path().join("myPlugin")]);
        assert_eq!(tree(dir.path()), vec!["other/", "other/index.ts"]);
    }

    #[test]
    fn renamed_single_file_is_removed_by_destination_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "neko.ts");
        touch(dir.path(), "husk.tsx");

        let descriptor =
            PackageDescriptor::new("Neko", "neko.ts", "neko.ts", "u").with_patterns(["src/neko.ts"]);
        uninstall(dir.path(), &descriptor).expect("uninstalls");

        assert_eq!(tree(dir.path()), vec!["husk.tsx"]);
    }

    #[test]
    fn empty_parent_is_pruned_but_shared_parent_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "ThemeLibrary/components/Card.tsx");
        touch(dir.path(), "ThemeLibrary/index.ts");
        touch(dir.path(), "Shared/theirs.ts");
        touch(dir.path(), "Shared/ours.ts");

        let theme = PackageDescriptor::new("Theme Library", "", "ThemeLibrary", "u")
            .with_patterns(["ThemeLibrary/components", "ThemeLibrary/index.ts"]);
        let report = uninstall(dir.path(), &theme).expect("uninstalls");
        assert_eq!(report.pruned_dirs, vec![dir.path().join("ThemeLibrary")]);

        let ours = PackageDescriptor::new("Ours", "", "ours", "u").with_patterns(["Shared/ours.ts"]);
        let report = uninstall(dir.path(), &ours).expect("uninstalls");
        assert!(report.pruned_dirs.is_empty());

        assert_eq!(tree(dir.path()), vec!["Shared/", "Shared/theirs.ts"]);
    }

    #[test]
    fn nested_pattern_prunes_every_emptied_ancestor() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "plugins/neko/index.ts");
        touch(dir.path(), "husk.tsx");

        let neko = PackageDescriptor::new("Neko", "", "plugins", "u")
            .with_patterns(["plugins/neko/index.ts"]);
        let report = uninstall(dir.path(), &neko).expect("uninstalls");

        assert_eq!(
            report.pruned_dirs,
            vec![dir.path().join("plugins/neko"), dir.path().join("plugins")]
        );
        assert_eq!(tree(dir.path()), vec!["husk.tsx"]);
    }

    #[test]
    fn uninstall_is_idempotent_and_never_removes_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("plugins");
        fs::create_dir_all(&root).expect("mkdir root");

        let descriptor = PackageDescriptor::new("Husk", "", "husk.tsx", "u").with_patterns(["husk.tsx"]);
        let first = uninstall(&root, &descriptor).expect("absent is fine");
        let second = uninstall(&root, &descriptor).expect("still fine");

        assert!(first.removed.is_empty() && second.removed.is_empty());
        assert!(root.is_dir());
    }

    #[test]
    fn missing_destination_name_falls_back_to_lookup_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "Flat/index.ts");

        let descriptor = PackageDescriptor::new("Flat", "", "Flat", "u");
        uninstall(dir.path(), &descriptor).expect("uninstalls");
        assert!(tree(dir.path()).is_empty());
    }

    #[test]
    fn traversal_patterns_are_ignored() {
        let outer = tempfile::tempdir().expect("tempdir");
        touch(outer.path(), "keep.ts");
        let root = outer.path().join("plugins");
        fs::create_dir_all(&root).expect("mkdir root");

        let descriptor = PackageDescriptor::new("Evil", "", "evil", "u").with_patterns(["../keep.ts"]);
        uninstall(&root, &descriptor).expect("skips");
        assert!(outer.path().join("keep.ts").exists());
    }

    #[test]
    fn prune_stops_at_the_root_and_at_non_empty_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("a/b/c")).expect("mkdir");
        touch(dir.path(), "a/keep.ts");

        let pruned = prune_empty_ancestors(dir.path(), &dir.path().join("a/b/c")).expect("prunes");
        assert_eq!(pruned, vec![dir.path().join("a/b/c"), dir.path().join("a/b")]);
        assert_eq!(tree(dir.path()), vec!["a/", "a/keep.ts"]);
    }
}
