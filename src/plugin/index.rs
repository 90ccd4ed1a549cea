use std::path::Path;

use ignore::WalkBuilder;

use crate::plugin::error::{InstallError, InstallResult};

/// Names present directly under the installation root, sorted.
pub fn list_installed(root: &Path) -> InstallResult<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    if !root.is_dir() {
        return Err(InstallError::fs(
            "list",
            root,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        ));
    }

    let mut names: Vec<String> = WalkBuilder::new(root)
        .max_depth(Some(1))
        .standard_filters(false)
        .build()
        .flatten()
        .filter(|entry| entry.depth() == 1)
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();

    names.sort_by_key(|name| name.to_lowercase());
    Ok(names)
}
