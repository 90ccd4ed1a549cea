use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;

/// Build an in-memory zip. `None` content adds a directory entry.
pub fn zip_bytes(entries: &[(&str, Option<&str>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        match content {
            Some(content) => {
                writer.start_file(*name, options).expect("start zip entry");
                writer.write_all(content.as_bytes()).expect("write zip entry");
            }
            None => {
                writer.add_directory(*name, options).expect("add zip directory");
            }
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

/// Write a zip to `dir/name` and return a `file://` url for it.
pub fn zip_file_url(dir: &Path, name: &str, entries: &[(&str, Option<&str>)]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(entries)).expect("write zip fixture");
    format!("file://{}", path.display())
}

/// Every path under `root`, relative and forward-slashed, sorted.
pub fn tree(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    collect(root, root, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .expect("entry under root")
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_dir() {
            out.push(format!("{rel}/"));
            collect(root, &path, out);
        } else {
            out.push(rel);
        }
    }
}
