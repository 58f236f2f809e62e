use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{MergeError, Result};

/// List candidate report files directly inside `dir`.
///
/// - Not recursive, hidden files included, no ignore-file processing
/// - Symlinks count when they resolve to a regular file
/// - Extension must match one of `extensions` exactly (case-sensitive)
/// - Names in `exclude` and the path in `skip` (the output file) are left out
/// - Sorted by file name so every run sees the same order
pub fn discover_reports(
    dir: &Path,
    extensions: &[String],
    exclude: &[String],
    skip: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MergeError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut builder = WalkBuilder::new(dir);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b));

    let skip = skip.and_then(|p| p.file_name().map(|n| n.to_os_string()));
    let mut files = Vec::new();

    for entry in builder.build() {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other(message));
            MergeError::io(dir, source)
        })?;

        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name() else {
            continue;
        };

        if skip.as_deref() == Some(name) {
            debug!("Skipping output file {}", path.display());
            continue;
        }

        let name = name.to_string_lossy();
        if exclude.iter().any(|ex| *ex == name) {
            debug!("Excluded: {}", path.display());
            continue;
        }

        if !has_report_extension(path, extensions) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    Ok(files)
}

fn has_report_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.trim_start_matches('.') == ext))
        .unwrap_or(false)
}
