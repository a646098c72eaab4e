//! Page discovery under the source root.

use std::fs;
use std::path::{Path, PathBuf};

use pagewire_meta::{PageRecord, PAGE_EXTENSION};
use walkdir::WalkDir;

use crate::builder::BuildError;

/// Find every page file under `root`, skipping shared fragment directories.
///
/// `excluded` entries are directories relative to `root` (`partials`,
/// `components`, `layout`). A missing root yields no pages.
pub fn discover_pages<S: AsRef<str>>(root: &Path, excluded: &[S]) -> Vec<PathBuf> {
    if !root.is_dir() {
        tracing::debug!("Source root not found: {}", root.display());
        return Vec::new();
    }

    let excluded: Vec<PathBuf> = excluded.iter().map(|d| root.join(d.as_ref())).collect();

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !excluded.iter().any(|dir| e.path().starts_with(dir)))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == PAGE_EXTENSION)
        })
        .map(|e| e.into_path())
        .collect()
}

/// Read each discovered page and build its record.
pub fn load_pages(root: &Path, files: &[PathBuf]) -> Result<Vec<PageRecord>, BuildError> {
    files
        .iter()
        .map(|file| {
            let content = fs::read_to_string(file)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", file.display(), e)))?;

            let relative = file.strip_prefix(root).unwrap_or(file);

            Ok(PageRecord::from_source(
                &relative.to_string_lossy(),
                &content,
            ))
        })
        .collect()
}
