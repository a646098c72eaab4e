//! Build entry points keyed by page name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pagewire_meta::PageRecord;

/// Mapping from entry name to the source file of that page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryMap {
    entries: BTreeMap<String, PathBuf>,
}

impl EntryMap {
    /// Build the entry map for a set of pages.
    ///
    /// Paths are joined onto `root` without touching the file system, so
    /// `root` should already be absolute. When two pages share a name the
    /// later one replaces the earlier one.
    pub fn from_pages(root: &Path, pages: &[PageRecord]) -> Self {
        let mut entries = BTreeMap::new();

        for page in pages {
            let source = root.join(&page.path);
            if let Some(previous) = entries.insert(page.name.clone(), source) {
                tracing::warn!(
                    "Entry name '{}' is shared by {} and {}; keeping the latter",
                    page.name,
                    previous.display(),
                    page.path
                );
            }
        }

        Self { entries }
    }

    /// Source path of an entry.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}
