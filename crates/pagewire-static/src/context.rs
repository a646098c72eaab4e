//! Per-page template context.

use std::path::Path;
use std::sync::Arc;

use pagewire_meta::{normalize_path, PageRecord};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Values available to a page template while it renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Every discovered page
    pub pages: Arc<[PageRecord]>,

    /// The page being rendered, if it was discovered
    pub page: Option<PageRecord>,
}

impl Serialize for RenderContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RenderContext", 2)?;
        state.serialize_field("pages", &*self.pages)?;
        state.serialize_field("page", &CurrentPage(self.page.as_ref()))?;
        state.end()
    }
}

/// A missing page serializes as an empty map so templates can test it.
struct CurrentPage<'a>(Option<&'a PageRecord>);

impl Serialize for CurrentPage<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(page) => page.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Hands out render contexts for pages under one source root.
///
/// Holds only immutable data, so a single provider can serve every render
/// thread.
#[derive(Debug, Clone)]
pub struct ContextProvider {
    root: String,
    pages: Arc<[PageRecord]>,
}

impl ContextProvider {
    /// Create a provider over the discovered pages.
    pub fn new(root: &Path, pages: Vec<PageRecord>) -> Self {
        Self {
            root: normalize_path(&root.to_string_lossy()),
            pages: pages.into(),
        }
    }

    /// All pages known to the provider.
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    /// Context for the page at `page_path`.
    ///
    /// `page_path` may be absolute or carry the source root as a prefix. An
    /// unknown page gets an empty `page`; lookup never fails.
    pub fn context_for(&self, page_path: &str) -> RenderContext {
        let relative = normalize_page_path(page_path, &self.root);
        let page = self.pages.iter().find(|p| p.path == relative).cloned();

        if page.is_none() {
            tracing::debug!("No page record for {}", page_path);
        }

        RenderContext {
            pages: Arc::clone(&self.pages),
            page,
        }
    }
}

/// Normalize a render path to a root-relative, slash-separated path.
pub fn normalize_page_path(page_path: &str, root: &str) -> String {
    let path = normalize_path(page_path);
    let root = normalize_path(root);
    let root = root.trim_end_matches('/');

    let relative = if root.is_empty() {
        path.as_str()
    } else {
        path.strip_prefix(root)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(path.as_str())
    };

    let relative = relative.trim_start_matches("./");
    relative.trim_start_matches('/').to_string()
}
