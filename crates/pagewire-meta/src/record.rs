//! Per-page records and entry naming.

use serde::Serialize;

use crate::annotation::extract_annotations;

/// Extension of page files, without the dot.
pub const PAGE_EXTENSION: &str = "html";

/// Metadata for one discovered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    /// Slash-separated path relative to the source root (`blog/post.html`)
    pub path: String,

    /// Logical entry name (`blog/post`, `blog` for `blog/index.html`)
    pub name: String,

    /// `@pageTitle`, else the file name without extension
    pub title: String,

    /// `@pageNote`
    pub note: String,

    /// `@pageCreated`
    pub created: String,

    /// `@pageUpdated`
    pub updated: String,
}

impl PageRecord {
    /// Build a record from a root-relative path and the page's content.
    pub fn from_source(relative_path: &str, content: &str) -> Self {
        let path = normalize_path(relative_path);
        let annotations = extract_annotations(content);
        let field = |key: &str| annotations.get(key).unwrap_or_default().to_string();

        let title = annotations
            .get("pageTitle")
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Self::title_fallback(&path));

        Self {
            name: derive_name(&path),
            title,
            note: field("pageNote"),
            created: field("pageCreated"),
            updated: field("pageUpdated"),
            path,
        }
    }

    /// Base file name without the page extension.
    pub fn title_fallback(path: &str) -> String {
        let base = path.rsplit('/').next().unwrap_or(path);
        strip_page_extension(base).to_string()
    }
}

/// Convert backslash separators to forward slashes.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Derive the entry name of a page from its root-relative path.
///
/// `index.html` is the site root (`""`), `about/index.html` is `about` and
/// `about.html` is also `about`.
pub fn derive_name(relative_path: &str) -> String {
    let path = normalize_path(relative_path);
    let name = strip_page_extension(&path);

    if name == "index" {
        return String::new();
    }

    name.strip_suffix("/index").unwrap_or(name).to_string()
}

fn strip_page_extension(path: &str) -> &str {
    path.strip_suffix(PAGE_EXTENSION)
        .and_then(|p| p.strip_suffix('.'))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_entry_names() {
        assert_eq!(derive_name("index.html"), "");
        assert_eq!(derive_name("about/index.html"), "about");
        assert_eq!(derive_name("about.html"), "about");
        assert_eq!(derive_name("a/b.html"), "a/b");
        assert_eq!(derive_name("a/b/index.html"), "a/b");
    }

    #[test]
    fn derives_names_from_windows_paths() {
        assert_eq!(derive_name(r"blog\index.html"), "blog");
        assert_eq!(derive_name(r"blog\post.html"), "blog/post");
    }

    #[test]
    fn keeps_index_inside_a_segment() {
        assert_eq!(derive_name("reindex.html"), "reindex");
        assert_eq!(derive_name("docs/myindex.html"), "docs/myindex");
    }

    #[test]
    fn unannotated_page_uses_defaults() {
        let record = PageRecord::from_source("guide/setup.html", "<h1>Setup</h1>\n");

        assert_eq!(
            record,
            PageRecord {
                path: "guide/setup.html".to_string(),
                name: "guide/setup".to_string(),
                title: "setup".to_string(),
                note: String::new(),
                created: String::new(),
                updated: String::new(),
            }
        );
    }

    #[test]
    fn index_page_title_falls_back_to_index() {
        let record = PageRecord::from_source("about/index.html", "");

        assert_eq!(record.name, "about");
        assert_eq!(record.title, "index");
    }

    #[test]
    fn annotated_page_fills_fields() {
        let source = "<!-- @pageTitle My Page -->\n<!-- @pageNote draft -->\n<html>";

        let record = PageRecord::from_source("index.html", source);

        assert_eq!(record.name, "");
        assert_eq!(record.title, "My Page");
        assert_eq!(record.note, "draft");
        assert_eq!(record.created, "");
    }

    #[test]
    fn blank_title_falls_back_to_file_name() {
        let record = PageRecord::from_source("about.html", "<!-- @pageTitle  -->\n");

        assert_eq!(record.title, "about");
    }

    #[test]
    fn title_on_line_eleven_is_ignored() {
        let mut source = "<p></p>\n".repeat(10);
        source.push_str("<!-- @pageTitle My Page -->\n");

        let record = PageRecord::from_source("late.html", &source);

        assert_eq!(record.title, "late");
    }

    #[test]
    fn serializes_with_template_keys() {
        let record = PageRecord::from_source("index.html", "<!-- @pageTitle Home -->");

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["path"], "index.html");
        assert_eq!(json["name"], "");
        assert_eq!(json["title"], "Home");
        assert_eq!(json["updated"], "");
    }
}
