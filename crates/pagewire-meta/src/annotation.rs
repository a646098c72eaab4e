//! Annotation extraction from the head of a page file.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Number of leading lines scanned for annotations.
pub const ANNOTATION_LINES: usize = 10;

/// Matches `@key value -->`, capturing the key and the shortest value.
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z0-9_]+)\s+(.+?)\s*-->").expect("Invalid annotation regex")
});

/// Key/value pairs read from a page's annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    values: HashMap<String, String>,
}

impl Annotations {
    /// Look up an annotation value by key (without the `@`).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of distinct keys found.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no annotation was found.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extract annotations from the first [`ANNOTATION_LINES`] lines of a page.
///
/// Each line contributes at most one annotation. A key seen again on a later
/// line replaces the earlier value. Lines past the limit are never looked at,
/// whatever they contain.
pub fn extract_annotations(content: &str) -> Annotations {
    let mut values = HashMap::new();

    for line in content.split('\n').take(ANNOTATION_LINES) {
        let Some(caps) = ANNOTATION_RE.captures(line) else {
            continue;
        };

        let key = caps[1].to_string();
        let value = caps[2].trim().to_string();
        values.insert(key, value);
    }

    Annotations { values }
}
