//! Removal of module-loading hints from emitted HTML.
//!
//! Pages are served as plain documents, not as ES module graphs, so
//! `modulepreload` links and `crossorigin` / `type="module"` attributes are
//! dropped after the build.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static MODULEPRELOAD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<link\b(?:[^>"']|"[^"]*"|'[^']*')*?\brel\s*=\s*["']modulepreload["'](?:[^>"']|"[^"]*"|'[^']*')*>"#,
    )
    .expect("Invalid modulepreload regex")
});

/// An opening tag; quoted attribute values may contain `>`.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[A-Za-z](?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("Invalid tag regex")
});

static CROSSORIGIN_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+crossorigin\b(?:\s*=\s*(?:"[^"]*"|'[^']*'))?"#)
        .expect("Invalid crossorigin regex")
});

static TYPE_MODULE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+type\s*=\s*["']module["']"#).expect("Invalid type=module regex")
});

static TRAILING_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("Invalid trailing whitespace regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("Invalid blank line regex"));

/// Strip module-loading hints and collapse blank lines.
///
/// Applying it to its own output changes nothing.
pub fn sanitize_html(html: &str) -> String {
    let html = MODULEPRELOAD_LINK.replace_all(html, "");

    let html = TAG.replace_all(&html, |caps: &Captures| {
        let tag = &caps[0];
        let tag = CROSSORIGIN_ATTR.replace_all(tag, "");
        let tag = TYPE_MODULE_ATTR.replace_all(&tag, "");
        tag.into_owned()
    });

    let html = TRAILING_WHITESPACE.replace_all(&html, "\n");
    let html: Cow<'_, str> = BLANK_LINES.replace_all(&html, "\n");

    html.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_module_hints() {
        let input = "<head>\n<link rel=\"modulepreload\" href=\"x.js\">\n<script type=\"module\" crossorigin src=\"y.js\"></script>\n\n\n\n<p>done</p>\n</head>";

        let output = sanitize_html(input);

        assert_eq!(
            output,
            "<head>\n<script src=\"y.js\"></script>\n<p>done</p>\n</head>"
        );
    }

    #[test]
    fn removes_multiline_modulepreload_links() {
        let input = "<link\n  rel='MODULEPRELOAD'\n  href=\"/assets/js/chunk.js\">\n<title>t</title>";

        assert_eq!(sanitize_html(input), "\n<title>t</title>");
    }

    #[test]
    fn keeps_neighbouring_links() {
        let input = "<link rel=\"stylesheet\" href=\"a.css\"><link rel=\"modulepreload\" href=\"b.js\">";

        assert_eq!(sanitize_html(input), "<link rel=\"stylesheet\" href=\"a.css\">");
    }

    #[test]
    fn removes_crossorigin_with_value() {
        let input = r#"<link rel="stylesheet" crossorigin="anonymous" href="a.css">"#;

        assert_eq!(sanitize_html(input), r#"<link rel="stylesheet" href="a.css">"#);
    }

    #[test]
    fn sees_past_angle_brackets_in_attribute_values() {
        let input = r#"<script type="module" data-x="a>b" crossorigin src="y.js"></script>"#;

        assert_eq!(
            sanitize_html(input),
            r#"<script data-x="a>b" src="y.js"></script>"#
        );
    }

    #[test]
    fn removes_modulepreload_links_with_angle_brackets_in_values() {
        let input = r#"<link title="a>b" rel="modulepreload" href="x.js"><p>kept</p>"#;

        assert_eq!(sanitize_html(input), "<p>kept</p>");
    }

    #[test]
    fn leaves_other_script_types_alone() {
        let input = r#"<script type="text/javascript" src="a.js"></script>"#;

        assert_eq!(sanitize_html(input), input);
    }

    #[test]
    fn leaves_text_content_alone() {
        let input = "<p>The crossorigin attribute is gone.</p>";

        assert_eq!(sanitize_html(input), input);
    }

    #[test]
    fn trims_trailing_whitespace() {
        assert_eq!(sanitize_html("<p>a</p>   \t\n<p>b</p>"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn is_idempotent() {
        let input = "<html>  \n<head>\n  <link rel=\"modulepreload\" href=\"a.js\">\n  <script type='module' crossorigin src=\"a.js\"></script>\n\n\n</head>\n<body>\n\n<p>x</p>   \n</body>\n</html>\n";

        let once = sanitize_html(input);
        let twice = sanitize_html(&once);

        assert_eq!(once, twice);
        assert!(!once.contains("modulepreload"));
        assert!(!once.contains("crossorigin"));
        assert!(!once.contains("module"));
    }
}
