//! Asset pipeline for scripts, stylesheets and static files referenced by pages.
//!
//! Output naming:
//! - scripts: `assets/js/<name>.js`
//! - stylesheets: `assets/css/<name>.css`
//! - everything else: `assets/<ext>/<name>.<ext>`

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pagewire_meta::PAGE_EXTENSION;
use regex::Regex;

use crate::builder::BuildError;
use crate::bundle::{ArtifactSource, OutputBundle};

/// Name of the stylesheet used when CSS code splitting is off.
pub const COMBINED_CSS: &str = "style";

static ASSET_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(script|link|img|source|video|audio)\b[^>]*>").expect("Invalid asset tag regex")
});

static URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:src|href)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid URL attribute regex")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("Invalid CSS url regex")
});

/// Settings that shape asset output.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Public base path; `./` produces page-relative URLs
    pub base: String,
    /// Minify stylesheets
    pub minify: bool,
    /// Files smaller than this many bytes are inlined; 0 disables inlining
    pub inline_limit: u64,
    /// One stylesheet per source instead of one combined file
    pub css_code_split: bool,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            base: "./".to_string(),
            minify: false,
            inline_limit: 0,
            css_code_split: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Script,
    Stylesheet,
    Other,
}

impl AssetKind {
    fn of(path: &Path) -> Self {
        match extension(path).as_str() {
            "js" | "mjs" => AssetKind::Script,
            "css" => AssetKind::Stylesheet,
            _ => AssetKind::Other,
        }
    }
}

/// Per-page state while rewriting references.
struct PageState {
    dir: PathBuf,
    prefix: String,
    linked_combined: bool,
}

/// Collects the assets referenced by pages and rewrites their URLs.
pub struct AssetPipeline {
    root: PathBuf,
    options: AssetOptions,
    /// Source file -> URL relative to the output root, or a data URI
    emitted: HashMap<PathBuf, String>,
    /// Output file names already taken
    taken: HashSet<String>,
    /// Stylesheets merged into the combined file, in link order
    combined: Vec<(PathBuf, String)>,
}

impl AssetPipeline {
    /// Create a pipeline resolving root-relative URLs against `root`.
    pub fn new(root: impl Into<PathBuf>, options: AssetOptions) -> Self {
        Self {
            root: root.into(),
            options,
            emitted: HashMap::new(),
            taken: HashSet::new(),
            combined: Vec::new(),
        }
    }

    /// Number of distinct asset files emitted so far.
    pub fn emitted_count(&self) -> usize {
        self.taken.len()
    }

    /// URL prefix that reaches the output root from a page.
    pub fn url_prefix(&self, output_file: &str) -> String {
        if self.options.base == "./" || self.options.base.is_empty() {
            "../".repeat(output_file.matches('/').count())
        } else if self.options.base.ends_with('/') {
            self.options.base.clone()
        } else {
            format!("{}/", self.options.base)
        }
    }

    /// Rewrite the local asset references of a rendered page.
    ///
    /// `source_file` is the page's path relative to the source root and
    /// `output_file` its path relative to the output root.
    pub fn process_page(
        &mut self,
        source_file: &str,
        output_file: &str,
        html: &str,
        bundle: &mut OutputBundle,
    ) -> Result<String, BuildError> {
        let dir = self
            .root
            .join(source_file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        let mut page = PageState {
            dir,
            prefix: self.url_prefix(output_file),
            linked_combined: false,
        };

        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for tag in ASSET_TAG.find_iter(html) {
            out.push_str(&html[last..tag.start()]);
            out.push_str(&self.rewrite_tag(tag.as_str(), &mut page, bundle)?);
            last = tag.end();
        }
        out.push_str(&html[last..]);

        Ok(out)
    }

    /// Emit the combined stylesheet, if any page linked one.
    pub fn finish(self, bundle: &mut OutputBundle) {
        if self.combined.is_empty() {
            return;
        }

        let css = self
            .combined
            .into_iter()
            .map(|(_, css)| css)
            .collect::<Vec<_>>()
            .join("\n");
        let css = if self.options.minify {
            minify_or_keep(css)
        } else {
            css
        };

        bundle.emit(
            format!("assets/css/{}.css", COMBINED_CSS),
            ArtifactSource::Text(css),
        );
    }

    fn rewrite_tag(
        &mut self,
        tag: &str,
        page: &mut PageState,
        bundle: &mut OutputBundle,
    ) -> Result<String, BuildError> {
        let mut out = String::with_capacity(tag.len());
        let mut last = 0;

        for caps in URL_ATTR.captures_iter(tag) {
            let Some(value) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let Some(source) = self.resolve(value.as_str(), &page.dir) else {
                continue;
            };
            // Links between pages are not assets.
            if extension(&source) == PAGE_EXTENSION {
                continue;
            }

            let url = if AssetKind::of(&source) == AssetKind::Stylesheet
                && !self.options.css_code_split
            {
                self.add_combined(&source, bundle)?;
                if page.linked_combined {
                    return Ok(String::new());
                }
                page.linked_combined = true;
                format!("{}assets/css/{}.css", page.prefix, COMBINED_CSS)
            } else {
                let url = self.emit_asset(&source, AssetKind::of(&source), bundle)?;
                if url.starts_with("data:") {
                    url
                } else {
                    format!("{}{}", page.prefix, url)
                }
            };

            out.push_str(&tag[last..value.start()]);
            out.push_str(&url);
            last = value.end();
        }

        out.push_str(&tag[last..]);
        Ok(out)
    }

    /// Resolve a URL to a local source file.
    ///
    /// `@/` and `/` are relative to the source root, anything else to `dir`.
    fn resolve(&self, url: &str, dir: &Path) -> Option<PathBuf> {
        if is_external(url) {
            return None;
        }

        let path = url.split(['?', '#']).next().unwrap_or(url);
        let candidate = if let Some(rest) = path.strip_prefix("@/") {
            self.root.join(rest)
        } else if let Some(rest) = path.strip_prefix('/') {
            self.root.join(rest)
        } else {
            dir.join(path)
        };
        let candidate = clean_path(&candidate);

        if candidate.is_file() {
            Some(candidate)
        } else {
            tracing::debug!("Leaving unresolved reference {}", url);
            None
        }
    }

    /// Emit `source` once and return its URL relative to the output root.
    fn emit_asset(
        &mut self,
        source: &Path,
        kind: AssetKind,
        bundle: &mut OutputBundle,
    ) -> Result<String, BuildError> {
        if let Some(url) = self.emitted.get(source) {
            return Ok(url.clone());
        }

        let url = match kind {
            AssetKind::Script => {
                let file_name = self.claim_name(source, "js", "js");
                bundle.emit(file_name.clone(), read_source(source)?);
                file_name
            }
            AssetKind::Stylesheet => {
                let css = self.process_stylesheet(source, bundle)?;
                let css = if self.options.minify {
                    minify_or_keep(css)
                } else {
                    css
                };
                let file_name = self.claim_name(source, "css", "css");
                bundle.emit(file_name.clone(), ArtifactSource::Text(css));
                file_name
            }
            AssetKind::Other => {
                let bytes = fs::read(source).map_err(|e| read_error(source, e))?;
                if (bytes.len() as u64) < self.options.inline_limit {
                    data_uri(source, &bytes)
                } else {
                    let ext = extension(source);
                    let dir = if ext.is_empty() { "misc" } else { ext.as_str() };
                    let file_name = self.claim_name(source, dir, &ext);
                    bundle.emit(file_name.clone(), ArtifactSource::Binary(bytes));
                    file_name
                }
            }
        };

        tracing::debug!("Asset {} -> {}", source.display(), url);
        self.emitted.insert(source.to_path_buf(), url.clone());
        Ok(url)
    }

    /// Read a stylesheet and emit the files its `url()` references point at.
    fn process_stylesheet(
        &mut self,
        source: &Path,
        bundle: &mut OutputBundle,
    ) -> Result<String, BuildError> {
        let css = fs::read_to_string(source).map_err(|e| read_error(source, e))?;
        let dir = source.parent().unwrap_or(&self.root).to_path_buf();

        let mut out = String::with_capacity(css.len());
        let mut last = 0;
        for caps in CSS_URL.captures_iter(&css) {
            let Some(value) = caps.get(1) else {
                continue;
            };
            let Some(target) = self.resolve(value.as_str().trim(), &dir) else {
                continue;
            };

            // Nested stylesheets are copied as they are.
            let kind = match AssetKind::of(&target) {
                AssetKind::Stylesheet => AssetKind::Other,
                kind => kind,
            };
            let url = self.emit_asset(&target, kind, bundle)?;
            // Stylesheets sit two levels below the output root.
            let url = if url.starts_with("data:") {
                url
            } else {
                format!("../../{}", url)
            };

            out.push_str(&css[last..value.start()]);
            out.push_str(&url);
            last = value.end();
        }
        out.push_str(&css[last..]);

        Ok(out)
    }

    fn add_combined(&mut self, source: &Path, bundle: &mut OutputBundle) -> Result<(), BuildError> {
        if self.combined.iter().any(|(path, _)| path == source) {
            return Ok(());
        }

        let css = self.process_stylesheet(source, bundle)?;
        self.combined.push((source.to_path_buf(), css));
        self.taken
            .insert(format!("assets/css/{}.css", COMBINED_CSS));
        Ok(())
    }

    /// Reserve an output file name, suffixing `-2`, `-3`, ... on clashes.
    fn claim_name(&mut self, source: &Path, dir: &str, ext: &str) -> String {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("asset");
        let dot = if ext.is_empty() { "" } else { "." };

        let mut n = 1;
        loop {
            let name = if n == 1 {
                stem.to_string()
            } else {
                format!("{}-{}", stem, n)
            };
            let file_name = format!("assets/{}/{}{}{}", dir, name, dot, ext);
            if self.taken.insert(file_name.clone()) {
                return file_name;
            }
            n += 1;
        }
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }
}

fn minify_or_keep(css: String) -> String {
    match AssetPipeline::minify_css(&css) {
        Ok(minified) => minified,
        Err(e) => {
            tracing::warn!("Keeping unminified CSS: {}", e);
            css
        }
    }
}

fn is_external(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with("http:")
        || lower.starts_with("https:")
        || lower.starts_with("//")
        || lower.starts_with("data:")
        || lower.starts_with('#')
        || lower.starts_with("mailto:")
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Lexically normalize `.` and `..` components.
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn read_source(path: &Path) -> Result<ArtifactSource, BuildError> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => ArtifactSource::Text(text),
        Err(e) => ArtifactSource::Binary(e.into_bytes()),
    })
}

fn read_error(path: &Path, e: std::io::Error) -> BuildError {
    BuildError::ReadError(format!("{}: {}", path.display(), e))
}

fn data_uri(path: &Path, bytes: &[u8]) -> String {
    let mime = match extension(path).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => "application/octet-stream",
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
