//! Static site builder.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::assets::{AssetOptions, AssetPipeline};
use crate::bundle::{ArtifactSource, OutputBundle};
use crate::context::ContextProvider;
use crate::discover::{discover_pages, load_pages};
use crate::entries::EntryMap;
use crate::env::{EnvError, EnvLoader};
use crate::templates::TemplateEngine;

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source root containing pages and shared fragments
    pub root: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Files copied verbatim to the output root
    pub public_dir: Option<PathBuf>,

    /// Public base path (`./` for page-relative URLs)
    pub base: String,

    /// Shared fragment directories below `root`, never built as pages
    pub partial_dirs: Vec<String>,

    /// One stylesheet per source instead of a combined one
    pub css_code_split: bool,

    /// Minify CSS output
    pub minify: bool,

    /// Inline assets below this size in bytes; 0 disables inlining
    pub assets_inline_limit: u64,

    /// Remove the output directory before writing
    pub empty_out_dir: bool,

    /// Build mode selecting `.env.<mode>` files
    pub mode: String,

    /// Directory holding the `.env` files
    pub env_dir: PathBuf,

    /// Env keys to keep; the empty prefix keeps everything
    pub env_prefixes: Vec<String>,

    /// Style preprocessor options, passed through untouched
    pub preprocessor_options: toml::Table,

    /// Extra script URLs appended to every page
    pub inject_scripts: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("src"),
            output_dir: PathBuf::from("dist"),
            public_dir: Some(PathBuf::from("public")),
            base: "./".to_string(),
            partial_dirs: vec![
                "partials".to_string(),
                "components".to_string(),
                "layout".to_string(),
            ],
            css_code_split: true,
            minify: false,
            assets_inline_limit: 0,
            empty_out_dir: true,
            mode: "production".to_string(),
            env_dir: PathBuf::from("."),
            env_prefixes: vec![String::new()],
            preprocessor_options: toml::Table::new(),
            inject_scripts: vec![],
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of asset files emitted
    pub assets: usize,

    /// Entry names that were built
    pub entries: Vec<String>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to read source: {0}")]
    ReadError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to load environment: {0}")]
    EnvError(#[from] EnvError),
}

/// A page rendered by the template engine, before asset rewriting.
#[derive(Debug)]
struct RenderedPage {
    /// Path relative to the source root
    source_file: String,

    /// Path relative to the output root
    output_file: String,

    html: String,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the static site.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let env = EnvLoader::new(&self.config.env_dir, &self.config.mode)
            .with_prefixes(self.config.env_prefixes.clone())
            .load(std::env::vars())?;
        tracing::debug!(
            "Loaded {} env variables for mode '{}'",
            env.len(),
            self.config.mode
        );

        if !self.config.preprocessor_options.is_empty() {
            tracing::debug!(
                "Style preprocessor options: {:?}",
                self.config.preprocessor_options
            );
        }

        let root = std::path::absolute(&self.config.root)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", self.config.root.display(), e)))?;

        // Discover pages and their metadata
        let files = discover_pages(&root, &self.config.partial_dirs);
        let pages = load_pages(&root, &files)?;
        let entries = EntryMap::from_pages(&root, &pages);
        let provider = ContextProvider::new(&root, pages);
        let templates = TemplateEngine::new(&root, &self.config.partial_dirs)?;

        tracing::info!(
            "Found {} pages ({} entries, {} partials)",
            provider.pages().len(),
            entries.len(),
            templates.partials().len()
        );

        // Render entries in parallel
        let targets: Vec<(&str, &Path)> = entries.iter().collect();
        let rendered: Vec<Result<RenderedPage, BuildError>> = targets
            .par_iter()
            .map(|(_, source)| self.render_entry(&root, source, &provider, &templates))
            .collect();

        let mut bundle = OutputBundle::new();
        self.copy_public_dir(&mut bundle)?;

        // Rewrite asset references and emit pages
        let mut assets = AssetPipeline::new(
            &root,
            AssetOptions {
                base: self.config.base.clone(),
                minify: self.config.minify,
                inline_limit: self.config.assets_inline_limit,
                css_code_split: self.config.css_code_split,
            },
        );

        let mut page_count = 0;
        for page in rendered {
            let page = page?;
            let html =
                assets.process_page(&page.source_file, &page.output_file, &page.html, &mut bundle)?;
            let html = self.inject_scripts(html);
            bundle.emit(page.output_file, ArtifactSource::Text(html));
            page_count += 1;
        }

        let asset_count = assets.emitted_count();
        assets.finish(&mut bundle);

        bundle.sanitize();

        // Only a successful build replaces the previous output.
        if self.config.empty_out_dir && self.config.output_dir.exists() {
            fs::remove_dir_all(&self.config.output_dir)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        bundle.write_to(&self.config.output_dir)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: page_count,
            assets: asset_count,
            entries: targets.iter().map(|(name, _)| name.to_string()).collect(),
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Render one entry through the template engine.
    fn render_entry(
        &self,
        root: &Path,
        source: &Path,
        provider: &ContextProvider,
        templates: &TemplateEngine,
    ) -> Result<RenderedPage, BuildError> {
        let content = fs::read_to_string(source)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", source.display(), e)))?;

        let relative = source.strip_prefix(root).unwrap_or(source);
        let relative = pagewire_meta::normalize_path(&relative.to_string_lossy());

        let context = provider.context_for(&source.to_string_lossy());
        let html = templates
            .render_page(&relative, &content, &context)
            .map_err(|e| BuildError::TemplateError(format!("{}: {}", relative, e)))?;

        Ok(RenderedPage {
            output_file: relative.clone(),
            source_file: relative,
            html,
        })
    }

    /// Add `<script>` tags for configured extra scripts before `</body>`.
    fn inject_scripts(&self, html: String) -> String {
        if self.config.inject_scripts.is_empty() {
            return html;
        }

        let tags: String = self
            .config
            .inject_scripts
            .iter()
            .map(|src| format!("<script src=\"{}\"></script>\n", src))
            .collect();

        match html.to_ascii_lowercase().rfind("</body>") {
            Some(pos) => format!("{}{}{}", &html[..pos], tags, &html[pos..]),
            None => html + &tags,
        }
    }

    /// Copy the public directory into the bundle unchanged.
    fn copy_public_dir(&self, bundle: &mut OutputBundle) -> Result<(), BuildError> {
        let Some(public_dir) = &self.config.public_dir else {
            return Ok(());
        };
        if !public_dir.is_dir() {
            return Ok(());
        }

        let mut count = 0;
        for entry in WalkDir::new(public_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let relative = path.strip_prefix(public_dir).unwrap_or(path);
            let bytes = fs::read(path)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

            bundle.emit(
                pagewire_meta::normalize_path(&relative.to_string_lossy()),
                ArtifactSource::Binary(bytes),
            );
            count += 1;
        }

        tracing::info!("Copied {} files from {}", count, public_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn config(temp: &Path) -> BuildConfig {
        BuildConfig {
            root: temp.join("src"),
            output_dir: temp.join("dist"),
            public_dir: Some(temp.join("public")),
            env_dir: temp.to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn builds_home_and_about_pages() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");

        write(
            &src,
            "index.html",
            r#"<!-- @pageTitle Home -->
<html>
<head>
  <title>{{ page.title }}</title>
  <link rel="modulepreload" href="/js/main.js">
  <script type="module" crossorigin src="/js/main.js"></script>
</head>


<body>{% include "header" %}</body>
</html>
"#,
        );
        write(
            &src,
            "about/index.html",
            r#"<html><body>{% for p in pages %}[{{ p.title }}]{% endfor %}</body></html>"#,
        );
        write(&src, "partials/header.html", "<header>site</header>");
        write(&src, "js/main.js", "console.log('hi');");

        let result = StaticBuilder::new(config(temp.path())).build().await.unwrap();

        assert_eq!(result.pages, 2);
        assert_eq!(result.entries, vec!["".to_string(), "about".to_string()]);

        let out = temp.path().join("dist");
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("<title>Home</title>"));
        assert!(index.contains("<header>site</header>"));
        assert!(index.contains(r#"<script src="assets/js/main.js"></script>"#));
        assert!(!index.contains("modulepreload"));
        assert!(!index.contains("crossorigin"));
        assert!(!index.contains("type=\"module\""));
        assert!(!index.contains("\n\n"));

        let about = fs::read_to_string(out.join("about/index.html")).unwrap();
        assert!(about.contains("[index]"));
        assert!(about.contains("[Home]"));

        assert_eq!(
            fs::read_to_string(out.join("assets/js/main.js")).unwrap(),
            "console.log('hi');"
        );
        assert!(!out.join("partials/header.html").exists());
    }

    #[tokio::test]
    async fn copies_public_files_untouched() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("src"), "index.html", "<p>home</p>");
        write(
            &temp.path().join("public"),
            "static/raw.html",
            "<script type=\"module\"></script>",
        );

        StaticBuilder::new(config(temp.path())).build().await.unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("dist/static/raw.html")).unwrap(),
            "<script type=\"module\"></script>"
        );
    }

    #[tokio::test]
    async fn empties_output_directory_before_writing() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("src"), "index.html", "<p>home</p>");
        write(&temp.path().join("dist"), "stale.html", "old");

        StaticBuilder::new(config(temp.path())).build().await.unwrap();

        assert!(!temp.path().join("dist/stale.html").exists());
        assert!(temp.path().join("dist/index.html").exists());
    }

    #[tokio::test]
    async fn failed_build_keeps_previous_output() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        write(&src, "index.html", "<p>ok</p>");
        let builder = StaticBuilder::new(config(temp.path()));
        builder.build().await.unwrap();

        write(&src, "index.html", "{% if %}");
        let result = builder.build().await;

        assert!(matches!(result, Err(BuildError::TemplateError(_))));
        assert_eq!(
            fs::read_to_string(temp.path().join("dist/index.html")).unwrap(),
            "<p>ok</p>"
        );
    }

    #[tokio::test]
    async fn missing_source_root_builds_nothing() {
        let temp = tempdir().unwrap();

        let result = StaticBuilder::new(config(temp.path())).build().await.unwrap();

        assert_eq!(result.pages, 0);
        assert!(result.entries.is_empty());
    }

    #[tokio::test]
    async fn template_errors_fail_the_build() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("src"), "index.html", "{% include \"nope\" %}");

        let result = StaticBuilder::new(config(temp.path())).build().await;

        assert!(matches!(result, Err(BuildError::TemplateError(_))));
    }

    #[tokio::test]
    async fn injects_extra_scripts_before_body_end() {
        let temp = tempdir().unwrap();
        write(&temp.path().join("src"), "index.html", "<html><body><p>x</p></body></html>");

        let config = BuildConfig {
            inject_scripts: vec!["/__reload.js".to_string()],
            ..config(temp.path())
        };
        StaticBuilder::new(config).build().await.unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert_eq!(
            html,
            "<html><body><p>x</p><script src=\"/__reload.js\"></script>\n</body></html>"
        );
    }
}
