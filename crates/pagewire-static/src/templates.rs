//! Template engine expanding shared partials into pages.

use std::fs;
use std::path::Path;

use minijinja::{AutoEscape, Environment};
use pagewire_meta::{normalize_path, PAGE_EXTENSION};
use walkdir::WalkDir;

use crate::builder::BuildError;
use crate::context::RenderContext;

/// Template engine using minijinja.
///
/// Every `.html` file below a partial directory is available to pages under
/// its path relative to that directory, without extension: `partials/nav/menu.html`
/// is included as `{% include "nav/menu" %}`.
pub struct TemplateEngine {
    env: Environment<'static>,
    partials: Vec<String>,
}

impl TemplateEngine {
    /// Create an engine with the partials found under `root/<dir>`.
    ///
    /// Directories are registered in order, so a later directory wins when
    /// two partials share a name. Missing directories are skipped.
    pub fn new<S: AsRef<str>>(root: &Path, partial_dirs: &[S]) -> Result<Self, BuildError> {
        let mut engine = Self::empty();

        for dir in partial_dirs {
            let dir = root.join(dir.as_ref());
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                let is_page = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == PAGE_EXTENSION);
                if !entry.file_type().is_file() || !is_page {
                    continue;
                }

                let relative = path.strip_prefix(&dir).unwrap_or(path).with_extension("");
                let name = normalize_path(&relative.to_string_lossy());
                let source = fs::read_to_string(path)
                    .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

                engine
                    .add_partial(&name, source)
                    .map_err(|e| BuildError::TemplateError(format!("{}: {}", path.display(), e)))?;
            }
        }

        tracing::debug!("Registered {} partials", engine.partials.len());

        Ok(engine)
    }

    /// An engine without partials.
    pub fn empty() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        Self {
            env,
            partials: Vec::new(),
        }
    }

    /// Register a partial under `name`.
    pub fn add_partial(&mut self, name: &str, source: String) -> Result<(), minijinja::Error> {
        self.env.add_template_owned(name.to_string(), source)?;
        if !self.partials.iter().any(|p| p == name) {
            self.partials.push(name.to_string());
        }
        Ok(())
    }

    /// Names of the registered partials.
    pub fn partials(&self) -> &[String] {
        &self.partials
    }

    /// Render a page's source with its context.
    pub fn render_page(
        &self,
        name: &str,
        source: &str,
        context: &RenderContext,
    ) -> Result<String, minijinja::Error> {
        self.env.render_named_str(name, source, context)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::empty()
    }
}
