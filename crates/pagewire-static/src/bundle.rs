//! In-memory set of build outputs.

use std::fs;
use std::path::Path;

use pagewire_meta::PAGE_EXTENSION;

use crate::builder::BuildError;
use crate::sanitize::sanitize_html;

/// Contents of an emitted file.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactSource {
    Text(String),
    Binary(Vec<u8>),
}

/// One file in the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Slash-separated path relative to the output directory
    pub file_name: String,
    pub source: ArtifactSource,
}

/// Every artifact produced by a build, in emission order.
#[derive(Debug, Default)]
pub struct OutputBundle {
    artifacts: Vec<Artifact>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an artifact, replacing any earlier one with the same name.
    pub fn emit(&mut self, file_name: impl Into<String>, source: ArtifactSource) {
        let file_name = file_name.into();
        if let Some(existing) = self.artifacts.iter_mut().find(|a| a.file_name == file_name) {
            existing.source = source;
        } else {
            self.artifacts.push(Artifact { file_name, source });
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.file_name == file_name)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    /// Strip module-loading hints from every textual HTML artifact.
    ///
    /// Returns the number of artifacts rewritten.
    pub fn sanitize(&mut self) -> usize {
        let suffix = format!(".{}", PAGE_EXTENSION);
        let mut count = 0;

        for artifact in &mut self.artifacts {
            if !artifact.file_name.ends_with(&suffix) {
                continue;
            }
            if let ArtifactSource::Text(html) = &mut artifact.source {
                *html = sanitize_html(html);
                count += 1;
            }
        }

        tracing::info!(
            "Removed modulepreload / crossorigin / type=\"module\" from {} HTML files",
            count
        );

        count
    }

    /// Write every artifact below `out_dir`.
    pub fn write_to(&self, out_dir: &Path) -> Result<(), BuildError> {
        for artifact in &self.artifacts {
            let path = out_dir.join(&artifact.file_name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }

            let result = match &artifact.source {
                ArtifactSource::Text(text) => fs::write(&path, text),
                ArtifactSource::Binary(bytes) => fs::write(&path, bytes),
            };
            result.map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))?;
        }

        Ok(())
    }
}
