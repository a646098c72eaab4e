//! Mode-specific `.env` loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading env files.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Loads environment variables for a build mode from a directory.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    dir: PathBuf,
    mode: String,
    prefixes: Vec<String>,
}

impl EnvLoader {
    /// Loader for `mode` reading env files from `dir`. Every key is kept.
    pub fn new(dir: impl Into<PathBuf>, mode: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            mode: mode.into(),
            prefixes: vec![String::new()],
        }
    }

    /// Keep only keys starting with one of `prefixes`.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Env files in increasing priority.
    pub fn files(&self) -> Vec<PathBuf> {
        [
            ".env".to_string(),
            ".env.local".to_string(),
            format!(".env.{}", self.mode),
            format!(".env.{}.local", self.mode),
        ]
        .into_iter()
        .map(|name| self.dir.join(name))
        .collect()
    }

    /// Read the env files, then let `process_vars` override them.
    ///
    /// Missing files are skipped.
    pub fn load<I>(&self, process_vars: I) -> Result<BTreeMap<String, String>, EnvError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars = BTreeMap::new();

        for file in self.files() {
            if !file.is_file() {
                continue;
            }
            for (key, value) in read_env_file(&file)? {
                vars.insert(key, value);
            }
            tracing::debug!("Loaded {}", file.display());
        }

        vars.extend(process_vars);
        vars.retain(|key, _| self.matches_prefix(key));

        Ok(vars)
    }

    fn matches_prefix(&self, key: &str) -> bool {
        self.prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

fn read_env_file(path: &Path) -> Result<Vec<(String, String)>, EnvError> {
    let parse_error = |e: dotenvy::Error| EnvError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    dotenvy::from_path_iter(path)
        .map_err(parse_error)?
        .map(|item| item.map_err(parse_error))
        .collect()
}
