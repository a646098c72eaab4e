//! Configuration file structure (pagewire.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagewire_static::BuildConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub build: BuildSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    /// Shared fragment directories below the root
    #[serde(default = "default_partials")]
    pub partials: Vec<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct CssConfig {
    #[serde(default = "default_true")]
    pub code_split: bool,
    #[serde(default)]
    pub preprocessor_options: toml::Table,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct BuildSettings {
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub assets_inline_limit: u64,
    #[serde(default = "default_true")]
    pub empty_out_dir: bool,
    /// Env keys to load; empty string keeps all
    #[serde(default = "default_env_prefixes")]
    pub env_prefixes: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            base: default_base(),
            public_dir: default_public_dir(),
            out_dir: default_out_dir(),
            partials: default_partials(),
        }
    }
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            code_split: true,
            preprocessor_options: toml::Table::new(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: false,
            assets_inline_limit: 0,
            empty_out_dir: true,
            env_prefixes: default_env_prefixes(),
        }
    }
}

fn default_root() -> String {
    "src".to_string()
}
fn default_base() -> String {
    "./".to_string()
}
fn default_public_dir() -> String {
    "public".to_string()
}
fn default_out_dir() -> String {
    "dist".to_string()
}
fn default_partials() -> Vec<String> {
    vec![
        "partials".to_string(),
        "components".to_string(),
        "layout".to_string(),
    ]
}
fn default_env_prefixes() -> Vec<String> {
    vec![String::new()]
}
fn default_true() -> bool {
    true
}

impl ConfigFile {
    /// Turn the file settings into a build configuration for `mode`.
    ///
    /// Relative paths are resolved against `base_dir`, the directory holding
    /// the config file.
    pub fn to_build_config(&self, base_dir: &Path, mode: String) -> BuildConfig {
        BuildConfig {
            root: base_dir.join(&self.site.root),
            output_dir: base_dir.join(&self.site.out_dir),
            public_dir: Some(base_dir.join(&self.site.public_dir)),
            base: self.site.base.clone(),
            partial_dirs: self.site.partials.clone(),
            css_code_split: self.css.code_split,
            minify: self.build.minify,
            assets_inline_limit: self.build.assets_inline_limit,
            empty_out_dir: self.build.empty_out_dir,
            mode,
            env_dir: base_dir.to_path_buf(),
            env_prefixes: self.build.env_prefixes.clone(),
            preprocessor_options: self.css.preprocessor_options.clone(),
            inject_scripts: vec![],
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse_config(content: &str) -> Result<ConfigFile, toml::de::Error> {
    toml::from_str(content)
}

/// Directory relative paths in the config file are resolved against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.site.root, "src");
        assert_eq!(config.site.base, "./");
        assert!(config.css.code_split);
        assert!(config.build.empty_out_dir);
        assert_eq!(config.build.assets_inline_limit, 0);
    }

    #[test]
    fn parses_all_sections() {
        let config = parse_config(
            r#"
[site]
root = "pages"
base = "/blog/"
partials = ["shared"]

[css]
code_split = false
[css.preprocessor_options.scss]
api = "modern"

[build]
minify = true
assets_inline_limit = 4096
"#,
        )
        .unwrap();

        let build = config.to_build_config(Path::new("/work"), "production".to_string());

        assert_eq!(build.root, PathBuf::from("/work/pages"));
        assert_eq!(build.output_dir, PathBuf::from("/work/dist"));
        assert_eq!(build.base, "/blog/");
        assert_eq!(build.partial_dirs, vec!["shared".to_string()]);
        assert!(!build.css_code_split);
        assert!(build.minify);
        assert_eq!(build.assets_inline_limit, 4096);
        assert!(build.preprocessor_options.contains_key("scss"));
        assert_eq!(build.mode, "production");
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(parse_config("[site\nroot = 1").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().unwrap();

        let config = load_config(&temp.path().join("pagewire.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn base_dir_of_bare_file_name_is_cwd() {
        assert_eq!(base_dir(Path::new("pagewire.toml")), PathBuf::from("."));
        assert_eq!(base_dir(Path::new("site/pagewire.toml")), PathBuf::from("site"));
    }
}
