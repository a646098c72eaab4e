//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use pagewire_static::{BuildConfig, StaticBuilder};

use crate::config::{base_dir, load_config};

/// Resolve the build configuration from the config file and CLI overrides.
fn resolve_config(
    config_path: &Path,
    mode: String,
    out_dir: Option<PathBuf>,
    minify: Option<bool>,
) -> Result<BuildConfig> {
    let file_config = load_config(config_path)?;
    let mut config = file_config.to_build_config(&base_dir(config_path), mode);

    if let Some(out_dir) = out_dir {
        config.output_dir = out_dir;
    }
    if let Some(minify) = minify {
        config.minify = minify;
    }

    Ok(config)
}

/// Run the build command.
pub async fn run(
    config_path: &Path,
    mode: String,
    out_dir: Option<PathBuf>,
    minify: Option<bool>,
) -> Result<()> {
    tracing::info!("Building static site ({} mode)...", mode);

    let config = resolve_config(config_path, mode, out_dir, minify)?;
    let result = StaticBuilder::new(config).build().await?;

    tracing::info!(
        "Built {} pages with {} assets in {}ms",
        result.pages,
        result.assets,
        result.duration_ms
    );
    tracing::debug!("Entries: {}", result.entries.join(", "));

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn cli_flags_override_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("pagewire.toml");
        fs::write(&config_path, "[site]\nout_dir = \"public_html\"\n").unwrap();

        let config = resolve_config(&config_path, "production".to_string(), None, None).unwrap();
        assert_eq!(config.output_dir, temp.path().join("public_html"));
        assert!(!config.minify);

        let config = resolve_config(
            &config_path,
            "staging".to_string(),
            Some(PathBuf::from("out")),
            Some(true),
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.minify);
        assert_eq!(config.mode, "staging");
    }

    #[tokio::test]
    async fn builds_site_from_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("partials")).unwrap();
        fs::write(src.join("partials/footer.html"), "<footer>{{ pages|length }}</footer>").unwrap();
        fs::write(
            src.join("index.html"),
            "<!-- @pageTitle Home -->\n<p>{{ page.title }}</p>\n{% include \"footer\" %}",
        )
        .unwrap();
        let config_path = temp.path().join("pagewire.toml");
        fs::write(&config_path, "").unwrap();

        run(&config_path, "production".to_string(), None, None)
            .await
            .unwrap();

        let html = fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("<p>Home</p>"));
        assert!(html.contains("<footer>1</footer>"));
    }
}
