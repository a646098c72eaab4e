//! Preview server command.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::Router;
use tower_http::services::ServeDir;

use crate::config::{base_dir, load_config};

/// Where and under which path the built site is previewed.
#[derive(Debug, PartialEq)]
struct PreviewTarget {
    dir: PathBuf,
    /// URL path the site is mounted at; `/` for relative bases
    mount: String,
}

fn resolve_target(config_path: &Path, dir: Option<PathBuf>) -> Result<PreviewTarget> {
    let file_config = load_config(config_path)?;
    let dir = dir.unwrap_or_else(|| base_dir(config_path).join(&file_config.site.out_dir));

    // An absolute base like "/blog/" is served below that path, as deployed.
    let base = file_config.site.base.trim_end_matches('/');
    let mount = if base.starts_with('/') && !base.is_empty() {
        base.to_string()
    } else {
        "/".to_string()
    };

    Ok(PreviewTarget { dir, mount })
}

/// Run the serve command.
pub async fn run(config_path: &Path, port: u16, dir: Option<PathBuf>) -> Result<()> {
    let target = resolve_target(config_path, dir)?;
    if !target.dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'pagewire build' first.",
            target.dir.display()
        );
    }

    let addr: SocketAddr = format!("127.0.0.1:{}", port)
        .parse()
        .context("Invalid address")?;

    let serve_dir = ServeDir::new(&target.dir);
    let app = if target.mount == "/" {
        Router::new().fallback_service(serve_dir)
    } else {
        Router::new().nest_service(&target.mount, serve_dir)
    };

    let url = format!("http://{}{}", addr, target.mount);
    tracing::info!("Previewing {} at {}", target.dir.display(), url);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let _ = open::that(&url);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn previews_configured_output_directory() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("pagewire.toml");
        fs::write(&config_path, "[site]\nout_dir = \"build\"\n").unwrap();

        let target = resolve_target(&config_path, None).unwrap();

        assert_eq!(
            target,
            PreviewTarget {
                dir: temp.path().join("build"),
                mount: "/".to_string(),
            }
        );
    }

    #[test]
    fn explicit_dir_wins_and_absolute_base_is_mounted() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("pagewire.toml");
        fs::write(&config_path, "[site]\nbase = \"/blog/\"\n").unwrap();

        let target = resolve_target(&config_path, Some(PathBuf::from("out"))).unwrap();

        assert_eq!(target.dir, PathBuf::from("out"));
        assert_eq!(target.mount, "/blog");
    }

    #[test]
    fn root_base_is_served_at_root() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("pagewire.toml");
        fs::write(&config_path, "[site]\nbase = \"/\"\n").unwrap();

        let target = resolve_target(&config_path, None).unwrap();

        assert_eq!(target.mount, "/");
        assert_eq!(target.dir, temp.path().join("dist"));
    }
}
