//! Development server command.

use std::path::Path;

use anyhow::Result;
use pagewire_server::{DevServer, DevServerConfig};

use crate::config::{base_dir, load_config};

/// Run the dev server.
pub async fn run(config_path: &Path, mode: String, port: u16, open: bool) -> Result<()> {
    tracing::info!("Starting development server on port {}", port);

    let file_config = load_config(config_path)?;
    let build = file_config.to_build_config(&base_dir(config_path), mode);

    let config = DevServerConfig {
        build,
        port,
        open,
        ..Default::default()
    };

    DevServer::new(config).start().await?;

    Ok(())
}
