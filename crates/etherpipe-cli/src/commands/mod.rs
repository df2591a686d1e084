//! CLI subcommand implementations.

use std::path::PathBuf;

use etherpipe_core::config::ClientConfig;

pub mod account;
pub mod accounts;
pub mod query;
pub mod send;
pub mod util;

/// Resolve the client configuration.
///
/// An explicit `--config` must exist. Without one, `~/.etherpipe/config.yaml`
/// is used when present and the built-in defaults otherwise. `--ipc` wins
/// over whatever socket path the file names.
pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    ipc: Option<PathBuf>,
) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => ClientConfig::from_file(&path)
            .map_err(|e| format!("failed to load {}: {e}", path.display()))?,
        None => match default_config_path() {
            Some(path) if path.exists() => ClientConfig::from_file(&path)
                .map_err(|e| format!("failed to load {}: {e}", path.display()))?,
            _ => ClientConfig::default(),
        },
    };

    if let Some(ipc) = ipc {
        config.socket_path = ipc;
    }
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".etherpipe").join("config.yaml"))
}
