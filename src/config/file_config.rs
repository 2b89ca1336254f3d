//! Configuration file discovery and persistence.
//!
//! # Configuration File Format
//!
//! ```toml
//! [mirrors]
//! urls = ["https://sci-hub.box/", "https://sci-hub.se/", "https://sci-hub.wf/"]
//! max = 3
//!
//! [delay]
//! min_secs = 3.0
//! max_secs = 7.0
//!
//! [http]
//! timeout_secs = 30
//! bypass_proxy = "https://r.jina.ai/"
//! user_agents = []
//!
//! [validation]
//! min_size_bytes = 10000
//! sniff_window_bytes = 1000
//!
//! [open_access]
//! enabled = true
//! email = "you@example.org"
//! api_base = "https://api.unpaywall.org/v2"
//!
//! [downloads]
//! output_dir = "papers"
//! archive_name = "downloaded_papers.zip"
//! failed_list_name = "failed_dois.txt"
//! clear_output_dir = true
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_NAME: &str = "paper-mirror.toml";

/// Locate a configuration file.
///
/// Checks `./paper-mirror.toml`, then `<config dir>/paper-mirror/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-mirror").join("config.toml"))
        .filter(|path| path.is_file())
}

impl Config {
    /// Write the configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
