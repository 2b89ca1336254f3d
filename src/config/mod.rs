//! Configuration management.
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! environment variables prefixed `PAPER_MIRROR_` with nested keys separated
//! by `__` (for example `PAPER_MIRROR_DELAY__MIN_SECS=1`). Command line flags
//! are applied on top by the binary.

mod file_config;
mod mirrors;

pub use file_config::{find_config_file, ConfigFileError, LOCAL_CONFIG_NAME};
pub use mirrors::{Mirror, MirrorList, DEFAULT_MAX_MIRRORS, DEFAULT_MIRRORS};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sources::UNPAYWALL_API_BASE;
use crate::utils::{DelayRange, DEFAULT_MIN_SIZE, DEFAULT_SNIFF_WINDOW, MAX_DELAY_SECS};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "PAPER_MIRROR";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Mirror sources
    #[serde(default)]
    pub mirrors: MirrorsConfig,

    /// Pause between mirror attempts
    #[serde(default)]
    pub delay: DelayConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Payload validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Open-access fallback
    #[serde(default)]
    pub open_access: OpenAccessConfig,

    /// Output locations
    #[serde(default)]
    pub downloads: DownloadConfig,
}

/// Mirror configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorsConfig {
    /// Base URLs in attempt order
    #[serde(default = "default_mirror_urls")]
    pub urls: Vec<String>,

    /// Maximum number of mirrors tried per DOI
    #[serde(default = "default_max_mirrors")]
    pub max: usize,
}

impl Default for MirrorsConfig {
    fn default() -> Self {
        Self {
            urls: default_mirror_urls(),
            max: default_max_mirrors(),
        }
    }
}

fn default_mirror_urls() -> Vec<String> {
    DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect()
}

fn default_max_mirrors() -> usize {
    DEFAULT_MAX_MIRRORS
}

/// Delay configuration, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    #[serde(default = "default_delay_min")]
    pub min_secs: f64,

    #[serde(default = "default_delay_max")]
    pub max_secs: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_secs: default_delay_min(),
            max_secs: default_delay_max(),
        }
    }
}

impl DelayConfig {
    pub fn range(&self) -> DelayRange {
        DelayRange::new(self.min_secs, self.max_secs)
    }
}

fn default_delay_min() -> f64 {
    DelayRange::default().min_secs
}

fn default_delay_max() -> f64 {
    DelayRange::default().max_secs
}

/// HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rendering proxy used once after a 403; empty disables the retry
    #[serde(default = "default_bypass_proxy")]
    pub bypass_proxy: String,

    /// User-Agent pool; empty uses the built-in pool
    #[serde(default)]
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            bypass_proxy: default_bypass_proxy(),
            user_agents: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The bypass proxy, if enabled
    pub fn bypass_proxy(&self) -> Option<String> {
        let proxy = self.bypass_proxy.trim();
        (!proxy.is_empty()).then(|| proxy.to_string())
    }
}

fn default_timeout_secs() -> u64 {
    crate::utils::DEFAULT_TIMEOUT.as_secs()
}

fn default_bypass_proxy() -> String {
    crate::utils::DEFAULT_BYPASS_PROXY.to_string()
}

/// Validation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Payloads smaller than this are sniffed for HTML
    #[serde(default = "default_min_size")]
    pub min_size_bytes: usize,

    /// Leading bytes inspected when sniffing
    #[serde(default = "default_sniff_window")]
    pub sniff_window_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: default_min_size(),
            sniff_window_bytes: default_sniff_window(),
        }
    }
}

fn default_min_size() -> usize {
    DEFAULT_MIN_SIZE
}

fn default_sniff_window() -> usize {
    DEFAULT_SNIFF_WINDOW
}

/// Open-access fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAccessConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Contact email sent with lookups (falls back to `UNPAYWALL_EMAIL`)
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for OpenAccessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: None,
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    UNPAYWALL_API_BASE.to_string()
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Flat directory the PDFs are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Archive of the successful downloads
    #[serde(default = "default_archive_name")]
    pub archive_name: PathBuf,

    /// One failed DOI per line
    #[serde(default = "default_failed_list_name")]
    pub failed_list_name: PathBuf,

    /// Remove the output directory before a batch
    #[serde(default = "default_true")]
    pub clear_output_dir: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            archive_name: default_archive_name(),
            failed_list_name: default_failed_list_name(),
            clear_output_dir: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("papers")
}

fn default_archive_name() -> PathBuf {
    PathBuf::from("downloaded_papers.zip")
}

fn default_failed_list_name() -> PathBuf {
    PathBuf::from("failed_dois.txt")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Mirror list built from the configured URLs
    pub fn mirror_list(&self) -> MirrorList {
        MirrorList::build(&self.mirrors.urls, self.mirrors.max)
    }

    /// Check that the settings make sense together
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |msg: &str| -> Result<(), config::ConfigError> {
            Err(config::ConfigError::Message(msg.to_string()))
        };

        if !self.delay.min_secs.is_finite() || !self.delay.max_secs.is_finite() {
            return invalid("delay bounds must be finite numbers");
        }
        if self.delay.max_secs > MAX_DELAY_SECS {
            return invalid("delay.max_secs must not exceed one hour");
        }
        if self.delay.min_secs < 0.0 || self.delay.max_secs < 0.0 {
            return invalid("delay bounds must not be negative");
        }
        if self.delay.min_secs > self.delay.max_secs {
            return invalid("delay.min_secs must not exceed delay.max_secs");
        }
        if self.mirrors.max == 0 {
            return invalid("mirrors.max must be at least 1");
        }
        if self.http.timeout_secs == 0 {
            return invalid("http.timeout_secs must be at least 1");
        }
        if self.validation.min_size_bytes == 0 {
            return invalid("validation.min_size_bytes must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from an optional file layered with the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mirrors.max, 3);
        assert_eq!(config.mirrors.urls.len(), 3);
        assert_eq!(config.delay.range(), DelayRange::new(3.0, 7.0));
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.validation.min_size_bytes, 10_000);
        assert!(config.open_access.enabled);
        assert_eq!(config.downloads.output_dir, PathBuf::from("papers"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_mirror_list() {
        assert_eq!(Config::default().mirror_list(), MirrorList::defaults());
    }

    #[test]
    fn test_validate_rejects_inverted_delay() {
        let mut config = Config::default();
        config.delay = DelayConfig {
            min_secs: 5.0,
            max_secs: 1.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_delay() {
        for max_secs in [f64::INFINITY, f64::NAN, 1e300, MAX_DELAY_SECS + 1.0] {
            let mut config = Config::default();
            config.delay.max_secs = max_secs;
            assert!(config.validate().is_err(), "accepted max_secs = {max_secs}");
        }

        let mut config = Config::default();
        config.delay.max_secs = MAX_DELAY_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_rejects_huge_delay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        std::fs::write(&path, "[delay]\nmax_secs = 1e300\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.mirrors.max = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_bypass_proxy_disables_retry() {
        let mut http = HttpConfig::default();
        assert!(http.bypass_proxy().is_some());
        http.bypass_proxy = "  ".to_string();
        assert_eq!(http.bypass_proxy(), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("paper-mirror.toml");
        std::fs::write(
            &path,
            r#"
[mirrors]
urls = ["https://mirror.example"]
max = 2

[delay]
min_secs = 0.5
max_secs = 1.5

[open_access]
enabled = false
email = "me@example.org"

[downloads]
output_dir = "out"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.mirrors.urls, vec!["https://mirror.example"]);
        assert_eq!(config.mirrors.max, 2);
        assert_eq!(config.delay.min_secs, 0.5);
        assert!(!config.open_access.enabled);
        assert_eq!(config.open_access.email.as_deref(), Some("me@example.org"));
        assert_eq!(config.downloads.output_dir, PathBuf::from("out"));
        // Untouched sections keep their defaults
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(
            config.mirror_list().get(0).map(Mirror::base_url),
            Some("https://mirror.example/")
        );
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[delay]\nmin_secs = 9.0\nmax_secs = 1.0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
