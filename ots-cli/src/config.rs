//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `OTS_`-prefixed environment variables as the final overlay.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::calendar::{SubmitStrategy, DEFAULT_CALENDARS};
use crate::error::{Error, Result};

/// Fully resolved client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Calendar servers to submit digests to
    pub calendar_urls: Vec<String>,
    /// HTTP timeout for calendar and chain-RPC calls, in seconds
    pub timeout_secs: u64,
    /// How many calendars must succeed at stamp time
    pub submit_strategy: SubmitStrategy,
    /// Minimum number of calendars that must succeed, independent of `submit_strategy`
    pub min_successful: usize,
    /// Minimum combined consensus score for `overall_valid`
    pub min_score: f64,
    /// Seconds an upgrade attempt against one calendar URI is skipped after failing
    pub upgrade_cooldown_secs: u64,
    /// Directory the file-backed cache stores entries under
    pub cache_dir: Option<PathBuf>,
    /// JSON-RPC endpoint used for Ethereum attestation verification, if any
    pub ethereum_rpc_url: Option<String>,
    /// Electrum server used for Litecoin attestation verification
    pub litecoin_electrum_server: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar_urls: DEFAULT_CALENDARS.iter().map(|s| (*s).to_string()).collect(),
            timeout_secs: 30,
            submit_strategy: SubmitStrategy::FirstSuccess,
            min_successful: 1,
            min_score: ots_core::consensus::DEFAULT_MIN_SCORE,
            upgrade_cooldown_secs: 300,
            cache_dir: dirs::cache_dir().map(|d| d.join("ots")),
            ethereum_rpc_url: None,
            litecoin_electrum_server: Some("tcp://electrum-ltc.bysh.me:50001".to_string()),
        }
    }
}

/// On-disk shape of the optional TOML config file; every field optional so
/// a file only needs to override what it cares about
#[derive(Deserialize, Default)]
struct FileConfig {
    calendar_urls: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    submit_strategy: Option<String>,
    min_successful: Option<usize>,
    min_score: Option<f64>,
    upgrade_cooldown_secs: Option<u64>,
    cache_dir: Option<PathBuf>,
    ethereum_rpc_url: Option<String>,
    litecoin_electrum_server: Option<String>,
}

impl Config {
    /// Build configuration from defaults, an optional TOML file, then the
    /// process environment, in that precedence order (later wins)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config_path` is given but can't be
    /// read, or if its contents aren't valid TOML for this shape.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("OTS_CONFIG").map(PathBuf::from));

        if let Some(path) = path {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
                let file: FileConfig = toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
                config.apply_file(file);
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.calendar_urls {
            self.calendar_urls = v;
        }
        if let Some(v) = file.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = file.submit_strategy {
            if let Some(s) = SubmitStrategy::parse(&v) {
                self.submit_strategy = s;
            }
        }
        if let Some(v) = file.min_successful {
            self.min_successful = v;
        }
        if let Some(v) = file.min_score {
            self.min_score = v;
        }
        if let Some(v) = file.upgrade_cooldown_secs {
            self.upgrade_cooldown_secs = v;
        }
        if let Some(v) = file.cache_dir {
            self.cache_dir = Some(v);
        }
        if let Some(v) = file.ethereum_rpc_url {
            self.ethereum_rpc_url = Some(v);
        }
        if let Some(v) = file.litecoin_electrum_server {
            self.litecoin_electrum_server = Some(v);
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("OTS_CALENDAR_URLS") {
            self.calendar_urls = v.split(',').map(str::trim).map(str::to_string).collect();
        }
        if let Ok(v) = std::env::var("OTS_TIMEOUT_SECS") {
            self.timeout_secs =
                v.parse().map_err(|_| Error::Config(format!("OTS_TIMEOUT_SECS: invalid integer '{v}'")))?;
        }
        if let Ok(v) = std::env::var("OTS_SUBMIT_STRATEGY") {
            self.submit_strategy = SubmitStrategy::parse(&v)
                .ok_or_else(|| Error::Config(format!("OTS_SUBMIT_STRATEGY: unknown strategy '{v}'")))?;
        }
        if let Ok(v) = std::env::var("OTS_MIN_SUCCESSFUL") {
            self.min_successful = v
                .parse()
                .map_err(|_| Error::Config(format!("OTS_MIN_SUCCESSFUL: invalid integer '{v}'")))?;
        }
        if let Ok(v) = std::env::var("OTS_MIN_SCORE") {
            self.min_score =
                v.parse().map_err(|_| Error::Config(format!("OTS_MIN_SCORE: invalid float '{v}'")))?;
        }
        if let Ok(v) = std::env::var("OTS_UPGRADE_COOLDOWN_SECS") {
            self.upgrade_cooldown_secs = v
                .parse()
                .map_err(|_| Error::Config(format!("OTS_UPGRADE_COOLDOWN_SECS: invalid integer '{v}'")))?;
        }
        if let Ok(v) = std::env::var("OTS_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("OTS_ETHEREUM_RPC_URL") {
            self.ethereum_rpc_url = Some(v);
        }
        if let Ok(v) = std::env::var("OTS_LITECOIN_ELECTRUM_SERVER") {
            self.litecoin_electrum_server = Some(v);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_default_calendars() {
        let config = Config::default();
        assert_eq!(config.calendar_urls.len(), DEFAULT_CALENDARS.len());
        assert_eq!(config.submit_strategy, SubmitStrategy::FirstSuccess);
        assert_eq!(config.min_successful, 1);
    }

    #[test]
    fn file_config_overrides_defaults() {
        let mut config = Config::default();
        config.apply_file(FileConfig {
            calendar_urls: Some(vec!["https://x".to_string()]),
            timeout_secs: Some(5),
            submit_strategy: Some("quorum".to_string()),
            min_successful: Some(2),
            min_score: Some(0.9),
            ..FileConfig::default()
        });
        assert_eq!(config.calendar_urls, vec!["https://x".to_string()]);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.submit_strategy, SubmitStrategy::Quorum);
        assert_eq!(config.min_successful, 2);
        assert_eq!(config.min_score, 0.9);
    }

    #[test]
    fn unset_file_fields_keep_defaults() {
        let mut config = Config::default();
        let before_urls = config.calendar_urls.clone();
        config.apply_file(FileConfig::default());
        assert_eq!(config.calendar_urls, before_urls);
    }
}
