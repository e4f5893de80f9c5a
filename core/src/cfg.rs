use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Identifier used to compute per-app configuration directories.
#[derive(Clone, Copy)]
pub struct AppId {
    /// Reverse-DNS style qualifier, e.g. `"com"`.
    pub qualifier: &'static str,
    /// Organization or vendor name, e.g. `"local"`.
    pub organization: &'static str,
    /// Application name, e.g. `"pingboard"`.
    pub application: &'static str,
}

/// Application configuration persisted to `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracing level to use if `RUST_LOG` is not set (e.g. `"info"`).
    pub log_level: String,
    /// Listen address for the HTTP API, e.g. `"0.0.0.0:5000"`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    /// Scheduler tick period (ms).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Upper bound on one probe attempt (ms). Keep at or under the smallest
    /// job interval so one slow target cannot eat the cadence.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Minimum spacing between admitted API calls (ms).
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Probes allowed in flight at once; 0 picks the CPU count.
    #[serde(default)]
    pub max_concurrent_probes: usize,
    /// Static bearer token for the API; unset disables the check.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_http_addr() -> String {
    "0.0.0.0:5000".to_string()
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_rate_limit_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_addr: default_http_addr(),
            tick_ms: default_tick_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            max_concurrent_probes: 0,
            api_token: None,
        }
    }
}

/// Return the configuration directory for this app, creating it if needed.
pub fn config_dir(app: &AppId) -> Result<PathBuf> {
    let pd = ProjectDirs::from(app.qualifier, app.organization, app.application)
        .ok_or_else(|| anyhow::anyhow!("failed to resolve ProjectDirs"))?;
    let dir = pd.config_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("create config dir {}", dir.display()))?;
    Ok(dir)
}

/// Load `config.toml` from the app config dir or create a default one.
pub fn load_or_init(app: &AppId) -> Result<Config> {
    let dir = config_dir(app)?;
    let path = dir.join("config.toml");
    if path.exists() {
        let txt =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&txt).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    } else {
        let cfg = Config::default();
        save_config(&path, &cfg)?;
        Ok(cfg)
    }
}

fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
