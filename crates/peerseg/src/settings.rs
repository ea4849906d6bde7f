use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use peerseg_fetch::{FetchConfig, GatewayConfig};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "PEERSEG_";

/// Everything the CLI needs to run a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchConfig,
    pub gateway: GatewayConfig,
    pub peer: PeerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSettings {
    pub enabled: bool,
    pub api: String,
    pub probe_timeout_ms: u64,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api: "http://127.0.0.1:5001".to_string(),
            probe_timeout_ms: 2000,
        }
    }
}

impl PeerSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Sparse values that win over every other layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    pub fetch: FetchOverrides,
    pub gateway: GatewayOverrides,
    pub peer: PeerOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PeerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
}

impl Settings {
    /// Layer defaults, the TOML file at `path` (if present), `PEERSEG_*`
    /// environment variables and `overrides`, later layers winning.
    ///
    /// Nested keys use a double underscore in the environment, e.g.
    /// `PEERSEG_FETCH__TIMEOUT_MS=5000`.
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self, figment::Error> {
        Self::figment(path, overrides).extract()
    }

    fn figment(path: &Path, overrides: &Overrides) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
    }
}
