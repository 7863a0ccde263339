use crate::core::capability::Capability;
use crate::core::models::BrokerId;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Which brokers the user has switched on.
pub trait BrokerSettings: Send + Sync {
    fn is_enabled(&self, id: &BrokerId) -> bool;
}

impl BrokerSettings for HashSet<BrokerId> {
    fn is_enabled(&self, id: &BrokerId) -> bool {
        self.contains(id)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Broker export file (YAML or JSON) read once per source construction.
    Statement { path: PathBuf },
    /// JSON bridge in front of a broker API.
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BrokerConfig {
    pub id: BrokerId,
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Capabilities the broker advertises. Every capability when omitted.
    pub capabilities: Option<Vec<Capability>>,
    pub source: SourceConfig,
}

impl BrokerConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.capabilities
            .clone()
            .unwrap_or_else(|| Capability::ALL.to_vec())
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub brokers: Vec<BrokerConfig>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub currency: String,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_source_cache_ttl_secs")]
    pub source_cache_ttl_secs: u64,
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_source_cache_ttl_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "brokerfold", "brokerfold")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for broker in &self.brokers {
            if !seen.insert(&broker.id) {
                bail!("Broker {} is configured more than once", broker.id);
            }
        }
        if self.query_timeout_secs == 0 {
            bail!("query_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn broker(&self, id: &BrokerId) -> Option<&BrokerConfig> {
        self.brokers.iter().find(|b| &b.id == id)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn source_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.source_cache_ttl_secs)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }
}

impl BrokerSettings for AppConfig {
    /// Brokers missing from configuration count as disabled.
    fn is_enabled(&self, id: &BrokerId) -> bool {
        self.broker(id).is_some_and(|b| b.enabled)
    }
}
