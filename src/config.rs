use cosign_network::{Multiaddr, DEFAULT_TOPIC};
use cosign_storage::MAX_RETENTION_HOURS;
use cosign_types::CosignError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::cli::Overrides;

pub const DEFAULT_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
    pub submission: SubmissionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub p2p_listen_addr: String,
    pub http_listen_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub topic: String,
    pub bootstrap_peers: Vec<String>,
    pub enable_mdns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: String,
    /// Records idle for longer than this are pruned. Unset disables pruning.
    #[serde(default)]
    pub prune_after_hours: Option<u64>,
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub horizon_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                p2p_listen_addr: "/ip4/0.0.0.0/tcp/0".to_string(),
                http_listen_addr: "0.0.0.0:0".to_string(),
            },
            network: NetworkConfig {
                topic: DEFAULT_TOPIC.to_string(),
                bootstrap_peers: vec![],
                enable_mdns: true,
            },
            storage: StorageConfig {
                db_path: "cosign.db".to_string(),
                prune_after_hours: None,
                prune_interval_secs: 3600,
            },
            ledger: LedgerConfig {
                horizon_url: DEFAULT_HORIZON_URL.to_string(),
                request_timeout_secs: 30,
            },
            submission: SubmissionConfig {
                max_in_flight: cosign_consensus::DEFAULT_MAX_IN_FLIGHT,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

fn config_err(msg: impl Into<String>) -> CosignError {
    CosignError::ConfigError(msg.into())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Defaults, then `config/default.toml` if present, then environment.
    pub fn load() -> Result<Self, CosignError> {
        let mut app_config = Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?;
        app_config.override_from_env(|key| std::env::var(key).ok())?;
        Ok(app_config)
    }

    /// Defaults overlaid with whatever keys the file sets. A missing file
    /// yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, CosignError> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| config_err(format!("Failed to build defaults: {}", e)))?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path).required(false))
            .build()
            .map_err(|e| config_err(format!("Failed to load config file: {}", e)))?
            .try_deserialize()
            .map_err(|e| config_err(format!("Invalid config file {}: {}", path.display(), e)))
    }

    pub fn override_from_env<F>(&mut self, var: F) -> Result<(), CosignError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT_HTTP") {
            let port: u16 = port
                .parse()
                .map_err(|e| config_err(format!("Invalid PORT_HTTP: {}", e)))?;
            self.node.http_listen_addr = format!("0.0.0.0:{}", port);
        }

        if let Some(port) = var("PORT_P2P") {
            let port: u16 = port
                .parse()
                .map_err(|e| config_err(format!("Invalid PORT_P2P: {}", e)))?;
            self.node.p2p_listen_addr = format!("/ip4/0.0.0.0/tcp/{}", port);
        }

        if let Some(url) = var("HORIZON_URL") {
            self.ledger.horizon_url = url;
        }

        if let Some(path) = var("DB_PATH") {
            self.storage.db_path = path;
        }

        if let Some(peers) = var("PEERS") {
            self.network.bootstrap_peers = split_list(&peers);
        }

        if let Some(topic) = var("TOPIC") {
            self.network.topic = topic;
        }

        if let Some(enabled) = var("ENABLE_MDNS") {
            self.network.enable_mdns = enabled
                .parse()
                .map_err(|e| config_err(format!("Invalid ENABLE_MDNS: {}", e)))?;
        }

        if let Some(max) = var("MAX_IN_FLIGHT") {
            self.submission.max_in_flight = max
                .parse()
                .map_err(|e| config_err(format!("Invalid MAX_IN_FLIGHT: {}", e)))?;
        }

        if let Some(hours) = var("PRUNE_AFTER_HOURS") {
            self.storage.prune_after_hours = Some(
                hours
                    .parse()
                    .map_err(|e| config_err(format!("Invalid PRUNE_AFTER_HOURS: {}", e)))?,
            );
        }

        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Command-line flags win over everything else.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(port) = overrides.port_http {
            self.node.http_listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(port) = overrides.port_p2p {
            self.node.p2p_listen_addr = format!("/ip4/0.0.0.0/tcp/{}", port);
        }
        if let Some(url) = &overrides.horizon {
            self.ledger.horizon_url = url.clone();
        }
        if let Some(db) = &overrides.db {
            self.storage.db_path = db.clone();
        }
        if let Some(peers) = &overrides.peers {
            self.network.bootstrap_peers = split_list(peers);
        }
    }

    pub fn validate(&self) -> Result<(), CosignError> {
        self.p2p_listen_addr()?;
        self.http_listen_addr()?;
        self.bootstrap_peers()?;

        if self.network.topic.trim().is_empty() {
            return Err(config_err("topic cannot be empty"));
        }

        if !self.ledger.horizon_url.starts_with("http://")
            && !self.ledger.horizon_url.starts_with("https://")
        {
            return Err(config_err(format!(
                "horizon_url must be an http(s) URL, got {}",
                self.ledger.horizon_url
            )));
        }

        if self.ledger.request_timeout_secs == 0 {
            return Err(config_err("request_timeout_secs must be greater than 0"));
        }

        if self.submission.max_in_flight == 0 {
            return Err(config_err("max_in_flight must be greater than 0"));
        }

        if self.storage.db_path.is_empty() {
            return Err(config_err("db_path cannot be empty"));
        }

        if let Some(hours) = self.storage.prune_after_hours {
            if hours > MAX_RETENTION_HOURS {
                return Err(config_err(format!(
                    "prune_after_hours must be at most {}, got {}",
                    MAX_RETENTION_HOURS, hours
                )));
            }
        }

        Ok(())
    }

    pub fn p2p_listen_addr(&self) -> Result<Multiaddr, CosignError> {
        self.node
            .p2p_listen_addr
            .parse()
            .map_err(|e| config_err(format!("Invalid p2p_listen_addr: {}", e)))
    }

    pub fn http_listen_addr(&self) -> Result<SocketAddr, CosignError> {
        self.node
            .http_listen_addr
            .parse()
            .map_err(|e| config_err(format!("Invalid http_listen_addr: {}", e)))
    }

    pub fn bootstrap_peers(&self) -> Result<Vec<Multiaddr>, CosignError> {
        self.network
            .bootstrap_peers
            .iter()
            .map(|peer| {
                peer.parse()
                    .map_err(|e| config_err(format!("Invalid bootstrap peer {}: {}", peer, e)))
            })
            .collect()
    }
}
