//! 配置加载：TOML 文件 + 环境变量覆盖

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "netkit.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub geoip: GeoIpConfig,
    pub dns: DnsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Actix worker count; actix picks one per core when unset.
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// Outer deadlines for each endpoint group, in seconds.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub whois_secs: u64,
    pub ssl_secs: u64,
    pub dns_secs: u64,
    pub ip_secs: u64,
    pub http_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            whois_secs: 30,
            ssl_secs: 20,
            dns_secs: 30,
            ip_secs: 15,
            http_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeoIpConfig {
    pub city_db: Option<PathBuf>,
    pub asn_db: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DnsConfig {
    /// Upstream resolver; the system configuration is used when unset.
    pub nameserver: Option<IpAddr>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Daily rolling log files are written here in addition to stdout.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            directory: None,
        }
    }
}

impl AppConfig {
    /// Load `NETKIT_CONFIG` (or `netkit.toml` when present), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os("NETKIT_CONFIG").map(PathBuf::from);
        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// `PORT`, `BIND_ADDRESS`, `MMDB_CITY_PATH`, `MMDB_ASN_PATH`,
    /// `LOG_FORMAT`, `LOG_DIR`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        if let Some(bind) = var("BIND_ADDRESS") {
            self.server.bind_address = bind;
        }
        if let Some(path) = var("MMDB_CITY_PATH") {
            self.geoip.city_db = Some(PathBuf::from(path));
        }
        if let Some(path) = var("MMDB_ASN_PATH") {
            self.geoip.asn_db = Some(PathBuf::from(path));
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => anyhow::bail!("Invalid LOG_FORMAT value: {other}"),
            };
        }
        if let Some(dir) = var("LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(dir));
        }
        Ok(())
    }
}
