/* src/config.rs */

use clap::Parser;
use fancy_log::{LogLevel, log};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONFIG_TEMPLATE: &str = r#"
# pihole-mcp configuration.
# Command-line flags, environment variables and the .env file all take
# priority over the values in this file.

# Pi-hole API base URL.
# pihole_url = "http://192.168.1.100/api"

# Pi-hole password (required here, via --pihole-password or PIHOLE_PASSWORD).
# pihole_password = ""

# Accept self-signed certificates presented by the Pi-hole API.
# tls_insecure = false

# Where the MCP server listens.
# bind_host = "0.0.0.0"
# port = 8081

# Upstream collaborators used by the lookup tools.
# dns_server = "1.1.1.1:53"

# Timeout applied to every upstream request, in seconds.
# request_timeout_secs = 30
"#;

pub const DEFAULT_PIHOLE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_DNS_SERVER: &str = "1.1.1.1:53";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "PIHOLE_PASSWORD is required (set via --pihole-password, the PIHOLE_PASSWORD environment variable or the config file)"
    )]
    MissingPassword,
    #[error("request timeout must be at least one second")]
    InvalidTimeout,
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Command-line flags. Each one falls back to its environment variable,
/// which `dotenvy` may have populated from a `.env` file.
#[derive(Debug, Default, Parser)]
#[command(
    name = "pihole-mcp",
    version,
    about = "MCP server exposing Pi-hole statistics, DNS records and WHOIS lookups",
    after_help = "Configuration priority: command-line flags > environment variables > .env file > config file > defaults"
)]
pub struct Cli {
    /// Pi-hole API URL (e.g., http://192.168.1.100/api)
    #[arg(long, env = "PIHOLE_URL")]
    pub pihole_url: Option<String>,

    /// Pi-hole API password (required)
    #[arg(long, env = "PIHOLE_PASSWORD", hide_env_values = true)]
    pub pihole_password: Option<String>,

    /// MCP server port (default: 8081)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// MCP server bind address (default: 0.0.0.0)
    #[arg(long, env = "BIND_HOST")]
    pub bind_host: Option<String>,

    /// Recursive resolver used by the DNS records tool (default: 1.1.1.1:53)
    #[arg(long, env = "DNS_SERVER")]
    pub dns_server: Option<String>,

    /// Upstream request timeout in seconds (default: 30)
    #[arg(long = "request-timeout", env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Accept invalid TLS certificates from the Pi-hole API
    #[arg(
        long,
        env = "PIHOLE_TLS_INSECURE",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub tls_insecure: Option<bool>,
}

/// Optional TOML file, lowest priority above the built-in defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub pihole_url: Option<String>,
    pub pihole_password: Option<String>,
    pub port: Option<u16>,
    pub bind_host: Option<String>,
    pub dns_server: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub tls_insecure: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pihole_url: String,
    pub pihole_password: String,
    pub bind_host: String,
    pub port: u16,
    pub dns_server: String,
    pub request_timeout: Duration,
    pub tls_insecure: bool,
}

impl AppConfig {
    /// Parses flags and environment, then layers them over the config file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = Cli::parse();
        let file = match config_path() {
            Some(path) => load_or_create_file(&path)?,
            None => {
                log(
                    LogLevel::Warn,
                    "No home directory and no CONFIG_PATH; skipping config file.",
                );
                FileConfig::default()
            }
        };
        Self::resolve(cli, file)
    }

    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let pihole_password = non_empty(cli.pihole_password)
            .or_else(|| non_empty(file.pihole_password))
            .ok_or(ConfigError::MissingPassword)?;

        let timeout_secs = cli
            .request_timeout_secs
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(Self {
            pihole_url: non_empty(cli.pihole_url)
                .or_else(|| non_empty(file.pihole_url))
                .unwrap_or_else(|| DEFAULT_PIHOLE_URL.to_string()),
            pihole_password,
            bind_host: non_empty(cli.bind_host)
                .or_else(|| non_empty(file.bind_host))
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            dns_server: non_empty(cli.dns_server)
                .or_else(|| non_empty(file.dns_server))
                .unwrap_or_else(|| DEFAULT_DNS_SERVER.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            tls_insecure: cli.tls_insecure.or(file.tls_insecure).unwrap_or(false),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// `CONFIG_PATH` from the environment, else `~/pihole-mcp/config.toml`.
fn config_path() -> Option<PathBuf> {
    env::var("CONFIG_PATH")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join("pihole-mcp").join("config.toml")))
}

fn load_or_create_file(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        log(
            LogLevel::Warn,
            &format!("Config file not found. Creating default at {:?}", path),
        );
        let created = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(path, DEFAULT_CONFIG_TEMPLATE));
        if let Err(e) = created {
            log(
                LogLevel::Warn,
                &format!("Could not write default config to {:?}: {}", path, e),
            );
            return Ok(FileConfig::default());
        }
    }

    log(LogLevel::Info, &format!("Loading config from {:?}", path));
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
