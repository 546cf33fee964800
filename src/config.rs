use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:7777/bridge";
const DEFAULT_MEDIA_URL: &str = "http://127.0.0.1:7777/media";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ASSETS_DIR: &str = "client";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid HTTP address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("HTTP address {0} is not a loopback address")]
    NonLoopback(SocketAddr),
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub bridge_url: Option<String>,
    pub media_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub http_addr: Option<String>,
    pub assets_dir: Option<PathBuf>,
    pub request_full_sync: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bridge_url: String,
    pub media_url: String,
    pub data_dir: PathBuf,
    pub state_path: PathBuf,
    pub media_dir: PathBuf,
    pub history_dir: PathBuf,
    pub http_addr: SocketAddr,
    pub assets_dir: PathBuf,
    pub echo_secret: Option<String>,
    pub token: Option<String>,
    pub device_name: Option<String>,
    pub request_full_sync: bool,
}

impl Config {
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with(overrides, |key| env::var(key).ok())
    }

    fn load_with(
        overrides: ConfigOverrides,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());

        let bridge_url = overrides
            .bridge_url
            .or_else(|| var("WA_RELAY_BRIDGE_URL"))
            .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string());
        let bridge_url = bridge_url.trim_end_matches('/').to_string();
        let media_url = overrides
            .media_url
            .or_else(|| var("WA_RELAY_MEDIA_URL"))
            .unwrap_or_else(|| DEFAULT_MEDIA_URL.to_string());
        let media_url = media_url.trim_end_matches('/').to_string();

        let data_dir = overrides
            .data_dir
            .or_else(|| var("WA_RELAY_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir(var("HOME")));
        let state_path = var("WA_RELAY_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("state.json"));
        let media_dir = var("WA_RELAY_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("media"));
        let history_dir = var("WA_RELAY_HISTORY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("history"));

        let http_addr = overrides
            .http_addr
            .or_else(|| var("WA_RELAY_HTTP_ADDR"))
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = parse_loopback(&http_addr)?;
        let assets_dir = overrides
            .assets_dir
            .or_else(|| var("WA_RELAY_ASSETS_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));

        let device_name = hostname::get().ok().and_then(|name| name.into_string().ok());

        Ok(Self {
            bridge_url,
            media_url,
            data_dir,
            state_path,
            media_dir,
            history_dir,
            http_addr,
            assets_dir,
            echo_secret: var("WA_RELAY_ECHO_SECRET"),
            token: var("WA_RELAY_TOKEN"),
            device_name,
            request_full_sync: overrides.request_full_sync,
        })
    }
}

fn parse_loopback(value: &str) -> Result<SocketAddr, ConfigError> {
    let addr: SocketAddr = value.trim().parse().map_err(|source| ConfigError::InvalidAddr {
        value: value.to_string(),
        source,
    })?;
    if !addr.ip().is_loopback() {
        return Err(ConfigError::NonLoopback(addr));
    }
    Ok(addr)
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    let base = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    base.join(".local").join("share").join("wa-relay")
}
