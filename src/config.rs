use std::{net::{IpAddr, Ipv4Addr}, path::PathBuf, str::FromStr};

use serde::Serialize;
use tracing::warn;

const MASK: &str = "****";

/// Credentials for the restaurant, weather and transit providers.
/// Only their presence is reported; generation never uses them.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub hotpepper: Option<String>,
    pub openweather: Option<String>,
    pub jorudan: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ConfiguredProviders {
    pub hotpepper: bool,
    pub openweather: bool,
    pub jorudan: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MaskedKeys {
    pub hotpepper_api_key: &'static str,
    pub openweather_api_key: &'static str,
    pub jorudan_api_key: &'static str,
}

impl ApiKeys {
    pub fn configured(&self) -> ConfiguredProviders {
        ConfiguredProviders {
            hotpepper: self.hotpepper.is_some(),
            openweather: self.openweather.is_some(),
            jorudan: self.jorudan.is_some(),
        }
    }

    pub fn masked(&self) -> MaskedKeys {
        let mask = |k: &Option<String>| if k.is_some() { MASK } else { "" };
        MaskedKeys {
            hotpepper_api_key: mask(&self.hotpepper),
            openweather_api_key: mask(&self.openweather),
            jorudan_api_key: mask(&self.jorudan),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub catalog_path: Option<PathBuf>,
    pub planner_seed: Option<u64>,
    pub api_keys: ApiKeys,
}

impl AppConfig {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        AppConfig {
            bind_addr: parse_or(&get, "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: parse_or(&get, "PORT", 8080),
            catalog_path: get("CATALOG_PATH").map(PathBuf::from),
            planner_seed: get("PLANNER_SEED").and_then(|v| match v.parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!("⚠️ Ignoring malformed PLANNER_SEED={v:?}");
                    None
                }
            }),
            api_keys: ApiKeys {
                hotpepper: get("HOTPEPPER_API_KEY"),
                openweather: get("OPENWEATHER_API_KEY"),
                jorudan: get("JORUDAN_API_KEY"),
            },
        }
    }
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("⚠️ Malformed {key}={v:?}, using default");
            default
        }),
        None => default,
    }
}
