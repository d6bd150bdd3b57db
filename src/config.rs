use anyhow::{Context, Result};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3146";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub search_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tmdb_api_key = get("TMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let tmdb_base_url = get("TMDB_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string());
        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR is not a valid socket address")?;
        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let debounce_ms = match get("SEARCH_DEBOUNCE_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("SEARCH_DEBOUNCE_MS must be a whole number of milliseconds")?,
            None => DEFAULT_DEBOUNCE_MS,
        };

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            bind_addr,
            data_dir,
            search_debounce: Duration::from_millis(debounce_ms),
        })
    }
}
