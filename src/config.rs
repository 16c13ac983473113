use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_STORE: &str = "tasks.json";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";

/// Where the server keeps its tasks. `sqlite:` URLs select the database
/// backend; anything else is a path to the JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    JsonFile(PathBuf),
    Sqlite(String),
}

impl StoreLocation {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("sqlite:") { StoreLocation::Sqlite(raw.to_string()) } else { StoreLocation::JsonFile(PathBuf::from(raw)) }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::JsonFile(path) => write!(f, "{}", path.display()),
            StoreLocation::Sqlite(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub store: StoreLocation,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let addr = lookup("TASKS_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr.parse::<SocketAddr>().with_context(|| format!("invalid TASKS_ADDR: {addr}"))?;
        let store = StoreLocation::parse(&lookup("TASKS_STORE").unwrap_or_else(|| DEFAULT_STORE.to_string()));
        Ok(Self { addr, store })
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
}

impl ClientConfig {
    pub fn from_env() -> Self { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("TASKS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self { api_url: api_url.trim_end_matches('/').to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.store, StoreLocation::JsonFile(PathBuf::from("tasks.json")));
    }

    #[test]
    fn sqlite_urls_select_the_database_store() {
        let config = ServerConfig::from_lookup(env(&[("TASKS_STORE", "sqlite://data/tasks.db")])).unwrap();
        assert_eq!(config.store, StoreLocation::Sqlite("sqlite://data/tasks.db".into()));
    }

    #[test]
    fn bad_addr_is_an_error() {
        assert!(ServerConfig::from_lookup(env(&[("TASKS_ADDR", "not an addr")])).is_err());
    }

    #[test]
    fn client_url_drops_trailing_slash() {
        let config = ClientConfig::from_lookup(env(&[("TASKS_API_URL", "http://localhost:4000/api/")]));
        assert_eq!(config.api_url, "http://localhost:4000/api");
    }
}
