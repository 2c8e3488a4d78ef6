// src/config.rs

use log::debug;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "LEETQODE_DB_PATH";
pub const ENV_BIND_ADDR: &str = "LEETQODE_BIND_ADDR";
pub const ENV_SEED: &str = "LEETQODE_SEED";

const DEFAULT_DB_PATH: &str = "leetqode.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a socket address like 127.0.0.1:8000, got '{value}'")]
    BadAddress { var: &'static str, value: String },
    #[error("{var} must be true or false, got '{value}'")]
    BadFlag { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Seed the problem catalog when it is empty.
    pub seed: bool,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let addr = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr.parse().map_err(|_| ConfigError::BadAddress {
            var: ENV_BIND_ADDR,
            value: addr.clone(),
        })?;

        let seed = match lookup(ENV_SEED) {
            None => true,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::BadFlag {
                        var: ENV_SEED,
                        value: v,
                    })
                }
            },
        };

        Ok(Config {
            db_path,
            bind_addr,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("leetqode.db"));
        assert_eq!(cfg.bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert!(cfg.seed);
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup_in(HashMap::from([
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_BIND_ADDR, "0.0.0.0:9000"),
            (ENV_SEED, "False"),
        ])))
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert!(!cfg.seed);
    }

    #[test]
    fn rejects_garbage() {
        let err = Config::from_lookup(lookup_in(HashMap::from([(ENV_BIND_ADDR, "localhost")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BadAddress { .. }));

        let err =
            Config::from_lookup(lookup_in(HashMap::from([(ENV_SEED, "maybe")]))).unwrap_err();
        assert!(matches!(err, ConfigError::BadFlag { .. }));
    }
}
