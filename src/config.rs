use crate::error::ConfigError;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_STATE_KEY: &str = "vote-system:data";

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub state_key: String,
    pub heartbeat_interval: Duration,
    pub sink_buffer: usize,
    pub db_max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            state_key: DEFAULT_STATE_KEY.to_string(),
            heartbeat_interval: Duration::from_secs(15),
            sink_buffer: 16,
            db_max_connections: 20,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let bind_addr = parse_or("BIND_ADDR", &lookup, defaults.bind_addr)?;
        let state_key = lookup("STATE_KEY").unwrap_or(defaults.state_key);
        let heartbeat_secs: u64 =
            parse_or("HEARTBEAT_SECS", &lookup, defaults.heartbeat_interval.as_secs())?;
        let sink_buffer = parse_or("SINK_BUFFER", &lookup, defaults.sink_buffer)?;
        let db_max_connections =
            parse_or("DB_MAX_CONNECTIONS", &lookup, defaults.db_max_connections)?;

        if heartbeat_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "HEARTBEAT_SECS",
                value: "0".to_string(),
            });
        }
        if sink_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SINK_BUFFER",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            database_url,
            bind_addr,
            state_key,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            sink_buffer,
            db_max_connections,
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}
