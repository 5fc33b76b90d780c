//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::SEAT_COUNT;
use crate::game::RoundSettings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Telnet listener address
    pub game_addr: SocketAddr,
    /// Status endpoint address
    pub status_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory with sprite overrides; built-in sprites when unset
    pub assets_dir: Option<PathBuf>,
    pub rounds: RoundSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // A bare PORT wins over GAME_ADDR, as on most hosting platforms
        let game_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("GAME_ADDR").unwrap_or_else(|| "0.0.0.0:4242".to_string()),
        };
        let status_addr = lookup("STATUS_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let defaults = RoundSettings::default();
        let rounds = RoundSettings {
            min_players: parse_or(&lookup, "MIN_PLAYERS", defaults.min_players)?,
            max_players: parse_or(&lookup, "MAX_PLAYERS", defaults.max_players)?,
            max_wait: Duration::from_secs(parse_or(
                &lookup,
                "ROUND_WAIT_SECS",
                defaults.max_wait.as_secs(),
            )?),
            time_limit: Duration::from_secs(parse_or(
                &lookup,
                "ROUND_TIME_LIMIT_SECS",
                defaults.time_limit.as_secs(),
            )?),
            max_open_rounds: parse_or(&lookup, "MAX_OPEN_ROUNDS", defaults.max_open_rounds)?,
        };

        if rounds.min_players == 0 || rounds.min_players > rounds.max_players {
            return Err(ConfigError::Invalid("MIN_PLAYERS"));
        }
        if rounds.max_players > SEAT_COUNT {
            return Err(ConfigError::Invalid("MAX_PLAYERS"));
        }
        if rounds.max_open_rounds == 0 {
            return Err(ConfigError::Invalid("MAX_OPEN_ROUNDS"));
        }

        Ok(Self {
            game_addr: game_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("GAME_ADDR"))?,
            status_addr: status_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress("STATUS_ADDR"))?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            assets_dir: lookup("ASSETS_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            rounds,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid address in {0}")]
    InvalidAddress(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).expect("defaults");
        assert_eq!(config.game_addr.port(), 4242);
        assert_eq!(config.status_addr.port(), 8080);
        assert_eq!(config.log_level, "info");
        assert!(config.assets_dir.is_none());
        assert_eq!(config.rounds.max_players, 5);
        assert_eq!(config.rounds.min_players, 1);
        assert_eq!(config.rounds.max_wait, Duration::from_secs(5));
        assert_eq!(config.rounds.time_limit, Duration::from_secs(600));
        assert_eq!(config.rounds.max_open_rounds, 100);
    }

    #[test]
    fn port_overrides_game_addr() {
        let config = load(&[("PORT", "2323"), ("GAME_ADDR", "127.0.0.1:9999")]).expect("config");
        assert_eq!(config.game_addr, "0.0.0.0:2323".parse().expect("addr"));
    }

    #[test]
    fn round_limits_are_validated() {
        assert!(matches!(
            load(&[("MAX_PLAYERS", "6")]),
            Err(ConfigError::Invalid("MAX_PLAYERS"))
        ));
        assert!(matches!(
            load(&[("MIN_PLAYERS", "4"), ("MAX_PLAYERS", "3")]),
            Err(ConfigError::Invalid("MIN_PLAYERS"))
        ));
        assert!(matches!(
            load(&[("ROUND_WAIT_SECS", "soon")]),
            Err(ConfigError::Invalid("ROUND_WAIT_SECS"))
        ));
        assert!(matches!(
            load(&[("STATUS_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress("STATUS_ADDR"))
        ));
    }
}
