//! Configuration loading.
//!
//! larkd reads a single TOML file describing the server identity, listen
//! addresses, optional connection password, MOTD path, database path, and
//! the operator table. Timeouts have defaults and are rarely set outside
//! of tests.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity and listeners.
    pub server: ServerConfig,
    /// Operator table: name -> bcrypt hash (plaintext tolerated).
    #[serde(default)]
    pub operators: HashMap<String, String>,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g. "irc.example.net").
    pub name: String,
    /// Listen addresses, `host:port`.
    pub listen: Vec<String>,
    /// Global connection password (optional). When set, connections start
    /// in the authorization phase and must PASS before registering.
    #[serde(default)]
    pub password: Option<String>,
    /// Path to the MOTD file (optional).
    #[serde(default)]
    pub motd: Option<String>,
    /// Path to the SQLite database holding registered channels.
    pub database: String,
    /// Keepalive timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

/// Idle/quit timeouts for the per-connection heartbeat.
///
/// A client idle for `idle` seconds is sent a PING; if nothing arrives
/// within `quit` further seconds it is disconnected with
/// "connection timeout".
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_idle_secs")]
    pub idle: u64,
    #[serde(default = "default_quit_secs")]
    pub quit: u64,
}

fn default_idle_secs() -> u64 {
    180
}

fn default_quit_secs() -> u64 {
    60
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            idle: default_idle_secs(),
            quit: default_quit_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Verify an operator name/password pair against the operator table.
    ///
    /// Stored values beginning with `$2` are treated as bcrypt hashes;
    /// anything else is compared as plaintext.
    pub fn verify_oper(&self, name: &str, password: &str) -> bool {
        match self.operators.get(name) {
            Some(stored) if stored.starts_with("$2") => {
                bcrypt::verify(password, stored).unwrap_or(false)
            }
            Some(stored) => stored == password,
            None => false,
        }
    }
}

impl ServerConfig {
    /// Read the MOTD file into lines, if configured and readable.
    pub fn load_motd(&self) -> Option<Vec<String>> {
        let path = self.motd.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(content) => Some(content.lines().map(|l| l.to_string()).collect()),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to read MOTD file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "irc.test"
            listen = ["127.0.0.1:6667"]
            database = "larkd.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.name, "irc.test");
        assert_eq!(config.server.password, None);
        assert_eq!(config.server.timeouts.idle, 180);
        assert_eq!(config.server.timeouts.quit, 60);
        assert!(config.operators.is_empty());
    }

    #[test]
    fn parse_full() {
        let config: Config = toml::from_str(
            r#"
            [server]
            name = "irc.test"
            listen = ["127.0.0.1:6667", "[::1]:6667"]
            password = "hunter2"
            motd = "motd.txt"
            database = "larkd.db"

            [server.timeouts]
            idle = 30
            quit = 10

            [operators]
            alice = "letmein"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.listen.len(), 2);
        assert_eq!(config.server.password.as_deref(), Some("hunter2"));
        assert_eq!(config.server.timeouts.idle, 30);
        assert!(config.operators.contains_key("alice"));
    }

    #[test]
    fn oper_verification() {
        let mut operators = HashMap::new();
        operators.insert("plain".to_string(), "secret".to_string());
        // bcrypt hash of "sesame" (cost 4 keeps the test fast)
        operators.insert("hashed".to_string(), bcrypt::hash("sesame", 4).unwrap());
        let config = Config {
            server: ServerConfig {
                name: "irc.test".into(),
                listen: vec![],
                password: None,
                motd: None,
                database: ":memory:".into(),
                timeouts: TimeoutsConfig::default(),
            },
            operators,
        };

        assert!(config.verify_oper("plain", "secret"));
        assert!(!config.verify_oper("plain", "wrong"));
        assert!(config.verify_oper("hashed", "sesame"));
        assert!(!config.verify_oper("hashed", "wrong"));
        assert!(!config.verify_oper("nobody", "secret"));
    }
}
