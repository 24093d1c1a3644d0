use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    /// Room inventory used by the availability check.
    #[serde(default)]
    pub rooms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Webhook address of the alert topic. Alerts are logged and dropped when unset.
    pub topic: Option<String>,
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Table whose requests are read from batch-write events. The first table listed in the
    /// event is used when unset.
    pub source_table: Option<String>,
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

fn default_pool_size() -> u32 {
    5
}

fn default_notifier_timeout() -> u64 {
    10
}

fn default_batch_concurrency() -> usize {
    1
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            topic: None,
            timeout_secs: default_notifier_timeout(),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            source_table: None,
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl Config {
    pub fn load(filename: impl AsRef<Path>) -> Result<Self, Error> {
        let config = fs::read_to_string(filename.as_ref()).map_err(|_| Error::ConfigReadError)?;
        serde_yaml::from_str(&config).map_err(|_| Error::ConfigParseError)
    }
}

impl DbConfig {
    pub fn server_url(&self) -> String {
        if self.password.is_empty() {
            format!("postgres://{}@{}:{}", self.user, self.host, self.port)
        } else {
            format!(
                "postgres://{}:{}@{}:{}",
                self.user, self.password, self.host, self.port
            )
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", self.server_url(), self.dbname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_should_be_loaded() {
        let config = Config::load("../service/fixtures/config.yml").unwrap();
        assert_eq!(
            config,
            Config {
                db: DbConfig {
                    host: "localhost".to_string(),
                    port: 5432,
                    user: "postgres".to_string(),
                    password: "postgres".to_string(),
                    dbname: "reservation".to_string(),
                    max_connections: 5,
                },
                server: ServerConfig {
                    host: "0.0.0.0".to_string(),
                    port: 50001,
                },
                notifier: NotifierConfig {
                    topic: Some("http://localhost:9000/alerts/reservation-conflicts".to_string()),
                    timeout_secs: 5,
                },
                reconciler: ReconcilerConfig {
                    source_table: Some("HotelReservations".to_string()),
                    batch_concurrency: 1,
                },
                rooms: ["101", "102", "201", "202", "301"]
                    .map(String::from)
                    .to_vec(),
            }
        );
    }

    #[test]
    fn optional_sections_should_default() {
        let config: Config = serde_yaml::from_str(
            "db: {host: db, port: 5432, user: app, password: '', dbname: rsvp}\nserver: {host: 127.0.0.1, port: 8080}\n",
        )
        .unwrap();
        assert_eq!(config.notifier, NotifierConfig::default());
        assert_eq!(config.reconciler.batch_concurrency, 1);
        assert!(config.rooms.is_empty());
        assert_eq!(config.db.url(), "postgres://app@db:5432/rsvp");
    }

    #[test]
    fn missing_file_should_fail_to_read() {
        assert_eq!(
            Config::load("does/not/exist.yml").unwrap_err(),
            Error::ConfigReadError
        );
    }
}
