use std::{env, fmt};

use thiserror::Error;

use crate::{api::aemet::lib_opendata::DEFAULT_BASE_URL, interval::window::WindowSplit};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("The station id can't be empty")]
    EmptyStation,

    #[error("No years to process")]
    NoYears,
}

/// Credentials of the MySQL database the tables end up in.
#[derive(Clone, PartialEq)]
pub struct MysqlTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl MysqlTarget {
    /// Connection string as understood by DuckDB's mysql extension.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} database={}",
            self.host, self.port, self.username, self.password, self.database
        )
    }
}

// Keep the password out of the logs.
impl fmt::Debug for MysqlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// Everything that comes from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub archive_dir: String,
    pub duckdb_path: String,
    /// If `None` the tables are written to the DuckDB file itself.
    pub mysql: Option<MysqlTarget>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let api_key = require("AEMET_API_KEY")?;
        let base_url = get("AEMET_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let archive_dir = get("ARCHIVE_DIR").unwrap_or_else(|| "archive".to_string());
        let duckdb_path =
            get("DUCKDB_PATH").unwrap_or_else(|| format!("{}/aemet.duckdb", archive_dir));

        let mysql = match get("DB_HOST") {
            None => None,
            Some(host) => {
                let port = match get("DB_PORT") {
                    None => 3306,
                    Some(v) => v.parse::<u16>().map_err(|e| ConfigError::Invalid {
                        key: "DB_PORT",
                        value: v.clone(),
                        reason: e.to_string(),
                    })?,
                };
                Some(MysqlTarget {
                    host,
                    port,
                    username: require("DB_USERNAME")?,
                    password: get("DB_PASSWORD").unwrap_or_default(),
                    database: require("DB_NAME")?,
                })
            }
        };

        Ok(Config {
            api_key,
            base_url,
            archive_dir,
            duckdb_path,
            mysql,
        })
    }
}

/// What one run of the loader does.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub station_id: String,
    pub years: Vec<i16>,
    pub split: WindowSplit,
    pub fetch_metadata: bool,
}

impl RunSettings {
    pub fn new(
        station_id: &str,
        years: Vec<i16>,
        split: WindowSplit,
        fetch_metadata: bool,
    ) -> Result<RunSettings, ConfigError> {
        let station_id = station_id.trim();
        if station_id.is_empty() {
            return Err(ConfigError::EmptyStation);
        }
        if years.is_empty() {
            return Err(ConfigError::NoYears);
        }
        Ok(RunSettings {
            station_id: station_id.to_string(),
            years,
            split,
            fetch_metadata,
        })
    }
}
