use crate::errors::ConfigurationError;
use std::env;

/// Default size of the PostgreSQL connection pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl VotingConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn load() -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Reads the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `VOTABLE_MAX_CONNECTIONS`: pool size (default: 5)
    /// - `VOTABLE_RUN_MIGRATIONS`: run the embedded migrations on startup (default: true)
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigurationError::MissingEnv("DATABASE_URL"))?;

        let max_connections = match env::var("VOTABLE_MAX_CONNECTIONS") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigurationError::InvalidEnv {
                    name: "VOTABLE_MAX_CONNECTIONS",
                    value,
                })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        let run_migrations = match env::var("VOTABLE_RUN_MIGRATIONS") {
            Ok(value) => parse_flag(&value).ok_or(ConfigurationError::InvalidEnv {
                name: "VOTABLE_RUN_MIGRATIONS",
                value,
            })?,
            Err(_) => true,
        };

        Ok(Self {
            database_url,
            max_connections,
            run_migrations,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
