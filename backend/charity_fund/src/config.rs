//! Application configuration loaded from environment variables.

use std::collections::HashSet;
use std::str::FromStr;

use crate::allocation::AllocationPolicy;
use crate::errors::{FundError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Human readable service title, reported by `/health`
    pub app_title: String,
    /// SQLite connection string (e.g. sqlite:./charity_fund.db)
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// User ids allowed to manage projects and see every donation
    pub superuser_ids: HashSet<i64>,
    /// How far a newly created entity is matched against the backlog
    pub allocation_policy: AllocationPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            app_title: env_var("APP_TITLE").unwrap_or_else(|_| "Cat Charity Fund".to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./charity_fund.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| FundError::Config("Invalid API_PORT".to_string()))?,
            superuser_ids: parse_user_ids(&env_var("SUPERUSER_IDS").unwrap_or_default())?,
            allocation_policy: env_var("ALLOCATION_POLICY")
                .unwrap_or_else(|_| "drain".to_string())
                .parse()?,
        })
    }
}

/// Parse a comma separated list of user ids. Blank entries are skipped.
pub fn parse_user_ids(raw: &str) -> Result<HashSet<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            i64::from_str(s)
                .map_err(|_| FundError::Config(format!("Invalid user id in SUPERUSER_IDS: {s}")))
        })
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| FundError::Config(format!("Missing env var: {key}")))
}
