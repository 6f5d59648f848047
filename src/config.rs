use std::env;

use anyhow::Context;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Maximum number of pooled database connections
    pub pool_size: u32,
    /// Apply embedded migrations before serving
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT should be a valid port number")?;
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL should be set")?;
        let pool_size = env::var("DATABASE_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_POOL_SIZE should be a positive integer")?;
        if pool_size == 0 {
            anyhow::bail!("DATABASE_POOL_SIZE should be a positive integer");
        }
        let run_migrations = match env::var("RUN_MIGRATIONS") {
            Ok(value) => parse_flag(&value)
                .with_context(|| format!("RUN_MIGRATIONS has an invalid value: {}", value))?,
            Err(_) => true,
        };

        Ok(Self {
            host,
            port,
            database_url,
            pool_size,
            run_migrations,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
