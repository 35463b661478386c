use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::executor::TaskPoolConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub task_pool: TaskPoolConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Empty means any origin (the request's own origin is echoed back)
    pub allowed_origins: Vec<String>,
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub slow_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                max_age_seconds: 3600,
            },
            task_pool: TaskPoolConfig::default(),
            demo: DemoConfig {
                slow_delay: Duration::from_millis(2000),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("API_PORT must be a valid port number")?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(
                    &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                max_age_seconds: env::var("CORS_MAX_AGE_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("CORS_MAX_AGE_SECONDS must be a valid number")?,
            },
            task_pool: TaskPoolConfig::from_env(),
            demo: DemoConfig {
                slow_delay: Duration::from_millis(
                    env::var("DEMO_SLOW_DELAY_MS")
                        .unwrap_or_else(|_| "2000".to_string())
                        .parse()
                        .context("DEMO_SLOW_DELAY_MS must be a valid number")?,
                ),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Comma separated origins; a `*` anywhere in the list allows every origin
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
