// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use url::Url;

use crate::error::AppError;

/// Allotted time when the exam definition does not carry its own duration.
pub const DEFAULT_EXAM_DURATION_SECS: u64 = 3600;

/// Period of the expiry observer.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Shown by the confirmation prompt before a manual submission.
pub const SUBMIT_CONFIRMATION_MESSAGE: &str =
    "Submit your answers now? You will not be able to change them afterwards.";

/// `DATABASE_URL` value selecting the non-durable in-memory store.
pub const MEMORY_STORE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    /// Base URL of the remote HR API serving exam definitions and accepting answers.
    pub exam_api_url: Url,
    pub exam_api_token: Option<String>,
    pub default_duration_secs: u64,
    pub tick_interval_ms: u64,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let exam_api_url = env::var("EXAM_API_URL")
            .map_err(|_| AppError::InternalServerError("EXAM_API_URL must be set".to_string()))?;
        let exam_api_url = Url::parse(&exam_api_url).map_err(|e| {
            AppError::InternalServerError(format!("EXAM_API_URL is not a valid URL: {}", e))
        })?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::InternalServerError("JWT_SECRET must be set".to_string()))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://exam_sessions.db?mode=rwc".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let exam_api_token = env::var("EXAM_API_TOKEN").ok().filter(|t| !t.is_empty());

        let default_duration_secs =
            parse_var("EXAM_DEFAULT_DURATION_SECS", DEFAULT_EXAM_DURATION_SECS)?;
        let tick_interval_ms = parse_var("EXAM_TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        if tick_interval_ms == 0 {
            return Err(AppError::InternalServerError(
                "EXAM_TICK_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::InternalServerError(format!("BIND_ADDR is invalid: {}", e)))?;

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            exam_api_url,
            exam_api_token,
            default_duration_secs,
            tick_interval_ms,
            bind_addr,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_STORE_URL
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::InternalServerError(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}
