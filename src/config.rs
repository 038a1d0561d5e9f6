use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use strum_macros::{AsRefStr, EnumString};

/// Where employee, attendance, adjustment and planning records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Json,
    Mysql,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    // Storage
    pub store_backend: StoreBackend,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", 1000),

            store_backend: env_or("STORE_BACKEND", StoreBackend::Json),
            data_dir: env::var("PAYROLL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("payroll-data")),
            database_url: env::var("DATABASE_URL").ok(),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env_or("LOG_LEVEL", tracing::Level::DEBUG),
        }
    }
}
