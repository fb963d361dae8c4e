// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    /// Countdown per question, in seconds.
    pub seconds_per_question: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let seconds_per_question = env::var("SECONDS_PER_QUESTION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::quiz::session::DEFAULT_SECONDS_PER_QUESTION);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            seconds_per_question,
        }
    }
}
