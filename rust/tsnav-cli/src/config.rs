use std::env;

/// Logging setup read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// `EnvFilter` directive, e.g. `info` or `tsnav_core=debug`.
    pub log_filter: String,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let log_filter = env::var("TSNAV_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("TSNAV_LOG_JSON")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { log_filter, log_json }
    }
}
