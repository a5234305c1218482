//! Application configuration loaded from environment variables.

use std::time::Duration;

use dispatcher::DispatcherConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DISPATCH_WORKERS` — dispatcher worker tasks (default: `2`)
/// - `DISPATCH_POLL_INTERVAL_MS` — idle poll interval (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub dispatch_workers: usize,
    pub dispatch_poll_interval_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            dispatch_workers: std::env::var("DISPATCH_WORKERS")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(2),
            dispatch_poll_interval_ms: std::env::var("DISPATCH_POLL_INTERVAL_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .unwrap_or(100),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the dispatcher configuration derived from this config.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            poll_interval: Duration::from_millis(self.dispatch_poll_interval_ms),
            ..DispatcherConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            dispatch_workers: 2,
            dispatch_poll_interval_ms: 100,
        }
    }
}
