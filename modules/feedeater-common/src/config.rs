use std::env;

/// Configuration shared by every binary that talks to the store and the
/// internal AI service. Each binary loads a narrower view via its own
/// `*_from_env()` constructor, the same way the teacher splits
/// `Config::scout_from_env()` / `Config::web_from_env()` from the full one.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub event_root: String,

    pub feed_api_base_url: String,
    pub feed_internal_token: String,

    pub daemon_host: String,
    pub daemon_port: u16,

    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Full configuration for the daemon process.
    pub fn daemon_from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            event_root: env::var("FEEDEATER_EVENT_ROOT").unwrap_or_else(|_| "feedeater".to_string()),
            feed_api_base_url: required_env("FEED_API_BASE_URL"),
            feed_internal_token: required_env("FEED_INTERNAL_TOKEN"),
            daemon_host: env::var("FEEDEATER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            daemon_port: env::var("FEEDEATER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("FEEDEATER_PORT must be a number"),
            log_format: log_format_from_env(),
        }
    }

    /// Configuration for the CLI: only what's needed to reach the daemon's
    /// operational HTTP surface. No direct database access.
    pub fn cli_from_env() -> Self {
        Self {
            database_url: String::new(),
            event_root: String::new(),
            feed_api_base_url: String::new(),
            feed_internal_token: String::new(),
            daemon_host: env::var("FEEDEATER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            daemon_port: env::var("FEEDEATER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("FEEDEATER_PORT must be a number"),
            log_format: LogFormat::Text,
        }
    }

    /// Log the presence and length (never the value) of each secret-bearing
    /// var, for startup diagnostics.
    pub fn log_redacted(&self) {
        let vars = [
            ("DATABASE_URL", &self.database_url),
            ("FEED_API_BASE_URL", &self.feed_api_base_url),
            ("FEED_INTERNAL_TOKEN", &self.feed_internal_token),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

fn log_format_from_env() -> LogFormat {
    match env::var("FEEDEATER_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
