//! Configuration management.

use serde::Deserialize;
use std::time::Duration;

use crate::telemetry::LoggingConfig;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Auth/profile backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Sign-in flow configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which backend implementation serves sessions and profiles.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Seeded in-process store (demo and tests)
    #[default]
    Memory,
    /// Remote Supabase-compatible auth + profile service
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Backend implementation
    #[serde(default)]
    pub mode: BackendMode,

    /// Base URL of the auth/profile service (rest mode)
    pub url: Option<String>,

    /// Public API key sent as the `apikey` header (rest mode)
    pub anon_key: Option<String>,

    /// How often the current profile is polled for role changes
    #[serde(default = "default_profile_poll_interval", with = "humantime_serde")]
    pub profile_poll_interval: Duration,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            url: None,
            anon_key: None,
            profile_poll_interval: default_profile_poll_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Where the OAuth provider sends the browser back to
    #[serde(default = "default_oauth_redirect")]
    pub oauth_redirect_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth_redirect_url: default_oauth_redirect(),
        }
    }
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5173 }
fn default_profile_poll_interval() -> Duration { Duration::from_secs(15) }
fn default_request_timeout() -> Duration { Duration::from_secs(10) }
fn default_oauth_redirect() -> String { "http://localhost:5173/auth/callback".to_string() }

impl Config {
    /// Load configuration from the environment (`ZIGMA__SECTION__KEY`).
    pub fn load() -> crate::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ZIGMA").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides on top.
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ZIGMA").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rest mode needs a URL and a key; nothing else is mandatory.
    pub fn validate(&self) -> crate::Result<()> {
        if self.backend.mode == BackendMode::Rest {
            if self.backend.url.is_none() {
                return Err(crate::ZigmaError::new(
                    crate::ErrorCode::MissingConfiguration,
                    "backend.url is required in rest mode",
                ));
            }
            if self.backend.anon_key.is_none() {
                return Err(crate::ZigmaError::new(
                    crate::ErrorCode::MissingConfiguration,
                    "backend.anon_key is required in rest mode",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 5173);
        assert_eq!(cfg.backend.mode, BackendMode::Memory);
        assert_eq!(cfg.backend.profile_poll_interval, Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rest_mode_requires_url_and_key() {
        let mut cfg = Config::default();
        cfg.backend.mode = BackendMode::Rest;
        assert!(cfg.validate().is_err());

        cfg.backend.url = Some("https://example.supabase.co".into());
        assert!(cfg.validate().is_err());

        cfg.backend.anon_key = Some("anon".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[backend]
mode = "rest"
url = "https://project.supabase.co"
anon_key = "public-anon-key"
profile_poll_interval = "3s"

[observability]
level = "debug"
format = "pretty"
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.backend.mode, BackendMode::Rest);
        assert_eq!(cfg.backend.profile_poll_interval, Duration::from_secs(3));
        assert_eq!(cfg.observability.level, "debug");
    }
}
