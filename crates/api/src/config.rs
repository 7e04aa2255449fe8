use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Credentials and endpoints of the third-party providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_verify_service_sid: String,
    pub monobank_token: String,
    pub nova_poshta_api_key: String,
    pub geonames_username: String,
    pub spaces_key: String,
    pub spaces_secret: String,
    pub spaces_region: String,
    pub spaces_bucket: String,
    /// Host of the S3-compatible endpoint, e.g. `fra1.digitaloceanspaces.com`.
    pub spaces_endpoint: String,
    pub sendgrid_api_key: String,
    pub email_from: String,
    /// Timeout applied to every outbound provider request.
    pub http_timeout_secs: u64,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. Without one the in-memory store is used.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Vendor token signing secret.
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Lifetime of premium session tokens.
    pub session_ttl_days: i64,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Delay before the automatic admin reply in a new chat.
    pub chat_auto_reply_delay_secs: u64,
    pub chat_auto_reply_text: String,
    /// Request body limit, chat images are inlined.
    pub max_body_bytes: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    pub providers: ProviderConfig,
}

/// Signing key used when `JWT_SECRET` is unset. Publicly known.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me-in-production";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
            db_max_connections: 20,
            db_min_connections: 2,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_hours: 24,
            session_ttl_days: 30,
            event_bus_capacity: 1024,
            chat_auto_reply_delay_secs: 5,
            chat_auto_reply_text: memoria_core::chat::AUTO_REPLY_TEXT.to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
            providers: ProviderConfig {
                spaces_region: "fra1".to_string(),
                spaces_endpoint: "fra1.digitaloceanspaces.com".to_string(),
                http_timeout_secs: 15,
                ..ProviderConfig::default()
            },
        }
    }
}

fn text(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value,
            expected,
        }),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let providers = ProviderConfig {
            twilio_account_sid: text("TWILIO_ACCOUNT_SID", ""),
            twilio_auth_token: text("TWILIO_AUTH_TOKEN", ""),
            twilio_verify_service_sid: text("TWILIO_VERIFY_SERVICE_SID", ""),
            monobank_token: text("MONOBANK_TOKEN", ""),
            nova_poshta_api_key: text("NOVA_POSHTA_API_KEY", ""),
            geonames_username: text("GEONAMES_USERNAME", ""),
            spaces_key: text("SPACES_KEY", ""),
            spaces_secret: text("SPACES_SECRET", ""),
            spaces_region: text("SPACES_REGION", &defaults.providers.spaces_region),
            spaces_bucket: text("SPACES_BUCKET", ""),
            spaces_endpoint: text("SPACES_ENDPOINT", &defaults.providers.spaces_endpoint),
            sendgrid_api_key: text("SENDGRID_API_KEY", ""),
            email_from: text("EMAIL_FROM", ""),
            http_timeout_secs: parsed(
                "HTTP_TIMEOUT_SECS",
                defaults.providers.http_timeout_secs,
                "u64",
            )?,
        };
        Ok(Self {
            host: text("HOST", &defaults.host),
            port: parsed("PORT", defaults.port, "u16")?,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", defaults.db_max_connections, "u32")?,
            db_min_connections: parsed("DB_MIN_CONNECTIONS", defaults.db_min_connections, "u32")?,
            jwt_secret: text("JWT_SECRET", &defaults.jwt_secret),
            jwt_ttl_hours: parsed("JWT_TTL_HOURS", defaults.jwt_ttl_hours, "i64")?,
            session_ttl_days: parsed("SESSION_TTL_DAYS", defaults.session_ttl_days, "i64")?,
            event_bus_capacity: parsed("EVENT_BUS_CAPACITY", defaults.event_bus_capacity, "usize")?,
            chat_auto_reply_delay_secs: parsed(
                "CHAT_AUTO_REPLY_DELAY_SECS",
                defaults.chat_auto_reply_delay_secs,
                "u64",
            )?,
            chat_auto_reply_text: text("CHAT_AUTO_REPLY_TEXT", &defaults.chat_auto_reply_text),
            max_body_bytes: parsed("MAX_BODY_BYTES", defaults.max_body_bytes, "usize")?,
            log_level: text("LOG_LEVEL", &defaults.log_level),
            providers,
        })
    }

    /// Vendor tokens are signed with the publicly known development key.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_all_interfaces() {
        let config = AppConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5000");
        assert!(config.database_url.is_none());
        assert!(config.uses_dev_jwt_secret());
    }

    #[test]
    fn custom_jwt_secret_is_not_the_dev_key() {
        let config = AppConfig {
            jwt_secret: "s3cr3t-from-vault".into(),
            ..AppConfig::default()
        };
        assert!(!config.uses_dev_jwt_secret());
    }

    #[test]
    fn parsed_reports_bad_values() {
        std::env::set_var("MEMORIA_TEST_BAD_PORT", "not-a-port");
        let err = parsed::<u16>("MEMORIA_TEST_BAD_PORT", 1, "u16").unwrap_err();
        assert_eq!(
            err.to_string(),
            "MEMORIA_TEST_BAD_PORT must be a valid u16, got \"not-a-port\""
        );
        std::env::remove_var("MEMORIA_TEST_BAD_PORT");
    }

    #[test]
    fn parsed_falls_back_to_default() {
        assert_eq!(parsed("MEMORIA_TEST_UNSET_VALUE", 42u64, "u64").unwrap(), 42);
    }
}
