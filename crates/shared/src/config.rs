//! Application configuration management.
//!
//! Layered as `config/default.toml`, then `config/{RUN_MODE}.toml`, then
//! `EDUMART__*` environment variables (`EDUMART__DATABASE__URL`, ...).

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtConfig,
    /// Cache backend configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Outbound email configuration.
    #[serde(default)]
    pub email: EmailConfig,
    /// Commission and refund policy.
    #[serde(default)]
    pub finance: FinanceConfig,
    /// Rate limits for write endpoints.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// One-time password settings.
    #[serde(default)]
    pub otp: OtpConfig,
    /// Log output settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// `lock_timeout` and `statement_timeout` applied to financial transactions.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_transaction_timeout() -> u64 {
    10_000
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Which cache implementation backs read models and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process moka cache.
    #[default]
    Moka,
    /// Shared Redis instance.
    Redis,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: CacheBackend,
    /// Redis URL, required when `backend = "redis"`.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Maximum entries held by the moka backend.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            max_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// When false, emails are logged instead of sent.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default = "default_from_email")]
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Base URL used for links inside emails.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            frontend_url: default_frontend_url(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "noreply@edumart.local".to_string()
}

fn default_from_name() -> String {
    "Edumart".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

/// What a partial refund does to the earnings of the refunded payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialRefundPolicy {
    /// Cancel every pending earning of the payment, as a full refund would.
    #[default]
    CancelAll,
    /// Keep earnings untouched unless the refund is full.
    Retain,
}

/// Commission and refund policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FinanceConfig {
    /// Platform fee in basis points of the sale price (2000 = 20%).
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,
    /// Earnings handling on partial refunds.
    #[serde(default)]
    pub partial_refund_earnings: PartialRefundPolicy,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_platform_fee_bps(),
            partial_refund_earnings: PartialRefundPolicy::default(),
        }
    }
}

fn default_platform_fee_bps() -> u32 {
    2000
}

/// Rate limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Payout requests allowed per instructor per window.
    #[serde(default = "default_payout_requests")]
    pub payout_requests: u64,
    /// Payout request window in seconds.
    #[serde(default = "default_payout_window")]
    pub payout_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            payout_requests: default_payout_requests(),
            payout_window_secs: default_payout_window(),
        }
    }
}

fn default_payout_requests() -> u64 {
    5
}

fn default_payout_window() -> u64 {
    3600
}

/// OTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Lifetime of an issued code in seconds.
    #[serde(default = "default_otp_ttl")]
    pub ttl_secs: u64,
    /// Wrong guesses allowed before the code is burned.
    #[serde(default = "default_otp_attempts")]
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_otp_ttl(),
            max_attempts: default_otp_attempts(),
        }
    }
}

fn default_otp_ttl() -> u64 {
    600
}

fn default_otp_attempts() -> u32 {
    5
}

/// Log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("EDUMART")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, Option<&str>); 3] = [
        ("EDUMART__DATABASE__URL", Some("postgres://localhost/edumart_test")),
        ("EDUMART__JWT__SECRET", Some("test-secret")),
        ("RUN_MODE", Some("test")),
    ];

    #[test]
    fn test_load_applies_defaults() {
        temp_env::with_vars(REQUIRED, || {
            let cfg = AppConfig::load().unwrap();
            assert_eq!(cfg.database.url, "postgres://localhost/edumart_test");
            assert_eq!(cfg.database.transaction_timeout_ms, 10_000);
            assert_eq!(cfg.server.port, 8080);
            assert_eq!(cfg.cache.backend, CacheBackend::Moka);
            assert_eq!(cfg.finance.platform_fee_bps, 2000);
            assert_eq!(
                cfg.finance.partial_refund_earnings,
                PartialRefundPolicy::CancelAll
            );
            assert!(!cfg.email.enabled);
            assert!(!cfg.log.json);
        });
    }

    #[test]
    fn test_env_overrides_nested_values() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("EDUMART__FINANCE__PLATFORM_FEE_BPS", Some("1500")),
            ("EDUMART__FINANCE__PARTIAL_REFUND_EARNINGS", Some("retain")),
            ("EDUMART__CACHE__BACKEND", Some("redis")),
            ("EDUMART__CACHE__REDIS_URL", Some("redis://127.0.0.1/")),
            ("EDUMART__SERVER__PORT", Some("9090")),
        ]);
        temp_env::with_vars(vars, || {
            let cfg = AppConfig::load().unwrap();
            assert_eq!(cfg.finance.platform_fee_bps, 1500);
            assert_eq!(
                cfg.finance.partial_refund_earnings,
                PartialRefundPolicy::Retain
            );
            assert_eq!(cfg.cache.backend, CacheBackend::Redis);
            assert_eq!(cfg.cache.redis_url.as_deref(), Some("redis://127.0.0.1/"));
            assert_eq!(cfg.server.port, 9090);
        });
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("EDUMART__DATABASE__URL", None::<&str>),
                ("EDUMART__JWT__SECRET", Some("test-secret")),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}
