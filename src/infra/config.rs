use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::domain::entities::enrollment_strategy::EnrollmentStrategy;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Public site origin; share links are built on it.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy.
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
    /// Unset means welcome emails are only logged.
    pub resend_api_key: Option<SecretString>,
    pub email_from: String,
    /// Required in `x-admin-key` to send campaign emails. Unset disables that route.
    pub admin_api_key: Option<SecretString>,
    pub enrollment_strategy: EnrollmentStrategy,
    /// Upper bound on each individual database round trip of an enrollment.
    pub directory_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let app_origin: Url = get_env_default(
            "APP_ORIGIN",
            Url::parse("http://localhost:3000").unwrap(),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 30);
        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        let resend_api_key: Option<SecretString> = std::env::var("RESEND_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::new(k.into()));
        let email_from: String = get_env_default(
            "EMAIL_FROM",
            "Waitlist <onboarding@localhost>".to_string(),
        );

        let admin_api_key: Option<SecretString> = std::env::var("ADMIN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::new(k.into()));

        let enrollment_strategy: EnrollmentStrategy =
            get_env_default("ENROLLMENT_STRATEGY", EnrollmentStrategy::Atomic);
        let directory_timeout_ms: u64 = get_env_default("DIRECTORY_TIMEOUT_MS", 5_000);

        Self {
            database_url,
            bind_addr,
            app_origin,
            cors_origin,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            trust_proxy,
            resend_api_key,
            email_from,
            admin_api_key,
            enrollment_strategy,
            directory_timeout: Duration::from_millis(directory_timeout_ms),
        }
    }
}
