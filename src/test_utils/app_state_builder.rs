//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::{email::resend::LogOnlyNotifier, http::app_state::AppState},
    app_error::{AppError, AppResult},
    application::{
        referral::Clock,
        use_cases::waitlist::{WaitlistNotifier, WaitlistUseCases},
    },
    domain::entities::{enrollment_strategy::EnrollmentStrategy, waitlist_entry::WaitlistEntry},
    infra::{RateLimiterTrait, config::AppConfig},
    test_utils::{FixedClock, InMemoryWaitlistRepo},
};

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

/// In-memory rate limiter for testing.
/// Uses HashMap to track request counts per IP.
pub struct InMemoryRateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_per_ip: u64,
}

impl InMemoryRateLimiter {
    pub fn new(max_per_ip: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_per_ip,
        }
    }

    /// Create a permissive rate limiter that never blocks (for most tests).
    pub fn permissive() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, ip: &str) -> AppResult<()> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(format!("rate:waitlist:ip:{ip}")).or_insert(0);
        *count += 1;
        if *count > self.max_per_ip {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let (app_state, repo) = TestAppStateBuilder::new()
///     .with_entry(create_test_entry("alice@example.edu", 0, |_| {}))
///     .with_strategy(EnrollmentStrategy::Serialized)
///     .build_with_repo();
/// ```
pub struct TestAppStateBuilder {
    entries: Vec<WaitlistEntry>,
    strategy: EnrollmentStrategy,
    notifier: Option<Arc<dyn WaitlistNotifier>>,
    rate_limiter: Option<Arc<dyn RateLimiterTrait>>,
    clock: Arc<dyn Clock>,
    app_origin: Url,
    admin_api_key: Option<SecretString>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![],
            strategy: EnrollmentStrategy::default(),
            notifier: None,
            rate_limiter: None,
            clock: Arc::new(FixedClock::default()),
            app_origin: Url::parse("https://waitlist.test").unwrap(),
            admin_api_key: None,
        }
    }

    /// Seed the store with an existing entry.
    pub fn with_entry(mut self, entry: WaitlistEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_strategy(mut self, strategy: EnrollmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set a custom notifier (for asserting on what gets sent).
    pub fn with_notifier(mut self, notifier: Arc<dyn WaitlistNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiterTrait>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable the campaign email route with this key.
    pub fn with_admin_key(mut self, key: &str) -> Self {
        self.admin_api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Build the AppState and hand back the store for assertions.
    pub fn build_with_repo(self) -> (AppState, Arc<InMemoryWaitlistRepo>) {
        let repo = Arc::new(InMemoryWaitlistRepo::with_entries(self.entries));
        let notifier: Arc<dyn WaitlistNotifier> = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogOnlyNotifier));
        let rate_limiter: Arc<dyn RateLimiterTrait> = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::permissive()));

        let directory_timeout = Duration::from_secs(5);
        let waitlist_use_cases = Arc::new(WaitlistUseCases::new(
            repo.clone(),
            notifier,
            self.clock,
            self.strategy,
            directory_timeout,
        ));

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            database_url: String::new(),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            app_origin: self.app_origin,
            cors_origin: HeaderValue::from_static("https://waitlist.test"),
            redis_url: String::new(),
            rate_limit_window_secs: 60,
            rate_limit_per_ip: 30,
            trust_proxy: false,
            resend_api_key: None,
            email_from: "Waitlist <onboarding@waitlist.test>".to_string(),
            admin_api_key: self.admin_api_key,
            enrollment_strategy: self.strategy,
            directory_timeout,
        });

        let app_state = AppState {
            config,
            waitlist_use_cases,
            rate_limiter,
        };
        (app_state, repo)
    }

    pub fn build(self) -> AppState {
        self.build_with_repo().0
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
