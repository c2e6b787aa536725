use crate::{
    adapters::{
        email::resend::{LogOnlyNotifier, ResendNotifier},
        http::app_state::AppState,
    },
    application::referral::SystemClock,
    infra::{
        InfraError, RateLimiterTrait, config::AppConfig, postgres_persistence,
        rate_limit::RedisRateLimiter,
    },
    use_cases::waitlist::{WaitlistRepo, WaitlistUseCases, WaitlistNotifier},
};
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> Result<AppState, InfraError> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter: Arc<dyn RateLimiterTrait> = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
        )
        .await?,
    );

    let notifier: Arc<dyn WaitlistNotifier> = match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendNotifier::new(
            api_key.clone(),
            config.email_from.clone(),
            config.app_origin.clone(),
        )),
        None => {
            warn!("RESEND_API_KEY not set, waitlist emails will only be logged");
            Arc::new(LogOnlyNotifier)
        }
    };

    let waitlist_use_cases = WaitlistUseCases::new(
        postgres_arc as Arc<dyn WaitlistRepo>,
        notifier,
        Arc::new(SystemClock),
        config.enrollment_strategy,
        config.directory_timeout,
    );

    info!(
        strategy = %config.enrollment_strategy,
        directory_timeout_ms = config.directory_timeout.as_millis() as u64,
        "Waitlist enrollment configured"
    );

    Ok(AppState {
        config: Arc::new(config),
        waitlist_use_cases: Arc::new(waitlist_use_cases),
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "waitlist_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs), skipped if the file cannot be created
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
