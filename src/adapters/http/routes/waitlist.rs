use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{
        referral::share_url,
        validators::{is_valid_email, normalize_institution, normalize_name, parse_role},
    },
    domain::entities::waitlist_email::WaitlistEmailKind,
    infra::config::AppConfig,
    use_cases::waitlist::EnrollmentSubmission,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(enroll))
        .route("/position", get(get_position))
        .route("/check", get(check_enrolled))
        .route("/stats", get(get_stats))
        .route("/emails", post(send_email))
}

#[derive(Deserialize)]
struct EnrollRequest {
    email: String,
    name: Option<String>,
    role: Option<String>,
    institution: Option<String>,
}

#[derive(Serialize)]
struct EnrollResponse {
    name: Option<String>,
    email: String,
    position: i64,
    referral_code: String,
    share_url: String,
}

impl EnrollRequest {
    fn into_submission(self) -> AppResult<EnrollmentSubmission> {
        let email = self.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Please enter a valid email address".into()));
        }
        Ok(EnrollmentSubmission {
            email,
            name: normalize_name(self.name.as_deref()).map_err(AppError::InvalidInput)?,
            role: parse_role(self.role.as_deref()).map_err(AppError::InvalidInput)?,
            institution: normalize_institution(self.institution.as_deref())
                .map_err(AppError::InvalidInput)?,
        })
    }
}

async fn enroll(
    State(app_state): State<AppState>,
    payload: Result<Json<EnrollRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let submission = payload.into_submission()?;
    let result = app_state.waitlist_use_cases.enroll(submission).await?;
    let share_url = share_url(&app_state.config.app_origin, &result.referral_code);

    Ok((
        StatusCode::CREATED,
        Json(EnrollResponse {
            name: result.name,
            email: result.email,
            position: result.position,
            referral_code: result.referral_code,
            share_url: share_url.to_string(),
        }),
    ))
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

#[derive(Serialize)]
struct PositionResponse {
    position: Option<i64>,
    total: i64,
}

async fn get_position(
    State(app_state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(query) = query?;
    let standing = app_state
        .waitlist_use_cases
        .position_of(query.email.trim())
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(PositionResponse {
        position: standing.position,
        total: standing.total,
    }))
}

#[derive(Serialize)]
struct CheckResponse {
    is_on_waitlist: bool,
}

async fn check_enrolled(
    State(app_state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(query) = query?;
    let is_on_waitlist = app_state
        .waitlist_use_cases
        .is_enrolled(query.email.trim())
        .await?;
    Ok(Json(CheckResponse { is_on_waitlist }))
}

#[derive(Serialize)]
struct StatsResponse {
    total_entries: i64,
    unranked_entries: i64,
}

async fn get_stats(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = app_state.waitlist_use_cases.stats().await?;
    Ok(Json(StatsResponse {
        total_entries: stats.total_entries,
        unranked_entries: stats.unranked_entries,
    }))
}

#[derive(Deserialize)]
struct SendEmailRequest {
    #[serde(rename = "type")]
    kind: String,
    email: String,
}

/// Answers as if the route did not exist unless the configured key is presented.
fn require_admin_key(config: &AppConfig, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = config.admin_api_key.as_ref() else {
        return Err(AppError::NotFound);
    };
    let provided = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !constant_time_compare(provided, expected.expose_secret()) {
        tracing::warn!("Rejected campaign email request with missing or wrong admin key");
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

async fn send_email(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    require_admin_key(&app_state.config, &headers)?;
    let Json(payload) = payload?;
    let kind: WaitlistEmailKind = payload.kind.parse().map_err(AppError::InvalidInput)?;

    app_state
        .waitlist_use_cases
        .send_email(kind, payload.email.trim())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
