use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::{email_templates, referral::share_url},
    domain::entities::waitlist_email::WaitlistEmailKind,
    infra::http_client,
    use_cases::waitlist::{EnrollmentResult, WaitlistNotifier},
};

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Sends every waitlist message kind through the Resend API.
#[derive(Clone)]
pub struct ResendNotifier {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    from: String,
    app_origin: Url,
}

impl ResendNotifier {
    pub fn new(api_key: SecretString, from: String, app_origin: Url) -> Self {
        Self {
            client: http_client::build_client(),
            endpoint: RESEND_EMAILS_URL.to_string(),
            api_key,
            from,
            app_origin,
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[async_trait]
impl WaitlistNotifier for ResendNotifier {
    async fn send(&self, kind: WaitlistEmailKind, result: &EnrollmentResult) -> AppResult<()> {
        let link = share_url(&self.app_origin, &result.referral_code);
        let (subject, html) =
            email_templates::render_email(kind, self.app_origin.as_str(), result, link.as_str());
        let body = ResendReq {
            from: &self.from,
            to: [&result.email],
            subject: &subject,
            html: &html,
        };
        self.client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Notification(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Notification(e.to_string()))?;
        Ok(())
    }
}

/// Used when no mail API key is configured: messages are logged, not sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnlyNotifier;

#[async_trait]
impl WaitlistNotifier for LogOnlyNotifier {
    async fn send(&self, kind: WaitlistEmailKind, result: &EnrollmentResult) -> AppResult<()> {
        tracing::info!(
            %kind,
            email = %result.email,
            position = result.position,
            referral_code = %result.referral_code,
            "No mail API key configured, skipping waitlist email"
        );
        Ok(())
    }
}
