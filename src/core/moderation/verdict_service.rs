// Spam verdict client - asks the scoring service about one email.
//
// The credential and the HTTP call are both ports so the core never
// touches global settings or a concrete HTTP client.

use super::moderation_models::{CheckMessageRequest, MissingAllowPolicy, Verdict};
use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use thiserror::Error;

pub const CREDENTIAL_NOT_CONFIGURED: &str = "credential not configured";
pub const MISSING_ALLOW_FIELD: &str = "response missing allow field";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Scoring API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// PORTS
// ============================================================================

/// Source of the operator-configured API key.
///
/// Implementations must read fresh on every call so key rotation takes
/// effect without a restart.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// `Ok(None)` means no key is configured, which is not an error.
    async fn api_key(&self) -> Result<Option<String>, SettingsError>;
}

// Lets the composition root pick a provider at runtime (environment vs
// options file) without making the pipeline generic over both.
#[async_trait]
impl CredentialProvider for Box<dyn CredentialProvider> {
    async fn api_key(&self) -> Result<Option<String>, SettingsError> {
        (**self).api_key().await
    }
}

/// Remote spam-scoring service.
#[async_trait]
pub trait ScoringApi: Send + Sync {
    /// Send one `check_message` request and return the decoded body.
    async fn check_message(&self, request: &CheckMessageRequest) -> Result<Value, ScoringError>;
}

// ============================================================================
// CLIENT
// ============================================================================

/// Turns an email into a [`Verdict`]. Never fails.
pub struct SpamVerdictClient<C: CredentialProvider, A: ScoringApi> {
    credentials: C,
    api: A,
    missing_allow: MissingAllowPolicy,
}

impl<C: CredentialProvider, A: ScoringApi> SpamVerdictClient<C, A> {
    pub fn new(credentials: C, api: A, missing_allow: MissingAllowPolicy) -> Self {
        Self {
            credentials,
            api,
            missing_allow,
        }
    }

    /// Check one email address.
    ///
    /// Every failure (no credential, unreadable settings, transport error,
    /// bad response) degrades to a not-spam verdict with `error` set.
    pub async fn check_email(&self, email: &str, origin_ip: Option<IpAddr>) -> Verdict {
        let api_key = match self.credentials.api_key().await {
            Ok(Some(key)) if !key.trim().is_empty() => key,
            Ok(_) => {
                tracing::warn!("CleanTalk API key not configured, skipping spam check");
                return Verdict::not_configured(CREDENTIAL_NOT_CONFIGURED);
            }
            Err(e) => {
                tracing::warn!("Failed to load CleanTalk settings, skipping spam check: {}", e);
                return Verdict::not_configured(format!("{}: {}", CREDENTIAL_NOT_CONFIGURED, e));
            }
        };

        let sender_ip = origin_ip.map(|ip| ip.to_string()).unwrap_or_default();
        let request = CheckMessageRequest::new(api_key, email, sender_ip);
        let payload = request.to_value();

        let response = match self.api.check_message(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(email, "CleanTalk API error: {}", e);
                return Verdict::transport_failure(e.to_string(), payload);
            }
        };

        let mut verdict = Verdict::from_response(response, payload);
        if let Some(reason) = self.response_error(verdict.api_response.as_ref()) {
            tracing::warn!(email, "CleanTalk response problem: {}", reason);
            verdict.error = Some(reason);
        }

        tracing::debug!(email, is_spam = verdict.is_spam, "CleanTalk verdict");
        verdict
    }

    /// API-level problems reported inside an otherwise successful response.
    fn response_error(&self, response: Option<&Value>) -> Option<String> {
        let response = response?;

        let errno = response.get("errno").and_then(Value::as_i64).unwrap_or(0);
        if errno != 0 {
            let errstr = response
                .get("errstr")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Some(format!("CleanTalk error {}: {}", errno, errstr));
        }

        if self.missing_allow == MissingAllowPolicy::TreatAsError && response.get("allow").is_none()
        {
            return Some(MISSING_ALLOW_FIELD.to_string());
        }

        None
    }
}
