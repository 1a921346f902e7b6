// Hand-written fakes for the moderation ports, shared by the unit tests.

use super::moderation_models::{AuditNote, CheckMessageRequest, SubmissionId, SubmissionStatus};
use super::moderation_service::{HostError, SubmissionHost};
use super::verdict_service::{CredentialProvider, ScoringApi, ScoringError, SettingsError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Credential provider with a fixed answer.
pub struct FixedCredential {
    key: Option<String>,
    fail: bool,
}

impl FixedCredential {
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_string),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            key: None,
            fail: true,
        }
    }
}

#[async_trait]
impl CredentialProvider for FixedCredential {
    async fn api_key(&self) -> Result<Option<String>, SettingsError> {
        if self.fail {
            let err = serde_json::from_str::<Value>("{not json").unwrap_err();
            return Err(SettingsError::Parse(err));
        }
        Ok(self.key.clone())
    }
}

/// Scoring API that records every request and replies from a script.
#[derive(Clone)]
pub struct RecordingScoringApi {
    requests: Arc<Mutex<Vec<CheckMessageRequest>>>,
    default_reply: Result<Value, ScoringError>,
    replies_by_email: Arc<HashMap<String, Value>>,
}

impl RecordingScoringApi {
    pub fn responding(reply: Value) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            default_reply: Ok(reply),
            replies_by_email: Arc::new(HashMap::new()),
        }
    }

    pub fn failing(error: ScoringError) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            default_reply: Err(error),
            replies_by_email: Arc::new(HashMap::new()),
        }
    }

    /// Reply per sender email; unknown emails get `{"allow": 1}`.
    pub fn by_email(replies: Vec<(&str, Value)>) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            default_reply: Ok(serde_json::json!({"allow": 1})),
            replies_by_email: Arc::new(
                replies
                    .into_iter()
                    .map(|(email, reply)| (email.to_string(), reply))
                    .collect(),
            ),
        }
    }

    pub fn requests(&self) -> Vec<CheckMessageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoringApi for RecordingScoringApi {
    async fn check_message(&self, request: &CheckMessageRequest) -> Result<Value, ScoringError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reply) = self.replies_by_email.get(&request.sender_email) {
            return Ok(reply.clone());
        }
        self.default_reply.clone()
    }
}

/// Host that records mutations and can be told to reject them.
#[derive(Clone, Default)]
pub struct RecordingHost {
    notes: Arc<Mutex<Vec<AuditNote>>>,
    status_updates: Arc<Mutex<Vec<(SubmissionId, SubmissionStatus)>>>,
    reject_notes: bool,
    fail_status: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_notes(mut self) -> Self {
        self.reject_notes = true;
        self
    }

    pub fn failing_status_updates(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn notes(&self) -> Vec<AuditNote> {
        self.notes.lock().unwrap().clone()
    }

    pub fn status_updates(&self) -> Vec<(SubmissionId, SubmissionStatus)> {
        self.status_updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionHost for RecordingHost {
    async fn update_status(
        &self,
        submission_id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<(), HostError> {
        if self.fail_status {
            return Err(HostError::Storage("database is locked".to_string()));
        }
        self.status_updates
            .lock()
            .unwrap()
            .push((submission_id.clone(), status));
        Ok(())
    }

    async fn add_note(&self, note: AuditNote) -> Result<(), HostError> {
        if self.reject_notes {
            return Err(HostError::Unsupported("notes disabled".to_string()));
        }
        self.notes.lock().unwrap().push(note);
        Ok(())
    }
}
