// Moderation service - core business logic for the partial-entry spam check.
//
// This service handles:
// - Scanning a submission for email fields
// - Asking the verdict client about each email
// - Writing the audit note and the spam transition through the host port
//
// NO HTTP or database dependencies here - just pure domain logic.

use super::field_scanner::scan_email_fields;
use super::moderation_models::{
    AuditNote, FieldId, FormDefinition, ScanPolicy, Submission, SubmissionId, SubmissionStatus,
    Verdict,
};
use super::verdict_service::{CredentialProvider, ScoringApi, SpamVerdictClient};
use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Submission {0} not found")]
    NotFound(SubmissionId),

    #[allow(dead_code)]
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// HOST TRAIT (PORT)
// ============================================================================

/// Mutations the host platform exposes for a submission.
#[async_trait]
pub trait SubmissionHost: Send + Sync {
    /// Change the status of a submission.
    async fn update_status(
        &self,
        submission_id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<(), HostError>;

    /// Append an audit note to a submission.
    async fn add_note(&self, note: AuditNote) -> Result<(), HostError>;
}

// Shared hosts: the save-event adapter keeps its own handle to the store
// it hands to the pipeline.
#[async_trait]
impl<T: SubmissionHost + ?Sized> SubmissionHost for Arc<T> {
    async fn update_status(
        &self,
        submission_id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<(), HostError> {
        (**self).update_status(submission_id, status).await
    }

    async fn add_note(&self, note: AuditNote) -> Result<(), HostError> {
        (**self).add_note(note).await
    }
}

/// Storage side of the host: lets the save-event adapter persist the
/// incoming partial entry and read back what the check did.
#[async_trait]
pub trait SubmissionStore: SubmissionHost {
    /// Insert or replace the submission's field values. An existing spam
    /// status is never downgraded.
    async fn save_submission(&self, submission: &Submission) -> Result<(), HostError>;

    async fn get_submission(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<Submission>, HostError>;

    /// Notes for a submission, in insertion order.
    #[allow(dead_code)]
    async fn list_notes(&self, submission_id: &SubmissionId) -> Result<Vec<AuditNote>, HostError>;
}

// ============================================================================
// MODERATION ACTION
// ============================================================================

/// What a single moderation action managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModerationOutcome {
    pub note_recorded: bool,
    pub marked_spam: bool,
}

/// Applies a verdict to a submission: one audit note, and a spam
/// transition when warranted. The two writes are independent.
pub struct ModerationAction<H: SubmissionHost> {
    host: H,
}

impl<H: SubmissionHost> ModerationAction<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Record the verdict for `email` and move `submission` to spam if needed.
    ///
    /// `submission.status` is only changed when the host accepted the
    /// transition. Only an `active` submission is ever moved to spam.
    pub async fn apply(
        &self,
        submission: &mut Submission,
        email: &str,
        verdict: &Verdict,
    ) -> ModerationOutcome {
        let mut outcome = ModerationOutcome::default();

        let note = AuditNote::system(submission.id.clone(), audit_body(email, verdict));
        match self.host.add_note(note).await {
            Ok(()) => outcome.note_recorded = true,
            Err(HostError::Unsupported(reason)) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    "Host does not support notes for this submission: {}",
                    reason
                );
            }
            Err(e) => {
                tracing::error!(
                    submission_id = %submission.id,
                    "Failed to add CleanTalk note: {}",
                    e
                );
            }
        }

        if !verdict.is_spam || submission.status != SubmissionStatus::Active {
            return outcome;
        }

        match self
            .host
            .update_status(&submission.id, SubmissionStatus::Spam)
            .await
        {
            Ok(()) => {
                submission.status = SubmissionStatus::Spam;
                outcome.marked_spam = true;
                tracing::info!(
                    submission_id = %submission.id,
                    email,
                    "Spam detected and entry marked as spam"
                );
            }
            Err(e) => {
                tracing::error!(
                    submission_id = %submission.id,
                    email,
                    "Failed to mark entry as spam: {}",
                    e
                );
            }
        }

        outcome
    }
}

/// Human-readable audit note body. The credential is masked.
pub fn audit_body(email: &str, verdict: &Verdict) -> String {
    let headline = if verdict.is_spam {
        "spam detected"
    } else {
        "no spam detected"
    };

    let mut body = format!(
        "CleanTalk check for email {}: {}.\nis_spam: {}\n",
        email, headline, verdict.is_spam
    );
    if let Some(error) = &verdict.error {
        body.push_str(&format!("error: {}\n", error));
    }

    let mut details = serde_json::to_value(verdict).unwrap_or(Value::Null);
    if let Some(key) = details.pointer_mut("/payload/auth_key") {
        *key = Value::String("********".to_string());
    }
    let rendered = serde_json::to_string_pretty(&details).unwrap_or_default();
    body.push_str("CleanTalk verdict: ");
    body.push_str(&rendered);

    body
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Per-field result of one pipeline run.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct FieldCheck {
    pub field_id: FieldId,
    pub email: String,
    pub verdict: Verdict,
    pub outcome: ModerationOutcome,
}

/// Field scan -> verdict -> moderation, once per saved submission.
pub struct SpamCheckPipeline<C: CredentialProvider, A: ScoringApi, H: SubmissionHost> {
    verdicts: SpamVerdictClient<C, A>,
    moderation: ModerationAction<H>,
    scan_policy: ScanPolicy,
}

impl<C, A, H> SpamCheckPipeline<C, A, H>
where
    C: CredentialProvider,
    A: ScoringApi,
    H: SubmissionHost,
{
    pub fn new(
        verdicts: SpamVerdictClient<C, A>,
        moderation: ModerationAction<H>,
        scan_policy: ScanPolicy,
    ) -> Self {
        Self {
            verdicts,
            moderation,
            scan_policy,
        }
    }

    /// Run the check and hand the submission back to the host.
    ///
    /// Never fails. Only `active` entries are checked; any other status is
    /// returned untouched. The returned submission is `spam` iff it already
    /// was or the host accepted the transition during this run.
    pub async fn process(
        &self,
        mut submission: Submission,
        form: &FormDefinition,
        origin_ip: Option<IpAddr>,
    ) -> Submission {
        let checks = self.run(&mut submission, form, origin_ip).await;
        tracing::debug!(
            submission_id = %submission.id,
            checked_fields = checks.len(),
            status = %submission.status,
            "Partial entry spam check finished"
        );
        submission
    }

    /// Same as [`process`](Self::process) but reports every field check.
    pub async fn run(
        &self,
        submission: &mut Submission,
        form: &FormDefinition,
        origin_ip: Option<IpAddr>,
    ) -> Vec<FieldCheck> {
        let mut checks = Vec::new();

        if submission.status != SubmissionStatus::Active {
            tracing::debug!(
                submission_id = %submission.id,
                status = %submission.status,
                "Entry is not active, skipping check"
            );
            return checks;
        }

        let emails: Vec<(FieldId, String)> = scan_email_fields(submission, form)
            .map(|(field_id, email)| (field_id, email.to_string()))
            .collect();

        for (field_id, email) in emails {
            let verdict = self.verdicts.check_email(&email, origin_ip).await;
            let outcome = self.moderation.apply(submission, &email, &verdict).await;
            let stop = verdict.is_spam && self.scan_policy == ScanPolicy::FirstMatch;

            checks.push(FieldCheck {
                field_id,
                email,
                verdict,
                outcome,
            });

            if stop {
                break;
            }
        }

        checks
    }
}

// ============================================================================
// TESTS
// ============================================================================
