// Host-specific save handling - translates a "partial entry saved" event
// into a pipeline run and hands the submission back.

use crate::core::moderation::{
    CredentialProvider, FormDefinition, ScoringApi, SpamCheckPipeline, Submission,
    SubmissionStore,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

/// Payload the host sends after saving a partial entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEvent {
    pub submission: Submission,
    pub form: FormDefinition,
    /// Network origin of the visitor who filled in the form, if known.
    #[serde(default)]
    pub origin_ip: Option<IpAddr>,
}

impl SaveEvent {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("Invalid partial entry save event")
    }
}

/// Services shared by every save event.
pub struct HostContext<S, C, A>
where
    S: SubmissionStore,
    C: CredentialProvider,
    A: ScoringApi,
{
    pub store: Arc<S>,
    pub pipeline: SpamCheckPipeline<C, A, Arc<S>>,
}

impl<S, C, A> HostContext<S, C, A>
where
    S: SubmissionStore,
    C: CredentialProvider,
    A: ScoringApi,
{
    pub fn new(store: Arc<S>, pipeline: SpamCheckPipeline<C, A, Arc<S>>) -> Self {
        Self { store, pipeline }
    }

    /// Persist the incoming entry, run the spam check, return the entry.
    ///
    /// Never fails: the host must always get its submission back.
    pub async fn handle_partial_entry_saved(&self, event: SaveEvent) -> Submission {
        let SaveEvent {
            mut submission,
            form,
            origin_ip,
        } = event;

        if let Err(e) = self.store.save_submission(&submission).await {
            tracing::error!(
                submission_id = %submission.id,
                "Failed to store partial entry before spam check: {}",
                e
            );
        }

        // The host may resend an entry we already moved to spam with a stale status.
        match self.store.get_submission(&submission.id).await {
            Ok(Some(stored)) if stored.is_spam() => submission.status = stored.status,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    "Failed to read back stored status: {}",
                    e
                );
            }
        }

        self.pipeline.process(submission, &form, origin_ip).await
    }
}
