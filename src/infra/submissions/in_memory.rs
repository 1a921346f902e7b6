// In-memory submission host. Used when no database is configured (dry run):
// mutations are visible for the lifetime of the process and then discarded.

use crate::core::moderation::{
    AuditNote, HostError, Submission, SubmissionHost, SubmissionId, SubmissionStatus,
    SubmissionStore,
};
use async_trait::async_trait;
use dashmap::DashMap;

/// **DashMap:** concurrent map, so the store can sit behind an `Arc`
/// shared by the save-event adapter and the pipeline without a Mutex.
pub struct InMemorySubmissionStore {
    submissions: DashMap<SubmissionId, Submission>,
    notes: DashMap<SubmissionId, Vec<AuditNote>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self {
            submissions: DashMap::new(),
            notes: DashMap::new(),
        }
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionHost for InMemorySubmissionStore {
    async fn update_status(
        &self,
        submission_id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<(), HostError> {
        match self.submissions.get_mut(submission_id) {
            Some(mut entry) => {
                entry.status = status;
                Ok(())
            }
            None => Err(HostError::NotFound(submission_id.clone())),
        }
    }

    async fn add_note(&self, note: AuditNote) -> Result<(), HostError> {
        if !self.submissions.contains_key(&note.submission_id) {
            return Err(HostError::NotFound(note.submission_id));
        }
        self.notes
            .entry(note.submission_id.clone())
            .or_default()
            .push(note);
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn save_submission(&self, submission: &Submission) -> Result<(), HostError> {
        self.submissions
            .entry(submission.id.clone())
            .and_modify(|existing| {
                existing.fields = submission.fields.clone();
                if existing.status != SubmissionStatus::Spam {
                    existing.status = submission.status;
                }
            })
            .or_insert_with(|| submission.clone());
        Ok(())
    }

    async fn get_submission(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<Submission>, HostError> {
        Ok(self.submissions.get(submission_id).map(|s| s.clone()))
    }

    async fn list_notes(&self, submission_id: &SubmissionId) -> Result<Vec<AuditNote>, HostError> {
        Ok(self
            .notes
            .get(submission_id)
            .map(|notes| notes.clone())
            .unwrap_or_default())
    }
}
