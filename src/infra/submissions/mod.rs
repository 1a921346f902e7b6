// Submission hosts: where status changes and audit notes end up.

pub mod in_memory;
pub mod sqlite_submission_store;

pub use in_memory::InMemorySubmissionStore;
pub use sqlite_submission_store::SqliteSubmissionStore;
