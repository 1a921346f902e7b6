// SQLite-backed submission host.
//
// Tables:
// - submissions: One row per (partial) entry with its status and field values
// - submission_notes: Append-only audit notes

use crate::core::moderation::{
    AuditNote, HostError, Submission, SubmissionHost, SubmissionId, SubmissionStatus,
    SubmissionStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteSubmissionStore {
    pool: Pool<Sqlite>,
}

impl SqliteSubmissionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) a database file and run migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}?mode=rwc", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), HostError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'active',
                fields TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HostError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS submission_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_id TEXT NOT NULL,
                author TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_submission_notes_submission
                ON submission_notes(submission_id, id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HostError::Storage(e.to_string()))?;

        Ok(())
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[async_trait]
impl SubmissionHost for SqliteSubmissionStore {
    async fn update_status(
        &self,
        submission_id: &SubmissionId,
        status: SubmissionStatus,
    ) -> Result<(), HostError> {
        let result = sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(&submission_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(HostError::NotFound(submission_id.clone()));
        }
        Ok(())
    }

    async fn add_note(&self, note: AuditNote) -> Result<(), HostError> {
        let exists = sqlx::query("SELECT 1 FROM submissions WHERE id = ?")
            .bind(&note.submission_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;
        if exists.is_none() {
            return Err(HostError::NotFound(note.submission_id));
        }

        sqlx::query(
            r#"
            INSERT INTO submission_notes (submission_id, author, body, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&note.submission_id.0)
        .bind(&note.author)
        .bind(&note.body)
        .bind(note.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for SqliteSubmissionStore {
    async fn save_submission(&self, submission: &Submission) -> Result<(), HostError> {
        let fields = serde_json::to_string(&submission.fields)
            .map_err(|e| HostError::Storage(e.to_string()))?;

        // A spam row stays spam no matter what status the host resubmits.
        sqlx::query(
            r#"
            INSERT INTO submissions (id, status, fields, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = CASE WHEN submissions.status = 'spam' THEN 'spam' ELSE excluded.status END,
                fields = excluded.fields,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&submission.id.0)
        .bind(submission.status.to_string())
        .bind(fields)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HostError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_submission(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<Option<Submission>, HostError> {
        let row = sqlx::query("SELECT status, fields FROM submissions WHERE id = ?")
            .bind(&submission_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| HostError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_str: String = row.get("status");
        let status: SubmissionStatus = status_str.parse().map_err(HostError::Storage)?;
        let fields_str: String = row.get("fields");
        let fields =
            serde_json::from_str(&fields_str).map_err(|e| HostError::Storage(e.to_string()))?;

        Ok(Some(Submission {
            id: submission_id.clone(),
            status,
            fields,
        }))
    }

    async fn list_notes(&self, submission_id: &SubmissionId) -> Result<Vec<AuditNote>, HostError> {
        let rows = sqlx::query(
            r#"
            SELECT author, body, created_at
            FROM submission_notes
            WHERE submission_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(&submission_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HostError::Storage(e.to_string()))?;

        let mut notes = Vec::new();
        for row in rows {
            let created_at: String = row.get("created_at");
            notes.push(AuditNote {
                submission_id: submission_id.clone(),
                author: row.get("author"),
                body: row.get("body"),
                created_at: Self::parse_timestamp(&created_at),
            });
        }
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn memory_store() -> SqliteSubmissionStore {
        // One connection so every query sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSubmissionStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_save_and_load_submission() {
        let store = memory_store().await;
        let submission = Submission::new("7").with_field(3, "a@x.com");

        store.save_submission(&submission).await.unwrap();
        let loaded = store.get_submission(&submission.id).await.unwrap();

        assert_eq!(loaded, Some(submission));
    }

    #[tokio::test]
    async fn test_update_status_requires_existing_row() {
        let store = memory_store().await;

        let err = store
            .update_status(&SubmissionId::from("missing"), SubmissionStatus::Spam)
            .await
            .unwrap_err();

        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_spam_status_survives_resave() {
        let store = memory_store().await;
        let submission = Submission::new("8").with_field(3, "a@x.com");
        store.save_submission(&submission).await.unwrap();

        store
            .update_status(&submission.id, SubmissionStatus::Spam)
            .await
            .unwrap();
        // The host saves the partial entry again with an updated field.
        store
            .save_submission(&submission.clone().with_field(4, "more"))
            .await
            .unwrap();

        let loaded = store.get_submission(&submission.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SubmissionStatus::Spam);
        assert_eq!(loaded.fields.len(), 2);
    }

    #[tokio::test]
    async fn test_notes_are_appended_in_order() {
        let store = memory_store().await;
        let id = SubmissionId::from("9");
        store.save_submission(&Submission::new("9")).await.unwrap();

        store
            .add_note(AuditNote::system(id.clone(), "first".into()))
            .await
            .unwrap();
        store
            .add_note(AuditNote::system(id.clone(), "second".into()))
            .await
            .unwrap();

        let notes = store.list_notes(&id).await.unwrap();
        let bodies: Vec<_> = notes.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert!(notes.iter().all(|n| n.author == "CleanTalk"));
    }

    #[tokio::test]
    async fn test_note_for_unknown_submission_is_rejected() {
        let store = memory_store().await;

        let err = store
            .add_note(AuditNote::system(SubmissionId::from("nope"), "x".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("submissions.db");

        let store = SqliteSubmissionStore::connect(path.to_str().unwrap())
            .await
            .unwrap();
        store.save_submission(&Submission::new("1")).await.unwrap();

        assert!(path.exists());
    }
}
