// This is the entry point of the partial-entry spam check.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (HTTP client, settings, databases)
// - `host/` = Form-platform adapters (save events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Read one "partial entry saved" event from stdin
// 4. Write the (possibly updated) submission back to stdout as JSON

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "host/host_layer.rs"]
mod host;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::moderation::{
    CredentialProvider, ModerationAction, ScanPolicy, SpamCheckConfig, SpamCheckPipeline,
    SpamVerdictClient, Submission, SubmissionStore,
};
use crate::host::{HostContext, SaveEvent};
use crate::infra::cleantalk::CleanTalkClient;
use crate::infra::settings::{
    load_spam_check_config, EnvCredentialProvider, JsonOptionsCredentialProvider,
};
use crate::infra::submissions::{InMemorySubmissionStore, SqliteSubmissionStore};
use anyhow::Context;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

type Verdicts = SpamVerdictClient<Box<dyn CredentialProvider>, CleanTalkClient>;

/// Pick where the API key comes from. Both providers read fresh per check.
fn credential_provider(config: &SpamCheckConfig) -> Box<dyn CredentialProvider> {
    match std::env::var("CLEANTALK_SETTINGS_FILE") {
        Ok(path) if !path.is_empty() => {
            tracing::debug!("Reading CleanTalk settings from {}", path);
            Box::new(JsonOptionsCredentialProvider::new(
                path,
                config.settings_key.clone(),
            ))
        }
        _ => Box::new(EnvCredentialProvider::default()),
    }
}

async fn handle_with_store<S: SubmissionStore + 'static>(
    store: Arc<S>,
    verdicts: Verdicts,
    scan_policy: ScanPolicy,
    event: SaveEvent,
) -> Submission {
    let pipeline = SpamCheckPipeline::new(
        verdicts,
        ModerationAction::new(Arc::clone(&store)),
        scan_policy,
    );
    let context = HostContext::new(store, pipeline);
    context.handle_partial_entry_saved(event).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout is reserved for the returned submission.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_spam_check_config();

    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("Failed to read save event from stdin")?;
    let event = SaveEvent::from_json(&raw)?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let api = match CleanTalkClient::new(config.endpoint.clone(), config.request_timeout) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("Failed to create CleanTalk client, returning entry unchecked: {}", e);
            return print_submission(&event.submission);
        }
    };
    let verdicts = SpamVerdictClient::new(credential_provider(&config), api, config.missing_allow);

    let database = match std::env::var("SUBMISSIONS_DB") {
        Ok(path) if !path.is_empty() => open_submission_db(&path).await,
        _ => None,
    };

    let result = match database {
        Some(store) => {
            handle_with_store(Arc::new(store), verdicts, config.scan_policy, event).await
        }
        None => {
            tracing::warn!(
                "No submissions database: status changes and notes go to an in-memory host \
                 and are discarded on exit"
            );
            let store = Arc::new(InMemorySubmissionStore::new());
            handle_with_store(store, verdicts, config.scan_policy, event).await
        }
    };

    print_submission(&result)
}

/// Open the SQLite host. A database that can't be opened is logged and the
/// caller falls back to the in-memory host so the entry is still returned.
async fn open_submission_db(path: &str) -> Option<SqliteSubmissionStore> {
    match SqliteSubmissionStore::connect(path).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!(path, "Failed to open submissions database: {:#}", e);
            None
        }
    }
}

fn print_submission(submission: &Submission) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(submission)?);
    Ok(())
}
