// Operator options stored as a JSON file:
//
//   { "cleantalk_settings": { "apikey": "..." }, "other_plugin": { ... } }
//
// The file is re-read on every lookup so a rotated key is picked up on the
// next check without restarting anything.

use crate::core::moderation::{CredentialProvider, SettingsError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

pub struct JsonOptionsCredentialProvider {
    path: PathBuf,
    settings_key: String,
}

impl JsonOptionsCredentialProvider {
    pub fn new(path: impl Into<PathBuf>, settings_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            settings_key: settings_key.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for JsonOptionsCredentialProvider {
    async fn api_key(&self) -> Result<Option<String>, SettingsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let options: Value = serde_json::from_str(&raw)?;
        let key = options
            .get(&self.settings_key)
            .and_then(|settings| settings.get("apikey"))
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn options_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reads_apikey_under_settings_key() {
        let file =
            options_file(r#"{"cleantalk_settings": {"apikey": "abc123", "spam_firewall": 1}}"#);
        let provider = JsonOptionsCredentialProvider::new(file.path(), "cleantalk_settings");

        assert_eq!(provider.api_key().await.unwrap(), Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn test_missing_pieces_mean_unconfigured() {
        let provider =
            JsonOptionsCredentialProvider::new("/nonexistent/options.json", "cleantalk_settings");
        assert_eq!(provider.api_key().await.unwrap(), None);

        let file = options_file(r#"{"other": {"apikey": "x"}}"#);
        let provider = JsonOptionsCredentialProvider::new(file.path(), "cleantalk_settings");
        assert_eq!(provider.api_key().await.unwrap(), None);

        let file = options_file(r#"{"cleantalk_settings": {"apikey": ""}}"#);
        let provider = JsonOptionsCredentialProvider::new(file.path(), "cleantalk_settings");
        assert_eq!(provider.api_key().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let file = options_file("{cleantalk_settings:");
        let provider = JsonOptionsCredentialProvider::new(file.path(), "cleantalk_settings");

        assert!(matches!(provider.api_key().await, Err(SettingsError::Parse(_))));
    }

    #[tokio::test]
    async fn test_rotated_key_is_picked_up() {
        let file = options_file(r#"{"cleantalk_settings": {"apikey": "old"}}"#);
        let provider = JsonOptionsCredentialProvider::new(file.path(), "cleantalk_settings");
        assert_eq!(provider.api_key().await.unwrap().as_deref(), Some("old"));

        std::fs::write(file.path(), r#"{"cleantalk_settings": {"apikey": "new"}}"#).unwrap();
        assert_eq!(provider.api_key().await.unwrap().as_deref(), Some("new"));
    }
}
