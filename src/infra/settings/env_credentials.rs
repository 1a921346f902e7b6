use crate::core::moderation::{CredentialProvider, SettingsError};
use async_trait::async_trait;

pub const API_KEY_VAR: &str = "CLEANTALK_API_KEY";

/// Reads the API key from an environment variable on every call.
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(API_KEY_VAR)
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn api_key(&self) -> Result<Option<String>, SettingsError> {
        Ok(std::env::var(&self.var).ok().filter(|key| !key.is_empty()))
    }
}
