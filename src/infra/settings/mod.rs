pub mod env_config;
pub mod env_credentials;
pub mod json_options_store;

pub use env_config::load_spam_check_config;
pub use env_credentials::EnvCredentialProvider;
pub use json_options_store::JsonOptionsCredentialProvider;
