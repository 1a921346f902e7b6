// Runtime configuration from environment variables (after `.env` is loaded).
//
// Bad values never stop the check from running: they are logged and the
// default is used instead.

use crate::core::moderation::{MissingAllowPolicy, ScanPolicy, SpamCheckConfig};
use std::str::FromStr;
use std::time::Duration;

pub const ENDPOINT_VAR: &str = "CLEANTALK_ENDPOINT";
pub const TIMEOUT_VAR: &str = "CLEANTALK_TIMEOUT_SECS";
pub const SETTINGS_KEY_VAR: &str = "CLEANTALK_SETTINGS_KEY";
pub const SCAN_POLICY_VAR: &str = "SPAM_CHECK_SCAN_POLICY";
pub const MISSING_ALLOW_VAR: &str = "SPAM_CHECK_MISSING_ALLOW";

/// Build the config from the process environment.
pub fn load_spam_check_config() -> SpamCheckConfig {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Build the config from any variable lookup.
pub fn config_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SpamCheckConfig {
    let mut config = SpamCheckConfig::default();

    if let Some(endpoint) = lookup(ENDPOINT_VAR).filter(|v| !v.trim().is_empty()) {
        config.endpoint = endpoint;
    }
    if let Some(key) = lookup(SETTINGS_KEY_VAR).filter(|v| !v.trim().is_empty()) {
        config.settings_key = key;
    }

    config.request_timeout = parse_or_warn::<u64>(&lookup, TIMEOUT_VAR)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    if let Some(policy) = parse_or_warn::<ScanPolicy>(&lookup, SCAN_POLICY_VAR) {
        config.scan_policy = policy;
    }
    if let Some(policy) = parse_or_warn::<MissingAllowPolicy>(&lookup, MISSING_ALLOW_VAR) {
        config.missing_allow = policy;
    }

    config
}

fn parse_or_warn<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring invalid {}={:?}: {}", name, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::DEFAULT_ENDPOINT;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from_lookup(lookup_from(&[]));

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.settings_key, "cleantalk_settings");
        assert_eq!(config.scan_policy, ScanPolicy::Exhaustive);
        assert_eq!(config.missing_allow, MissingAllowPolicy::TreatAsAllowed);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from_lookup(lookup_from(&[
            (ENDPOINT_VAR, "http://localhost:8080/api2.0"),
            (TIMEOUT_VAR, "15"),
            (SCAN_POLICY_VAR, "first_match"),
            (MISSING_ALLOW_VAR, "error"),
            (SETTINGS_KEY_VAR, "ct_options"),
        ]));

        assert_eq!(config.endpoint, "http://localhost:8080/api2.0");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.scan_policy, ScanPolicy::FirstMatch);
        assert_eq!(config.missing_allow, MissingAllowPolicy::TreatAsError);
        assert_eq!(config.settings_key, "ct_options");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from_lookup(lookup_from(&[
            (TIMEOUT_VAR, "soon"),
            (SCAN_POLICY_VAR, "whenever"),
        ]));

        assert!(config.request_timeout.is_none());
        assert_eq!(config.scan_policy, ScanPolicy::Exhaustive);
    }
}
