// Moderation domain models - data structures for the partial-entry spam check.
//
// These are pure domain types with no HTTP or database dependencies.
// The infra layer converts them to wire and storage formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Author label attached to every audit note this system writes.
pub const AUDIT_AUTHOR: &str = "CleanTalk";

/// Default CleanTalk moderation endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://moderate.cleantalk.org/api2.0";

/// Default key under which operator settings are stored.
pub const DEFAULT_SETTINGS_KEY: &str = "cleantalk_settings";

// ============================================================================
// SUBMISSIONS
// ============================================================================

/// Opaque identifier assigned to a submission by the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of one input slot in a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a submission. Only `Active -> Spam` is ever
/// requested by this system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Active,
    Spam,
    Trash,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Active => write!(f, "active"),
            SubmissionStatus::Spam => write!(f, "spam"),
            SubmissionStatus::Trash => write!(f, "trash"),
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubmissionStatus::Active),
            "spam" => Ok(SubmissionStatus::Spam),
            "trash" => Ok(SubmissionStatus::Trash),
            other => Err(format!("unknown submission status '{}'", other)),
        }
    }
}

/// A single record collected by a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    #[serde(default = "default_status")]
    pub status: SubmissionStatus,
    /// Submitted values keyed by field identifier.
    #[serde(default)]
    pub fields: BTreeMap<FieldId, String>,
}

fn default_status() -> SubmissionStatus {
    SubmissionStatus::Active
}

impl Submission {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SubmissionId(id.into()),
            status: SubmissionStatus::Active,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style helper for setting a field value.
    #[cfg(test)]
    pub fn with_field(mut self, field_id: u32, value: impl Into<String>) -> Self {
        self.fields.insert(FieldId(field_id), value.into());
        self
    }

    /// Value submitted for `field_id`. Empty strings count as absent.
    pub fn field_value(&self, field_id: FieldId) -> Option<&str> {
        self.fields
            .get(&field_id)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_spam(&self) -> bool {
        self.status == SubmissionStatus::Spam
    }
}

// ============================================================================
// FORMS
// ============================================================================

/// Declared input type of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Email,
    Text,
    Textarea,
    Name,
    Phone,
    Hidden,
    /// Any host-specific type we don't care about.
    #[serde(other)]
    Other,
}

/// Metadata describing one input slot in a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human-assigned label. Hosts commonly call this the admin label.
    #[serde(default, alias = "adminLabel")]
    pub label: Option<String>,
}

impl FieldDescriptor {
    #[cfg(test)]
    pub fn new(id: u32, field_type: FieldType) -> Self {
        Self {
            id: FieldId(id),
            field_type,
            label: None,
        }
    }

    #[cfg(test)]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered field declarations of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl FormDefinition {
    #[cfg(test)]
    pub fn new(id: u64, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            id,
            title: None,
            fields,
        }
    }
}

// ============================================================================
// VERDICTS
// ============================================================================

/// Outbound `check_message` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckMessageRequest {
    pub method_name: &'static str,
    pub auth_key: String,
    pub message: String,
    pub sender_email: String,
    pub sender_ip: String,
}

impl CheckMessageRequest {
    pub fn new(auth_key: String, sender_email: &str, sender_ip: String) -> Self {
        Self {
            method_name: "check_message",
            auth_key,
            message: String::new(),
            sender_email: sender_email.to_string(),
            sender_ip,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Normalized result of asking the scoring service about one email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_spam: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The request body that was (or would have been) sent.
    pub payload: Value,
}

impl Verdict {
    /// No credential: the check is skipped and the submission passes.
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self {
            is_spam: false,
            api_response: None,
            error: Some(reason.into()),
            payload: Value::Object(Default::default()),
        }
    }

    /// The remote call failed; fail open.
    pub fn transport_failure(reason: impl Into<String>, payload: Value) -> Self {
        Self {
            is_spam: false,
            api_response: None,
            error: Some(reason.into()),
            payload,
        }
    }

    /// A parsed response. Spam iff `allow` is the integer 0.
    pub fn from_response(response: Value, payload: Value) -> Self {
        let is_spam = response.get("allow").and_then(Value::as_i64) == Some(0);
        Self {
            is_spam,
            api_response: Some(response),
            error: None,
            payload,
        }
    }
}

// ============================================================================
// AUDIT
// ============================================================================

/// Append-only, system-authored annotation on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditNote {
    pub submission_id: SubmissionId,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl AuditNote {
    pub fn system(submission_id: SubmissionId, body: String) -> Self {
        Self {
            submission_id,
            author: AUDIT_AUTHOR.to_string(),
            body,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

/// How many qualifying email fields are checked per submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPolicy {
    /// Check every qualifying field; one audit note each.
    #[default]
    Exhaustive,
    /// Stop after the first spam verdict.
    FirstMatch,
}

impl FromStr for ScanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exhaustive" => Ok(ScanPolicy::Exhaustive),
            "first_match" | "first-match" => Ok(ScanPolicy::FirstMatch),
            other => Err(format!("unknown scan policy '{}'", other)),
        }
    }
}

/// What a response without an `allow` field means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingAllowPolicy {
    /// Silently not spam.
    #[default]
    TreatAsAllowed,
    /// Not spam, but the verdict carries an error.
    TreatAsError,
}

impl FromStr for MissingAllowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" | "allowed" => Ok(MissingAllowPolicy::TreatAsAllowed),
            "error" => Ok(MissingAllowPolicy::TreatAsError),
            other => Err(format!("unknown missing-allow policy '{}'", other)),
        }
    }
}

/// Runtime configuration for the spam check.
#[derive(Debug, Clone)]
pub struct SpamCheckConfig {
    pub scan_policy: ScanPolicy,
    pub missing_allow: MissingAllowPolicy,
    /// Scoring endpoint URL
    pub endpoint: String,
    /// `None` keeps the HTTP client's default
    pub request_timeout: Option<Duration>,
    /// Key of the operator settings entry holding `apikey`
    pub settings_key: String,
}

impl Default for SpamCheckConfig {
    fn default() -> Self {
        Self {
            scan_policy: ScanPolicy::default(),
            missing_allow: MissingAllowPolicy::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: None,
            settings_key: DEFAULT_SETTINGS_KEY.to_string(),
        }
    }
}
