// Field scanner - picks the email values out of a submission.

use super::moderation_models::{FieldDescriptor, FieldId, FieldType, FormDefinition, Submission};

/// Whether a field is expected to hold an email address.
///
/// A field qualifies by declared type, or by a label that is exactly
/// "email" ignoring case. Fields without a label only qualify by type.
pub fn is_email_field(field: &FieldDescriptor) -> bool {
    field.field_type == FieldType::Email
        || field
            .label
            .as_deref()
            .is_some_and(|label| label.to_lowercase() == "email")
}

/// Yields `(field_id, email)` for every qualifying field with a non-empty
/// value, in declaration order.
pub fn scan_email_fields<'a>(
    submission: &'a Submission,
    form: &'a FormDefinition,
) -> impl Iterator<Item = (FieldId, &'a str)> + 'a {
    form.fields
        .iter()
        .filter(|field| is_email_field(field))
        .filter_map(move |field| {
            submission
                .field_value(field.id)
                .map(|email| (field.id, email))
        })
}
