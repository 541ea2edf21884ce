//! Request schema checks. Every violated rule is reported in one message.

use axum::extract::FromRequest;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::AppError;

/// JSON body extractor whose rejection is an `AppError`, so malformed bodies get
/// the same `{ success: false, error }` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Validates `value`, turning every failure into one combined `AppError::Validation`.
pub fn check<T: Validate>(value: &T) -> Result<(), AppError> {
    let messages = messages_for(value);
    if messages.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(messages.join("; ")))
    }
}

/// Flattened, deterministically ordered messages for every failing field.
pub fn messages_for<T: Validate>(value: &T) -> Vec<String> {
    match value.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => flatten(&errors),
    }
}

fn flatten(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter()
                .map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{field} is invalid"),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Parses a path identifier. A malformed id cannot name an existing record, so it is
/// reported as not found rather than as a validation failure.
pub fn path_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::not_found(what))
}

/// Custom validator: the value must parse as a UUID.
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("identifier"))
}

/// Field deserializers for request bodies. Text is trimmed, and `null` or wrong-typed
/// values become empty so the validation rules report them together with every other
/// violation instead of the extractor rejecting the body on the first bad field.
pub mod lenient {
    use serde::de::{DeserializeOwned, Deserializer, Error as _};
    use serde::Deserialize;
    use serde_json::Value;

    fn scalar_text(value: Value) -> String {
        match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Value::deserialize(deserializer).map(scalar_text)
    }

    /// `null` counts as absent; anything else is trimmed text.
    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Null => None,
            other => Some(scalar_text(other)),
        })
    }

    /// Non-array values read as an empty list; non-object items as default entries.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(_) => serde_json::from_value(item).map_err(D::Error::custom),
                    _ => Ok(T::default()),
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }
}
