use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::todo::TodoInput;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 40;

/// Raw request body for creating or updating a to-do.
///
/// Fields are kept as untyped JSON so a wrongly typed field is reported as a
/// validation failure instead of a body parse failure.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TodoPayload {
    /// Title of the to-do, 1 to 40 characters
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Option<Value>,
    /// Optional description, defaults to an empty string
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Option<Value>,
}

/// Reason a payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Valid title is required (max 40 chars)")]
    MissingTitle,
    #[error("Valid title is required (max 40 chars)")]
    TitleTooLong,
    #[error("Description must be a string")]
    DescriptionNotString,
}

impl Rejection {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingTitle => "missing_title",
            Rejection::TitleTooLong => "title_too_long",
            Rejection::DescriptionNotString => "description_not_string",
        }
    }
}

/// Checks a payload and normalizes it into a [`TodoInput`].
///
/// A missing or `null` description becomes the empty string.
pub fn validate(payload: &TodoPayload) -> Result<TodoInput, Rejection> {
    let title = match &payload.title {
        Some(Value::String(title)) if !title.is_empty() => title,
        _ => return Err(Rejection::MissingTitle),
    };
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(Rejection::TitleTooLong);
    }

    let description = match &payload.description {
        None => String::new(),
        Some(Value::String(description)) => description.clone(),
        Some(_) => return Err(Rejection::DescriptionNotString),
    };

    Ok(TodoInput::new(title.clone(), description))
}
