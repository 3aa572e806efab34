//! Field validation
//!
//! Mutations run their inputs through these helpers before touching state.

/// A field failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field is empty after trimming
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),
}

/// Trim and require a non-empty value
///
/// # Errors
/// Returns [`ValidationError::EmptyField`] when nothing is left after trimming.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional value, mapping blank to `None`
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
