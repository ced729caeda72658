//! Schema-driven validation of untrusted JSON into typed values.
//!
//! [`validate`] never panics and never fails fast: the schema is checked
//! first, collecting every violation, and only a value with no violations is
//! deserialized into `T`. [`validate_with_fallback`] is the form used by the
//! resource clients; it logs the detailed errors and hands back a fixed
//! user-facing pair instead.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::messages;
use crate::schema::{Schema, ROOT_PATH};

/// A type whose JSON shape is described by a [`Schema`].
pub trait Validated: DeserializeOwned {
    fn schema() -> Schema;
}

impl<T: Validated> Validated for Vec<T> {
    fn schema() -> Schema {
        Schema::array(T::schema())
    }
}

/// Outcome of validating a payload. Exactly one of data or errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    Success(T),
    Failure(Vec<String>),
}

impl<T> ValidationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ValidationResult::Success(data) => Some(data),
            ValidationResult::Failure(_) => None,
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ValidationResult::Success(_) => &[],
            ValidationResult::Failure(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<T, Vec<String>> {
        match self {
            ValidationResult::Success(data) => Ok(data),
            ValidationResult::Failure(errors) => Err(errors),
        }
    }
}

/// The fixed pair returned when validation fails; schema internals stay out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFallback {
    pub error_message: String,
    pub raw_error_message: String,
}

impl Default for ValidationFallback {
    fn default() -> Self {
        Self {
            error_message: messages::VALIDATION_ERROR.to_string(),
            raw_error_message: messages::VALIDATION_RAW_ERROR.to_string(),
        }
    }
}

/// Check `input` against `schema` and, when it conforms, deserialize it.
pub fn validate<T: DeserializeOwned>(schema: &Schema, input: &Value) -> ValidationResult<T> {
    let errors = schema.check(input);
    if !errors.is_empty() {
        return ValidationResult::Failure(errors);
    }
    match T::deserialize(input) {
        Ok(data) => ValidationResult::Success(data),
        // Schema and type disagree; surface it the same way as a violation.
        Err(e) => ValidationResult::Failure(vec![format!("{ROOT_PATH}: {e}")]),
    }
}

/// Validate against `T`'s own schema.
pub fn validate_as<T: Validated>(input: &Value) -> ValidationResult<T> {
    validate(&T::schema(), input)
}

/// Like [`validate`], but failures collapse into a [`ValidationFallback`] and
/// the per-field errors go to the log only.
pub fn validate_with_fallback<T: DeserializeOwned>(
    schema: &Schema,
    input: &Value,
    type_name: &str,
) -> Result<T, ValidationFallback> {
    validate(schema, input).into_result().map_err(|errors| {
        debug!(type_name, ?errors, "invalid {type_name} data");
        ValidationFallback::default()
    })
}

/// Build the validator closure a resource client hands to the normalizer.
pub fn validator<T: Validated>(
    type_name: &'static str,
) -> impl FnOnce(&Value) -> Result<T, ValidationFallback> {
    move |input| validate_with_fallback(&T::schema(), input, type_name)
}
