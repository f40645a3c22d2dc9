//! Request validation for form payloads
//!
//! JSON payloads are checked in the service layer; multipart forms are
//! assembled here field by field, so their checks live next to the handlers.

use crate::error::ApiError;

/// Trait for validating request payloads
pub trait RequestValidation {
    /// Returns a validation [`ApiError`] describing the first failed check
    fn validate(&self) -> Result<(), ApiError>;
}

/// Macro for validating fields with custom predicates
///
/// ```ignore
/// validate_field!(self.provider_name, !self.provider_name.is_empty(), "Provider name is required");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Macro for validating required fields (non-empty strings)
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Macro for validating string length in characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}
