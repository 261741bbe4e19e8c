//! Request field validation.

use std::collections::BTreeMap;

use crate::error::AppError;

/// Collects per-field errors so a single response reports all of them.
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a non-blank value, reporting `"<field> is required."`.
    pub fn required(&mut self, field: &str, value: Option<String>) -> String {
        self.required_with(field, value, format!("{} is required.", field))
    }

    /// Requires a non-blank value, reporting `message` when it is missing.
    pub fn required_with(
        &mut self,
        field: &str,
        value: Option<String>,
        message: impl Into<String>,
    ) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.errors.insert(field.to_string(), message.into());
                String::new()
            }
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
