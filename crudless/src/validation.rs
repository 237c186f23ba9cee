//! Validation Support
//!
//! Requests are validated by a [`RequestValidator`] registered for the request
//! type. The validator runs in the outermost decorator, before any transaction
//! is opened, and a non-empty error list short-circuits the dispatch.
//!
//! Simple requests can implement [`Validatable`] instead and register
//! [`ValidatableValidator`] for it.
//!
//! # Example
//!
//! ```rust,ignore
//! use crudless::validation::{Validatable, ValidationError, validators};
//!
//! pub struct CreateProduct {
//!     pub name: String,
//!     pub price: i32,
//! }
//!
//! impl Validatable for CreateProduct {
//!     fn validate(&self) -> Vec<ValidationError> {
//!         let mut errors = ValidationErrors::new();
//!         errors.check(validators::validate_length("name", &self.name, Some(3), None));
//!         errors.check(validators::validate_range("price", self.price, Some(1), None));
//!         errors.into_vec()
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;

use crate::errors::Failure;
use crate::request::Request;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the error from a single check, if any
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.errors.push(error);
        }
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validates a request before it reaches its handler.
///
/// An empty list means the request is valid. `Err` is reserved for faults in
/// the validator itself; rule violations belong in the list.
#[async_trait]
pub trait RequestValidator<R: Request>: Send + Sync {
    async fn validate(
        &self,
        request: &R,
        token: &CancellationToken,
    ) -> Result<Vec<ValidationError>, Failure>;
}

/// Trait for requests that can validate themselves
pub trait Validatable {
    /// Return every rule violation; an empty list means valid.
    fn validate(&self) -> Vec<ValidationError>;
}

/// Adapts a [`Validatable`] request into a [`RequestValidator`].
pub struct ValidatableValidator<R> {
    _phantom: PhantomData<fn() -> R>,
}

impl<R> ValidatableValidator<R> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<R> Default for ValidatableValidator<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Request + Validatable> RequestValidator<R> for ValidatableValidator<R> {
    async fn validate(
        &self,
        request: &R,
        _token: &CancellationToken,
    ) -> Result<Vec<ValidationError>, Failure> {
        Ok(Validatable::validate(request))
    }
}

/// Helper validators for common patterns
pub mod validators {
    use super::ValidationError;
    use std::fmt;

    /// Validate string length is within range
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the length falls outside the range.
    pub fn validate_length(
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.chars().count();

        if let Some(min_len) = min
            && len < min_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at least {min_len} characters"),
            ));
        }

        if let Some(max_len) = max
            && len > max_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at most {max_len} characters"),
            ));
        }

        Ok(())
    }

    /// Validate number is within range
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the value falls outside the range.
    pub fn validate_range<T: PartialOrd + fmt::Display>(
        field: &str,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), ValidationError> {
        if let Some(min_val) = min
            && value < min_val
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at least {min_val}"),
            ));
        }

        if let Some(max_val) = max
            && value > max_val
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at most {max_val}"),
            ));
        }

        Ok(())
    }

    /// Validate value is not empty
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for empty or whitespace-only values.
    pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "This field is required"));
        }
        Ok(())
    }
}
