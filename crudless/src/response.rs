//! # Response Envelope
//!
//! Every dispatch returns a [`Response`]: an ordered list of errors, an
//! optional result and a status annotation. `has_errors()` is derived from the
//! error list, never stored, so the two cannot disagree.
//!
//! Responses serialize as:
//!
//! ```json
//! { "hasErrors": false, "errors": [], "result": "Bar" }
//! ```
//!
//! and convert into an axum response carrying their status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use utoipa::ToSchema;

use crate::request::NoResult;
use crate::validation::ValidationError;

/// A single `(property, message)` error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    /// The property the error relates to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    /// User-facing error message
    pub error_message: String,
}

impl ResponseError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            property_name: None,
            error_message: message.into(),
        }
    }

    #[must_use]
    pub fn for_property(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_name: Some(property.into()),
            error_message: message.into(),
        }
    }
}

impl From<ValidationError> for ResponseError {
    fn from(error: ValidationError) -> Self {
        Self::for_property(error.field, error.message)
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property_name {
            Some(property) => write!(f, "{}: {}", property, self.error_message),
            None => write!(f, "{}", self.error_message),
        }
    }
}

/// Uniform result wrapper returned by every handler.
///
/// `result` is only meaningful when `has_errors()` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T = NoResult> {
    errors: Vec<ResponseError>,
    result: Option<T>,
    status: StatusCode,
}

impl Response<NoResult> {
    /// Successful response without a result value.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            errors: Vec::new(),
            result: None,
            status: StatusCode::OK,
        }
    }
}

impl<T> Response<T> {
    /// Successful response carrying `result`.
    #[must_use]
    pub const fn ok(result: T) -> Self {
        Self {
            errors: Vec::new(),
            result: Some(result),
            status: StatusCode::OK,
        }
    }

    /// Error response with the given entries and status.
    #[must_use]
    pub const fn with_errors(errors: Vec<ResponseError>, status: StatusCode) -> Self {
        Self {
            errors,
            result: None,
            status,
        }
    }

    /// Error response with a single message.
    #[must_use]
    pub fn error(message: impl Into<String>, status: StatusCode) -> Self {
        Self::with_errors(vec![ResponseError::new(message)], status)
    }

    /// Error response built from validator output.
    #[must_use]
    pub fn from_validation(errors: Vec<ValidationError>) -> Self {
        Self::with_errors(
            errors.into_iter().map(ResponseError::from).collect(),
            StatusCode::UNPROCESSABLE_ENTITY,
        )
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ResponseError] {
        &self.errors
    }

    #[must_use]
    pub const fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut T> {
        self.result.as_mut()
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Consume the envelope, yielding the result or the error entries.
    ///
    /// # Errors
    ///
    /// Returns the error list when the response carries errors.
    pub fn into_result(self) -> Result<Option<T>, Vec<ResponseError>> {
        if self.errors.is_empty() {
            Ok(self.result)
        } else {
            Err(self.errors)
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            errors: self.errors,
            result: self.result.map(f),
            status: self.status,
        }
    }

    /// Re-type an envelope, dropping any result.
    ///
    /// Used to carry error envelopes across result types.
    #[must_use]
    pub fn into_typed<U>(self) -> Response<U> {
        Response {
            errors: self.errors,
            result: None,
            status: self.status,
        }
    }
}

impl<T: Serialize> Serialize for Response<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 3)?;
        state.serialize_field("hasErrors", &self.has_errors())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("result", &self.result)?;
        state.end()
    }
}

impl<T: Serialize> IntoResponse for Response<T> {
    fn into_response(self) -> HttpResponse {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}
