//! # Error Classification and Translation
//!
//! The boundary of every dispatch turns a [`Failure`] into a [`RequestError`]
//! through [`ErrorDispatcher`], then asks the binding's [`ErrorHandler`] what
//! to do with it.
//!
//! **Classification order** (first match wins):
//!
//! | Kind                                  | Default status          |
//! |---------------------------------------|-------------------------|
//! | `FailedToFind`                        | 404 Not Found           |
//! | `RequestFailed`                       | 400, or the override    |
//! | `RequestCanceled`                     | 499 Client Closed       |
//! | `HookFailed`                          | 500                     |
//! | `Create/Update/CreateResult` failures | 500                     |
//! | `Unclassified`                        | rethrown                |
//!
//! **Logging**: every 500-class failure is logged with `tracing::error!`,
//! including its source chain. The response only ever carries a generic
//! message for those kinds.

use axum::http::StatusCode;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

use crate::errors::{Failure, SharedError};
use crate::request::AnyRequest;
use crate::response::{Response, ResponseError};

/// Non-standard "client closed request" status used for cancellations.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// The status reported for canceled requests.
#[must_use]
pub fn canceled_status() -> StatusCode {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::REQUEST_TIMEOUT)
}

/// Tag of a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FailedToFind,
    RequestFailed,
    RequestCanceled,
    HookFailed,
    CreateEntityFailed,
    UpdateEntityFailed,
    CreateResultFailed,
    Unclassified,
}

impl ErrorKind {
    /// Position in the classification order.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::FailedToFind => 0,
            Self::RequestFailed => 1,
            Self::RequestCanceled => 2,
            Self::HookFailed => 3,
            Self::CreateEntityFailed | Self::UpdateEntityFailed | Self::CreateResultFailed => 4,
            Self::Unclassified => 5,
        }
    }
}

/// Typed error object: the originating request plus its classified failure.
#[derive(Clone)]
pub struct RequestError {
    request: Arc<dyn AnyRequest>,
    failure: Failure,
    kind: ErrorKind,
}

impl RequestError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    #[must_use]
    pub fn request(&self) -> &dyn AnyRequest {
        self.request.as_ref()
    }

    #[must_use]
    pub fn request_type(&self) -> &'static str {
        self.request.request_name()
    }

    /// Reason text of the classified failure.
    #[must_use]
    pub fn reason(&self) -> String {
        self.failure.to_string()
    }

    /// Identity of the failing hook, for `HookFailed`.
    #[must_use]
    pub fn hook(&self) -> Option<&str> {
        match &self.failure {
            Failure::HookFailed { hook, .. } => Some(hook),
            _ => None,
        }
    }

    /// The wrapped error, when the failure carries one.
    #[must_use]
    pub fn inner(&self) -> Option<&SharedError> {
        match &self.failure {
            Failure::HookFailed { source, .. }
            | Failure::CreateEntityFailed { source, .. }
            | Failure::UpdateEntityFailed { source, .. }
            | Failure::CreateResultFailed { source, .. }
            | Failure::Unclassified(source) => Some(source),
            _ => None,
        }
    }

    /// Log internal details of the failure.
    ///
    /// Only 500-class kinds are logged at error level; request-level kinds are
    /// part of normal operation.
    pub fn log_internal(&self) {
        match &self.failure {
            Failure::HookFailed { hook, source } => {
                error!(request = self.request_type(), hook = %hook, error = %source, "Hook failed");
            }
            Failure::CreateEntityFailed { entity, source, .. } => {
                error!(request = self.request_type(), entity, error = %source, "Create failed");
            }
            Failure::UpdateEntityFailed { entity, source, .. } => {
                error!(request = self.request_type(), entity, error = %source, "Update failed");
            }
            Failure::CreateResultFailed {
                result_type,
                source,
                ..
            } => {
                error!(request = self.request_type(), result_type, error = %source, "Result conversion failed");
            }
            Failure::Unclassified(source) => {
                error!(request = self.request_type(), error = %source, "Unclassified failure");
            }
            _ => {}
        }
    }
}

impl PartialEq for RequestError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.request_type() == other.request_type()
            && self.reason() == other.reason()
    }
}

impl fmt::Debug for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestError")
            .field("request", &self.request_type())
            .field("kind", &self.kind)
            .field("failure", &self.failure)
            .finish()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} in {}: {}", self.kind, self.request_type(), self.failure)
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.failure)
    }
}

/// Builds typed error objects from raw failures.
pub struct ErrorDispatcher;

impl ErrorDispatcher {
    /// Reduce a failure to the single failure that gets classified.
    ///
    /// Aggregates are flattened first. The leaf whose kind comes earliest in
    /// the classification order wins, the first one on ties. When that kind is
    /// `RequestFailed`, every `RequestFailed` leaf is merged into one.
    #[must_use]
    pub fn classify(failure: &Failure) -> Failure {
        let Failure::Aggregate(_) = failure else {
            return failure.clone();
        };

        let mut leaves = Vec::new();
        flatten(failure, &mut leaves);

        let Some(winner) = leaves.iter().copied().min_by_key(|leaf| kind_of(leaf).rank()) else {
            return Failure::request_failed("One or more errors occurred");
        };
        if kind_of(winner) != ErrorKind::RequestFailed {
            return winner.clone();
        }

        let request_failures: Vec<&Failure> = leaves
            .into_iter()
            .filter(|leaf| matches!(leaf, Failure::RequestFailed { .. }))
            .collect();
        match request_failures.as_slice() {
            [single] => (*single).clone(),
            all => merge_request_failures(all),
        }
    }

    /// Classify `failure` raised while handling `request`.
    #[must_use]
    pub fn dispatch(failure: &Failure, request: Arc<dyn AnyRequest>) -> RequestError {
        let failure = Self::classify(failure);
        let kind = kind_of(&failure);
        RequestError {
            request,
            failure,
            kind,
        }
    }
}

fn flatten<'a>(failure: &'a Failure, leaves: &mut Vec<&'a Failure>) {
    match failure {
        Failure::Aggregate(inner) => {
            for nested in inner {
                flatten(nested, leaves);
            }
        }
        leaf => leaves.push(leaf),
    }
}

fn merge_request_failures(leaves: &[&Failure]) -> Failure {
    let mut reasons = Vec::with_capacity(leaves.len());
    let mut errors = Vec::new();
    let mut merged_status = None;

    for leaf in leaves {
        if let Failure::RequestFailed {
            reason,
            errors: leaf_errors,
            status,
        } = leaf
        {
            reasons.push(reason.as_str());
            if leaf_errors.is_empty() {
                errors.push(ResponseError::new(reason.clone()));
            } else {
                errors.extend(leaf_errors.iter().cloned());
            }
            merged_status = merged_status.or(*status);
        }
    }

    Failure::RequestFailed {
        reason: reasons.join("; "),
        errors,
        status: merged_status,
    }
}

fn kind_of(failure: &Failure) -> ErrorKind {
    match failure {
        Failure::FailedToFind { .. } => ErrorKind::FailedToFind,
        Failure::RequestFailed { .. } => ErrorKind::RequestFailed,
        Failure::RequestCanceled => ErrorKind::RequestCanceled,
        Failure::HookFailed { .. } => ErrorKind::HookFailed,
        Failure::CreateEntityFailed { .. } => ErrorKind::CreateEntityFailed,
        Failure::UpdateEntityFailed { .. } => ErrorKind::UpdateEntityFailed,
        Failure::CreateResultFailed { .. } => ErrorKind::CreateResultFailed,
        // `classify` never leaves an aggregate behind
        Failure::Aggregate(_) | Failure::Unclassified(_) => ErrorKind::Unclassified,
    }
}

/// What the boundary does with a classified error.
#[derive(Debug)]
pub enum ErrorDisposition {
    /// Return this envelope to the caller
    Respond(Response),
    /// Surface the error as a `DispatchError::Unhandled`
    Rethrow,
}

/// Pluggable translation of typed errors into responses.
///
/// Implementations that only add classifications can delegate the rest to
/// [`DefaultErrorHandler`].
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, error: &RequestError) -> ErrorDisposition;
}

/// The default translation table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler {
    convert_unclassified: bool,
}

impl DefaultErrorHandler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            convert_unclassified: false,
        }
    }

    /// Log unclassified failures and answer 500 instead of rethrowing.
    #[must_use]
    pub const fn convert_unclassified() -> Self {
        Self {
            convert_unclassified: true,
        }
    }

    /// Status for a classified error, `None` for rethrown failures.
    #[must_use]
    pub fn status_code(&self, error: &RequestError) -> Option<StatusCode> {
        match error.failure() {
            Failure::FailedToFind { .. } => Some(StatusCode::NOT_FOUND),
            Failure::RequestFailed { status, .. } => Some(status.unwrap_or(StatusCode::BAD_REQUEST)),
            Failure::RequestCanceled => Some(canceled_status()),
            Failure::HookFailed { .. }
            | Failure::CreateEntityFailed { .. }
            | Failure::UpdateEntityFailed { .. }
            | Failure::CreateResultFailed { .. } => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Failure::Aggregate(_) | Failure::Unclassified(_) => self
                .convert_unclassified
                .then_some(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// User-facing error entries. Internal details never appear here.
    #[must_use]
    pub fn user_errors(error: &RequestError) -> Vec<ResponseError> {
        match error.failure() {
            Failure::FailedToFind { resource, id } => {
                let message = match id {
                    Some(id) => format!("{resource} with ID '{id}' not found"),
                    None => format!("{resource} not found"),
                };
                vec![ResponseError::new(message)]
            }
            Failure::RequestFailed { reason, errors, .. } => {
                if errors.is_empty() {
                    vec![ResponseError::new(reason.clone())]
                } else {
                    errors.clone()
                }
            }
            Failure::RequestCanceled => vec![ResponseError::new("The request was canceled.")],
            Failure::HookFailed { .. } => vec![ResponseError::new(
                "An error occurred while processing the request",
            )],
            Failure::CreateEntityFailed { .. } => vec![ResponseError::new("Failed to create the entity")],
            Failure::UpdateEntityFailed { .. } => vec![ResponseError::new("Failed to update the entity")],
            Failure::CreateResultFailed { .. } => vec![ResponseError::new("Failed to create the result")],
            Failure::Aggregate(_) | Failure::Unclassified(_) => {
                vec![ResponseError::new("An internal error occurred")]
            }
        }
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(&self, error: &RequestError) -> ErrorDisposition {
        error.log_internal();

        match self.status_code(error) {
            Some(status) => {
                ErrorDisposition::Respond(Response::with_errors(Self::user_errors(error), status))
            }
            None => {
                warn!(request = error.request_type(), "Rethrowing unclassified failure");
                ErrorDisposition::Rethrow
            }
        }
    }
}
