//! # Failures and Framework Errors
//!
//! Two families of errors live here and they must not be confused:
//!
//! - [`Failure`] is the tagged result handlers and decorators return. It is
//!   request-level: the boundary classifies it and usually turns it into a
//!   [`Response`](crate::Response) with errors.
//! - [`DispatchError`], [`ResolveError`] and [`RegistrationError`] are
//!   framework-level. They mean the mediator is misconfigured (no handler, a
//!   factory that cannot build its service) or that a failure was left
//!   unhandled on purpose. They are returned to the caller as `Err`.
//!
//! Internal details carried by a failure (database errors, hook errors) are
//! logged by the error handler and never copied into user-facing messages.

use axum::http::StatusCode;
use sea_orm::DbErr;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error_handler::RequestError;
use crate::handler::HandlerShape;
use crate::response::ResponseError;

/// Owned, type-erased error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared, type-erased error. Failures are cloned during classification.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The offending item attached to entity failures.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// Request-level failure raised anywhere in a handler chain.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure {
    /// Explicit business-rule failure
    #[error("{reason}")]
    RequestFailed {
        reason: String,
        errors: Vec<ResponseError>,
        status: Option<StatusCode>,
    },

    /// An entity lookup found nothing
    #[error("{resource} not found")]
    FailedToFind {
        resource: String,
        id: Option<String>,
    },

    /// Cooperative cancellation was observed
    #[error("the request was canceled")]
    RequestCanceled,

    /// A registered hook raised an error
    #[error("hook `{hook}` failed: {source}")]
    HookFailed {
        hook: String,
        #[source]
        source: SharedError,
    },

    #[error("failed to create {entity}: {source}")]
    CreateEntityFailed {
        entity: &'static str,
        item: Option<Payload>,
        #[source]
        source: SharedError,
    },

    #[error("failed to update {entity}: {source}")]
    UpdateEntityFailed {
        entity: &'static str,
        item: Option<Payload>,
        #[source]
        source: SharedError,
    },

    #[error("failed to create result {result_type}: {source}")]
    CreateResultFailed {
        result_type: &'static str,
        item: Option<Payload>,
        #[source]
        source: SharedError,
    },

    /// Several failures raised together, e.g. by a batch operation
    #[error("{} failures", .0.len())]
    Aggregate(Vec<Failure>),

    /// Anything the taxonomy does not name
    #[error(transparent)]
    Unclassified(SharedError),
}

impl Failure {
    /// Business-rule failure with a single message.
    pub fn request_failed(reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            reason: reason.into(),
            errors: Vec::new(),
            status: None,
        }
    }

    /// Business-rule failure with property-level errors.
    pub fn request_failed_with(reason: impl Into<String>, errors: Vec<ResponseError>) -> Self {
        Self::RequestFailed {
            reason: reason.into(),
            errors,
            status: None,
        }
    }

    /// Override the status of a `RequestFailed`; other kinds are unchanged.
    #[must_use]
    pub fn with_status(mut self, code: StatusCode) -> Self {
        if let Self::RequestFailed { status, .. } = &mut self {
            *status = Some(code);
        }
        self
    }

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::FailedToFind {
            resource: resource.into(),
            id,
        }
    }

    pub fn hook_failed(hook: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::HookFailed {
            hook: hook.into(),
            source: Arc::from(source.into()),
        }
    }

    pub fn create_entity_failed(
        entity: &'static str,
        item: Option<Payload>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::CreateEntityFailed {
            entity,
            item,
            source: Arc::from(source.into()),
        }
    }

    pub fn update_entity_failed(
        entity: &'static str,
        item: Option<Payload>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::UpdateEntityFailed {
            entity,
            item,
            source: Arc::from(source.into()),
        }
    }

    pub fn create_result_failed<T>(item: Option<Payload>, source: impl Into<BoxError>) -> Self {
        Self::CreateResultFailed {
            result_type: type_name::<T>(),
            item,
            source: Arc::from(source.into()),
        }
    }

    pub fn unclassified(source: impl Into<BoxError>) -> Self {
        Self::Unclassified(Arc::from(source.into()))
    }

    /// Recover a `Failure` that travelled through a `BoxError`.
    ///
    /// Errors that are not failures become `Unclassified`.
    #[must_use]
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(failure) => *failure,
            Err(other) => Self::Unclassified(Arc::from(other)),
        }
    }

    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::RequestCanceled)
    }
}

/// Convert Sea-ORM errors into failures
///
/// **Conversion Rules:**
/// - `DbErr::RecordNotFound` → `FailedToFind`
/// - All other `DbErr` variants → `Unclassified`, which the default error
///   handler rethrows
impl From<DbErr> for Failure {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                // Try to extract resource name from error message
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::FailedToFind {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::Unclassified(Arc::new(err)),
        }
    }
}

/// Errors raised while building services out of a scope.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("service not registered: {service}")]
    NotRegistered { service: &'static str },

    #[error("factory for {service} failed: {source}")]
    Factory {
        service: &'static str,
        #[source]
        source: SharedError,
    },

    #[error("service {service} was stored with a different type")]
    TypeMismatch { service: &'static str },
}

impl ResolveError {
    /// Wrap an error raised by the factory of `T`.
    pub fn factory<T: ?Sized>(source: impl Into<BoxError>) -> Self {
        Self::Factory {
            service: type_name::<T>(),
            source: Arc::from(source.into()),
        }
    }
}

/// Errors raised while assembling the mediator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistrationError {
    #[error("more than one {shape} handler registered for {request}")]
    DuplicateHandler {
        request: &'static str,
        shape: HandlerShape,
    },

    #[error("service {service} registered more than once")]
    DuplicateService { service: &'static str },
}

/// Framework-level dispatch errors, distinct from request-level failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for request {request}")]
    HandlerNotRegistered { request: &'static str },

    #[error("failed to build the handler chain for {request}: {source}")]
    Resolve {
        request: &'static str,
        #[source]
        source: ResolveError,
    },

    #[error("cached binding for {request} has an unexpected type")]
    BindingMismatch { request: &'static str },

    #[error("unhandled failure while processing {}", .0.request_type())]
    Unhandled(#[source] Box<RequestError>),
}

impl DispatchError {
    /// The unhandled request error, if this is a rethrown failure.
    #[must_use]
    pub fn unhandled(&self) -> Option<&RequestError> {
        match self {
            Self::Unhandled(error) => Some(error),
            _ => None,
        }
    }
}
