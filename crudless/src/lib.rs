//! # Crudless
//!
//! An in-process request mediator. Requests are plain typed values; the
//! [`Mediator`] finds the handler registered for a request's type, wraps it in
//! the decorators its policy calls for, and returns a [`Response`] envelope.
//!
//! | Layer (outermost first) | Applied when                                             |
//! |-------------------------|----------------------------------------------------------|
//! | Validation              | the request is marked for validation, or validation is on by default |
//! | Transaction             | an entity context exists and the request may mutate state |
//! | Universal hooks         | a hook profile targets the request (non-CRUD handlers)   |
//! | Core handler            | always                                                   |
//!
//! Failures raised anywhere in the chain are classified by the
//! [`ErrorDispatcher`] and turned into error envelopes by the request's
//! [`ErrorHandler`]. Missing handlers and unresolvable dependencies surface
//! as [`DispatchError`]s instead.
//!
//! ```rust,ignore
//! use crudless::{Mediator, Request, Response};
//!
//! #[derive(Request)]
//! #[crudless(result = String)]
//! struct Echo(String);
//!
//! let mediator = Mediator::builder()
//!     .handler::<Echo, _>(|_| Ok(EchoHandler))
//!     .build()?;
//! let response = mediator.handle(Echo("Bar".into()), &CancellationToken::new()).await?;
//! ```

extern crate self as crudless;

pub mod background;
pub mod config;
pub mod crud;
pub mod decorators;
pub mod error_handler;
pub mod errors;
pub mod handler;
pub mod hooks;
pub mod mediator;
pub mod provider;
pub mod registry;
pub mod request;
pub mod response;
pub mod rules;
pub mod transaction;
pub mod validation;

#[cfg(feature = "derive")]
pub use crudless_derive::{PolicyBase, Request};

pub use background::{BackgroundError, BackgroundJob, BackgroundMediator};
pub use config::{CrudlessBuilder, CrudlessOptions, RequestProfile};
pub use crud::{CrudEntity, MergeIntoActiveModel, SeaOrmContext};
pub use error_handler::{
    DefaultErrorHandler, ErrorDispatcher, ErrorDisposition, ErrorHandler, ErrorKind, RequestError,
};
pub use errors::{
    BoxError, DispatchError, Failure, Payload, RegistrationError, ResolveError,
};
pub use handler::{CommandHandler, HandlerShape, RequestHandler};
pub use hooks::{HookProfile, RequestHook, ResultHook, request_hook, result_hook};
pub use mediator::{DynamicRequest, Mediator};
pub use provider::{Scope, ServiceCollection, ServiceLifetime, ServiceProvider};
pub use request::{
    AnyRequest, CrudOperation, EffectivePolicy, NoResult, PolicyBase, Request, RequestPolicy,
};
pub use response::{Response, ResponseError};
pub use transaction::{EntityContext, JoinedTransaction, Transaction};
pub use validation::{
    RequestValidator, Validatable, ValidatableValidator, ValidationError, ValidationErrors,
};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
