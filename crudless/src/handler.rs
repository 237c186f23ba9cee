//! Handler contracts.
//!
//! Requests that produce a value are handled by a [`RequestHandler`]. Requests
//! declared with `type Result = NoResult` may instead register a
//! [`CommandHandler`], which is the preferred shape for them; the registry
//! falls back to a `RequestHandler` registration when no command handler
//! exists.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::Failure;
use crate::request::{NoResult, Request};
use crate::response::Response;

/// The two handler contracts a request type can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerShape {
    /// `CommandHandler<R>`, for requests without a result
    NoResult,
    /// `RequestHandler<R>`
    WithResult,
}

impl fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResult => f.write_str("no-result"),
            Self::WithResult => f.write_str("with-result"),
        }
    }
}

/// Performs the core operation of a request.
///
/// Return `Ok` with an error envelope for expected outcomes and `Err` for
/// failures the boundary should classify.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: &R,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, Failure>;
}

/// Handler for requests that only succeed or fail.
#[async_trait]
pub trait CommandHandler<R: Request<Result = NoResult>>: Send + Sync {
    async fn handle(&self, request: &R, token: &CancellationToken) -> Result<Response, Failure>;
}

/// Presents a command handler through the `RequestHandler` contract.
pub(crate) struct CommandAdapter<R: Request<Result = NoResult>> {
    inner: Arc<dyn CommandHandler<R>>,
}

impl<R: Request<Result = NoResult>> CommandAdapter<R> {
    pub(crate) fn new(inner: Arc<dyn CommandHandler<R>>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Request<Result = NoResult>> RequestHandler<R> for CommandAdapter<R> {
    async fn handle(&self, request: &R, token: &CancellationToken) -> Result<Response, Failure> {
        self.inner.handle(request, token).await
    }
}
