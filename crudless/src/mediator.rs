//! # Mediator
//!
//! The single dispatch entry point. [`Mediator::handle`] takes any
//! [`Request`] and a cancellation token and returns the handler chain's
//! [`Response`] envelope.
//!
//! **Dispatch steps:**
//! 1. Fetch the request type's binding from the registry (cached after the
//!    first call). A missing handler is a [`DispatchError`], never a response.
//! 2. Report an already-canceled token as a canceled response without
//!    running anything.
//! 3. Build the decorated chain from the dispatch scope: a fresh scope per
//!    call when request scoping is on, otherwise the shared ambient scope.
//! 4. Run the chain. Failures are classified and translated by the binding's
//!    error handler; rethrown failures come back as `DispatchError::Unhandled`.

use async_trait::async_trait;
use std::any::{Any, type_name};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{CrudlessBuilder, CrudlessOptions};
use crate::errors::{DispatchError, Failure};
use crate::provider::{Scope, ServiceProvider};
use crate::registry::HandlerRegistry;
use crate::request::{AnyRequest, Request};
use crate::response::Response;

struct MediatorInner {
    registry: HandlerRegistry,
    provider: ServiceProvider,
    ambient: Scope,
    options: CrudlessOptions,
}

/// Dispatches requests to their decorated handlers. Cheap to clone.
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<MediatorInner>,
}

impl Mediator {
    #[must_use]
    pub fn builder() -> CrudlessBuilder {
        CrudlessBuilder::new()
    }

    pub(crate) fn new(
        registry: HandlerRegistry,
        provider: ServiceProvider,
        options: CrudlessOptions,
    ) -> Self {
        let ambient = provider.create_scope();
        Self {
            inner: Arc::new(MediatorInner {
                registry,
                provider,
                ambient,
                options,
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn provider(&self) -> &ServiceProvider {
        &self.inner.provider
    }

    #[must_use]
    pub fn options(&self) -> &CrudlessOptions {
        &self.inner.options
    }

    /// Start a scope that several dispatches can share explicitly.
    #[must_use]
    pub fn create_scope(&self) -> Scope {
        self.inner.provider.create_scope()
    }

    /// Dispatch `request`.
    ///
    /// # Errors
    ///
    /// Framework-level errors only: no handler registered, a dependency that
    /// cannot be resolved, or a failure the error handler chose to rethrow.
    pub async fn handle<R: Request>(
        &self,
        request: R,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, DispatchError> {
        if self.inner.options.use_request_scoping {
            let scope = self.create_scope();
            self.handle_in_scope(request, &scope, token).await
        } else {
            self.handle_in_scope(request, &self.inner.ambient, token).await
        }
    }

    /// Dispatch `request` against a caller-owned scope.
    ///
    /// # Errors
    ///
    /// See [`Mediator::handle`].
    pub async fn handle_in_scope<R: Request>(
        &self,
        request: R,
        scope: &Scope,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, DispatchError> {
        let binding = self.inner.registry.binding::<R>()?;
        let request = Arc::new(request);

        if token.is_cancelled() {
            debug!(request = type_name::<R>(), "Token canceled before dispatch");
            return binding.translate(&Failure::RequestCanceled, request);
        }

        let handler = binding
            .build_chain(scope)
            .map_err(|source| DispatchError::Resolve {
                request: type_name::<R>(),
                source,
            })?;

        match handler.handle(&request, token).await {
            Ok(response) => Ok(response),
            Err(failure) => binding.translate(&failure, request as Arc<dyn AnyRequest>),
        }
    }

    /// Dispatch a request whose type is not known statically.
    ///
    /// # Errors
    ///
    /// See [`Mediator::handle`].
    pub async fn handle_dyn(
        &self,
        request: Box<dyn DynamicRequest>,
        token: &CancellationToken,
    ) -> Result<Response<Box<dyn Any + Send>>, DispatchError> {
        request.dispatch(self, token).await
    }
}

/// A boxed request with its result type erased.
#[async_trait]
pub trait DynamicRequest: Send + Sync {
    async fn dispatch(
        self: Box<Self>,
        mediator: &Mediator,
        token: &CancellationToken,
    ) -> Result<Response<Box<dyn Any + Send>>, DispatchError>;
}

#[async_trait]
impl<R: Request> DynamicRequest for R {
    async fn dispatch(
        self: Box<Self>,
        mediator: &Mediator,
        token: &CancellationToken,
    ) -> Result<Response<Box<dyn Any + Send>>, DispatchError> {
        let response = mediator.handle(*self, token).await?;
        Ok(response.map(|result| Box::new(result) as Box<dyn Any + Send>))
    }
}
