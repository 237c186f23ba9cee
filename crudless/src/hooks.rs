//! # Universal Hooks
//!
//! Hooks are pre/post-processing steps attached to request types independently
//! of their handlers. A [`HookProfile`] targets either one concrete request
//! type or every request inheriting a [`PolicyBase`].
//!
//! - **Request hooks** run before the handler and see the request.
//! - **Result hooks** run after a successful handler and may mutate the result.
//!
//! Hooks of one phase run sequentially in registration order. The first
//! failure aborts the phase, and cancellation is checked after every hook.
//!
//! ```rust,ignore
//! let profile = HookProfile::for_base::<Audited>()
//!     .request_hook(request_hook::<RenameTodo, _>("log-rename", |request| {
//!         tracing::info!(id = %request.id, "renaming");
//!         Ok(())
//!     }));
//! ```

use async_trait::async_trait;
use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::errors::{BoxError, Failure};
use crate::request::{AnyRequest, EffectivePolicy, PolicyBase, Request};
use crate::response::Response;

/// Runs before the handler.
#[async_trait]
pub trait RequestHook: Send + Sync {
    /// Identity reported when the hook fails.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    async fn run(&self, request: &dyn AnyRequest, token: &CancellationToken)
    -> Result<(), BoxError>;
}

/// Runs after a successful handler.
///
/// `result` is `None` when the response carries no value.
#[async_trait]
pub trait ResultHook: Send + Sync {
    /// Identity reported when the hook fails.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    async fn run(
        &self,
        request: &dyn AnyRequest,
        result: Option<&mut (dyn Any + Send)>,
        token: &CancellationToken,
    ) -> Result<(), BoxError>;
}

/// Typed request hook built from a closure. Skips other request types.
pub struct FnRequestHook<R, F> {
    name: String,
    f: F,
    _request: PhantomData<fn(&R)>,
}

/// Build a [`RequestHook`] for requests of type `R`.
pub fn request_hook<R, F>(name: impl Into<String>, f: F) -> FnRequestHook<R, F>
where
    R: Request,
    F: Fn(&R) -> Result<(), BoxError> + Send + Sync,
{
    FnRequestHook {
        name: name.into(),
        f,
        _request: PhantomData,
    }
}

#[async_trait]
impl<R, F> RequestHook for FnRequestHook<R, F>
where
    R: Request,
    F: Fn(&R) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        request: &dyn AnyRequest,
        _token: &CancellationToken,
    ) -> Result<(), BoxError> {
        match request.downcast_ref::<R>() {
            Some(request) => (self.f)(request),
            None => Ok(()),
        }
    }
}

/// Typed result hook built from a closure. Skips other request types.
pub struct FnResultHook<R, F> {
    name: String,
    f: F,
    _request: PhantomData<fn(&R)>,
}

/// Build a [`ResultHook`] for requests of type `R`.
pub fn result_hook<R, F>(name: impl Into<String>, f: F) -> FnResultHook<R, F>
where
    R: Request,
    F: Fn(&R, &mut R::Result) -> Result<(), BoxError> + Send + Sync,
{
    FnResultHook {
        name: name.into(),
        f,
        _request: PhantomData,
    }
}

#[async_trait]
impl<R, F> ResultHook for FnResultHook<R, F>
where
    R: Request,
    F: Fn(&R, &mut R::Result) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        request: &dyn AnyRequest,
        result: Option<&mut (dyn Any + Send)>,
        _token: &CancellationToken,
    ) -> Result<(), BoxError> {
        let Some(request) = request.downcast_ref::<R>() else {
            return Ok(());
        };
        match result.and_then(|value| value.downcast_mut::<R::Result>()) {
            Some(value) => (self.f)(request, value),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HookTarget {
    Request(TypeId),
    Base(TypeId),
}

/// Hooks attached to a request type or to a policy base.
#[derive(Clone)]
pub struct HookProfile {
    target: HookTarget,
    target_name: &'static str,
    request_hooks: Vec<Arc<dyn RequestHook>>,
    result_hooks: Vec<Arc<dyn ResultHook>>,
}

impl HookProfile {
    #[must_use]
    pub fn for_request<R: Request>() -> Self {
        Self::new(HookTarget::Request(TypeId::of::<R>()), type_name::<R>())
    }

    /// Applies to every request that inherits `B`.
    #[must_use]
    pub fn for_base<B: PolicyBase>() -> Self {
        Self::new(HookTarget::Base(TypeId::of::<B>()), B::NAME)
    }

    fn new(target: HookTarget, target_name: &'static str) -> Self {
        Self {
            target,
            target_name,
            request_hooks: Vec::new(),
            result_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn request_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.request_hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn result_hook(mut self, hook: impl ResultHook + 'static) -> Self {
        self.result_hooks.push(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn target_name(&self) -> &'static str {
        self.target_name
    }

    /// Whether at least one request or result hook is attached.
    #[must_use]
    pub fn has_hooks(&self) -> bool {
        !self.request_hooks.is_empty() || !self.result_hooks.is_empty()
    }

    #[must_use]
    pub fn applies_to(&self, request: TypeId, policy: &EffectivePolicy) -> bool {
        match self.target {
            HookTarget::Request(id) => id == request,
            HookTarget::Base(id) => policy.inherits_id(id),
        }
    }
}

/// The hooks that apply to one request type, in registration order.
#[derive(Clone, Default)]
pub struct HookSet {
    request_hooks: Vec<Arc<dyn RequestHook>>,
    result_hooks: Vec<Arc<dyn ResultHook>>,
}

impl HookSet {
    #[must_use]
    pub fn collect(profiles: &[HookProfile], request: TypeId, policy: &EffectivePolicy) -> Self {
        let mut set = Self::default();
        for profile in profiles.iter().filter(|p| p.applies_to(request, policy)) {
            set.request_hooks.extend(profile.request_hooks.iter().cloned());
            set.result_hooks.extend(profile.result_hooks.iter().cloned());
        }
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request_hooks.is_empty() && self.result_hooks.is_empty()
    }

    /// Run every request hook.
    ///
    /// # Errors
    ///
    /// The first hook failure, or `RequestCanceled` once the token is canceled.
    pub async fn run_request_hooks(
        &self,
        request: &dyn AnyRequest,
        token: &CancellationToken,
    ) -> Result<(), Failure> {
        for hook in &self.request_hooks {
            trace!(hook = hook.name(), request = request.request_name(), "Running request hook");
            hook.run(request, token)
                .await
                .map_err(|err| hook_failure(hook.name(), err))?;
            if token.is_cancelled() {
                return Err(Failure::RequestCanceled);
            }
        }
        Ok(())
    }

    /// Run every result hook against `response`'s result.
    ///
    /// # Errors
    ///
    /// The first hook failure, or `RequestCanceled` once the token is canceled.
    pub async fn run_result_hooks<T: Send + 'static>(
        &self,
        request: &dyn AnyRequest,
        response: &mut Response<T>,
        token: &CancellationToken,
    ) -> Result<(), Failure> {
        for hook in &self.result_hooks {
            trace!(hook = hook.name(), request = request.request_name(), "Running result hook");
            let result = response
                .result_mut()
                .map(|value| value as &mut (dyn Any + Send));
            hook.run(request, result, token)
                .await
                .map_err(|err| hook_failure(hook.name(), err))?;
            if token.is_cancelled() {
                return Err(Failure::RequestCanceled);
            }
        }
        Ok(())
    }
}

/// Explicit request failures and cancellations raised by a hook pass through.
fn hook_failure(hook: &str, error: BoxError) -> Failure {
    match Failure::from_boxed(error) {
        failure @ (Failure::RequestFailed { .. } | Failure::RequestCanceled) => failure,
        Failure::Unclassified(source) => Failure::HookFailed {
            hook: hook.to_string(),
            source,
        },
        other => Failure::HookFailed {
            hook: hook.to_string(),
            source: Arc::new(other),
        },
    }
}
