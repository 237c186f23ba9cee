//! # Handler Registry
//!
//! Registrations are made once at startup, keyed by request type and
//! [`HandlerShape`]. The first dispatch of a request type builds its
//! [`HandlerBinding`]: the core handler factory, the decorator plan computed
//! from the type's effective policy, the hooks that apply to it and its error
//! handler. Bindings are cached for the lifetime of the registry.
//!
//! The cache tolerates concurrent first resolution. Two callers racing on the
//! same request type may both build a binding; building is deterministic, so
//! whichever insert lands last is equivalent to the other.

use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::decorators;
use crate::error_handler::{ErrorDispatcher, ErrorDisposition, ErrorHandler};
use crate::errors::{DispatchError, Failure, ResolveError};
use crate::handler::{HandlerShape, RequestHandler};
use crate::hooks::{HookProfile, HookSet};
use crate::provider::Scope;
use crate::request::{AnyRequest, EffectivePolicy, Request, is_no_result};
use crate::response::Response;
use crate::rules::{self, DecoratorPlan, PlanContext};

/// Builds the core handler of a request type for one dispatch.
pub type CoreFactory<R> = Arc<
    dyn Fn(&Scope, &Arc<HookSet>) -> Result<Arc<dyn RequestHandler<R>>, ResolveError>
        + Send
        + Sync,
>;

/// A stored `CoreFactory<R>`, erased so registrations of every type fit in one map.
pub(crate) struct Registration {
    request: &'static str,
    factory: Box<dyn Any + Send + Sync>,
}

impl Registration {
    pub(crate) fn new<R: Request>(factory: CoreFactory<R>) -> Self {
        Self {
            request: type_name::<R>(),
            factory: Box::new(factory),
        }
    }
}

/// Per-request-type settings from the fluent configuration.
#[derive(Clone, Default)]
pub(crate) struct RequestOverrides {
    pub(crate) skip_transaction: bool,
    pub(crate) validate: bool,
    pub(crate) error_handler: Option<Arc<dyn ErrorHandler>>,
}

/// Everything needed to run one request type, resolved once.
pub struct HandlerBinding<R: Request> {
    policy: EffectivePolicy,
    plan: DecoratorPlan,
    shape: HandlerShape,
    factory: CoreFactory<R>,
    hooks: Arc<HookSet>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl<R: Request> HandlerBinding<R> {
    #[must_use]
    pub fn policy(&self) -> &EffectivePolicy {
        &self.policy
    }

    #[must_use]
    pub fn plan(&self) -> &DecoratorPlan {
        &self.plan
    }

    #[must_use]
    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    /// Assemble the decorated handler chain from `scope`.
    ///
    /// # Errors
    ///
    /// A dependency of the core handler or of a decorator cannot be resolved.
    pub fn build_chain(&self, scope: &Scope) -> Result<Arc<dyn RequestHandler<R>>, ResolveError> {
        let core = (self.factory)(scope, &self.hooks)?;
        decorators::compose(&self.plan, core, &self.hooks, scope)
    }

    /// Classify `failure` and let the error handler decide the outcome.
    ///
    /// # Errors
    ///
    /// `DispatchError::Unhandled` when the error handler rethrows.
    pub fn translate(
        &self,
        failure: &Failure,
        request: Arc<dyn AnyRequest>,
    ) -> Result<Response<R::Result>, DispatchError> {
        let error = ErrorDispatcher::dispatch(failure, request);
        match self.error_handler.handle_error(&error) {
            ErrorDisposition::Respond(response) => Ok(response.into_typed()),
            ErrorDisposition::Rethrow => Err(DispatchError::Unhandled(Box::new(error))),
        }
    }
}

/// Startup registrations plus the lazily filled binding cache.
pub struct HandlerRegistry {
    registrations: HashMap<(TypeId, HandlerShape), Registration>,
    overrides: HashMap<TypeId, RequestOverrides>,
    hook_profiles: Vec<HookProfile>,
    error_handler: Arc<dyn ErrorHandler>,
    validate_all_by_default: bool,
    has_entity_context: bool,
    cache: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    resolutions: AtomicU64,
}

impl HandlerRegistry {
    pub(crate) fn new(
        registrations: HashMap<(TypeId, HandlerShape), Registration>,
        overrides: HashMap<TypeId, RequestOverrides>,
        hook_profiles: Vec<HookProfile>,
        error_handler: Arc<dyn ErrorHandler>,
        validate_all_by_default: bool,
        has_entity_context: bool,
    ) -> Self {
        Self {
            registrations,
            overrides,
            hook_profiles,
            error_handler,
            validate_all_by_default,
            has_entity_context,
            cache: DashMap::new(),
            resolutions: AtomicU64::new(0),
        }
    }

    /// Number of handler registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Number of bindings built so far. Cache hits do not count.
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Whether a handler is registered for `R` under any shape.
    #[must_use]
    pub fn is_registered<R: Request>(&self) -> bool {
        self.lookup::<R>().is_some()
    }

    /// Fetch the cached binding for `R`, building it on first use.
    ///
    /// # Errors
    ///
    /// `HandlerNotRegistered` if no handler exists for `R`.
    pub fn binding<R: Request>(&self) -> Result<Arc<HandlerBinding<R>>, DispatchError> {
        let type_id = TypeId::of::<R>();

        if let Some(cached) = self.cache.get(&type_id).map(|entry| Arc::clone(entry.value())) {
            return cached
                .downcast::<HandlerBinding<R>>()
                .map_err(|_| DispatchError::BindingMismatch {
                    request: type_name::<R>(),
                });
        }

        let binding = Arc::new(self.build_binding::<R>()?);
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.cache.insert(type_id, Arc::clone(&binding) as Arc<dyn Any + Send + Sync>);
        Ok(binding)
    }

    /// No-result requests prefer the command shape and fall back to the
    /// general one. A miss on the first lookup is not an error.
    fn lookup<R: Request>(&self) -> Option<(HandlerShape, &Registration)> {
        let type_id = TypeId::of::<R>();
        if is_no_result::<R>()
            && let Some(registration) = self.registrations.get(&(type_id, HandlerShape::NoResult))
        {
            return Some((HandlerShape::NoResult, registration));
        }
        self.registrations
            .get(&(type_id, HandlerShape::WithResult))
            .map(|registration| (HandlerShape::WithResult, registration))
    }

    fn build_binding<R: Request>(&self) -> Result<HandlerBinding<R>, DispatchError> {
        let type_id = TypeId::of::<R>();
        let request = type_name::<R>();

        let (shape, registration) = self
            .lookup::<R>()
            .ok_or(DispatchError::HandlerNotRegistered { request })?;
        let factory = registration
            .factory
            .downcast_ref::<CoreFactory<R>>()
            .cloned()
            .ok_or(DispatchError::BindingMismatch {
                request: registration.request,
            })?;

        let overrides = self.overrides.get(&type_id).cloned().unwrap_or_default();
        let mut policy = EffectivePolicy::resolve::<R>();
        policy.skip_transaction |= overrides.skip_transaction;
        policy.validate |= overrides.validate;

        let has_hook_profile = self
            .hook_profiles
            .iter()
            .any(|profile| profile.applies_to(type_id, &policy));
        let hooks = Arc::new(HookSet::collect(&self.hook_profiles, type_id, &policy));

        let plan = rules::plan(
            &policy,
            PlanContext {
                validate_all_by_default: self.validate_all_by_default,
                has_entity_context: self.has_entity_context,
                has_hook_profile,
            },
        );
        debug!(request, %shape, layers = ?plan.layers(), "Resolved handler binding");

        Ok(HandlerBinding {
            policy,
            plan,
            shape,
            factory,
            hooks,
            error_handler: overrides
                .error_handler
                .unwrap_or_else(|| Arc::clone(&self.error_handler)),
        })
    }
}
