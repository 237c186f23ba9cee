//! # Configuration
//!
//! [`CrudlessOptions`] holds the global switches and can be loaded from any
//! serde source. [`CrudlessBuilder`] is the fluent registration surface:
//! handlers, services, per-request profiles, hook profiles, the error handler
//! and CRUD entities.
//!
//! ```rust,ignore
//! let mediator = Mediator::builder()
//!     .options(CrudlessOptions { validate_all_requests_by_default: true, ..Default::default() })
//!     .use_sea_orm(db)
//!     .crud::<Todo>()
//!     .handler::<Echo, _>(|_| Ok(EchoHandler))
//!     .configure(RequestProfile::<Echo>::new().skip_transaction())
//!     .build()?;
//! ```

use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::debug;

use crate::crud::{CrudEntity, CrudHandler, SeaOrmContext};
use crate::crud::{
    CreateRequest, DeleteRequest, GetAllRequest, GetRequest, MergeRequest, SaveRequest,
    SynchronizeRequest, UpdateRequest,
};
use crate::error_handler::{DefaultErrorHandler, ErrorHandler};
use crate::errors::{RegistrationError, ResolveError};
use crate::handler::{CommandAdapter, CommandHandler, HandlerShape, RequestHandler};
use crate::hooks::{HookProfile, HookSet, RequestHook, ResultHook};
use crate::mediator::Mediator;
use crate::provider::{Scope, ServiceCollection};
use crate::registry::{CoreFactory, HandlerRegistry, Registration, RequestOverrides};
use crate::request::{NoResult, Request};
use crate::transaction::EntityContext;
use crate::validation::RequestValidator;

/// Global switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrudlessOptions {
    /// Validate every request without a skip marker when a validator exists
    pub validate_all_requests_by_default: bool,
    /// Give each dispatch its own scope instead of the shared ambient one
    pub use_request_scoping: bool,
}

impl Default for CrudlessOptions {
    fn default() -> Self {
        Self {
            validate_all_requests_by_default: false,
            use_request_scoping: true,
        }
    }
}

/// Fluent per-request configuration.
pub struct RequestProfile<R: Request> {
    validator: Option<Arc<dyn RequestValidator<R>>>,
    skip_transaction: bool,
    hooks: HookProfile,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl<R: Request> RequestProfile<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            validator: None,
            skip_transaction: false,
            hooks: HookProfile::for_request::<R>(),
            error_handler: None,
        }
    }

    /// Validate with `validator`. Implies the explicit validation marker.
    #[must_use]
    pub fn validator(mut self, validator: impl RequestValidator<R> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn skip_transaction(mut self) -> Self {
        self.skip_transaction = true;
        self
    }

    #[must_use]
    pub fn request_hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.hooks = self.hooks.request_hook(hook);
        self
    }

    #[must_use]
    pub fn result_hook(mut self, hook: impl ResultHook + 'static) -> Self {
        self.hooks = self.hooks.result_hook(hook);
        self
    }

    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl<R: Request> Default for RequestProfile<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects registrations and builds a [`Mediator`].
pub struct CrudlessBuilder {
    options: CrudlessOptions,
    services: ServiceCollection,
    registrations: HashMap<(TypeId, HandlerShape), Registration>,
    overrides: HashMap<TypeId, RequestOverrides>,
    hook_profiles: Vec<HookProfile>,
    error_handler: Arc<dyn ErrorHandler>,
    errors: Vec<RegistrationError>,
}

impl Default for CrudlessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrudlessBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: CrudlessOptions::default(),
            services: ServiceCollection::new(),
            registrations: HashMap::new(),
            overrides: HashMap::new(),
            hook_profiles: Vec::new(),
            error_handler: Arc::new(DefaultErrorHandler::new()),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: CrudlessOptions) -> Self {
        self.options = options;
        self
    }

    /// Register services on the underlying collection.
    #[must_use]
    pub fn services(mut self, configure: impl FnOnce(&mut ServiceCollection)) -> Self {
        configure(&mut self.services);
        self
    }

    /// Register a handler for `R`, built per dispatch from the scope.
    #[must_use]
    pub fn handler<R, H>(
        self,
        factory: impl Fn(&Scope) -> Result<H, ResolveError> + Send + Sync + 'static,
    ) -> Self
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let core: CoreFactory<R> = Arc::new(
            move |scope: &Scope, _: &Arc<HookSet>| -> Result<Arc<dyn RequestHandler<R>>, ResolveError> {
                Ok(Arc::new(factory(scope)?))
            },
        );
        self.register(HandlerShape::WithResult, core)
    }

    /// Register a no-result handler for `R`.
    #[must_use]
    pub fn command<R, H>(
        self,
        factory: impl Fn(&Scope) -> Result<H, ResolveError> + Send + Sync + 'static,
    ) -> Self
    where
        R: Request<Result = NoResult>,
        H: CommandHandler<R> + 'static,
    {
        let core: CoreFactory<R> = Arc::new(
            move |scope: &Scope, _: &Arc<HookSet>| -> Result<Arc<dyn RequestHandler<R>>, ResolveError> {
                let handler: Arc<dyn CommandHandler<R>> = Arc::new(factory(scope)?);
                Ok(Arc::new(CommandAdapter::new(handler)))
            },
        );
        self.register(HandlerShape::NoResult, core)
    }

    /// Register a validator for `R`, used when its plan includes validation.
    #[must_use]
    pub fn validator<R: Request>(mut self, validator: impl RequestValidator<R> + 'static) -> Self {
        let validator: Arc<dyn RequestValidator<R>> = Arc::new(validator);
        self.services
            .add_singleton::<Arc<dyn RequestValidator<R>>, _>(move |_| Ok(Arc::clone(&validator)));
        self
    }

    /// Apply per-request overrides.
    #[must_use]
    pub fn configure<R: Request>(mut self, profile: RequestProfile<R>) -> Self {
        let overrides = self.overrides.entry(TypeId::of::<R>()).or_default();
        overrides.skip_transaction |= profile.skip_transaction;
        if profile.error_handler.is_some() {
            overrides.error_handler = profile.error_handler;
        }

        if let Some(validator) = profile.validator {
            overrides.validate = true;
            self.services
                .add_singleton::<Arc<dyn RequestValidator<R>>, _>(move |_| Ok(Arc::clone(&validator)));
        }

        self.hooks(profile.hooks)
    }

    /// Attach a hook profile declared independently of any request's own
    /// configuration. A profile without hooks is ignored.
    #[must_use]
    pub fn hooks(mut self, profile: HookProfile) -> Self {
        if profile.has_hooks() {
            self.hook_profiles.push(profile);
        }
        self
    }

    /// Replace the default error handler.
    #[must_use]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Register a custom persistence context, one per scope.
    #[must_use]
    pub fn entity_context<C>(
        mut self,
        factory: impl Fn(&Scope) -> Result<Arc<C>, ResolveError> + Send + Sync + 'static,
    ) -> Self
    where
        C: EntityContext + 'static,
    {
        self.services
            .add_scoped::<Arc<dyn EntityContext>, _>(move |scope| {
                Ok(factory(scope)? as Arc<dyn EntityContext>)
            });
        self
    }

    /// Use a sea-orm database as the persistence context.
    #[must_use]
    pub fn use_sea_orm(mut self, db: DatabaseConnection) -> Self {
        self.services
            .add_scoped::<Arc<SeaOrmContext>, _>(move |_| Ok(Arc::new(SeaOrmContext::new(db.clone()))))
            .add_scoped::<Arc<dyn EntityContext>, _>(|scope| {
                Ok(scope.resolve::<Arc<SeaOrmContext>>()? as Arc<dyn EntityContext>)
            });
        self
    }

    /// Register the built-in CRUD handlers for entity `E`.
    #[must_use]
    pub fn crud<E: CrudEntity>(self) -> Self {
        debug!(entity = E::RESOURCE_NAME, "Registering CRUD handlers");
        self.crud_handler::<E, CreateRequest<E>>()
            .crud_handler::<E, GetRequest<E>>()
            .crud_handler::<E, GetAllRequest<E>>()
            .crud_handler::<E, UpdateRequest<E>>()
            .crud_handler::<E, DeleteRequest<E>>()
            .crud_handler::<E, SaveRequest<E>>()
            .crud_handler::<E, MergeRequest<E>>()
            .crud_handler::<E, SynchronizeRequest<E>>()
    }

    fn crud_handler<E, R>(self) -> Self
    where
        E: CrudEntity,
        R: Request,
        CrudHandler<E>: RequestHandler<R>,
    {
        let core: CoreFactory<R> = Arc::new(
            |scope: &Scope, hooks: &Arc<HookSet>| -> Result<Arc<dyn RequestHandler<R>>, ResolveError> {
                let context = scope.resolve::<Arc<SeaOrmContext>>()?;
                Ok(Arc::new(CrudHandler::<E>::new(context, Arc::clone(hooks))))
            },
        );
        self.register(HandlerShape::WithResult, core)
    }

    fn register<R: Request>(mut self, shape: HandlerShape, factory: CoreFactory<R>) -> Self {
        match self.registrations.entry((TypeId::of::<R>(), shape)) {
            Entry::Occupied(_) => self.errors.push(RegistrationError::DuplicateHandler {
                request: type_name::<R>(),
                shape,
            }),
            Entry::Vacant(slot) => {
                slot.insert(Registration::new(factory));
            }
        }
        self
    }

    /// Freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate handler or service registration.
    pub fn build(mut self) -> Result<Mediator, RegistrationError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }

        let has_entity_context = self.services.contains::<Arc<dyn EntityContext>>();
        let provider = self.services.build()?;
        let registry = HandlerRegistry::new(
            self.registrations,
            self.overrides,
            self.hook_profiles,
            self.error_handler,
            self.options.validate_all_requests_by_default,
            has_entity_context,
        );

        debug!(
            handlers = registry.len(),
            services = provider.service_count(),
            "Mediator built"
        );
        Ok(Mediator::new(registry, provider, self.options))
    }
}
