//! Cross-cutting decorators and chain assembly.
//!
//! A [`DecoratorPlan`] lists layers outermost first. [`compose`] wraps the core
//! handler from the inside out, resolving each layer's collaborators from the
//! dispatch scope.

mod hooks;
mod transaction;
mod validation;

pub use hooks::UniversalHooksDecorator;
pub use transaction::TransactionDecorator;
pub use validation::ValidationDecorator;

use std::any::type_name;
use std::sync::Arc;
use tracing::trace;

use crate::errors::ResolveError;
use crate::handler::RequestHandler;
use crate::hooks::HookSet;
use crate::provider::Scope;
use crate::request::Request;
use crate::rules::{DecoratorPlan, Layer, ValidationMode};
use crate::transaction::EntityContext;
use crate::validation::RequestValidator;

/// Build the decorated chain for one dispatch.
///
/// # Errors
///
/// A required validator or the entity context could not be resolved, or a
/// registered maybe-validator failed to build.
pub fn compose<R: Request>(
    plan: &DecoratorPlan,
    core: Arc<dyn RequestHandler<R>>,
    hooks: &Arc<HookSet>,
    scope: &Scope,
) -> Result<Arc<dyn RequestHandler<R>>, ResolveError> {
    let mut handler = core;

    for layer in plan.layers().iter().rev() {
        handler = match *layer {
            Layer::Core | Layer::Validation(ValidationMode::None) => handler,
            Layer::UniversalHooks => {
                Arc::new(UniversalHooksDecorator::new(handler, Arc::clone(hooks)))
            }
            Layer::Transaction => {
                let context = scope.resolve::<Arc<dyn EntityContext>>()?;
                Arc::new(TransactionDecorator::new(handler, context))
            }
            Layer::Validation(ValidationMode::Required) => {
                let validator = scope.resolve::<Arc<dyn RequestValidator<R>>>()?;
                Arc::new(ValidationDecorator::new(handler, validator))
            }
            Layer::Validation(ValidationMode::Maybe) => {
                // Absent skips the layer; a validator that fails to build does not.
                match scope.try_resolve::<Arc<dyn RequestValidator<R>>>()? {
                    Some(validator) => Arc::new(ValidationDecorator::new(handler, validator)),
                    None => {
                        trace!(request = type_name::<R>(), "No validator registered, skipping");
                        handler
                    }
                }
            }
        };
    }

    Ok(handler)
}
