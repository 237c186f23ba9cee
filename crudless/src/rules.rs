//! Decorator composition rules.
//!
//! Pure functions over a request type's effective policy and static
//! registration facts. They are evaluated once per request type when its
//! binding is built, so the resulting [`DecoratorPlan`] is identical for
//! identical configuration.

use crate::request::EffectivePolicy;

/// How the validation layer treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// No validation layer
    None,
    /// A validator must be registered
    Required,
    /// Validate only if a validator is registered
    Maybe,
}

/// One layer of the handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Validation(ValidationMode),
    Transaction,
    UniversalHooks,
    Core,
}

/// Static facts the rules depend on besides the policy markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanContext {
    pub validate_all_by_default: bool,
    pub has_entity_context: bool,
    pub has_hook_profile: bool,
}

/// Ordered layers, outermost first. Always ends with [`Layer::Core`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorPlan {
    layers: Vec<Layer>,
}

impl DecoratorPlan {
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub fn contains(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }

    #[must_use]
    pub fn validation(&self) -> ValidationMode {
        self.layers
            .iter()
            .find_map(|layer| match layer {
                Layer::Validation(mode) => Some(*mode),
                _ => None,
            })
            .unwrap_or(ValidationMode::None)
    }
}

/// Skip beats everything; an explicit marker requires a validator; the maybe
/// marker and the validate-all option validate opportunistically.
#[must_use]
pub fn validation_mode(policy: &EffectivePolicy, validate_all_by_default: bool) -> ValidationMode {
    if policy.skip_validation {
        ValidationMode::None
    } else if policy.validate {
        ValidationMode::Required
    } else if policy.maybe_validate || validate_all_by_default {
        ValidationMode::Maybe
    } else {
        ValidationMode::None
    }
}

/// Read-only CRUD shapes never transact.
#[must_use]
pub fn should_transact(policy: &EffectivePolicy, has_entity_context: bool) -> bool {
    let may_mutate = policy.crud.is_none_or(|operation| operation.mutates());
    !policy.skip_transaction && may_mutate && has_entity_context
}

/// CRUD handlers run their hooks themselves.
#[must_use]
pub fn should_apply_universal_hooks(policy: &EffectivePolicy, has_hook_profile: bool) -> bool {
    has_hook_profile && policy.crud.is_none()
}

#[must_use]
pub fn plan(policy: &EffectivePolicy, context: PlanContext) -> DecoratorPlan {
    let mut layers = Vec::with_capacity(4);

    match validation_mode(policy, context.validate_all_by_default) {
        ValidationMode::None => {}
        mode => layers.push(Layer::Validation(mode)),
    }
    if should_transact(policy, context.has_entity_context) {
        layers.push(Layer::Transaction);
    }
    if should_apply_universal_hooks(policy, context.has_hook_profile) {
        layers.push(Layer::UniversalHooks);
    }
    layers.push(Layer::Core);

    DecoratorPlan { layers }
}
