//! # Requests and Policy Metadata
//!
//! A request is an in-process command or query value. Its concrete type is its
//! identity: the registry keys handler bindings by `TypeId`, and the decorator
//! rules read the static [`RequestPolicy`] the type declares.
//!
//! Marker inheritance works through [`PolicyBase`] types, which stand in for
//! base types or interfaces. A request lists its bases, bases may list their
//! own, and [`EffectivePolicy::resolve`] walks that hierarchy once when a
//! binding is first built.
//!
//! ```rust,ignore
//! use crudless::{Request, PolicyBase, RequestPolicy};
//!
//! struct Audited;
//!
//! impl PolicyBase for Audited {
//!     const NAME: &'static str = "audited";
//!     fn policy() -> RequestPolicy {
//!         RequestPolicy::new().skip_transaction()
//!     }
//! }
//!
//! struct RenameTodo { id: uuid::Uuid, title: String }
//!
//! impl Request for RenameTodo {
//!     type Result = String;
//!     fn policy() -> RequestPolicy {
//!         RequestPolicy::new().maybe_validate().with_base::<Audited>()
//!     }
//! }
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Result marker for requests that produce no value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoResult;

/// A value dispatched through the mediator.
///
/// `Result` is the type carried by a successful [`Response`](crate::Response).
/// Requests that only succeed or fail declare `type Result = NoResult`.
pub trait Request: Send + Sync + 'static {
    type Result: Send + 'static;

    /// Static policy markers for this request type.
    #[must_use]
    fn policy() -> RequestPolicy {
        RequestPolicy::new()
    }
}

/// A named policy parent, the equivalent of a marker base type.
pub trait PolicyBase: 'static {
    const NAME: &'static str;

    #[must_use]
    fn policy() -> RequestPolicy {
        RequestPolicy::new()
    }
}

/// The CRUD shapes the framework configures handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrudOperation {
    Create,
    Get,
    GetAll,
    Update,
    Delete,
    Save,
    Merge,
    Synchronize,
}

impl CrudOperation {
    /// Whether the operation can change persisted state.
    #[must_use]
    pub const fn mutates(self) -> bool {
        !matches!(self, Self::Get | Self::GetAll)
    }
}

/// Reference to a [`PolicyBase`] captured at declaration time.
#[derive(Debug, Clone, Copy)]
pub struct BaseRef {
    name: &'static str,
    type_id: TypeId,
    policy: fn() -> RequestPolicy,
}

impl BaseRef {
    #[must_use]
    pub fn of<B: PolicyBase>() -> Self {
        Self {
            name: B::NAME,
            type_id: TypeId::of::<B>(),
            policy: B::policy,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// Declarative markers attached to a request type or a policy base.
#[derive(Debug, Clone, Default)]
pub struct RequestPolicy {
    pub skip_validation: bool,
    pub validate: bool,
    pub maybe_validate: bool,
    pub skip_transaction: bool,
    pub crud: Option<CrudOperation>,
    bases: Vec<BaseRef>,
}

impl RequestPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never run a validator for this request.
    #[must_use]
    pub fn skip_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    /// Require validation even when validation is not on by default.
    #[must_use]
    pub fn validate(mut self) -> Self {
        self.validate = true;
        self
    }

    /// Validate only if a validator can be resolved.
    #[must_use]
    pub fn maybe_validate(mut self) -> Self {
        self.maybe_validate = true;
        self
    }

    #[must_use]
    pub fn skip_transaction(mut self) -> Self {
        self.skip_transaction = true;
        self
    }

    #[must_use]
    pub fn crud(mut self, operation: CrudOperation) -> Self {
        self.crud = Some(operation);
        self
    }

    #[must_use]
    pub fn with_base<B: PolicyBase>(mut self) -> Self {
        self.bases.push(BaseRef::of::<B>());
        self
    }

    #[must_use]
    pub fn bases(&self) -> &[BaseRef] {
        &self.bases
    }
}

/// A request type's policy after the base hierarchy has been folded in.
///
/// Markers are additive: a marker present on the request or on any base
/// applies. The CRUD shape comes from the first declaration found, walking the
/// request first and then its bases depth-first in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub request_type: &'static str,
    pub skip_validation: bool,
    pub validate: bool,
    pub maybe_validate: bool,
    pub skip_transaction: bool,
    pub crud: Option<CrudOperation>,
    bases: Vec<(TypeId, &'static str)>,
}

impl EffectivePolicy {
    #[must_use]
    pub fn resolve<R: Request>() -> Self {
        Self::from_policy(type_name::<R>(), &R::policy())
    }

    #[must_use]
    pub fn from_policy(request_type: &'static str, policy: &RequestPolicy) -> Self {
        let mut effective = Self {
            request_type,
            ..Self::default()
        };
        let mut visited = HashSet::new();
        effective.absorb(policy, &mut visited);
        effective
    }

    fn absorb(&mut self, policy: &RequestPolicy, visited: &mut HashSet<TypeId>) {
        self.skip_validation |= policy.skip_validation;
        self.validate |= policy.validate;
        self.maybe_validate |= policy.maybe_validate;
        self.skip_transaction |= policy.skip_transaction;
        if self.crud.is_none() {
            self.crud = policy.crud;
        }

        for base in policy.bases() {
            // Diamonds and cycles are visited once.
            if !visited.insert(base.type_id) {
                continue;
            }
            self.bases.push((base.type_id, base.name));
            let parent = (base.policy)();
            self.absorb(&parent, visited);
        }
    }

    /// Whether `B` appears anywhere in the hierarchy.
    #[must_use]
    pub fn inherits<B: PolicyBase>(&self) -> bool {
        self.inherits_id(TypeId::of::<B>())
    }

    #[must_use]
    pub fn inherits_id(&self, type_id: TypeId) -> bool {
        self.bases.iter().any(|(id, _)| *id == type_id)
    }

    /// Base names in walk order.
    pub fn base_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bases.iter().map(|(_, name)| *name)
    }
}

/// Object-safe view of any request.
///
/// Used where the concrete type is erased: universal hooks that target a
/// policy base, and error objects that carry the originating request.
pub trait AnyRequest: Any + Send + Sync {
    fn request_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl<R: Request> AnyRequest for R {
    fn request_name(&self) -> &'static str {
        type_name::<R>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyRequest {
    #[must_use]
    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }

    #[must_use]
    pub fn is<R: Request>(&self) -> bool {
        self.as_any().is::<R>()
    }
}

/// Whether `R` declares the no-result shape.
#[must_use]
pub fn is_no_result<R: Request>() -> bool {
    TypeId::of::<R::Result>() == TypeId::of::<NoResult>()
}
