use uuid::Uuid;

use super::CrudEntity;
use crate::request::{CrudOperation, Request, RequestPolicy};

pub struct CreateRequest<E: CrudEntity> {
    pub item: E::CreateModel,
}

impl<E: CrudEntity> CreateRequest<E> {
    pub fn new(item: E::CreateModel) -> Self {
        Self { item }
    }
}

impl<E: CrudEntity> Request for CreateRequest<E> {
    type Result = E;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Create)
    }
}

pub struct GetRequest<E: CrudEntity> {
    pub id: Uuid,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: CrudEntity> GetRequest<E> {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            _entity: std::marker::PhantomData,
        }
    }
}

impl<E: CrudEntity> Request for GetRequest<E> {
    type Result = E;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Get)
    }
}

/// Page of entities ordered by id.
pub struct GetAllRequest<E: CrudEntity> {
    pub offset: u64,
    pub limit: Option<u64>,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: CrudEntity> GetAllRequest<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::page(0, None)
    }

    #[must_use]
    pub fn page(offset: u64, limit: Option<u64>) -> Self {
        Self {
            offset,
            limit,
            _entity: std::marker::PhantomData,
        }
    }
}

impl<E: CrudEntity> Default for GetAllRequest<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CrudEntity> Request for GetAllRequest<E> {
    type Result = Vec<E>;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::GetAll)
    }
}

pub struct UpdateRequest<E: CrudEntity> {
    pub id: Uuid,
    pub item: E::UpdateModel,
}

impl<E: CrudEntity> UpdateRequest<E> {
    pub fn new(id: Uuid, item: E::UpdateModel) -> Self {
        Self { id, item }
    }
}

impl<E: CrudEntity> Request for UpdateRequest<E> {
    type Result = E;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Update)
    }
}

/// Deletes one entity and returns it as it was before deletion.
pub struct DeleteRequest<E: CrudEntity> {
    pub id: Uuid,
    _entity: std::marker::PhantomData<fn() -> E>,
}

impl<E: CrudEntity> DeleteRequest<E> {
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            _entity: std::marker::PhantomData,
        }
    }
}

impl<E: CrudEntity> Request for DeleteRequest<E> {
    type Result = E;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Delete)
    }
}

/// Insert-or-update under a caller-chosen id.
pub struct SaveRequest<E: CrudEntity> {
    pub id: Uuid,
    pub item: E::CreateModel,
}

impl<E: CrudEntity> SaveRequest<E> {
    pub fn new(id: Uuid, item: E::CreateModel) -> Self {
        Self { id, item }
    }
}

impl<E: CrudEntity> Request for SaveRequest<E> {
    type Result = E;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Save)
    }
}

/// Batch upsert.
pub struct MergeRequest<E: CrudEntity> {
    pub items: Vec<(Uuid, E::CreateModel)>,
}

impl<E: CrudEntity> MergeRequest<E> {
    pub fn new(items: Vec<(Uuid, E::CreateModel)>) -> Self {
        Self { items }
    }
}

impl<E: CrudEntity> Request for MergeRequest<E> {
    type Result = Vec<E>;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Merge)
    }
}

/// Batch upsert, then delete every row not in the batch.
pub struct SynchronizeRequest<E: CrudEntity> {
    pub items: Vec<(Uuid, E::CreateModel)>,
}

impl<E: CrudEntity> SynchronizeRequest<E> {
    pub fn new(items: Vec<(Uuid, E::CreateModel)>) -> Self {
        Self { items }
    }
}

impl<E: CrudEntity> Request for SynchronizeRequest<E> {
    type Result = Vec<E>;

    fn policy() -> RequestPolicy {
        RequestPolicy::new().crud(CrudOperation::Synchronize)
    }
}
