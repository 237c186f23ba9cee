//! # CRUD Entities
//!
//! Built-in request shapes and handlers for sea-orm entities. Implement
//! [`CrudEntity`] for a domain type, register it with
//! `CrudlessBuilder::crud::<E>()`, and the mediator handles:
//!
//! | Request                  | Result    | Transaction |
//! |--------------------------|-----------|-------------|
//! | [`CreateRequest`]        | `E`       | yes         |
//! | [`GetRequest`]           | `E`       | no          |
//! | [`GetAllRequest`]        | `Vec<E>`  | no          |
//! | [`UpdateRequest`]        | `E`       | yes         |
//! | [`DeleteRequest`]        | `E`       | yes         |
//! | [`SaveRequest`]          | `E`       | yes         |
//! | [`MergeRequest`]         | `Vec<E>`  | yes         |
//! | [`SynchronizeRequest`]   | `Vec<E>`  | yes         |
//!
//! CRUD handlers run the hooks that target their request types themselves,
//! so the universal hook decorator never wraps them.

mod context;
mod handlers;
mod operations;
mod requests;

pub use context::SeaOrmContext;
pub use handlers::CrudHandler;
pub use requests::{
    CreateRequest, DeleteRequest, GetAllRequest, GetRequest, MergeRequest, SaveRequest,
    SynchronizeRequest, UpdateRequest,
};

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, FromQueryResult,
    IntoActiveModel, ModelTrait,
};

use crate::errors::BoxError;

pub trait MergeIntoActiveModel<ActiveModelType> {
    /// Merge this update model into an existing active model
    ///
    /// # Errors
    ///
    /// Returns a `DbErr` if the merge operation fails due to data conversion issues.
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// A domain type persisted through a sea-orm entity.
pub trait CrudEntity: Sized + Clone + Send + Sync + 'static {
    type EntityType: EntityTrait<Model = Self::ModelType, Column = Self::ColumnType> + Send + Sync;
    type ModelType: ModelTrait<Entity = Self::EntityType>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModelType>
        + Send
        + Sync
        + 'static;
    type ColumnType: ColumnTrait;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + Send
        + Sync;
    type CreateModel: Into<Self::ActiveModelType> + Clone + Send + Sync + 'static;
    type UpdateModel: MergeIntoActiveModel<Self::ActiveModelType> + Clone + Send + Sync + 'static;

    const ID_COLUMN: Self::ColumnType;
    const RESOURCE_NAME: &'static str;

    /// Build the domain value from a loaded model.
    ///
    /// # Errors
    ///
    /// Any conversion error; it is reported as a result-creation failure.
    fn from_model(model: &Self::ModelType) -> Result<Self, BoxError>;
}
