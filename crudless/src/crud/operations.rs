//! Generic persistence operations over any sea-orm connection.
//!
//! Each function works on a plain `DatabaseConnection` or an open
//! `DatabaseTransaction`; [`SeaOrmContext`](super::SeaOrmContext) picks which.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::{CrudEntity, MergeIntoActiveModel};
use crate::errors::{Failure, Payload};

fn to_entity<E: CrudEntity>(model: E::ModelType) -> Result<E, Failure> {
    E::from_model(&model)
        .map_err(|err| Failure::create_result_failed::<E>(Some(Payload::new(model)), err))
}

async fn find_model<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<E::ModelType>, Failure> {
    Ok(E::EntityType::find()
        .filter(E::ID_COLUMN.eq(id))
        .one(conn)
        .await?)
}

async fn require_model<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<E::ModelType, Failure> {
    find_model::<E, C>(conn, id)
        .await?
        .ok_or_else(|| Failure::not_found(E::RESOURCE_NAME, Some(id.to_string())))
}

pub(crate) async fn get_one<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<E, Failure> {
    to_entity::<E>(require_model::<E, C>(conn, id).await?)
}

pub(crate) async fn get_all<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    offset: u64,
    limit: Option<u64>,
) -> Result<Vec<E>, Failure> {
    let models = E::EntityType::find()
        .order_by_asc(E::ID_COLUMN)
        .offset(offset)
        .limit(limit)
        .all(conn)
        .await?;
    models.into_iter().map(to_entity::<E>).collect()
}

pub(crate) async fn create<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    item: &E::CreateModel,
) -> Result<E, Failure> {
    let active_model: E::ActiveModelType = item.clone().into();
    let model = active_model.insert(conn).await.map_err(|err| {
        Failure::create_entity_failed(E::RESOURCE_NAME, Some(Payload::new(item.clone())), err)
    })?;
    to_entity::<E>(model)
}

pub(crate) async fn update<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    item: &E::UpdateModel,
) -> Result<E, Failure> {
    let update_failed = |err: DbErr| {
        Failure::update_entity_failed(E::RESOURCE_NAME, Some(Payload::new(item.clone())), err)
    };

    let existing: E::ActiveModelType = require_model::<E, C>(conn, id).await?.into_active_model();
    let merged = item
        .clone()
        .merge_into_activemodel(existing)
        .map_err(update_failed)?;
    let model = merged.update(conn).await.map_err(update_failed)?;
    to_entity::<E>(model)
}

/// Returns the entity as it was before deletion.
pub(crate) async fn delete<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<E, Failure> {
    let entity = to_entity::<E>(require_model::<E, C>(conn, id).await?)?;
    E::EntityType::delete_many()
        .filter(E::ID_COLUMN.eq(id))
        .exec(conn)
        .await?;
    Ok(entity)
}

pub(crate) async fn save<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    item: &E::CreateModel,
) -> Result<E, Failure> {
    let exists = find_model::<E, C>(conn, id).await?.is_some();

    let mut active_model: E::ActiveModelType = item.clone().into();
    active_model.set(E::ID_COLUMN, id.into());

    let payload = || Some(Payload::new(item.clone()));
    let model = if exists {
        active_model
            .update(conn)
            .await
            .map_err(|err| Failure::update_entity_failed(E::RESOURCE_NAME, payload(), err))?
    } else {
        active_model
            .insert(conn)
            .await
            .map_err(|err| Failure::create_entity_failed(E::RESOURCE_NAME, payload(), err))?
    };
    to_entity::<E>(model)
}

/// Upserts every item, collecting per-item failures.
pub(crate) async fn merge<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    items: &[(Uuid, E::CreateModel)],
) -> Result<Vec<E>, Failure> {
    let mut saved = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for (id, item) in items {
        match save::<E, C>(conn, *id, item).await {
            Ok(entity) => saved.push(entity),
            Err(failure) => failures.push(failure),
        }
    }

    match failures.len() {
        0 => Ok(saved),
        1 => Err(failures.remove(0)),
        _ => Err(Failure::Aggregate(failures)),
    }
}

pub(crate) async fn synchronize<E: CrudEntity, C: ConnectionTrait>(
    conn: &C,
    items: &[(Uuid, E::CreateModel)],
) -> Result<Vec<E>, Failure> {
    let saved = merge::<E, C>(conn, items).await?;
    let keep: Vec<Uuid> = items.iter().map(|(id, _)| *id).collect();
    E::EntityType::delete_many()
        .filter(E::ID_COLUMN.is_not_in(keep))
        .exec(conn)
        .await?;
    Ok(saved)
}
