#![allow(dead_code)]

use async_trait::async_trait;
use crudless::{
    BoxError, CancellationToken, CrudEntity, EntityContext, Failure, JoinedTransaction,
    MergeIntoActiveModel, Transaction,
};
use parking_lot::Mutex;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, Set};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub mod todo_entity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "todos")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
        pub completed: bool,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

#[derive(Clone, Debug)]
pub struct TodoCreate {
    pub title: String,
    pub completed: bool,
}

impl TodoCreate {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            completed: false,
        }
    }
}

impl From<TodoCreate> for todo_entity::ActiveModel {
    fn from(create: TodoCreate) -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            title: Set(create.title),
            completed: Set(create.completed),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl MergeIntoActiveModel<todo_entity::ActiveModel> for TodoUpdate {
    fn merge_into_activemodel(
        self,
        mut existing: todo_entity::ActiveModel,
    ) -> Result<todo_entity::ActiveModel, DbErr> {
        if let Some(title) = self.title {
            existing.title = Set(title);
        }
        if let Some(completed) = self.completed {
            existing.completed = Set(completed);
        }
        Ok(existing)
    }
}

impl CrudEntity for Todo {
    type EntityType = todo_entity::Entity;
    type ModelType = todo_entity::Model;
    type ColumnType = todo_entity::Column;
    type ActiveModelType = todo_entity::ActiveModel;
    type CreateModel = TodoCreate;
    type UpdateModel = TodoUpdate;

    const ID_COLUMN: todo_entity::Column = todo_entity::Column::Id;
    const RESOURCE_NAME: &'static str = "Todo";

    fn from_model(model: &todo_entity::Model) -> Result<Self, BoxError> {
        if model.title == "unrepresentable" {
            return Err("title cannot be represented".into());
        }
        Ok(Self {
            id: model.id,
            title: model.title.clone(),
            completed: model.completed,
        })
    }
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(todo_entity::Entity)))
        .await?;
    Ok(db)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("crudless=debug")
        .with_test_writer()
        .try_init();
}

/// Entity context that records transaction events instead of touching a database.
#[derive(Clone, Default)]
pub struct RecordingContext {
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicBool>,
    fail_rollback: bool,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records rollbacks but reports each one as failed.
    pub fn failing_rollback() -> Self {
        Self {
            fail_rollback: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn record(&self, event: &str) {
        self.events.lock().push(event.to_string());
    }
}

#[async_trait]
impl EntityContext for RecordingContext {
    fn has_active_transaction(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn begin_transaction(
        &self,
        _request_type: &'static str,
        _token: &CancellationToken,
    ) -> Result<Box<dyn Transaction>, Failure> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Ok(Box::new(JoinedTransaction));
        }
        self.record("begin");
        Ok(Box::new(RecordingTransaction {
            context: self.clone(),
        }))
    }
}

struct RecordingTransaction {
    context: RecordingContext,
}

#[async_trait]
impl Transaction for RecordingTransaction {
    async fn commit(self: Box<Self>) -> Result<(), Failure> {
        self.context.active.store(false, Ordering::SeqCst);
        self.context.record("commit");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Failure> {
        self.context.active.store(false, Ordering::SeqCst);
        self.context.record("rollback");
        if self.context.fail_rollback {
            return Err(Failure::unclassified("rollback lost the connection"));
        }
        Ok(())
    }
}
