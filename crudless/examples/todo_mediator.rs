//! Todo mediator example
//!
//! Registers the built-in CRUD requests for a `todos` table, a custom
//! validated request, and a result hook, then dispatches a few requests
//! against an in-memory SQLite database.
//!
//! ```bash
//! RUST_LOG=crudless=debug cargo run --example todo_mediator
//! ```

use crudless::crud::{CreateRequest, GetAllRequest, UpdateRequest};
use crudless::validation::validators;
use crudless::{
    BoxError, CancellationToken, CrudEntity, Failure, HookProfile, Mediator, MergeIntoActiveModel,
    Request, RequestHandler, Response, Validatable, ValidatableValidator, ValidationError,
    async_trait, result_hook,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Schema, Set,
};
use uuid::Uuid;

mod todo {
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

#[derive(Clone, Debug)]
struct Todo {
    id: Uuid,
    title: String,
    completed: bool,
}

#[derive(Clone, Debug)]
struct NewTodo {
    title: String,
}

impl From<NewTodo> for todo::ActiveModel {
    fn from(new: NewTodo) -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            title: Set(new.title),
            completed: Set(false),
        }
    }
}

#[derive(Clone, Debug)]
struct MarkDone;

impl MergeIntoActiveModel<todo::ActiveModel> for MarkDone {
    fn merge_into_activemodel(self, mut existing: todo::ActiveModel) -> Result<todo::ActiveModel, DbErr> {
        existing.completed = Set(true);
        Ok(existing)
    }
}

impl CrudEntity for Todo {
    type EntityType = todo::Entity;
    type ModelType = todo::Model;
    type ColumnType = todo::Column;
    type ActiveModelType = todo::ActiveModel;
    type CreateModel = NewTodo;
    type UpdateModel = MarkDone;

    const ID_COLUMN: todo::Column = todo::Column::Id;
    const RESOURCE_NAME: &'static str = "Todo";

    fn from_model(model: &todo::Model) -> Result<Self, BoxError> {
        Ok(Self {
            id: model.id,
            title: model.title.clone(),
            completed: model.completed,
        })
    }
}

/// Count open todos whose title contains `needle`.
#[derive(Request)]
#[crudless(result = u64, validate, skip_transaction)]
struct CountOpen {
    needle: String,
}

impl Validatable for CountOpen {
    fn validate(&self) -> Vec<ValidationError> {
        validators::validate_length("needle", &self.needle, Some(1), Some(32))
            .err()
            .into_iter()
            .collect()
    }
}

struct CountOpenHandler {
    db: DatabaseConnection,
}

#[async_trait]
impl RequestHandler<CountOpen> for CountOpenHandler {
    async fn handle(&self, request: &CountOpen, _token: &CancellationToken) -> Result<Response<u64>, Failure> {
        let count = todo::Entity::find()
            .filter(todo::Column::Completed.eq(false))
            .filter(todo::Column::Title.contains(&request.needle))
            .count(&self.db)
            .await
            .map_err(Failure::unclassified)?;
        Ok(Response::ok(count))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "crudless=info".to_string()))
        .init();

    let db = Database::connect("sqlite::memory:").await?;
    let backend = db.get_database_backend();
    db.execute(backend.build(&Schema::new(backend).create_table_from_entity(todo::Entity)))
        .await?;

    let handler_db = db.clone();
    let mediator = Mediator::builder()
        .use_sea_orm(db)
        .crud::<Todo>()
        .handler::<CountOpen, _>(move |_| {
            Ok(CountOpenHandler {
                db: handler_db.clone(),
            })
        })
        .validator::<CountOpen>(ValidatableValidator::new())
        .hooks(
            HookProfile::for_request::<CreateRequest<Todo>>().result_hook(result_hook::<
                CreateRequest<Todo>,
                _,
            >("announce", |_, todo| {
                tracing::info!("Created todo '{}'", todo.title);
                Ok(())
            })),
        )
        .build()?;

    let token = CancellationToken::new();
    let mut created = Vec::new();
    for title in ["Write the docs", "Ship the docs", "Water the plants"] {
        let response = mediator
            .handle(
                CreateRequest::<Todo>::new(NewTodo {
                    title: title.to_string(),
                }),
                &token,
            )
            .await?;
        if let Ok(Some(todo)) = response.into_result() {
            created.push(todo);
        }
    }

    if let Some(first) = created.first() {
        mediator
            .handle(UpdateRequest::<Todo>::new(first.id, MarkDone), &token)
            .await?;
    }

    let open = mediator
        .handle(
            CountOpen {
                needle: "docs".to_string(),
            },
            &token,
        )
        .await?;
    println!("Open todos about docs: {:?}", open.result());

    let rejected = mediator
        .handle(CountOpen { needle: String::new() }, &token)
        .await?;
    println!("Empty search ({}): {:?}", rejected.status(), rejected.errors());

    let everything = mediator.handle(GetAllRequest::<Todo>::new(), &token).await?;
    for todo in everything.result().into_iter().flatten() {
        println!("[{}] {} ({})", if todo.completed { "x" } else { " " }, todo.title, todo.id);
    }

    Ok(())
}
