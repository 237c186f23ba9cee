//! Sea-ORM backed persistence context.
//!
//! One context is created per scope. While a transaction is open every CRUD
//! operation run through the context uses it; otherwise operations run on the
//! plain connection.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CrudEntity, operations};
use crate::errors::Failure;
use crate::transaction::{EntityContext, JoinedTransaction, Transaction};

type TransactionSlot = Arc<Mutex<Option<DatabaseTransaction>>>;

/// Runs `$body` with `$conn` bound to the open transaction, or to the plain
/// connection when none is open.
macro_rules! with_connection {
    ($ctx:expr, $conn:ident => $body:expr) => {{
        let slot = $ctx.transaction.lock().await;
        match slot.as_ref() {
            Some($conn) => $body,
            None => {
                let $conn = &$ctx.db;
                $body
            }
        }
    }};
}

pub struct SeaOrmContext {
    db: DatabaseConnection,
    transaction: TransactionSlot,
    active: Arc<AtomicBool>,
}

impl SeaOrmContext {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            transaction: Arc::new(Mutex::new(None)),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn database(&self) -> &DatabaseConnection {
        &self.db
    }

    /// # Errors
    ///
    /// `FailedToFind` when no row has `id`.
    pub async fn get_one<E: CrudEntity>(&self, id: Uuid) -> Result<E, Failure> {
        with_connection!(self, conn => operations::get_one::<E, _>(conn, id).await)
    }

    /// # Errors
    ///
    /// Query or conversion failures.
    pub async fn get_all<E: CrudEntity>(
        &self,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<E>, Failure> {
        with_connection!(self, conn => operations::get_all::<E, _>(conn, offset, limit).await)
    }

    /// # Errors
    ///
    /// `CreateEntityFailed` when the insert fails.
    pub async fn create<E: CrudEntity>(&self, item: &E::CreateModel) -> Result<E, Failure> {
        with_connection!(self, conn => operations::create::<E, _>(conn, item).await)
    }

    /// # Errors
    ///
    /// `FailedToFind` for an unknown id, `UpdateEntityFailed` when the merge
    /// or the update fails.
    pub async fn update<E: CrudEntity>(
        &self,
        id: Uuid,
        item: &E::UpdateModel,
    ) -> Result<E, Failure> {
        with_connection!(self, conn => operations::update::<E, _>(conn, id, item).await)
    }

    /// # Errors
    ///
    /// `FailedToFind` for an unknown id.
    pub async fn delete<E: CrudEntity>(&self, id: Uuid) -> Result<E, Failure> {
        with_connection!(self, conn => operations::delete::<E, _>(conn, id).await)
    }

    /// # Errors
    ///
    /// `CreateEntityFailed` or `UpdateEntityFailed` depending on whether the
    /// row existed.
    pub async fn save<E: CrudEntity>(&self, id: Uuid, item: &E::CreateModel) -> Result<E, Failure> {
        with_connection!(self, conn => operations::save::<E, _>(conn, id, item).await)
    }

    /// # Errors
    ///
    /// One failure per failed item, aggregated when there are several.
    pub async fn merge<E: CrudEntity>(
        &self,
        items: &[(Uuid, E::CreateModel)],
    ) -> Result<Vec<E>, Failure> {
        with_connection!(self, conn => operations::merge::<E, _>(conn, items).await)
    }

    /// # Errors
    ///
    /// See [`SeaOrmContext::merge`].
    pub async fn synchronize<E: CrudEntity>(
        &self,
        items: &[(Uuid, E::CreateModel)],
    ) -> Result<Vec<E>, Failure> {
        with_connection!(self, conn => operations::synchronize::<E, _>(conn, items).await)
    }
}

#[async_trait]
impl EntityContext for SeaOrmContext {
    fn has_active_transaction(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    async fn begin_transaction(
        &self,
        request_type: &'static str,
        token: &CancellationToken,
    ) -> Result<Box<dyn Transaction>, Failure> {
        if token.is_cancelled() {
            return Err(Failure::RequestCanceled);
        }

        let mut slot = self.transaction.lock().await;
        if slot.is_some() {
            debug!(request = request_type, "Joining open database transaction");
            return Ok(Box::new(JoinedTransaction));
        }
        *slot = Some(self.db.begin().await?);
        self.active.store(true, Ordering::Release);
        debug!(request = request_type, "Database transaction opened");

        Ok(Box::new(SeaOrmTransaction {
            slot: Arc::clone(&self.transaction),
            active: Arc::clone(&self.active),
            request_type,
            finished: false,
        }))
    }
}

/// Handle to the transaction stored in a [`SeaOrmContext`].
struct SeaOrmTransaction {
    slot: TransactionSlot,
    active: Arc<AtomicBool>,
    request_type: &'static str,
    finished: bool,
}

impl SeaOrmTransaction {
    async fn take(&mut self) -> Option<DatabaseTransaction> {
        self.finished = true;
        self.active.store(false, Ordering::Release);
        self.slot.lock().await.take()
    }
}

#[async_trait]
impl Transaction for SeaOrmTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), Failure> {
        if let Some(transaction) = self.take().await {
            transaction.commit().await?;
            debug!(request = self.request_type, "Database transaction committed");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), Failure> {
        if let Some(transaction) = self.take().await {
            transaction.rollback().await?;
            debug!(request = self.request_type, "Database transaction rolled back");
        }
        Ok(())
    }
}

impl Drop for SeaOrmTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.active.store(false, Ordering::Release);
        // Dropping the sea-orm transaction rolls it back.
        match self.slot.try_lock() {
            Ok(mut slot) => {
                if slot.take().is_some() {
                    warn!(request = self.request_type, "Transaction released without commit");
                }
            }
            Err(_) => warn!(
                request = self.request_type,
                "Transaction busy on release; it rolls back with its context"
            ),
        }
    }
}
