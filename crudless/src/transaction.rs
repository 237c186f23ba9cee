//! Persistence collaborator contracts.
//!
//! The transaction decorator only sees these two traits. The sea-orm backed
//! implementation lives in [`crate::crud::SeaOrmContext`].

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::Failure;

/// An open unit of work.
///
/// Dropping a transaction that was neither committed nor rolled back must
/// release it as if `rollback` had been called.
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), Failure>;

    async fn rollback(self: Box<Self>) -> Result<(), Failure>;

    /// Whether this handle participates in a transaction owned by someone else.
    fn is_joined(&self) -> bool {
        false
    }
}

/// Handle returned to a caller that joined an already open transaction.
///
/// Commit and rollback belong to the owner, so both are no-ops here.
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinedTransaction;

#[async_trait]
impl Transaction for JoinedTransaction {
    async fn commit(self: Box<Self>) -> Result<(), Failure> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Failure> {
        Ok(())
    }

    fn is_joined(&self) -> bool {
        true
    }
}

/// Persistence context shared by everything resolved in one scope.
#[async_trait]
pub trait EntityContext: Send + Sync {
    /// Whether a transaction is already open on this context.
    fn has_active_transaction(&self) -> bool;

    /// Open a transaction for `request_type`, or join the one already open.
    ///
    /// Implementations must make the join-or-open decision atomically: two
    /// concurrent callers on one context get one owning handle and one
    /// [`JoinedTransaction`], never two owners.
    ///
    /// # Errors
    ///
    /// `RequestCanceled` if `token` is already canceled, or the failure raised
    /// by the backing store.
    async fn begin_transaction(
        &self,
        request_type: &'static str,
        token: &CancellationToken,
    ) -> Result<Box<dyn Transaction>, Failure>;
}
