use async_trait::async_trait;
use std::any::type_name;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace, warn};

use crate::errors::Failure;
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;
use crate::transaction::{EntityContext, Transaction};

/// Wraps the inner chain in a transaction on the scope's entity context.
///
/// Commits when the inner response has no errors and rolls back otherwise.
/// If the context already has an open transaction it hands back a joined
/// handle, and commit and rollback stay with the owner.
pub struct TransactionDecorator<R: Request> {
    inner: Arc<dyn RequestHandler<R>>,
    context: Arc<dyn EntityContext>,
}

impl<R: Request> TransactionDecorator<R> {
    pub fn new(inner: Arc<dyn RequestHandler<R>>, context: Arc<dyn EntityContext>) -> Self {
        Self { inner, context }
    }
}

#[async_trait]
impl<R: Request> RequestHandler<R> for TransactionDecorator<R> {
    async fn handle(
        &self,
        request: &R,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, Failure> {
        let request_type = type_name::<R>();

        if token.is_cancelled() {
            return Err(Failure::RequestCanceled);
        }

        let transaction = self.context.begin_transaction(request_type, token).await?;
        if transaction.is_joined() {
            trace!(request = request_type, "Joined active transaction");
        } else {
            trace!(request = request_type, "Transaction started");
        }

        match self.inner.handle(request, token).await {
            Ok(response) if response.has_errors() => {
                warn!(request = request_type, "Rolling back: response has errors");
                rollback_quietly(transaction, request_type).await;
                Ok(response)
            }
            Ok(response) => {
                if token.is_cancelled() {
                    warn!(request = request_type, "Rolling back: request canceled");
                    rollback_quietly(transaction, request_type).await;
                    return Err(Failure::RequestCanceled);
                }
                transaction.commit().await?;
                trace!(request = request_type, "Transaction committed");
                Ok(response)
            }
            Err(failure) => {
                warn!(request = request_type, error = %failure, "Rolling back after failure");
                rollback_quietly(transaction, request_type).await;
                Err(failure)
            }
        }
    }
}

/// The inner response or failure wins over a rollback failure.
async fn rollback_quietly(transaction: Box<dyn Transaction>, request_type: &'static str) {
    if let Err(err) = transaction.rollback().await {
        error!(request = request_type, error = %err, "Rollback failed");
    }
}
