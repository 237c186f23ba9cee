//! Fire-and-track dispatch on the tokio runtime.

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::DispatchError;
use crate::mediator::Mediator;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("background dispatch task failed: {0}")]
    Join(#[from] JoinError),
}

/// Spawns dispatches whose tokens are children of one shutdown token.
#[derive(Clone)]
pub struct BackgroundMediator {
    mediator: Mediator,
    shutdown: CancellationToken,
}

impl BackgroundMediator {
    #[must_use]
    pub fn new(mediator: Mediator) -> Self {
        Self {
            mediator,
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn the dispatch of `request`. Must be called inside a tokio runtime.
    pub fn enqueue<R: Request>(&self, request: R) -> BackgroundJob<R::Result> {
        let token = self.shutdown.child_token();
        let mediator = self.mediator.clone();
        let task_token = token.clone();

        debug!(request = std::any::type_name::<R>(), "Background dispatch queued");
        let handle = tokio::spawn(async move { mediator.handle(request, &task_token).await });

        BackgroundJob { handle, token }
    }

    /// Cancel every job spawned by this mediator.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

pub struct BackgroundJob<T> {
    handle: JoinHandle<Result<Response<T>, DispatchError>>,
    token: CancellationToken,
}

impl<T> BackgroundJob<T> {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the dispatch to finish.
    ///
    /// # Errors
    ///
    /// The dispatch's own [`DispatchError`], or a join error if the task
    /// panicked.
    pub async fn join(self) -> Result<Response<T>, BackgroundError> {
        Ok(self.handle.await??)
    }
}
