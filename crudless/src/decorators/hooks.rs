use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::Failure;
use crate::handler::RequestHandler;
use crate::hooks::HookSet;
use crate::request::Request;
use crate::response::Response;

/// Runs universal hooks around a user handler.
///
/// Result hooks only run when the handler's response has no errors.
pub struct UniversalHooksDecorator<R: Request> {
    inner: Arc<dyn RequestHandler<R>>,
    hooks: Arc<HookSet>,
}

impl<R: Request> UniversalHooksDecorator<R> {
    pub fn new(inner: Arc<dyn RequestHandler<R>>, hooks: Arc<HookSet>) -> Self {
        Self { inner, hooks }
    }
}

#[async_trait]
impl<R: Request> RequestHandler<R> for UniversalHooksDecorator<R> {
    async fn handle(
        &self,
        request: &R,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, Failure> {
        self.hooks.run_request_hooks(request, token).await?;

        let mut response = self.inner.handle(request, token).await?;
        if !response.has_errors() {
            self.hooks
                .run_result_hooks(request, &mut response, token)
                .await?;
        }
        Ok(response)
    }
}
