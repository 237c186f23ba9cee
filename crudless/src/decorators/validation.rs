use async_trait::async_trait;
use std::any::type_name;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::errors::Failure;
use crate::handler::RequestHandler;
use crate::request::Request;
use crate::response::Response;
use crate::validation::RequestValidator;

/// Runs the request's validator and short-circuits on rule violations.
///
/// Required and maybe validation only differ in how the validator is
/// resolved; once one is found both behave the same.
pub struct ValidationDecorator<R: Request> {
    inner: Arc<dyn RequestHandler<R>>,
    validator: Arc<dyn RequestValidator<R>>,
}

impl<R: Request> ValidationDecorator<R> {
    pub fn new(inner: Arc<dyn RequestHandler<R>>, validator: Arc<dyn RequestValidator<R>>) -> Self {
        Self { inner, validator }
    }
}

#[async_trait]
impl<R: Request> RequestHandler<R> for ValidationDecorator<R> {
    async fn handle(
        &self,
        request: &R,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, Failure> {
        trace!(request = type_name::<R>(), "Validating request");

        let errors = self.validator.validate(request, token).await?;
        if !errors.is_empty() {
            debug!(
                request = type_name::<R>(),
                count = errors.len(),
                "Request failed validation"
            );
            return Ok(Response::from_validation(errors));
        }

        self.inner.handle(request, token).await
    }
}
