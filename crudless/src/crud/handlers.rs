use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::requests::{
    CreateRequest, DeleteRequest, GetAllRequest, GetRequest, MergeRequest, SaveRequest,
    SynchronizeRequest, UpdateRequest,
};
use super::{CrudEntity, SeaOrmContext};
use crate::errors::Failure;
use crate::handler::RequestHandler;
use crate::hooks::HookSet;
use crate::request::Request;
use crate::response::Response;

/// Core handler for every built-in request shape of `E`.
pub struct CrudHandler<E: CrudEntity> {
    context: Arc<SeaOrmContext>,
    hooks: Arc<HookSet>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: CrudEntity> CrudHandler<E> {
    #[must_use]
    pub fn new(context: Arc<SeaOrmContext>, hooks: Arc<HookSet>) -> Self {
        Self {
            context,
            hooks,
            _entity: PhantomData,
        }
    }

    async fn before<R: Request>(&self, request: &R, token: &CancellationToken) -> Result<(), Failure> {
        self.hooks.run_request_hooks(request, token).await?;
        if token.is_cancelled() {
            return Err(Failure::RequestCanceled);
        }
        Ok(())
    }

    async fn respond<R: Request>(
        &self,
        request: &R,
        result: R::Result,
        token: &CancellationToken,
    ) -> Result<Response<R::Result>, Failure> {
        let mut response = Response::ok(result);
        self.hooks
            .run_result_hooks(request, &mut response, token)
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<CreateRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &CreateRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<E>, Failure> {
        self.before(request, token).await?;
        let entity = self.context.create::<E>(&request.item).await?;
        self.respond(request, entity, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<GetRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &GetRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<E>, Failure> {
        self.before(request, token).await?;
        let entity = self.context.get_one::<E>(request.id).await?;
        self.respond(request, entity, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<GetAllRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &GetAllRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<Vec<E>>, Failure> {
        self.before(request, token).await?;
        let entities = self
            .context
            .get_all::<E>(request.offset, request.limit)
            .await?;
        self.respond(request, entities, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<UpdateRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &UpdateRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<E>, Failure> {
        self.before(request, token).await?;
        let entity = self.context.update::<E>(request.id, &request.item).await?;
        self.respond(request, entity, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<DeleteRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &DeleteRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<E>, Failure> {
        self.before(request, token).await?;
        let entity = self.context.delete::<E>(request.id).await?;
        self.respond(request, entity, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<SaveRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &SaveRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<E>, Failure> {
        self.before(request, token).await?;
        let entity = self.context.save::<E>(request.id, &request.item).await?;
        self.respond(request, entity, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<MergeRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &MergeRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<Vec<E>>, Failure> {
        self.before(request, token).await?;
        let entities = self.context.merge::<E>(&request.items).await?;
        self.respond(request, entities, token).await
    }
}

#[async_trait]
impl<E: CrudEntity> RequestHandler<SynchronizeRequest<E>> for CrudHandler<E> {
    async fn handle(
        &self,
        request: &SynchronizeRequest<E>,
        token: &CancellationToken,
    ) -> Result<Response<Vec<E>>, Failure> {
        self.before(request, token).await?;
        let entities = self.context.synchronize::<E>(&request.items).await?;
        self.respond(request, entities, token).await
    }
}
