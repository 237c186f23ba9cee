// Background dispatch: spawned jobs, per-job cancellation and shutdown

use crudless::{
    BackgroundError, BackgroundMediator, CancellationToken, DispatchError, Failure, Mediator,
    Request, RequestHandler, Response, async_trait,
};
use std::time::Duration;

#[derive(Request)]
#[crudless(result = u64)]
struct Square(u64);

#[derive(Request)]
#[crudless(result = u64)]
struct WaitForCancel;

#[derive(Request)]
struct Unhandled;

struct MathHandler;

#[async_trait]
impl RequestHandler<Square> for MathHandler {
    async fn handle(&self, request: &Square, _token: &CancellationToken) -> Result<Response<u64>, Failure> {
        Ok(Response::ok(request.0 * request.0))
    }
}

#[async_trait]
impl RequestHandler<WaitForCancel> for MathHandler {
    async fn handle(
        &self,
        _request: &WaitForCancel,
        token: &CancellationToken,
    ) -> Result<Response<u64>, Failure> {
        tokio::select! {
            () = token.cancelled() => Err(Failure::RequestCanceled),
            () = tokio::time::sleep(Duration::from_secs(30)) => Ok(Response::ok(0)),
        }
    }
}

fn background() -> BackgroundMediator {
    let mediator = Mediator::builder()
        .handler::<Square, _>(|_| Ok(MathHandler))
        .handler::<WaitForCancel, _>(|_| Ok(MathHandler))
        .build()
        .expect("Failed to build mediator");
    BackgroundMediator::new(mediator)
}

#[tokio::test]
async fn test_enqueued_job_completes() {
    let jobs = background();

    let response = jobs.enqueue(Square(7)).join().await.unwrap();

    assert_eq!(response.result(), Some(&49));
}

#[tokio::test]
async fn test_job_can_be_canceled() {
    let jobs = background();

    let job = jobs.enqueue(WaitForCancel);
    job.cancel();
    let response = job.join().await.unwrap();

    assert_eq!(response.status().as_u16(), 499);
}

#[tokio::test]
async fn test_shutdown_cancels_running_jobs() {
    let jobs = background();

    let first = jobs.enqueue(WaitForCancel);
    let second = jobs.enqueue(WaitForCancel);
    jobs.shutdown();

    assert!(jobs.is_shut_down());
    assert_eq!(first.join().await.unwrap().status().as_u16(), 499);
    assert_eq!(second.join().await.unwrap().status().as_u16(), 499);
}

#[tokio::test]
async fn test_dispatch_errors_surface_from_join() {
    let jobs = background();

    let err = jobs.enqueue(Unhandled).join().await.unwrap_err();

    assert!(matches!(
        err,
        BackgroundError::Dispatch(DispatchError::HandlerNotRegistered { .. })
    ));
}
