// Mediator dispatch: handler lookup, binding cache, no-result fallback,
// scoping and cancellation before dispatch

use crudless::{
    CancellationToken, CommandHandler, CrudlessOptions, DispatchError, Failure, HandlerShape,
    Mediator, RegistrationError, Request, RequestHandler, ResolveError, Response, Scope,
    async_trait,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Barrier;

mod common;

#[derive(Request)]
#[crudless(result = String)]
struct Echo {
    message: String,
}

struct EchoHandler;

#[async_trait]
impl RequestHandler<Echo> for EchoHandler {
    async fn handle(
        &self,
        request: &Echo,
        _token: &CancellationToken,
    ) -> Result<Response<String>, Failure> {
        Ok(Response::ok(request.message.clone()))
    }
}

#[derive(Request)]
struct Archive;

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    fn push(&self, entry: &'static str) {
        self.0.lock().push(entry);
    }

    fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

struct ArchiveCommand(CallLog);

#[async_trait]
impl CommandHandler<Archive> for ArchiveCommand {
    async fn handle(&self, _request: &Archive, _token: &CancellationToken) -> Result<Response, Failure> {
        self.0.push("command");
        Ok(Response::success())
    }
}

struct ArchiveHandler(CallLog);

#[async_trait]
impl RequestHandler<Archive> for ArchiveHandler {
    async fn handle(&self, _request: &Archive, _token: &CancellationToken) -> Result<Response, Failure> {
        self.0.push("request");
        Ok(Response::success())
    }
}

#[derive(Request)]
#[crudless(result = usize)]
struct Measure {
    text: String,
}

struct MeasureHandler;

#[async_trait]
impl RequestHandler<Measure> for MeasureHandler {
    async fn handle(
        &self,
        request: &Measure,
        _token: &CancellationToken,
    ) -> Result<Response<usize>, Failure> {
        Ok(Response::ok(request.text.len()))
    }
}

fn echo(message: &str) -> Echo {
    Echo {
        message: message.to_string(),
    }
}

fn echo_mediator() -> Mediator {
    Mediator::builder()
        .handler::<Echo, _>(|_| Ok(EchoHandler))
        .build()
        .expect("Failed to build mediator")
}

#[tokio::test]
async fn test_dispatch_returns_handler_result() {
    common::init_tracing();
    let mediator = echo_mediator();

    let response = mediator
        .handle(echo("Bar"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!response.has_errors());
    assert_eq!(response.result().map(String::as_str), Some("Bar"));
}

#[tokio::test]
async fn test_binding_is_resolved_once_per_request_type() {
    let mediator = echo_mediator();
    let token = CancellationToken::new();

    mediator.handle(echo("one"), &token).await.unwrap();
    mediator.handle(echo("two"), &token).await.unwrap();

    assert_eq!(mediator.registry().resolutions(), 1);
}

#[tokio::test]
async fn test_missing_handler_is_a_dispatch_error() {
    let mediator = echo_mediator();

    let err = mediator
        .handle(Archive, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::HandlerNotRegistered { .. }));
    assert!(!mediator.registry().is_registered::<Archive>());
}

#[tokio::test]
async fn test_command_handler_for_no_result_request() {
    let log = CallLog::default();
    let command_log = log.clone();
    let mediator = Mediator::builder()
        .command::<Archive, _>(move |_| Ok(ArchiveCommand(command_log.clone())))
        .build()
        .unwrap();

    let response = mediator.handle(Archive, &CancellationToken::new()).await.unwrap();

    assert!(!response.has_errors());
    assert!(response.result().is_none());
    assert_eq!(log.entries(), vec!["command"]);
}

#[tokio::test]
async fn test_no_result_request_falls_back_to_request_handler() {
    let log = CallLog::default();
    let handler_log = log.clone();
    let mediator = Mediator::builder()
        .handler::<Archive, _>(move |_| Ok(ArchiveHandler(handler_log.clone())))
        .build()
        .unwrap();

    let response = mediator.handle(Archive, &CancellationToken::new()).await.unwrap();

    assert!(!response.has_errors());
    assert_eq!(log.entries(), vec!["request"]);
    let binding = mediator.registry().binding::<Archive>().unwrap();
    assert_eq!(binding.shape(), HandlerShape::WithResult);
}

#[tokio::test]
async fn test_command_shape_is_preferred_when_both_exist() {
    let log = CallLog::default();
    let (command_log, handler_log) = (log.clone(), log.clone());
    let mediator = Mediator::builder()
        .handler::<Archive, _>(move |_| Ok(ArchiveHandler(handler_log.clone())))
        .command::<Archive, _>(move |_| Ok(ArchiveCommand(command_log.clone())))
        .build()
        .unwrap();

    mediator.handle(Archive, &CancellationToken::new()).await.unwrap();

    assert_eq!(log.entries(), vec!["command"]);
    assert_eq!(mediator.registry().len(), 2);
}

#[tokio::test]
async fn test_duplicate_handler_fails_build() {
    let result = Mediator::builder()
        .handler::<Echo, _>(|_| Ok(EchoHandler))
        .handler::<Echo, _>(|_| Ok(EchoHandler))
        .build();

    assert!(matches!(
        result,
        Err(RegistrationError::DuplicateHandler {
            shape: HandlerShape::WithResult,
            ..
        })
    ));
}

#[tokio::test]
async fn test_canceled_token_short_circuits_dispatch() {
    let log = CallLog::default();
    let command_log = log.clone();
    let mediator = Mediator::builder()
        .command::<Archive, _>(move |_| Ok(ArchiveCommand(command_log.clone())))
        .build()
        .unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let response = mediator.handle(Archive, &token).await.unwrap();

    assert!(response.has_errors());
    assert_eq!(response.status().as_u16(), 499);
    assert_eq!(response.errors()[0].error_message, "The request was canceled.");
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_handler_factory_failure_is_a_resolve_error() {
    let mediator = Mediator::builder()
        .handler::<Echo, EchoHandler>(|_| Err(ResolveError::factory::<EchoHandler>("no config")))
        .build()
        .unwrap();

    let err = mediator
        .handle(echo("x"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Resolve {
            source: ResolveError::Factory { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_dynamic_dispatch_erases_result_type() {
    let mediator = echo_mediator();

    let response = mediator
        .handle_dyn(Box::new(echo("dynamic")), &CancellationToken::new())
        .await
        .unwrap();

    let result = response.into_result().unwrap().unwrap();
    assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("dynamic"));
}

static NEXT_MARKER: AtomicUsize = AtomicUsize::new(0);

struct ScopeMarker(usize);

#[derive(Request)]
#[crudless(result = usize)]
struct WhichScope;

struct WhichScopeHandler {
    marker: Arc<ScopeMarker>,
}

#[async_trait]
impl RequestHandler<WhichScope> for WhichScopeHandler {
    async fn handle(
        &self,
        _request: &WhichScope,
        _token: &CancellationToken,
    ) -> Result<Response<usize>, Failure> {
        Ok(Response::ok(self.marker.0))
    }
}

fn scoped_mediator(use_request_scoping: bool) -> Mediator {
    Mediator::builder()
        .options(CrudlessOptions {
            use_request_scoping,
            ..CrudlessOptions::default()
        })
        .services(|services| {
            services.add_scoped::<Arc<ScopeMarker>, _>(|_| {
                Ok(Arc::new(ScopeMarker(NEXT_MARKER.fetch_add(1, Ordering::SeqCst))))
            });
        })
        .handler::<WhichScope, _>(|scope: &Scope| {
            Ok(WhichScopeHandler {
                marker: scope.resolve::<Arc<ScopeMarker>>()?,
            })
        })
        .build()
        .unwrap()
}

async fn marker_of(mediator: &Mediator) -> usize {
    let response = mediator
        .handle(WhichScope, &CancellationToken::new())
        .await
        .unwrap();
    *response.result().unwrap()
}

#[tokio::test]
async fn test_each_dispatch_gets_its_own_scope() {
    let mediator = scoped_mediator(true);
    assert_ne!(marker_of(&mediator).await, marker_of(&mediator).await);
}

#[tokio::test]
async fn test_ambient_scope_when_request_scoping_is_off() {
    let mediator = scoped_mediator(false);
    assert_eq!(marker_of(&mediator).await, marker_of(&mediator).await);
}

#[tokio::test]
async fn test_explicit_scope_is_shared_across_dispatches() {
    let mediator = scoped_mediator(true);
    let scope = mediator.create_scope();
    let token = CancellationToken::new();

    let first = mediator.handle_in_scope(WhichScope, &scope, &token).await.unwrap();
    let second = mediator.handle_in_scope(WhichScope, &scope, &token).await.unwrap();

    assert_eq!(first.result(), second.result());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_resolution_is_safe() {
    const TASKS: usize = 32;
    let mediator = Mediator::builder()
        .handler::<Echo, _>(|_| Ok(EchoHandler))
        .handler::<Measure, _>(|_| Ok(MeasureHandler))
        .build()
        .unwrap();
    assert_eq!(mediator.registry().resolutions(), 0);
    let barrier = Arc::new(Barrier::new(TASKS));

    let tasks: Vec<_> = (0..TASKS)
        .map(|i| {
            let (mediator, barrier) = (mediator.clone(), Arc::clone(&barrier));
            tokio::spawn(async move {
                barrier.wait().await;
                let token = CancellationToken::new();
                let text = "x".repeat(i);
                if i % 2 == 0 {
                    let response = mediator.handle(echo(&text), &token).await.unwrap();
                    assert_eq!(response.result(), Some(&text));
                } else {
                    let response = mediator.handle(Measure { text }, &token).await.unwrap();
                    assert_eq!(response.result(), Some(&i));
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let resolutions = mediator.registry().resolutions();
    assert!(
        (2..=TASKS as u64).contains(&resolutions),
        "resolutions = {resolutions}"
    );

    mediator
        .handle(Measure { text: "warm".to_string() }, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(mediator.registry().resolutions(), resolutions);
}
