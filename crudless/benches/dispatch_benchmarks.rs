/*!
# Dispatch Benchmarks

Measures mediator overhead: cached dispatch, first-time binding resolution
and a fully decorated chain.

## Usage

```bash
# Run all benchmarks
cargo bench --bench dispatch_benchmarks

# Run one group
cargo bench --bench dispatch_benchmarks -- "Dispatch"

# Quick run with fewer samples
cargo bench --bench dispatch_benchmarks -- --quick
```

HTML reports are generated in `target/criterion/report/index.html`.
*/

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use crudless::{
    CancellationToken, Failure, Mediator, Request, RequestHandler, RequestProfile,
    RequestValidator, Response, ValidationError, async_trait, request_hook, result_hook,
};
use std::hint::black_box;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Request)]
#[crudless(result = String)]
struct Echo {
    message: String,
}

#[derive(Request)]
#[crudless(result = String, validate)]
struct DecoratedEcho {
    message: String,
}

struct EchoHandler;

#[async_trait]
impl RequestHandler<Echo> for EchoHandler {
    async fn handle(&self, request: &Echo, _token: &CancellationToken) -> Result<Response<String>, Failure> {
        Ok(Response::ok(request.message.clone()))
    }
}

#[async_trait]
impl RequestHandler<DecoratedEcho> for EchoHandler {
    async fn handle(
        &self,
        request: &DecoratedEcho,
        _token: &CancellationToken,
    ) -> Result<Response<String>, Failure> {
        Ok(Response::ok(request.message.clone()))
    }
}

struct NonEmpty;

#[async_trait]
impl RequestValidator<DecoratedEcho> for NonEmpty {
    async fn validate(
        &self,
        request: &DecoratedEcho,
        _token: &CancellationToken,
    ) -> Result<Vec<ValidationError>, Failure> {
        if request.message.is_empty() {
            return Ok(vec![ValidationError::new("message", "Message is required")]);
        }
        Ok(Vec::new())
    }
}

fn mediator() -> Mediator {
    Mediator::builder()
        .handler::<Echo, _>(|_| Ok(EchoHandler))
        .handler::<DecoratedEcho, _>(|_| Ok(EchoHandler))
        .configure(
            RequestProfile::<DecoratedEcho>::new()
                .validator(NonEmpty)
                .request_hook(request_hook::<DecoratedEcho, _>("noop", |_| Ok(())))
                .result_hook(result_hook::<DecoratedEcho, _>("trim", |_, message| {
                    message.truncate(16);
                    Ok(())
                })),
        )
        .build()
        .unwrap()
}

fn echo(message: &str) -> Echo {
    Echo {
        message: message.to_string(),
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let token = CancellationToken::new();
    let mut group = c.benchmark_group("Dispatch");

    let cached = mediator();
    rt.block_on(cached.handle(echo("warm"), &token)).unwrap();
    group.bench_function("cached", |b| {
        b.iter(|| rt.block_on(black_box(cached.handle(echo("Bar"), &token))));
    });

    group.bench_function("first_resolution", |b| {
        b.iter(|| {
            let fresh = mediator();
            rt.block_on(black_box(fresh.handle(echo("Bar"), &token)))
        });
    });

    group.bench_function("decorated", |b| {
        b.iter(|| {
            rt.block_on(black_box(cached.handle(
                DecoratedEcho {
                    message: "a fairly long message".to_string(),
                },
                &token,
            )))
        });
    });

    group.finish();
}

fn bench_concurrent_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let shared = mediator();
    let mut group = c.benchmark_group("Concurrent Dispatch");

    for tasks in [8_usize, 64] {
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &tasks, |b, &tasks| {
            b.iter(|| {
                rt.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|i| {
                            let mediator = shared.clone();
                            tokio::spawn(async move {
                                mediator
                                    .handle(echo(&i.to_string()), &CancellationToken::new())
                                    .await
                            })
                        })
                        .collect();
                    for handle in handles {
                        black_box(handle.await.unwrap().unwrap());
                    }
                });
            });
        });
    }

    group.finish();
}

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_dispatch, bench_concurrent_dispatch
}
criterion_main!(benches);
