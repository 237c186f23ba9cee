// Validation decorator: required, maybe and validate-all modes

use crudless::validation::validators;
use crudless::{
    CancellationToken, CrudlessOptions, DispatchError, Failure, Mediator, Request, RequestHandler,
    RequestProfile, RequestValidator, ResolveError, Response, Validatable, ValidatableValidator,
    ValidationError, async_trait,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Request)]
#[crudless(result = String, validate)]
struct Register {
    username: String,
}

#[derive(Request)]
#[crudless(result = String, maybe_validate)]
struct Rename {
    title: String,
}

#[derive(Request)]
#[crudless(result = String, skip_validation)]
struct Import {
    title: String,
}

#[derive(Request)]
#[crudless(result = String)]
struct Plain {
    title: String,
}

impl Validatable for Rename {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Err(error) = validators::validate_length("title", &self.title, Some(1), Some(20)) {
            errors.push(error);
        }
        errors
    }
}

struct TitleRule;

#[async_trait]
impl<R> RequestValidator<R> for TitleRule
where
    R: Request + HasTitle,
{
    async fn validate(
        &self,
        request: &R,
        _token: &CancellationToken,
    ) -> Result<Vec<ValidationError>, Failure> {
        if request.title().is_empty() {
            Ok(vec![ValidationError::new("title", "Title is required")])
        } else {
            Ok(Vec::new())
        }
    }
}

trait HasTitle {
    fn title(&self) -> &str;
}

impl HasTitle for Register {
    fn title(&self) -> &str {
        &self.username
    }
}

impl HasTitle for Import {
    fn title(&self) -> &str {
        &self.title
    }
}

impl HasTitle for Plain {
    fn title(&self) -> &str {
        &self.title
    }
}

struct Upper {
    calls: Arc<AtomicUsize>,
}

macro_rules! upper_handler {
    ($request:ty, $field:ident) => {
        #[async_trait]
        impl RequestHandler<$request> for Upper {
            async fn handle(
                &self,
                request: &$request,
                _token: &CancellationToken,
            ) -> Result<Response<String>, Failure> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(Response::ok(request.$field.to_uppercase()))
            }
        }
    };
}

upper_handler!(Register, username);
upper_handler!(Rename, title);
upper_handler!(Import, title);
upper_handler!(Plain, title);

fn counted(calls: &Arc<AtomicUsize>) -> Upper {
    Upper {
        calls: Arc::clone(calls),
    }
}

#[tokio::test]
async fn test_required_validation_rejects_invalid_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Register, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Register>(TitleRule)
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Register {
                username: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(response.has_errors());
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.errors()[0].property_name.as_deref(), Some("title"));
    assert_eq!(response.errors()[0].error_message, "Title is required");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_required_validation_passes_valid_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Register, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Register>(TitleRule)
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Register {
                username: "ada".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.result().map(String::as_str), Some("ADA"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_required_validation_without_validator_is_a_resolve_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Register, _>(move |_| Ok(counted(&handler_calls)))
        .build()
        .unwrap();

    let err = mediator
        .handle(
            Register {
                username: "ada".to_string(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Resolve {
            source: ResolveError::NotRegistered { .. },
            ..
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_maybe_validation_skips_when_no_validator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Rename, _>(move |_| Ok(counted(&handler_calls)))
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Rename {
                title: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!response.has_errors());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_maybe_validation_uses_validatable_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Rename, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Rename>(ValidatableValidator::new())
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Rename {
                title: "x".repeat(21),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_maybe_validation_surfaces_broken_validator() {
    let mediator = Mediator::builder()
        .handler::<Rename, _>(|_| Ok(counted(&Arc::new(AtomicUsize::new(0)))))
        .services(|services| {
            services.add_singleton::<Arc<dyn RequestValidator<Rename>>, _>(|_| {
                Err(ResolveError::factory::<TitleRule>("rules file missing"))
            });
        })
        .build()
        .unwrap();

    let err = mediator
        .handle(
            Rename {
                title: "ok".to_string(),
            },
            &CancellationToken::new(),
        )
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
async fn test_validate_all_by_default_applies_registered_validators() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .options(CrudlessOptions {
            validate_all_requests_by_default: true,
            ..CrudlessOptions::default()
        })
        .handler::<Plain, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Plain>(TitleRule)
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Plain {
                title: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_validator_is_ignored_without_marker_or_option() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Plain, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Plain>(TitleRule)
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Plain {
                title: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!response.has_errors());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_skip_validation_beats_validate_all() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .options(CrudlessOptions {
            validate_all_requests_by_default: true,
            ..CrudlessOptions::default()
        })
        .handler::<Import, _>(move |_| Ok(counted(&handler_calls)))
        .validator::<Import>(TitleRule)
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Import {
                title: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!response.has_errors());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_profile_validator_forces_validation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler::<Plain, _>(move |_| Ok(counted(&handler_calls)))
        .configure(RequestProfile::<Plain>::new().validator(TitleRule))
        .build()
        .unwrap();

    let response = mediator
        .handle(
            Plain {
                title: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
