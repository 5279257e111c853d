use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::Level;

use crate::context::RequestContext;
use crate::error::RelayError;
use crate::handler::DynHandler;
use crate::http::Response;

pub type BoxMiddleware = Arc<dyn Middleware>;

#[async_trait(?Send)]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, RelayError>;
}

pub struct Next<'a> {
    middlewares: &'a [BoxMiddleware],
    handler: &'a dyn DynHandler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [BoxMiddleware], handler: &'a dyn DynHandler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    pub async fn run(self, ctx: RequestContext) -> Result<Response, RelayError> {
        match self.middlewares.split_first() {
            Some((head, tail)) => head.handle(ctx, Next::new(tail, self.handler)).await,
            None => self.handler.call(ctx).await,
        }
    }
}

/// Logs one line per request. The query string is left out so message text stays out of logs.
pub struct RequestLogger;

#[async_trait(?Send)]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, RelayError> {
        let method = ctx.request().method().clone();
        let path = ctx.request().uri().path().to_string();
        let start = Instant::now();

        let result = next.run(ctx).await;
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(response) => tracing::info!(
                "request method={} path={} status={} elapsed_ms={:.2}",
                method,
                path,
                response.status().as_u16(),
                elapsed
            ),
            Err(err) => match error_level(err) {
                Level::Error => tracing::error!(
                    "request method={} path={} status={} error={} elapsed_ms={:.2}",
                    method,
                    path,
                    err.status().as_u16(),
                    err,
                    elapsed
                ),
                Level::Warn => tracing::warn!(
                    "request method={} path={} status={} error={} elapsed_ms={:.2}",
                    method,
                    path,
                    err.status().as_u16(),
                    err,
                    elapsed
                ),
                _ => tracing::info!(
                    "request method={} path={} status={} elapsed_ms={:.2}",
                    method,
                    path,
                    err.status().as_u16(),
                    elapsed
                ),
            },
        }

        result
    }
}

/// Upstream failures are logged by the relay handler; their access line is recorded at `info`.
fn error_level(err: &RelayError) -> Level {
    match err {
        RelayError::Upstream { .. } => Level::Info,
        err if err.status().is_server_error() => Level::Error,
        _ => Level::Warn,
    }
}

pub struct FnMiddleware<F>
where
    F: Send + Sync + 'static,
{
    f: F,
}

impl<F> FnMiddleware<F>
where
    F: Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait(?Send)]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(RequestContext, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RelayError>>,
{
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, RelayError> {
        (self.f)(ctx, next).await
    }
}

pub fn middleware_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(RequestContext, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RelayError>>,
{
    FnMiddleware::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::error::UpstreamError;
    use crate::handler::IntoHandler;
    use crate::http::{request_builder, Method, StatusCode};
    use crate::response::response_with_body;
    use futures::executor::block_on;
    use std::sync::Mutex;

    struct RecordingMiddleware {
        log: Arc<Mutex<Vec<String>>>,
        name: &'static str,
    }

    #[async_trait(?Send)]
    impl Middleware for RecordingMiddleware {
        async fn handle(
            &self,
            ctx: RequestContext,
            next: Next<'_>,
        ) -> Result<Response, RelayError> {
            self.log.lock().unwrap().push(self.name.to_string());
            next.run(ctx).await
        }
    }

    fn context() -> RequestContext {
        let request = request_builder()
            .method(Method::GET)
            .uri("/api/chat")
            .body(Body::empty())
            .expect("request");
        RequestContext::new(request)
    }

    #[test]
    fn middleware_chain_runs_in_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<BoxMiddleware> = vec![
            Arc::new(RecordingMiddleware {
                log: Arc::clone(&log),
                name: "first",
            }),
            Arc::new(RecordingMiddleware {
                log: Arc::clone(&log),
                name: "second",
            }),
        ];
        let handler = (|_ctx: RequestContext| async move {
            Ok::<Response, RelayError>(response_with_body(StatusCode::OK, Body::empty()))
        })
        .into_handler();

        let response = block_on(Next::new(&middlewares, handler.as_ref()).run(context()))
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn fn_middleware_can_short_circuit() {
        let reached = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&reached);
        let middleware = middleware_fn(|_ctx, _next| async move {
            Err::<Response, RelayError>(RelayError::not_found("/blocked"))
        });
        let handler = (move |_ctx: RequestContext| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock().unwrap() = true;
                Ok::<Response, RelayError>(response_with_body(StatusCode::OK, Body::empty()))
            }
        })
        .into_handler();

        let middlewares: Vec<BoxMiddleware> = vec![Arc::new(middleware) as BoxMiddleware];
        let err = block_on(Next::new(&middlewares, handler.as_ref()).run(context()))
            .expect_err("short circuit");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn request_logger_passes_results_through() {
        let failing = (|_ctx: RequestContext| async move {
            Err::<Response, RelayError>(RelayError::missing_message())
        })
        .into_handler();
        let err = block_on(RequestLogger.handle(context(), Next::new(&[], failing.as_ref())))
            .expect_err("error passes through");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let ok = (|_ctx: RequestContext| async move {
            Ok::<Response, RelayError>(response_with_body(StatusCode::OK, Body::from("ok")))
        })
        .into_handler();
        let response = block_on(RequestLogger.handle(context(), Next::new(&[], ok.as_ref())))
            .expect("response");
        assert_eq!(response.body().as_bytes(), b"ok");
    }

    #[test]
    fn upstream_failures_are_not_logged_twice_at_error() {
        let upstream = RelayError::from(UpstreamError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
        });
        assert_eq!(error_level(&upstream), Level::Info);
        assert_eq!(
            error_level(&RelayError::configuration_missing("N8N_WEBHOOK_URL")),
            Level::Error
        );
        assert_eq!(error_level(&RelayError::missing_message()), Level::Warn);
    }
}
