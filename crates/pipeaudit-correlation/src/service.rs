//! Tower Service implementation for correlation middleware.

use crate::config::CorrelationConfig;
use crate::error::CorrelationError;
use crate::extract::resolve_correlation_id;
use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderName, HeaderValue, Request, Response};
use pin_project_lite::pin_project;
use pipeaudit_core::{correlation, CorrelationId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tower_service::Service;

/// Service that resolves a request's correlation id and binds it for the
/// duration of the inner call.
///
/// For every request it:
/// 1. reads the configured header, or generates an id when allowed
/// 2. inserts [`CorrelationId`] and [`CorrelationContext`](crate::CorrelationContext)
///    into request extensions
/// 3. polls the inner future inside [`correlation::scope`] so
///    [`correlation::current`] sees the id
/// 4. echoes the id on the response header
///
/// Invalid ids are rejected with a JSON `400` without calling the inner
/// service.
#[derive(Debug, Clone)]
pub struct CorrelationService<S> {
    inner: S,
    config: Arc<CorrelationConfig>,
}

impl<S> CorrelationService<S> {
    pub fn new(inner: S, config: Arc<CorrelationConfig>) -> Self {
        Self { inner, config }
    }

    fn echo_pair(&self, id: &CorrelationId) -> Option<(HeaderName, HeaderValue)> {
        if !self.config.echo_header {
            return None;
        }
        let name = HeaderName::from_bytes(self.config.header_name.as_bytes()).ok()?;
        let value = HeaderValue::from_str(id.as_str()).ok()?;
        Some((name, value))
    }
}

impl<S, ReqBody> Service<Request<ReqBody>> for CorrelationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = CorrelationServiceFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        match resolve_correlation_id(&req, &self.config) {
            Ok(ctx) => {
                let id = ctx.correlation_id().clone();
                tracing::debug!(
                    correlation_id = %id,
                    generated = ctx.was_generated(),
                    "Correlation context resolved"
                );

                let echo = self.echo_pair(&id);
                req.extensions_mut().insert(id.clone());
                req.extensions_mut().insert(ctx);

                // The clone may not be ready; keep the one that was polled.
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);

                CorrelationServiceFuture::Scoped {
                    future: correlation::scope(id, inner.call(req)),
                    echo,
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Correlation context rejected");
                CorrelationServiceFuture::Rejected { error: Some(error) }
            }
        }
    }
}

pin_project! {
    /// Response future for [`CorrelationService`].
    #[project = CorrelationServiceFutureProj]
    pub enum CorrelationServiceFuture<F> {
        Scoped {
            #[pin]
            future: correlation::Scoped<F>,
            echo: Option<(HeaderName, HeaderValue)>,
        },
        Rejected {
            error: Option<CorrelationError>,
        },
    }
}

impl<F, E> Future for CorrelationServiceFuture<F>
where
    F: Future<Output = Result<Response<Body>, E>>,
{
    type Output = Result<Response<Body>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            CorrelationServiceFutureProj::Scoped { future, echo } => {
                let mut response = ready!(future.poll(cx))?;
                if let Some((name, value)) = echo.take() {
                    response.headers_mut().insert(name, value);
                }
                Poll::Ready(Ok(response))
            }
            CorrelationServiceFutureProj::Rejected { error } => {
                let err = error.take().unwrap_or(CorrelationError::Missing);
                Poll::Ready(Ok(err.into_response()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CorrelationContext;
    use crate::layer::CorrelationLayer;
    use http::StatusCode;
    use std::convert::Infallible;
    use tower::ServiceExt;
    use tower_layer::Layer;

    /// Inner service that reports what it observed: the extension, the
    /// ambient binding, and whether the id was generated.
    #[derive(Clone)]
    struct EchoContextService;

    impl Service<Request<Body>> for EchoContextService {
        type Response = Response<Body>;
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Body>) -> Self::Future {
            let from_extension = req
                .extensions()
                .get::<CorrelationId>()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default();
            let generated = req
                .extensions()
                .get::<CorrelationContext>()
                .is_some_and(CorrelationContext::was_generated);

            Box::pin(async move {
                tokio::task::yield_now().await;
                let ambient = correlation::current()
                    .map(|id| id.into_inner())
                    .unwrap_or_default();
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("x-seen-extension", from_extension)
                    .header("x-seen-ambient", ambient)
                    .header("x-seen-generated", generated.to_string())
                    .body(Body::empty())
                    .unwrap())
            })
        }
    }

    fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_supplied_id_reaches_handler_and_response() {
        let service = CorrelationLayer::new().layer(EchoContextService);

        let request = Request::builder()
            .header("X-Correlation-ID", "batch-2024-06-01")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-seen-extension"), "batch-2024-06-01");
        assert_eq!(header(&response, "x-seen-ambient"), "batch-2024-06-01");
        assert_eq!(header(&response, "x-seen-generated"), "false");
        assert_eq!(header(&response, "x-correlation-id"), "batch-2024-06-01");
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let service = CorrelationLayer::new().layer(EchoContextService);

        let request = Request::builder().body(Body::empty()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = header(&response, "x-correlation-id").to_string();
        assert!(!echoed.is_empty());
        assert_eq!(header(&response, "x-seen-ambient"), echoed);
        assert_eq!(header(&response, "x-seen-generated"), "true");
    }

    #[tokio::test]
    async fn test_missing_id_rejected_when_generation_disabled() {
        let config = CorrelationConfig::builder()
            .generate_if_missing(false)
            .build();
        let service = CorrelationLayer::with_config(config).layer(EchoContextService);

        let request = Request::builder().body(Body::empty()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("x-seen-extension").is_none());
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let service = CorrelationLayer::new().layer(EchoContextService);

        let request = Request::builder()
            .header("X-Correlation-ID", "z".repeat(300))
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_echo_can_be_disabled() {
        let config = CorrelationConfig::builder().echo_header(false).build();
        let service = CorrelationLayer::with_config(config).layer(EchoContextService);

        let request = Request::builder()
            .header("X-Correlation-ID", "quiet")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-correlation-id").is_none());
        assert_eq!(header(&response, "x-seen-ambient"), "quiet");
    }

    #[tokio::test]
    async fn test_binding_ends_with_request() {
        let service = CorrelationLayer::new().layer(EchoContextService);

        let request = Request::builder()
            .header("X-Correlation-ID", "short-lived")
            .body(Body::empty())
            .unwrap();
        let _ = service.oneshot(request).await.unwrap();

        assert_ne!(
            correlation::current().map(CorrelationId::into_inner),
            Some("short-lived".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_stay_isolated() {
        let service = CorrelationLayer::new().layer(EchoContextService);

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("run-{i}");
                let request = Request::builder()
                    .header("X-Correlation-ID", id.as_str())
                    .body(Body::empty())
                    .unwrap();
                let response = service.oneshot(request).await.unwrap();
                (id, header(&response, "x-seen-ambient").to_string())
            }));
        }

        for handle in handles {
            let (sent, seen) = handle.await.unwrap();
            assert_eq!(sent, seen);
        }
    }
}
