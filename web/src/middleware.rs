//! Correlation id tracking.
//!
//! Every request gets a [`CorrelationId`]: the one sent in
//! `X-Correlation-ID` if it is a valid UUID, otherwise a fresh one. The id is
//! stored in request extensions, recorded on an `http_request` span wrapping
//! the handler, and echoed in the response header.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use complaint_desk_web::middleware::correlation_id_layer;
//!
//! let app = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(correlation_id_layer());
//! ```

use crate::extractors::CorrelationId;
use axum::{extract::Request, http::HeaderValue, response::Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the correlation id layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = CorrelationId::from_headers(req.headers())
            .unwrap_or_else(|| CorrelationId(Uuid::new_v4()));
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id.0,
            method = %req.method(),
            uri = %req.uri(),
            status = tracing::field::Empty,
        );

        let fut = self.inner.call(req).instrument(span.clone());

        Box::pin(async move {
            let mut response = fut.await?;
            span.record("status", response.status().as_u16());

            if let Ok(value) = HeaderValue::from_str(&correlation_id.0.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}
