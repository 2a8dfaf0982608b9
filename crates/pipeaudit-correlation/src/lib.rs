//! # pipeaudit-correlation
//!
//! Tower/Axum middleware that gives every request a correlation id.
//!
//! - **Header extraction**: reads `X-Correlation-ID` (configurable)
//! - **Generation**: mints a UUID-based id when the caller sent none
//! - **Ambient binding**: the inner service runs inside
//!   [`pipeaudit_core::correlation::scope`], so audit events logged while
//!   handling the request pick the id up without it being passed around
//! - **Echo**: the resolved id is returned on the response header
//! - **Error responses**: malformed ids are rejected with a JSON `400`
//!
//! ```rust,ignore
//! use axum::{routing::post, Extension, Router};
//! use pipeaudit_core::CorrelationId;
//! use pipeaudit_correlation::CorrelationLayer;
//!
//! async fn handler(Extension(id): Extension<CorrelationId>) -> String {
//!     format!("handling {id}")
//! }
//!
//! let app = Router::new()
//!     .route("/audit/events", post(handler))
//!     .layer(CorrelationLayer::new());
//! ```

mod config;
mod error;
mod extract;
mod layer;
mod service;

pub use config::{CorrelationConfig, CorrelationConfigBuilder, DEFAULT_HEADER_NAME};
pub use error::{CorrelationError, ErrorResponse};
pub use extract::{extract_from_header, resolve_correlation_id, CorrelationContext};
pub use layer::CorrelationLayer;
pub use service::{CorrelationService, CorrelationServiceFuture};
