//! Tower Layer for correlation id propagation.

use crate::config::CorrelationConfig;
use crate::service::CorrelationService;
use std::sync::Arc;
use tower_layer::Layer;

/// Wraps services with [`CorrelationService`].
///
/// ```rust,ignore
/// use axum::{routing::post, Router};
/// use pipeaudit_correlation::CorrelationLayer;
///
/// let app = Router::new()
///     .route("/audit/events", post(log_event))
///     .layer(CorrelationLayer::new());
/// ```
#[derive(Debug, Clone)]
pub struct CorrelationLayer {
    config: Arc<CorrelationConfig>,
}

impl CorrelationLayer {
    /// Layer reading `X-Correlation-ID`, generating ids when absent and
    /// echoing them on responses.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CorrelationConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CorrelationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }
}

impl Default for CorrelationLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationService::new(inner, Arc::clone(&self.config))
    }
}
