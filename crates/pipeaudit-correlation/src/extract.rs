//! Correlation id resolution from HTTP requests.

use crate::config::CorrelationConfig;
use crate::error::CorrelationError;
use http::Request;
use pipeaudit_core::{AuditError, CorrelationId};

/// Resolved correlation context, inserted into request extensions next to
/// the bare [`CorrelationId`].
///
/// ```rust,ignore
/// use axum::Extension;
/// use pipeaudit_correlation::CorrelationContext;
///
/// async fn handler(Extension(ctx): Extension<CorrelationContext>) -> String {
///     format!("run {} (generated: {})", ctx.correlation_id(), ctx.was_generated())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    correlation_id: CorrelationId,
    generated: bool,
}

impl CorrelationContext {
    #[must_use]
    pub fn supplied(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            generated: false,
        }
    }

    #[must_use]
    pub fn generated(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            generated: true,
        }
    }

    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// True when the middleware minted the id because the caller sent none.
    #[must_use]
    pub fn was_generated(&self) -> bool {
        self.generated
    }
}

impl From<CorrelationContext> for CorrelationId {
    fn from(ctx: CorrelationContext) -> Self {
        ctx.correlation_id
    }
}

/// Resolves the correlation id for a request.
///
/// The configured header wins. Without it a fresh id is generated when the
/// config allows, otherwise the request is rejected as
/// [`CorrelationError::Missing`].
pub fn resolve_correlation_id<B>(
    req: &Request<B>,
    config: &CorrelationConfig,
) -> Result<CorrelationContext, CorrelationError> {
    match extract_from_header(req, &config.header_name) {
        Ok(id) => Ok(CorrelationContext::supplied(id)),
        Err(CorrelationError::Missing) if config.generate_if_missing => {
            Ok(CorrelationContext::generated(CorrelationId::generate()))
        }
        Err(err) => Err(err),
    }
}

/// Reads a correlation id from `header_name`.
///
/// # Errors
///
/// `Missing` when the header is absent or blank, `InvalidFormat` when it is
/// not UTF-8 or fails [`CorrelationId::parse`].
pub fn extract_from_header<B>(
    req: &Request<B>,
    header_name: &str,
) -> Result<CorrelationId, CorrelationError> {
    let header_value = req
        .headers()
        .get(header_name)
        .ok_or(CorrelationError::Missing)?;

    let value_str = header_value.to_str().map_err(|_| {
        CorrelationError::InvalidFormat("header value is not valid UTF-8".to_string())
    })?;

    if value_str.trim().is_empty() {
        return Err(CorrelationError::Missing);
    }

    CorrelationId::parse(value_str).map_err(|err| match err {
        AuditError::ValidationError { message, .. } => CorrelationError::InvalidFormat(message),
        other => CorrelationError::InvalidFormat(other.to_string()),
    })
}
