//! Configuration for the correlation middleware.

/// Default header carrying the correlation id.
pub const DEFAULT_HEADER_NAME: &str = "X-Correlation-ID";

/// Settings for [`CorrelationLayer`](crate::CorrelationLayer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationConfig {
    /// Request header the id is read from (and echoed on).
    pub header_name: String,
    /// Mint a fresh id when the header is absent. When false a missing header
    /// is rejected with `400`.
    pub generate_if_missing: bool,
    /// Copy the resolved id onto the response.
    pub echo_header: bool,
}

impl CorrelationConfig {
    #[must_use]
    pub fn builder() -> CorrelationConfigBuilder {
        CorrelationConfigBuilder::default()
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            generate_if_missing: true,
            echo_header: true,
        }
    }
}

/// Builder for [`CorrelationConfig`].
#[derive(Debug, Clone, Default)]
pub struct CorrelationConfigBuilder {
    config: CorrelationConfig,
}

impl CorrelationConfigBuilder {
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.config.header_name = name.into();
        self
    }

    #[must_use]
    pub fn generate_if_missing(mut self, generate: bool) -> Self {
        self.config.generate_if_missing = generate;
        self
    }

    #[must_use]
    pub fn echo_header(mut self, echo: bool) -> Self {
        self.config.echo_header = echo;
        self
    }

    #[must_use]
    pub fn build(self) -> CorrelationConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorrelationConfig::default();
        assert_eq!(config.header_name, "X-Correlation-ID");
        assert!(config.generate_if_missing);
        assert!(config.echo_header);
    }

    #[test]
    fn test_builder_overrides() {
        let config = CorrelationConfig::builder()
            .header_name("X-Run-ID")
            .generate_if_missing(false)
            .echo_header(false)
            .build();

        assert_eq!(config.header_name, "X-Run-ID");
        assert!(!config.generate_if_missing);
        assert!(!config.echo_header);
    }
}
