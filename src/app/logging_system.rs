use super::config::{LogFormat, LogLevel};
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log directive '{directive}': {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: ParseError,
    },
    #[error("Logging system initialization failed: {0}")]
    InitFailed(String),
}

/// Collects filter directives and installs the global subscriber.
pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<Directive>>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), LoggingError> {
        let directive =
            Directive::from_str(directive_str).map_err(|source| LoggingError::InvalidDirective {
                directive: directive_str.to_string(),
                source,
            })?;
        self.directives.write().push(directive);
        Ok(())
    }

    /// Quiets the HTTP and AWS client stacks.
    pub fn add_default_directives(&self) -> Result<(), LoggingError> {
        for target in ["hyper", "reqwest", "h2", "aws_smithy_runtime", "aws_config"] {
            self.add_directive(&format!("{target}=warn"))?;
        }
        Ok(())
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(ToString::to_string));
        filter_parts.join(",")
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter = EnvFilter::try_new(&filter_string).map_err(|source| {
            LoggingError::InvalidDirective {
                directive: filter_string.clone(),
                source,
            }
        })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match format {
            LogFormat::Json => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_current_span(false),
                ),
            ),
            LogFormat::Text => tracing::subscriber::set_global_default(
                registry.with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(true)
                        .compact(),
                ),
            ),
        };

        result.map_err(|e| LoggingError::InitFailed(e.to_string()))
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global subscriber once; later calls return the first outcome.
pub fn setup_logging_safe(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system
            .add_default_directives()
            .and_then(|()| logging_system.initialize_tracing(level, format))
            .map_err(|e| e.to_string())
    })
    .clone()
    .map_err(LoggingError::InitFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_system_creation() {
        assert_eq!(LoggingSystem::new().directive_count(), 0);
    }

    #[test]
    fn test_default_directives() {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives().unwrap();
        assert_eq!(logging_system.directive_count(), 5);

        let filter = logging_system.build_filter_string(LogLevel::Debug);
        assert!(filter.starts_with("debug,"));
        assert!(filter.contains("aws_smithy_runtime=warn"));
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let logging_system = LoggingSystem::new();
        let err = logging_system.add_directive("hyper=loud").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidDirective { .. }));
        assert_eq!(logging_system.directive_count(), 0);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let first = setup_logging_safe(LogLevel::Info, LogFormat::Text).is_ok();
        let second = setup_logging_safe(LogLevel::Debug, LogFormat::Json).is_ok();
        assert_eq!(first, second);
    }
}
