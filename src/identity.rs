//! Per-process log stream identity.
//!
//! Every record shipped by one process carries the same stream name so the
//! log store can group them. The name is generated lazily, exactly once,
//! even when several ship calls race to resolve it first.

use crate::domain::ShipError;
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

pub const FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const LOG_STREAM_NAME_VAR: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Segment used when the hosting environment does not provide a value.
pub const PLACEHOLDER_SEGMENT: &str = "unknown";

/// Source of deployment-assigned environment values.
#[cfg_attr(test, automock)]
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed key/value environment, handy for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticEnv(HashMap<String, String>);

impl StaticEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

pub struct StreamIdentity {
    cell: OnceCell<String>,
    env: Box<dyn EnvSource>,
}

impl StreamIdentity {
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }

    pub fn with_env(env: impl EnvSource + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            env: Box::new(env),
        }
    }

    /// An identity that is already resolved to `identity`.
    pub fn fixed(identity: impl Into<String>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(identity.into())),
            env: Box::new(ProcessEnv),
        }
    }

    /// Returns the cached identity, generating it on first use.
    pub async fn resolve(&self) -> Result<&str, ShipError> {
        self.cell
            .get_or_try_init(|| async { self.generate() })
            .await
            .map(String::as_str)
    }

    /// Uses `identity_override` for this call only; the cache is untouched.
    pub async fn resolve_with(&self, identity_override: Option<&str>) -> Result<String, ShipError> {
        match identity_override {
            Some(identity) => Ok(identity.to_string()),
            None => self.resolve().await.map(str::to_string),
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.cell.get().map(String::as_str)
    }

    fn generate(&self) -> Result<String, ShipError> {
        let function_name = self.segment(FUNCTION_NAME_VAR);
        let log_stream = self.segment(LOG_STREAM_NAME_VAR);
        let token = random_token()?;

        let identity = format!("{function_name}-{log_stream}-{token}");
        debug!("Resolved log stream identity {}", identity);
        Ok(identity)
    }

    fn segment(&self, key: &str) -> String {
        self.env
            .var(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_SEGMENT.to_string())
    }
}

impl Default for StreamIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamIdentity")
            .field("resolved", &self.cell.get())
            .finish_non_exhaustive()
    }
}

// Version-4 shaped; only needs to be unlikely to collide between streams.
fn random_token() -> Result<uuid::Uuid, ShipError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| ShipError::IdentityResolution(format!("random token generation failed: {e}")))?;
    Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_identity_is_composed_from_environment() {
        let mut env = MockEnvSource::new();
        env.expect_var()
            .with(eq(FUNCTION_NAME_VAR))
            .times(1)
            .return_const(Some("billing-sync".to_string()));
        env.expect_var()
            .with(eq(LOG_STREAM_NAME_VAR))
            .times(1)
            .return_const(Some("2024/01/01/[$LATEST]abc".to_string()));

        let identity = StreamIdentity::with_env(env);
        let resolved = identity.resolve().await.unwrap();

        let prefix = "billing-sync-2024/01/01/[$LATEST]abc-";
        assert!(resolved.starts_with(prefix), "unexpected identity {resolved}");
        let token = uuid::Uuid::parse_str(&resolved[prefix.len()..]).unwrap();
        assert_eq!(token.get_version_num(), 4);
    }

    #[tokio::test]
    async fn test_missing_values_use_placeholder() {
        let mut env = MockEnvSource::new();
        env.expect_var().returning(|_| None);

        let identity = StreamIdentity::with_env(env);
        let resolved = identity.resolve().await.unwrap();
        assert!(resolved.starts_with("unknown-unknown-"));
    }

    #[tokio::test]
    async fn test_environment_is_read_once() {
        let mut env = MockEnvSource::new();
        env.expect_var().times(2).returning(|_| Some("x".to_string()));

        let identity = StreamIdentity::with_env(env);
        let first = identity.resolve().await.unwrap().to_string();
        let second = identity.resolve().await.unwrap().to_string();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_override_does_not_touch_cache() {
        let identity = StreamIdentity::with_env(StaticEnv::new());
        let overridden = identity.resolve_with(Some("custom")).await.unwrap();
        assert_eq!(overridden, "custom");
        assert!(identity.get().is_none());

        let cached = identity.resolve_with(None).await.unwrap();
        assert_ne!(cached, "custom");
        assert_eq!(identity.get(), Some(cached.as_str()));
    }

    #[tokio::test]
    async fn test_fixed_identity() {
        let identity = StreamIdentity::fixed("pinned");
        assert_eq!(identity.resolve().await.unwrap(), "pinned");
    }
}
