use crate::identity::{EnvSource, ProcessEnv};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Credential '{name}' is missing field {field}")]
    Missing { name: String, field: &'static str },
    #[error("Invalid credential: {0}")]
    Invalid(String),
}

/// Region and access keys used to address the queue.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Looks up credentials by logical name.
pub trait CredentialResolver: Send + Sync {
    fn resolve(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<AwsCredentials, CredentialError>> + Send;
}

/// Resolves `<NAME>_REGION`, `<NAME>_ACCESS_KEY_ID` and
/// `<NAME>_SECRET_ACCESS_KEY`, falling back to the standard `AWS_*` names.
///
/// The logical name is upper-snake-cased, so `awsCredentials` reads
/// `AWS_CREDENTIALS_REGION` first.
pub struct EnvCredentialResolver {
    env: Box<dyn EnvSource>,
}

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self::with_env(ProcessEnv)
    }

    pub fn with_env(env: impl EnvSource + 'static) -> Self {
        Self { env: Box::new(env) }
    }

    fn lookup(&self, prefix: &str, suffix: &str) -> Option<String> {
        let non_empty = |key: String| self.env.var(&key).filter(|value| !value.is_empty());
        non_empty(format!("{prefix}_{suffix}")).or_else(|| non_empty(format!("AWS_{suffix}")))
    }

    fn lookup_required(
        &self,
        name: &str,
        prefix: &str,
        suffix: &'static str,
    ) -> Result<String, CredentialError> {
        self.lookup(prefix, suffix).ok_or_else(|| CredentialError::Missing {
            name: name.to_string(),
            field: suffix,
        })
    }
}

impl Default for EnvCredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, name: &str) -> Result<AwsCredentials, CredentialError> {
        if name.trim().is_empty() {
            return Err(CredentialError::Invalid("credential name is empty".to_string()));
        }
        let prefix = env_prefix(name);

        Ok(AwsCredentials {
            region: self.lookup_required(name, &prefix, "REGION")?,
            access_key_id: self.lookup_required(name, &prefix, "ACCESS_KEY_ID")?,
            secret_access_key: self.lookup_required(name, &prefix, "SECRET_ACCESS_KEY")?,
            session_token: self.lookup(&prefix, "SESSION_TOKEN"),
        })
    }
}

/// `awsCredentials` -> `AWS_CREDENTIALS`, `queue.creds` -> `QUEUE_CREDS`.
fn env_prefix(name: &str) -> String {
    let mut prefix = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() && previous_lower {
            prefix.push('_');
        }
        if c.is_ascii_alphanumeric() {
            prefix.push(c.to_ascii_uppercase());
        } else {
            prefix.push('_');
        }
        previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticEnv;

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix("awsCredentials"), "AWS_CREDENTIALS");
        assert_eq!(env_prefix("queue.creds"), "QUEUE_CREDS");
        assert_eq!(env_prefix("LOGS"), "LOGS");
    }

    #[tokio::test]
    async fn test_named_values_take_precedence() {
        let env = StaticEnv::new()
            .with("AWS_CREDENTIALS_REGION", "eu-west-1")
            .with("AWS_CREDENTIALS_ACCESS_KEY_ID", "named-key")
            .with("AWS_ACCESS_KEY_ID", "default-key")
            .with("AWS_SECRET_ACCESS_KEY", "default-secret");

        let creds = EnvCredentialResolver::with_env(env)
            .resolve("awsCredentials")
            .await
            .unwrap();

        assert_eq!(creds.region, "eu-west-1");
        assert_eq!(creds.access_key_id, "named-key");
        assert_eq!(creds.secret_access_key, "default-secret");
        assert_eq!(creds.session_token, None);
    }

    #[tokio::test]
    async fn test_empty_named_value_falls_back_to_default() {
        let env = StaticEnv::new()
            .with("AWS_CREDENTIALS_REGION", "")
            .with("AWS_REGION", "eu-central-1")
            .with("AWS_CREDENTIALS_ACCESS_KEY_ID", "named-key")
            .with("AWS_CREDENTIALS_SECRET_ACCESS_KEY", "named-secret")
            .with("AWS_CREDENTIALS_SESSION_TOKEN", "");

        let creds = EnvCredentialResolver::with_env(env)
            .resolve("awsCredentials")
            .await
            .unwrap();

        assert_eq!(creds.region, "eu-central-1");
        assert_eq!(creds.session_token, None);
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() {
        let env = StaticEnv::new().with("AWS_REGION", "us-east-1");
        let err = EnvCredentialResolver::with_env(env)
            .resolve("awsCredentials")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CredentialError::Missing {
                name: "awsCredentials".to_string(),
                field: "ACCESS_KEY_ID",
            }
        );
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = AwsCredentials {
            region: "eu-west-1".into(),
            access_key_id: "AKIA".into(),
            secret_access_key: "very-secret".into(),
            session_token: Some("token".into()),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("token\""));
    }
}
