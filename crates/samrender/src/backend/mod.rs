//! external-resolution capability
//!
//! `Fn::ImportValue` and `{{resolve:secretsmanager:...}}` references need data that lives outside
//! the template. The evaluator only talks to an [ExternalResolver]; which one is used is decided
//! once, when the [crate::context::EvaluationContext] is built.
//!
//! - [MockResolver]: deterministic placeholders, never fails
//! - [UnconfiguredResolver]: fails every call with [ExternalError::NotConfigured]
//! - [StaticResolver]: in-memory exports and secrets
//! - [FallbackToMock]: wraps another resolver and substitutes mocks when it fails (opt-in)
//! - `AwsResolver` (feature `aws`): CloudFormation exports and Secrets Manager
use crate::error::ExternalError;
use crate::value::Mapping;
use indexmap::IndexMap;

#[cfg(feature = "aws")]
mod aws;
#[cfg(feature = "aws")]
pub use aws::AwsResolver;

pub trait ExternalResolver: Send + Sync {
    /// Value of the stack export `name`
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError>;

    /// Payload of the secret `identifier`
    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError>;
}

impl<R: ExternalResolver + ?Sized> ExternalResolver for Box<R> {
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        (**self).fetch_import(name)
    }

    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        (**self).fetch_secret(identifier)
    }
}

/// A fetched secret payload
#[derive(Debug, Clone, PartialEq)]
pub enum Secret {
    /// Raw secret string, possibly a JSON object
    Text(String),
    /// Already structured key/value payload
    Map(Mapping),
    /// Stand-in value; used as-is, even when a JSON key was requested
    Placeholder(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockResolver;

impl MockResolver {
    pub fn import(name: &str) -> String {
        format!("mock-import-{name}")
    }

    pub fn secret(identifier: &str) -> String {
        format!("mock-secret-{identifier}")
    }
}

impl ExternalResolver for MockResolver {
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        Ok(Self::import(name))
    }

    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        Ok(Secret::Placeholder(Self::secret(identifier)))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredResolver;

impl ExternalResolver for UnconfiguredResolver {
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        Err(ExternalError::NotConfigured {
            reference: name.into(),
        })
    }

    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        Err(ExternalError::NotConfigured {
            reference: identifier.into(),
        })
    }
}

/// Exports and secrets held in memory
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    exports: IndexMap<String, String>,
    secrets: IndexMap<String, Secret>,
}

impl StaticResolver {
    pub fn with_export(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.exports.insert(name.into(), value.into());
        self
    }

    pub fn with_secret(mut self, identifier: impl Into<String>, secret: Secret) -> Self {
        self.secrets.insert(identifier.into(), secret);
        self
    }
}

impl ExternalResolver for StaticResolver {
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        self.exports
            .get(name)
            .cloned()
            .ok_or_else(|| ExternalError::NotFound {
                reference: name.into(),
            })
    }

    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        self.secrets
            .get(identifier)
            .cloned()
            .ok_or_else(|| ExternalError::NotFound {
                reference: identifier.into(),
            })
    }
}

/// Use mock values whenever the wrapped resolver fails
#[derive(Debug, derive_new::new)]
pub struct FallbackToMock<R> {
    inner: R,
}

impl<R: ExternalResolver> ExternalResolver for FallbackToMock<R> {
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        self.inner.fetch_import(name).or_else(|error| {
            tracing::warn!(%error, name, "import lookup failed, using mock value");
            MockResolver.fetch_import(name)
        })
    }

    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        self.inner.fetch_secret(identifier).or_else(|error| {
            tracing::warn!(%error, identifier, "secret lookup failed, using mock value");
            MockResolver.fetch_secret(identifier)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mock_values_are_deterministic() {
        assert_eq!(MockResolver.fetch_import("vpc-id").unwrap(), "mock-import-vpc-id");
        assert_eq!(
            MockResolver.fetch_secret("db").unwrap(),
            Secret::Placeholder("mock-secret-db".into())
        );
    }

    #[test]
    fn fallback_only_on_failure() {
        let resolver = FallbackToMock::new(StaticResolver::default().with_export("known", "value"));

        assert_eq!(resolver.fetch_import("known").unwrap(), "value");
        assert_eq!(resolver.fetch_import("unknown").unwrap(), "mock-import-unknown");
    }

    #[test]
    fn unconfigured_fails() {
        let error = UnconfiguredResolver.fetch_import("vpc-id").unwrap_err();
        assert!(matches!(error, ExternalError::NotConfigured { .. }));
    }
}
