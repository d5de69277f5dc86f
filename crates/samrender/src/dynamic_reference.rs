//! dynamic references (`{{resolve:service:reference}}` inside strings)
//!
//! Only `secretsmanager` references are resolved; references to other services are left in the
//! string untouched. The reference part is either
//! - `secret-id[:json-key]`, or
//! - `secret-id:SecretString:json-key[:version-stage[:version-id]]`
//!
//! where `secret-id` may be a full ARN.
//!
//! When the whole string is a single reference its resolved value replaces the string, otherwise
//! each reference is replaced by the string form of its value.
use crate::backend::{ExternalResolver, Secret};
use crate::context::EvaluationContext;
use crate::error::{Error, ExternalError, Result};
use crate::path::Path;
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

static DYNAMIC_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{resolve:([^:}]+):([^}]+)\}\}").expect("dynamic reference pattern must compile")
});

const SECRETS_MANAGER: &str = "secretsmanager";

/// A parsed `secretsmanager` reference
#[derive(Debug, PartialEq, Eq)]
pub struct SecretReference<'a> {
    pub identifier: String,
    pub json_key: Option<&'a str>,
}

impl<'a> SecretReference<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let parts: Vec<&str> = reference.split(':').collect();

        // arn:aws:secretsmanager:<region>:<account>:secret:<name>
        let identifier_len = if reference.starts_with("arn:") {
            parts.len().min(7)
        } else {
            1
        };
        let identifier = parts[..identifier_len].join(":");

        let mut rest = parts[identifier_len..].iter().copied();
        let mut json_key = rest.next();
        if json_key == Some("SecretString") {
            json_key = rest.next();
        }

        Self {
            identifier,
            json_key: json_key.filter(|key| !key.is_empty()),
        }
    }
}

/// Resolve every dynamic reference in `text`
pub fn resolve_in_string(
    context: &mut EvaluationContext<'_>,
    text: &str,
    path: &Path,
) -> Result<Value> {
    if !text.contains("{{resolve:") {
        return Ok(text.into());
    }

    let backend = context.backend();
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in DYNAMIC_REFERENCE.captures_iter(text) {
        let (Some(whole), Some(service), Some(reference)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };

        if service.as_str() != SECRETS_MANAGER {
            tracing::debug!(service = service.as_str(), "unsupported dynamic reference left as-is");
            continue;
        }

        let value = resolve_secret(backend, reference.as_str())
            .map_err(|error| Error::new(path, error.in_reference(whole.as_str()).into()))?;

        if whole.start() == 0 && whole.end() == text.len() {
            return Ok(value);
        }

        output.push_str(&text[last..whole.start()]);
        output.push_str(&value.scalar_string().unwrap_or_else(|| {
            serde_json::to_string(&value).unwrap_or_default()
        }));
        last = whole.end();
    }
    output.push_str(&text[last..]);

    Ok(output.into())
}

/// Fetch a secret and pick the JSON key if one is requested
pub fn resolve_secret(
    backend: &dyn ExternalResolver,
    reference: &str,
) -> Result<Value, ExternalError> {
    let SecretReference {
        identifier,
        json_key,
    } = SecretReference::parse(reference);

    tracing::debug!(%identifier, ?json_key, "fetching secret");
    let secret = backend.fetch_secret(&identifier)?;

    let Some(key) = json_key else {
        return Ok(match secret {
            Secret::Text(text) | Secret::Placeholder(text) => text.into(),
            Secret::Map(map) => serde_json::to_string(&Value::Mapping(map))
                .unwrap_or_default()
                .into(),
        });
    };

    let key_not_found = || ExternalError::KeyNotFound {
        reference: identifier.clone(),
        key: key.into(),
    };

    match secret {
        Secret::Placeholder(text) => Ok(text.into()),
        Secret::Map(mut map) => map.shift_remove(key).ok_or_else(key_not_found),
        Secret::Text(text) => {
            let mut payload: serde_json::Map<String, serde_json::Value> =
                serde_json::from_str(&text).map_err(|source| ExternalError::InvalidSecretJson {
                    reference: identifier.clone(),
                    source,
                })?;
            payload
                .remove(key)
                .map(Value::from)
                .ok_or_else(key_not_found)
        }
    }
}
