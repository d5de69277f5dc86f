//! samconfig environment overrides
//!
//! ```toml
//! [dev.deploy.parameters]
//! region = "eu-west-1"
//! parameter_overrides = "VpcStackName=\"vpc\" Environment=\"dev\""
//! ```
//!
//! `parameter_overrides` may also be an array of `Key=Value` strings. `region` becomes an override
//! of `AWS::Region`.
use crate::context::REGION;
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const DEFAULT_CONFIG_FILE: &str = "samconfig.toml";
pub const DEFAULT_ENVIRONMENT: &str = "default";

static OVERRIDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z0-9:]+)=(?:"([^"]*)"|'([^']*)'|([^\s"']+))"#)
        .expect("override pattern must compile")
});

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("`{field}` of environment `{environment}` must be {expected}")]
    InvalidField {
        environment: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// Overrides of `environment` from the config file at `path`
///
/// A missing file or environment yields no overrides.
pub fn load_overrides(path: &Path, environment: &str) -> Result<IndexMap<String, String>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path=%path.display(), "config file not found, rendering without overrides");
            return Ok(IndexMap::new());
        }
        Err(source) => {
            return Err(ConfigError::IoError {
                path: path.to_owned(),
                source,
            })
        }
    };

    tracing::info!(path=%path.display(), environment, "loading config");
    let table: toml::Table = contents
        .parse()
        .map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_owned(),
            source,
        })?;

    environment_overrides(&table, environment)
}

/// Overrides of `environment` from a parsed config document
pub fn environment_overrides(
    table: &toml::Table,
    environment: &str,
) -> Result<IndexMap<String, String>, ConfigError> {
    let Some(parameters) = table
        .get(environment)
        .and_then(|e| e.get("deploy"))
        .and_then(|d| d.get("parameters"))
    else {
        tracing::warn!(environment, "environment not found in config, rendering without overrides");
        return Ok(IndexMap::new());
    };

    let invalid = |field, expected| ConfigError::InvalidField {
        environment: environment.into(),
        field,
        expected,
    };

    let mut overrides = match parameters.get("parameter_overrides") {
        None => IndexMap::new(),
        Some(toml::Value::String(overrides)) => parse_overrides(overrides),
        Some(toml::Value::Array(entries)) => {
            let mut overrides = IndexMap::new();
            for entry in entries {
                let entry = entry
                    .as_str()
                    .ok_or_else(|| invalid("parameter_overrides", "a string or an array of strings"))?;
                overrides.extend(parse_overrides(entry));
            }
            overrides
        }
        Some(_) => return Err(invalid("parameter_overrides", "a string or an array of strings")),
    };

    match parameters.get("region") {
        None => {}
        Some(toml::Value::String(region)) => {
            overrides.insert(REGION.into(), region.clone());
        }
        Some(_) => return Err(invalid("region", "a string")),
    }

    Ok(overrides)
}

/// Parse `Key="Value" Other='x' Plain=y` into pairs, in order
pub fn parse_overrides(text: &str) -> IndexMap<String, String> {
    OVERRIDE
        .captures_iter(text)
        .filter_map(|captures| {
            let key = captures.get(1)?.as_str().to_owned();
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map_or("", |m| m.as_str());
            Some((key, value.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(overrides: &IndexMap<String, String>) -> Vec<(&str, &str)> {
        overrides
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn quoted_overrides() {
        let overrides = parse_overrides(r#"VpcStackName="vpc" Environment="dev""#);
        assert_eq!(
            pairs(&overrides),
            vec![("VpcStackName", "vpc"), ("Environment", "dev")]
        );
    }

    #[test]
    fn mixed_quoting_and_spaces() {
        let overrides = parse_overrides(r#"Name="with spaces" Single='x y' Plain=abc Empty="""#);
        assert_eq!(
            pairs(&overrides),
            vec![
                ("Name", "with spaces"),
                ("Single", "x y"),
                ("Plain", "abc"),
                ("Empty", "")
            ]
        );
    }

    #[test]
    fn environment_with_region_and_array() {
        let table: toml::Table = r#"
            version = 0.1

            [dev.deploy.parameters]
            region = "eu-west-1"
            parameter_overrides = ["Environment=dev", "InstanceType=\"t3.small\""]

            [prod.deploy.parameters]
            parameter_overrides = "Environment=\"prod\""
        "#
        .parse()
        .unwrap();

        assert_eq!(
            pairs(&environment_overrides(&table, "dev").unwrap()),
            vec![
                ("Environment", "dev"),
                ("InstanceType", "t3.small"),
                ("AWS::Region", "eu-west-1")
            ]
        );
        assert_eq!(
            pairs(&environment_overrides(&table, "prod").unwrap()),
            vec![("Environment", "prod")]
        );
        assert!(environment_overrides(&table, "staging").unwrap().is_empty());
    }

    #[test]
    fn invalid_field_type() {
        let table: toml::Table = "[dev.deploy.parameters]\nregion = 1".parse().unwrap();
        assert!(matches!(
            environment_overrides(&table, "dev"),
            Err(ConfigError::InvalidField { field: "region", .. })
        ));
    }

    #[test]
    fn missing_file_yields_no_overrides() {
        let overrides = load_overrides(Path::new("does/not/exist/samconfig.toml"), "dev").unwrap();
        assert!(overrides.is_empty());
    }
}
