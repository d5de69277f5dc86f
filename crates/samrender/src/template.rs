//! template documents (sections, parameter definitions and loading)
//!
//! Templates are read as YAML (which includes JSON). Short-form tags are expanded while loading
//! so the evaluator only ever sees long-form intrinsic calls:
//!
//! | short form            | long form                          |
//! |-----------------------|------------------------------------|
//! | `!Ref Name`           | `{Ref: Name}`                      |
//! | `!Condition Name`     | `{Condition: Name}`                |
//! | `!GetAtt Res.Attr`    | `{Fn::GetAtt: [Res, Attr]}`        |
//! | `!Sub "..."`          | `{Fn::Sub: "..."}`                 |
//! | `!<Other> ...`        | `{Fn::<Other>: ...}`               |
//!
//! A mapping with a single key `Ref`, `Condition` or `Fn::*` is an intrinsic call as well.
use crate::value::{IntrinsicCall, Mapping, Value};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// A loaded template
///
/// Immutable once loaded; rendering produces new values.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub source: Option<PathBuf>,
    pub parameters: IndexMap<String, ParameterDefinition>,
    pub mappings: Mapping,
    pub conditions: Mapping,
    pub resources: Mapping,
    pub outputs: Option<Mapping>,
    pub transform: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct ParameterDefinition {
    pub name: String,
    /// Declared `Type`, e.g. `String`, `Number`, `CommaDelimitedList`
    pub kind: String,
    pub default: Option<Value>,
    pub allowed_values: Option<Vec<Value>>,
}

impl ParameterDefinition {
    /// `CommaDelimitedList` and `List<...>` parameters are referenced as sequences
    pub fn is_list(&self) -> bool {
        self.kind == "CommaDelimitedList" || self.kind.starts_with("List<")
    }
}

impl Template {
    pub fn load_file(file_path: &Path) -> Result<Self, LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading template");

        let file_contents = std::fs::read_to_string(&file_path)?;
        let mut template: Template = file_contents.parse()?;
        template.source = Some(file_path);

        Ok(template)
    }

    /// Build a template from an already loaded document
    pub fn from_document(document: Value) -> Result<Self, LoadError> {
        let Value::Mapping(mut document) = document else {
            return Err(LoadError::NotAMapping("<root>".into()));
        };

        let mut template = Template {
            mappings: take_section(&mut document, "Mappings")?.unwrap_or_default(),
            conditions: take_section(&mut document, "Conditions")?.unwrap_or_default(),
            resources: take_section(&mut document, "Resources")?.unwrap_or_default(),
            outputs: take_section(&mut document, "Outputs")?,
            transform: document.shift_remove("Transform"),
            ..Default::default()
        };

        for (name, definition) in take_section(&mut document, "Parameters")?.unwrap_or_default() {
            let definition = parameter_definition(&name, definition)?;
            template.parameters.insert(name, definition);
        }

        for (name, mapping) in &template.mappings {
            if mapping.as_mapping().is_none() {
                return Err(LoadError::NotAMapping(format!("Mappings.{name}")));
            }
        }

        Ok(template)
    }
}

impl std::str::FromStr for Template {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(s)?;
        Self::from_document(from_yaml(yaml)?)
    }
}

fn take_section(document: &mut Mapping, name: &str) -> Result<Option<Mapping>, LoadError> {
    match document.shift_remove(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(section)) => Ok(Some(section)),
        Some(_) => Err(LoadError::NotAMapping(name.into())),
    }
}

fn parameter_definition(name: &str, definition: Value) -> Result<ParameterDefinition, LoadError> {
    let Value::Mapping(mut definition) = definition else {
        return Err(LoadError::NotAMapping(format!("Parameters.{name}")));
    };

    let kind = match definition.shift_remove("Type") {
        Some(Value::String(kind)) => kind,
        _ => return Err(LoadError::ParameterTypeMissing(name.into())),
    };

    let allowed_values = match definition.shift_remove("AllowedValues") {
        None => None,
        Some(Value::Sequence(values)) => Some(values),
        Some(_) => return Err(LoadError::NotASequence(format!("Parameters.{name}.AllowedValues"))),
    };

    Ok(ParameterDefinition::new(
        name.into(),
        kind,
        definition.shift_remove("Default"),
        allowed_values,
    ))
}

/// Convert a parsed YAML value, expanding short-form tags and long-form intrinsic mappings
pub fn from_yaml(value: serde_yaml::Value) -> Result<Value, LoadError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Boolean(b),
        Yaml::Number(n) => match n.as_i64() {
            Some(int) => Value::Integer(int),
            None => Value::Decimal(n.as_f64().ok_or(LoadError::NumberOutOfRange)?),
        },
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(sequence) => Value::Sequence(
            sequence
                .into_iter()
                .map(from_yaml)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut converted = Mapping::with_capacity(mapping.len());
            for (key, value) in mapping {
                converted.insert(mapping_key(key)?, from_yaml(value)?);
            }

            if converted.len() == 1 && converted.keys().all(|name| is_intrinsic_name(name)) {
                if let Some((name, argument)) = converted.pop() {
                    return Ok(IntrinsicCall::new(name, argument).into());
                }
            }

            Value::Mapping(converted)
        }
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let tag = tag.trim_start_matches('!');
            let argument = from_yaml(tagged.value)?;

            match tag {
                "Ref" | "Condition" => IntrinsicCall::new(tag, argument).into(),
                "GetAtt" => IntrinsicCall::new("Fn::GetAtt", split_get_att(argument)).into(),
                _ => IntrinsicCall::new(format!("Fn::{tag}"), argument).into(),
            }
        }
    })
}

fn is_intrinsic_name(key: &str) -> bool {
    key == "Ref" || key == "Condition" || key.starts_with("Fn::")
}

/// `!GetAtt Resource.Attribute` to `[Resource, Attribute]`
///
/// Only the first dot separates, nested attributes like `Endpoint.Address` stay intact.
fn split_get_att(argument: Value) -> Value {
    match argument {
        Value::String(s) => match s.split_once('.') {
            Some((resource, attribute)) => vec![resource, attribute].into(),
            None => Value::String(s),
        },
        other => other,
    }
}

fn mapping_key(key: serde_yaml::Value) -> Result<String, LoadError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Number(n) => Ok(n.to_string()),
        other => Err(LoadError::InvalidMappingKey(format!("{other:?}"))),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse template")]
    YamlParseFailed(#[from] serde_yaml::Error),
    #[error("`{0}` must be a mapping")]
    NotAMapping(String),
    #[error("`{0}` must be a sequence")]
    NotASequence(String),
    #[error("parameter `{0}` has no Type")]
    ParameterTypeMissing(String),
    #[error("unsupported mapping key {0}")]
    InvalidMappingKey(String),
    #[error("number out of range")]
    NumberOutOfRange,
}

/// Utility macro to create a [Template] from YAML source
///
/// ```
/// # use samrender::template;
/// let template = template!("Resources: {Bucket: {Type: AWS::S3::Bucket}}");
/// assert_eq!(template.resources.len(), 1);
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use samrender::template;
/// template!("Resources: [not, a, mapping]");
/// ```
#[macro_export]
macro_rules! template {
    { $expr:expr } => {
        $expr.parse::<$crate::template::Template>().expect("template must load")
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_form_tags_expand() {
        let template = template! {r#"
        Resources:
          Bucket:
            Properties:
              Name: !Sub "${AWS::StackName}-bucket"
              Arn: !GetAtt Other.Endpoint.Address
              Owner: !Ref Owner
              Flag: !Condition IsProd
        "#};

        let properties = template.resources["Bucket"].as_mapping().unwrap()["Properties"]
            .as_mapping()
            .unwrap();

        assert_eq!(
            properties["Name"],
            Value::call("Fn::Sub", "${AWS::StackName}-bucket")
        );
        assert_eq!(
            properties["Arn"],
            Value::call("Fn::GetAtt", vec!["Other", "Endpoint.Address"])
        );
        assert_eq!(properties["Owner"], Value::call("Ref", "Owner"));
        assert_eq!(properties["Flag"], Value::call("Condition", "IsProd"));
    }

    #[test]
    fn long_form_single_key_mapping_is_intrinsic() {
        let template = template!(r#"{"Resources": {"Queue": {"Properties": {"Name": {"Fn::Join": ["-", ["a", "b"]]}}}}}"#);

        let properties = template.resources["Queue"].as_mapping().unwrap()["Properties"]
            .as_mapping()
            .unwrap();

        assert!(matches!(&properties["Name"], Value::Intrinsic(call) if call.name == "Fn::Join"));
    }

    #[test]
    fn multi_key_mapping_with_condition_is_not_intrinsic() {
        let template = template!("Resources: {Topic: {Type: AWS::SNS::Topic, Condition: IsProd}}");
        assert!(template.resources["Topic"].as_mapping().is_some());
    }

    #[test]
    fn parameters() {
        let template = template! {r#"
        Parameters:
          Env:
            Type: String
            Default: dev
            AllowedValues: [dev, prod]
          Subnets:
            Type: CommaDelimitedList
        "#};

        assert_eq!(
            template.parameters["Env"],
            ParameterDefinition::new(
                "Env".into(),
                "String".into(),
                Some("dev".into()),
                Some(vec!["dev".into(), "prod".into()])
            )
        );
        assert!(template.parameters["Subnets"].is_list());
    }

    #[test]
    fn parameter_without_type_errors() {
        let error = "Parameters: {Env: {Default: dev}}"
            .parse::<Template>()
            .expect_err("must error");
        assert!(matches!(error, LoadError::ParameterTypeMissing(name) if name == "Env"));
    }

    #[test]
    fn mapping_keys_are_stringified() {
        let template = template!("Mappings: {Sizes: {10: {Size: small}, true: {Size: big}}}");
        let sizes = template.mappings["Sizes"].as_mapping().unwrap();
        assert_eq!(sizes.keys().collect::<Vec<_>>(), vec!["10", "true"]);
    }
}
