//! evaluation context
//!
//! One [EvaluationContext] exists per render. It owns everything a rule may need besides the node
//! it is evaluating: parameter values (precedence already applied), pseudo-parameters, the
//! mapping table, condition definitions and their cached results, the in-progress set used for
//! cycle detection, and the external-resolution backend.
use crate::backend::{ExternalResolver, MockResolver};
use crate::error::{Error, ErrorKind, Result};
use crate::path::Path;
use crate::template::Template;
use crate::value::{Mapping, Value};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

pub const REGION: &str = "AWS::Region";
pub const ACCOUNT_ID: &str = "AWS::AccountId";
pub const STACK_NAME: &str = "AWS::StackName";
pub const STACK_ID: &str = "AWS::StackId";
pub const PARTITION: &str = "AWS::Partition";
pub const URL_SUFFIX: &str = "AWS::URLSuffix";
pub const NOTIFICATION_ARNS: &str = "AWS::NotificationARNs";
pub const NO_VALUE: &str = "AWS::NoValue";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const MOCK_ACCOUNT_ID: &str = "123456789012";
pub const MOCK_STACK_NAME: &str = "Local-Render-Stack";

/// Produces the value of `Fn::GetAtt` for resources that are never provisioned
///
/// The declared resource type is passed along so implementations can specialize per type.
pub trait AttributeMock: Send + Sync {
    fn mock(&self, resource_type: Option<&str>, resource: &str, attribute: &str) -> Value;
}

/// `mock-<resource>-<attribute>`, lowercased, for every resource type
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericAttributeMock;

impl AttributeMock for GenericAttributeMock {
    fn mock(&self, _resource_type: Option<&str>, resource: &str, attribute: &str) -> Value {
        format!("mock-{resource}-{attribute}").to_lowercase().into()
    }
}

pub struct EvaluationContext<'r> {
    parameters: IndexMap<String, Option<Value>>,
    pseudo_parameters: IndexMap<&'static str, Value>,
    mappings: Mapping,
    conditions: Mapping,
    condition_cache: HashMap<String, bool>,
    in_progress: IndexSet<String>,
    /// logical id → declared `Type`
    resources: IndexMap<String, Option<String>>,
    ignored_parameters: Vec<String>,
    backend: &'r dyn ExternalResolver,
    attribute_mock: &'r dyn AttributeMock,
}

impl<'r> EvaluationContext<'r> {
    pub fn builder(template: &Template) -> ContextBuilder<'_, 'r> {
        ContextBuilder::new(template)
    }

    /// Value of a declared parameter
    ///
    /// `Ok(None)` when `name` is not a parameter, an error when it is one but has no value.
    pub fn parameter(&self, name: &str) -> Result<Option<&Value>, ErrorKind> {
        match self.parameters.get(name) {
            None => Ok(None),
            Some(None) => Err(ErrorKind::UndefinedParameter(name.into())),
            Some(Some(value)) => Ok(Some(value)),
        }
    }

    /// Names that were given a value but are not declared by the template
    pub fn ignored_parameters(&self) -> &[String] {
        &self.ignored_parameters
    }

    pub fn pseudo_parameter(&self, name: &str) -> Option<&Value> {
        self.pseudo_parameters.get(name)
    }

    pub fn region(&self) -> &str {
        self.pseudo_parameters
            .get(REGION)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_REGION)
    }

    pub fn mapping(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name).and_then(Value::as_mapping)
    }

    pub fn condition_definition(&self, name: &str) -> Option<&Value> {
        self.conditions.get(name)
    }

    pub fn condition_names(&self) -> Vec<String> {
        self.conditions.keys().cloned().collect()
    }

    pub fn cached_condition(&self, name: &str) -> Option<bool> {
        self.condition_cache.get(name).copied()
    }

    pub fn cache_condition(&mut self, name: &str, result: bool) {
        self.condition_cache.insert(name.into(), result);
    }

    /// Mark `name` as being evaluated
    ///
    /// Fails with the cycle when `name` is already being evaluated further up.
    pub fn enter(&mut self, name: &str, path: &Path) -> Result<()> {
        if let Some(position) = self.in_progress.get_index_of(name) {
            let mut cycle: Vec<String> = self.in_progress.iter().skip(position).cloned().collect();
            cycle.push(name.into());
            return Err(Error::new(path, ErrorKind::CircularDependency(cycle)));
        }

        self.in_progress.insert(name.into());
        Ok(())
    }

    pub fn exit(&mut self, name: &str) {
        self.in_progress.shift_remove(name);
    }

    pub fn is_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Stand-in for the physical id returned by `Ref` on a resource
    pub fn resource_token(&self, name: &str) -> Value {
        format!("mock-{}-id", name.to_lowercase()).into()
    }

    pub fn attribute(&self, resource: &str, attribute: &str) -> Value {
        let resource_type = self.resources.get(resource).and_then(Option::as_deref);
        self.attribute_mock.mock(resource_type, resource, attribute)
    }

    pub fn backend(&self) -> &'r dyn ExternalResolver {
        self.backend
    }
}

#[derive(derive_new::new)]
pub struct ContextBuilder<'t, 'r> {
    template: &'t Template,
    #[new(default)]
    given: IndexMap<String, Value>,
    #[new(default)]
    overrides: IndexMap<String, String>,
    #[new(value = "&MockResolver")]
    backend: &'r dyn ExternalResolver,
    #[new(value = "&GenericAttributeMock")]
    attribute_mock: &'r dyn AttributeMock,
}

impl<'t, 'r> ContextBuilder<'t, 'r> {
    /// A parameter value given by the caller
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.given.insert(name.into(), value.into());
        self
    }

    /// Environment overrides; these win over given values and defaults
    pub fn overrides(mut self, overrides: IndexMap<String, String>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn backend(mut self, backend: &'r dyn ExternalResolver) -> Self {
        self.backend = backend;
        self
    }

    pub fn attribute_mock(mut self, attribute_mock: &'r dyn AttributeMock) -> Self {
        self.attribute_mock = attribute_mock;
        self
    }

    pub fn build(mut self) -> Result<EvaluationContext<'r>> {
        let mut pseudo_parameters = pseudo_parameters(
            self.pseudo_override(REGION).unwrap_or(DEFAULT_REGION),
            self.pseudo_override(ACCOUNT_ID).unwrap_or(MOCK_ACCOUNT_ID),
            self.pseudo_override(STACK_NAME).unwrap_or(MOCK_STACK_NAME),
        );
        for (name, value) in pseudo_parameters.iter_mut() {
            if let Some(overridden) = self.overrides.get(*name) {
                *value = overridden.as_str().into();
            }
        }

        let mut parameters = IndexMap::new();
        for (name, definition) in &self.template.parameters {
            let path = Path::root().key("Parameters").key(name);

            let given = self.given.shift_remove(name);
            let value = match self.overrides.shift_remove(name) {
                Some(overridden) => Some(Value::String(overridden)),
                None => given.or_else(|| definition.default.clone()),
            };

            let value = match value {
                Some(Value::String(list)) if definition.is_list() => Some(
                    list.split(',')
                        .map(Value::from)
                        .collect::<Vec<_>>()
                        .into(),
                ),
                other => other,
            };

            if let (Some(value), Some(allowed)) = (&value, &definition.allowed_values) {
                let elements = match value {
                    Value::Sequence(elements) => elements.as_slice(),
                    single => std::slice::from_ref(single),
                };
                if let Some(disallowed) = elements.iter().find(|element| !is_allowed(element, allowed)) {
                    return Err(Error::new(
                        &path,
                        ErrorKind::DisallowedParameterValue {
                            name: name.clone(),
                            value: disallowed
                                .scalar_string()
                                .unwrap_or_else(|| disallowed.kind().into()),
                        },
                    ));
                }
            }

            tracing::debug!(parameter = %name, ?value, "parameter resolved");
            parameters.insert(name.clone(), value);
        }

        let mut ignored_parameters = vec![];
        for name in self.overrides.keys().chain(self.given.keys()) {
            if !pseudo_parameters.contains_key(name.as_str()) {
                tracing::warn!(parameter = %name, "value for undeclared parameter ignored");
                ignored_parameters.push(name.clone());
            }
        }

        let resources = self
            .template
            .resources
            .iter()
            .map(|(name, resource)| {
                let resource_type = resource
                    .as_mapping()
                    .and_then(|r| r.get("Type"))
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                (name.clone(), resource_type)
            })
            .collect();

        Ok(EvaluationContext {
            parameters,
            pseudo_parameters,
            mappings: self.template.mappings.clone(),
            conditions: self.template.conditions.clone(),
            condition_cache: HashMap::new(),
            in_progress: IndexSet::new(),
            resources,
            ignored_parameters,
            backend: self.backend,
            attribute_mock: self.attribute_mock,
        })
    }

    fn pseudo_override(&self, name: &str) -> Option<&str> {
        self.overrides.get(name).map(String::as_str)
    }
}

fn is_allowed(value: &Value, allowed: &[Value]) -> bool {
    value.scalar_string().is_some_and(|value| {
        allowed
            .iter()
            .any(|candidate| candidate.scalar_string().as_ref() == Some(&value))
    })
}

fn pseudo_parameters(region: &str, account: &str, stack: &str) -> IndexMap<&'static str, Value> {
    IndexMap::from([
        (REGION, region.into()),
        (ACCOUNT_ID, account.into()),
        (STACK_NAME, stack.into()),
        (
            STACK_ID,
            format!(
                "arn:aws:cloudformation:{region}:{account}:stack/{stack}/00000000-0000-0000-0000-000000000000"
            )
            .into(),
        ),
        (PARTITION, "aws".into()),
        (URL_SUFFIX, "amazonaws.com".into()),
        (NOTIFICATION_ARNS, Value::Sequence(vec![])),
        (NO_VALUE, Value::Null),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        crate::template! {r#"
        Parameters:
          Env: {Type: String, Default: dev, AllowedValues: [dev, prod]}
          Tier: {Type: String, Default: web}
          Owner: {Type: String}
          Subnets: {Type: CommaDelimitedList, Default: "a,b"}
        Resources:
          Bucket: {Type: AWS::S3::Bucket}
        "#}
    }

    #[test]
    fn parameter_precedence() {
        let template = template();
        let context = EvaluationContext::builder(&template)
            .parameter("Env", "dev")
            .parameter("Tier", "worker")
            .overrides(IndexMap::from([("Env".to_string(), "prod".to_string())]))
            .build()
            .unwrap();

        assert_eq!(context.parameter("Env").unwrap(), Some(&Value::from("prod")));
        assert_eq!(context.parameter("Tier").unwrap(), Some(&Value::from("worker")));
        assert!(matches!(
            context.parameter("Owner"),
            Err(ErrorKind::UndefinedParameter(name)) if name == "Owner"
        ));
        assert_eq!(context.parameter("NotAParameter").unwrap(), None);
    }

    #[test]
    fn overridden_given_value_is_not_reported_as_undeclared() {
        let template = template();
        let context = EvaluationContext::builder(&template)
            .parameter("Env", "dev")
            .parameter("Undeclared", "x")
            .overrides(IndexMap::from([("Env".to_string(), "prod".to_string())]))
            .build()
            .unwrap();

        assert_eq!(context.parameter("Env").unwrap(), Some(&Value::from("prod")));
        assert_eq!(context.ignored_parameters(), ["Undeclared".to_string()]);
    }

    #[test]
    fn list_parameters_are_split() {
        let template = template();
        let context = EvaluationContext::builder(&template).build().unwrap();

        assert_eq!(
            context.parameter("Subnets").unwrap(),
            Some(&Value::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn disallowed_value_errors() {
        let template = template();
        let error = EvaluationContext::builder(&template)
            .parameter("Env", "staging")
            .build()
            .err()
            .expect("must error");

        assert_eq!(error.path.to_string(), "Parameters.Env");
        assert!(matches!(error.kind, ErrorKind::DisallowedParameterValue { .. }));
    }

    #[test]
    fn allowed_values_apply_to_each_list_element() {
        let template = crate::template! {r#"
        Parameters:
          Zones: {Type: CommaDelimitedList, Default: "a,b", AllowedValues: [a, b, c]}
          Size: {Type: String, Default: small, AllowedValues: [small, large]}
        "#};

        let context = EvaluationContext::builder(&template).build().unwrap();
        assert_eq!(
            context.parameter("Zones").unwrap(),
            Some(&Value::from(vec!["a", "b"]))
        );
        assert_eq!(context.parameter("Size").unwrap(), Some(&Value::from("small")));

        let error = EvaluationContext::builder(&template)
            .overrides(IndexMap::from([("Zones".to_string(), "a,d".to_string())]))
            .build()
            .err()
            .expect("must error");
        assert_eq!(error.path.to_string(), "Parameters.Zones");
        assert!(matches!(
            error.kind,
            ErrorKind::DisallowedParameterValue { value, .. } if value == "d"
        ));

        let error = EvaluationContext::builder(&template)
            .parameter("Size", "medium")
            .build()
            .err()
            .expect("must error");
        assert!(matches!(
            error.kind,
            ErrorKind::DisallowedParameterValue { value, .. } if value == "medium"
        ));
    }

    #[test]
    fn region_override_applies_to_pseudo_parameters() {
        let template = template();
        let context = EvaluationContext::builder(&template)
            .overrides(IndexMap::from([(REGION.to_string(), "eu-west-1".to_string())]))
            .build()
            .unwrap();

        assert_eq!(context.region(), "eu-west-1");
        assert_eq!(
            context.pseudo_parameter(STACK_ID).and_then(Value::as_str),
            Some("arn:aws:cloudformation:eu-west-1:123456789012:stack/Local-Render-Stack/00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn enter_detects_cycles() {
        let template = template();
        let mut context = EvaluationContext::builder(&template).build().unwrap();
        let path = Path::root();

        context.enter("A", &path).unwrap();
        context.enter("B", &path).unwrap();
        let error = context.enter("A", &path).unwrap_err();

        assert!(matches!(
            error.kind,
            ErrorKind::CircularDependency(cycle) if cycle == ["A", "B", "A"]
        ));
    }

    #[test]
    fn attribute_mock() {
        let template = template();
        let context = EvaluationContext::builder(&template).build().unwrap();

        assert_eq!(context.attribute("Bucket", "Arn"), Value::from("mock-bucket-arn"));
        assert_eq!(context.resource_token("Bucket"), Value::from("mock-bucket-id"));
    }
}
