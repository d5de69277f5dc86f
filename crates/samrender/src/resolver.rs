//! recursive resolver and the render pass
//!
//! [resolve] walks a node: literals are returned as they are (strings are checked for dynamic
//! references), mappings and sequences are resolved element by element, and intrinsic calls are
//! handed to their rule from [crate::functions]. Arguments are never resolved before the rule
//! runs; the rule decides.
//!
//! Named conditions are evaluated at most once per render. While a condition is being evaluated
//! its name is kept in the context's in-progress set, so a condition that (transitively) refers
//! to itself fails with a circular dependency instead of recursing forever.
use crate::context::EvaluationContext;
use crate::dynamic_reference;
use crate::error::{Error, ErrorKind, Result};
use crate::functions;
use crate::path::Path;
use crate::template::Template;
use crate::value::{IntrinsicCall, Mapping, Value};
use crate::visit::VisitIntrinsics;

/// Resolve `node` into a value without intrinsic calls
///
/// `null` elements of mappings and sequences (e.g. from `Ref: AWS::NoValue`) are dropped.
pub fn resolve(context: &mut EvaluationContext<'_>, node: &Value, path: &Path) -> Result<Value> {
    match node {
        Value::String(text) => dynamic_reference::resolve_in_string(context, text, path),
        Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) => Ok(node.clone()),
        Value::Sequence(sequence) => {
            let mut resolved = Vec::with_capacity(sequence.len());
            for (index, element) in sequence.iter().enumerate() {
                match resolve(context, element, &path.index(index))? {
                    Value::Null => {}
                    value => resolved.push(value),
                }
            }
            Ok(Value::Sequence(resolved))
        }
        Value::Mapping(mapping) => resolve_mapping(context, mapping, path).map(Value::Mapping),
        Value::Intrinsic(call) => evaluate(context, call, path),
    }
}

fn resolve_mapping(
    context: &mut EvaluationContext<'_>,
    mapping: &Mapping,
    path: &Path,
) -> Result<Mapping> {
    let mut resolved = Mapping::with_capacity(mapping.len());
    for (key, value) in mapping {
        match resolve(context, value, &path.key(key))? {
            Value::Null => {}
            value => {
                resolved.insert(key.clone(), value);
            }
        }
    }
    Ok(resolved)
}

#[tracing::instrument(level = "trace", skip_all, fields(function = %call.name, %path))]
fn evaluate(context: &mut EvaluationContext<'_>, call: &IntrinsicCall, path: &Path) -> Result<Value> {
    let rule = functions::dispatch(&call.name, path)?;
    rule(context, call, path)
}

/// Evaluate the named condition, using the cached result when there is one
pub fn condition(context: &mut EvaluationContext<'_>, name: &str, path: &Path) -> Result<bool> {
    if let Some(result) = context.cached_condition(name) {
        return Ok(result);
    }

    let Some(definition) = context.condition_definition(name).cloned() else {
        return Err(Error::new(path, ErrorKind::UndefinedCondition(name.into())));
    };

    context.enter(name, path)?;
    let definition_path = Path::root().key("Conditions").key(name);
    let result = resolve(context, &definition, &definition_path);
    context.exit(name);

    let result = match result? {
        Value::Boolean(result) => result,
        other => {
            return Err(Error::new(
                &definition_path,
                ErrorKind::TypeMismatch {
                    expected: "boolean",
                    found: other.kind(),
                },
            ))
        }
    };

    tracing::debug!(condition = name, result, "condition evaluated");
    context.cache_condition(name, result);
    Ok(result)
}

/// Render a template: evaluate every condition, then resolve `Resources` and `Outputs`
///
/// The result is a mapping with `Resources`, `Outputs` (only if the template has them) and
/// `Conditions` holding the evaluated condition values.
pub fn render(template: &Template, context: &mut EvaluationContext<'_>) -> Result<Value> {
    let mut conditions = Mapping::new();
    for name in context.condition_names() {
        let result = condition(context, &name, &Path::root().key("Conditions").key(&name))?;
        conditions.insert(name, result.into());
    }

    let mut rendered = Mapping::new();
    rendered.insert(
        "Resources".into(),
        Value::Mapping(resolve_mapping(
            context,
            &template.resources,
            &Path::root().key("Resources"),
        )?),
    );
    if let Some(outputs) = &template.outputs {
        rendered.insert(
            "Outputs".into(),
            Value::Mapping(resolve_mapping(context, outputs, &Path::root().key("Outputs"))?),
        );
    }
    rendered.insert("Conditions".into(), Value::Mapping(conditions));

    let rendered = Value::Mapping(rendered);
    debug_assert!(is_fully_resolved(&rendered));
    Ok(rendered)
}

/// `true` if `value` contains no intrinsic calls
pub fn is_fully_resolved(value: &Value) -> bool {
    let mut calls = 0;
    value.visit_intrinsics(&mut |_: &IntrinsicCall| calls += 1);
    calls == 0
}
