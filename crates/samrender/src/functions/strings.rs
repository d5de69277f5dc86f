//! string and list functions
use super::{argument_path, fixed_arguments, invalid_arguments, reference_value, resolve_string};
use crate::context::EvaluationContext;
use crate::dynamic_reference;
use crate::error::{Error, ErrorKind, Result};
use crate::path::Path;
use crate::resolver;
use crate::value::{IntrinsicCall, Value};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern must compile"));

/// `Fn::Sub: String` or `Fn::Sub: [String, {Name: Value, ...}]`
///
/// `${Name}` is looked up in the variable map first, then like `Ref`. `${Resource.Attribute}`
/// behaves like `Fn::GetAtt` and `${!Literal}` produces `${Literal}`. Variables are only resolved
/// when the string uses them.
pub(super) fn sub(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let (text, variables) = match call.arguments() {
        [Value::String(text)] => (text, None),
        [Value::String(text), Value::Mapping(variables)] => (text, Some(variables)),
        _ => {
            return Err(invalid_arguments(
                call,
                path,
                "expected a string or a string and a mapping of variables",
            ))
        }
    };
    let variables_path = argument_path(call, path, 1);

    let mut resolved_variables: HashMap<&str, String> = HashMap::new();
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        output.push_str(&text[last..whole.start()]);
        last = whole.end();

        let name = name.as_str();
        if let Some(literal) = name.strip_prefix('!') {
            output.push_str("${");
            output.push_str(literal);
            output.push('}');
            continue;
        }

        if let Some(value) = resolved_variables.get(name) {
            output.push_str(value);
            continue;
        }

        let value = match variables.and_then(|v| v.get(name)) {
            Some(variable) => {
                let variable_path = variables_path.key(name);
                let resolved = resolver::resolve(context, variable, &variable_path)?;
                substitution_string(resolved, &variable_path)?
            }
            None => placeholder_value(context, name, path)?,
        };

        output.push_str(&value);
        resolved_variables.insert(name, value);
    }
    output.push_str(&text[last..]);

    dynamic_reference::resolve_in_string(context, &output, path)
}

/// Value of a placeholder that is not in the variable map
fn placeholder_value(context: &mut EvaluationContext<'_>, name: &str, path: &Path) -> Result<String> {
    if let Some(value) = reference_value(context, name, path)? {
        return substitution_string(value, path);
    }

    if let Some((resource, attribute)) = name.split_once('.') {
        if context.is_resource(resource) {
            return substitution_string(context.attribute(resource, attribute), path);
        }
    }

    Err(Error::new(
        path,
        ErrorKind::SubstitutionPlaceholder(name.into()),
    ))
}

fn substitution_string(value: Value, path: &Path) -> Result<String> {
    value.scalar_string().ok_or_else(|| {
        Error::new(
            path,
            ErrorKind::TypeMismatch {
                expected: "string",
                found: value.kind(),
            },
        )
    })
}

/// `Fn::Join: [Delimiter, [Value, ...]]`
pub(super) fn join(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [delimiter, list] = fixed_arguments::<2>(call, path)?;
    let delimiter = resolve_string(context, delimiter, &argument_path(call, path, 0))?;
    let list_path = argument_path(call, path, 1);
    let list = resolve_sequence(context, list, &list_path)?;

    let parts = list
        .iter()
        .enumerate()
        .map(|(index, element)| substitution_string(element.clone(), &list_path.index(index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join(&delimiter).into())
}

/// `Fn::Split: [Delimiter, String]`
pub(super) fn split(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [delimiter, source] = fixed_arguments::<2>(call, path)?;
    let delimiter = resolve_string(context, delimiter, &argument_path(call, path, 0))?;
    let source = resolve_string(context, source, &argument_path(call, path, 1))?;

    if delimiter.is_empty() {
        return Err(invalid_arguments(call, path, "delimiter must not be empty"));
    }

    Ok(source.split(delimiter.as_str()).collect::<Vec<_>>().into())
}

/// `Fn::Select: [Index, [Value, ...]]`
pub(super) fn select(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [index, list] = fixed_arguments::<2>(call, path)?;
    let index_path = argument_path(call, path, 0);
    let index = match resolver::resolve(context, index, &index_path)? {
        Value::Integer(index) => index,
        Value::String(index) => index
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid_arguments(call, &index_path, format!("`{index}` is not an index")))?,
        other => {
            return Err(Error::new(
                &index_path,
                ErrorKind::TypeMismatch {
                    expected: "integer",
                    found: other.kind(),
                },
            ))
        }
    };
    let mut list = resolve_sequence(context, list, &argument_path(call, path, 1))?;

    let len = list.len();
    match usize::try_from(index) {
        Ok(position) if position < len => Ok(list.swap_remove(position)),
        _ => Err(Error::new(
            path,
            ErrorKind::SelectIndexOutOfRange { index, len },
        )),
    }
}

/// `Fn::Base64: Value`
///
/// Produces a readable `[Base64: ...]` marker instead of actually encoding.
pub(super) fn base64(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let content = resolve_string(context, &call.argument, &path.key(&call.name))?;
    Ok(format!("[Base64: {content}]").into())
}

/// `Fn::Length: [Value, ...]`
pub(super) fn length(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let list = resolve_sequence(context, &call.argument, &path.key(&call.name))?;
    Ok(Value::Integer(list.len() as i64))
}

fn resolve_sequence(
    context: &mut EvaluationContext<'_>,
    argument: &Value,
    path: &Path,
) -> Result<Vec<Value>> {
    match resolver::resolve(context, argument, path)? {
        Value::Sequence(list) => Ok(list),
        other => Err(Error::new(
            path,
            ErrorKind::TypeMismatch {
                expected: "sequence",
                found: other.kind(),
            },
        )),
    }
}
