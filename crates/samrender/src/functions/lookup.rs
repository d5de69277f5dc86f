//! references, mappings, attributes and imports
use super::{argument_path, fixed_arguments, invalid_arguments, resolve_string};
use crate::context::EvaluationContext;
use crate::dynamic_reference;
use crate::error::{Error, ErrorKind, Result};
use crate::path::Path;
use crate::resolver;
use crate::value::{IntrinsicCall, Value};

/// `Ref: Name`
pub(super) fn reference(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [name] = fixed_arguments::<1>(call, path)?;
    let name = resolve_string(context, name, &argument_path(call, path, 0))?;

    reference_value(context, &name, path)?
        .ok_or_else(|| Error::new(path, ErrorKind::UndefinedParameter(name)))
}

/// Value of `name` as seen by `Ref` and `Fn::Sub`
///
/// Parameters first, then pseudo-parameters, then resources. `None` if `name` is none of those.
pub(crate) fn reference_value(
    context: &mut EvaluationContext<'_>,
    name: &str,
    path: &Path,
) -> Result<Option<Value>> {
    let parameter = context
        .parameter(name)
        .map_err(|kind| Error::new(path, kind))?
        .cloned();

    if let Some(value) = parameter {
        // parameter values may carry dynamic references themselves
        return match value {
            Value::String(text) => dynamic_reference::resolve_in_string(context, &text, path).map(Some),
            other => Ok(Some(other)),
        };
    }

    if let Some(value) = context.pseudo_parameter(name) {
        return Ok(Some(value.clone()));
    }

    if context.is_resource(name) {
        return Ok(Some(context.resource_token(name)));
    }

    Ok(None)
}

/// `Fn::FindInMap: [MapName, TopLevelKey, SecondLevelKey]` with an optional fourth default value
///
/// The default is only resolved when the lookup misses. It may be written bare or as
/// `{DefaultValue: ...}`.
pub(super) fn find_in_map(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let arguments = call.arguments();
    if !(3..=4).contains(&arguments.len()) {
        return Err(invalid_arguments(
            call,
            path,
            format!("expected 3 or 4 arguments, found {}", arguments.len()),
        ));
    }

    let map = resolve_string(context, &arguments[0], &argument_path(call, path, 0))?;
    let top_key = resolve_string(context, &arguments[1], &argument_path(call, path, 1))?;
    let second_key = resolve_string(context, &arguments[2], &argument_path(call, path, 2))?;

    let found = match context.mapping(&map) {
        None => Err(map.clone()),
        Some(table) => match table.get(&top_key).and_then(Value::as_mapping) {
            None => Err(top_key.clone()),
            Some(entries) => entries.get(&second_key).cloned().ok_or_else(|| second_key.clone()),
        },
    };

    match (found, arguments.get(3)) {
        (Ok(value), _) => {
            let mapping_path = Path::root()
                .key("Mappings")
                .key(&map)
                .key(&top_key)
                .key(&second_key);
            resolver::resolve(context, &value, &mapping_path)
        }
        (Err(missing), Some(default)) => {
            tracing::debug!(%map, %top_key, %second_key, %missing, "mapping lookup missed, using default");
            let default = match default.as_mapping().and_then(|d| d.get("DefaultValue")) {
                Some(value) if default.as_mapping().is_some_and(|d| d.len() == 1) => value,
                _ => default,
            };
            resolver::resolve(context, default, &argument_path(call, path, 3))
        }
        (Err(missing), None) => Err(Error::new(
            path,
            ErrorKind::MissingMappingKey {
                map,
                top_key,
                second_key,
                missing,
            },
        )),
    }
}

/// `Fn::GetAtt: [Resource, Attribute]` or `Fn::GetAtt: Resource.Attribute`
pub(super) fn get_att(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let (resource, attribute) = match call.arguments() {
        [resource, attribute] => (
            resolve_string(context, resource, &argument_path(call, path, 0))?,
            resolve_string(context, attribute, &argument_path(call, path, 1))?,
        ),
        [single] => {
            let single = resolve_string(context, single, &argument_path(call, path, 0))?;
            match single.split_once('.') {
                Some((resource, attribute)) => (resource.to_owned(), attribute.to_owned()),
                None => {
                    return Err(invalid_arguments(
                        call,
                        path,
                        "expected `Resource.Attribute`",
                    ))
                }
            }
        }
        _ => {
            return Err(invalid_arguments(
                call,
                path,
                "expected a resource and an attribute",
            ))
        }
    };

    Ok(context.attribute(&resource, &attribute))
}

/// `Fn::GetAZs: Region`, three zones; an empty region means the current one
pub(super) fn get_azs(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [region] = fixed_arguments::<1>(call, path)?;
    let region = match region {
        Value::Null => String::new(),
        region => resolve_string(context, region, &argument_path(call, path, 0))?,
    };
    let region = if region.is_empty() {
        context.region().to_owned()
    } else {
        region
    };

    Ok(["a", "b", "c"]
        .iter()
        .map(|zone| Value::String(format!("{region}{zone}")))
        .collect::<Vec<_>>()
        .into())
}

/// `Fn::ImportValue: ExportName`
pub(super) fn import_value(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [name] = fixed_arguments::<1>(call, path)?;
    let name = resolve_string(context, name, &argument_path(call, path, 0))?;

    tracing::debug!(%name, "fetching import");
    context
        .backend()
        .fetch_import(&name)
        .map(Value::String)
        .map_err(|error| Error::new(path, error.into()))
}
