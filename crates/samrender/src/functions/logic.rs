//! conditions and boolean functions
use super::{argument_path, fixed_arguments, invalid_arguments, resolve_bool, resolve_string};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::path::Path;
use crate::resolver;
use crate::value::{IntrinsicCall, Value};

/// `Condition: Name`
pub(super) fn condition(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [name] = fixed_arguments::<1>(call, path)?;
    let name = resolve_string(context, name, &argument_path(call, path, 0))?;

    resolver::condition(context, &name, path).map(Value::from)
}

/// `Fn::If: [Condition, WhenTrue, WhenFalse]`
///
/// Only the selected branch is resolved.
pub(super) fn if_(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [name, when_true, when_false] = fixed_arguments::<3>(call, path)?;
    let name = resolve_string(context, name, &argument_path(call, path, 0))?;

    if resolver::condition(context, &name, path)? {
        resolver::resolve(context, when_true, &argument_path(call, path, 1))
    } else {
        resolver::resolve(context, when_false, &argument_path(call, path, 2))
    }
}

/// `Fn::Equals: [A, B]`
///
/// Scalars compare by their string form, so `10` equals `"10"`. Scalars that both read as numbers
/// compare numerically, so `1.0` equals `"1.0"` and `"1"`.
pub(super) fn equals(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [left, right] = fixed_arguments::<2>(call, path)?;
    let left = resolver::resolve(context, left, &argument_path(call, path, 0))?;
    let right = resolver::resolve(context, right, &argument_path(call, path, 1))?;

    let equal = match (left.scalar_string(), right.scalar_string()) {
        (Some(left), Some(right)) => left == right || numerically_equal(&left, &right),
        _ => left == right,
    };

    Ok(equal.into())
}

fn numerically_equal(left: &str, right: &str) -> bool {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// `Fn::Not: [Condition]`
pub(super) fn not(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    let [operand] = fixed_arguments::<1>(call, path)?;
    let operand = resolve_bool(context, operand, &argument_path(call, path, 0))?;

    Ok((!operand).into())
}

/// `Fn::And: [Condition, ...]`, stops at the first `false`
pub(super) fn and(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    short_circuit(context, call, path, false)
}

/// `Fn::Or: [Condition, ...]`, stops at the first `true`
pub(super) fn or(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
) -> Result<Value> {
    short_circuit(context, call, path, true)
}

/// Evaluate operands left to right until one equals `decisive`
fn short_circuit(
    context: &mut EvaluationContext<'_>,
    call: &IntrinsicCall,
    path: &Path,
    decisive: bool,
) -> Result<Value> {
    let operands = call.arguments();
    if operands.is_empty() {
        return Err(invalid_arguments(call, path, "expected at least one condition"));
    }

    for (index, operand) in operands.iter().enumerate() {
        if resolve_bool(context, operand, &argument_path(call, path, index))? == decisive {
            tracing::trace!(function = %call.name, index, "short-circuited");
            return Ok(decisive.into());
        }
    }

    Ok((!decisive).into())
}

#[cfg(test)]
mod test {
    use crate::backend::UnconfiguredResolver;
    use crate::context::EvaluationContext;
    use crate::error::ErrorKind;
    use crate::path::Path;
    use crate::resolver::resolve;
    use crate::template::Template;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn template() -> Template {
        crate::template! {r#"
        Parameters:
          Env: {Type: String, Default: dev}
          Tier: {Type: String, Default: web}
        Conditions:
          IsProd: !Equals [!Ref Env, prod]
          IsNotProd: !Not [!Condition IsProd]
        "#}
    }

    fn eval(template: &Template, env: &str, node: Value) -> crate::error::Result<Value> {
        let mut context = EvaluationContext::builder(template)
            .parameter("Env", env)
            .backend(&UnconfiguredResolver)
            .build()?;
        resolve(&mut context, &node, &Path::root())
    }

    fn import() -> Value {
        Value::call("Fn::ImportValue", "unreachable")
    }

    #[test]
    fn equals_and_not() {
        let template = template();

        assert_eq!(
            eval(&template, "dev", Value::call("Fn::Equals", vec!["a", "a"])).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&template, "dev", Value::call("Fn::Equals", vec![Value::from("10"), Value::Integer(10)])).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&template, "dev", Value::call("Fn::Equals", vec![Value::Decimal(1.0), "1.0".into()])).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&template, "dev", Value::call("Fn::Equals", vec![Value::Decimal(1.5), "1.50".into()])).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&template, "dev", Value::call("Fn::Equals", vec![Value::Decimal(1.5), "2".into()])).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            eval(&template, "dev", Value::call("Condition", "IsNotProd")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&template, "prod", Value::call("Condition", "IsNotProd")).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn and_requires_both() {
        let template = template();
        let node = Value::call(
            "Fn::And",
            vec![
                Value::call("Fn::Equals", vec![Value::call("Ref", "Env"), "prod".into()]),
                Value::call("Fn::Equals", vec![Value::call("Ref", "Tier"), "web".into()]),
            ],
        );

        assert_eq!(eval(&template, "prod", node.clone()).unwrap(), Value::Boolean(true));
        assert_eq!(eval(&template, "dev", node).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn and_short_circuits() {
        let template = template();
        // the second operand would fail if it were evaluated
        let node = Value::call(
            "Fn::And",
            vec![
                Value::call("Fn::Equals", vec![Value::call("Ref", "Env"), "prod".into()]),
                Value::call("Fn::Equals", vec![import(), "x".into()]),
            ],
        );

        assert_eq!(eval(&template, "dev", node.clone()).unwrap(), Value::Boolean(false));

        let error = eval(&template, "prod", node).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::ExternalResolution(_)));
    }

    #[test]
    fn or_short_circuits() {
        let template = template();
        let node = Value::call(
            "Fn::Or",
            vec![Value::Boolean(false), Value::Boolean(true), import()],
        );

        assert_eq!(eval(&template, "dev", node).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn if_skips_unselected_branch() {
        let template = template();
        let node = Value::call("Fn::If", vec![Value::from("IsProd"), import(), "fallback".into()]);

        assert_eq!(eval(&template, "dev", node).unwrap(), Value::from("fallback"));
    }

    #[test]
    fn if_with_undefined_condition_errors() {
        let template = template();
        let node = Value::call("Fn::If", vec!["Missing", "a", "b"]);

        let error = eval(&template, "dev", node).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::UndefinedCondition(name) if name == "Missing"));
    }

    #[test]
    fn if_arity() {
        let template = template();
        let error = eval(&template, "dev", Value::call("Fn::If", vec!["IsProd", "a"])).unwrap_err();

        assert!(matches!(error.kind, ErrorKind::InvalidArguments { .. }));
    }
}
