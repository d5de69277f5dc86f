use super::Visit;
use crate::value::{IntrinsicCall, Value};

/// Recursively visit all [IntrinsicCall]s, including calls nested in arguments
pub trait VisitIntrinsics {
    fn visit_intrinsics(&self, visitor: &mut dyn Visit<IntrinsicCall>);
}

impl VisitIntrinsics for Value {
    fn visit_intrinsics(&self, visitor: &mut dyn Visit<IntrinsicCall>) {
        match self {
            Value::Intrinsic(call) => {
                visitor.visit(call);
                call.argument.visit_intrinsics(visitor);
            }
            Value::Sequence(sequence) => {
                for value in sequence {
                    value.visit_intrinsics(visitor);
                }
            }
            Value::Mapping(mapping) => {
                for value in mapping.values() {
                    value.visit_intrinsics(visitor);
                }
            }
            Value::Null
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Decimal(_)
            | Value::String(_) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_nested_calls() {
        let value = Value::from(vec![
            Value::call("Fn::Join", vec![Value::from(","), vec![Value::call("Ref", "A")].into()]),
            Value::from("literal"),
        ]);

        let mut names = vec![];
        value.visit_intrinsics(&mut |call: &IntrinsicCall| names.push(call.name.clone()));

        assert_eq!(names, vec!["Fn::Join", "Ref"]);
    }
}
