//! intrinsic function dispatch table
//!
//! Every supported function has one [Function] variant, one entry in [FUNCTIONS] and one [Rule].
//! A rule receives the call with its arguments still unevaluated and resolves only the arguments
//! it needs, in the order it needs them. This is what makes `Fn::If`, `Fn::And` and `Fn::Or` lazy.
mod logic;
mod lookup;
mod strings;

use crate::context::EvaluationContext;
use crate::error::{Error, ErrorKind, Result};
use crate::path::Path;
use crate::resolver;
use crate::value::{IntrinsicCall, Value};

pub(crate) use lookup::reference_value;

/// Evaluation rule of a single function
///
/// `path` is the path of the call node itself.
pub type Rule = fn(&mut EvaluationContext<'_>, &IntrinsicCall, &Path) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Ref,
    Condition,
    If,
    Equals,
    Not,
    And,
    Or,
    FindInMap,
    Sub,
    Join,
    Split,
    Select,
    Base64,
    GetAtt,
    GetAZs,
    ImportValue,
    Length,
}

/// Name → function, exhaustive for the supported set
pub const FUNCTIONS: [(&str, Function); 18] = [
    ("Ref", Function::Ref),
    ("Condition", Function::Condition),
    ("Fn::Condition", Function::Condition),
    ("Fn::If", Function::If),
    ("Fn::Equals", Function::Equals),
    ("Fn::Not", Function::Not),
    ("Fn::And", Function::And),
    ("Fn::Or", Function::Or),
    ("Fn::FindInMap", Function::FindInMap),
    ("Fn::Sub", Function::Sub),
    ("Fn::Join", Function::Join),
    ("Fn::Split", Function::Split),
    ("Fn::Select", Function::Select),
    ("Fn::Base64", Function::Base64),
    ("Fn::GetAtt", Function::GetAtt),
    ("Fn::GetAZs", Function::GetAZs),
    ("Fn::ImportValue", Function::ImportValue),
    ("Fn::Length", Function::Length),
];

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, function)| *function)
    }

    pub fn rule(self) -> Rule {
        match self {
            Function::Ref => lookup::reference,
            Function::Condition => logic::condition,
            Function::If => logic::if_,
            Function::Equals => logic::equals,
            Function::Not => logic::not,
            Function::And => logic::and,
            Function::Or => logic::or,
            Function::FindInMap => lookup::find_in_map,
            Function::Sub => strings::sub,
            Function::Join => strings::join,
            Function::Split => strings::split,
            Function::Select => strings::select,
            Function::Base64 => strings::base64,
            Function::GetAtt => lookup::get_att,
            Function::GetAZs => lookup::get_azs,
            Function::ImportValue => lookup::import_value,
            Function::Length => strings::length,
        }
    }
}

/// Look up the rule for `name`
pub fn dispatch(name: &str, path: &Path) -> Result<Rule> {
    Function::from_name(name)
        .map(Function::rule)
        .ok_or_else(|| Error::new(path, ErrorKind::UnknownFunction(name.into())))
}

/// Arguments of a function with a fixed arity
fn fixed_arguments<'c, const N: usize>(
    call: &'c IntrinsicCall,
    path: &Path,
) -> Result<&'c [Value; N]> {
    let arguments = call.arguments();
    arguments.try_into().map_err(|_| {
        invalid_arguments(
            call,
            path,
            format!("expected {N} arguments, found {}", arguments.len()),
        )
    })
}

/// Path of the `index`th argument of `call`
fn argument_path(call: &IntrinsicCall, path: &Path, index: usize) -> Path {
    let function_path = path.key(&call.name);
    match call.argument {
        Value::Sequence(_) => function_path.index(index),
        _ => function_path,
    }
}

fn invalid_arguments(call: &IntrinsicCall, path: &Path, message: impl Into<String>) -> Error {
    Error::new(
        path,
        ErrorKind::InvalidArguments {
            function: call.name.clone(),
            message: message.into(),
        },
    )
}

/// Resolve an argument that has to end up as a scalar, and return its string form
fn resolve_string(
    context: &mut EvaluationContext<'_>,
    argument: &Value,
    path: &Path,
) -> Result<String> {
    let resolved = resolver::resolve(context, argument, path)?;
    resolved.scalar_string().ok_or_else(|| {
        Error::new(
            path,
            ErrorKind::TypeMismatch {
                expected: "string",
                found: resolved.kind(),
            },
        )
    })
}

/// Resolve an argument that has to end up as a boolean
fn resolve_bool(context: &mut EvaluationContext<'_>, argument: &Value, path: &Path) -> Result<bool> {
    let resolved = resolver::resolve(context, argument, path)?;
    match resolved {
        Value::Boolean(b) => Ok(b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(Error::new(
            path,
            ErrorKind::TypeMismatch {
                expected: "boolean",
                found: other.kind(),
            },
        )),
    }
}
