//! value representation
//!
//! The document model contains the following data types
//! - null (only ever produced by the loader or by `Ref: AWS::NoValue`)
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - sequence ("list" of values)
//! - mapping (order-preserving "map"/"dictionary", where the key is of type string)
//! - intrinsic call (a function name and its unevaluated argument)
//!
//! A fully resolved value contains no [Value::Intrinsic] nodes. `null` entries are dropped from
//! mappings and sequences while resolving, so resolved output never contains them either.
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub type Mapping = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    Intrinsic(Box<IntrinsicCall>),
}

/// An unevaluated intrinsic function call such as `{"Fn::Join": [",", [...]]}`
///
/// `name` is kept as written so that unknown functions can be reported by name. The argument is
/// a single value, just like in the document: a scalar for `Ref`, a sequence for most `Fn::*`
/// functions, and either a string or a two element sequence for `Fn::Sub`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicCall {
    pub name: String,
    pub argument: Value,
}

impl IntrinsicCall {
    pub fn new(name: impl Into<String>, argument: Value) -> Self {
        Self {
            name: name.into(),
            argument,
        }
    }

    /// Arguments as an ordered list
    ///
    /// A sequence argument is the argument list; anything else is a single argument.
    pub fn arguments(&self) -> &[Value] {
        match &self.argument {
            Value::Sequence(arguments) => arguments,
            single => std::slice::from_ref(single),
        }
    }
}

impl Value {
    /// Build an intrinsic call node
    pub fn call(name: impl Into<String>, argument: impl Into<Value>) -> Self {
        Value::Intrinsic(Box::new(IntrinsicCall::new(name, argument.into())))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) | Value::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// String form of a scalar, as used for string interpolation and key lookups
    ///
    /// Returns `None` for null, collections and intrinsic calls.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Value::Boolean(b) => Some(b.to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Short human readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Intrinsic(_) => "intrinsic function",
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Sequence(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Mapping(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<IntrinsicCall> for Value {
    fn from(value: IntrinsicCall) -> Self {
        Value::Intrinsic(Box::new(value))
    }
}

/// Secret payloads and other external JSON
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => b.into(),
            Json::Number(n) => match n.as_i64() {
                Some(int) => Value::Integer(int),
                None => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => s.into(),
            Json::Array(a) => a.into_iter().map(Value::from).collect::<Vec<_>>().into(),
            Json::Object(o) => Value::Mapping(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Sequence(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Mapping(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            // written back in long form so unresolved documents can still be dumped
            Value::Intrinsic(call) => {
                let mut ser = serializer.serialize_map(Some(1))?;
                ser.serialize_entry(&call.name, &call.argument)?;
                ser.end()
            }
        }
    }
}
