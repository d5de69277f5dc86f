//! structural difference between two rendered documents
//!
//! Mappings are compared key by key, sequences index by index, everything else by equality.
//! Entries are reported in document order: the keys of the old document in their order, followed
//! by keys that only exist in the new one.
use crate::path::Path;
use crate::value::{Mapping, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    Added { path: Path, value: Value },
    Removed { path: Path, value: Value },
    Changed { path: Path, old: Value, new: Value },
}

impl Difference {
    pub fn path(&self) -> &Path {
        match self {
            Difference::Added { path, .. }
            | Difference::Removed { path, .. }
            | Difference::Changed { path, .. } => path,
        }
    }
}

/// Compare `old` against `new`
pub fn diff(old: &Value, new: &Value) -> Vec<Difference> {
    let mut differences = vec![];
    diff_into(old, new, &Path::root(), &mut differences);
    differences
}

fn diff_into(old: &Value, new: &Value, path: &Path, differences: &mut Vec<Difference>) {
    match (old, new) {
        (Value::Mapping(old), Value::Mapping(new)) => diff_mappings(old, new, path, differences),
        (Value::Sequence(old), Value::Sequence(new)) => {
            for (index, (old, new)) in old.iter().zip(new).enumerate() {
                diff_into(old, new, &path.index(index), differences);
            }
            for (index, value) in old.iter().enumerate().skip(new.len()) {
                differences.push(Difference::Removed {
                    path: path.index(index),
                    value: value.clone(),
                });
            }
            for (index, value) in new.iter().enumerate().skip(old.len()) {
                differences.push(Difference::Added {
                    path: path.index(index),
                    value: value.clone(),
                });
            }
        }
        (old, new) if old == new => {}
        (old, new) => differences.push(Difference::Changed {
            path: path.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
    }
}

fn diff_mappings(old: &Mapping, new: &Mapping, path: &Path, differences: &mut Vec<Difference>) {
    for (key, old_value) in old {
        match new.get(key) {
            Some(new_value) => diff_into(old_value, new_value, &path.key(key), differences),
            None => differences.push(Difference::Removed {
                path: path.key(key),
                value: old_value.clone(),
            }),
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            differences.push(Difference::Added {
                path: path.key(key),
                value: new_value.clone(),
            });
        }
    }
}

/// Compact single line form of a value
fn inline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.kind().into()),
    }
}

impl std::fmt::Display for Difference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difference::Added { path, value } => write!(f, "+ {path}: {}", inline(value)),
            Difference::Removed { path, value } => write!(f, "- {path}: {}", inline(value)),
            Difference::Changed { path, old, new } => {
                write!(f, "~ {path}: {} -> {}", inline(old), inline(new))
            }
        }
    }
}
