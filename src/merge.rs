//! # Deep Merge
//!
//! Recursive merge of parsed YAML documents into one accumulator.
//!
//! Rules for every key of the source mapping:
//! - **Mapping**: merged recursively into the target's mapping at that key.
//!   An empty mapping is created first when the key is absent or holds an
//!   empty value (null, `false`, zero, `""`); any other non-mapping value is
//!   kept and the incoming mapping is dropped
//! - **Sequence onto sequence**: source items are appended in order
//! - **Anything else**: the source value overwrites the target value

use serde_yaml::{Mapping, Value};
use std::num::FpCategory;

/// Whether a value counts as set when a mapping is merged onto it
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| !matches!(f.classify(), FpCategory::Zero | FpCategory::Nan)),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => true,
    }
}

/// Merge `source` into `target` in place
pub fn deep_merge(target: &mut Mapping, source: Mapping) {
    for (key, value) in source {
        match value {
            Value::Mapping(nested) => {
                if !target.get(&key).is_some_and(is_truthy) {
                    target.insert(key.clone(), Value::Mapping(Mapping::new()));
                }
                if let Some(Value::Mapping(existing)) = target.get_mut(&key) {
                    deep_merge(existing, nested);
                }
            }
            Value::Sequence(items) => match target.get_mut(&key) {
                Some(Value::Sequence(existing)) => existing.extend(items),
                _ => {
                    target.insert(key, Value::Sequence(items));
                }
            },
            scalar => {
                target.insert(key, scalar);
            }
        }
    }
}

/// Merge every source into `target`, left to right, and return the result
#[must_use]
pub fn merge_all<I>(mut target: Mapping, sources: I) -> Mapping
where
    I: IntoIterator<Item = Mapping>,
{
    for source in sources {
        deep_merge(&mut target, source);
    }
    target
}
