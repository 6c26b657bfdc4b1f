//! Recursive merge of normalized compose documents.
//!
//! Later documents override earlier ones:
//!
//! - mappings merge key by key, recursively;
//! - scalars are replaced;
//! - `command` and `entrypoint` are replaced wholesale;
//! - other lists are concatenated, except that `depends_on` drops
//!   duplicates and a service's `volumes` replaces entries mounting the
//!   same target;
//! - a null on either side yields the other side.
//!
//! Mixing a mapping, a list, and a scalar under one key is an error.

use pcb_common::error::{PcbError, Result};
use serde_yaml::{Mapping, Value};

use crate::mount::mount_target;

const REPLACED_KEYS: &[&str] = &["command", "entrypoint"];

/// Merges `source` into `target`.
///
/// # Errors
///
/// Returns [`PcbError::Config`] naming the dotted key path when both
/// sides hold incompatible kinds of value.
pub fn merge_into(target: &mut Mapping, source: Mapping) -> Result<()> {
    merge_mapping(target, source, &mut Vec::new())
}

fn merge_mapping(target: &mut Mapping, source: Mapping, path: &mut Vec<String>) -> Result<()> {
    for (key, incoming) in source {
        let key_name = key.as_str().map_or_else(|| format!("{key:?}"), str::to_owned);
        match target.get_mut(&key) {
            None => {
                let _ = target.insert(key, incoming);
            }
            Some(existing) => {
                path.push(key_name);
                merge_value(existing, incoming, path)?;
                let _ = path.pop();
            }
        }
    }
    Ok(())
}

fn merge_value(existing: &mut Value, incoming: Value, path: &mut Vec<String>) -> Result<()> {
    let key = path.last().map_or("", String::as_str);
    if REPLACED_KEYS.contains(&key) {
        *existing = incoming;
        return Ok(());
    }
    match (existing, incoming) {
        (_, Value::Null) => {}
        (existing, incoming) if existing.is_null() => *existing = incoming,
        (Value::Mapping(existing), Value::Mapping(incoming)) => {
            merge_mapping(existing, incoming, path)?;
        }
        (Value::Sequence(existing), Value::Sequence(incoming)) => {
            merge_sequence(existing, incoming, path);
        }
        (existing, incoming) if is_scalar(existing) && is_scalar(&incoming) => {
            *existing = incoming;
        }
        (existing, incoming) => {
            return Err(PcbError::config(format!(
                "can't merge value of [{}] of kind {} with {}",
                path.join("."),
                kind(existing),
                kind(&incoming)
            )));
        }
    }
    Ok(())
}

fn merge_sequence(existing: &mut Vec<Value>, incoming: Vec<Value>, path: &[String]) {
    let is_service_key = |name: &str| {
        path.len() == 3 && path.first().is_some_and(|p| p == "services") && path[2] == name
    };
    if is_service_key("depends_on") {
        for item in incoming {
            if !existing.contains(&item) {
                existing.push(item);
            }
        }
    } else if is_service_key("volumes") {
        for item in incoming {
            let target = mount_target(&item);
            if target.is_some() {
                existing.retain(|old| mount_target(old) != target);
            }
            existing.push(item);
        }
    } else {
        existing.extend(incoming);
    }
}

const fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) | Value::Number(_) | Value::String(_) => "scalar",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
