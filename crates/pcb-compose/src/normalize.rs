//! Structural normalization of a compose document.
//!
//! Short forms are rewritten into one canonical shape so that merging
//! never has to compare, say, a `depends_on` string with a list.

use pcb_common::error::{PcbError, Result};
use serde_yaml::{Mapping, Value};

/// Rewrites short forms of every service in `document` in place.
///
/// # Errors
///
/// Returns [`PcbError::Config`] if `services` or a service is not a mapping.
pub fn normalize(document: &mut Mapping) -> Result<()> {
    let Some(services) = document.get_mut("services") else {
        return Ok(());
    };
    let services = match services {
        Value::Mapping(services) => services,
        Value::Null => return Ok(()),
        _ => return Err(PcbError::config("`services` must be a mapping")),
    };
    for (name, service) in services.iter_mut() {
        let name = name.as_str().unwrap_or("<non-string>");
        match service {
            Value::Mapping(def) => normalize_service(name, def)?,
            Value::Null => *service = Value::Mapping(Mapping::new()),
            _ => {
                return Err(PcbError::config(format!(
                    "service {name:?} must be a mapping"
                )));
            }
        }
    }
    Ok(())
}

fn normalize_service(name: &str, def: &mut Mapping) -> Result<()> {
    if let Some(build) = def.get_mut("build") {
        if let Value::String(context) = build {
            let mut long = Mapping::new();
            let _ = long.insert("context".into(), Value::String(std::mem::take(context)));
            *build = Value::Mapping(long);
        }
    }
    if let Some(depends_on) = def.get_mut("depends_on") {
        *depends_on = match std::mem::take(depends_on) {
            Value::String(single) => Value::Sequence(vec![Value::String(single)]),
            // long form: {db: {condition: service_healthy}}
            Value::Mapping(conditions) => Value::Sequence(conditions.into_keys().collect()),
            Value::Null => Value::Sequence(Vec::new()),
            other => other,
        };
    }
    if let Some(environment) = def.get_mut("environment") {
        if let Value::Sequence(entries) = environment {
            *environment = Value::Mapping(environment_as_mapping(name, entries)?);
        }
    }
    for key in ["env_file", "volumes"] {
        if let Some(entry) = def.get_mut(key) {
            if matches!(entry, Value::String(_) | Value::Mapping(_)) {
                *entry = Value::Sequence(vec![std::mem::take(entry)]);
            }
        }
    }
    Ok(())
}

fn environment_as_mapping(service: &str, entries: &[Value]) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    for entry in entries {
        let Some(entry) = entry.as_str() else {
            return Err(PcbError::config(format!(
                "environment entries of service {service:?} must be strings"
            )));
        };
        let (key, value) = match entry.split_once('=') {
            Some((key, value)) => (key, Value::String(value.to_owned())),
            None => (entry, Value::Null),
        };
        let _ = mapping.insert(Value::String(key.to_owned()), value);
    }
    Ok(mapping)
}
