//! Service volume mounts.
//!
//! Only named volumes are supported. Short form is
//! `SOURCE:TARGET[:MODE]`; long form is a mapping whose `type` must be
//! `volume`. Bind mounts, tmpfs, named pipes, and anonymous volumes are
//! rejected.

use std::collections::BTreeMap;

use pcb_common::error::{PcbError, Result};
use pcb_common::types::{ServiceName, VolumeName};
use serde::Deserialize;
use serde_yaml::Value;

use crate::volume::Volume;

/// A named volume mounted into a service's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceVolumeMount {
    /// Service owning the mount.
    pub service: ServiceName,
    /// Mounted volume, present in the project's volumes.
    pub volume: VolumeName,
    /// Path inside the container.
    pub target: String,
    /// Whether the volume is mounted read-only.
    pub read_only: bool,
}

#[derive(Debug, Deserialize)]
struct LongMountDef {
    #[serde(rename = "type")]
    kind: Option<String>,
    source: Option<String>,
    target: Option<String>,
    #[serde(default)]
    read_only: bool,
}

impl ServiceVolumeMount {
    /// Parses one entry of a service's `volumes` list.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::UnsupportedMount`] for anything but a named
    /// volume, [`PcbError::Config`] for malformed entries, and
    /// [`PcbError::NotFound`] if the volume is not declared in `volumes`.
    pub fn parse(
        service: &ServiceName,
        definition: &Value,
        volumes: &BTreeMap<VolumeName, Volume>,
    ) -> Result<Self> {
        let (source, target, read_only) = match definition {
            Value::String(short) => parse_short(short)?,
            Value::Mapping(_) => parse_long(definition)?,
            other => {
                return Err(PcbError::config(format!(
                    "volume entry of service {service} must be a string or a mapping, got {other:?}"
                )));
            }
        };
        let Some((volume, _)) = volumes.get_key_value(source.as_str()) else {
            return Err(PcbError::NotFound {
                kind: "volume",
                id: source,
            });
        };
        Ok(Self {
            service: service.clone(),
            volume: volume.clone(),
            target,
            read_only,
        })
    }
}

fn unsupported(definition: impl Into<String>, reason: impl Into<String>) -> PcbError {
    PcbError::UnsupportedMount {
        definition: definition.into(),
        reason: reason.into(),
    }
}

fn parse_short(short: &str) -> Result<(String, String, bool)> {
    let parts: Vec<&str> = short.splitn(3, ':').collect();
    let (source, target, mode) = match parts.as_slice() {
        [_] => return Err(unsupported(short, "implicit volumes are not supported")),
        [source, target] => (*source, *target, "rw"),
        [source, target, mode] => (*source, *target, *mode),
        _ => return Err(unsupported(short, "empty volume definition")),
    };
    let read_only = match mode {
        "ro" => true,
        "rw" => false,
        other => return Err(unsupported(short, format!("unsupported mode {other:?}"))),
    };
    if source.contains('/') {
        return Err(unsupported(short, "unsupported volume type 'bind'"));
    }
    Ok((source.to_owned(), target.to_owned(), read_only))
}

fn parse_long(definition: &Value) -> Result<(String, String, bool)> {
    let rendered = || serde_yaml::to_string(definition).unwrap_or_default().trim().to_owned();
    let def: LongMountDef = serde_yaml::from_value(definition.clone())
        .map_err(|e| PcbError::config(format!("invalid long-form volume {}: {e}", rendered())))?;
    match def.kind.as_deref() {
        Some("volume") => {}
        Some(other) => {
            return Err(unsupported(rendered(), format!("unsupported volume type {other:?}")));
        }
        None => {
            return Err(PcbError::config(format!(
                "long-form volume {} has no type",
                rendered()
            )));
        }
    }
    let Some(source) = def.source else {
        return Err(unsupported(rendered(), "anonymous volumes are not supported"));
    };
    let Some(target) = def.target else {
        return Err(PcbError::config(format!(
            "long-form volume {} has no target",
            rendered()
        )));
    };
    Ok((source, target, def.read_only))
}

/// Container path a `volumes` entry mounts to, if it can be determined.
pub fn mount_target(definition: &Value) -> Option<String> {
    match definition {
        Value::String(short) => {
            let mut parts = short.splitn(3, ':');
            let first = parts.next()?;
            Some(parts.next().unwrap_or(first).to_owned())
        }
        Value::Mapping(_) => definition
            .get("target")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}
