//! Project volumes and their engine-side inspection data.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use pcb_common::error::{PcbError, Result};
use pcb_common::types::{ProjectName, PublicVolumeName, VolumeName};
use pcb_exec::{ArgCommand, ExecOptions, ExecutorTarget};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

use crate::backup::BackupConfig;

/// One element of `podman volume inspect` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInspect {
    /// Engine-level volume name.
    pub name: PublicVolumeName,
    /// Volume driver, usually `local`.
    pub driver: String,
    /// Host path backing the volume.
    pub mountpoint: PathBuf,
    /// Creation time.
    pub created_at: DateTime<FixedOffset>,
    /// Volume labels.
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    /// Volume scope, usually `local`.
    pub scope: String,
    /// Driver options.
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: BTreeMap<String, String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
struct VolumeDef {
    name: Option<String>,
    external: Option<Value>,
}

/// A named volume declared in the project's top-level `volumes`.
#[derive(Debug)]
pub struct Volume {
    name: VolumeName,
    public_name: PublicVolumeName,
    external: bool,
    definition: Mapping,
    inspect: OnceLock<VolumeInspect>,
    backup: OnceLock<BackupConfig>,
}

impl Volume {
    /// Builds the volume from its (possibly null) definition.
    ///
    /// The public name is the explicit `name`, the logical name for
    /// external volumes, or `{project}_{volume}`.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::Config`] if the definition is not a mapping.
    pub fn new(project: &ProjectName, name: VolumeName, definition: &Value) -> Result<Self> {
        let definition = match definition {
            Value::Null => Mapping::new(),
            Value::Mapping(def) => def.clone(),
            _ => {
                return Err(PcbError::config(format!(
                    "volume {name} must be a mapping or empty"
                )));
            }
        };
        let def: VolumeDef = serde_yaml::from_value(Value::Mapping(definition.clone()))
            .map_err(|e| PcbError::config(format!("invalid definition of volume {name}: {e}")))?;

        let (external, external_name) = match def.external {
            Some(Value::Bool(flag)) => (flag, None),
            Some(Value::Mapping(ext)) => (
                true,
                ext.get("name").and_then(Value::as_str).map(str::to_owned),
            ),
            _ => (false, None),
        };
        let public_name = match (def.name.or(external_name), external) {
            (Some(explicit), _) => PublicVolumeName::new(explicit),
            (None, true) => PublicVolumeName::new(name.as_str()),
            (None, false) => PublicVolumeName::derived(project, &name),
        };

        Ok(Self {
            name,
            public_name,
            external,
            definition,
            inspect: OnceLock::new(),
            backup: OnceLock::new(),
        })
    }

    /// Logical (in-project) name.
    pub const fn name(&self) -> &VolumeName {
        &self.name
    }

    /// Engine-level name.
    pub const fn public_name(&self) -> &PublicVolumeName {
        &self.public_name
    }

    /// Whether the volume is managed outside the project.
    pub const fn is_external(&self) -> bool {
        self.external
    }

    /// The merged definition from the compose documents.
    pub const fn definition(&self) -> &Mapping {
        &self.definition
    }

    /// Inspection data, if already fetched.
    pub fn cached_inspect(&self) -> Option<&VolumeInspect> {
        self.inspect.get()
    }

    /// Fetches `podman volume inspect` data through `engine`, once.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails, its output cannot be parsed,
    /// or it describes no volume.
    pub fn inspect(&self, engine: &dyn ExecutorTarget) -> Result<&VolumeInspect> {
        if let Some(found) = self.inspect.get() {
            return Ok(found);
        }
        tracing::info!(volume = %self.public_name, "inspecting volume");
        let done = ArgCommand::new(["volume", "inspect"])
            .arg(self.public_name.as_str())
            .run(engine, &ExecOptions::checked().capture())?;
        let found = done
            .to_json::<Vec<VolumeInspect>>()?
            .into_iter()
            .next()
            .ok_or_else(|| PcbError::NotFound {
                kind: "volume",
                id: self.public_name.to_string(),
            })?;
        Ok(self.inspect.get_or_init(|| found))
    }

    /// Backup policy derived from the volume's engine labels, once.
    ///
    /// # Errors
    ///
    /// Returns an error if inspection fails or the labels do not form a
    /// valid policy.
    pub fn backup_config(
        &self,
        engine: &dyn ExecutorTarget,
        prefixes: &[String],
    ) -> Result<&BackupConfig> {
        if let Some(config) = self.backup.get() {
            return Ok(config);
        }
        let labels = &self.inspect(engine)?.labels;
        let config = BackupConfig::from_labels(labels, prefixes)?;
        tracing::debug!(volume = %self.name, ?config, "derived backup config");
        Ok(self.backup.get_or_init(|| config))
    }
}

#[cfg(test)]
mod tests {
    use pcb_exec::scripted::{Reply, ScriptedExecutor};

    use super::*;

    const INSPECT: &str = r#"[
        {
            "Name": "shop_data",
            "Driver": "local",
            "Mountpoint": "/var/lib/containers/storage/volumes/shop_data/_data",
            "CreatedAt": "2024-03-01T12:30:00.123456789+01:00",
            "Labels": {
                "io.podman.compose.project": "shop",
                "work.banananet.podman.backup.stop": "yes",
                "work.banananet.podman.backup.compress-cmd": "zstd"
            },
            "Scope": "local",
            "Options": {}
        }
    ]"#;

    fn volume(def: &str) -> Volume {
        let value: Value = serde_yaml::from_str(def).unwrap();
        Volume::new(&"shop".into(), "data".into(), &value).unwrap()
    }

    fn prefixes() -> Vec<String> {
        vec!["work.banananet.podman.backup.".to_owned()]
    }

    #[test]
    fn default_public_name_is_prefixed() {
        assert_eq!(volume("~").public_name().as_str(), "shop_data");
    }

    #[test]
    fn explicit_public_name() {
        assert_eq!(volume("{name: legacy}").public_name().as_str(), "legacy");
    }

    #[test]
    fn external_volume_keeps_logical_name() {
        let vol = volume("{external: true}");
        assert!(vol.is_external());
        assert_eq!(vol.public_name().as_str(), "data");
        assert_eq!(volume("{external: {name: other}}").public_name().as_str(), "other");
    }

    #[test]
    fn list_definition_fails() {
        let value: Value = serde_yaml::from_str("[a]").unwrap();
        assert!(Volume::new(&"shop".into(), "data".into(), &value).is_err());
    }

    #[test]
    fn inspect_runs_once() {
        let engine = ScriptedExecutor::new().on(&["volume", "inspect"], Reply::stdout(INSPECT));
        let vol = volume("~");

        let found = vol.inspect(&engine).unwrap();
        assert_eq!(found.driver, "local");
        assert_eq!(found.created_at.to_rfc3339(), "2024-03-01T12:30:00.123456789+01:00");
        let _ = vol.inspect(&engine).unwrap();

        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, ["volume", "inspect", "shop_data"]);
        assert!(calls[0].options.check);
        assert!(calls[0].options.capture_stdout);
    }

    #[test]
    fn null_labels_are_empty() {
        let json = INSPECT.replace(
            r#""Labels": {
                "io.podman.compose.project": "shop",
                "work.banananet.podman.backup.stop": "yes",
                "work.banananet.podman.backup.compress-cmd": "zstd"
            }"#,
            r#""Labels": null"#,
        );
        let parsed: Vec<VolumeInspect> = serde_json::from_str(&json).unwrap();
        assert!(parsed[0].labels.is_empty());
    }

    #[test]
    fn empty_inspect_output_is_not_found() {
        let engine = ScriptedExecutor::new().on(&["volume", "inspect"], Reply::stdout("[]"));
        assert!(matches!(
            volume("~").inspect(&engine),
            Err(PcbError::NotFound { kind: "volume", .. })
        ));
    }

    #[test]
    fn backup_config_from_labels() {
        let engine = ScriptedExecutor::new().on(&["volume", "inspect"], Reply::stdout(INSPECT));
        let vol = volume("~");
        let config = vol.backup_config(&engine, &prefixes()).unwrap();
        assert!(config.stop);
        assert!(config.enable);
        assert_eq!(
            config.decompress_cmd.as_ref().map(|c| c.as_str()),
            Some("zstd -d")
        );
        let _ = vol.backup_config(&engine, &prefixes()).unwrap();
        assert_eq!(engine.calls().len(), 1);
    }

    #[test]
    fn failed_inspect_propagates() {
        let engine = ScriptedExecutor::new().on(&["volume", "inspect"], Reply::exit(125));
        assert!(matches!(
            volume("~").backup_config(&engine, &prefixes()),
            Err(PcbError::ExecFailed { exit_code: 125, .. })
        ));
    }
}
