//! Per-volume backup policy derived from volume labels.
//!
//! Labels under a recognised prefix (e.g.
//! `work.banananet.podman.backup.compress-cmd`) configure one field each.
//! The prefix is stripped and dashes become underscores, then the field is
//! looked up in [`LABEL_FIELDS`], which fixes its type and how the value
//! is applied.

use std::collections::BTreeMap;

use pcb_common::constants::{
    DEFAULT_BACKUP_CMD, DEFAULT_BACKUP_IMAGE, DEFAULT_MOUNT_TARGET, DEFAULT_RESTORE_CMD,
};
use pcb_common::error::{PcbError, Result};
use pcb_exec::ShellCommand;
use serde::Deserialize;

/// How a volume is backed up, restored, and optionally compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Whether the volume takes part in backups.
    pub enable: bool,
    /// Container to run the backup in instead of a fresh one.
    pub container: Option<String>,
    /// Image of the backup container.
    pub image: String,
    /// Where the volume is mounted inside the backup container.
    pub mount_target: String,
    /// Stop the services using the volume before backing it up.
    pub stop: bool,
    /// Writes the volume content to stdout.
    pub backup_cmd: ShellCommand,
    /// Reads the volume content from stdin.
    pub restore_cmd: ShellCommand,
    /// Image running the compression commands.
    pub compress_image: Option<String>,
    /// Compresses stdin to stdout.
    pub compress_cmd: Option<ShellCommand>,
    /// Decompresses stdin to stdout.
    pub decompress_cmd: Option<ShellCommand>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enable: true,
            container: None,
            image: DEFAULT_BACKUP_IMAGE.to_owned(),
            mount_target: DEFAULT_MOUNT_TARGET.to_owned(),
            stop: false,
            backup_cmd: ShellCommand::new(DEFAULT_BACKUP_CMD),
            restore_cmd: ShellCommand::new(DEFAULT_RESTORE_CMD),
            compress_image: None,
            compress_cmd: None,
            decompress_cmd: None,
        }
    }
}

/// A raw label value: engine labels are strings, compose labels may be
/// native booleans.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// Native boolean.
    Bool(bool),
    /// Text.
    Text(String),
}

impl From<&str> for LabelValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<&String> for LabelValue {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<String> for LabelValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for LabelValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

/// Type of a configurable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Parsed with [`parse_bool`].
    Flag,
    /// Taken verbatim.
    Text,
}

enum Parsed {
    Flag(bool),
    Text(String),
}

/// One configurable field of [`BackupConfig`].
pub struct LabelField {
    /// Field name: label suffix with dashes replaced by underscores.
    pub name: &'static str,
    /// Expected type.
    pub kind: FieldKind,
    apply: fn(&mut BackupConfig, Parsed),
}

impl std::fmt::Debug for LabelField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

macro_rules! flag_field {
    ($name:literal, $field:ident) => {
        LabelField {
            name: $name,
            kind: FieldKind::Flag,
            apply: |config, value| {
                if let Parsed::Flag(flag) = value {
                    config.$field = flag;
                }
            },
        }
    };
}

macro_rules! text_field {
    ($name:literal, $field:ident, $convert:expr) => {
        LabelField {
            name: $name,
            kind: FieldKind::Text,
            apply: |config, value| {
                if let Parsed::Text(text) = value {
                    config.$field = $convert(text);
                }
            },
        }
    };
}

/// Every field settable through labels.
pub const LABEL_FIELDS: &[LabelField] = &[
    flag_field!("enable", enable),
    text_field!("container", container, Some),
    text_field!("image", image, std::convert::identity),
    text_field!("mount_target", mount_target, std::convert::identity),
    flag_field!("stop", stop),
    text_field!("backup_cmd", backup_cmd, ShellCommand::new),
    text_field!("restore_cmd", restore_cmd, ShellCommand::new),
    text_field!("compress_image", compress_image, Some),
    text_field!("compress_cmd", compress_cmd, |t| Some(ShellCommand::new(t))),
    text_field!("decompress_cmd", decompress_cmd, |t| Some(ShellCommand::new(t))),
];

/// Parses a label flag: values starting with `t`, `y` or `1`
/// (case-insensitive) are true, everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.chars().next().map(|c| c.to_ascii_lowercase()),
        Some('t' | 'y' | '1')
    )
}

/// Selects the labels under `prefixes`, keyed by field name.
///
/// For a field set under several prefixes, the earliest prefix in
/// `prefixes` wins.
pub fn select_labels<I, K, V, P>(labels: I, prefixes: &[P]) -> BTreeMap<String, LabelValue>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<LabelValue>,
    P: AsRef<str>,
{
    let mut ranked: BTreeMap<String, (usize, LabelValue)> = BTreeMap::new();
    for (key, value) in labels {
        let key = key.as_ref();
        let Some((rank, suffix)) = prefixes
            .iter()
            .enumerate()
            .find_map(|(rank, prefix)| key.strip_prefix(prefix.as_ref()).map(|s| (rank, s)))
        else {
            continue;
        };
        let field = suffix.replace('-', "_");
        let value = value.into();
        match ranked.get(&field) {
            Some((existing, _)) if *existing <= rank => {
                tracing::debug!(label = key, "ignoring label shadowed by an earlier prefix");
            }
            _ => {
                let _ = ranked.insert(field, (rank, value));
            }
        }
    }
    ranked
        .into_iter()
        .map(|(field, (_, value))| (field, value))
        .collect()
}

impl BackupConfig {
    /// Derives the policy from a volume's labels.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::Config`] for a label naming no known field and
    /// [`PcbError::DecompressWithoutCompress`] when only a decompress
    /// command is given.
    pub fn from_labels<I, K, V, P>(labels: I, prefixes: &[P]) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<LabelValue>,
        P: AsRef<str>,
    {
        Self::from_fields(select_labels(labels, prefixes))
    }

    /// Builds the policy from field values, applying defaults and the
    /// compress/decompress rule.
    ///
    /// # Errors
    ///
    /// See [`BackupConfig::from_labels`].
    pub fn from_fields(fields: BTreeMap<String, LabelValue>) -> Result<Self> {
        let mut config = Self::default();
        for (name, value) in fields {
            let Some(field) = LABEL_FIELDS.iter().find(|f| f.name == name) else {
                return Err(PcbError::config(format!(
                    "unknown backup label field {name:?}"
                )));
            };
            let parsed = match (field.kind, value) {
                (FieldKind::Flag, LabelValue::Bool(flag)) => Parsed::Flag(flag),
                (FieldKind::Flag, LabelValue::Text(text)) => Parsed::Flag(parse_bool(&text)),
                (FieldKind::Text, LabelValue::Text(text)) => Parsed::Text(text),
                (FieldKind::Text, LabelValue::Bool(flag)) => Parsed::Text(flag.to_string()),
            };
            (field.apply)(&mut config, parsed);
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        let derived = match (&self.compress_cmd, &self.decompress_cmd) {
            (None, Some(decompress)) => {
                return Err(PcbError::DecompressWithoutCompress {
                    decompress: decompress.to_string(),
                });
            }
            (Some(compress), None) => Some(compress.append(" -d")),
            _ => None,
        };
        if derived.is_some() {
            self.decompress_cmd = derived;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "work.banananet.podman.backup.";

    fn labels(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (format!("{PREFIX}{k}"), (*v).to_owned()))
            .collect()
    }

    fn derive(pairs: &[(&str, &str)]) -> Result<BackupConfig> {
        BackupConfig::from_labels(labels(pairs), &[PREFIX])
    }

    #[test]
    fn no_labels_yield_defaults() {
        let config = derive(&[]).unwrap();
        assert_eq!(config, BackupConfig::default());
        assert!(config.enable);
        assert!(!config.stop);
        assert_eq!(config.image, "docker.io/library/debian:stable");
        assert_eq!(config.mount_target, "/_volume");
        assert_eq!(config.backup_cmd.as_str(), "tar -cf - .");
        assert_eq!(config.restore_cmd.as_str(), "tar -xf -");
        assert!(config.decompress_cmd.is_none());
    }

    #[test]
    fn parse_bool_truthy_and_falsy() {
        for truthy in ["true", "Yes", "1", "TRUE", "y", "t"] {
            assert!(parse_bool(truthy), "{truthy}");
        }
        for falsy in ["false", "no", "0", "", "off", "N"] {
            assert!(!parse_bool(falsy), "{falsy}");
        }
    }

    #[test]
    fn dashed_labels_set_fields() {
        let config = derive(&[
            ("enable", "no"),
            ("container", "shop_db_1"),
            ("image", "alpine"),
            ("mount-target", "/data"),
            ("stop", "yes"),
            ("backup-cmd", "pg_dump"),
            ("restore-cmd", "psql"),
            ("compress-image", "zstd-img"),
        ])
        .unwrap();
        assert!(!config.enable);
        assert_eq!(config.container.as_deref(), Some("shop_db_1"));
        assert_eq!(config.image, "alpine");
        assert_eq!(config.mount_target, "/data");
        assert!(config.stop);
        assert_eq!(config.backup_cmd.as_str(), "pg_dump");
        assert_eq!(config.restore_cmd.as_str(), "psql");
        assert_eq!(config.compress_image.as_deref(), Some("zstd-img"));
    }

    #[test]
    fn compress_derives_decompress() {
        let config = derive(&[("compress-cmd", "zstd")]).unwrap();
        assert_eq!(config.compress_cmd.unwrap().as_str(), "zstd");
        assert_eq!(config.decompress_cmd.unwrap().as_str(), "zstd -d");
    }

    #[test]
    fn explicit_decompress_is_kept() {
        let config = derive(&[("compress-cmd", "gzip"), ("decompress-cmd", "gunzip")]).unwrap();
        assert_eq!(config.decompress_cmd.unwrap().as_str(), "gunzip");
    }

    #[test]
    fn decompress_without_compress_fails() {
        assert!(matches!(
            derive(&[("decompress-cmd", "zstd -d")]),
            Err(PcbError::DecompressWithoutCompress { .. })
        ));
    }

    #[test]
    fn unprefixed_labels_are_ignored() {
        let config = BackupConfig::from_labels(
            [("io.podman.compose.project", "shop"), ("stop", "yes")],
            &[PREFIX],
        )
        .unwrap();
        assert!(!config.stop);
    }

    #[test]
    fn unknown_field_fails() {
        assert!(matches!(
            derive(&[("retention", "7d")]),
            Err(PcbError::Config { .. })
        ));
    }

    #[test]
    fn earlier_prefix_wins_regardless_of_label_order() {
        let prefixes = ["org.example.backup.", PREFIX];
        let labels = [
            (format!("{PREFIX}image"), "late"),
            ("org.example.backup.image".to_owned(), "early"),
            (format!("{PREFIX}stop"), "true"),
        ];
        let config = BackupConfig::from_labels(labels, &prefixes).unwrap();
        assert_eq!(config.image, "early");
        assert!(config.stop);
    }

    #[test]
    fn native_booleans_are_accepted() {
        let labels = [
            (format!("{PREFIX}stop"), LabelValue::Bool(true)),
            (format!("{PREFIX}enable"), LabelValue::Bool(false)),
        ];
        let config = BackupConfig::from_labels(labels, &[PREFIX]).unwrap();
        assert!(config.stop);
        assert!(!config.enable);
    }

    #[test]
    fn every_table_entry_is_settable() {
        for field in LABEL_FIELDS {
            let candidates = match field.kind {
                FieldKind::Flag => vec![LabelValue::Bool(true), LabelValue::Bool(false)],
                FieldKind::Text => vec![LabelValue::from("x")],
            };
            let changed = candidates.into_iter().any(|value| {
                let mut fields = BTreeMap::new();
                let _ = fields.insert(field.name.to_owned(), value);
                if field.name == "decompress_cmd" {
                    let _ = fields.insert("compress_cmd".to_owned(), LabelValue::from("x"));
                }
                BackupConfig::from_fields(fields).unwrap() != BackupConfig::default()
            });
            assert!(changed, "{} has no effect", field.name);
        }
    }
}
