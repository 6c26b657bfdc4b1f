//! Reads, normalizes, interpolates, and merges compose files into a
//! [`Project`].

use std::path::{Path, PathBuf};

use pcb_common::error::{PcbError, Result};
use pcb_common::types::ProjectName;
use serde_yaml::{Mapping, Value};

use crate::interpolate::{Environment, interpolate_document, process_environment};
use crate::merge::merge_into;
use crate::normalize::normalize;
use crate::project::Project;

/// Resolves a list of compose files into a project.
#[derive(Debug, Clone)]
pub struct ComposeLoader {
    env: Environment,
    project_name: Option<String>,
}

impl Default for ComposeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeLoader {
    /// Loader substituting from a snapshot of the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_environment(process_environment())
    }

    /// Loader substituting from `env` only.
    #[must_use]
    pub const fn with_environment(env: Environment) -> Self {
        Self {
            env,
            project_name: None,
        }
    }

    /// Overrides the project name derived from the reference directory.
    #[must_use]
    pub fn project_name(mut self, name: Option<String>) -> Self {
        self.project_name = name;
        self
    }

    /// Loads `files`, merging them in order.
    ///
    /// # Errors
    ///
    /// Returns [`PcbError::Io`] if a file cannot be read,
    /// [`PcbError::Config`] for malformed documents, and
    /// [`PcbError::UnsupportedVersion`] for a schema other than 3.x.
    pub fn load(&self, files: &[PathBuf]) -> Result<Project> {
        let Some(first) = files.first() else {
            return Err(PcbError::config("no compose file given"));
        };
        let ref_dir = match first.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        tracing::info!(count = files.len(), ref_dir = %ref_dir.display(), "loading compose files");
        let mut merged = Mapping::new();
        for file in files {
            let document = self.read_document(file)?;
            merge_into(&mut merged, document)?;
        }

        let name = match &self.project_name {
            Some(name) => ProjectName::new(name.as_str()),
            None => default_project_name(&ref_dir)?,
        };
        Project::from_document(name, ref_dir, files.to_vec(), merged)
    }

    fn read_document(&self, path: &Path) -> Result<Mapping> {
        tracing::debug!(file = %path.display(), "reading compose file");
        let content = std::fs::read_to_string(path).map_err(|source| PcbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Mapping(mut document) = serde_yaml::from_str::<Value>(&content)? else {
            return Err(PcbError::config(format!(
                "compose file does not contain a top level object: {}",
                path.display()
            )));
        };
        normalize(&mut document)?;
        interpolate_document(&mut document, &self.env)?;
        Ok(document)
    }
}

fn default_project_name(ref_dir: &Path) -> Result<ProjectName> {
    let resolved = ref_dir.canonicalize().map_err(|source| PcbError::Io {
        path: ref_dir.to_path_buf(),
        source,
    })?;
    resolved
        .file_name()
        .map(|name| ProjectName::new(name.to_string_lossy()))
        .ok_or_else(|| {
            PcbError::config(format!(
                "cannot derive a project name from {}, pass one explicitly",
                resolved.display()
            ))
        })
}

/// Loads `files` with the process environment.
///
/// # Errors
///
/// See [`ComposeLoader::load`].
pub fn load(files: &[PathBuf], project_name: Option<String>) -> Result<Project> {
    ComposeLoader::new().project_name(project_name).load(files)
}
