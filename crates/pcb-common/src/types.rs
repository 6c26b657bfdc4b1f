//! Domain name types used across the workspace.
//!
//! Each name is a thin wrapper around `String` so that a service name can
//! never be passed where a public volume name is expected.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the name from a string value.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Returns the inner string representation.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }
    };
}

name_type!(
    /// Name of a compose project, used to derive container and volume names.
    ProjectName
);

name_type!(
    /// Logical name of a service inside a project.
    ServiceName
);

name_type!(
    /// Engine-level name of a service's container.
    ContainerName
);

name_type!(
    /// Logical (in-project) name of a volume.
    VolumeName
);

name_type!(
    /// Engine-level name of a volume.
    PublicVolumeName
);

impl ContainerName {
    /// Name the orchestrator gives the first replica of `service`.
    #[must_use]
    pub fn derived(project: &ProjectName, service: &ServiceName) -> Self {
        Self(format!("{project}_{service}_1"))
    }
}

impl PublicVolumeName {
    /// Name the orchestrator gives `volume` inside `project`.
    #[must_use]
    pub fn derived(project: &ProjectName, volume: &VolumeName) -> Self {
        Self(format!("{project}_{volume}"))
    }
}
