//! Plain-text formatting helpers shared by the commands.

use std::fmt::Display;

use pcb_compose::ServiceVolumeMount;

/// Joins `items` with `, `, or `-` when there are none.
pub fn list_or_dash<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let joined = items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "-".to_owned()
    } else {
        joined
    }
}

/// `volume:target`, with `:ro` for read-only mounts.
pub fn format_mount(mount: &ServiceVolumeMount) -> String {
    let mode = if mount.read_only { ":ro" } else { "" };
    format!("{}:{}{mode}", mount.volume, mount.target)
}

/// Renders an optional value, `-` when absent.
pub fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}
