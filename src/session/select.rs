use anyhow::{Result, bail};

use super::{Registry, SessionInstance};

/// What the caller asked to run.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub names: Vec<String>,
    pub tags: Vec<String>,
    pub pythons: Vec<String>,
}

/// Resolve a selection against the registry, in registry order.
///
/// Names match either a definition name (`pytest`) or a full instance name
/// (`pytest-3.10(django='3.2.16', drf='3.14.0')`). Names and tags narrow each
/// other; with neither, `defaults` applies. A python filter drops sessions
/// that run without a virtualenv.
pub fn select<'a>(
    registry: &'a Registry,
    selection: &Selection,
    defaults: &[String],
) -> Result<Vec<&'a SessionInstance>> {
    let names = if selection.names.is_empty() && selection.tags.is_empty() {
        defaults
    } else {
        selection.names.as_slice()
    };

    let unknown: Vec<&str> = names
        .iter()
        .filter(|name| !registry.iter().any(|session| matches_name(session, name)))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("sessions not found: {}", unknown.join(", "));
    }

    let chosen: Vec<&SessionInstance> = registry
        .iter()
        .filter(|session| names.is_empty() || names.iter().any(|n| matches_name(session, n)))
        .filter(|session| {
            selection.tags.is_empty() || selection.tags.iter().any(|tag| session.has_tag(tag))
        })
        .filter(|session| {
            selection.pythons.is_empty()
                || session
                    .python
                    .as_ref()
                    .is_some_and(|python| selection.pythons.contains(python))
        })
        .collect();

    if chosen.is_empty() {
        bail!("no sessions selected");
    }
    Ok(chosen)
}

fn matches_name(session: &SessionInstance, name: &str) -> bool {
    session.base == name || session.name == name
}
