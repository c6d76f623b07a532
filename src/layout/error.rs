use std::time::Duration;

/// Malformed input hierarchy. Fatal: no layout phase runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("root container `{root}` is not declared")]
    MissingRoot { root: String },
    #[error("root container `{root}` declares parent `{parent}`")]
    RootHasParent { root: String, parent: String },
    #[error("id `{id}` is used by both a container and an element")]
    DuplicateId { id: String },
    #[error("item `{item}` is owned by both `{first}` and `{second}`")]
    MultipleOwners {
        item: String,
        first: String,
        second: String,
    },
    #[error("area `{container}` lists unknown item `{item}`")]
    UnknownItem { container: String, item: String },
    #[error("container `{container}` declares unknown parent `{parent}`")]
    UnknownParent { container: String, parent: String },
    #[error("container `{container}` declares parent `{declared}` but is owned by `{owner}`")]
    ConflictingParent {
        container: String,
        declared: String,
        owner: String,
    },
    #[error("container `{container}` has no parent area")]
    OrphanContainer { container: String },
    #[error("element `{element}` is not owned by any area")]
    OrphanElement { element: String },
    #[error("container parent chain is cyclic: {}", .ids.join(" -> "))]
    Cycle { ids: Vec<String> },
    #[error("`{from}` connects to unknown element `{to}`")]
    UnknownEndpoint { from: String, to: String },
    #[error("connector `{connector}` needs at least two distinct endpoints")]
    DegenerateConnector { connector: String },
}

impl ConfigError {
    /// Ids named by the error, for diagnostics.
    pub fn ids(&self) -> Vec<String> {
        match self {
            ConfigError::MissingRoot { root } => vec![root.clone()],
            ConfigError::RootHasParent { root, parent } => vec![root.clone(), parent.clone()],
            ConfigError::DuplicateId { id } => vec![id.clone()],
            ConfigError::MultipleOwners {
                item,
                first,
                second,
            } => vec![item.clone(), first.clone(), second.clone()],
            ConfigError::UnknownItem { container, item } => vec![container.clone(), item.clone()],
            ConfigError::UnknownParent { container, parent } => {
                vec![container.clone(), parent.clone()]
            }
            ConfigError::ConflictingParent {
                container,
                declared,
                owner,
            } => vec![container.clone(), declared.clone(), owner.clone()],
            ConfigError::OrphanContainer { container } => vec![container.clone()],
            ConfigError::OrphanElement { element } => vec![element.clone()],
            ConfigError::Cycle { ids } => ids.clone(),
            ConfigError::UnknownEndpoint { from, to } => vec![from.clone(), to.clone()],
            ConfigError::DegenerateConnector { connector } => vec![connector.clone()],
        }
    }
}

/// Failure of the optional external layout tool. Always recovered by the
/// proportional fallback.
#[derive(Debug, thiserror::Error)]
pub enum ExternalToolError {
    #[error("layout tool `{program}` was not found")]
    NotFound { program: String },
    #[error("failed to start layout tool `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("layout tool i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout tool timed out after {0:?}")]
    Timeout(Duration),
    #[error("layout tool exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("layout tool output could not be parsed: {0}")]
    Unparseable(String),
}

/// A bounds assignment that breaks nesting or sibling disjointness and could
/// not be corrected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("containment violation at `{container}`{}: {detail}", other_suffix(.other))]
pub struct ContainmentViolation {
    pub container: String,
    pub other: Option<String>,
    pub detail: String,
}

fn other_suffix(other: &Option<String>) -> String {
    match other {
        Some(id) => format!(" / `{id}`"),
        None => String::new(),
    }
}

impl ContainmentViolation {
    pub fn new(container: &str, other: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            container: container.to_string(),
            other: other.map(str::to_string),
            detail: detail.into(),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids = vec![self.container.clone()];
        if let Some(other) = &self.other {
            ids.push(other.clone());
        }
        ids
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Containment(#[from] ContainmentViolation),
    #[error("phase `{phase}` depends on `{dependency}`, which is missing or cyclic")]
    PhaseOrder { phase: String, dependency: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_name_offending_ids() {
        let err = ConfigError::Cycle {
            ids: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "container parent chain is cyclic: a -> b -> a");
        assert_eq!(err.ids().len(), 3);
    }

    #[test]
    fn containment_violation_formats_both_ids() {
        let violation = ContainmentViolation::new("A", Some("B"), "siblings overlap");
        assert_eq!(
            violation.to_string(),
            "containment violation at `A` / `B`: siblings overlap"
        );
        let single = ContainmentViolation::new("A", None, "escapes parent");
        assert_eq!(single.to_string(), "containment violation at `A`: escapes parent");
    }
}
