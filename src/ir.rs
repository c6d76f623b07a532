use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Predicate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Declared parent. Optional; area membership is authoritative and the
    /// two must agree when both are present.
    #[serde(default, alias = "parent_id")]
    pub parent: Option<String>,
    /// Directly owned leaf elements and nested containers, in insertion order.
    #[serde(default, alias = "direct_item_ids")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSpec {
    pub kind: ElementKind,
    #[serde(default, alias = "display_text")]
    pub text: String,
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub endpoints: Vec<String>,
}

/// Logical input: the container tree plus leaf element descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalGraph {
    pub root: String,
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerSpec>,
    #[serde(default)]
    pub elements: BTreeMap<String, ElementSpec>,
    #[serde(default)]
    pub connectors: Vec<ConnectorSpec>,
}

impl LogicalGraph {
    pub fn new(root: &str) -> Self {
        let mut containers = BTreeMap::new();
        containers.insert(root.to_string(), ContainerSpec::default());
        Self {
            root: root.to_string(),
            containers,
            elements: BTreeMap::new(),
            connectors: Vec::new(),
        }
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn from_json5(input: &str) -> Result<Self, json5::Error> {
        json5::from_str(input)
    }

    /// Adds a nested container owned by `parent`.
    pub fn add_container(&mut self, id: &str, parent: &str) {
        self.containers
            .entry(id.to_string())
            .or_default()
            .parent = Some(parent.to_string());
        self.push_item(parent, id);
    }

    pub fn add_vertex(&mut self, container: &str, id: &str, name: Option<&str>) {
        self.add_element(container, id, ElementKind::Vertex, name.unwrap_or(""));
    }

    pub fn add_predicate(&mut self, container: &str, id: &str, text: &str) {
        self.add_element(container, id, ElementKind::Predicate, text);
    }

    fn add_element(&mut self, container: &str, id: &str, kind: ElementKind, text: &str) {
        let entry = self.elements.entry(id.to_string()).or_insert(ElementSpec {
            kind,
            text: String::new(),
            connections: Vec::new(),
        });
        entry.kind = kind;
        entry.text = text.to_string();
        self.push_item(container, id);
    }

    /// Records a connection from `from` to `to`. The pair becomes one
    /// two-endpoint connector.
    pub fn connect(&mut self, from: &str, to: &str) {
        if let Some(element) = self.elements.get_mut(from) {
            if !element.connections.iter().any(|existing| existing == to) {
                element.connections.push(to.to_string());
            }
        }
    }

    /// Adds an explicit connector joining two or more elements.
    pub fn add_connector(&mut self, id: Option<&str>, endpoints: &[&str]) {
        self.connectors.push(ConnectorSpec {
            id: id.map(str::to_string),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        });
    }

    fn push_item(&mut self, container: &str, item: &str) {
        let spec = self.containers.entry(container.to_string()).or_default();
        if !spec.items.iter().any(|existing| existing == item) {
            spec.items.push(item.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_membership_and_connections() {
        let mut graph = LogicalGraph::new("sheet");
        graph.add_container("A", "sheet");
        graph.add_vertex("A", "v", Some("x"));
        graph.add_predicate("A", "p", "Man");
        graph.connect("p", "v");
        graph.connect("p", "v");
        assert_eq!(graph.containers["sheet"].items, vec!["A"]);
        assert_eq!(graph.containers["A"].items, vec!["v", "p"]);
        assert_eq!(graph.containers["A"].parent.as_deref(), Some("sheet"));
        assert_eq!(graph.elements["p"].connections, vec!["v"]);
    }

    #[test]
    fn parses_snake_case_aliases() {
        let input = r#"{
            "root": "sheet",
            "containers": {
                "sheet": { "direct_item_ids": ["c1"] },
                "c1": { "parent_id": "sheet", "direct_item_ids": ["p"] }
            },
            "elements": {
                "p": { "kind": "predicate", "display_text": "P" }
            }
        }"#;
        let graph = LogicalGraph::from_json(input).unwrap();
        assert_eq!(graph.containers["c1"].parent.as_deref(), Some("sheet"));
        assert_eq!(graph.elements["p"].text, "P");
        assert!(graph.connectors.is_empty());
    }

    #[test]
    fn parses_json5_fixtures() {
        let input = r#"{
            // hand written
            root: 'sheet',
            containers: { sheet: { items: ['v'] } },
            elements: { v: { kind: 'vertex' } },
        }"#;
        let graph = LogicalGraph::from_json5(input).unwrap();
        assert_eq!(graph.elements["v"].kind, ElementKind::Vertex);
    }
}
