use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::error::ConfigError;
use super::types::{ContainerInfo, Connector};
use crate::ir::{ElementKind, LogicalGraph};

/// Container tree derived from area membership, stored as an arena keyed by id.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub root: String,
    pub containers: BTreeMap<String, ContainerInfo>,
    /// Leaf element id → owning container id.
    pub element_owner: BTreeMap<String, String>,
}

impl Hierarchy {
    pub fn container(&self, id: &str) -> Option<&ContainerInfo> {
        self.containers.get(id)
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.containers
            .get(id)
            .and_then(|info| info.parent_id.as_deref())
    }

    pub fn max_depth(&self) -> usize {
        self.containers
            .values()
            .map(|info| info.depth)
            .max()
            .unwrap_or(0)
    }

    pub fn has_nesting(&self) -> bool {
        self.containers.len() > 1
    }

    /// Root first, children in area order.
    pub fn pre_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.containers.len());
        let mut stack = vec![self.root.clone()];
        while let Some(id) = stack.pop() {
            if let Some(info) = self.containers.get(&id) {
                for child in info.children.iter().rev() {
                    stack.push(child.clone());
                }
            }
            order.push(id);
        }
        order
    }

    /// Inside-out order: every container appears after all of its
    /// descendants.
    pub fn post_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.containers.len());
        let mut stack: Vec<(String, bool)> = vec![(self.root.clone(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id.clone(), true));
            if let Some(info) = self.containers.get(&id) {
                for child in info.children.iter().rev() {
                    stack.push((child.clone(), false));
                }
            }
        }
        order
    }

    /// Containers ordered by depth, shallowest first, ties in pre-order.
    pub fn processing_rank(&self) -> Vec<String> {
        let mut order = self.pre_order();
        order.sort_by_key(|id| self.containers.get(id).map(|info| info.depth).unwrap_or(0));
        order
    }

    /// The container itself followed by its ancestors up to the root.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(node) = current {
            current = self.parent(&node).map(str::to_string);
            chain.push(node);
            if chain.len() > self.containers.len() {
                break;
            }
        }
        chain
    }

    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        self.ancestors(id).iter().any(|node| node == ancestor)
    }

    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> String {
        let chain_a = self.ancestors(a);
        for node in self.ancestors(b) {
            if chain_a.contains(&node) {
                return node;
            }
        }
        self.root.clone()
    }

    /// `id` and every container nested below it.
    pub fn subtree(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(node) = stack.pop() {
            if let Some(info) = self.containers.get(&node) {
                for child in info.children.iter().rev() {
                    stack.push(child.clone());
                }
            }
            out.push(node);
        }
        out
    }

    /// Leaf elements owned by `id` or any container below it.
    pub fn subtree_elements(&self, id: &str) -> Vec<String> {
        self.subtree(id)
            .iter()
            .filter_map(|node| self.containers.get(node))
            .flat_map(|info| info.element_ids.iter().cloned())
            .collect()
    }
}

/// Builds the container tree from area membership, validating the input.
pub fn extract_hierarchy(graph: &LogicalGraph) -> Result<Hierarchy, ConfigError> {
    let root = graph.root.clone();
    let Some(root_spec) = graph.containers.get(&root) else {
        return Err(ConfigError::MissingRoot { root });
    };

    for id in graph.containers.keys() {
        if graph.elements.contains_key(id) {
            return Err(ConfigError::DuplicateId { id: id.clone() });
        }
    }

    let mut owner: BTreeMap<String, String> = BTreeMap::new();
    let mut area_items: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (container_id, spec) in &graph.containers {
        let items = area_items.entry(container_id.clone()).or_default();
        for item in &spec.items {
            if !graph.containers.contains_key(item) && !graph.elements.contains_key(item) {
                return Err(ConfigError::UnknownItem {
                    container: container_id.clone(),
                    item: item.clone(),
                });
            }
            if item == container_id {
                return Err(ConfigError::Cycle {
                    ids: vec![item.clone(), item.clone()],
                });
            }
            match owner.get(item) {
                Some(existing) if existing == container_id => continue,
                Some(existing) => {
                    return Err(ConfigError::MultipleOwners {
                        item: item.clone(),
                        first: existing.clone(),
                        second: container_id.clone(),
                    });
                }
                None => {
                    owner.insert(item.clone(), container_id.clone());
                    items.push(item.clone());
                }
            }
        }
    }

    if let Some(parent) = owner.get(&root).or(root_spec.parent.as_ref()) {
        return Err(ConfigError::RootHasParent {
            root,
            parent: parent.clone(),
        });
    }

    let mut parents: BTreeMap<String, String> = BTreeMap::new();
    let mut declared_children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (id, spec) in &graph.containers {
        if *id == root {
            continue;
        }
        let parent = match (owner.get(id), spec.parent.as_ref()) {
            (Some(owned_by), Some(declared)) if owned_by != declared => {
                return Err(ConfigError::ConflictingParent {
                    container: id.clone(),
                    declared: declared.clone(),
                    owner: owned_by.clone(),
                });
            }
            (Some(owned_by), _) => owned_by.clone(),
            (None, Some(declared)) => {
                if !graph.containers.contains_key(declared) {
                    return Err(ConfigError::UnknownParent {
                        container: id.clone(),
                        parent: declared.clone(),
                    });
                }
                declared_children
                    .entry(declared.clone())
                    .or_default()
                    .push(id.clone());
                declared.clone()
            }
            (None, None) => {
                return Err(ConfigError::OrphanContainer {
                    container: id.clone(),
                });
            }
        };
        parents.insert(id.clone(), parent);
    }

    let mut element_owner = BTreeMap::new();
    for id in graph.elements.keys() {
        match owner.get(id) {
            Some(container) => {
                element_owner.insert(id.clone(), container.clone());
            }
            None => return Err(ConfigError::OrphanElement { element: id.clone() }),
        }
    }

    let mut depths: BTreeMap<String, usize> = BTreeMap::new();
    depths.insert(root.clone(), 0);
    for id in graph.containers.keys() {
        depth_of(id, &root, &parents, &mut depths)?;
    }

    let mut containers = BTreeMap::new();
    for id in graph.containers.keys() {
        let items = area_items.get(id).cloned().unwrap_or_default();
        let mut children: Vec<String> = items
            .iter()
            .filter(|item| graph.containers.contains_key(*item))
            .cloned()
            .collect();
        if let Some(extra) = declared_children.get(id) {
            children.extend(extra.iter().cloned());
        }
        let element_ids = items
            .iter()
            .filter(|item| graph.elements.contains_key(*item))
            .cloned()
            .collect();
        containers.insert(
            id.clone(),
            ContainerInfo {
                id: id.clone(),
                parent_id: parents.get(id).cloned(),
                children,
                element_ids,
                depth: depths.get(id).copied().unwrap_or(0),
                bounds: None,
            },
        );
    }

    debug!(
        containers = containers.len(),
        elements = element_owner.len(),
        "extracted containment hierarchy"
    );
    Ok(Hierarchy {
        root,
        containers,
        element_owner,
    })
}

fn depth_of(
    id: &str,
    root: &str,
    parents: &BTreeMap<String, String>,
    depths: &mut BTreeMap<String, usize>,
) -> Result<usize, ConfigError> {
    let mut chain: Vec<String> = Vec::new();
    let mut current = id.to_string();
    let base = loop {
        if let Some(depth) = depths.get(&current) {
            break *depth;
        }
        if chain.contains(&current) {
            let start = chain.iter().position(|node| *node == current).unwrap_or(0);
            let mut ids: Vec<String> = chain[start..].to_vec();
            ids.push(current);
            return Err(ConfigError::Cycle { ids });
        }
        chain.push(current.clone());
        match parents.get(&current) {
            Some(parent) => current = parent.clone(),
            None => {
                return Err(ConfigError::OrphanContainer {
                    container: current,
                });
            }
        }
    };
    let mut depth = base;
    for node in chain.iter().rev() {
        depth += 1;
        depths.insert(node.clone(), depth);
    }
    if id == root {
        return Ok(0);
    }
    Ok(depths.get(id).copied().unwrap_or(depth))
}

/// Turns element connections and explicit connector specs into connectors.
/// Pairs declared from both sides collapse into one connector.
pub fn derive_connectors(
    graph: &LogicalGraph,
    hierarchy: &Hierarchy,
) -> Result<Vec<Connector>, ConfigError> {
    let mut connectors = Vec::new();
    let mut seen_pairs: BTreeSet<(String, String)> = BTreeSet::new();
    let mut used_ids: BTreeSet<String> = BTreeSet::new();

    for (idx, spec) in graph.connectors.iter().enumerate() {
        let label = spec
            .id
            .clone()
            .unwrap_or_else(|| format!("connector-{}", idx + 1));
        let mut endpoints: Vec<String> = Vec::new();
        for endpoint in &spec.endpoints {
            if !graph.elements.contains_key(endpoint) {
                return Err(ConfigError::UnknownEndpoint {
                    from: label,
                    to: endpoint.clone(),
                });
            }
            if !endpoints.contains(endpoint) {
                endpoints.push(endpoint.clone());
            }
        }
        if endpoints.len() < 2 {
            return Err(ConfigError::DegenerateConnector { connector: label });
        }
        let hub = endpoints
            .iter()
            .find(|id| is_predicate(graph, id))
            .unwrap_or(&endpoints[0])
            .clone();
        if endpoints.len() == 2 {
            seen_pairs.insert(pair_key(&endpoints[0], &endpoints[1]));
        }
        let id = unique_id(&label, &mut used_ids);
        let parent_area = enclosing_area(hierarchy, &endpoints);
        connectors.push(Connector {
            id,
            endpoints,
            hub,
            parent_area,
        });
    }

    for (from, spec) in &graph.elements {
        for to in &spec.connections {
            if !graph.elements.contains_key(to) {
                return Err(ConfigError::UnknownEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            if to == from {
                return Err(ConfigError::DegenerateConnector {
                    connector: from.clone(),
                });
            }
            if !seen_pairs.insert(pair_key(from, to)) {
                continue;
            }
            let (hub, other) = if is_predicate(graph, from) || !is_predicate(graph, to) {
                (from.clone(), to.clone())
            } else {
                (to.clone(), from.clone())
            };
            let id = unique_id(&format!("{hub}--{other}"), &mut used_ids);
            let endpoints = vec![hub.clone(), other];
            let parent_area = enclosing_area(hierarchy, &endpoints);
            connectors.push(Connector {
                id,
                endpoints,
                hub,
                parent_area,
            });
        }
    }

    debug!(connectors = connectors.len(), "derived connectors");
    Ok(connectors)
}

fn is_predicate(graph: &LogicalGraph, id: &str) -> bool {
    graph
        .elements
        .get(id)
        .map(|spec| spec.kind == ElementKind::Predicate)
        .unwrap_or(false)
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn unique_id(base: &str, used: &mut BTreeSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn enclosing_area(hierarchy: &Hierarchy, endpoints: &[String]) -> String {
    let mut owners = endpoints
        .iter()
        .filter_map(|id| hierarchy.element_owner.get(id));
    let Some(first) = owners.next() else {
        return hierarchy.root.clone();
    };
    owners.fold(first.clone(), |acc, owner| {
        hierarchy.lowest_common_ancestor(&acc, owner)
    })
}
