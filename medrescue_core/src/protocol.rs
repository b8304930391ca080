//! Validated, read-only protocol graphs.
//!
//! A [`ProtocolGraph`] is built once from authored node data and never
//! mutated afterwards. Construction rejects duplicate ids, a missing start
//! node and successors that point at nodes outside the graph.

use crate::{NodeKind, ProtocolError, ProtocolNode};
use std::collections::HashMap;

/// Id of the entry node unless a graph says otherwise
pub const DEFAULT_START_NODE: &str = "start";

#[derive(Clone, Debug)]
pub struct ProtocolGraph {
    nodes: Vec<ProtocolNode>,
    index: HashMap<String, usize>,
    start: String,
}

impl ProtocolGraph {
    /// Build a graph whose entry node has id `start`
    pub fn new(nodes: Vec<ProtocolNode>) -> Result<Self, Vec<ProtocolError>> {
        Self::with_start(nodes, DEFAULT_START_NODE)
    }

    /// Build a graph with a custom entry node
    ///
    /// Returns every problem found, not just the first.
    pub fn with_start(
        nodes: Vec<ProtocolNode>,
        start: &str,
    ) -> Result<Self, Vec<ProtocolError>> {
        if nodes.is_empty() {
            return Err(vec![ProtocolError::EmptyGraph]);
        }

        let mut errors = Vec::new();
        let mut index = HashMap::with_capacity(nodes.len());

        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                errors.push(ProtocolError::DuplicateNode(node.id.clone()));
            }
        }

        if !index.contains_key(start) {
            errors.push(ProtocolError::MissingStart(start.to_string()));
        }

        for node in &nodes {
            for target in node.successors() {
                if !index.contains_key(target) {
                    errors.push(ProtocolError::DanglingNodeReference {
                        from: node.id.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            nodes,
            index,
            start: start.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&ProtocolNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn start_id(&self) -> &str {
        &self.start
    }

    /// The entry node; always present once the graph is built
    pub fn start_node(&self) -> &ProtocolNode {
        &self.nodes[self.index[&self.start]]
    }

    /// Nodes in authored order
    pub fn nodes(&self) -> &[ProtocolNode] {
        &self.nodes
    }

    /// Ids of medications referenced by medication nodes
    pub fn medication_references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Medication { medication_id, .. } => {
                Some((node.id.as_str(), medication_id.as_str()))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecisionOption;

    fn node(id: &str, kind: NodeKind) -> ProtocolNode {
        ProtocolNode {
            id: id.into(),
            title: id.into(),
            content: String::new(),
            clinical_notes: vec![],
            kind,
        }
    }

    #[test]
    fn test_builds_valid_graph() {
        let graph = ProtocolGraph::new(vec![
            node("start", NodeKind::Start { next: "end".into() }),
            node("end", NodeKind::End),
        ])
        .unwrap();

        assert_eq!(graph.start_id(), "start");
        assert_eq!(graph.start_node().id, "start");
        assert!(graph.contains("end"));
        assert!(graph.get("missing").is_none());
    }

    #[test]
    fn test_reports_dangling_references() {
        let errors = ProtocolGraph::new(vec![
            node("start", NodeKind::Start { next: "cpr".into() }),
            node(
                "check",
                NodeKind::Decision {
                    options: vec![DecisionOption {
                        label: "Yes".into(),
                        next: "nowhere".into(),
                    }],
                },
            ),
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ProtocolError::DanglingNodeReference {
            from: "start".into(),
            target: "cpr".into()
        }));
        assert!(errors.contains(&ProtocolError::DanglingNodeReference {
            from: "check".into(),
            target: "nowhere".into()
        }));
    }

    #[test]
    fn test_reports_missing_start_and_duplicates() {
        let errors = ProtocolGraph::new(vec![
            node("a", NodeKind::End),
            node("a", NodeKind::End),
        ])
        .unwrap_err();

        assert!(errors.contains(&ProtocolError::DuplicateNode("a".into())));
        assert!(errors.contains(&ProtocolError::MissingStart("start".into())));
    }

    #[test]
    fn test_empty_graph_rejected() {
        assert_eq!(
            ProtocolGraph::new(vec![]).unwrap_err(),
            vec![ProtocolError::EmptyGraph]
        );
    }

    #[test]
    fn test_custom_start() {
        let graph = ProtocolGraph::with_start(vec![node("entry", NodeKind::End)], "entry").unwrap();
        assert_eq!(graph.start_node().id, "entry");
    }
}
