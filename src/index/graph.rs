// Relationship graph stored as an arena with key lookup

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::DefinitionKind;

/// Index into [`RelationshipGraph::nodes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    File {
        path: String,
        language: String,
    },
    Definition {
        qualified_name: String,
        file_path: String,
        kind: DefinitionKind,
        line_number: u32,
    },
    /// Placeholder for a reference that did not resolve, keyed by bare name
    External { name: String },
}

impl GraphNode {
    fn key(&self) -> NodeKey {
        match self {
            GraphNode::File { path, .. } => NodeKey::File(path.clone()),
            GraphNode::Definition {
                qualified_name,
                file_path,
                ..
            } => NodeKey::Definition(qualified_name.clone(), file_path.clone()),
            GraphNode::External { name } => NodeKey::External(name.clone()),
        }
    }

    /// Qualified name, path or bare name, whichever identifies the node
    pub fn label(&self) -> &str {
        match self {
            GraphNode::File { path, .. } => path,
            GraphNode::Definition { qualified_name, .. } => qualified_name,
            GraphNode::External { name } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Defines,
    Calls,
    Imports,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Defines => "defines",
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// Line of the usage that produced a calls/imports edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    File(String),
    /// (qualified name, file path)
    Definition(String, String),
    External(String),
}

/// Directed graph of files, definitions and external placeholders.
///
/// Nodes refer to each other only by [`NodeId`], so call and import cycles
/// need no special handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    lookup: HashMap<NodeKey, NodeId>,
    /// Edge positions per node, by source and by target
    #[serde(skip)]
    outgoing: Vec<Vec<usize>>,
    #[serde(skip)]
    incoming: Vec<Vec<usize>>,
}

impl PartialEq for RelationshipGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

impl Eq for RelationshipGraph {}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the key lookup and adjacency lists after deserialization
    pub fn reindex(&mut self) {
        self.lookup = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.key(), NodeId(idx)))
            .collect();

        self.outgoing = vec![Vec::new(); self.nodes.len()];
        self.incoming = vec![Vec::new(); self.nodes.len()];
        for (pos, edge) in self.edges.iter().enumerate() {
            if let Some(list) = self.outgoing.get_mut(edge.source.0) {
                list.push(pos);
            }
            if let Some(list) = self.incoming.get_mut(edge.target.0) {
                list.push(pos);
            }
        }
    }

    fn intern(&mut self, node: GraphNode) -> NodeId {
        let key = node.key();
        if let Some(id) = self.lookup.get(&key) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.lookup.insert(key, id);
        id
    }

    pub fn file_node(&mut self, path: &str, language: &str) -> NodeId {
        self.intern(GraphNode::File {
            path: path.to_string(),
            language: language.to_string(),
        })
    }

    pub fn definition_node(
        &mut self,
        qualified_name: &str,
        file_path: &str,
        kind: DefinitionKind,
        line_number: u32,
    ) -> NodeId {
        self.intern(GraphNode::Definition {
            qualified_name: qualified_name.to_string(),
            file_path: file_path.to_string(),
            kind,
            line_number,
        })
    }

    pub fn external_node(&mut self, name: &str) -> NodeId {
        self.intern(GraphNode::External {
            name: name.to_string(),
        })
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, kind: EdgeKind, line_number: Option<u32>) {
        let pos = self.edges.len();
        if let Some(list) = self.outgoing.get_mut(source.0) {
            list.push(pos);
        }
        if let Some(list) = self.incoming.get_mut(target.0) {
            list.push(pos);
        }
        self.edges.push(GraphEdge {
            source,
            target,
            kind,
            line_number,
        });
    }

    pub fn find_file(&self, path: &str) -> Option<NodeId> {
        self.lookup.get(&NodeKey::File(path.to_string())).copied()
    }

    pub fn find_definition(&self, qualified_name: &str, file_path: &str) -> Option<NodeId> {
        self.lookup
            .get(&NodeKey::Definition(qualified_name.to_string(), file_path.to_string()))
            .copied()
    }

    pub fn find_external(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(&NodeKey::External(name.to_string())).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn outgoing(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.adjacent(&self.outgoing, id, kind)
    }

    pub fn incoming(&self, id: NodeId, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.adjacent(&self.incoming, id, kind)
    }

    fn adjacent<'g>(
        &'g self,
        lists: &'g [Vec<usize>],
        id: NodeId,
        kind: EdgeKind,
    ) -> impl Iterator<Item = &'g GraphEdge> + 'g {
        lists
            .get(id.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter_map(move |pos| self.edges.get(*pos))
            .filter(move |e| e.kind == kind)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
