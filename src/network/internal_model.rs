//! Internal model: the reaction graph shared by every cell of one type
//!
//! An internal model is an ordered list of species ([`Node`]s) and a list of
//! directed [`Edge`]s. An edge either points at a node (a reaction feeding
//! that species) or at another edge (a modifier scaling that edge).
//!
//! # Species order
//!
//! Node registration order is the canonical species order: column `k` of a
//! group's state matrix and entry `k` of a cell's initial condition both
//! refer to the `k`-th registered node.
//!
//! # Construction
//!
//! Models are assembled with [`InternalModelBuilder`] and frozen by
//! [`build`](InternalModelBuilder::build) into an immutable [`InternalModel`]
//! that cells share through `Arc`. Edge targets must already exist when an
//! edge is registered, so modifier chains can never loop.
//!
//! ```rust
//! use cellnet_rs::network::{InternalModelBuilder, ReactionTerm, TermKind, ModifierType};
//!
//! let mut builder = InternalModelBuilder::new("toggle");
//! builder.add_node("a", Some(ReactionTerm::with_params(TermKind::LinearDegradation, &[1.0]).unwrap())).unwrap();
//! builder.add_node("h", None).unwrap();
//!
//! let h_to_a = builder
//!     .add_edge("h", "a", ReactionTerm::with_params(TermKind::HillActivation, &[0.8, 0.01, 4.0]).unwrap())
//!     .unwrap();
//! builder
//!     .add_edge(
//!         "a",
//!         h_to_a,
//!         ReactionTerm::modifier_with_params(
//!             TermKind::HillInactivation,
//!             ModifierType::Multiplicative,
//!             &[1.0, 1.0, 4e-6, 6.0],
//!         )
//!         .unwrap(),
//!     )
//!     .unwrap();
//!
//! let model = builder.build();
//! assert_eq!(model.node_names(), vec!["a", "h"]);
//! assert_eq!(model.contributions("a").len(), 2); // degradation + h -> a
//! assert_eq!(model.modifiers(h_to_a).len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{NetworkError, NetworkResult};
use crate::network::EdgeId;
use crate::network::terms::ReactionTerm;

/// Source of edge ids; unique across every model of the process
static NEXT_EDGE_ID: AtomicUsize = AtomicUsize::new(0);

fn next_edge_id() -> EdgeId {
    EdgeId(NEXT_EDGE_ID.fetch_add(1, Ordering::Relaxed))
}

// =================================================================================================
// Nodes and edges
// =================================================================================================

/// A species tracked by an internal model
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    degradation: Option<EdgeId>,
    primary: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the self-loop edge carrying this node's degradation
    pub fn degradation(&self) -> Option<EdgeId> {
        self.degradation
    }

    pub fn degrades(&self) -> bool {
        self.degradation.is_some()
    }

    /// Bookkeeping flag, no effect on the dynamics
    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

/// What an edge points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeTarget {
    /// Reaction feeding a species
    Node(String),
    /// Modifier of another edge
    Edge(EdgeId),
}

impl From<&str> for EdgeTarget {
    fn from(name: &str) -> Self {
        EdgeTarget::Node(name.to_string())
    }
}

impl From<String> for EdgeTarget {
    fn from(name: String) -> Self {
        EdgeTarget::Node(name)
    }
}

impl From<EdgeId> for EdgeTarget {
    fn from(edge: EdgeId) -> Self {
        EdgeTarget::Edge(edge)
    }
}

/// Directed, parameterized link inside one internal model
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: EdgeId,
    from: String,
    target: EdgeTarget,
    term: ReactionTerm,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Name of the source species
    pub fn from_node(&self) -> &str {
        &self.from
    }

    pub fn target(&self) -> &EdgeTarget {
        &self.target
    }

    /// Target species, `None` for modifiers
    pub fn to_node(&self) -> Option<&str> {
        match &self.target {
            EdgeTarget::Node(name) => Some(name),
            EdgeTarget::Edge(_) => None,
        }
    }

    /// Target edge, `None` for plain reactions
    pub fn to_edge(&self) -> Option<EdgeId> {
        match self.target {
            EdgeTarget::Edge(edge) => Some(edge),
            EdgeTarget::Node(_) => None,
        }
    }

    pub fn term(&self) -> &ReactionTerm {
        &self.term
    }

    pub fn is_modifier(&self) -> bool {
        self.term.is_modifier()
    }
}

// =================================================================================================
// Builder
// =================================================================================================

/// Mutable construction phase of an [`InternalModel`]
#[derive(Debug, Clone)]
pub struct InternalModelBuilder {
    name: String,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl InternalModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Registers a species, optionally with a degradation term
    ///
    /// A degradation creates a self-loop edge whose id is returned.
    pub fn add_node(
        &mut self,
        name: &str,
        degradation: Option<ReactionTerm>,
    ) -> NetworkResult<Option<EdgeId>> {
        if self.node_index.contains_key(name) {
            return Err(NetworkError::config(format!(
                "node '{}' already exists in model '{}'",
                name, self.name
            )));
        }
        if let Some(term) = &degradation {
            check_degradation(term)?;
        }

        self.node_index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            degradation: None,
            primary: false,
        });

        self.set_node_degradation(name, degradation)
    }

    /// Replaces (or with `None`, removes) the degradation of a species
    ///
    /// Fails if a modifier targets the degradation being replaced.
    pub fn set_node_degradation(
        &mut self,
        name: &str,
        degradation: Option<ReactionTerm>,
    ) -> NetworkResult<Option<EdgeId>> {
        let index = self.index_of(name)?;
        if let Some(term) = &degradation {
            check_degradation(term)?;
        }

        if let Some(previous) = self.nodes[index].degradation {
            if self.edges.iter().any(|e| e.to_edge() == Some(previous)) {
                return Err(NetworkError::config(format!(
                    "degradation of '{}' is modified by another edge and cannot be replaced",
                    name
                )));
            }
            self.edges.retain(|e| e.id != previous);
            self.nodes[index].degradation = None;
        }

        let Some(term) = degradation else {
            return Ok(None);
        };

        let id = next_edge_id();
        self.edges.push(Edge {
            id,
            from: name.to_string(),
            target: EdgeTarget::Node(name.to_string()),
            term,
        });
        self.nodes[index].degradation = Some(id);
        log::debug!("model '{}': degradation edge {} on '{}'", self.name, id, name);
        Ok(Some(id))
    }

    /// Registers a reaction (node target) or a modifier (edge target)
    ///
    /// The term must be a modifier exactly when the target is an edge.
    /// Degradation kinds belong to [`add_node`](Self::add_node) and coupling
    /// kinds to simulation-level interactions.
    pub fn add_edge(
        &mut self,
        from: &str,
        target: impl Into<EdgeTarget>,
        term: ReactionTerm,
    ) -> NetworkResult<EdgeId> {
        let target = target.into();
        self.index_of(from)?;

        let kind = term.kind();
        if kind.is_degradation() || kind.is_coupling() {
            return Err(NetworkError::config(format!(
                "'{}' cannot be used as an edge of an internal model",
                kind
            )));
        }

        match &target {
            EdgeTarget::Node(name) => {
                self.index_of(name)?;
                if term.is_modifier() {
                    return Err(NetworkError::config(format!(
                        "modifier term from '{}' must target an edge, not node '{}'",
                        from, name
                    )));
                }
            }
            EdgeTarget::Edge(edge) => {
                self.edge_position(*edge)?;
                if !term.is_modifier() {
                    return Err(NetworkError::config(format!(
                        "edge from '{}' targets edge {} but its term is not a modifier",
                        from, edge
                    )));
                }
            }
        }

        let id = next_edge_id();
        log::debug!("model '{}': edge {} {} -> {:?} ({})", self.name, id, from, target, kind);
        self.edges.push(Edge {
            id,
            from: from.to_string(),
            target,
            term,
        });
        Ok(id)
    }

    /// Sets or replaces the parameters of a registered edge
    pub fn set_edge_params(&mut self, edge: EdgeId, params: &[f64]) -> NetworkResult<()> {
        let position = self.edge_position(edge)?;
        self.edges[position].term.set_params(params)
    }

    /// Marks a species as primary (bookkeeping only)
    pub fn set_primary_node(&mut self, name: &str) -> NetworkResult<()> {
        let index = self.index_of(name)?;
        self.nodes[index].primary = true;
        Ok(())
    }

    /// Freezes the graph
    pub fn build(self) -> InternalModel {
        log::debug!(
            "model '{}' built: {} node(s), {} edge(s)",
            self.name,
            self.nodes.len(),
            self.edges.len()
        );
        InternalModel {
            name: self.name,
            nodes: self.nodes,
            node_index: self.node_index,
            edges: self.edges,
        }
    }

    fn index_of(&self, name: &str) -> NetworkResult<usize> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode {
                model: self.name.clone(),
                node: name.to_string(),
            })
    }

    fn edge_position(&self, edge: EdgeId) -> NetworkResult<usize> {
        self.edges
            .iter()
            .position(|e| e.id == edge)
            .ok_or_else(|| NetworkError::UnknownEdge {
                model: self.name.clone(),
                edge,
            })
    }
}

fn check_degradation(term: &ReactionTerm) -> NetworkResult<()> {
    if !term.kind().is_degradation() || term.is_modifier() {
        return Err(NetworkError::config(format!(
            "'{}' is not a degradation kind",
            term.kind()
        )));
    }
    Ok(())
}

// =================================================================================================
// Frozen model
// =================================================================================================

/// Immutable reaction graph of one cell type
#[derive(Debug, Clone, PartialEq)]
pub struct InternalModel {
    name: String,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl InternalModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Species names in canonical order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn node(&self, name: &str) -> NetworkResult<&Node> {
        self.node_index(name).map(|index| &self.nodes[index])
    }

    /// Position of the species in the canonical order
    pub fn node_index(&self, name: &str) -> NetworkResult<usize> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode {
                model: self.name.clone(),
                node: name.to_string(),
            })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_edge(&self, edge: EdgeId) -> bool {
        self.edges.iter().any(|e| e.id == edge)
    }

    pub fn edge(&self, edge: EdgeId) -> NetworkResult<&Edge> {
        self.edges
            .iter()
            .find(|e| e.id == edge)
            .ok_or_else(|| NetworkError::UnknownEdge {
                model: self.name.clone(),
                edge,
            })
    }

    /// Every edge feeding `node` (degradation included)
    pub fn contributions(&self, node: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.to_node() == Some(node))
            .collect()
    }

    /// Every modifier edge targeting `edge`
    pub fn modifiers(&self, edge: EdgeId) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.to_edge() == Some(edge) && e.is_modifier())
            .collect()
    }

    /// Edges whose parameters are still unset
    pub fn unset_parameters(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| !e.term.params_set())
            .map(|e| e.id)
            .collect()
    }

    pub fn all_params_set(&self) -> bool {
        self.edges.iter().all(|e| e.term.params_set())
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::terms::{ModifierType, TermKind};

    fn linear_decay(c: f64) -> Option<ReactionTerm> {
        Some(ReactionTerm::with_params(TermKind::LinearDegradation, &[c]).unwrap())
    }

    fn hill(params: &[f64]) -> ReactionTerm {
        ReactionTerm::with_params(TermKind::HillActivation, params).unwrap()
    }

    #[test]
    fn test_node_order_is_registration_order() {
        let mut builder = InternalModelBuilder::new("m");
        for name in ["a", "s", "h", "u"] {
            builder.add_node(name, None).unwrap();
        }
        let model = builder.build();

        assert_eq!(model.node_names(), vec!["a", "s", "h", "u"]);
        assert_eq!(model.node_index("h").unwrap(), 2);
        assert_eq!(model.num_nodes(), 4);
    }

    #[test]
    fn test_unknown_node_lookup_fails() {
        let model = InternalModelBuilder::new("m").build();
        assert_eq!(
            model.node("x").unwrap_err(),
            NetworkError::UnknownNode {
                model: "m".to_string(),
                node: "x".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut builder = InternalModelBuilder::new("m");
        builder.add_node("a", None).unwrap();
        assert!(builder.add_node("a", None).is_err());
    }

    #[test]
    fn test_degradation_creates_self_loop() {
        let mut builder = InternalModelBuilder::new("m");
        let edge = builder.add_node("a", linear_decay(1.0)).unwrap().unwrap();
        let model = builder.build();

        let node = model.node("a").unwrap();
        assert!(node.degrades());
        assert_eq!(node.degradation(), Some(edge));

        let loop_edge = model.edge(edge).unwrap();
        assert_eq!(loop_edge.from_node(), "a");
        assert_eq!(loop_edge.to_node(), Some("a"));
        assert_eq!(model.contributions("a").len(), 1);
    }

    #[test]
    fn test_replace_and_remove_degradation() {
        let mut builder = InternalModelBuilder::new("m");
        let first = builder.add_node("a", linear_decay(1.0)).unwrap().unwrap();
        let parabolic = ReactionTerm::with_params(TermKind::ParabolicDegradation, &[2.0]).unwrap();
        let second = builder.set_node_degradation("a", Some(parabolic)).unwrap().unwrap();
        assert_ne!(first, second);

        let model = builder.clone().build();
        assert!(model.edge(first).is_err());
        assert_eq!(model.contributions("a").len(), 1);

        builder.set_node_degradation("a", None).unwrap();
        let model = builder.build();
        assert!(!model.node("a").unwrap().degrades());
        assert!(model.edges().is_empty());
    }

    #[test]
    fn test_degradation_must_be_degradation_kind() {
        let mut builder = InternalModelBuilder::new("m");
        assert!(builder.add_node("a", Some(hill(&[1.0, 1.0, 1.0]))).is_err());
        assert!(builder.node_index.is_empty());
    }

    #[test]
    fn test_edge_target_rules() {
        let mut builder = InternalModelBuilder::new("m");
        builder.add_node("a", None).unwrap();
        builder.add_node("b", None).unwrap();

        let plain = builder.add_edge("a", "b", hill(&[1.0, 1.0, 2.0])).unwrap();

        // modifier on a node
        let modifier = ReactionTerm::modifier(TermKind::LinearActivation, ModifierType::Internal);
        assert!(builder.add_edge("a", "b", modifier.clone()).is_err());
        // plain term on an edge
        assert!(builder.add_edge("a", plain, hill(&[1.0, 1.0, 2.0])).is_err());
        // unknown source, target node, target edge
        assert!(builder.add_edge("z", "b", hill(&[1.0, 1.0, 2.0])).is_err());
        assert!(builder.add_edge("a", "z", hill(&[1.0, 1.0, 2.0])).is_err());
        assert!(matches!(
            builder.add_edge("a", EdgeId(usize::MAX), modifier.clone()),
            Err(NetworkError::UnknownEdge { .. })
        ));
        // degradation and coupling kinds are not edges
        let decay = ReactionTerm::with_params(TermKind::LinearDegradation, &[1.0]).unwrap();
        assert!(builder.add_edge("a", "b", decay).is_err());
        let diffusion = ReactionTerm::with_params(TermKind::Diffusion, &[1.0]).unwrap();
        assert!(builder.add_edge("a", "b", diffusion).is_err());

        let modifier_id = builder.add_edge("b", plain, modifier).unwrap();
        let model = builder.build();

        assert_eq!(model.contributions("b").len(), 1);
        let mods = model.modifiers(plain);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].id(), modifier_id);
        assert_eq!(mods[0].to_edge(), Some(plain));
    }

    #[test]
    fn test_edge_ids_unique_across_models() {
        let mut first = InternalModelBuilder::new("first");
        let mut second = InternalModelBuilder::new("second");
        let a = first.add_node("x", linear_decay(1.0)).unwrap().unwrap();
        let b = second.add_node("x", linear_decay(1.0)).unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unset_parameters_reported() {
        let mut builder = InternalModelBuilder::new("m");
        builder.add_node("a", None).unwrap();
        let edge = builder
            .add_edge("a", "a", ReactionTerm::new(TermKind::HillActivation))
            .unwrap();

        let model = builder.clone().build();
        assert!(!model.all_params_set());
        assert_eq!(model.unset_parameters(), vec![edge]);

        builder.set_edge_params(edge, &[1.0, 0.5, 2.0]).unwrap();
        assert!(builder.build().all_params_set());
    }

    #[test]
    fn test_primary_node_is_bookkeeping() {
        let mut builder = InternalModelBuilder::new("m");
        builder.add_node("a", None).unwrap();
        builder.set_primary_node("a").unwrap();
        assert!(builder.set_primary_node("b").is_err());
        assert!(builder.build().node("a").unwrap().is_primary());
    }
}
