//! Interactions: edges scoped to the whole simulation
//!
//! An interaction reads a source species from every cell that carries it,
//! whatever the cell's model, and contributes to a target that is a species
//! name, an edge of one internal model, or another interaction.
//!
//! # Distance weights
//!
//! Diffusion weights are masked inverse squared Euclidean distances:
//!
//! ```text
//! w(i, j) = m(i, j) / |p_i - p_j|²    if i ≠ j and |p_i - p_j| > 0
//!         = 0                         otherwise
//! ```
//!
//! where `m` is the boolean connectivity matrix given over cell ids.

use nalgebra::DMatrix;

use crate::network::terms::ReactionTerm;
use crate::network::{CellId, EdgeId, InteractionId, ModelId};

/// What an interaction points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InteractionTarget {
    /// Contribution to a species, in every model that has it
    Node(String),
    /// Modifier of an internal edge, applied when evaluating `model`'s cells
    Edge { model: ModelId, edge: EdgeId },
    /// Modifier of another interaction
    Interaction(InteractionId),
}

impl From<&str> for InteractionTarget {
    fn from(name: &str) -> Self {
        InteractionTarget::Node(name.to_string())
    }
}

impl From<InteractionId> for InteractionTarget {
    fn from(id: InteractionId) -> Self {
        InteractionTarget::Interaction(id)
    }
}

/// Cross-cell edge
#[derive(Debug, Clone)]
pub struct Interaction {
    pub(crate) id: InteractionId,
    pub(crate) from: String,
    pub(crate) target: InteractionTarget,
    pub(crate) term: ReactionTerm,
    pub(crate) connections: Option<DMatrix<bool>>,
}

impl Interaction {
    pub fn id(&self) -> InteractionId {
        self.id
    }

    /// Source species name
    pub fn from_node(&self) -> &str {
        &self.from
    }

    pub fn target(&self) -> &InteractionTarget {
        &self.target
    }

    /// Target species, `None` for modifiers
    pub fn to_node(&self) -> Option<&str> {
        match &self.target {
            InteractionTarget::Node(name) => Some(name),
            _ => None,
        }
    }

    pub fn term(&self) -> &ReactionTerm {
        &self.term
    }

    pub fn is_modifier(&self) -> bool {
        self.term.is_modifier()
    }

    /// Connectivity over cell ids, present for coupling kinds
    pub fn connections(&self) -> Option<&DMatrix<bool>> {
        self.connections.as_ref()
    }
}

/// Squared Euclidean distance; `None` when the dimensions differ
pub fn squared_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Weight matrix in layout order
///
/// * `positions` - cell positions indexed by cell id
/// * `connections` - connectivity indexed by cell id
/// * `order` - cell id found at each layout position
///
/// Entry `(k, l)` couples the cells at layout positions `k` and `l`.
/// Positions of mismatched dimension yield a zero weight.
pub fn distance_weights(
    positions: &[&[f64]],
    connections: &DMatrix<bool>,
    order: &[CellId],
) -> DMatrix<f64> {
    let n = order.len();
    DMatrix::from_fn(n, n, |k, l| {
        let (i, j) = (order[k].0, order[l].0);
        if i == j || !connections[(i, j)] {
            return 0.0;
        }
        match squared_distance(positions[i], positions[j]) {
            Some(d2) if d2 > 0.0 => 1.0 / d2,
            _ => 0.0,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<CellId> {
        raw.iter().map(|&i| CellId(i)).collect()
    }

    #[test]
    fn test_squared_distance() {
        assert_eq!(squared_distance(&[0.0, 0.0], &[3.0, 4.0]), Some(25.0));
        assert_eq!(squared_distance(&[0.0], &[3.0, 4.0]), None);
    }

    #[test]
    fn test_self_weight_is_zero_even_when_connected() {
        let positions: Vec<&[f64]> = vec![&[0.0], &[2.0]];
        let connections = DMatrix::from_element(2, 2, true);
        let w = distance_weights(&positions, &connections, &ids(&[0, 1]));

        assert_eq!(w[(0, 0)], 0.0);
        assert_eq!(w[(1, 1)], 0.0);
        assert_eq!(w[(0, 1)], 0.25);
        assert_eq!(w[(1, 0)], 0.25);
    }

    #[test]
    fn test_coincident_and_unconnected_pairs_masked() {
        let positions: Vec<&[f64]> = vec![&[0.0, 0.0], &[0.0, 0.0], &[1.0, 0.0]];
        let mut connections = DMatrix::from_element(3, 3, true);
        connections[(0, 2)] = false;
        let w = distance_weights(&positions, &connections, &ids(&[0, 1, 2]));

        assert_eq!(w[(0, 1)], 0.0);
        assert_eq!(w[(0, 2)], 0.0);
        assert_eq!(w[(2, 0)], 1.0);
        assert!(w.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_weights_follow_layout_order() {
        // cell 2 first in the layout, then 0, then 1
        let positions: Vec<&[f64]> = vec![&[0.0], &[1.0], &[3.0]];
        let mut connections = DMatrix::from_element(3, 3, false);
        connections[(0, 1)] = true;
        connections[(1, 0)] = true;
        connections[(2, 0)] = true;
        let w = distance_weights(&positions, &connections, &ids(&[2, 0, 1]));

        assert_eq!(w[(1, 2)], 1.0); // cell 0 -> cell 1
        assert_eq!(w[(2, 1)], 1.0);
        assert_eq!(w[(0, 1)], 1.0 / 9.0); // cell 2 -> cell 0
        assert_eq!(w[(1, 0)], 0.0);
    }
}
