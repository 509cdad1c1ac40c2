//! Cell: one compartment running one internal model

use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::DVector;

use crate::error::{NetworkError, NetworkResult};
use crate::network::internal_model::InternalModel;
use crate::network::{CellId, ModelId};

/// One spatial compartment
///
/// A cell is registered with a position, then assigned an internal model,
/// then given an initial condition, in that order. Reassigning the model
/// clears the stored initial condition.
#[derive(Debug, Clone)]
pub struct Cell {
    id: CellId,
    position: Vec<f64>,
    model: Option<(ModelId, Arc<InternalModel>)>,
    initial_condition: Option<DVector<f64>>,
}

impl Cell {
    pub(crate) fn new(id: CellId, position: &[f64]) -> Self {
        Self {
            id,
            position: position.to_vec(),
            model: None,
            initial_condition: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Coordinates (1-D, 2-D or 3-D); empty when no position was given
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn has_position(&self) -> bool {
        !self.position.is_empty()
    }

    pub fn set_position(&mut self, position: &[f64]) {
        self.position = position.to_vec();
    }

    pub fn model_id(&self) -> Option<ModelId> {
        self.model.as_ref().map(|(id, _)| *id)
    }

    pub fn model(&self) -> Option<&Arc<InternalModel>> {
        self.model.as_ref().map(|(_, model)| model)
    }

    /// Species count of the assigned model, 0 before assignment
    pub fn num_species(&self) -> usize {
        self.model().map_or(0, |model| model.num_nodes())
    }

    pub(crate) fn set_internal_model(&mut self, id: ModelId, model: Arc<InternalModel>) {
        if self.model_id() != Some(id) {
            self.initial_condition = None;
        }
        self.model = Some((id, model));
    }

    /// Stores the initial condition in the model's node order
    ///
    /// The mapping must hold exactly the node names of the assigned model.
    pub fn set_initial_condition(&mut self, values: &HashMap<String, f64>) -> NetworkResult<()> {
        let Some(model) = self.model() else {
            return Err(self.ic_error("no internal model assigned".to_string()));
        };

        if values.len() != model.num_nodes() {
            return Err(self.ic_error(format!(
                "{} value(s) given but model '{}' has {} node(s)",
                values.len(),
                model.name(),
                model.num_nodes()
            )));
        }

        let mut ordered = DVector::zeros(model.num_nodes());
        for (index, node) in model.nodes().iter().enumerate() {
            match values.get(node.name()) {
                Some(value) => ordered[index] = *value,
                None => {
                    return Err(self.ic_error(format!("missing value for node '{}'", node.name())));
                }
            }
        }

        self.initial_condition = Some(ordered);
        Ok(())
    }

    /// Initial condition in the model's node order
    pub fn initial_condition(&self) -> Option<&DVector<f64>> {
        self.initial_condition.as_ref()
    }

    fn ic_error(&self, reason: String) -> NetworkError {
        NetworkError::InitialCondition { cell: self.id, reason }
    }
}
