//! Simulation registry and driver
//!
//! [`Simulation`] owns every cell, internal model and interaction. It checks
//! that the network is complete, compiles it into an [`Assembly`] and hands
//! that to a [`Solver`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use cellnet_rs::network::{InternalModelBuilder, ReactionTerm, Simulation, TermKind};
//! use cellnet_rs::solver::{RK4Solver, SolverConfiguration};
//! use nalgebra::DMatrix;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = InternalModelBuilder::new("passive");
//! builder.add_node("a", None)?;
//!
//! let mut simulation = Simulation::new();
//! let left = simulation.add_cell(&[0.0]);
//! let right = simulation.add_cell(&[1.0]);
//! let model = simulation.add_internal_model(builder.build());
//! simulation.set_internal_model(&[left, right], model)?;
//! simulation.set_initial_conditions(&[left], &HashMap::from([("a".to_string(), 1.0)]))?;
//! simulation.set_initial_conditions(&[right], &HashMap::from([("a".to_string(), 0.0)]))?;
//!
//! let connections = DMatrix::from_row_slice(2, 2, &[false, true, true, false]);
//! simulation.add_interaction(
//!     "a",
//!     "a",
//!     ReactionTerm::with_params(TermKind::Diffusion, &[1.0])?,
//!     Some(connections),
//! )?;
//!
//! let trajectories = simulation.simulate(&RK4Solver::new(), &SolverConfiguration::time_evolution(5.0, 50))?;
//! let last = trajectories.time_points().len() - 1;
//! let total = trajectories.cell(left).unwrap()[[last, 0]] + trajectories.cell(right).unwrap()[[last, 0]];
//! assert!((total - 1.0).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, s};

use crate::error::{NetworkError, NetworkResult, Violation};
use crate::network::assembly::Assembly;
use crate::network::cell::Cell;
use crate::network::interaction::{Interaction, InteractionTarget};
use crate::network::internal_model::InternalModel;
use crate::network::terms::ReactionTerm;
use crate::network::{CellId, InteractionId, ModelId};
use crate::solver::{Scenario, Solver, SolverConfiguration};

// =================================================================================================
// Registry
// =================================================================================================

/// Cells, internal models and interactions of one network
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    cells: Vec<Cell>,
    models: Vec<Arc<InternalModel>>,
    /// Cell ids assigned to each model, in assignment order
    groups: Vec<Vec<CellId>>,
    interactions: Vec<Interaction>,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cell at `position` (may be empty when no coupling
    /// interaction needs it)
    pub fn add_cell(&mut self, position: &[f64]) -> CellId {
        let id = CellId(self.cells.len());
        self.cells.push(Cell::new(id, position));
        log::debug!("cell {} registered at {:?}", id, position);
        id
    }

    /// Registers a frozen internal model
    pub fn add_internal_model(&mut self, model: impl Into<Arc<InternalModel>>) -> ModelId {
        let model = model.into();
        let id = ModelId(self.models.len());
        log::debug!("internal model {} registered as '{}'", id, model.name());
        self.models.push(model);
        self.groups.push(Vec::new());
        id
    }

    /// Assigns cells to a model, extending its group
    ///
    /// A cell already in another group moves to this one (and loses its
    /// initial condition); a cell already in this group is left in place.
    pub fn set_internal_model(&mut self, cells: &[CellId], model: ModelId) -> NetworkResult<()> {
        let shared = Arc::clone(self.model(model)?);
        for id in cells {
            self.cell(*id)?;
        }

        for &id in cells {
            if let Some(previous) = self.cells[id.0].model_id()
                && previous != model
            {
                self.groups[previous.0].retain(|c| *c != id);
                log::debug!("cell {} moved from model {} to model {}", id, previous, model);
            }
            if !self.groups[model.0].contains(&id) {
                self.groups[model.0].push(id);
            }
            self.cells[id.0].set_internal_model(model, Arc::clone(&shared));
        }
        Ok(())
    }

    /// Sets the same initial condition on several cells
    ///
    /// All or nothing: if any cell rejects the mapping, no cell is changed.
    pub fn set_initial_conditions(
        &mut self,
        cells: &[CellId],
        values: &HashMap<String, f64>,
    ) -> NetworkResult<()> {
        let mut updated = Vec::with_capacity(cells.len());
        for &id in cells {
            let mut cell = self.cell(id)?.clone();
            cell.set_initial_condition(values)?;
            updated.push(cell);
        }

        for cell in updated {
            let index = cell.id().0;
            self.cells[index] = cell;
        }
        Ok(())
    }

    /// Registers a cross-cell edge
    ///
    /// * `from` - source species, read from every cell whose model has it
    /// * `target` - species name, edge of a model, or another interaction;
    ///   the term must be a modifier exactly when the target is not a species
    /// * `term` - any non-degradation kind
    /// * `connections` - square connectivity over cell ids, required by
    ///   coupling kinds and rejected for the others
    pub fn add_interaction(
        &mut self,
        from: &str,
        target: impl Into<InteractionTarget>,
        term: ReactionTerm,
        connections: Option<DMatrix<bool>>,
    ) -> NetworkResult<InteractionId> {
        let target = target.into();
        let kind = term.kind();

        if kind.is_degradation() {
            return Err(NetworkError::config(format!(
                "'{}' is a degradation kind and cannot be an interaction",
                kind
            )));
        }

        match (&connections, kind.is_coupling()) {
            (None, true) => {
                return Err(NetworkError::config(format!(
                    "'{}' interaction needs a connectivity matrix",
                    kind
                )));
            }
            (Some(_), false) => {
                return Err(NetworkError::config(format!(
                    "'{}' is evaluated per cell and takes no connectivity matrix",
                    kind
                )));
            }
            (Some(matrix), true) if !matrix.is_square() => {
                return Err(NetworkError::config(format!(
                    "connectivity matrix must be square, got {}x{}",
                    matrix.nrows(),
                    matrix.ncols()
                )));
            }
            _ => {}
        }

        match &target {
            InteractionTarget::Node(name) => {
                if term.is_modifier() {
                    return Err(NetworkError::config(format!(
                        "modifier interaction from '{}' must target an edge, not node '{}'",
                        from, name
                    )));
                }
                if !self.models.iter().any(|m| m.has_node(name)) {
                    log::warn!("no registered model has node '{}'; interaction will be inert", name);
                }
            }
            InteractionTarget::Edge { model, edge } => {
                self.model(*model)?.edge(*edge)?;
                if !term.is_modifier() {
                    return Err(NetworkError::config(format!(
                        "interaction targeting edge {} must be a modifier",
                        edge
                    )));
                }
            }
            InteractionTarget::Interaction(other) => {
                self.interaction(*other)?;
                if !term.is_modifier() {
                    return Err(NetworkError::config(format!(
                        "interaction targeting interaction {} must be a modifier",
                        other
                    )));
                }
            }
        }

        let id = InteractionId(self.interactions.len());
        log::debug!("interaction {} registered: {} -> {:?} ({})", id, from, target, kind);
        self.interactions.push(Interaction {
            id,
            from: from.to_string(),
            target,
            term,
            connections,
        });
        Ok(id)
    }

    /// Sets or replaces the parameters of an interaction term
    pub fn set_interaction_params(&mut self, id: InteractionId, params: &[f64]) -> NetworkResult<()> {
        self.interactions
            .get_mut(id.0)
            .ok_or(NetworkError::UnknownInteraction(id))?
            .term
            .set_params(params)
    }

    // =============================================================================================
    // Lookups
    // =============================================================================================

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> NetworkResult<&Cell> {
        self.cells.get(id.0).ok_or(NetworkError::UnknownCell(id))
    }

    /// Mutable access for position and initial condition updates
    pub fn cell_mut(&mut self, id: CellId) -> NetworkResult<&mut Cell> {
        self.cells.get_mut(id.0).ok_or(NetworkError::UnknownCell(id))
    }

    pub fn models(&self) -> &[Arc<InternalModel>] {
        &self.models
    }

    pub fn model(&self, id: ModelId) -> NetworkResult<&Arc<InternalModel>> {
        self.models.get(id.0).ok_or(NetworkError::UnknownModel(id))
    }

    /// Cells assigned to a model, in assignment order
    pub fn group(&self, id: ModelId) -> NetworkResult<&[CellId]> {
        self.groups
            .get(id.0)
            .map(Vec::as_slice)
            .ok_or(NetworkError::UnknownModel(id))
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction(&self, id: InteractionId) -> NetworkResult<&Interaction> {
        self.interactions
            .get(id.0)
            .ok_or(NetworkError::UnknownInteraction(id))
    }

    /// Interactions contributing to species `node`
    pub fn contributions(&self, node: &str) -> Vec<&Interaction> {
        self.interactions
            .iter()
            .filter(|i| i.to_node() == Some(node))
            .collect()
    }

    /// Modifier interactions acting on `target`
    pub fn modifiers(&self, target: &InteractionTarget) -> Vec<&Interaction> {
        self.interactions
            .iter()
            .filter(|i| i.is_modifier() && i.target() == target)
            .collect()
    }

    // =============================================================================================
    // Readiness and layout
    // =============================================================================================

    /// Every reason the network cannot be integrated yet
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for cell in &self.cells {
            if cell.model().is_none() {
                violations.push(Violation::MissingModel { cell: cell.id() });
            } else if cell.initial_condition().is_none() {
                violations.push(Violation::MissingInitialCondition { cell: cell.id() });
            }
        }

        for model in &self.models {
            for edge in model.unset_parameters() {
                violations.push(Violation::EdgeParametersUnset {
                    model: model.name().to_string(),
                    edge,
                });
            }
        }

        let mut coupled = false;
        for interaction in &self.interactions {
            if !interaction.term().params_set() {
                violations.push(Violation::InteractionParametersUnset {
                    interaction: interaction.id(),
                });
            }
            if let Some(connections) = interaction.connections() {
                coupled = true;
                if connections.nrows() != self.cells.len() {
                    violations.push(Violation::Connectivity {
                        interaction: interaction.id(),
                        reason: format!(
                            "matrix covers {} cell(s) but {} are registered",
                            connections.nrows(),
                            self.cells.len()
                        ),
                    });
                }
            }
        }

        if coupled {
            violations.extend(self.geometry_violations());
        }

        violations
    }

    fn geometry_violations(&self) -> Vec<Violation> {
        let dimension = self
            .cells
            .iter()
            .find(|c| c.has_position())
            .map(|c| c.position().len());

        self.cells
            .iter()
            .filter_map(|cell| {
                let reason = match dimension {
                    _ if !cell.has_position() => "no position set".to_string(),
                    Some(d) if cell.position().len() != d => format!(
                        "position has {} coordinate(s), expected {}",
                        cell.position().len(),
                        d
                    ),
                    _ => return None,
                };
                Some(Violation::Geometry {
                    cell: cell.id(),
                    reason,
                })
            })
            .collect()
    }

    /// Fails with every violation found, each logged as a warning
    pub fn check_ready(&self) -> NetworkResult<()> {
        let violations = self.violations();
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            log::warn!("not ready: {}", violation);
        }
        Err(NetworkError::NotReady(violations))
    }

    /// Cell index range `(lower, upper)` of each group, group-major
    pub fn group_bounds(&self) -> Vec<(usize, usize)> {
        let mut lower = 0;
        self.groups
            .iter()
            .map(|cells| {
                let bounds = (lower, lower + cells.len());
                lower = bounds.1;
                bounds
            })
            .collect()
    }

    /// Range of each group in the flat state vector
    pub fn state_bounds(&self) -> Vec<Range<usize>> {
        let mut lower = 0;
        self.groups
            .iter()
            .zip(&self.models)
            .map(|(cells, model)| {
                let range = lower..lower + cells.len() * model.num_nodes();
                lower = range.end;
                range
            })
            .collect()
    }

    /// Length of the flat state vector
    pub fn state_dimension(&self) -> usize {
        self.state_bounds().last().map_or(0, |range| range.end)
    }

    /// Flat initial state in group-major layout
    pub fn initial_state(&self) -> NetworkResult<DVector<f64>> {
        self.check_ready()?;
        self.flatten_initial_conditions()
    }

    fn flatten_initial_conditions(&self) -> NetworkResult<DVector<f64>> {
        let mut state = Vec::with_capacity(self.state_dimension());
        for cells in &self.groups {
            for &id in cells {
                let values = self
                    .cell(id)?
                    .initial_condition()
                    .ok_or(NetworkError::NotReady(vec![Violation::MissingInitialCondition {
                        cell: id,
                    }]))?;
                state.extend(values.iter());
            }
        }
        Ok(DVector::from_vec(state))
    }

    /// Validates the network and compiles its right-hand side
    pub fn assemble(&self) -> NetworkResult<Assembly> {
        self.check_ready()?;
        Assembly::compile(self)
    }

    // =============================================================================================
    // Driver
    // =============================================================================================

    /// Integrates the network and splits the trajectory per cell
    ///
    /// Nothing is integrated unless [`check_ready`](Self::check_ready) passes.
    pub fn simulate(
        &self,
        solver: &dyn Solver,
        config: &SolverConfiguration,
    ) -> NetworkResult<CellTrajectories> {
        // ====== Step 1: Readiness and compilation ======

        let assembly = self.assemble()?;
        let initial = self.flatten_initial_conditions()?;
        let layout: Vec<(Range<usize>, usize, Vec<CellId>)> = assembly
            .groups()
            .iter()
            .map(|g| (g.state_range(), g.num_species(), g.cells().to_vec()))
            .collect();

        log::info!(
            "simulating {} cell(s) in {} group(s), state dimension {}, with {}",
            self.cells.len(),
            layout.len(),
            initial.len(),
            solver.name()
        );

        // ====== Step 2: Integration ======

        let scenario = Scenario::new(Box::new(assembly), initial);
        let result = solver
            .solve(&scenario, config)
            .map_err(NetworkError::Integration)?;

        // ====== Step 3: Per-cell split ======

        let mut per_cell: Vec<Option<Array2<f64>>> = vec![None; self.cells.len()];
        for (range, num_species, cells) in &layout {
            for (k, id) in cells.iter().enumerate() {
                let offset = range.start + k * num_species;
                per_cell[id.0] = Some(
                    result
                        .trajectory
                        .slice(s![.., offset..offset + num_species])
                        .to_owned(),
                );
            }
        }

        let cells = per_cell
            .into_iter()
            .enumerate()
            .map(|(index, data)| data.ok_or(NetworkError::UnknownCell(CellId(index))))
            .collect::<NetworkResult<Vec<_>>>()?;

        log::info!(
            "simulation finished: {} time point(s)",
            result.time_points.len()
        );

        Ok(CellTrajectories {
            time_points: result.time_points,
            cells,
            metadata: result.metadata,
        })
    }
}

// =================================================================================================
// Results
// =================================================================================================

/// Per-cell time series returned by [`Simulation::simulate`]
#[derive(Debug, Clone)]
pub struct CellTrajectories {
    time_points: Vec<f64>,
    /// `(time × species)` per cell, indexed by cell id
    cells: Vec<Array2<f64>>,
    metadata: HashMap<String, String>,
}

impl CellTrajectories {
    pub fn time_points(&self) -> &[f64] {
        &self.time_points
    }

    /// Trajectory of one cell, species in its model's node order
    pub fn cell(&self, id: CellId) -> Option<&Array2<f64>> {
        self.cells.get(id.0)
    }

    /// Every trajectory in cell registration order
    pub fn cells(&self) -> &[Array2<f64>] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Solver metadata (method, steps, ...)
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

// =================================================================================================
// Tests
// =================================================================================================
