//! Compiled right-hand side of a cell network
//!
//! [`Assembly::compile`] turns a ready [`Simulation`] into an immutable
//! evaluation structure:
//!
//! - a [`GroupLayout`] per internal model (its cells, cell bounds and state
//!   range),
//! - diffusion weights per coupling interaction, in layout column order,
//! - for every group and every species, the list of contribution plans.
//!
//! A plan is a tree: a contribution with its validated rate law, and the
//! plans of its modifiers split by type. Evaluating a plan is the recursive
//! contribution resolver:
//!
//! ```text
//! input  = source values ⊙ Π resolve(internal-type modifiers)
//! output = term(input)   ⊙ Π resolve(multiplicative-type modifiers)
//! ```
//!
//! Internal contributions read the source column of the evaluating group.
//! External contributions read the source species of every cell into a
//! `(group_cells × total_cells)` working matrix, the not-available sentinel
//! (`NaN`) standing in for cells whose model lacks the species; internal-type
//! modifiers scale its rows.
//!
//! The canonical state is never written: every buffer the resolver scales is
//! an owned copy.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{NetworkError, NetworkResult};
use crate::network::interaction::{Interaction, InteractionTarget, distance_weights};
use crate::network::internal_model::{Edge, InternalModel};
use crate::network::simulation::Simulation;
use crate::network::terms::{ModifierType, RateLaw, ReactionTerm, TermParams, diffusion, own_values};
use crate::network::{CellId, InteractionId, ModelId};
use crate::system::OdeSystem;

// =================================================================================================
// Layout
// =================================================================================================

/// Position of one cell group in the flat state
#[derive(Debug, Clone)]
pub struct GroupLayout {
    model_id: ModelId,
    model: Arc<InternalModel>,
    cells: Vec<CellId>,
    cell_bounds: (usize, usize),
    state_range: Range<usize>,
}

impl GroupLayout {
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn model(&self) -> &Arc<InternalModel> {
        &self.model
    }

    /// Member cells in layout order
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_species(&self) -> usize {
        self.model.num_nodes()
    }

    /// `(lower, upper)` columns of this group in a working matrix
    pub fn cell_bounds(&self) -> (usize, usize) {
        self.cell_bounds
    }

    pub fn state_range(&self) -> Range<usize> {
        self.state_range.clone()
    }
}

// =================================================================================================
// Plans
// =================================================================================================

#[derive(Debug, Clone)]
enum Kernel {
    Elementwise(RateLaw),
    Diffusion { rate: f64, weights: Arc<DMatrix<f64>> },
}

#[derive(Debug, Clone)]
enum Plan {
    Internal {
        /// Source species column in the evaluating group
        source: usize,
        law: RateLaw,
        intern: Vec<Plan>,
        mult: Vec<Plan>,
    },
    External {
        /// Source species column in each group, `None` when absent
        sources: Vec<Option<usize>>,
        kernel: Kernel,
        intern: Vec<Plan>,
        mult: Vec<Plan>,
    },
}

impl Plan {
    fn size(&self) -> usize {
        let (intern, mult) = match self {
            Plan::Internal { intern, mult, .. } | Plan::External { intern, mult, .. } => {
                (intern, mult)
            }
        };
        1 + intern.iter().chain(mult).map(Plan::size).sum::<usize>()
    }
}

// =================================================================================================
// Assembly
// =================================================================================================

/// Immutable, validated right-hand side of a cell network
#[derive(Debug, Clone)]
pub struct Assembly {
    groups: Vec<GroupLayout>,
    total_cells: usize,
    dimension: usize,
    /// `[group][species][contribution]`
    plans: Vec<Vec<Vec<Plan>>>,
    description: String,
}

impl Assembly {
    /// Compiles a network; readiness is assumed to have been checked
    pub(crate) fn compile(simulation: &Simulation) -> NetworkResult<Self> {
        // ====== Step 1: Layout ======

        let bounds = simulation.group_bounds();
        let ranges = simulation.state_bounds();
        let mut groups = Vec::with_capacity(simulation.num_models());
        for (index, model) in simulation.models().iter().enumerate() {
            let model_id = ModelId(index);
            groups.push(GroupLayout {
                model_id,
                model: Arc::clone(model),
                cells: simulation.group(model_id)?.to_vec(),
                cell_bounds: bounds[index],
                state_range: ranges[index].clone(),
            });
        }
        let order: Vec<CellId> = groups.iter().flat_map(|g| g.cells.iter().copied()).collect();
        let dimension = ranges.last().map_or(0, |r| r.end);

        // ====== Step 2: Distance weights ======

        let positions: Vec<&[f64]> = simulation.cells().iter().map(|c| c.position()).collect();
        let mut weights = HashMap::new();
        for interaction in simulation.interactions() {
            if let Some(connections) = interaction.connections()
                && interaction.term().kind().is_coupling()
            {
                weights.insert(
                    interaction.id(),
                    Arc::new(distance_weights(&positions, connections, &order)),
                );
            }
        }

        // ====== Step 3: Contribution plans ======

        let compiler = Compiler {
            simulation,
            groups: &groups,
            weights: &weights,
        };
        let plans = groups
            .iter()
            .enumerate()
            .map(|(g, layout)| {
                layout
                    .model
                    .nodes()
                    .iter()
                    .map(|node| compiler.species(g, node.name()))
                    .collect::<NetworkResult<Vec<_>>>()
            })
            .collect::<NetworkResult<Vec<_>>>()?;

        let plan_nodes: usize = plans.iter().flatten().flatten().map(Plan::size).sum();
        log::debug!(
            "assembly compiled: {} group(s) with cell bounds {:?}, dimension {}, {} plan node(s), {} weight matrix(es)",
            groups.len(),
            bounds,
            dimension,
            plan_nodes,
            weights.len()
        );

        let description = format!(
            "{} cell(s) in {} group(s), {} interaction(s)",
            order.len(),
            groups.len(),
            simulation.interactions().len()
        );

        Ok(Self {
            groups,
            total_cells: order.len(),
            dimension,
            plans,
            description,
        })
    }

    pub fn groups(&self) -> &[GroupLayout] {
        &self.groups
    }

    pub fn total_cells(&self) -> usize {
        self.total_cells
    }

    /// Number of contributions feeding one species of one group
    pub fn num_contributions(&self, group: usize, species: usize) -> usize {
        self.plans
            .get(group)
            .and_then(|g| g.get(species))
            .map_or(0, Vec::len)
    }

    /// Splits a flat state into one `(cells × species)` matrix per group
    ///
    /// # Panics
    ///
    /// Panics when `state.len()` differs from the assembly dimension.
    pub fn group_states(&self, state: &DVector<f64>) -> Vec<DMatrix<f64>> {
        assert_eq!(
            state.len(),
            self.dimension,
            "state length does not match the network dimension"
        );
        self.groups
            .iter()
            .map(|g| {
                DMatrix::from_row_slice(
                    g.num_cells(),
                    g.num_species(),
                    &state.as_slice()[g.state_range()],
                )
            })
            .collect()
    }

    /// Derivative of one group as a `(cells × species)` matrix
    fn group_derivative(&self, group: usize, states: &[DMatrix<f64>]) -> DMatrix<f64> {
        let layout = &self.groups[group];
        let mut accumulator = DMatrix::zeros(layout.num_cells(), layout.num_species());
        for (species, plans) in self.plans[group].iter().enumerate() {
            for plan in plans {
                let contribution = self.resolve(plan, states, group);
                let mut column = accumulator.column_mut(species);
                column += contribution;
            }
        }
        accumulator
    }

    fn accumulate(&self, states: &[DMatrix<f64>]) -> Vec<DMatrix<f64>> {
        #[cfg(feature = "parallel")]
        if self.dimension > crate::solver::parallel_threshold() {
            return (0..self.groups.len())
                .into_par_iter()
                .map(|g| self.group_derivative(g, states))
                .collect();
        }

        (0..self.groups.len())
            .map(|g| self.group_derivative(g, states))
            .collect()
    }

    // =============================================================================================
    // Resolver
    // =============================================================================================

    /// Value of one contribution for every cell of `group`
    fn resolve(&self, plan: &Plan, states: &[DMatrix<f64>], group: usize) -> DVector<f64> {
        let layout = &self.groups[group];
        match plan {
            Plan::Internal {
                source,
                law,
                intern,
                mult,
                ..
            } => {
                let mut input = states[group].column(*source).into_owned();
                for modifier in intern {
                    input.component_mul_assign(&self.resolve(modifier, states, group));
                }
                let mut output = law.apply(&input);
                for modifier in mult {
                    output.component_mul_assign(&self.resolve(modifier, states, group));
                }
                output
            }
            Plan::External {
                sources,
                kernel,
                intern,
                mult,
                ..
            } => {
                let row = self.gather(sources, states);
                let mut scale = DVector::from_element(layout.num_cells(), 1.0);
                for modifier in intern {
                    scale.component_mul_assign(&self.resolve(modifier, states, group));
                }
                let working =
                    DMatrix::from_fn(layout.num_cells(), self.total_cells, |i, j| scale[i] * row[j]);

                let mut output = match kernel {
                    Kernel::Elementwise(law) => own_values(&working, layout.cell_bounds.0)
                        .map(|v| if v.is_nan() { 0.0 } else { law.evaluate(v) }),
                    Kernel::Diffusion { rate, weights } => {
                        diffusion(*rate, &working, layout.cell_bounds, weights)
                    }
                };
                for modifier in mult {
                    output.component_mul_assign(&self.resolve(modifier, states, group));
                }
                output
            }
        }
    }

    /// Source values of every cell in layout order, `NaN` where unavailable
    fn gather(&self, sources: &[Option<usize>], states: &[DMatrix<f64>]) -> DVector<f64> {
        let mut row = Vec::with_capacity(self.total_cells);
        for (source, state) in sources.iter().zip(states) {
            match source {
                Some(column) => row.extend(state.column(*column).iter()),
                None => row.extend(std::iter::repeat_n(f64::NAN, state.nrows())),
            }
        }
        DVector::from_vec(row)
    }
}

impl OdeSystem for Assembly {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn derivative(&self, state: &DVector<f64>, _t: f64) -> DVector<f64> {
        let states = self.group_states(state);
        let accumulators = self.accumulate(&states);

        let mut derivative = DVector::zeros(self.dimension);
        for (layout, accumulator) in self.groups.iter().zip(&accumulators) {
            // row-major flatten: (cells × species)ᵀ in column-major storage
            derivative.as_mut_slice()[layout.state_range()]
                .copy_from_slice(accumulator.transpose().as_slice());
        }
        derivative
    }

    fn name(&self) -> &str {
        "Cell network"
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }
}

// =================================================================================================
// Compiler
// =================================================================================================

struct Compiler<'a> {
    simulation: &'a Simulation,
    groups: &'a [GroupLayout],
    weights: &'a HashMap<InteractionId, Arc<DMatrix<f64>>>,
}

impl Compiler<'_> {
    /// Every contribution to `node` in `group`: model edges, then interactions
    fn species(&self, group: usize, node: &str) -> NetworkResult<Vec<Plan>> {
        let model = &self.groups[group].model;
        let internal = model
            .contributions(node)
            .into_iter()
            .map(|edge| self.edge(group, edge));
        let external = self
            .simulation
            .contributions(node)
            .into_iter()
            .map(|interaction| self.interaction(group, interaction));
        internal.chain(external).collect()
    }

    fn edge(&self, group: usize, edge: &Edge) -> NetworkResult<Plan> {
        let layout = &self.groups[group];
        let source = layout.model.node_index(edge.from_node())?;
        let law = elementwise_law(edge.term())?;

        let mut modifiers = Vec::new();
        for modifier in layout.model.modifiers(edge.id()) {
            modifiers.push((modifier.term().modifier_type(), self.edge(group, modifier)?));
        }
        let target = InteractionTarget::Edge {
            model: layout.model_id,
            edge: edge.id(),
        };
        for modifier in self.simulation.modifiers(&target) {
            modifiers.push((
                modifier.term().modifier_type(),
                self.interaction(group, modifier)?,
            ));
        }
        let (intern, mult) = split_modifiers(modifiers);

        Ok(Plan::Internal {
            source,
            law,
            intern,
            mult,
        })
    }

    fn interaction(&self, group: usize, interaction: &Interaction) -> NetworkResult<Plan> {
        let sources = self
            .groups
            .iter()
            .map(|g| g.model.node_index(interaction.from_node()).ok())
            .collect();

        let kernel = match interaction.term().params() {
            None => {
                return Err(NetworkError::ParametersUnset(
                    interaction.term().kind().to_string(),
                ));
            }
            Some(TermParams::Elementwise(law)) => Kernel::Elementwise(*law),
            Some(TermParams::Diffusion { c }) => Kernel::Diffusion {
                rate: *c,
                weights: self.weights.get(&interaction.id()).cloned().ok_or_else(|| {
                    NetworkError::config(format!(
                        "interaction {} has no connectivity matrix",
                        interaction.id()
                    ))
                })?,
            },
        };

        let target = InteractionTarget::Interaction(interaction.id());
        let mut modifiers = Vec::new();
        for modifier in self.simulation.modifiers(&target) {
            modifiers.push((
                modifier.term().modifier_type(),
                self.interaction(group, modifier)?,
            ));
        }
        let (intern, mult) = split_modifiers(modifiers);

        Ok(Plan::External {
            sources,
            kernel,
            intern,
            mult,
        })
    }
}

fn elementwise_law(term: &ReactionTerm) -> NetworkResult<RateLaw> {
    match term.params() {
        Some(TermParams::Elementwise(law)) => Ok(*law),
        Some(TermParams::Diffusion { .. }) => Err(NetworkError::config(format!(
            "'{}' cannot be evaluated inside one cell",
            term.kind()
        ))),
        None => Err(NetworkError::ParametersUnset(term.kind().to_string())),
    }
}

fn split_modifiers(modifiers: Vec<(Option<ModifierType>, Plan)>) -> (Vec<Plan>, Vec<Plan>) {
    let mut intern = Vec::new();
    let mut mult = Vec::new();
    for (modifier_type, plan) in modifiers {
        match modifier_type {
            Some(ModifierType::Internal) => intern.push(plan),
            Some(ModifierType::Multiplicative) => mult.push(plan),
            None => {}
        }
    }
    (intern, mult)
}

// =================================================================================================
// Tests
// =================================================================================================
