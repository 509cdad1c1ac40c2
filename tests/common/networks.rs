//! Small networks shared by integration tests

use std::collections::HashMap;

use cellnet_rs::prelude::*;
use nalgebra::DMatrix;

/// Initial-condition map from `(species, value)` pairs
pub fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

/// Every pair of distinct cells connected
pub fn full_connectivity(cells: usize) -> DMatrix<bool> {
    DMatrix::from_fn(cells, cells, |i, j| i != j)
}

/// Model whose species have no reactions at all
pub fn passive_model(name: &str, species: &[&str]) -> InternalModel {
    let mut builder = InternalModelBuilder::new(name);
    for node in species {
        builder.add_node(node, None).unwrap();
    }
    builder.build()
}

/// Single species `a` with `da/dt = production - decay * a`
pub fn production_decay(production: f64, decay: f64) -> InternalModel {
    let mut builder = InternalModelBuilder::new("production-decay");
    builder
        .add_node(
            "a",
            Some(ReactionTerm::with_params(TermKind::LinearDegradation, &[decay]).unwrap()),
        )
        .unwrap();
    builder
        .add_edge(
            "a",
            "a",
            ReactionTerm::with_params(TermKind::ConstantProduction, &[production]).unwrap(),
        )
        .unwrap();
    builder.build()
}

/// Two cells one unit apart exchanging species `a` by diffusion (`C = 1`)
pub fn diffusion_pair(left: f64, right: f64) -> (Simulation, CellId, CellId) {
    let mut simulation = Simulation::new();
    let first = simulation.add_cell(&[0.0]);
    let second = simulation.add_cell(&[1.0]);
    let model = simulation.add_internal_model(passive_model("passive", &["a"]));
    simulation.set_internal_model(&[first, second], model).unwrap();
    simulation
        .set_initial_conditions(&[first], &values(&[("a", left)]))
        .unwrap();
    simulation
        .set_initial_conditions(&[second], &values(&[("a", right)]))
        .unwrap();
    simulation
        .add_interaction(
            "a",
            "a",
            ReactionTerm::with_params(TermKind::Diffusion, &[1.0]).unwrap(),
            Some(full_connectivity(2)),
        )
        .unwrap();
    (simulation, first, second)
}
