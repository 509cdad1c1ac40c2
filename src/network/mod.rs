//! Multi-cell reaction networks
//!
//! This module holds the data model and the derivative engine:
//!
//! - **[`terms`]**: reaction term library (rate laws, diffusion, modifiers)
//! - **[`internal_model`]**: per-cell-type reaction graph and its builder
//! - **[`cell`]**: one compartment (position, model, initial condition)
//! - **[`interaction`]**: cross-cell edges and their distance weights
//! - **[`simulation`]**: registry of cells, models and interactions; readiness
//!   and the `simulate` driver
//! - **[`assembly`]**: compiled, immutable right-hand side with the recursive
//!   contribution resolver
//!
//! # Workflow
//!
//! ```text
//! InternalModelBuilder ──build──► Arc<InternalModel>
//!                                      │
//! Simulation::add_cell ──► CellId      │
//! Simulation::add_internal_model ◄─────┘ ──► ModelId
//! Simulation::set_internal_model / set_initial_conditions
//! Simulation::add_interaction ──► InteractionId
//!                 │
//!      assemble() ▼
//!            Assembly (OdeSystem) ──► Solver ──► per-cell trajectories
//! ```
//!
//! # State layout
//!
//! The flat state vector is group-major: groups in model registration order,
//! cells in group-membership order, species in node order.

use std::fmt;

pub mod assembly;
pub mod cell;
pub mod interaction;
pub mod internal_model;
pub mod simulation;
pub mod terms;

// =================================================================================================
// Identifiers
// =================================================================================================

/// Registration index of a cell in its [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub usize);

/// Registration index of an internal model in its [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

/// Process-wide unique id of an internal-model edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// Registration index of an interaction in its [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionId(pub usize);

macro_rules! display_index {
    ($($id:ty),*) => {
        $(
            impl fmt::Display for $id {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_index!(CellId, ModelId, EdgeId, InteractionId);

// =================================================================================================
// Re-exports
// =================================================================================================

pub use assembly::{Assembly, GroupLayout};
pub use cell::Cell;
pub use interaction::{Interaction, InteractionTarget};
pub use internal_model::{Edge, EdgeTarget, InternalModel, InternalModelBuilder, Node};
pub use simulation::{CellTrajectories, Simulation};
pub use terms::{ModifierType, RateLaw, ReactionTerm, TermKind, TermParams};
