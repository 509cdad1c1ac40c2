//! Error taxonomy for network construction and simulation
//!
//! Two families of failures exist:
//!
//! - **Configuration errors**: something the caller assembled is incomplete or
//!   inconsistent (unset parameters, wrong initial-condition keys, unknown kind
//!   identifiers, cells without a model). These surface at registration time or
//!   in the readiness pass that runs before integration starts.
//! - **Lookup errors**: an unknown node, edge, cell, model or interaction was
//!   requested. These surface immediately at the call site.
//!
//! Numeric domain issues are never errors: every reaction term returns a finite
//! value for any real input.

use std::fmt;
use thiserror::Error;

use crate::network::{CellId, EdgeId, InteractionId, ModelId};

/// Result alias used throughout the `network` module
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors raised while building or simulating a cell network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Generic configuration inconsistency
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A term, degradation, interaction or modifier identifier is not known
    #[error("Unknown kind identifier '{0}'")]
    UnknownKind(String),

    /// Parameter vector rejected by a term
    #[error("Invalid parameters for {kind}: {reason}")]
    InvalidParameters { kind: String, reason: String },

    /// A term was applied before its parameters were set
    #[error("Parameters of {0} term are not set")]
    ParametersUnset(String),

    /// Initial-condition mapping does not match the assigned model
    #[error("Invalid initial condition for cell {cell}: {reason}")]
    InitialCondition { cell: CellId, reason: String },

    /// No node with this name in the model
    #[error("Unknown node '{node}' in model '{model}'")]
    UnknownNode { model: String, node: String },

    /// No edge with this id in the model
    #[error("Unknown edge {edge} in model '{model}'")]
    UnknownEdge { model: String, edge: EdgeId },

    /// No cell with this id in the simulation
    #[error("Unknown cell {0}")]
    UnknownCell(CellId),

    /// No internal model with this id in the simulation
    #[error("Unknown internal model {0}")]
    UnknownModel(ModelId),

    /// No interaction with this id in the simulation
    #[error("Unknown interaction {0}")]
    UnknownInteraction(InteractionId),

    /// Readiness check failed; every violation found is listed
    #[error("Simulation is not ready ({} violation(s)): {}", .0.len(), join_violations(.0))]
    NotReady(Vec<Violation>),

    /// The integrator refused or failed the run
    #[error("Integration failed: {0}")]
    Integration(String),
}

impl NetworkError {
    /// Creates a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        NetworkError::Configuration(message.into())
    }

    /// Creates an invalid-parameters error
    pub fn invalid_parameters(kind: impl fmt::Display, reason: impl Into<String>) -> Self {
        NetworkError::InvalidParameters {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    /// Violations carried by a readiness failure (empty for other errors)
    pub fn violations(&self) -> &[Violation] {
        match self {
            NetworkError::NotReady(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =================================================================================================
// Readiness violations
// =================================================================================================

/// One problem found by the readiness pass
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Cell was never assigned an internal model
    MissingModel { cell: CellId },

    /// Cell has a model but no initial condition
    MissingInitialCondition { cell: CellId },

    /// An edge of an internal model has unset parameters
    EdgeParametersUnset { model: String, edge: EdgeId },

    /// An interaction term has unset parameters
    InteractionParametersUnset { interaction: InteractionId },

    /// Cell geometry cannot support a distance-weighted interaction
    Geometry { cell: CellId, reason: String },

    /// Connectivity matrix does not cover every cell
    Connectivity { interaction: InteractionId, reason: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingModel { cell } => {
                write!(f, "cell {cell} has no internal model")
            }
            Violation::MissingInitialCondition { cell } => {
                write!(f, "cell {cell} has no initial condition")
            }
            Violation::EdgeParametersUnset { model, edge } => {
                write!(f, "edge {edge} of model '{model}' has unset parameters")
            }
            Violation::InteractionParametersUnset { interaction } => {
                write!(f, "interaction {interaction} has unset parameters")
            }
            Violation::Geometry { cell, reason } => {
                write!(f, "cell {cell}: {reason}")
            }
            Violation::Connectivity { interaction, reason } => {
                write!(f, "interaction {interaction}: {reason}")
            }
        }
    }
}
