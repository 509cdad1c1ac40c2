//! cellnet-rs: Multi-Cell Reaction Network Simulation
//!
//! Builds ordinary differential equation systems for populations of cells.
//! Each cell carries a small reaction graph (its internal model); cells are
//! coupled by interactions such as distance-weighted diffusion. The whole
//! network is compiled into one right-hand side and integrated by a numerical
//! solver.
//!
//! # Architecture
//!
//! cellnet-rs is built on two core principles:
//!
//! 1. **Separation of Equations and Numerics**
//!    - The network assembles equations (what to solve)
//!    - Numerical solvers provide methods (how to solve)
//!
//! 2. **Validate Once, Evaluate Often**
//!    - Registration errors surface as [`error::NetworkError`]
//!    - Readiness is checked before anything is compiled
//!    - The compiled [`network::Assembly`] never fails while integrating
//!
//! # Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use cellnet_rs::prelude::*;
//!
//! # fn main() -> Result<(), NetworkError> {
//! // 1. Describe a cell type: `a` is produced at rate 2 and decays linearly
//! let mut builder = InternalModelBuilder::new("producer");
//! builder.add_node("a", Some(ReactionTerm::with_params(TermKind::LinearDegradation, &[1.0])?))?;
//! builder.add_edge("a", "a", ReactionTerm::with_params(TermKind::ConstantProduction, &[2.0])?)?;
//!
//! // 2. Register cells and assign the model
//! let mut simulation = Simulation::new();
//! let cell = simulation.add_cell(&[0.0, 0.0]);
//! let model = simulation.add_internal_model(builder.build());
//! simulation.set_internal_model(&[cell], model)?;
//! simulation.set_initial_conditions(&[cell], &HashMap::from([("a".to_string(), 0.0)]))?;
//!
//! // 3. Integrate
//! let config = SolverConfiguration::time_evolution(20.0, 200);
//! let trajectories = simulation.simulate(&RK4Solver::new(), &config)?;
//!
//! // 4. Read one cell's time series: a → 2 at steady state
//! let series = trajectories.cell(cell).unwrap();
//! assert!((series[[200, 0]] - 2.0).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`network`]: cells, internal models, interactions and the assembled system
//! - [`system`]: the ODE system seam shared by the network and the solvers
//! - [`solver`]: numerical solvers (methods)
//! - [`error`]: error and readiness violation types

pub mod error;
pub mod network;
pub mod solver;
pub mod system;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use cellnet_rs::prelude::*;
    //! ```
    pub use crate::error::{NetworkError, NetworkResult, Violation};
    pub use crate::network::{
        Assembly, CellId, CellTrajectories, EdgeId, EdgeTarget, InteractionId, InteractionTarget,
        InternalModel, InternalModelBuilder, ModelId, ModifierType, ReactionTerm, Simulation,
        TermKind,
    };
    pub use crate::solver::{
        EulerSolver, RK4Solver, Scenario, SimulationResult, Solver, SolverConfiguration,
        SolverType,
    };
    pub use crate::system::OdeSystem;
}
