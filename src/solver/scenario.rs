//! Simulation scenario definition
//!
//! A scenario combines an ODE system with its initial state.
use nalgebra::DVector;

use crate::system::OdeSystem;

/// Simulation scenario
///
/// Defines a specific case to integrate:
/// - ODE system (equations)
/// - Initial state at the first output time
///
/// # Design
///
/// The same scenario can be solved with different numerical methods.
/// This is the "WHAT to solve" (not "HOW to solve").
pub struct Scenario {
    /// ODE system (equations)
    pub system: Box<dyn OdeSystem>,

    /// State at the first output time
    pub initial_state: DVector<f64>,
}

impl Scenario {
    /// Create a scenario
    pub fn new(system: Box<dyn OdeSystem>, initial_state: DVector<f64>) -> Self {
        Self {
            system,
            initial_state,
        }
    }

    /// Checks that the initial state fits the system
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_state.len() != self.system.dimension() {
            return Err(format!(
                "Initial state has {} entries but system '{}' has dimension {}",
                self.initial_state.len(),
                self.system.name(),
                self.system.dimension()
            ));
        }
        if self.initial_state.iter().any(|x| !x.is_finite()) {
            return Err("Initial state contains non-finite values".to_string());
        }
        Ok(())
    }

    /// Get system name
    pub fn get_system_name(&self) -> &str {
        self.system.name()
    }

    /// Length of the state vector
    pub fn dimension(&self) -> usize {
        self.system.dimension()
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_system_name())
            .field("dimension", &self.dimension())
            .field("initial state", &self.initial_state.as_slice())
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
