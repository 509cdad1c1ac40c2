//! Runge-Kutta 4 (RK4) numerical solver
//!
//! # Mathematical Background
//!
//! The RK4 scheme uses a weighted average of four slope estimates:
//!
//! ```text
//! k₁ = f(yₙ, tₙ)
//! k₂ = f(yₙ + dt/2 * k₁, tₙ + dt/2)
//! k₃ = f(yₙ + dt/2 * k₂, tₙ + dt/2)
//! k₄ = f(yₙ + dt * k₃, tₙ + dt)
//!
//! yₙ₊₁ = yₙ + dt/6 * (k₁ + 2k₂ + 2k₃ + k₄)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: Fourth-order accurate (error ~ O(dt⁴) per step)
//! - **Complexity**: 4 function evaluations per step
//! - **Limitations**: fixed step, explicit (not suited to very stiff networks)
//!
//! # Comparison with Euler
//!
//! | Method | Order | Evals/Step | Error |
//! |--------|-------|------------|-------|
//! | Euler  | 1     | 1          | O(dt) |
//! | RK4    | 4     | 4          | O(dt⁴)|

use crate::solver::methods::march;
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration};

// =================================================================================================
// RK4 Solver
// =================================================================================================

/// Classical fourth-order Runge-Kutta solver
///
/// # Example
///
/// ```rust
/// use cellnet_rs::solver::{RK4Solver, Solver};
///
/// let solver = RK4Solver::new();
/// assert_eq!(solver.name(), "Runge Kutta (RK4)");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4Solver;

impl RK4Solver {
    /// Create a new RK4 solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for RK4Solver {
    fn solve(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> Result<SimulationResult, String> {
        // ====== Step 1: Integration ======

        let system = scenario.system.as_ref();
        let (time_points, states, steps) = march(scenario, config, |state, t, dt| {
            let half = dt / 2.0;

            // Stage 1: slope at beginning of interval
            let k1 = system.derivative(state, t);

            // Stage 2 and 3: slopes at the midpoint
            let k2 = system.derivative(&(state + &k1 * half), t + half);
            let k3 = system.derivative(&(state + &k2 * half), t + half);

            // Stage 4: slope at the end
            let k4 = system.derivative(&(state + &k3 * dt), t + dt);

            // Simpson weights 1/6, 1/3, 1/3, 1/6
            state + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
        })?;

        // ====== Step 2: Build Result ======

        let final_state = states
            .last()
            .cloned()
            .ok_or_else(|| "Integration produced no state".to_string())?;
        let mut result = SimulationResult::new(time_points, &states, final_state);

        result.add_metadata("solver", "Runge-Kutta 4");
        result.add_metadata("time steps", &steps.to_string());
        result.add_metadata("substeps", &config.substeps().to_string());
        result.add_metadata("function evaluations", &(4 * steps).to_string());

        Ok(result)
    }

    fn name(&self) -> &str {
        "Runge Kutta (RK4)"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
