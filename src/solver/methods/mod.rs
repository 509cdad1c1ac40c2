//! Numerical methods for integrating ODE systems
//!
//! This module contains concrete implementations of the [`Solver`](crate::solver::Solver) trait.
//!
//! # Available Methods
//!
//! Both methods are explicit fixed-step schemes, suitable for non-stiff
//! systems. Each output interval is split into `substeps` internal steps.
//!
//! - **[`EulerSolver`]**: Forward Euler method
//!   - Order: First-order O(dt)
//!   - Cost: 1 derivative evaluation per step
//!
//! - **[`RK4Solver`]**: Classical fourth-order Runge-Kutta
//!   - Order: Fourth-order O(dt⁴)
//!   - Cost: 4 derivative evaluations per step
//!
//! # Example
//!
//! ```rust
//! use cellnet_rs::solver::{EulerSolver, RK4Solver, Scenario, Solver, SolverConfiguration};
//! use cellnet_rs::system::OdeSystem;
//! use nalgebra::DVector;
//!
//! struct Decay;
//!
//! impl OdeSystem for Decay {
//!     fn dimension(&self) -> usize { 1 }
//!     fn derivative(&self, state: &DVector<f64>, _t: f64) -> DVector<f64> { -state }
//!     fn name(&self) -> &str { "Decay" }
//! }
//!
//! # fn main() -> Result<(), String> {
//! let scenario = Scenario::new(Box::new(Decay), DVector::from_element(1, 1.0));
//! let config = SolverConfiguration::time_points(vec![0.0, 0.5, 1.0], 100);
//!
//! let euler = EulerSolver::new().solve(&scenario, &config)?;
//! let rk4 = RK4Solver::new().solve(&scenario, &config)?;
//!
//! let exact = (-1.0f64).exp();
//! assert!((rk4.final_state[0] - exact).abs() < (euler.final_state[0] - exact).abs());
//! # Ok(())
//! # }
//! ```

mod euler;
mod rk4;

// Re-exports for convenience
pub use euler::EulerSolver;
pub use rk4::RK4Solver;

use nalgebra::DVector;

use crate::solver::{Scenario, SolverConfiguration, validate_state};

/// Output of [`march`]: output times, one state per output time, internal
/// step count
pub(crate) type Marched = (Vec<f64>, Vec<DVector<f64>>, usize);

/// Drives a one-step scheme across the output grid
///
/// `step(state, t, dt)` returns the state at `t + dt`. Every internal state
/// is checked for NaN and Inf.
pub(crate) fn march<F>(
    scenario: &Scenario,
    config: &SolverConfiguration,
    mut step: F,
) -> Result<Marched, String>
where
    F: FnMut(&DVector<f64>, f64, f64) -> DVector<f64>,
{
    config.validate()?;
    scenario.validate()?;

    let times = config.output_times();
    let substeps = config.substeps();

    let mut state = scenario.initial_state.clone();
    let mut states = Vec::with_capacity(times.len());
    states.push(state.clone());

    let mut steps = 0;
    for window in times.windows(2) {
        let (start, end) = (window[0], window[1]);
        let dt = (end - start) / substeps as f64;
        for substep in 0..substeps {
            // time from the substep index, not accumulated
            let t = start + substep as f64 * dt;
            state = step(&state, t, dt);
            steps += 1;
            validate_state(&state, steps)?;
        }
        states.push(state.clone());
    }

    Ok((times, states, steps))
}
