//! Numerical solvers
//!
//! This module provides the integrator collaborator of a cell network: a
//! stable [`Solver`] trait and two fixed-step explicit methods.
//!
//! # Core Concepts
//!
//! The solver architecture separates concerns into three layers:
//!
//! 1. **Scenario** (`Scenario`) - WHAT to solve
//!    - ODE system (equations)
//!    - Initial state
//!
//! 2. **Configuration** (`SolverConfiguration`) - HOW to solve
//!    - Output time grid
//!    - Internal steps per output interval
//!
//! 3. **Solver** (`Solver` trait) - The numerical method
//!    - Applies the numerical scheme
//!    - Returns the trajectory on the output grid
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │   ODE System    │  (equations)
//! └────────┬────────┘
//!          │
//! ┌────────▼────────────────┐
//! │ Scenario                │ ← WHAT to solve
//! │ (system + initial state)│
//! └────────┬────────────────┘
//!          │
//! ┌────────▼─────────────┐
//! │ Solver Configuration │ ← HOW to solve
//! │ (output grid)        │
//! └────────┬─────────────┘
//!          │
//! ┌────────▼────────┐
//! │ Numerical Solver│ ← The method
//! │ (Euler, RK4)    │
//! └────────┬────────┘
//!          │
//! ┌────────▼────────────┐
//! │ Simulation Result   │ ← The solution
//! │ (trajectory + meta) │
//! └─────────────────────┘
//! ```
//!
//! # Quick Start Example
//!
//! ```rust
//! use cellnet_rs::solver::{RK4Solver, Scenario, Solver, SolverConfiguration};
//! use cellnet_rs::system::OdeSystem;
//! use nalgebra::DVector;
//!
//! struct Growth;
//!
//! impl OdeSystem for Growth {
//!     fn dimension(&self) -> usize { 1 }
//!     fn derivative(&self, _state: &DVector<f64>, _t: f64) -> DVector<f64> {
//!         DVector::from_element(1, 2.0)
//!     }
//!     fn name(&self) -> &str { "Growth" }
//! }
//!
//! # fn main() -> Result<(), String> {
//! let scenario = Scenario::new(Box::new(Growth), DVector::zeros(1));
//! let config = SolverConfiguration::time_evolution(5.0, 50);
//!
//! let result = RK4Solver::new().solve(&scenario, &config)?;
//! assert_eq!(result.len(), 51);
//! assert!((result.final_state[0] - 10.0).abs() < 1e-10);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All solver methods return `Result<T, String>`. Common errors:
//! - Invalid configuration (negative time, zero steps, unordered time points)
//! - Initial state that does not fit the system
//! - Numerical instability (NaN or Inf in the state)

// =================================================================================================
// Module Declarations
// =================================================================================================
mod methods;
mod scenario;
mod traits;

// =================================================================================================
// Parallel Execution Threshold
// =================================================================================================
//
// The threshold is a performance hint read on every derivative evaluation;
// Relaxed ordering is enough.
// =================================================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default state dimension above which the network derivative evaluates its
/// cell groups on the Rayon pool.
const DEFAULT_PARALLEL_THRESHOLD: usize = 999;

/// Runtime-configurable parallel-execution threshold.
///
/// Read via [`parallel_threshold()`], written via [`set_parallel_threshold()`].
static PARALLEL_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_PARALLEL_THRESHOLD);

/// Return the current parallel-execution threshold.
///
/// The network derivative evaluates its groups sequentially when the state
/// dimension is at most this value and on Rayon above it, only when the crate
/// is compiled with the `parallel` feature.
///
/// # Example
///
/// ```rust
/// use cellnet_rs::solver::parallel_threshold;
///
/// assert!(parallel_threshold() > 0);
/// ```
pub fn parallel_threshold() -> usize {
    PARALLEL_THRESHOLD.load(Ordering::Relaxed)
}

/// Set the parallel-execution threshold to a new value.
///
/// # Panics
///
/// Panics when `threshold == 0`.
///
/// # Example
///
/// ```rust
/// use cellnet_rs::solver::{parallel_threshold, set_parallel_threshold};
///
/// let previous = parallel_threshold();
/// set_parallel_threshold(2048);
/// assert_eq!(parallel_threshold(), 2048);
///
/// // Restore so other tests are not affected.
/// set_parallel_threshold(previous);
/// ```
pub fn set_parallel_threshold(threshold: usize) {
    assert!(threshold > 0, "parallel threshold must be at least 1");
    PARALLEL_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// RAII guard that saves the current threshold on construction and restores
/// it on drop.
///
/// Only compiled in test builds.  Prevents one test from leaking a modified
/// threshold value into the next.
///
/// ```rust,ignore
/// let _guard = crate::solver::ThresholdGuard::save(50);
/// // threshold is now 50 …
/// // … and is automatically restored when _guard is dropped.
/// ```
#[cfg(test)]
pub(crate) struct ThresholdGuard {
    previous: usize,
}

#[cfg(test)]
impl ThresholdGuard {
    /// Set the threshold to `new_value` and return a guard that will
    /// restore the previous value on drop.
    pub(crate) fn save(new_value: usize) -> Self {
        let previous = parallel_threshold();
        set_parallel_threshold(new_value);
        Self { previous }
    }
}

#[cfg(test)]
impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        PARALLEL_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use traits::{SimulationResult, Solver, SolverConfiguration, SolverType};

pub use scenario::Scenario;

pub use methods::{EulerSolver, RK4Solver};

// =================================================================================================
// Helper Functions
// =================================================================================================

use nalgebra::DVector;

/// Validate a state for numerical issues
///
/// # Arguments
///
/// * `state` - State to validate
/// * `step` - Internal step count (for error reporting)
///
/// # Returns
///
/// `Ok(())` if every entry is finite, `Err(msg)` with diagnostic information
/// otherwise
pub(crate) fn validate_state(state: &DVector<f64>, step: usize) -> Result<(), String> {
    // NaN can arise from 0/0, Inf - Inf, or other undefined operations
    if let Some(index) = state.iter().position(|x| x.is_nan()) {
        return Err(format!(
            "NaN detected at state index {} after step {}. This indicates numerical instability. \
             Try more internal steps.",
            index, step
        ));
    }

    if let Some(index) = state.iter().position(|x| x.is_infinite()) {
        return Err(format!(
            "Infinity detected at state index {} after step {}. This indicates numerical overflow. \
             Try more internal steps.",
            index, step
        ));
    }

    Ok(())
}

// =================================================================================================
// Tests
// =================================================================================================
