//! Forward Euler numerical solver
//!
//! # Mathematical Background
//!
//! The Forward Euler method is the simplest explicit time-stepping scheme
//! for solving ordinary differential equations (ODEs):
//!
//! ```text
//! dy/dt = f(y, t)
//! y_{n+1} = y_n + dt * f(y_n, t_n)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: First-order accurate (error ~ O(dt))
//! - **Stability**: Conditionally stable (requires small time steps)
//! - **Complexity**: 1 function evaluation per step
//!
//! Fast reaction terms (steep Hill functions, strong degradation) make cell
//! networks stiff; Euler then needs many substeps. Prefer [`RK4Solver`]
//! for production runs.
//!
//! [`RK4Solver`]: crate::solver::RK4Solver

use crate::solver::methods::march;
use crate::solver::{Scenario, SimulationResult, Solver, SolverConfiguration};

// =================================================================================================
// Forward Euler Solver
// =================================================================================================

/// Forward Euler time-stepping solver
///
/// # Stability
///
/// For linear problems dy/dt = λy, the stability condition is:
///
/// ```text
/// |1 + λ * dt| ≤ 1
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerSolver;

impl EulerSolver {
    /// Create a new Forward Euler solver
    ///
    /// # Example
    ///
    /// ```rust
    /// use cellnet_rs::solver::{EulerSolver, Solver};
    ///
    /// let solver = EulerSolver::new();
    /// assert_eq!(solver.name(), "Forward Euler");
    /// ```
    pub fn new() -> Self {
        Self
    }
}

impl Solver for EulerSolver {
    fn solve(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> Result<SimulationResult, String> {
        // ====== Step 1: Integration ======

        let system = scenario.system.as_ref();
        let (time_points, states, steps) = march(scenario, config, |state, t, dt| {
            state + system.derivative(state, t) * dt
        })?;

        // ====== Step 2: Build Result ======

        let final_state = states
            .last()
            .cloned()
            .ok_or_else(|| "Integration produced no state".to_string())?;
        let mut result = SimulationResult::new(time_points, &states, final_state);

        result.add_metadata("solver", "Forward Euler");
        result.add_metadata("time steps", &steps.to_string());
        result.add_metadata("substeps", &config.substeps().to_string());
        result.add_metadata("function evaluations", &steps.to_string());

        Ok(result)
    }

    fn name(&self) -> &str {
        "Forward Euler"
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::OdeSystem;
    use nalgebra::DVector;

    // ====== Mock Systems for Testing ======

    /// dy/dt = -k * y, y(t) = y_0 * exp(-k * t)
    struct ExponentialDecay {
        points: usize,
        decay_rate: f64,
    }

    impl OdeSystem for ExponentialDecay {
        fn dimension(&self) -> usize {
            self.points
        }

        fn derivative(&self, state: &DVector<f64>, _t: f64) -> DVector<f64> {
            state * -self.decay_rate
        }

        fn name(&self) -> &str {
            "Exponential Decay"
        }
    }

    /// dy/dt = c, y(t) = y_0 + c * t
    struct ConstantGrowth {
        points: usize,
        growth_rate: f64,
    }

    impl OdeSystem for ConstantGrowth {
        fn dimension(&self) -> usize {
            self.points
        }

        fn derivative(&self, _state: &DVector<f64>, _t: f64) -> DVector<f64> {
            DVector::from_element(self.points, self.growth_rate)
        }

        fn name(&self) -> &str {
            "Constant Growth"
        }
    }

    fn growth_scenario(points: usize, growth_rate: f64) -> Scenario {
        Scenario::new(
            Box::new(ConstantGrowth {
                points,
                growth_rate,
            }),
            DVector::zeros(points),
        )
    }

    fn decay_scenario(decay_rate: f64) -> Scenario {
        Scenario::new(
            Box::new(ExponentialDecay {
                points: 3,
                decay_rate,
            }),
            DVector::from_element(3, 1.0),
        )
    }

    // ====== Solver creation tests ======

    #[test]
    fn test_euler_solver_default() {
        let solver = EulerSolver::default();
        assert_eq!(solver.name(), "Forward Euler");
    }

    // ====== Configuration Tests ======

    #[test]
    fn test_euler_rejects_invalid_configuration() {
        let solver = EulerSolver::new();
        let scenario = growth_scenario(2, 1.0);

        assert!(solver
            .solve(&scenario, &SolverConfiguration::time_evolution(-1.0, 10))
            .is_err());
        assert!(solver
            .solve(&scenario, &SolverConfiguration::time_points(vec![1.0, 0.0], 1))
            .is_err());
    }

    #[test]
    fn test_euler_rejects_mismatched_initial_state() {
        let scenario = Scenario::new(
            Box::new(ConstantGrowth {
                points: 3,
                growth_rate: 1.0,
            }),
            DVector::zeros(2),
        );
        let result = EulerSolver::new().solve(&scenario, &SolverConfiguration::time_evolution(1.0, 1));
        assert!(result.is_err());
    }

    // ====== Numerical accuracy tests ======

    #[test]
    fn test_euler_constant_growth() {
        // Euler is exact for constant derivatives
        let result = EulerSolver::new()
            .solve(
                &growth_scenario(5, 2.0),
                &SolverConfiguration::time_evolution(10.0, 100),
            )
            .unwrap();

        for value in result.final_state.iter() {
            assert!((value - 20.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_euler_exponential_decay() {
        let decay_rate = 0.1;
        let total_time = 10.0;
        let result = EulerSolver::new()
            .solve(
                &decay_scenario(decay_rate),
                &SolverConfiguration::time_evolution(total_time, 1000),
            )
            .unwrap();

        let exact = (-decay_rate * total_time).exp();
        let relative_error = (result.final_state[0] - exact).abs() / exact;
        assert!(relative_error < 1e-3, "relative error {relative_error:e}");
    }

    #[test]
    fn test_euler_convergence() {
        // halving dt roughly halves the error
        let error = |steps: usize| {
            let result = EulerSolver::new()
                .solve(
                    &decay_scenario(1.0),
                    &SolverConfiguration::time_evolution(1.0, steps),
                )
                .unwrap();
            (result.final_state[0] - (-1.0f64).exp()).abs()
        };

        let ratio = error(100) / error(200);
        assert!((ratio - 2.0).abs() < 0.1, "ratio {ratio}");
    }

    // ====== Trajectory tests ======

    #[test]
    fn test_euler_trajectory_on_output_grid() {
        let config = SolverConfiguration::time_points(vec![0.0, 0.5, 2.0], 10);
        let result = EulerSolver::new()
            .solve(&growth_scenario(2, 1.0), &config)
            .unwrap();

        assert_eq!(result.time_points, vec![0.0, 0.5, 2.0]);
        assert_eq!(result.trajectory.shape(), &[3, 2]);
        assert!((result.trajectory[[1, 0]] - 0.5).abs() < 1e-12);
        assert!((result.trajectory[[2, 1]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_euler_single_time_point() {
        let config = SolverConfiguration::time_points(vec![3.0], 1);
        let result = EulerSolver::new()
            .solve(&growth_scenario(1, 1.0), &config)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.final_state[0], 0.0);
    }

    // ====== Metadata Tests ======

    #[test]
    fn test_euler_metadata() {
        let config = SolverConfiguration::time_points(vec![0.0, 1.0, 2.0], 5);
        let result = EulerSolver::new()
            .solve(&growth_scenario(1, 1.0), &config)
            .unwrap();

        assert_eq!(result.metadata.get("solver"), Some(&"Forward Euler".to_string()));
        assert_eq!(result.metadata.get("time steps"), Some(&"10".to_string()));
        assert_eq!(result.metadata.get("substeps"), Some(&"5".to_string()));
    }

    // ====== Validation Tests ======

    #[test]
    fn test_euler_detects_nan() {
        struct NaNSystem;

        impl OdeSystem for NaNSystem {
            fn dimension(&self) -> usize {
                1
            }

            fn derivative(&self, _state: &DVector<f64>, _t: f64) -> DVector<f64> {
                DVector::from_element(1, f64::NAN)
            }

            fn name(&self) -> &str {
                "NaN"
            }
        }

        let scenario = Scenario::new(Box::new(NaNSystem), DVector::zeros(1));
        let error = EulerSolver::new()
            .solve(&scenario, &SolverConfiguration::time_evolution(1.0, 10))
            .unwrap_err();
        assert!(error.contains("NaN detected"));
    }

    #[test]
    fn test_euler_detects_inf() {
        let scenario = Scenario::new(
            Box::new(ConstantGrowth {
                points: 1,
                growth_rate: f64::MAX,
            }),
            DVector::from_element(1, f64::MAX),
        );
        let error = EulerSolver::new()
            .solve(&scenario, &SolverConfiguration::time_evolution(10.0, 1))
            .unwrap_err();
        assert!(error.contains("Infinity detected"));
    }
}
