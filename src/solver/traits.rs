//! Numerical solver traits and types
//!
//! # Design Philosophy
//!
//! - Central enum `SolverType` defines how output times are chosen
//! - `SolverConfiguration` wraps a `SolverType`
//! - `SimulationResult` holds the trajectory on the output grid plus metadata
//!
//! Every solver returns `Result<_, String>`; callers with a richer error type
//! wrap the message.

use std::collections::HashMap;

use nalgebra::DVector;
use ndarray::Array2;

use crate::solver::Scenario;

// =================================================================================================
// Solver Type
// =================================================================================================

/// How the output time grid is defined
///
/// # Examples
///
/// ```rust
/// use cellnet_rs::solver::SolverType;
///
/// // Uniform grid 0, 0.1, ..., 10
/// let uniform = SolverType::TimeEvolution {
///     total_time: 10.0,
///     time_steps: 100,
/// };
/// assert!(uniform.validate().is_ok());
///
/// // Caller-provided grid, 20 internal steps per interval
/// let explicit = SolverType::TimePoints {
///     points: vec![0.0, 0.5, 2.0],
///     substeps: 20,
/// };
/// assert_eq!(explicit.output_times(), vec![0.0, 0.5, 2.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum SolverType {
    /// Uniform output grid from 0, one internal step per interval
    ///
    /// # Parameters
    /// - `total_time`: Final time
    /// - `time_steps`: Number of intervals
    TimeEvolution { total_time: f64, time_steps: usize },

    /// Caller-provided output grid, each interval split into `substeps`
    /// equal internal steps
    ///
    /// The initial state is taken to hold at `points[0]`.
    TimePoints { points: Vec<f64>, substeps: usize },
}

impl SolverType {
    /// Get name identifier
    pub fn name(&self) -> &str {
        match self {
            SolverType::TimeEvolution { .. } => "TimeEvolution",
            SolverType::TimePoints { .. } => "TimePoints",
        }
    }

    /// Validate that parameters are meaningful
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SolverType::TimeEvolution {
                total_time,
                time_steps,
            } => {
                if !total_time.is_finite() || *total_time <= 0.0 {
                    return Err("Total time must be positive".to_string());
                }
                if *time_steps == 0 {
                    return Err("TimeSteps must be greater than 0".to_string());
                }
                Ok(())
            }
            SolverType::TimePoints { points, substeps } => {
                if points.is_empty() {
                    return Err("At least one time point is required".to_string());
                }
                if let Some(bad) = points.iter().find(|t| !t.is_finite()) {
                    return Err(format!("Time point {} is not finite", bad));
                }
                if let Some(pair) = points.windows(2).find(|w| w[1] <= w[0]) {
                    return Err(format!(
                        "Time points must be strictly increasing ({} then {})",
                        pair[0], pair[1]
                    ));
                }
                if *substeps == 0 {
                    return Err("Substeps must be greater than 0".to_string());
                }
                Ok(())
            }
        }
    }

    /// Output grid
    ///
    /// Uniform points are computed from their index, not accumulated, so the
    /// last point is `total_time` within machine precision.
    pub fn output_times(&self) -> Vec<f64> {
        match self {
            SolverType::TimeEvolution {
                total_time,
                time_steps,
            } => {
                let dt = total_time / (*time_steps as f64);
                (0..=*time_steps).map(|step| step as f64 * dt).collect()
            }
            SolverType::TimePoints { points, .. } => points.clone(),
        }
    }

    /// Internal steps per output interval
    pub fn substeps(&self) -> usize {
        match self {
            SolverType::TimeEvolution { .. } => 1,
            SolverType::TimePoints { substeps, .. } => *substeps,
        }
    }
}

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Configuration for a numerical solver
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfiguration {
    /// Type of solver and its parameters
    pub solver_type: SolverType,
}

impl SolverConfiguration {
    /// Create a new configuration with a given solver type
    pub fn new(solver_type: SolverType) -> Self {
        Self { solver_type }
    }

    /// Create a uniform time evolution configuration
    pub fn time_evolution(total_time: f64, time_steps: usize) -> Self {
        Self::new(SolverType::TimeEvolution {
            total_time,
            time_steps,
        })
    }

    /// Create a configuration on caller-provided output times
    pub fn time_points(points: Vec<f64>, substeps: usize) -> Self {
        Self::new(SolverType::TimePoints { points, substeps })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.solver_type.validate()
    }

    pub fn output_times(&self) -> Vec<f64> {
        self.solver_type.output_times()
    }

    pub fn substeps(&self) -> usize {
        self.solver_type.substeps()
    }
}

// =================================================================================================
// Simulation result
// =================================================================================================

/// Trajectory on the output grid
#[derive(Clone, Debug)]
pub struct SimulationResult {
    /// Output times
    pub time_points: Vec<f64>,

    /// `(time × state)` matrix, row `i` is the state at `time_points[i]`
    pub trajectory: Array2<f64>,

    /// State at the last output time
    pub final_state: DVector<f64>,

    /// Free-form solver information (method, steps, ...)
    pub metadata: HashMap<String, String>,
}

impl SimulationResult {
    /// Builds a result from one state per output time
    pub fn new(time_points: Vec<f64>, states: &[DVector<f64>], final_state: DVector<f64>) -> Self {
        let dimension = final_state.len();
        let trajectory = Array2::from_shape_fn((states.len(), dimension), |(i, j)| states[i][j]);
        Self {
            time_points,
            trajectory,
            final_state,
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Number of recorded time points
    pub fn len(&self) -> usize {
        self.time_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_points.is_empty()
    }

    /// State at output index `index`
    pub fn state_at(&self, index: usize) -> Option<DVector<f64>> {
        (index < self.trajectory.nrows())
            .then(|| DVector::from_iterator(self.trajectory.ncols(), self.trajectory.row(index).iter().copied()))
    }
}

// =================================================================================================
// Solver trait
// =================================================================================================

/// Trait for numerical solvers
///
/// # Responsibility
/// Integrates the system of a [`Scenario`] over the output grid of a
/// [`SolverConfiguration`]. Does NOT define the equations (that's the
/// system's job).
pub trait Solver {
    /// Solve the scenario with the given configuration
    fn solve(
        &self,
        scenario: &Scenario,
        config: &SolverConfiguration,
    ) -> Result<SimulationResult, String>;

    /// Name of the method (used to display and logging)
    fn name(&self) -> &str;
}

// =================================================================================================
// Tests
// =================================================================================================
