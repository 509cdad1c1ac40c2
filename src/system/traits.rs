//! ODE system trait

use nalgebra::DVector;

// =================================================================================================
// ODE System Trait
// =================================================================================================

/// Right-hand side of an explicit ODE system `dy/dt = f(y, t)`
///
/// # Responsibility
/// Evaluates the derivative at a given state and time.
/// Does NOT integrate it (that's the Solver's job).
///
/// # Contract
/// `derivative` must accept any finite real state of length
/// [`dimension`](Self::dimension), including states outside the physically
/// meaningful domain that a stepper may probe, and must not mutate shared
/// data: it is a pure function of `(state, t)`.
pub trait OdeSystem: Send + Sync {
    /// Length of the flat state vector
    fn dimension(&self) -> usize;

    /// Computes `f(state, t)`
    ///
    /// # Arguments
    /// * `state` - Flat state vector of length `dimension()`
    /// * `t` - Current time
    fn derivative(&self, state: &DVector<f64>, t: f64) -> DVector<f64>;

    /// Name of the system (used to display and logging)
    fn name(&self) -> &str;

    /// Description of the system (option)
    fn description(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rotation;

    impl OdeSystem for Rotation {
        fn dimension(&self) -> usize {
            2
        }

        fn derivative(&self, state: &DVector<f64>, _t: f64) -> DVector<f64> {
            DVector::from_vec(vec![-state[1], state[0]])
        }

        fn name(&self) -> &str {
            "Rotation"
        }
    }

    #[test]
    fn test_default_description_is_none() {
        assert!(Rotation.description().is_none());
    }

    #[test]
    fn test_trait_object_dispatch() {
        let system: Box<dyn OdeSystem> = Box::new(Rotation);
        let dy = system.derivative(&DVector::from_vec(vec![1.0, 0.0]), 0.0);
        assert_eq!(dy, DVector::from_vec(vec![0.0, 1.0]));
        assert_eq!(system.dimension(), 2);
    }
}
