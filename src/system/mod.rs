//! ODE systems
//!
//! This module defines the seam between a right-hand side and the numerical
//! methods that integrate it.
//!
//! # Architecture
//!
//! Systems are **separate from numerical solvers**:
//! - The system provides the **equations** `dy/dt = f(y, t)`
//! - The solver provides the **method** to integrate them
//!
//! The compiled [`Assembly`](crate::network::Assembly) of a cell network is
//! one such system; any closure-free struct implementing [`OdeSystem`] can be
//! handed to the same solvers.
//!
//! # Implementing a New System
//!
//! ```rust
//! use cellnet_rs::system::OdeSystem;
//! use nalgebra::DVector;
//!
//! struct Decay {
//!     rate: f64,
//! }
//!
//! impl OdeSystem for Decay {
//!     fn dimension(&self) -> usize {
//!         1
//!     }
//!
//!     fn derivative(&self, state: &DVector<f64>, _t: f64) -> DVector<f64> {
//!         state * -self.rate
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Decay"
//!     }
//! }
//!
//! let system = Decay { rate: 0.5 };
//! let dy = system.derivative(&DVector::from_vec(vec![2.0]), 0.0);
//! assert_eq!(dy[0], -1.0);
//! ```

pub mod traits;

pub use traits::OdeSystem;
