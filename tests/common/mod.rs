//! Common utilities for integration tests

pub mod networks;
pub mod test_helpers;

// Re-export commonly used items
pub use networks::{diffusion_pair, full_connectivity, passive_model, production_decay, values};
pub use test_helpers::{assert_vector_close, relative_error};
