//! Helper functions for integration tests

use approx::abs_diff_eq;
use nalgebra::DVector;

/// Assert that a vector matches the expected values (within tolerance)
pub fn assert_vector_close(actual: &DVector<f64>, expected: &[f64], tolerance: f64, message: &str) {
    assert_eq!(actual.len(), expected.len(), "{}: Dimension mismatch", message);

    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            abs_diff_eq!(a, e, epsilon = tolerance),
            "{}: Element {} is {} but expected {} (tolerance {})",
            message,
            i,
            a,
            e,
            tolerance
        );
    }
}

/// Compute relative error |a - b| / |b|
pub fn relative_error(computed: f64, exact: f64) -> f64 {
    if exact.abs() < 1e-15 {
        computed.abs()
    } else {
        (computed - exact).abs() / exact.abs()
    }
}
