//! Reaction term library
//!
//! Stateless, parameterized rate laws used by edges, node degradation,
//! modifiers and interactions.
//!
//! # Elementwise rate laws
//!
//! | Identifier     | Kind                   | Parameters     | Formula                                   |
//! |----------------|------------------------|----------------|-------------------------------------------|
//! | `const_prod`   | Constant production    | `[C]`          | $C$                                       |
//! | `lin_activ`    | Linear activation      | `[C]`          | $C \cdot x$                               |
//! | `hill_activ`   | Hill activation        | `[C, A, n]`    | $C \cdot h(x)$                            |
//! | `hill_inactiv` | Hill inactivation      | `[D, C, A, n]` | $D - C \cdot h(x)$                        |
//! | `linear`       | Linear degradation     | `[C]`          | $-C \cdot x$                              |
//! | `parabolic`    | Parabolic degradation  | `[C]`          | $-C \cdot x^2$                            |
//!
//! with the Hill fraction $h(x) = (x/A)^n / (1 + (x/A)^n)$.
//!
//! # Coupling term
//!
//! | Identifier  | Parameters | Formula                                                     |
//! |-------------|------------|-------------------------------------------------------------|
//! | `diffusion` | `[C]`      | $C \sum_j w_{ij} (x_j - x_i)$, $w_{ij} = m_{ij} / d_{ij}^2$ |
//!
//! where $m_{ij}$ is the connectivity mask. Self pairs and coincident cells
//! carry a zero weight (see [`crate::network::interaction`]).
//!
//! # Numeric domain
//!
//! Every law returns a finite value for any finite input, including the
//! negative trial concentrations an adaptive stepper may probe. Hill terms
//! follow the formula wherever it is finite, read the input as zero where it
//! is not, and saturate when $(x/A)^n$ overflows.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::error::{NetworkError, NetworkResult};

// =================================================================================================
// Kinds
// =================================================================================================

/// Closed set of reaction term kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// `const_prod`: constant source
    ConstantProduction,
    /// `lin_activ`: proportional to the source
    LinearActivation,
    /// `hill_activ`: saturating increasing response
    HillActivation,
    /// `hill_inactiv`: saturating decreasing response
    HillInactivation,
    /// `linear`: first-order decay (node degradation only)
    LinearDegradation,
    /// `parabolic`: second-order decay (node degradation only)
    ParabolicDegradation,
    /// `diffusion`: distance-weighted exchange between cells (interactions only)
    Diffusion,
}

impl TermKind {
    /// Every kind, in identifier-table order
    pub const ALL: [TermKind; 7] = [
        TermKind::ConstantProduction,
        TermKind::LinearActivation,
        TermKind::HillActivation,
        TermKind::HillInactivation,
        TermKind::LinearDegradation,
        TermKind::ParabolicDegradation,
        TermKind::Diffusion,
    ];

    /// External identifier of the kind
    pub fn identifier(&self) -> &'static str {
        match self {
            TermKind::ConstantProduction => "const_prod",
            TermKind::LinearActivation => "lin_activ",
            TermKind::HillActivation => "hill_activ",
            TermKind::HillInactivation => "hill_inactiv",
            TermKind::LinearDegradation => "linear",
            TermKind::ParabolicDegradation => "parabolic",
            TermKind::Diffusion => "diffusion",
        }
    }

    /// Fixed number of parameters the kind expects
    pub fn num_params(&self) -> usize {
        match self {
            TermKind::HillActivation => 3,
            TermKind::HillInactivation => 4,
            _ => 1,
        }
    }

    /// Degradation kinds may only be attached to nodes
    pub fn is_degradation(&self) -> bool {
        matches!(self, TermKind::LinearDegradation | TermKind::ParabolicDegradation)
    }

    /// Coupling kinds need the state of every cell and may only be interactions
    pub fn is_coupling(&self) -> bool {
        matches!(self, TermKind::Diffusion)
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for TermKind {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TermKind::ALL
            .into_iter()
            .find(|kind| kind.identifier() == s)
            .ok_or_else(|| NetworkError::UnknownKind(s.to_string()))
    }
}

/// How a modifier edge acts on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierType {
    /// `intern`: scales the target's input before its term is evaluated
    Internal,
    /// `mult`: scales the target's output after its term is evaluated
    Multiplicative,
}

impl ModifierType {
    /// External identifier of the modifier type
    pub fn identifier(&self) -> &'static str {
        match self {
            ModifierType::Internal => "intern",
            ModifierType::Multiplicative => "mult",
        }
    }
}

impl fmt::Display for ModifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ModifierType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intern" => Ok(ModifierType::Internal),
            "mult" => Ok(ModifierType::Multiplicative),
            other => Err(NetworkError::UnknownKind(other.to_string())),
        }
    }
}

// =================================================================================================
// Rate laws
// =================================================================================================

/// Elementwise rate law with concrete parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLaw {
    ConstantProduction { c: f64 },
    LinearActivation { c: f64 },
    HillActivation { c: f64, a: f64, n: f64 },
    HillInactivation { d: f64, c: f64, a: f64, n: f64 },
    LinearDegradation { c: f64 },
    ParabolicDegradation { c: f64 },
}

impl RateLaw {
    /// Evaluates the law at a single concentration
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        match *self {
            RateLaw::ConstantProduction { c } => c,
            RateLaw::LinearActivation { c } => c * x,
            RateLaw::HillActivation { c, a, n } => c * hill_fraction(x, a, n),
            RateLaw::HillInactivation { d, c, a, n } => d - c * hill_fraction(x, a, n),
            RateLaw::LinearDegradation { c } => -c * x,
            RateLaw::ParabolicDegradation { c } => -c * x * x,
        }
    }

    /// Evaluates the law elementwise; the input is left untouched
    pub fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        x.map(|value| self.evaluate(value))
    }
}

/// Hill fraction $(x/A)^n / (1 + (x/A)^n)$, finite for every input
///
/// The formula is used as is wherever it is finite, including negative `x`
/// with an even integer `n`. Where it is not (a negative base with a
/// fractional `n`, or $(x/A)^n = -1$), `x` is read as zero.
#[inline]
fn hill_fraction(x: f64, a: f64, n: f64) -> f64 {
    let ratio = x / a;
    let fraction = saturated_fraction(ratio.powf(n));
    if fraction.is_finite() {
        fraction
    } else {
        saturated_fraction(ratio.max(0.0).powf(n))
    }
}

/// $p / (1 + p)$ with its limit 1 when $p$ overflows
#[inline]
fn saturated_fraction(powered: f64) -> f64 {
    if powered.is_infinite() {
        1.0
    } else {
        powered / (1.0 + powered)
    }
}

/// Distance-weighted exchange for the cells of one group
///
/// * `rate` - prefactor $C$
/// * `x` - working matrix `[group_cells × total_cells]`; row `r` holds the
///   source values seen by the `r`-th cell of the group
/// * `bounds` - `(lower, upper)` column range of the evaluating group
/// * `weights` - `[total_cells × total_cells]` masked inverse squared distances
///
/// Columns holding the not-available sentinel (`NaN`) are skipped; a cell
/// whose own value is not available receives zero.
pub fn diffusion(
    rate: f64,
    x: &DMatrix<f64>,
    bounds: (usize, usize),
    weights: &DMatrix<f64>,
) -> DVector<f64> {
    let (lower, upper) = bounds;
    debug_assert_eq!(x.nrows(), upper - lower, "one working row per evaluating cell");

    DVector::from_fn(upper - lower, |row, _| {
        let cell = lower + row;
        let own = x[(row, cell)];
        if own.is_nan() {
            return 0.0;
        }
        let flux: f64 = (0..x.ncols())
            .map(|j| (weights[(cell, j)], x[(row, j)]))
            .filter(|&(w, neighbour)| w != 0.0 && !neighbour.is_nan())
            .map(|(w, neighbour)| w * (neighbour - own))
            .sum();
        rate * flux
    })
}

// =================================================================================================
// Parameters
// =================================================================================================

/// Validated parameter set of a term
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TermParams {
    /// Parameters of an elementwise kind
    Elementwise(RateLaw),
    /// Prefactor of a diffusion coupling
    Diffusion { c: f64 },
}

impl TermParams {
    /// Validates `params` against the fixed layout of `kind`
    pub fn new(kind: TermKind, params: &[f64]) -> NetworkResult<Self> {
        if params.len() != kind.num_params() {
            return Err(NetworkError::invalid_parameters(
                kind,
                format!("expected {} parameter(s), got {}", kind.num_params(), params.len()),
            ));
        }
        if let Some(bad) = params.iter().find(|p| !p.is_finite()) {
            return Err(NetworkError::invalid_parameters(
                kind,
                format!("parameter {bad} is not finite"),
            ));
        }

        let law = match kind {
            TermKind::ConstantProduction => RateLaw::ConstantProduction { c: params[0] },
            TermKind::LinearActivation => RateLaw::LinearActivation { c: params[0] },
            TermKind::HillActivation => RateLaw::HillActivation {
                c: params[0],
                a: positive_threshold(kind, params[1])?,
                n: params[2],
            },
            TermKind::HillInactivation => RateLaw::HillInactivation {
                d: params[0],
                c: params[1],
                a: positive_threshold(kind, params[2])?,
                n: params[3],
            },
            TermKind::LinearDegradation => RateLaw::LinearDegradation { c: params[0] },
            TermKind::ParabolicDegradation => RateLaw::ParabolicDegradation { c: params[0] },
            TermKind::Diffusion => return Ok(TermParams::Diffusion { c: params[0] }),
        };
        Ok(TermParams::Elementwise(law))
    }
}

fn positive_threshold(kind: TermKind, a: f64) -> NetworkResult<f64> {
    if a > 0.0 {
        Ok(a)
    } else {
        Err(NetworkError::invalid_parameters(
            kind,
            format!("half-saturation A must be > 0, got {a}"),
        ))
    }
}

// =================================================================================================
// Reaction term
// =================================================================================================

/// A term kind, its (possibly not yet set) parameters and its modifier role
///
/// # Example
///
/// ```rust
/// use cellnet_rs::network::{ReactionTerm, TermKind, ModifierType};
/// use nalgebra::DVector;
///
/// let mut term = ReactionTerm::new(TermKind::HillActivation);
/// assert!(!term.params_set());
///
/// term.set_params(&[2.0, 1.0, 4.0]).unwrap();
/// let out = term.apply(&DVector::from_vec(vec![1.0])).unwrap();
/// assert_eq!(out[0], 1.0);
///
/// let modifier = ReactionTerm::modifier(TermKind::HillInactivation, ModifierType::Multiplicative);
/// assert!(modifier.is_modifier());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTerm {
    kind: TermKind,
    params: Option<TermParams>,
    modifier: Option<ModifierType>,
}

impl ReactionTerm {
    /// Plain term with unset parameters
    pub fn new(kind: TermKind) -> Self {
        Self {
            kind,
            params: None,
            modifier: None,
        }
    }

    /// Modifier term with unset parameters
    pub fn modifier(kind: TermKind, modifier_type: ModifierType) -> Self {
        Self {
            kind,
            params: None,
            modifier: Some(modifier_type),
        }
    }

    /// Plain term with parameters set
    pub fn with_params(kind: TermKind, params: &[f64]) -> NetworkResult<Self> {
        let mut term = Self::new(kind);
        term.set_params(params)?;
        Ok(term)
    }

    /// Modifier term with parameters set
    pub fn modifier_with_params(
        kind: TermKind,
        modifier_type: ModifierType,
        params: &[f64],
    ) -> NetworkResult<Self> {
        let mut term = Self::modifier(kind, modifier_type);
        term.set_params(params)?;
        Ok(term)
    }

    /// Builds a term from its external identifiers
    ///
    /// `modifier_type` is `None` for plain terms, `Some("intern")` or
    /// `Some("mult")` for modifiers.
    pub fn from_identifiers(
        kind: &str,
        modifier_type: Option<&str>,
        params: Option<&[f64]>,
    ) -> NetworkResult<Self> {
        let kind: TermKind = kind.parse()?;
        let mut term = match modifier_type {
            Some(m) => Self::modifier(kind, m.parse()?),
            None => Self::new(kind),
        };
        if let Some(p) = params {
            term.set_params(p)?;
        }
        Ok(term)
    }

    /// Validates and stores the parameters
    pub fn set_params(&mut self, params: &[f64]) -> NetworkResult<()> {
        self.params = Some(TermParams::new(self.kind, params)?);
        Ok(())
    }

    pub fn kind(&self) -> TermKind {
        self.kind
    }

    pub fn params(&self) -> Option<&TermParams> {
        self.params.as_ref()
    }

    pub fn params_set(&self) -> bool {
        self.params.is_some()
    }

    pub fn is_modifier(&self) -> bool {
        self.modifier.is_some()
    }

    pub fn modifier_type(&self) -> Option<ModifierType> {
        self.modifier
    }

    /// Elementwise application
    ///
    /// Fails when parameters are unset, or for coupling kinds, which need
    /// [`apply_coupled`](Self::apply_coupled).
    pub fn apply(&self, x: &DVector<f64>) -> NetworkResult<DVector<f64>> {
        match self.params {
            None => Err(NetworkError::ParametersUnset(self.kind.to_string())),
            Some(TermParams::Elementwise(law)) => Ok(law.apply(x)),
            Some(TermParams::Diffusion { .. }) => Err(NetworkError::config(format!(
                "{} is a coupling term and needs the state of every cell",
                self.kind
            ))),
        }
    }

    /// Application over a working matrix `[group_cells × total_cells]`
    ///
    /// Coupling kinds use the whole row; elementwise kinds read each
    /// evaluating cell's own column.
    pub fn apply_coupled(
        &self,
        x: &DMatrix<f64>,
        bounds: (usize, usize),
        weights: &DMatrix<f64>,
    ) -> NetworkResult<DVector<f64>> {
        match self.params {
            None => Err(NetworkError::ParametersUnset(self.kind.to_string())),
            Some(TermParams::Diffusion { c }) => Ok(diffusion(c, x, bounds, weights)),
            Some(TermParams::Elementwise(law)) => Ok(own_values(x, bounds.0).map(|v| {
                if v.is_nan() { 0.0 } else { law.evaluate(v) }
            })),
        }
    }
}

/// Diagonal of the working matrix restricted to the group's columns
pub(crate) fn own_values(x: &DMatrix<f64>, lower: usize) -> DVector<f64> {
    DVector::from_fn(x.nrows(), |row, _| x[(row, lower + row)])
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn term(kind: TermKind, params: &[f64]) -> ReactionTerm {
        ReactionTerm::with_params(kind, params).unwrap()
    }

    fn sample_params(kind: TermKind) -> Vec<f64> {
        match kind {
            TermKind::HillActivation => vec![2.0, 0.5, 3.0],
            TermKind::HillInactivation => vec![1.0, 2.0, 0.5, 3.0],
            _ => vec![1.5],
        }
    }

    #[test]
    fn test_identifiers_round_trip() {
        for kind in TermKind::ALL {
            assert_eq!(kind.identifier().parse::<TermKind>().unwrap(), kind);
        }
        assert_eq!("intern".parse::<ModifierType>().unwrap(), ModifierType::Internal);
        assert_eq!("mult".parse::<ModifierType>().unwrap(), ModifierType::Multiplicative);
    }

    #[test]
    fn test_unknown_identifier_fails() {
        assert_eq!(
            "michaelis".parse::<TermKind>(),
            Err(NetworkError::UnknownKind("michaelis".to_string()))
        );
        assert!("additive".parse::<ModifierType>().is_err());
        assert!(ReactionTerm::from_identifiers("hill_activ", Some("both"), None).is_err());
    }

    #[test]
    fn test_parameter_count_is_validated() {
        let mut hill = ReactionTerm::new(TermKind::HillActivation);
        let error = hill.set_params(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(error, NetworkError::InvalidParameters { .. }));
        assert!(!hill.params_set());

        assert!(ReactionTerm::with_params(TermKind::HillInactivation, &[1.0, 1.0, 1.0, 2.0]).is_ok());
        assert!(ReactionTerm::with_params(TermKind::ConstantProduction, &[]).is_err());
    }

    #[test]
    fn test_non_finite_and_zero_threshold_rejected() {
        assert!(ReactionTerm::with_params(TermKind::LinearActivation, &[f64::NAN]).is_err());
        assert!(ReactionTerm::with_params(TermKind::HillActivation, &[1.0, 0.0, 2.0]).is_err());
    }

    #[test]
    fn test_apply_before_params_is_configuration_error() {
        let hill = ReactionTerm::new(TermKind::HillActivation);
        let error = hill.apply(&DVector::from_vec(vec![1.0])).unwrap_err();
        assert_eq!(error, NetworkError::ParametersUnset("hill_activ".to_string()));
    }

    #[test]
    fn test_zero_length_input_preserved() {
        let empty = DVector::<f64>::zeros(0);
        for kind in TermKind::ALL.into_iter().filter(|k| !k.is_coupling()) {
            let out = term(kind, &sample_params(kind)).apply(&empty).unwrap();
            assert_eq!(out.len(), 0, "{kind}");
        }

        let diffusion = term(TermKind::Diffusion, &[1.0]);
        let out = diffusion
            .apply_coupled(&DMatrix::zeros(0, 0), (0, 0), &DMatrix::zeros(0, 0))
            .unwrap();
        assert_eq!(out.len(), 0);
    }

    #[test]
    fn test_hill_activation_half_maximum_at_threshold() {
        for n in [0.5, 1.0, 2.0, 4.0, 8.0] {
            let hill = term(TermKind::HillActivation, &[3.0, 0.65, n]);
            let out = hill.apply(&DVector::from_vec(vec![0.65])).unwrap();
            assert_eq!(out[0], 1.5);
        }
    }

    #[test]
    fn test_hill_inactivation_decreases() {
        let hill = term(TermKind::HillInactivation, &[1.0, 1.0, 0.5, 4.0]);
        let out = hill.apply(&DVector::from_vec(vec![0.0, 0.5, 100.0])).unwrap();
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 0.5);
        assert!(out[2] < 1e-6);
    }

    #[test]
    fn test_elementwise_formulas() {
        let x = DVector::from_vec(vec![-1.0, 0.0, 2.0]);

        let constant = term(TermKind::ConstantProduction, &[2.0]).apply(&x).unwrap();
        assert_eq!(constant, DVector::from_vec(vec![2.0, 2.0, 2.0]));

        let linear = term(TermKind::LinearActivation, &[3.0]).apply(&x).unwrap();
        assert_eq!(linear, DVector::from_vec(vec![-3.0, 0.0, 6.0]));

        let decay = term(TermKind::LinearDegradation, &[0.5]).apply(&x).unwrap();
        assert_eq!(decay, DVector::from_vec(vec![0.5, -0.0, -1.0]));

        let parabolic = term(TermKind::ParabolicDegradation, &[2.0]).apply(&x).unwrap();
        assert_eq!(parabolic, DVector::from_vec(vec![-2.0, -0.0, -8.0]));
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let copy = x.clone();
        let _ = term(TermKind::ParabolicDegradation, &[1.0]).apply(&x).unwrap();
        assert_eq!(x, copy);
    }

    #[test]
    fn test_hill_terms_finite_for_any_real_input() {
        let probes = DVector::from_vec(vec![-1e300, -3.0, -0.0, 0.0, 1e-300, 1e300, f64::MAX]);
        for params in [[1.0, 0.5, 2.5], [1.0, 0.5, -2.0], [1.0, 1e-10, 400.0]] {
            let out = term(TermKind::HillActivation, &params).apply(&probes).unwrap();
            assert!(out.iter().all(|v| v.is_finite()), "{params:?} -> {out}");
        }
        let out = term(TermKind::HillInactivation, &[1.0, 1.0, 0.3, 3.7])
            .apply(&probes)
            .unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_hill_follows_formula_for_negative_input() {
        // (-1)^2 = 1, so h = 1/2
        let even = term(TermKind::HillActivation, &[2.0, 1.0, 2.0]);
        let out = even.apply(&DVector::from_vec(vec![-1.0, -3.0])).unwrap();
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 2.0 * 9.0 / 10.0);

        // (-1)^1 = -1 makes the denominator vanish; (-2)^2.5 is not real
        let odd = term(TermKind::HillActivation, &[2.0, 1.0, 1.0]);
        assert_eq!(odd.apply(&DVector::from_vec(vec![-1.0])).unwrap()[0], 0.0);
        let fractional = term(TermKind::HillInactivation, &[1.0, 2.0, 1.0, 2.5]);
        assert_eq!(fractional.apply(&DVector::from_vec(vec![-2.0])).unwrap()[0], 1.0);
    }

    #[test]
    fn test_diffusion_two_cells() {
        let weights = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);
        let out = diffusion(1.0, &x, (0, 2), &weights);
        assert_eq!(out, DVector::from_vec(vec![-1.0, 1.0]));
    }

    #[test]
    fn test_diffusion_skips_unavailable_values() {
        let weights = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        // Group spans cells 1..3, cell 0 belongs to a model without the species
        let x = DMatrix::from_row_slice(2, 3, &[f64::NAN, 2.0, 4.0, f64::NAN, 2.0, 4.0]);
        let out = diffusion(0.5, &x, (1, 3), &weights);
        assert_eq!(out, DVector::from_vec(vec![1.0, -1.0]));
    }

    #[test]
    fn test_elementwise_interaction_reads_own_column() {
        let lin = term(TermKind::LinearActivation, &[2.0]);
        let x = DMatrix::from_row_slice(2, 3, &[9.0, 1.0, 5.0, 9.0, 1.0, 5.0]);
        let out = lin.apply_coupled(&x, (1, 3), &DMatrix::zeros(3, 3)).unwrap();
        assert_eq!(out, DVector::from_vec(vec![2.0, 10.0]));
    }

    #[test]
    fn test_diffusion_not_elementwise() {
        let diffusion = term(TermKind::Diffusion, &[1.0]);
        assert!(matches!(
            diffusion.apply(&DVector::from_vec(vec![1.0])),
            Err(NetworkError::Configuration(_))
        ));
    }
}
