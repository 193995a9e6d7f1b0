//! Numerical validation of analytic gradients by central differences.

use num_traits::Float;

/// One failing coordinate of a [gradient_check] run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientMismatch<E> {
    pub coordinate: usize,
    pub analytic: E,
    pub numeric: E,
    pub relative_error: E,
}

/// The outcome of a [gradient_check] run: every coordinate whose
/// analytic gradient disagreed with the central-difference estimate.
/// A mismatch is diagnostic data, not a fatal error.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct GradientCheckReport<E> {
    pub mismatches: Vec<GradientMismatch<E>>,
}

impl<E> GradientCheckReport<E> {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl<E: std::fmt::Display> std::fmt::Display for GradientCheckReport<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed() {
            return write!(f, "gradient check passed");
        }
        for m in &self.mismatches {
            writeln!(
                f,
                "gradient check at {} failed: analytic {} vs numeric {} (error {})",
                m.coordinate, m.analytic, m.numeric, m.relative_error
            )?;
        }
        Ok(())
    }
}

/// Compares `f`'s analytic gradient against central-difference estimates
/// at `point`.
///
/// `f` computes a scalar value at a point and writes the gradient at
/// that point through its second argument; the analytic gradient is
/// taken from a single evaluation at `point`. Each coordinate is then
/// perturbed by `-epsilon` and `+epsilon` (and restored afterwards, so
/// perturbations never accumulate), giving the estimate
/// `(f(x+eps) - f(x-eps)) / (2*eps)`. A coordinate fails when
///
/// `|numeric - analytic| / max(1, |numeric|, |analytic|) > epsilon * 0.1`
///
/// Every failing coordinate is reported, not just the first.
///
/// ```rust
/// # use dualtensor::prelude::*;
/// let square = |x: &[f64], grad: &mut Vec<f64>| {
///     grad.clear();
///     grad.extend(x.iter().map(|&v| 2.0 * v));
///     x.iter().map(|&v| v * v).sum()
/// };
/// assert!(gradient_check(square, &[1.5, -2.0], 1e-4).passed());
/// ```
pub fn gradient_check<E: Float + std::fmt::Debug, F>(
    mut f: F,
    point: &[E],
    epsilon: E,
) -> GradientCheckReport<E>
where
    F: FnMut(&[E], &mut Vec<E>) -> E,
{
    debug_assert!(epsilon > E::zero());

    let mut x = point.to_vec();
    let mut analytic = Vec::new();
    f(&x, &mut analytic);
    assert_eq!(
        analytic.len(),
        x.len(),
        "gradient length does not match point length"
    );

    let two = E::one() + E::one();
    let threshold = epsilon * E::from(0.1).unwrap();
    let mut scratch = Vec::new();
    let mut mismatches = Vec::new();

    for i in 0..x.len() {
        let original = x[i];
        x[i] = original - epsilon;
        let value_minus = f(&x, &mut scratch);
        x[i] = original + epsilon;
        let value_plus = f(&x, &mut scratch);
        x[i] = original;

        let numeric = (value_plus - value_minus) / (two * epsilon);
        let denominator = E::one().max(numeric.abs().max(analytic[i].abs()));
        let relative_error = (numeric - analytic[i]).abs() / denominator;
        if relative_error > threshold {
            tracing::warn!(
                coordinate = i,
                analytic = ?analytic[i],
                numeric = ?numeric,
                "gradient check failed"
            );
            mismatches.push(GradientMismatch {
                coordinate: i,
                analytic: analytic[i],
                numeric,
                relative_error,
            });
        }
    }

    GradientCheckReport { mismatches }
}
