//! Accuracy check of a recovered solution

use crate::error::{Result, TiledLuError};
use crate::traits::Scalar;

/// Euclidean norm ‖x‖₂ = sqrt(Σ |xᵢ|²)
#[inline]
pub fn vector_norm<T: Scalar>(x: &[T]) -> f64 {
    vector_norm_sqr(x).sqrt()
}

/// Squared Euclidean norm, without the square root
#[inline]
pub fn vector_norm_sqr<T: Scalar>(x: &[T]) -> f64 {
    x.iter().map(Scalar::norm_sqr).sum()
}

/// Relative error ‖recovered − known‖₂ / ‖known‖₂.
///
/// When `known` is the zero vector the absolute error ‖recovered‖₂ is
/// returned instead.
pub fn relative_error<T: Scalar>(known: &[T], recovered: &[T]) -> Result<f64> {
    if known.len() != recovered.len() {
        return Err(TiledLuError::dimension(
            "recovered solution",
            known.len(),
            recovered.len(),
        ));
    }

    let error: f64 = known
        .iter()
        .zip(recovered)
        .map(|(&k, &r)| (r - k).norm_sqr())
        .sum::<f64>()
        .sqrt();
    let scale = vector_norm(known);

    Ok(if scale == 0.0 { error } else { error / scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn test_exact_recovery() {
        let x = [1.0, -2.0, 3.5];
        assert_eq!(relative_error(&x, &x).unwrap(), 0.0);
    }

    #[test]
    fn test_relative_scale() {
        let known = [3.0, 4.0];
        let recovered = [3.0, 4.5];
        assert_relative_eq!(relative_error(&known, &recovered).unwrap(), 0.1);
    }

    #[test]
    fn test_zero_known_gives_absolute_error() {
        let known = [0.0, 0.0];
        let recovered = [3.0, 4.0];
        assert_relative_eq!(relative_error(&known, &recovered).unwrap(), 5.0);
    }

    #[test]
    fn test_complex_norm() {
        let known = [Complex64::new(3.0, 4.0)];
        assert_relative_eq!(vector_norm(&known), 5.0);
        let recovered = [Complex64::new(3.0, 4.0) * 1.01];
        assert_relative_eq!(relative_error(&known, &recovered).unwrap(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let err = relative_error(&[1.0_f64], &[1.0, 2.0]).unwrap_err();
        assert!(err.is_dimension_error());
    }
}
