//! Scalar abstraction for tile values
//!
//! [`Scalar`] abstracts over the real and complex element types a tile may
//! hold. Tile kernels only need field arithmetic, a magnitude for pivot
//! selection and a way to lift `f64` constants.

use ndarray::LinalgScalar;
use num_complex::{Complex32, Complex64};
use num_traits::NumAssign;
use std::fmt::Debug;
use std::ops::Neg;

/// Element type of a tile.
///
/// Provided for `f64` (the default), `f32`, `Complex64` and `Complex32`.
pub trait Scalar:
    NumAssign + LinalgScalar + Copy + Send + Sync + Debug + Neg<Output = Self> + 'static
{
    /// Squared magnitude |z|² as `f64`
    fn norm_sqr(&self) -> f64;

    /// Magnitude as `f64`, used to compare against tolerances
    fn magnitude(&self) -> f64;

    /// Lift a real `f64` value
    fn from_f64(value: f64) -> Self;

    /// Multiplicative inverse (1/z)
    fn inv(&self) -> Self;
}

impl Scalar for f64 {
    #[inline]
    fn norm_sqr(&self) -> f64 {
        *self * *self
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

impl Scalar for f32 {
    #[inline]
    fn norm_sqr(&self) -> f64 {
        f64::from(*self * *self)
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        f64::from(self.abs())
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / *self
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        Complex64::norm(*self)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    #[inline]
    fn inv(&self) -> Self {
        let denom = Scalar::norm_sqr(self);
        Complex64::new(self.re / denom, -self.im / denom)
    }
}

impl Scalar for Complex32 {
    #[inline]
    fn norm_sqr(&self) -> f64 {
        f64::from(self.re * self.re + self.im * self.im)
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        f64::from(Complex32::norm(*self))
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        Complex32::new(value as f32, 0.0)
    }

    #[inline]
    fn inv(&self) -> Self {
        let denom = self.re * self.re + self.im * self.im;
        Complex32::new(self.re / denom, -self.im / denom)
    }
}
