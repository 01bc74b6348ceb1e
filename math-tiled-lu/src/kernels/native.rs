//! Pure-Rust tile kernels
//!
//! Straightforward loops over `ndarray` views of the row-major tile slices.
//! The multiply-subtract goes through `ndarray`'s `general_mat_mul`, which is
//! where nearly all of the factorization time is spent.

use super::{Diag, Side, TileKernels, Uplo, check_len};
use crate::error::KernelError;
use crate::traits::Scalar;
use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2};

/// Default pivot threshold below which a diagonal tile is declared singular
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-30;

/// Reference implementation of [`TileKernels`].
#[derive(Debug, Clone, Copy)]
pub struct NativeKernels {
    /// Pivot candidates with a smaller magnitude are treated as zero
    pub pivot_tolerance: f64,
}

impl Default for NativeKernels {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

impl NativeKernels {
    pub fn new(pivot_tolerance: f64) -> Self {
        Self { pivot_tolerance }
    }
}

fn view<T>(values: &[T], rows: usize, cols: usize) -> Result<ArrayView2<'_, T>, KernelError> {
    check_len(values, rows * cols)?;
    ArrayView2::from_shape((rows, cols), values).map_err(|_| KernelError::ShapeMismatch {
        expected: rows * cols,
        got: values.len(),
    })
}

fn view_mut<T>(
    values: &mut [T],
    rows: usize,
    cols: usize,
) -> Result<ArrayViewMut2<'_, T>, KernelError> {
    check_len(values, rows * cols)?;
    let got = values.len();
    ArrayViewMut2::from_shape((rows, cols), values).map_err(|_| KernelError::ShapeMismatch {
        expected: rows * cols,
        got,
    })
}

impl<T: Scalar> TileKernels<T> for NativeKernels {
    fn factorize(&self, tile: &mut [T], n: usize, pivots: &mut [usize]) -> Result<(), KernelError> {
        check_len(pivots, n)?;
        let mut lu = view_mut(tile, n, n)?;

        for k in 0..n {
            // Find pivot
            let mut max_val = lu[[k, k]].magnitude();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = lu[[i, k]].magnitude();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            // NaN compares false, so it lands here as well
            if !(max_val >= self.pivot_tolerance) {
                return Err(KernelError::ZeroPivot {
                    column: k,
                    magnitude: max_val,
                });
            }

            if max_row != k {
                for j in 0..n {
                    lu.swap([k, j], [max_row, j]);
                }
            }
            pivots[k] = max_row;

            let pivot_inv = lu[[k, k]].inv();
            for i in (k + 1)..n {
                let mult = lu[[i, k]] * pivot_inv;
                lu[[i, k]] = mult;
                for j in (k + 1)..n {
                    let update = mult * lu[[k, j]];
                    lu[[i, j]] -= update;
                }
            }
        }

        Ok(())
    }

    fn apply_pivots(
        &self,
        pivots: &[usize],
        target: &mut [T],
        n: usize,
        width: usize,
    ) -> Result<(), KernelError> {
        check_len(pivots, n)?;
        let mut b = view_mut(target, n, width)?;
        for (i, &p) in pivots.iter().enumerate() {
            if p >= n {
                return Err(KernelError::ShapeMismatch {
                    expected: n,
                    got: p + 1,
                });
            }
            if p != i {
                for j in 0..width {
                    b.swap([i, j], [p, j]);
                }
            }
        }
        Ok(())
    }

    fn triangular_solve(
        &self,
        side: Side,
        uplo: Uplo,
        diag: Diag,
        triangular: &[T],
        n: usize,
        target: &mut [T],
        width: usize,
    ) -> Result<(), KernelError> {
        let t = view(triangular, n, n)?;

        match side {
            Side::Left => {
                // T·X = B, row by row of X
                let mut b = view_mut(target, n, width)?;
                let rows: Box<dyn Iterator<Item = usize>> = match uplo {
                    Uplo::Lower => Box::new(0..n),
                    Uplo::Upper => Box::new((0..n).rev()),
                };
                for i in rows {
                    let known = match uplo {
                        Uplo::Lower => 0..i,
                        Uplo::Upper => (i + 1)..n,
                    };
                    for k in known {
                        let t_ik = t[[i, k]];
                        for j in 0..width {
                            let update = t_ik * b[[k, j]];
                            b[[i, j]] -= update;
                        }
                    }
                    if diag == Diag::NonUnit {
                        let inv = t[[i, i]].inv();
                        for j in 0..width {
                            b[[i, j]] *= inv;
                        }
                    }
                }
            }
            Side::Right => {
                // X·T = B, column by column of X
                let mut b = view_mut(target, width, n)?;
                let cols: Box<dyn Iterator<Item = usize>> = match uplo {
                    Uplo::Upper => Box::new(0..n),
                    Uplo::Lower => Box::new((0..n).rev()),
                };
                for j in cols {
                    let known = match uplo {
                        Uplo::Upper => 0..j,
                        Uplo::Lower => (j + 1)..n,
                    };
                    for k in known {
                        let t_kj = t[[k, j]];
                        for r in 0..width {
                            let update = b[[r, k]] * t_kj;
                            b[[r, j]] -= update;
                        }
                    }
                    if diag == Diag::NonUnit {
                        let inv = t[[j, j]].inv();
                        for r in 0..width {
                            b[[r, j]] *= inv;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn multiply_subtract(
        &self,
        a: &[T],
        b: &[T],
        c: &mut [T],
        n: usize,
        width: usize,
    ) -> Result<(), KernelError> {
        let a = view(a, n, n)?;
        let b = view(b, n, width)?;
        let mut c = view_mut(c, n, width)?;
        general_mat_mul(-T::one(), &a, &b, T::one(), &mut c);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn unpack(lu: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let n = lu.nrows();
        let l = Array2::from_shape_fn((n, n), |(i, j)| match i.cmp(&j) {
            std::cmp::Ordering::Greater => lu[[i, j]],
            std::cmp::Ordering::Equal => 1.0,
            std::cmp::Ordering::Less => 0.0,
        });
        let u = Array2::from_shape_fn((n, n), |(i, j)| if i <= j { lu[[i, j]] } else { 0.0 });
        (l, u)
    }

    #[test]
    fn test_factorize_pivots_within_tile() {
        let a = array![[4.0_f64, 3.0], [6.0, 3.0]];
        let mut tile = a.clone().into_raw_vec_and_offset().0;
        let mut pivots = vec![0; 2];

        NativeKernels::default()
            .factorize(&mut tile, 2, &mut pivots)
            .expect("factorization should succeed");

        // |6| > |4|: rows are exchanged at step 0
        assert_eq!(pivots, vec![1, 1]);

        let lu = Array2::from_shape_vec((2, 2), tile).unwrap();
        let (l, u) = unpack(&lu);
        let product = l.dot(&u);
        let permuted = array![[6.0, 3.0], [4.0, 3.0]];
        for (p, e) in product.iter().zip(permuted.iter()) {
            assert_relative_eq!(*p, *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_factorize_singular() {
        let mut tile = vec![1.0_f64, 2.0, 2.0, 4.0];
        let mut pivots = vec![0; 2];
        let err = NativeKernels::default()
            .factorize(&mut tile, 2, &mut pivots)
            .unwrap_err();
        assert!(matches!(err, KernelError::ZeroPivot { column: 1, .. }));
    }

    #[test]
    fn test_factorize_zero_column() {
        let mut tile = vec![0.0_f64, 1.0, 0.0, 1.0];
        let mut pivots = vec![0; 2];
        let err = NativeKernels::default()
            .factorize(&mut tile, 2, &mut pivots)
            .unwrap_err();
        assert!(matches!(err, KernelError::ZeroPivot { column: 0, .. }));
    }

    #[test]
    fn test_left_lower_unit_solve() {
        // L = [[1, 0], [2, 1]], B = [[1], [4]] -> X = [[1], [2]]
        let l = [1.0_f64, 0.0, 2.0, 1.0];
        let mut b = [1.0_f64, 4.0];
        NativeKernels::default()
            .triangular_solve(Side::Left, Uplo::Lower, Diag::Unit, &l, 2, &mut b, 1)
            .unwrap();
        assert_relative_eq!(b[0], 1.0);
        assert_relative_eq!(b[1], 2.0);
    }

    #[test]
    fn test_left_upper_non_unit_solve() {
        // U = [[2, 1], [0, 4]], B = [[4], [8]] -> X = [[1], [2]]
        let u = [2.0_f64, 1.0, 0.0, 4.0];
        let mut b = [4.0_f64, 8.0];
        NativeKernels::default()
            .triangular_solve(Side::Left, Uplo::Upper, Diag::NonUnit, &u, 2, &mut b, 1)
            .unwrap();
        assert_relative_eq!(b[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(b[1], 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_right_upper_non_unit_solve() {
        let u = array![[2.0_f64, 1.0], [0.0, 4.0]];
        let x = array![[1.0_f64, -1.0], [3.0, 0.5]];
        let mut b = x.dot(&u).into_raw_vec_and_offset().0;

        NativeKernels::default()
            .triangular_solve(
                Side::Right,
                Uplo::Upper,
                Diag::NonUnit,
                u.as_slice().unwrap(),
                2,
                &mut b,
                2,
            )
            .unwrap();
        for (got, want) in b.iter().zip(x.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_right_lower_unit_solve() {
        let l = array![[1.0_f64, 0.0], [0.5, 1.0]];
        let x = array![[2.0_f64, 1.0]];
        let mut b = x.dot(&l).into_raw_vec_and_offset().0;

        NativeKernels::default()
            .triangular_solve(
                Side::Right,
                Uplo::Lower,
                Diag::Unit,
                l.as_slice().unwrap(),
                2,
                &mut b,
                1,
            )
            .unwrap();
        assert_relative_eq!(b[0], 2.0, epsilon = 1e-14);
        assert_relative_eq!(b[1], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_multiply_subtract() {
        let a = [1.0_f64, 2.0, 3.0, 4.0];
        let b = [1.0_f64, 1.0];
        let mut c = [10.0_f64, 10.0];
        NativeKernels::default()
            .multiply_subtract(&a, &b, &mut c, 2, 1)
            .unwrap();
        assert_eq!(c, [7.0, 3.0]);
    }

    #[test]
    fn test_apply_pivots() {
        let mut b = [1.0_f64, 2.0, 3.0];
        NativeKernels::default()
            .apply_pivots(&[2, 1, 2], &mut b, 3, 1)
            .unwrap();
        assert_eq!(b, [3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut c = [0.0_f64; 3];
        let err = <NativeKernels as TileKernels<f64>>::multiply_subtract(
            &NativeKernels::default(),
            &[1.0; 4],
            &[1.0; 2],
            &mut c,
            2,
            1,
        )
        .unwrap_err();
        assert_eq!(
            err,
            KernelError::ShapeMismatch {
                expected: 2,
                got: 3
            }
        );
    }
}
