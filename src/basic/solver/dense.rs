use nalgebra::{DMatrix, DVector};

use super::Solve;

/// Dense LU backend built on nalgebra. Reports a singular matrix instead of producing
/// non-finite values.
#[derive(Debug, Default)]
pub struct DenseSolver;

#[allow(non_snake_case)]
impl Solve for DenseSolver {
    fn solve(
        &mut self,
        Ap: &mut [usize],
        Ai: &mut [usize],
        Ax: &mut [f64],
        b: &mut [f64],
        n: usize,
    ) -> Result<(), &'static str> {
        if Ap.len() != n + 1 || Ai.len() != Ax.len() || b.len() != n {
            return Err("inconsistent sparse system dimensions");
        }
        let mut a = DMatrix::zeros(n, n);
        for col in 0..n {
            for idx in Ap[col]..Ap[col + 1] {
                a[(Ai[idx], col)] += Ax[idx];
            }
        }
        let rhs = DVector::from_column_slice(b);
        let x = a.lu().solve(&rhs).ok_or("singular matrix")?;
        b.copy_from_slice(x.as_slice());
        Ok(())
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_matrix_is_an_error() {
        let mut ap = vec![0, 1, 1];
        let mut ai = vec![0];
        let mut ax = vec![1.0];
        let mut b = vec![1.0, 1.0];
        assert!(DenseSolver.solve(&mut ap, &mut ai, &mut ax, &mut b, 2).is_err());
    }
}
