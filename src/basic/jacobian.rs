use nalgebra::DMatrix;
use nalgebra_sparse::{CscMatrix, SparseEntry};
use num_complex::Complex64;
use num_traits::Zero;

use super::newtonpf::{BusPartition, BusState};

/// Builds the power-flow Jacobian `[[J1, J2], [J3, J4]]` in polar form.
///
/// Rows are `ΔP` over `partition.p` followed by `ΔQ` over `partition.q`; columns are `Δδ` over
/// `partition.p` followed by `Δ|V|` over `partition.q`. With `θ_ik = arg(Y_ik)`:
///
/// * `J1 = ∂P/∂δ`, `J2 = ∂P/∂|V|`, `J3 = ∂Q/∂δ`, `J4 = ∂Q/∂|V|`
/// * diagonal terms sum over every bus `k`, not only the buses of the partition.
///
/// # Panics
///
/// Panics if `ybus` is not square with one row per entry of `state`, which is a caller bug.
#[allow(non_snake_case)]
pub fn build_jacobian(
    ybus: &DMatrix<Complex64>,
    state: &BusState,
    partition: &BusPartition,
) -> DMatrix<f64> {
    let n = ybus.nrows();
    assert!(
        ybus.is_square() && n == state.len(),
        "Ybus shape {:?} does not match {} buses",
        ybus.shape(),
        n
    );
    let (vm, va) = (&state.vm, &state.va);

    // |Y_ik|·cos(δ_i−δ_k−θ_ik), |Y_ik|·sin(δ_i−δ_k−θ_ik)
    let term = |i: usize, k: usize| -> (f64, f64) {
        let y = ybus[(i, k)];
        let (s, c) = (va[i] - va[k] - y.arg()).sin_cos();
        (y.norm() * c, y.norm() * s)
    };

    // Σ_{k≠i} V_k·|Y_ik|·cos(..) and Σ_{k≠i} V_k·|Y_ik|·sin(..) for every bus
    let mut sum_cos = vec![0.0; n];
    let mut sum_sin = vec![0.0; n];
    for i in 0..n {
        for k in (0..n).filter(|&k| k != i) {
            if ybus[(i, k)].is_zero() {
                continue;
            }
            let (c, s) = term(i, k);
            sum_cos[i] += vm[k] * c;
            sum_sin[i] += vm[k] * s;
        }
    }

    let np = partition.p.len();
    let nq = partition.q.len();
    let mut J = DMatrix::zeros(np + nq, np + nq);

    for (r, &i) in partition.p.iter().enumerate() {
        let y_ii = ybus[(i, i)];
        for (c, &j) in partition.p.iter().enumerate() {
            J[(r, c)] = if i == j {
                -vm[i] * sum_sin[i]
            } else {
                vm[i] * vm[j] * term(i, j).1
            };
        }
        for (c, &j) in partition.q.iter().enumerate() {
            J[(r, np + c)] = if i == j {
                // the k = i term of the full sum plus V_i·|Y_ii|·cos(θ_ii)
                sum_cos[i] + vm[i] * term(i, i).0 + vm[i] * y_ii.norm() * y_ii.arg().cos()
            } else {
                vm[i] * term(i, j).0
            };
        }
    }

    for (r, &i) in partition.q.iter().enumerate() {
        let y_ii = ybus[(i, i)];
        for (c, &j) in partition.p.iter().enumerate() {
            J[(np + r, c)] = if i == j {
                vm[i] * sum_cos[i]
            } else {
                -vm[i] * vm[j] * term(i, j).0
            };
        }
        for (c, &j) in partition.q.iter().enumerate() {
            J[(np + r, np + c)] = if i == j {
                sum_sin[i] + vm[i] * term(i, i).1 - vm[i] * y_ii.norm() * y_ii.arg().sin()
            } else {
                vm[i] * term(i, j).1
            };
        }
    }
    J
}

/// Fixed compressed-column pattern of the Jacobian for a given Ybus and partition.
///
/// An entry is kept when its two buses coincide or are coupled in the Ybus. The pattern does not
/// depend on the operating point, so a symbolic factorization computed in the first iteration
/// stays valid for the whole solve.
#[derive(Debug, Clone)]
pub struct JacobianPattern {
    pub col_offsets: Vec<usize>,
    pub row_indices: Vec<usize>,
}

impl JacobianPattern {
    pub fn new(ybus: &CscMatrix<Complex64>, partition: &BusPartition) -> Self {
        let buses = partition.state_buses();
        let coupled = |a: usize, b: usize| {
            a == b || matches!(ybus.get_entry(a, b), Some(SparseEntry::NonZero(_)))
        };
        let mut col_offsets = Vec::with_capacity(buses.len() + 1);
        let mut row_indices = Vec::new();
        col_offsets.push(0);
        for &bc in &buses {
            for (r, &br) in buses.iter().enumerate() {
                if coupled(br, bc) {
                    row_indices.push(r);
                }
            }
            col_offsets.push(row_indices.len());
        }
        Self {
            col_offsets,
            row_indices,
        }
    }

    #[inline(always)]
    pub fn nnz(&self) -> usize {
        self.row_indices.len()
    }

    /// Gathers the values of `jac` at the pattern positions, column by column.
    pub fn gather(&self, jac: &DMatrix<f64>, values: &mut Vec<f64>) {
        values.clear();
        for c in 0..self.col_offsets.len() - 1 {
            for &r in &self.row_indices[self.col_offsets[c]..self.col_offsets[c + 1]] {
                values.push(jac[(r, c)]);
            }
        }
    }
}
