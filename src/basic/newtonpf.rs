use log::{debug, info, warn};
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{
    elements::BusRole,
    error::{ConfigurationError, PowerFlowError},
    jacobian::{JacobianPattern, build_jacobian},
    solver::Solve,
    system::YBus,
};

/// Default convergence tolerance on the largest mismatch, in p.u.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;
/// Default Newton-Raphson iteration bound.
pub const DEFAULT_MAX_ITER: usize = 50;

/// Voltage magnitude (p.u.) and angle (rad) of every bus, in canonical bus order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusState {
    pub vm: DVector<f64>,
    pub va: DVector<f64>,
}

impl BusState {
    /// `V = 1.0 p.u.`, `δ = 0` at every bus.
    pub fn flat(n: usize) -> Self {
        Self {
            vm: DVector::from_element(n, 1.0),
            va: DVector::zeros(n),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vm.is_empty()
    }

    /// Bus voltages as phasors.
    pub fn voltages(&self) -> DVector<Complex64> {
        self.vm.zip_map(&self.va, Complex64::from_polar)
    }
}

/// Split of the buses into the unknowns of the power flow.
///
/// `p` holds every non-slack bus (angle unknowns, `ΔP` equations) and `q` every PQ bus
/// (magnitude unknowns, `ΔQ` equations), both in canonical order. The same ordering is used for
/// the mismatch vector, the Jacobian and the update vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusPartition {
    pub slack: usize,
    pub p: Vec<usize>,
    pub q: Vec<usize>,
}

impl BusPartition {
    pub fn from_roles(roles: &[BusRole]) -> Result<Self, ConfigurationError> {
        if roles.is_empty() {
            return Err(ConfigurationError::EmptyNetwork);
        }
        let mut slack = None;
        let mut p = Vec::with_capacity(roles.len());
        let mut q = Vec::with_capacity(roles.len());
        for (i, role) in roles.iter().enumerate() {
            match role {
                BusRole::Slack => {
                    if let Some(first) = slack {
                        return Err(ConfigurationError::MultipleSlack(first, i));
                    }
                    slack = Some(i);
                }
                BusRole::PV => p.push(i),
                BusRole::PQ => {
                    p.push(i);
                    q.push(i);
                }
            }
        }
        let slack = slack.ok_or(ConfigurationError::MissingSlack)?;
        Ok(Self { slack, p, q })
    }

    /// Number of unknowns, `|P| + |Q|`.
    #[inline(always)]
    pub fn dim(&self) -> usize {
        self.p.len() + self.q.len()
    }

    /// Bus of every state variable, angles first then magnitudes.
    pub fn state_buses(&self) -> Vec<usize> {
        self.p.iter().chain(self.q.iter()).copied().collect()
    }
}

/// Converged power-flow operating point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerFlowSolution {
    pub state: BusState,
    /// Iterations performed, counting the one in which convergence was detected.
    pub iterations: usize,
    pub max_mismatch: f64,
    /// Calculated complex injection per bus at the solution, in p.u.
    pub s_calc: DVector<Complex64>,
}

impl PowerFlowSolution {
    pub fn voltages(&self) -> DVector<Complex64> {
        self.state.voltages()
    }
}

/// Calculated injections `S = V ∘ conj(Ybus·V)`.
#[inline(always)]
pub fn calc_injections(ybus: &CscMatrix<Complex64>, v: &DVector<Complex64>) -> DVector<Complex64> {
    v.component_mul(&(ybus * v).conjugate())
}

/// Specified minus calculated injections: `ΔP` over `partition.p`, then `ΔQ` over `partition.q`.
pub fn mismatch(
    s_spec: &DVector<Complex64>,
    s_calc: &DVector<Complex64>,
    partition: &BusPartition,
) -> DVector<f64> {
    let dp = partition.p.iter().map(|&i| (s_spec[i] - s_calc[i]).re);
    let dq = partition.q.iter().map(|&i| (s_spec[i] - s_calc[i]).im);
    DVector::from_iterator(partition.dim(), dp.chain(dq))
}

/// Largest magnitude in `v`; NaN if any entry is NaN.
#[inline(always)]
fn max_abs(v: &DVector<f64>) -> f64 {
    v.iter().fold(0.0_f64, |m, x| {
        if m.is_nan() || x.is_nan() {
            f64::NAN
        } else {
            m.max(x.abs())
        }
    })
}

#[inline(always)]
fn update_state(state: &mut BusState, dx: &DVector<f64>, partition: &BusPartition) {
    let np = partition.p.len();
    for (k, &i) in partition.p.iter().enumerate() {
        state.va[i] += dx[k];
    }
    for (k, &i) in partition.q.iter().enumerate() {
        state.vm[i] += dx[np + k];
    }
}

/// Solves the power-flow equations with Newton-Raphson iterations.
///
/// # Arguments
///
/// * `ybus` - Composite admittance matrix.
/// * `s_spec` - Specified complex injection per bus in p.u.
/// * `init` - Initial state; slack magnitude/angle and PV magnitudes stay fixed.
/// * `partition` - Unknowns of the problem, see [`BusPartition`].
/// * `tolerance` - Convergence tolerance, default [`DEFAULT_TOLERANCE`].
/// * `max_iter` - Iteration bound, default [`DEFAULT_MAX_ITER`].
/// * `solver` - Sparse linear solver for the Newton step.
///
/// # Returns
///
/// The converged [`PowerFlowSolution`], or the terminal failure with the last state reached.
pub fn newton_pf<Solver: Solve>(
    ybus: &YBus,
    s_spec: &DVector<Complex64>,
    init: BusState,
    partition: &BusPartition,
    tolerance: Option<f64>,
    max_iter: Option<usize>,
    solver: &mut Solver,
) -> Result<PowerFlowSolution, PowerFlowError> {
    let tol = tolerance.unwrap_or(DEFAULT_TOLERANCE);
    let max_iter = max_iter.unwrap_or(DEFAULT_MAX_ITER);
    let y_sparse = ybus.matrix();
    let y_dense = ybus.to_dense();
    let n = partition.dim();

    let pattern = JacobianPattern::new(y_sparse, partition);
    let mut ap = pattern.col_offsets.clone();
    let mut ai = pattern.row_indices.clone();
    let mut ax = Vec::with_capacity(pattern.nnz());
    solver.reset();

    let mut state = init;
    for iteration in 1..=max_iter {
        let s_calc = calc_injections(y_sparse, &state.voltages());
        let mut dx = mismatch(s_spec, &s_calc, partition);
        let max_mismatch = max_abs(&dx);
        debug!("iteration {iteration}: max mismatch {max_mismatch:.3e}");
        if !max_mismatch.is_finite() {
            warn!("non-finite power mismatch at iteration {iteration}");
            return Err(PowerFlowError::NonFiniteMismatch { iteration, state });
        }

        if max_mismatch < tol {
            info!("power flow converged in {iteration} iterations");
            return Ok(PowerFlowSolution {
                state,
                iterations: iteration,
                max_mismatch,
                s_calc,
            });
        }

        let jac = build_jacobian(&y_dense, &state, partition);
        pattern.gather(&jac, &mut ax);

        let solved = solver.solve(
            ap.as_mut_slice(),
            ai.as_mut_slice(),
            ax.as_mut_slice(),
            dx.as_mut_slice(),
            n,
        );
        if let Err(err) = solved {
            warn!("Jacobian factorization failed at iteration {iteration}: {err}");
            return Err(PowerFlowError::SingularJacobian { iteration, state });
        }
        if dx.iter().any(|x| !x.is_finite()) {
            warn!("non-finite Newton step at iteration {iteration}");
            return Err(PowerFlowError::SingularJacobian { iteration, state });
        }
        update_state(&mut state, &dx, partition);
    }

    let s_calc = calc_injections(y_sparse, &state.voltages());
    let max_mismatch = max_abs(&mismatch(s_spec, &s_calc, partition));
    warn!("power flow did not converge in {max_iter} iterations (max mismatch {max_mismatch:.3e})");
    Err(PowerFlowError::MaxIterationsExceeded {
        iterations: max_iter,
        max_mismatch,
        state,
    })
}
