use log::{debug, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::admittance::YBus;
use crate::basic::{elements::SequenceNetwork, error::SingularNetwork};

/// Smallest accepted ratio between the smallest and largest LU pivot magnitudes.
pub const PIVOT_RATIO_TOL: f64 = 1e-12;

/// Nodal impedance matrix, the inverse of a non-singular [`YBus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZBus {
    pub kind: SequenceNetwork,
    matrix: DMatrix<Complex64>,
}

impl ZBus {
    #[inline(always)]
    pub fn matrix(&self) -> &DMatrix<Complex64> {
        &self.matrix
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        self.matrix[(i, j)]
    }

    /// Driving-point impedance of `bus`.
    #[inline(always)]
    pub fn driving_point(&self, bus: usize) -> Complex64 {
        self.matrix[(bus, bus)]
    }

    pub fn n_bus(&self) -> usize {
        self.matrix.nrows()
    }
}

/// Inverts `ybus`, reporting [`SingularNetwork`] instead of returning non-finite values.
///
/// The matrix is considered singular when its LU factorization has a pivot that is zero or
/// smaller than [`PIVOT_RATIO_TOL`] times the largest pivot.
pub fn invert_ybus(ybus: &YBus) -> Result<ZBus, SingularNetwork> {
    let singular = SingularNetwork {
        sequence: ybus.kind,
    };
    let n = ybus.n_bus();
    if n == 0 {
        return Err(singular);
    }
    let lu = ybus.to_dense().lu();
    let pivots = lu.u().diagonal().map(|p| p.norm());
    let (min, max) = (pivots.min(), pivots.max());
    if !(min.is_finite() && max > 0.0) || min < PIVOT_RATIO_TOL * max {
        warn!("{} Ybus is singular (pivot ratio {:.3e})", ybus.kind, min / max);
        return Err(singular);
    }
    let matrix = lu.try_inverse().ok_or(singular)?;
    if matrix.iter().any(|z| !(z.re.is_finite() && z.im.is_finite())) {
        warn!("{} Zbus has non-finite entries", ybus.kind);
        return Err(singular);
    }
    debug!("inverted {} Ybus ({n} buses)", ybus.kind);
    Ok(ZBus {
        kind: ybus.kind,
        matrix,
    })
}
