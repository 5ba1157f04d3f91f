use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix, SparseEntry};
use num_complex::Complex64;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::basic::{
    config::SystemConfig,
    elements::{NetworkElement, SequenceNetwork},
    network::Network,
};

/// Nodal admittance matrix of one sequence network, in canonical bus order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YBus {
    pub kind: SequenceNetwork,
    matrix: CscMatrix<Complex64>,
}

impl YBus {
    pub fn new(kind: SequenceNetwork, matrix: CscMatrix<Complex64>) -> Self {
        Self { kind, matrix }
    }

    #[inline(always)]
    pub fn matrix(&self) -> &CscMatrix<Complex64> {
        &self.matrix
    }

    #[inline(always)]
    pub fn n_bus(&self) -> usize {
        self.matrix.nrows()
    }

    /// Entry `(i, j)`; zero when no element couples the two buses.
    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        match self.matrix.get_entry(i, j) {
            Some(SparseEntry::NonZero(v)) => *v,
            _ => Complex64::zero(),
        }
    }

    pub fn to_dense(&self) -> DMatrix<Complex64> {
        DMatrix::from(&self.matrix)
    }

    /// Sum of every row, which is the total admittance from each bus to ground.
    pub fn row_sums(&self) -> DVector<Complex64> {
        let ones = DVector::from_element(self.n_bus(), Complex64::one());
        &self.matrix * &ones
    }
}

/// Assembles the nodal admittance matrix of `kind` from the primitives of every element.
///
/// Contributions are accumulated as triplets and summed when compressed, so the element
/// order does not affect the result. Assembly never fails; the matrix may be singular.
pub fn assemble_ybus(network: &Network, config: &SystemConfig, kind: SequenceNetwork) -> YBus {
    assemble_from(network.n_bus(), network.elements(), config, kind)
}

pub(crate) fn assemble_from<'a>(
    n_bus: usize,
    elements: impl Iterator<Item = &'a dyn NetworkElement>,
    config: &SystemConfig,
    kind: SequenceNetwork,
) -> YBus {
    let mut coo = CooMatrix::new(n_bus, n_bus);
    let mut stamped = 0;
    for element in elements {
        if let Some(primitive) = element.primitive(kind, config) {
            primitive.stamp(&mut coo);
            stamped += 1;
        }
    }
    let matrix = CscMatrix::from(&coo);
    debug!(
        "assembled {kind} Ybus: {n_bus} buses, {stamped} elements, {} stored entries",
        matrix.nnz()
    );
    YBus::new(kind, matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::elements::PrimitiveAdmittance;
    use crate::testcases;
    use approx::assert_relative_eq;

    fn assert_same(a: &YBus, b: &YBus) {
        let (da, db) = (a.to_dense(), b.to_dense());
        for (x, y) in da.iter().zip(db.iter()) {
            assert_relative_eq!(x.re, y.re, epsilon = 1e-9);
            assert_relative_eq!(x.im, y.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn element_order_does_not_matter() {
        let (net, cfg) = testcases::seven_bus();
        for kind in [
            SequenceNetwork::Composite,
            SequenceNetwork::Positive,
            SequenceNetwork::Negative,
            SequenceNetwork::Zero,
        ] {
            let forward = assemble_ybus(&net, &cfg, kind);
            let elements: Vec<_> = net.elements().collect();
            let reversed = assemble_from(net.n_bus(), elements.into_iter().rev(), &cfg, kind);
            assert_same(&forward, &reversed);
        }
    }

    #[test]
    fn row_sums_equal_shunt_admittance() {
        let (net, cfg) = testcases::seven_bus();
        for kind in [
            SequenceNetwork::Composite,
            SequenceNetwork::Positive,
            SequenceNetwork::Zero,
        ] {
            let ybus = assemble_ybus(&net, &cfg, kind);
            let mut expected = vec![Complex64::new(0.0, 0.0); net.n_bus()];
            for p in net.elements().filter_map(|e| e.primitive(kind, &cfg)) {
                for (bus, y) in p.ground_admittance() {
                    expected[bus] += y;
                }
            }
            for (sum, exp) in ybus.row_sums().iter().zip(expected) {
                assert_relative_eq!(sum.re, exp.re, epsilon = 1e-9);
                assert_relative_eq!(sum.im, exp.im, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn composite_excludes_generators_and_loads() {
        let (net, cfg) = testcases::seven_bus();
        let composite = assemble_ybus(&net, &cfg, SequenceNetwork::Composite);
        let positive = assemble_ybus(&net, &cfg, SequenceNetwork::Positive);
        // Bus1 carries only T1 and G1
        let t1 = Complex64::new(0.00677, 0.06766).inv();
        assert_relative_eq!(composite.get(0, 0).im, t1.im, epsilon = 1e-9);
        assert_relative_eq!(
            positive.get(0, 0).im,
            t1.im - 1.0 / 0.12,
            epsilon = 1e-9
        );
        // Bus3 load at 110 MW + j50 MVAr
        let d = positive.get(2, 2) - composite.get(2, 2);
        assert_relative_eq!(d.re, 1.1, epsilon = 1e-12);
        assert_relative_eq!(d.im, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn untouched_entries_stay_zero() {
        let (net, cfg) = testcases::seven_bus();
        let ybus = assemble_ybus(&net, &cfg, SequenceNetwork::Composite);
        // Bus1 and Bus7 share no element
        assert_eq!(ybus.get(0, 6), Complex64::new(0.0, 0.0));
        let shunt = PrimitiveAdmittance::Shunt {
            bus: 0,
            y: Complex64::new(0.0, 1.0).into(),
        };
        assert_eq!(shunt.ground_admittance(), vec![(0, Complex64::new(0.0, 1.0))]);
    }
}
