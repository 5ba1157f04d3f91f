use std::fmt::Debug;

use derive_more::{Deref, DerefMut, Display, From};
use nalgebra::{Matrix2, Vector2};
use nalgebra_sparse::CooMatrix;
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::config::SystemConfig;

mod bus;
mod generator;
mod line;
mod load;
mod shunt;
mod trans;

pub use bus::*;
pub use generator::*;
pub use line::*;
pub use load::*;
pub use shunt::*;
pub use trans::*;

/// Selects which nodal admittance matrix is being assembled.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceNetwork {
    /// Positive-sequence branch network used by power flow. Loads and generators enter power
    /// flow through their injections instead of shunt admittances.
    #[display("composite")]
    Composite,
    #[display("positive-sequence")]
    Positive,
    #[display("negative-sequence")]
    Negative,
    #[display("zero-sequence")]
    Zero,
}

impl SequenceNetwork {
    /// The three symmetrical-component networks, in `(0, 1, 2)` order.
    pub const SEQUENCES: [SequenceNetwork; 3] = [
        SequenceNetwork::Zero,
        SequenceNetwork::Positive,
        SequenceNetwork::Negative,
    ];
}

/// Represents an admittance value in a power system, in per-unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deref, DerefMut, From, Serialize, Deserialize)]
pub struct Admittance(pub Complex64);

impl Admittance {
    /// Admittance of a series impedance `z`.
    #[inline(always)]
    pub fn from_impedance(z: Complex64) -> Self {
        Admittance(z.inv())
    }
}

/// Bus indices of the two terminals of a branch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deref, DerefMut, From)]
pub struct Port2(pub Vector2<usize>);

impl Port2 {
    pub fn new(from: usize, to: usize) -> Self {
        Port2(Vector2::new(from, to))
    }
}

/// Primitive admittance of one element in one sequence network.
///
/// A shunt touches a single bus (1x1 primitive); a branch touches two buses and carries the
/// full 2x2 primitive, ordered like its [`Port2`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveAdmittance {
    Shunt { bus: usize, y: Admittance },
    Branch { port: Port2, y: Matrix2<Complex64> },
}

impl PrimitiveAdmittance {
    /// Series branch `[[y, -y], [-y, y]]`.
    pub fn series(port: Port2, y: Admittance) -> Self {
        Self::pi(port, y, Admittance::default())
    }

    /// Pi-equivalent branch with `y_half` to ground at each end.
    pub fn pi(port: Port2, y: Admittance, y_half: Admittance) -> Self {
        let (ys, yh) = (y.0, y_half.0);
        PrimitiveAdmittance::Branch {
            port,
            y: Matrix2::new(ys + yh, -ys, -ys, ys + yh),
        }
    }

    /// Accumulates the primitive into the global matrix at the element's bus positions.
    pub fn stamp(&self, coo: &mut CooMatrix<Complex64>) {
        match self {
            PrimitiveAdmittance::Shunt { bus, y } => coo.push(*bus, *bus, y.0),
            PrimitiveAdmittance::Branch { port, y } => {
                for (a, &i) in port.iter().enumerate() {
                    for (b, &j) in port.iter().enumerate() {
                        coo.push(i, j, y[(a, b)]);
                    }
                }
            }
        }
    }

    /// Admittance this primitive places between its buses and ground, per bus.
    pub fn ground_admittance(&self) -> Vec<(usize, Complex64)> {
        match self {
            PrimitiveAdmittance::Shunt { bus, y } => vec![(*bus, y.0)],
            PrimitiveAdmittance::Branch { port, y } => vec![
                (port[0], y[(0, 0)] + y[(0, 1)]),
                (port[1], y[(1, 0)] + y[(1, 1)]),
            ],
        }
    }
}

/// Contract every network element fulfils towards the admittance assembler.
///
/// Elements are immutable after they are added to a network; a `None` primitive means the
/// element does not appear in that sequence network at all.
pub trait NetworkElement: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn primitive(
        &self,
        kind: SequenceNetwork,
        config: &SystemConfig,
    ) -> Option<PrimitiveAdmittance>;
}

/// Neutral grounding of a wye winding or a generator star point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Grounding {
    #[default]
    Solid,
    /// Grounded through an impedance, in p.u. on the system base.
    Impedance(Complex64),
    Ungrounded,
}

impl Grounding {
    /// Neutral impedance, or `None` when there is no path to ground.
    pub fn impedance(&self) -> Option<Complex64> {
        match self {
            Grounding::Solid => Some(Complex64::zero()),
            Grounding::Impedance(z) => Some(*z),
            Grounding::Ungrounded => None,
        }
    }
}
