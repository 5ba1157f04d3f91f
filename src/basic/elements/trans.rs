use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::*;
use crate::basic::config::SystemConfig;

/// Connection of one transformer winding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Winding {
    Delta,
    Wye(Grounding),
}

impl Winding {
    /// Neutral impedance if the winding offers a zero-sequence path to ground.
    pub fn ground_path(&self) -> Option<Complex64> {
        match self {
            Winding::Delta => None,
            Winding::Wye(g) => g.impedance(),
        }
    }
}

/// Two-winding transformer, nominal ratio, on the system base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerParams {
    pub r_pu: f64,
    pub x_pu: f64,
    /// Connection of the winding at the first bus.
    pub from_winding: Winding,
    /// Connection of the winding at the second bus.
    pub to_winding: Winding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transformer {
    pub name: String,
    pub port: Port2,
    pub params: TransformerParams,
}

impl Transformer {
    #[inline(always)]
    fn z(&self) -> Complex64 {
        Complex64::new(self.params.r_pu, self.params.x_pu)
    }

    /// Zero-sequence model by winding connection.
    ///
    /// Grounded wye on both sides passes zero-sequence current through; a grounded wye facing
    /// a delta winding circulates it in the delta, which appears as a shunt on the wye side.
    fn zero_sequence(&self) -> Option<PrimitiveAdmittance> {
        let z = self.z();
        let (from, to) = (self.port[0], self.port[1]);
        match (self.params.from_winding, self.params.to_winding) {
            (Winding::Wye(_), Winding::Wye(_)) => {
                let zg_from = self.params.from_winding.ground_path()?;
                let zg_to = self.params.to_winding.ground_path()?;
                Some(PrimitiveAdmittance::series(
                    self.port,
                    Admittance::from_impedance(z + 3.0 * zg_from + 3.0 * zg_to),
                ))
            }
            (Winding::Wye(_), Winding::Delta) => {
                let zg = self.params.from_winding.ground_path()?;
                Some(PrimitiveAdmittance::Shunt {
                    bus: from,
                    y: Admittance::from_impedance(z + 3.0 * zg),
                })
            }
            (Winding::Delta, Winding::Wye(_)) => {
                let zg = self.params.to_winding.ground_path()?;
                Some(PrimitiveAdmittance::Shunt {
                    bus: to,
                    y: Admittance::from_impedance(z + 3.0 * zg),
                })
            }
            (Winding::Delta, Winding::Delta) => None,
        }
    }
}

impl NetworkElement for Transformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive(&self, kind: SequenceNetwork, _config: &SystemConfig) -> Option<PrimitiveAdmittance> {
        match kind {
            SequenceNetwork::Zero => self.zero_sequence(),
            _ => Some(PrimitiveAdmittance::series(
                self.port,
                Admittance::from_impedance(self.z()),
            )),
        }
    }
}
