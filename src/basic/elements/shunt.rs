use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::*;
use crate::basic::config::SystemConfig;

/// Fixed shunt device (capacitor bank, reactor) in p.u. on the system base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntParams {
    pub g_pu: f64,
    pub b_pu: f64,
    /// A grounded-wye bank also appears in the zero-sequence network.
    pub grounded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shunt {
    pub name: String,
    pub bus: usize,
    pub params: ShuntParams,
}

impl NetworkElement for Shunt {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive(&self, kind: SequenceNetwork, _config: &SystemConfig) -> Option<PrimitiveAdmittance> {
        if kind == SequenceNetwork::Zero && !self.params.grounded {
            return None;
        }
        Some(PrimitiveAdmittance::Shunt {
            bus: self.bus,
            y: Admittance(Complex64::new(self.params.g_pu, self.params.b_pu)),
        })
    }
}
