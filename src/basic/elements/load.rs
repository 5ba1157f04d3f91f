use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::*;
use crate::basic::config::SystemConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadParams {
    pub p_mw: f64,
    pub q_mvar: f64,
}

/// Constant-power load. In the positive and negative sequence networks it is represented
/// by its constant-admittance equivalent at 1 p.u. voltage.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub name: String,
    pub bus: usize,
    pub params: LoadParams,
}

impl Load {
    #[inline(always)]
    pub fn demand_mva(&self) -> Complex64 {
        Complex64::new(self.params.p_mw, self.params.q_mvar)
    }
}

impl NetworkElement for Load {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive(&self, kind: SequenceNetwork, config: &SystemConfig) -> Option<PrimitiveAdmittance> {
        match kind {
            SequenceNetwork::Positive | SequenceNetwork::Negative => Some(PrimitiveAdmittance::Shunt {
                bus: self.bus,
                y: Admittance(self.demand_mva().conj() / config.s_base_mva),
            }),
            SequenceNetwork::Composite | SequenceNetwork::Zero => None,
        }
    }
}
