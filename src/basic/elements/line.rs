use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::*;
use crate::basic::config::SystemConfig;

/// Ratio of zero- to positive-sequence series impedance used when a line has no explicit
/// zero-sequence data. This is an approximation for overhead lines without ground-wire
/// details, not a derived quantity.
pub const ZERO_SEQUENCE_FACTOR: f64 = 2.5;

/// Per-unit pi-model parameters of a transmission line on the system base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineParams {
    pub r_pu: f64,
    pub x_pu: f64,
    /// Total line-charging susceptance.
    pub b_pu: f64,
    /// Explicit zero-sequence parameters; defaults are derived from the positive sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_sequence: Option<ZeroSequenceParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroSequenceParams {
    pub r0_pu: f64,
    pub x0_pu: f64,
    pub b0_pu: f64,
}

impl LineParams {
    pub fn new(r_pu: f64, x_pu: f64, b_pu: f64) -> Self {
        Self {
            r_pu,
            x_pu,
            b_pu,
            zero_sequence: None,
        }
    }

    /// Converts total series resistance and reactance in ohms and total shunt capacitance in
    /// nF to per unit at a bus base of `v_base_kv`.
    pub fn from_ohms(
        r_ohm: f64,
        x_ohm: f64,
        c_nf: f64,
        v_base_kv: f64,
        config: &SystemConfig,
    ) -> Self {
        let z_base = config.z_base(v_base_kv);
        let b_siemens = config.wbase() * c_nf * 1e-9;
        Self::new(r_ohm / z_base, x_ohm / z_base, b_siemens * z_base)
    }

    pub fn with_zero_sequence(mut self, r0_pu: f64, x0_pu: f64, b0_pu: f64) -> Self {
        self.zero_sequence = Some(ZeroSequenceParams {
            r0_pu,
            x0_pu,
            b0_pu,
        });
        self
    }

    pub fn zero_sequence(&self) -> ZeroSequenceParams {
        self.zero_sequence.clone().unwrap_or(ZeroSequenceParams {
            r0_pu: ZERO_SEQUENCE_FACTOR * self.r_pu,
            x0_pu: ZERO_SEQUENCE_FACTOR * self.x_pu,
            b0_pu: self.b_pu,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub name: String,
    pub port: Port2,
    pub params: LineParams,
}

impl NetworkElement for Line {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive(&self, kind: SequenceNetwork, _config: &SystemConfig) -> Option<PrimitiveAdmittance> {
        let (r, x, b) = match kind {
            SequenceNetwork::Zero => {
                let z0 = self.params.zero_sequence();
                (z0.r0_pu, z0.x0_pu, z0.b0_pu)
            }
            _ => (self.params.r_pu, self.params.x_pu, self.params.b_pu),
        };
        Some(PrimitiveAdmittance::pi(
            self.port,
            Admittance::from_impedance(Complex64::new(r, x)),
            Admittance(Complex64::new(0.0, b / 2.0)),
        ))
    }
}
