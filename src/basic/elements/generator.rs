use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::*;
use crate::basic::config::SystemConfig;

/// Synchronous generator data on the system base.
///
/// The sequence reactances are the machine's subtransient (`x1`), negative-sequence (`x2`)
/// and zero-sequence (`x0`) reactances in p.u.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    /// Real power setpoint in MW.
    pub p_mw: f64,
    /// Reactive power setpoint in MVAr. Only honoured when the generator's bus is a PQ bus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_mvar: Option<f64>,
    /// Voltage magnitude setpoint in p.u.
    pub vm_pu: f64,
    pub x1_pu: f64,
    pub x2_pu: f64,
    pub x0_pu: f64,
    pub grounding: Grounding,
    /// Whether the generator regulates its bus voltage (makes the bus Slack or PV).
    pub voltage_controlled: bool,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            p_mw: 0.0,
            q_mvar: None,
            vm_pu: 1.0,
            x1_pu: 0.12,
            x2_pu: 0.14,
            x0_pu: 0.05,
            grounding: Grounding::Solid,
            voltage_controlled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub name: String,
    pub bus: usize,
    pub params: GeneratorParams,
}

impl Generator {
    /// Specified complex injection in MVA. `include_q` is false at voltage-controlled buses,
    /// where reactive output is a result of the solve.
    pub fn injection_mva(&self, include_q: bool) -> Complex64 {
        let q = if include_q {
            self.params.q_mvar.unwrap_or(0.0)
        } else {
            0.0
        };
        Complex64::new(self.params.p_mw, q)
    }
}

impl NetworkElement for Generator {
    fn name(&self) -> &str {
        &self.name
    }

    fn primitive(&self, kind: SequenceNetwork, _config: &SystemConfig) -> Option<PrimitiveAdmittance> {
        let z = match kind {
            SequenceNetwork::Composite => return None,
            SequenceNetwork::Positive => Complex64::new(0.0, self.params.x1_pu),
            SequenceNetwork::Negative => Complex64::new(0.0, self.params.x2_pu),
            SequenceNetwork::Zero => {
                let zn = self.params.grounding.impedance()?;
                Complex64::new(0.0, self.params.x0_pu) + 3.0 * zn
            }
        };
        Some(PrimitiveAdmittance::Shunt {
            bus: self.bus,
            y: Admittance::from_impedance(z),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn shunt_y(g: &Generator, kind: SequenceNetwork) -> Option<Complex64> {
        match g.primitive(kind, &SystemConfig::default())? {
            PrimitiveAdmittance::Shunt { y, .. } => Some(y.0),
            PrimitiveAdmittance::Branch { .. } => panic!("generator is a shunt element"),
        }
    }

    #[test]
    fn sequence_admittances() {
        let g = Generator {
            name: "G1".into(),
            bus: 0,
            params: GeneratorParams {
                grounding: Grounding::Impedance(Complex64::new(0.1, 0.0)),
                ..Default::default()
            },
        };
        assert!(shunt_y(&g, SequenceNetwork::Composite).is_none());
        assert_relative_eq!(shunt_y(&g, SequenceNetwork::Positive).unwrap().im, -1.0 / 0.12, epsilon = 1e-12);
        assert_relative_eq!(shunt_y(&g, SequenceNetwork::Negative).unwrap().im, -1.0 / 0.14, epsilon = 1e-12);
        let y0 = shunt_y(&g, SequenceNetwork::Zero).unwrap();
        let expected = Complex64::new(0.3, 0.05).inv();
        assert_relative_eq!(y0.re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(y0.im, expected.im, epsilon = 1e-12);
    }

    #[test]
    fn ungrounded_generator_is_absent_from_zero_sequence() {
        let g = Generator {
            name: "G2".into(),
            bus: 1,
            params: GeneratorParams {
                grounding: Grounding::Ungrounded,
                ..Default::default()
            },
        };
        assert!(shunt_y(&g, SequenceNetwork::Zero).is_none());
    }

    #[test]
    fn reactive_setpoint_only_when_requested() {
        let g = Generator {
            name: "G3".into(),
            bus: 2,
            params: GeneratorParams {
                p_mw: 40.0,
                q_mvar: Some(10.0),
                ..Default::default()
            },
        };
        assert_eq!(g.injection_mva(true), Complex64::new(40.0, 10.0));
        assert_eq!(g.injection_mva(false), Complex64::new(40.0, 0.0));
    }
}
