//! Symmetrical-component fault analysis.
//!
//! Faults are evaluated from the driving-point and transfer impedances of the sequence
//! impedance matrices, so a study only needs the prefault voltage at the faulted bus and
//! does not depend on a converged power flow.

mod components;

use std::str::FromStr;

use derive_more::Display;
use log::debug;
use num_complex::Complex64;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

pub use components::*;

use super::{
    elements::SequenceNetwork,
    error::FaultError,
    system::{SequenceImpedances, ZBus},
};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultType {
    #[display("three-phase")]
    ThreePhase,
    #[display("line-to-ground")]
    LineToGround,
    #[display("line-to-line")]
    LineToLine,
    #[display("double line-to-ground")]
    DoubleLineToGround,
}

impl FaultType {
    /// Sequence impedance matrices a study of this type reads.
    pub fn required_sequences(&self) -> &'static [SequenceNetwork] {
        match self {
            FaultType::ThreePhase => &[SequenceNetwork::Positive],
            FaultType::LineToLine => &[SequenceNetwork::Positive, SequenceNetwork::Negative],
            FaultType::LineToGround | FaultType::DoubleLineToGround => &[
                SequenceNetwork::Positive,
                SequenceNetwork::Negative,
                SequenceNetwork::Zero,
            ],
        }
    }
}

impl FromStr for FaultType {
    type Err = FaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3ph" | "three-phase" | "symmetrical" => Ok(FaultType::ThreePhase),
            "lg" | "slg" | "line-to-ground" => Ok(FaultType::LineToGround),
            "ll" | "line-to-line" => Ok(FaultType::LineToLine),
            "dlg" | "llg" | "double-line-to-ground" => Ok(FaultType::DoubleLineToGround),
            other => Err(FaultError::InvalidFaultSelection(format!(
                "unknown fault type `{other}`"
            ))),
        }
    }
}

/// A fault study at one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRequest {
    pub bus: String,
    pub fault_type: FaultType,
    /// Fault impedance in p.u.; zero for a bolted fault.
    pub zf: Complex64,
    /// Prefault voltage at the faulted bus in p.u.
    pub v_prefault: Complex64,
}

impl FaultRequest {
    /// Bolted fault with a 1.0 p.u. prefault voltage.
    pub fn new(bus: &str, fault_type: FaultType) -> Self {
        Self {
            bus: bus.to_owned(),
            fault_type,
            zf: Complex64::zero(),
            v_prefault: Complex64::one(),
        }
    }

    pub fn with_impedance(mut self, zf: Complex64) -> Self {
        self.zf = zf;
        self
    }

    pub fn with_prefault(mut self, v_prefault: Complex64) -> Self {
        self.v_prefault = v_prefault;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultCurrents {
    pub sequence: SequenceComponents,
    pub phase: PhaseComponents,
    /// Headline current of the fault type: `I1` for three-phase, `Ia = 3·I0` for
    /// line-to-ground, and the line current `√3·I1` for the line-to-line types.
    pub fault_current: Complex64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusFaultVoltage {
    pub bus: usize,
    pub sequence: SequenceComponents,
    pub phase: PhaseComponents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultResult {
    pub bus: usize,
    pub fault_type: FaultType,
    pub currents: FaultCurrents,
    /// Post-fault voltages of every bus, in canonical order.
    pub voltages: Vec<BusFaultVoltage>,
}

/// Fault currents and post-fault bus voltages for a fault at bus index `bus`.
///
/// The bus index is checked first, then all sequence matrices the fault type needs; a missing
/// one fails with [`FaultError::NetworkNotInvertible`]. Post-fault sequence voltages
/// are `V1_k = Vpre − Z1_kn·I1`, `V2_k = −Z2_kn·I2` and `V0_k = −Z0_kn·I0`.
pub fn analyze_fault(
    bus: usize,
    request: &FaultRequest,
    impedances: &SequenceImpedances,
) -> Result<FaultResult, FaultError> {
    let (zf, vpre) = (request.zf, request.v_prefault);
    if !(zf.re.is_finite() && zf.im.is_finite() && vpre.re.is_finite() && vpre.im.is_finite()) {
        return Err(FaultError::InvalidFaultSelection(
            "fault impedance and prefault voltage must be finite".into(),
        ));
    }

    if bus >= impedances.n_bus {
        return Err(FaultError::InvalidFaultSelection(format!(
            "bus index {bus} outside a {}-bus network",
            impedances.n_bus
        )));
    }

    let fault_type = request.fault_type;
    let mut zbus: [Option<&ZBus>; 3] = [None; 3];
    for &seq in fault_type.required_sequences() {
        zbus[slot(seq)] = Some(impedances.get(seq)?);
    }
    let z1 = zbus[1].ok_or(FaultError::NetworkNotInvertible {
        sequence: SequenceNetwork::Positive,
    })?;
    let divide = |num: Complex64, den: Complex64| {
        if den.is_zero() {
            Err(FaultError::ZeroFaultImpedance { bus, fault_type })
        } else {
            Ok(num / den)
        }
    };
    let driving = |z: Option<&ZBus>| z.map_or(Complex64::zero(), |z| z.driving_point(bus));
    let (z0_nn, z1_nn, z2_nn) = (driving(zbus[0]), driving(zbus[1]), driving(zbus[2]));
    let zero = Complex64::zero();
    let sqrt3 = 3.0_f64.sqrt();

    let (i0, i1, i2, fault_current) = match fault_type {
        FaultType::ThreePhase => {
            let i1 = divide(vpre, z1_nn + zf)?;
            (zero, i1, zero, i1)
        }
        FaultType::LineToGround => {
            let i = divide(vpre, z0_nn + z1_nn + z2_nn + 3.0 * zf)?;
            (i, i, i, 3.0 * i)
        }
        FaultType::LineToLine => {
            let i1 = divide(vpre, z1_nn + z2_nn + zf)?;
            (zero, i1, -i1, sqrt3 * i1)
        }
        FaultType::DoubleLineToGround => {
            let z0f = z0_nn + 3.0 * zf;
            let parallel = divide(z2_nn * z0f, z2_nn + z0f)?;
            let i1 = divide(vpre, z1_nn + parallel)?;
            let i2 = -i1 * z0f / (z2_nn + z0f);
            let i0 = -i1 * z2_nn / (z2_nn + z0f);
            (i0, i1, i2, sqrt3 * i1)
        }
    };
    let sequence = SequenceComponents::new(i0, i1, i2);
    debug!(
        "{fault_type} fault at bus {bus}: |If| = {:.4} p.u.",
        fault_current.norm()
    );

    let transfer = |z: Option<&ZBus>, k: usize| z.map_or(zero, |z| z.get(k, bus));
    let voltages = (0..z1.n_bus())
        .map(|k| {
            let v = SequenceComponents::new(
                -transfer(zbus[0], k) * i0,
                vpre - transfer(zbus[1], k) * i1,
                -transfer(zbus[2], k) * i2,
            );
            BusFaultVoltage {
                bus: k,
                sequence: v,
                phase: v.to_phase(),
            }
        })
        .collect();

    Ok(FaultResult {
        bus,
        fault_type,
        currents: FaultCurrents {
            sequence,
            phase: sequence.to_phase(),
            fault_current,
        },
        voltages,
    })
}

#[inline(always)]
fn slot(seq: SequenceNetwork) -> usize {
    match seq {
        SequenceNetwork::Zero => 0,
        SequenceNetwork::Positive | SequenceNetwork::Composite => 1,
        SequenceNetwork::Negative => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::{
        config::SystemConfig,
        elements::*,
        network::Network,
        system::SystemMatrices,
    };
    use crate::testcases;
    use approx::assert_relative_eq;

    fn seven_bus() -> SystemMatrices {
        let (net, cfg) = testcases::seven_bus();
        SystemMatrices::build(&net, &cfg)
    }

    fn va_magnitudes(r: &FaultResult) -> Vec<f64> {
        r.voltages.iter().map(|v| v.phase.a.norm()).collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-4, "Bus{}: {a} != {e}", i + 1);
        }
    }

    #[test]
    fn parses_fault_types() {
        assert_eq!("3ph".parse::<FaultType>().unwrap(), FaultType::ThreePhase);
        assert_eq!("LG".parse::<FaultType>().unwrap(), FaultType::LineToGround);
        assert_eq!("ll".parse::<FaultType>().unwrap(), FaultType::LineToLine);
        assert_eq!("dlg".parse::<FaultType>().unwrap(), FaultType::DoubleLineToGround);
        assert!(matches!(
            "5".parse::<FaultType>(),
            Err(FaultError::InvalidFaultSelection(_))
        ));
    }

    #[test]
    fn three_phase_current_is_inverse_driving_point() {
        let m = seven_bus();
        let r = m.run_fault(&FaultRequest::new("Bus2", FaultType::ThreePhase)).unwrap();
        let z1 = m.zbus(SequenceNetwork::Positive).unwrap().driving_point(1);
        assert_relative_eq!(r.currents.fault_current.norm(), 1.0 / z1.norm(), epsilon = 1e-12);
        assert_relative_eq!(r.currents.fault_current.norm(), 12.14731, epsilon = 1e-4);
        for v in &r.voltages {
            assert_eq!(v.sequence.zero, Complex64::new(0.0, 0.0));
            assert_eq!(v.sequence.negative, Complex64::new(0.0, 0.0));
        }
        assert!(r.voltages[1].phase.a.norm() < 1e-12);
        assert_close(
            &va_magnitudes(&r),
            &[0.36211, 0.0, 0.06752, 0.05680, 0.10242, 0.12488, 0.39146],
        );
    }

    #[test]
    fn three_phase_fault_at_slack_bus() {
        let m = seven_bus();
        let r = m.run_fault(&FaultRequest::new("Bus1", FaultType::ThreePhase)).unwrap();
        let z1 = m.zbus(SequenceNetwork::Positive).unwrap().driving_point(0);
        assert_eq!(r.bus, 0);
        assert_relative_eq!(r.currents.fault_current.norm(), 1.0 / z1.norm(), epsilon = 1e-12);
        assert!(r.voltages[0].phase.a.norm() < 1e-12);
        // every other bus keeps part of its prefault voltage
        assert!(r.voltages[1..].iter().all(|v| v.phase.a.norm() > 0.0));
    }

    #[test]
    fn line_to_ground_regression() {
        let m = seven_bus();
        let r = m.run_fault(&FaultRequest::new("Bus2", FaultType::LineToGround)).unwrap();
        let s = r.currents.sequence;
        assert_eq!(s.zero, s.positive);
        assert_eq!(s.negative, s.positive);
        assert_relative_eq!(r.currents.phase.a.norm(), 12.37319, epsilon = 1e-4);
        assert_relative_eq!(r.currents.fault_current.norm(), 12.37319, epsilon = 1e-4);
        assert!(r.currents.phase.b.norm() < 1e-9);
        assert_close(
            &va_magnitudes(&r),
            &[0.53472, 0.0, 0.04396, 0.03681, 0.06645, 0.08141, 0.55581],
        );
    }

    #[test]
    fn line_to_line_regression() {
        let m = seven_bus();
        let r = m.run_fault(&FaultRequest::new("Bus2", FaultType::LineToLine)).unwrap();
        assert_eq!(r.currents.sequence.negative, -r.currents.sequence.positive);
        assert_relative_eq!(r.currents.fault_current.norm(), 10.08860, epsilon = 1e-4);
        assert_relative_eq!(r.currents.phase.b.norm(), 10.08860, epsilon = 1e-4);
        assert!(r.currents.phase.a.norm() < 1e-9);
        assert_close(
            &va_magnitudes(&r),
            &[1.04456, 1.04107, 1.04023, 1.04067, 1.04045, 1.04096, 1.04323],
        );
    }

    #[test]
    fn double_line_to_ground_regression() {
        let m = seven_bus();
        let r = m
            .run_fault(&FaultRequest::new("Bus2", FaultType::DoubleLineToGround))
            .unwrap();
        let s = r.currents.sequence;
        assert_relative_eq!(s.positive.norm(), 8.20285, epsilon = 1e-4);
        assert_relative_eq!((3.0 * s.zero).norm(), 13.73186, epsilon = 1e-4);
        assert_relative_eq!(r.currents.phase.b.norm(), 11.99112, epsilon = 1e-4);
        // KCL at the fault: I0 + I1 + I2 = Ia = 0
        assert!(r.currents.phase.a.norm() < 1e-9);
        assert_close(
            &va_magnitudes(&r),
            &[0.78714, 0.97459, 1.00231, 0.99804, 1.01673, 1.02499, 0.79755],
        );
    }

    #[test]
    fn double_line_to_ground_approaches_line_to_line_with_open_ground() {
        let m = seven_bus();
        let ll = m.run_fault(&FaultRequest::new("Bus2", FaultType::LineToLine)).unwrap();
        let dlg = m
            .run_fault(
                &FaultRequest::new("Bus2", FaultType::DoubleLineToGround)
                    .with_impedance(Complex64::new(1e9, 0.0)),
            )
            .unwrap();
        assert!((dlg.currents.sequence.positive - ll.currents.sequence.positive).norm() < 1e-6);
        assert!(dlg.currents.sequence.zero.norm() < 1e-6);
    }

    #[test]
    fn unknown_bus_is_invalid_selection() {
        let m = seven_bus();
        assert!(matches!(
            m.run_fault(&FaultRequest::new("Bus9", FaultType::ThreePhase)),
            Err(FaultError::InvalidFaultSelection(_))
        ));
    }

    #[test]
    fn cancelling_fault_impedance_is_reported() {
        let m = seven_bus();
        let z1 = m.zbus(SequenceNetwork::Positive).unwrap().driving_point(1);
        let request = FaultRequest::new("Bus2", FaultType::ThreePhase).with_impedance(-z1);
        assert_eq!(
            m.run_fault(&request).unwrap_err(),
            FaultError::ZeroFaultImpedance {
                bus: 1,
                fault_type: FaultType::ThreePhase
            }
        );
    }

    #[test]
    fn bus_range_is_checked_before_matrices() {
        let mut net = Network::new();
        net.add_bus("A", 20.0).unwrap();
        net.add_generator(
            "G",
            "A",
            GeneratorParams {
                grounding: Grounding::Ungrounded,
                ..Default::default()
            },
        )
        .unwrap();
        let m = SystemMatrices::build(&net, &SystemConfig::default());
        assert!(m.zbus(SequenceNetwork::Zero).is_err());
        let request = FaultRequest::new("A", FaultType::LineToGround);
        assert!(matches!(
            analyze_fault(5, &request, &m.impedances),
            Err(FaultError::InvalidFaultSelection(_))
        ));
    }

    #[test]
    fn missing_zero_sequence_blocks_ground_faults_only() {
        let mut net = Network::new();
        net.add_bus("A", 20.0).unwrap();
        net.add_bus("B", 20.0).unwrap();
        net.add_line("AB", "A", "B", LineParams::new(0.01, 0.1, 0.0)).unwrap();
        net.add_generator(
            "G",
            "A",
            GeneratorParams {
                grounding: Grounding::Ungrounded,
                ..Default::default()
            },
        )
        .unwrap();
        let m = SystemMatrices::build(&net, &SystemConfig::default());
        for ft in [FaultType::LineToGround, FaultType::DoubleLineToGround] {
            assert_eq!(
                m.run_fault(&FaultRequest::new("B", ft)).unwrap_err(),
                FaultError::NetworkNotInvertible {
                    sequence: SequenceNetwork::Zero
                }
            );
        }
        assert!(m.run_fault(&FaultRequest::new("B", FaultType::ThreePhase)).is_ok());
        assert!(m.run_fault(&FaultRequest::new("B", FaultType::LineToLine)).is_ok());
    }

    #[test]
    fn prefault_voltage_scales_currents() {
        let m = seven_bus();
        let base = m.run_fault(&FaultRequest::new("Bus4", FaultType::LineToGround)).unwrap();
        let scaled = m
            .run_fault(
                &FaultRequest::new("Bus4", FaultType::LineToGround)
                    .with_prefault(Complex64::new(1.05, 0.0)),
            )
            .unwrap();
        assert_relative_eq!(
            scaled.currents.fault_current.norm(),
            1.05 * base.currents.fault_current.norm(),
            epsilon = 1e-9
        );
    }
}
