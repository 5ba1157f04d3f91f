use std::collections::HashSet;

use bevy_ecs::prelude::*;
use log::debug;
use nalgebra::DVector;
use num_complex::Complex64;
use num_traits::Zero;

use super::{
    config::SystemConfig,
    elements::*,
    error::ConfigurationError,
    newtonpf::{BusPartition, BusState},
};

/// Buses and the elements connecting them, with bus names resolved to canonical indices.
///
/// All configuration errors are raised by the `add_*` methods, so the network is never left
/// half-updated: an element is stored only after its name, buses and parameters are checked.
/// Bus roles are assigned while generators are added: the first voltage-controlling generator
/// makes its bus the slack bus, later ones make their buses PV.
#[derive(Debug, Clone, Default, Resource)]
pub struct Network {
    buses: Vec<Bus>,
    lookup: NodeLookup,
    lines: Vec<Line>,
    transformers: Vec<Transformer>,
    generators: Vec<Generator>,
    loads: Vec<Load>,
    shunts: Vec<Shunt>,
    element_names: HashSet<String>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, name: &str, v_base_kv: f64) -> Result<usize, ConfigurationError> {
        if !(v_base_kv.is_finite() && v_base_kv > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: format!("base voltage must be positive, got {v_base_kv}"),
            });
        }
        let idx = self
            .lookup
            .insert(name)
            .ok_or_else(|| ConfigurationError::DuplicateBus(name.to_owned()))?;
        self.buses.push(Bus {
            name: name.to_owned(),
            v_base_kv,
            role: BusRole::PQ,
        });
        Ok(idx)
    }

    pub fn add_line(
        &mut self,
        name: &str,
        from: &str,
        to: &str,
        params: LineParams,
    ) -> Result<(), ConfigurationError> {
        let port = self.resolve_branch(name, from, to)?;
        check_impedance(name, params.r_pu, params.x_pu)?;
        let z0 = params.zero_sequence();
        check_impedance(name, z0.r0_pu, z0.x0_pu)?;
        self.element_names.insert(name.to_owned());
        self.lines.push(Line {
            name: name.to_owned(),
            port,
            params,
        });
        Ok(())
    }

    pub fn add_transformer(
        &mut self,
        name: &str,
        from: &str,
        to: &str,
        params: TransformerParams,
    ) -> Result<(), ConfigurationError> {
        let port = self.resolve_branch(name, from, to)?;
        check_impedance(name, params.r_pu, params.x_pu)?;
        let z = Complex64::new(params.r_pu, params.x_pu);
        let grounds = [
            params.from_winding.ground_path(),
            params.to_winding.ground_path(),
        ];
        for &zg in grounds.iter().flatten() {
            check_ground_path(name, "winding ground", z + 3.0 * zg)?;
        }
        if let [Some(zg_from), Some(zg_to)] = grounds {
            check_ground_path(name, "zero-sequence path", z + 3.0 * zg_from + 3.0 * zg_to)?;
        }
        self.element_names.insert(name.to_owned());
        self.transformers.push(Transformer {
            name: name.to_owned(),
            port,
            params,
        });
        Ok(())
    }

    pub fn add_generator(
        &mut self,
        name: &str,
        bus: &str,
        params: GeneratorParams,
    ) -> Result<(), ConfigurationError> {
        let bus = self.resolve_shunt(name, bus)?;
        for (label, x) in [("x1", params.x1_pu), ("x2", params.x2_pu)] {
            if !(x.is_finite() && x != 0.0) {
                return Err(ConfigurationError::InvalidParameter {
                    element: name.to_owned(),
                    reason: format!("{label} must be non-zero, got {x}"),
                });
            }
        }
        if !params.x0_pu.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: format!("x0 must be finite, got {}", params.x0_pu),
            });
        }
        if let Some(zn) = params.grounding.impedance() {
            check_ground_path(name, "x0 + 3Zn", Complex64::new(0.0, params.x0_pu) + 3.0 * zn)?;
        }
        if params.voltage_controlled && !(params.vm_pu.is_finite() && params.vm_pu > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: format!("voltage setpoint must be positive, got {}", params.vm_pu),
            });
        }
        if params.voltage_controlled {
            let role = if self.slack_bus().is_none() {
                BusRole::Slack
            } else {
                BusRole::PV
            };
            let current = &mut self.buses[bus].role;
            if *current == BusRole::PQ {
                debug!("generator `{name}` makes bus `{}` {role:?}", self.lookup.forward[bus]);
                *current = role;
            }
        }
        self.element_names.insert(name.to_owned());
        self.generators.push(Generator {
            name: name.to_owned(),
            bus,
            params,
        });
        Ok(())
    }

    pub fn add_load(
        &mut self,
        name: &str,
        bus: &str,
        params: LoadParams,
    ) -> Result<(), ConfigurationError> {
        let bus = self.resolve_shunt(name, bus)?;
        if !(params.p_mw.is_finite() && params.q_mvar.is_finite()) {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: "load demand must be finite".into(),
            });
        }
        self.element_names.insert(name.to_owned());
        self.loads.push(Load {
            name: name.to_owned(),
            bus,
            params,
        });
        Ok(())
    }

    pub fn add_shunt(
        &mut self,
        name: &str,
        bus: &str,
        params: ShuntParams,
    ) -> Result<(), ConfigurationError> {
        let bus = self.resolve_shunt(name, bus)?;
        if !(params.g_pu.is_finite() && params.b_pu.is_finite()) {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: format!("shunt admittance {}+j{} is not finite", params.g_pu, params.b_pu),
            });
        }
        self.element_names.insert(name.to_owned());
        self.shunts.push(Shunt {
            name: name.to_owned(),
            bus,
            params,
        });
        Ok(())
    }

    /// Moves the slack role to `name`, which must host a voltage-controlling generator.
    /// The previous slack bus becomes a PV bus.
    pub fn set_slack_bus(&mut self, name: &str) -> Result<(), ConfigurationError> {
        let idx = self.lookup.index(name).ok_or_else(|| ConfigurationError::UnknownBus {
            element: "slack".into(),
            bus: name.to_owned(),
        })?;
        if self.voltage_setpoint(idx).is_none() {
            return Err(ConfigurationError::NoGenerator(name.to_owned()));
        }
        if let Some(old) = self.slack_bus() {
            self.buses[old].role = BusRole::PV;
        }
        self.buses[idx].role = BusRole::Slack;
        Ok(())
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn lookup(&self) -> &NodeLookup {
        &self.lookup
    }

    #[inline(always)]
    pub fn bus_index(&self, name: &str) -> Option<usize> {
        self.lookup.index(name)
    }

    #[inline(always)]
    pub fn n_bus(&self) -> usize {
        self.buses.len()
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn slack_bus(&self) -> Option<usize> {
        self.buses.iter().position(|b| b.role == BusRole::Slack)
    }

    /// Every element in the network, in no particular order.
    pub fn elements(&self) -> impl Iterator<Item = &dyn NetworkElement> + '_ {
        let lines = self.lines.iter().map(|e| e as &dyn NetworkElement);
        let transformers = self.transformers.iter().map(|e| e as &dyn NetworkElement);
        let generators = self.generators.iter().map(|e| e as &dyn NetworkElement);
        let loads = self.loads.iter().map(|e| e as &dyn NetworkElement);
        let shunts = self.shunts.iter().map(|e| e as &dyn NetworkElement);
        lines
            .chain(transformers)
            .chain(generators)
            .chain(loads)
            .chain(shunts)
    }

    pub fn partition(&self) -> Result<BusPartition, ConfigurationError> {
        if self.buses.is_empty() {
            return Err(ConfigurationError::EmptyNetwork);
        }
        let roles: Vec<BusRole> = self.buses.iter().map(|b| b.role).collect();
        BusPartition::from_roles(&roles)
    }

    /// Net specified complex injection per bus, in p.u. on the system base.
    ///
    /// Generator reactive setpoints only count at PQ buses; at slack and PV buses the reactive
    /// output is an unknown of the power flow.
    pub fn specified_injections(&self, config: &SystemConfig) -> DVector<Complex64> {
        let mut s = DVector::from_element(self.n_bus(), Complex64::zero());
        for g in &self.generators {
            let include_q = self.buses[g.bus].role == BusRole::PQ;
            s[g.bus] += g.injection_mva(include_q);
        }
        for l in &self.loads {
            s[l.bus] -= l.demand_mva();
        }
        s / Complex64::new(config.s_base_mva, 0.0)
    }

    /// Flat start, seeded with generator voltage setpoints at slack and PV buses and the
    /// configured slack angle.
    pub fn initial_state(&self, config: &SystemConfig) -> BusState {
        let mut state = BusState::flat(self.n_bus());
        for (i, bus) in self.buses.iter().enumerate() {
            if bus.role == BusRole::PQ {
                continue;
            }
            if let Some(vm) = self.voltage_setpoint(i) {
                state.vm[i] = vm;
            }
            if bus.role == BusRole::Slack {
                state.va[i] = config.slack_angle_rad();
            }
        }
        state
    }

    /// Voltage setpoint of the first voltage-controlling generator at `bus`.
    fn voltage_setpoint(&self, bus: usize) -> Option<f64> {
        self.generators
            .iter()
            .find(|g| g.bus == bus && g.params.voltage_controlled)
            .map(|g| g.params.vm_pu)
    }

    fn check_name(&self, name: &str) -> Result<(), ConfigurationError> {
        if self.element_names.contains(name) {
            return Err(ConfigurationError::DuplicateElement(name.to_owned()));
        }
        Ok(())
    }

    fn resolve(&self, element: &str, bus: &str) -> Result<usize, ConfigurationError> {
        self.lookup
            .index(bus)
            .ok_or_else(|| ConfigurationError::UnknownBus {
                element: element.to_owned(),
                bus: bus.to_owned(),
            })
    }

    fn resolve_shunt(&self, name: &str, bus: &str) -> Result<usize, ConfigurationError> {
        self.check_name(name)?;
        self.resolve(name, bus)
    }

    fn resolve_branch(&self, name: &str, from: &str, to: &str) -> Result<Port2, ConfigurationError> {
        self.check_name(name)?;
        let port = Port2::new(self.resolve(name, from)?, self.resolve(name, to)?);
        if port[0] == port[1] {
            return Err(ConfigurationError::InvalidParameter {
                element: name.to_owned(),
                reason: format!("both terminals connect to bus `{from}`"),
            });
        }
        Ok(port)
    }
}

fn check_impedance(element: &str, r: f64, x: f64) -> Result<(), ConfigurationError> {
    if !(r.is_finite() && x.is_finite()) || (r == 0.0 && x == 0.0) {
        return Err(ConfigurationError::InvalidParameter {
            element: element.to_owned(),
            reason: format!("series impedance {r}+j{x} is not usable"),
        });
    }
    Ok(())
}

/// A grounded zero-sequence path must have a finite, non-zero impedance.
fn check_ground_path(element: &str, what: &str, z: Complex64) -> Result<(), ConfigurationError> {
    if !(z.re.is_finite() && z.im.is_finite()) || z.is_zero() {
        return Err(ConfigurationError::InvalidParameter {
            element: element.to_owned(),
            reason: format!("{what} impedance {z} is not usable"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_bus() -> Network {
        let mut net = Network::new();
        for name in ["A", "B", "C"] {
            net.add_bus(name, 230.0).unwrap();
        }
        net.add_line("AB", "A", "B", LineParams::new(0.01, 0.1, 0.0)).unwrap();
        net.add_line("BC", "B", "C", LineParams::new(0.01, 0.1, 0.0)).unwrap();
        net
    }

    #[test]
    fn first_generator_becomes_slack_then_pv() {
        let mut net = three_bus();
        net.add_generator("G1", "B", GeneratorParams::default()).unwrap();
        net.add_generator("G2", "C", GeneratorParams::default()).unwrap();
        let roles: Vec<_> = net.buses().iter().map(|b| b.role).collect();
        assert_eq!(roles, vec![BusRole::PQ, BusRole::Slack, BusRole::PV]);
    }

    #[test]
    fn set_slack_bus_moves_the_role() {
        let mut net = three_bus();
        net.add_generator("G1", "B", GeneratorParams::default()).unwrap();
        net.add_generator("G2", "C", GeneratorParams::default()).unwrap();
        net.set_slack_bus("C").unwrap();
        assert_eq!(net.slack_bus(), Some(2));
        assert_eq!(net.buses()[1].role, BusRole::PV);
        assert_eq!(
            net.set_slack_bus("A"),
            Err(ConfigurationError::NoGenerator("A".into()))
        );
    }

    #[test]
    fn configuration_errors_are_reported_immediately() {
        let mut net = three_bus();
        assert_eq!(
            net.add_bus("A", 230.0),
            Err(ConfigurationError::DuplicateBus("A".into()))
        );
        assert_eq!(
            net.add_line("AB", "A", "C", LineParams::new(0.01, 0.1, 0.0)),
            Err(ConfigurationError::DuplicateElement("AB".into()))
        );
        assert_eq!(
            net.add_load(
                "LX",
                "X",
                LoadParams {
                    p_mw: 1.0,
                    q_mvar: 0.0
                }
            ),
            Err(ConfigurationError::UnknownBus {
                element: "LX".into(),
                bus: "X".into()
            })
        );
        assert!(matches!(
            net.add_line("AC", "A", "C", LineParams::new(0.0, 0.0, 0.0)),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        // rejected elements leave no trace
        assert!(net.add_line("AC", "A", "C", LineParams::new(0.01, 0.1, 0.0)).is_ok());
    }

    #[test]
    fn non_finite_shunt_is_rejected() {
        let mut net = three_bus();
        let nan = ShuntParams {
            g_pu: f64::NAN,
            b_pu: 0.1,
            grounded: true,
        };
        assert!(matches!(
            net.add_shunt("S", "B", nan),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        assert_eq!(net.elements().count(), 2);
    }

    #[test]
    fn zero_sequence_parameters_are_validated() {
        let mut net = three_bus();
        let bolted_x0 = GeneratorParams {
            x0_pu: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            net.add_generator("G0", "A", bolted_x0.clone()),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        // without a ground path x0 = 0 never enters a matrix
        let floating = GeneratorParams {
            grounding: Grounding::Ungrounded,
            ..bolted_x0
        };
        assert!(net.add_generator("G0", "A", floating).is_ok());

        let bad_neutral = GeneratorParams {
            grounding: Grounding::Impedance(Complex64::new(f64::INFINITY, 0.0)),
            ..Default::default()
        };
        assert!(matches!(
            net.add_generator("G1", "B", bad_neutral),
            Err(ConfigurationError::InvalidParameter { .. })
        ));

        let cancelling = TransformerParams {
            r_pu: 0.0,
            x_pu: 0.75,
            from_winding: Winding::Delta,
            to_winding: Winding::Wye(Grounding::Impedance(Complex64::new(0.0, -0.25))),
        };
        assert!(matches!(
            net.add_transformer("T1", "A", "C", cancelling),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        let nan_ground = TransformerParams {
            r_pu: 0.01,
            x_pu: 0.06,
            from_winding: Winding::Wye(Grounding::Impedance(Complex64::new(f64::NAN, 0.0))),
            to_winding: Winding::Wye(Grounding::Solid),
        };
        assert!(matches!(
            net.add_transformer("T1", "A", "C", nan_ground),
            Err(ConfigurationError::InvalidParameter { .. })
        ));
        assert_eq!(net.generators().len(), 1);
    }

    #[test]
    fn partition_requires_slack() {
        let net = three_bus();
        assert_eq!(net.partition(), Err(ConfigurationError::MissingSlack));
        assert_eq!(Network::new().partition(), Err(ConfigurationError::EmptyNetwork));
    }

    #[test]
    fn reactive_setpoint_counts_only_at_pq_buses() {
        let mut net = three_bus();
        net.add_generator("G1", "A", GeneratorParams::default()).unwrap();
        net.add_generator(
            "G2",
            "B",
            GeneratorParams {
                p_mw: 50.0,
                q_mvar: Some(20.0),
                voltage_controlled: false,
                ..Default::default()
            },
        )
        .unwrap();
        net.add_generator(
            "G3",
            "C",
            GeneratorParams {
                p_mw: 30.0,
                q_mvar: Some(10.0),
                vm_pu: 1.02,
                ..Default::default()
            },
        )
        .unwrap();
        net.add_load(
            "LB",
            "B",
            LoadParams {
                p_mw: 80.0,
                q_mvar: 40.0,
            },
        )
        .unwrap();
        let s = net.specified_injections(&SystemConfig::default());
        assert_eq!(s[1], Complex64::new(-0.3, -0.2));
        assert_eq!(s[2], Complex64::new(0.3, 0.0));

        let state = net.initial_state(&SystemConfig::default());
        assert_eq!(state.vm[2], 1.02);
        assert_eq!(state.vm[1], 1.0);
    }
}
