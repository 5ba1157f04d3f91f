//! Small reference networks with known solutions, used by the tests.

use num_complex::Complex64;

use crate::basic::{config::SystemConfig, elements::*, network::Network};

/// Converts a grounding resistance in ohms to p.u. on the bus base.
fn neutral_pu(ohms: f64, v_base_kv: f64, config: &SystemConfig) -> Complex64 {
    Complex64::new(ohms / config.z_base(v_base_kv), 0.0)
}

/// Slack bus feeding a 50 MW + 30 MVAr load through a single series impedance.
///
/// The load bus settles at `|V| = 0.97085 p.u.`, `δ = -0.02472 rad`.
pub fn two_bus() -> (Network, SystemConfig) {
    let config = SystemConfig::default();
    let mut net = Network::new();
    let build = |net: &mut Network| -> Result<(), crate::basic::error::ConfigurationError> {
        net.add_bus("Bus1", 230.0)?;
        net.add_bus("Bus2", 230.0)?;
        net.add_line("L12", "Bus1", "Bus2", LineParams::new(0.02, 0.06, 0.0))?;
        net.add_generator("G1", "Bus1", GeneratorParams::default())?;
        net.add_load(
            "Load2",
            "Bus2",
            LoadParams {
                p_mw: 50.0,
                q_mvar: 30.0,
            },
        )
    };
    if let Err(err) = build(&mut net) {
        unreachable!("two-bus case is consistent: {err}");
    }
    (net, config)
}

/// Seven-bus, 230 kV system with two generators, two transformers and three loads.
///
/// * `Bus1` (20 kV): slack generator `G1`, solidly grounded, behind delta/grounded-wye `T1`.
/// * `Bus7` (18 kV): `G2` at 200 MW, 1.0 p.u., grounded through 1 Ω, behind
///   delta/ungrounded-wye `T2`.
/// * loads at `Bus3`, `Bus4`, `Bus5`.
pub fn seven_bus() -> (Network, SystemConfig) {
    let config = SystemConfig::default();
    let mut net = Network::new();
    if let Err(err) = build_seven_bus(&mut net, &config) {
        unreachable!("seven-bus case is consistent: {err}");
    }
    (net, config)
}

fn build_seven_bus(
    net: &mut Network,
    config: &SystemConfig,
) -> Result<(), crate::basic::error::ConfigurationError> {
    net.add_bus("Bus1", 20.0)?;
    for name in ["Bus2", "Bus3", "Bus4", "Bus5", "Bus6"] {
        net.add_bus(name, 230.0)?;
    }
    net.add_bus("Bus7", 18.0)?;

    let lines = [
        ("L1", "Bus2", "Bus4", 0.00364, 0.01115, 0.03754),
        ("L2", "Bus2", "Bus3", 0.00910, 0.02788, 0.09384),
        ("L3", "Bus3", "Bus5", 0.00728, 0.02230, 0.07507),
        ("L4", "Bus4", "Bus6", 0.00728, 0.02230, 0.07507),
        ("L5", "Bus5", "Bus6", 0.00364, 0.01115, 0.03754),
        ("L6", "Bus4", "Bus5", 0.01274, 0.03903, 0.13138),
    ];
    for (name, from, to, r, x, b) in lines {
        net.add_line(name, from, to, LineParams::new(r, x, b))?;
    }

    net.add_transformer(
        "T1",
        "Bus1",
        "Bus2",
        TransformerParams {
            r_pu: 0.00677,
            x_pu: 0.06766,
            from_winding: Winding::Delta,
            to_winding: Winding::Wye(Grounding::Impedance(neutral_pu(1.0, 230.0, config))),
        },
    )?;
    net.add_transformer(
        "T2",
        "Bus6",
        "Bus7",
        TransformerParams {
            r_pu: 0.00436,
            x_pu: 0.05232,
            from_winding: Winding::Delta,
            to_winding: Winding::Wye(Grounding::Ungrounded),
        },
    )?;

    net.add_generator("G1", "Bus1", GeneratorParams::default())?;
    net.add_generator(
        "G2",
        "Bus7",
        GeneratorParams {
            p_mw: 200.0,
            vm_pu: 1.0,
            grounding: Grounding::Impedance(neutral_pu(1.0, 18.0, config)),
            ..Default::default()
        },
    )?;

    for (name, bus, p_mw, q_mvar) in [
        ("Load3", "Bus3", 110.0, 50.0),
        ("Load4", "Bus4", 100.0, 70.0),
        ("Load5", "Bus5", 100.0, 65.0),
    ] {
        net.add_load(name, bus, LoadParams { p_mw, q_mvar })?;
    }
    Ok(())
}
