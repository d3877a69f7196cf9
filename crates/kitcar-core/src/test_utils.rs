//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and, via the `test-utils` feature, in other
//! crates' tests.

use crate::behavior::{PartBehavior, PassiveBehavior};
use crate::capability::Capabilities;
use crate::definition::*;
use crate::fixed::Fixed64;
use crate::graph::PartGraph;
use crate::id::*;
use crate::part::PartInstance;
use crate::pose::Pose;
use crate::spawn::Spawner;
use crate::state::RuntimeState;
use glam::Vec3;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Definition templates
// ===========================================================================

/// A chassis with one bay per drivetrain part type and a hitch.
pub fn chassis_template(name: &str) -> DefinitionTemplate {
    DefinitionTemplate::new(name, DefinitionParams::Chassis)
        .with_socket(
            MountSocketSpec::new("engine_bay")
                .accepting(&[PartType::Engine])
                .at(Pose::from_translation(Vec3::new(0.0, 0.4, 1.2))),
        )
        .with_socket(
            MountSocketSpec::new("gearbox_bay")
                .accepting(&[PartType::Gearbox])
                .at(Pose::from_translation(Vec3::new(0.0, 0.3, 0.4))),
        )
        .with_socket(
            MountSocketSpec::new("tank_bay")
                .accepting(&[PartType::FuelTank])
                .requiring(Capabilities::FLUID_SOURCE)
                .at(Pose::from_translation(Vec3::new(0.0, 0.2, -1.5))),
        )
        .with_socket(MountSocketSpec::new("hitch").accepting(&[PartType::Chassis]))
}

/// Idle 800 RPM, 50 Nm at idle.
pub fn engine_template(name: &str) -> DefinitionTemplate {
    let curve = [(500.0, 40.0), (800.0, 50.0), (3000.0, 120.0), (6000.0, 90.0)]
        .into_iter()
        .map(|(rpm, torque)| TorquePoint {
            rpm: fixed(rpm),
            torque: fixed(torque),
        })
        .collect();
    DefinitionTemplate::new(
        name,
        DefinitionParams::Engine(EngineParams {
            torque_curve: curve,
            idle_rpm: fixed(800.0),
            stall_rpm: fixed(400.0),
            max_rpm: fixed(6500.0),
            inertia: fixed(0.25),
            friction_torque: fixed(20.0),
            starter_torque: fixed(40.0),
            fuel_capacity: fixed(5.0),
            oil_capacity: fixed(4.0),
            coolant_capacity: fixed(6.0),
            fuel_consumption: fixed(0.000_02),
            fuel_feed_rate: fixed(0.5),
            oil_consumption: fixed(0.000_1),
            ambient_temperature: fixed(20.0),
            heat_rate: fixed(2.0),
            cooling_rate: fixed(0.05),
            seize_temperature: fixed(130.0),
            wear_rate: fixed(0.000_05),
        }),
    )
    .with_socket(
        MountSocketSpec::new(sockets::OUTPUT).requiring(Capabilities::TORQUE_RECEIVER),
    )
    .with_socket(
        MountSocketSpec::new(sockets::FUEL_LINE)
            .accepting(&[PartType::FuelTank])
            .requiring(Capabilities::FLUID_SOURCE),
    )
}

/// First gear 3.0, final drive 3.5, 95% efficient. Plugs in by `input`.
pub fn gearbox_template(name: &str) -> DefinitionTemplate {
    DefinitionTemplate::new(
        name,
        DefinitionParams::Gearbox(GearboxParams {
            forward_ratios: vec![fixed(3.0), fixed(2.0), fixed(1.4), fixed(1.0), fixed(0.8)],
            reverse_ratio: fixed(-3.2),
            final_drive: fixed(3.5),
            efficiency: fixed(0.95),
            shift_duration: fixed(0.2),
            friction_torque: fixed(2.0),
        }),
    )
    .with_plug(sockets::INPUT)
    .with_socket(
        MountSocketSpec::new(sockets::OUTPUT).requiring(Capabilities::TORQUE_RECEIVER),
    )
}

pub fn wheel_template(name: &str) -> DefinitionTemplate {
    DefinitionTemplate::new(
        name,
        DefinitionParams::Wheel(WheelParams {
            radius: fixed(0.3),
            rolling_resistance: fixed(4.0),
            max_brake_torque: fixed(800.0),
            tread_wear_rate: fixed(0.000_000_1),
        }),
    )
}

/// 40 liter tank.
pub fn tank_template(name: &str) -> DefinitionTemplate {
    DefinitionTemplate::new(
        name,
        DefinitionParams::FuelTank(FuelTankParams {
            capacity: fixed(40.0),
        }),
    )
}

/// `test_chassis`, `test_engine`, `test_gearbox`, `test_wheel`, `test_tank`.
pub fn standard_registry() -> DefinitionRegistry {
    let mut builder = DefinitionRegistryBuilder::new();
    for template in [
        chassis_template("test_chassis"),
        engine_template("test_engine"),
        gearbox_template("test_gearbox"),
        wheel_template("test_wheel"),
        tank_template("test_tank"),
    ] {
        builder.register(template).unwrap();
    }
    builder.build().unwrap()
}

// ===========================================================================
// Passive behaviors
// ===========================================================================

/// The capabilities a real part of each type offers.
pub fn typical_capabilities(part_type: PartType) -> Capabilities {
    match part_type {
        PartType::Chassis => Capabilities::empty(),
        PartType::Engine => Capabilities::TORQUE_PROVIDER | Capabilities::FLUID_SINK,
        PartType::Gearbox => Capabilities::TORQUE_PROVIDER | Capabilities::TORQUE_RECEIVER,
        PartType::Wheel => Capabilities::TORQUE_RECEIVER,
        PartType::FuelTank => Capabilities::FLUID_SOURCE,
    }
}

pub fn passive_behavior(def: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(PassiveBehavior::new(def.part_type).with_capabilities(typical_capabilities(def.part_type)))
}

/// A spawner that gives every part type a tick-less behavior.
pub fn passive_spawner(registry: DefinitionRegistry) -> Spawner {
    let mut spawner = Spawner::new(registry);
    for part_type in PartType::ALL {
        spawner.register_behavior(part_type, passive_behavior);
    }
    spawner
}

// ===========================================================================
// Rig
// ===========================================================================

/// A graph plus a spawner over [`standard_registry`].
pub struct Rig {
    pub registry: DefinitionRegistry,
    pub spawner: Spawner,
    pub graph: PartGraph,
}

impl Rig {
    /// Passive behaviors for every part type.
    pub fn new() -> Self {
        let registry = standard_registry();
        Self {
            spawner: passive_spawner(registry.clone()),
            registry,
            graph: PartGraph::new(),
        }
    }

    /// Start from passive behaviors, then let `register` override some.
    pub fn with_behaviors(register: impl FnOnce(&mut Spawner)) -> Self {
        let mut rig = Self::new();
        register(&mut rig.spawner);
        rig
    }

    pub fn spawn(&mut self, name: &str) -> PartId {
        self.spawner
            .spawn_by_name(&mut self.graph, name, None)
            .unwrap()
    }

    /// Spawn with a passive behavior offering exactly `capabilities`.
    pub fn spawn_passive(&mut self, name: &str, capabilities: Capabilities) -> PartId {
        let def = self.registry.by_name(name).unwrap().clone();
        let behavior = PassiveBehavior::new(def.part_type).with_capabilities(capabilities);
        let part = self.graph.insert(PartInstance::new(Box::new(behavior)));
        self.graph
            .bind(part, RuntimeState::from_definition(&def), def)
            .unwrap();
        part
    }

    /// An engine behavior bound to a wheel definition: disabled, Unbound.
    pub fn spawn_misconfigured(&mut self) -> PartId {
        let def = self.registry.by_name("test_wheel").unwrap().clone();
        let behavior = PassiveBehavior::new(PartType::Engine);
        let part = self.graph.insert(PartInstance::new(Box::new(behavior)));
        let _ = self
            .graph
            .bind(part, RuntimeState::from_definition(&def), def);
        part
    }

    pub fn fuel_mut(&mut self, part: PartId) -> &mut Fixed64 {
        self.graph
            .get_mut(part)
            .and_then(|p| p.state_mut())
            .and_then(|s| s.fuel_mut())
            .unwrap()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}
