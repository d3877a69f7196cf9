//! Kitcar Drivetrain -- concrete part behaviors.
//!
//! Engine, gearbox, wheel and fuel-tank behaviors that plug into the
//! `kitcar-core` part graph. Call [`register_drivetrain`] on a
//! [`Spawner`] to make every spawned part of these types use them.
//!
//! Torque flows engine -> gearbox -> wheel through the core's
//! provider/receiver contract. Each stage pulls its upstream provider in
//! its own Pre phase; load is pushed back up by direct
//! `imposed_load_torque` calls.

pub mod curve;
pub mod engine;
pub mod gearbox;
pub mod tank;
pub mod wheel;

use kitcar_core::behavior::{PartBehavior, PassiveBehavior};
use kitcar_core::definition::PartDefinition;
use kitcar_core::fixed::Fixed64;
use kitcar_core::graph::PartGraph;
use kitcar_core::id::{PartId, PartType};
use kitcar_core::spawn::Spawner;
use kitcar_core::torque::TorqueOutput;

pub use engine::EngineBehavior;
pub use gearbox::GearboxBehavior;
pub use tank::FuelTankBehavior;
pub use wheel::WheelBehavior;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

fn chassis_behavior(_: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(PassiveBehavior::new(PartType::Chassis))
}

fn engine_behavior(_: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(EngineBehavior::new())
}

fn gearbox_behavior(_: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(GearboxBehavior::new())
}

fn wheel_behavior(_: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(WheelBehavior::new())
}

fn tank_behavior(_: &PartDefinition) -> Box<dyn PartBehavior> {
    Box::new(FuelTankBehavior::new())
}

/// Register a behavior factory for every part type. Replaces any factory
/// already registered for those types.
pub fn register_drivetrain(spawner: &mut Spawner) {
    spawner.register_behavior(PartType::Chassis, chassis_behavior);
    spawner.register_behavior(PartType::Engine, engine_behavior);
    spawner.register_behavior(PartType::Gearbox, gearbox_behavior);
    spawner.register_behavior(PartType::Wheel, wheel_behavior);
    spawner.register_behavior(PartType::FuelTank, tank_behavior);
}

// ---------------------------------------------------------------------------
// Graph accessors
// ---------------------------------------------------------------------------

/// Typed access to drivetrain behaviors for a physics integrator.
pub trait DrivetrainGraphExt {
    /// Report the road's resistance at a wheel. False if `part` is not a
    /// drivetrain wheel.
    fn set_wheel_ground_load(&mut self, part: PartId, load: Fixed64) -> bool;

    /// Torque delivered to a wheel in the last Pre phase.
    fn wheel_drive_torque(&self, part: PartId) -> Option<TorqueOutput>;

    fn engine_rpm(&self, part: PartId) -> Option<Fixed64>;

    /// Overwrite an engine's shaft speed, e.g. when the integrator couples
    /// it to the road through a closed clutch.
    fn set_engine_rpm(&mut self, part: PartId, rpm: Fixed64) -> bool;
}

impl DrivetrainGraphExt for PartGraph {
    fn set_wheel_ground_load(&mut self, part: PartId, load: Fixed64) -> bool {
        match self.behavior_mut::<WheelBehavior>(part) {
            Some(wheel) => {
                wheel.set_ground_load(load);
                true
            }
            None => false,
        }
    }

    fn wheel_drive_torque(&self, part: PartId) -> Option<TorqueOutput> {
        self.behavior::<WheelBehavior>(part).map(|w| w.drive())
    }

    fn engine_rpm(&self, part: PartId) -> Option<Fixed64> {
        self.behavior::<EngineBehavior>(part).map(|e| e.rpm())
    }

    fn set_engine_rpm(&mut self, part: PartId, rpm: Fixed64) -> bool {
        match self.behavior_mut::<EngineBehavior>(part) {
            Some(engine) => {
                engine.set_rpm(rpm);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcar_core::test_utils::{Rig, fixed};

    #[test]
    fn registers_every_part_type() {
        let rig = Rig::with_behaviors(register_drivetrain);
        for part_type in PartType::ALL {
            assert!(rig.spawner.has_behavior(part_type));
        }
    }

    #[test]
    fn spawned_parts_get_drivetrain_behaviors() {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let engine = rig.spawn("test_engine");
        let wheel = rig.spawn("test_wheel");
        let tank = rig.spawn("test_tank");
        assert!(rig.graph.behavior::<EngineBehavior>(engine).is_some());
        assert!(rig.graph.behavior::<WheelBehavior>(wheel).is_some());
        assert!(rig.graph.behavior::<FuelTankBehavior>(tank).is_some());
    }

    #[test]
    fn accessors_reject_wrong_part_kind() {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let engine = rig.spawn("test_engine");
        let wheel = rig.spawn("test_wheel");

        assert!(!rig.graph.set_wheel_ground_load(engine, fixed(10.0)));
        assert!(rig.graph.set_wheel_ground_load(wheel, fixed(10.0)));
        assert_eq!(rig.graph.wheel_drive_torque(wheel), Some(TorqueOutput::ZERO));
        assert_eq!(rig.graph.wheel_drive_torque(engine), None);

        assert!(rig.graph.set_engine_rpm(engine, fixed(1200.0)));
        assert_eq!(rig.graph.engine_rpm(engine), Some(fixed(1200.0)));
        assert_eq!(rig.graph.engine_rpm(wheel), None);
        assert!(!rig.graph.set_engine_rpm(wheel, fixed(1.0)));
    }
}
