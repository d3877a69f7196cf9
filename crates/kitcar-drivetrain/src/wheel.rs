//! Wheel: the end of a drivetrain chain.
//!
//! A wheel pulls torque from whatever it is plugged into and exposes it as
//! its drive torque for the physics integrator. The load it pushes back is
//! rolling resistance, braking, and whatever ground load the integrator
//! last reported.

use kitcar_core::behavior::{PartBehavior, TickContext};
use kitcar_core::capability::Capabilities;
use kitcar_core::definition::PartDefinition;
use kitcar_core::fixed::{Fixed64, clamp01};
use kitcar_core::graph::GraphView;
use kitcar_core::id::PartType;
use kitcar_core::state::RuntimeState;
use kitcar_core::torque::{TorqueOutput, TorqueReceiver};

#[derive(Debug, Clone, Default)]
pub struct WheelBehavior {
    drive: TorqueOutput,
    brake_torque: Fixed64,
    ground_load: Fixed64,
    rolling_resistance: Fixed64,
}

impl WheelBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Torque and RPM delivered to the wheel in the last Pre phase.
    pub fn drive(&self) -> TorqueOutput {
        self.drive
    }

    pub fn brake_torque(&self) -> Fixed64 {
        self.brake_torque
    }

    pub fn ground_load(&self) -> Fixed64 {
        self.ground_load
    }

    /// Resistance from the road, as computed by the physics integrator.
    /// Negative values are treated as zero.
    pub fn set_ground_load(&mut self, load: Fixed64) {
        self.ground_load = load.max(Fixed64::ZERO);
    }
}

impl TorqueReceiver for WheelBehavior {
    fn imposed_load_torque(&self, _at: GraphView<'_>) -> Fixed64 {
        self.rolling_resistance
            .saturating_add(self.brake_torque)
            .saturating_add(self.ground_load)
    }

    fn apply_received_torque(&mut self, torque: Fixed64, source_rpm: Fixed64) {
        self.drive = TorqueOutput::new(torque, source_rpm);
    }

    fn current_input_rpm(&self) -> Fixed64 {
        self.drive.rpm
    }
}

impl PartBehavior for WheelBehavior {
    fn part_type(&self) -> PartType {
        PartType::Wheel
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TORQUE_RECEIVER
    }

    fn reset_transient(&mut self, _state: &RuntimeState, definition: &PartDefinition) {
        self.drive = TorqueOutput::ZERO;
        self.brake_torque = Fixed64::ZERO;
        self.ground_load = Fixed64::ZERO;
        self.rolling_resistance = definition
            .wheel()
            .map(|p| p.rolling_resistance)
            .unwrap_or(Fixed64::ZERO);
    }

    fn pre_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let definition = ctx.definition;
        let Some(params) = definition.wheel() else {
            return;
        };
        self.rolling_resistance = params.rolling_resistance;
        self.brake_torque = clamp01(ctx.intent.brake) * params.max_brake_torque;

        let received = ctx
            .provider_at(&definition.plug)
            .map(|p| p.available_torque())
            .unwrap_or(TorqueOutput::ZERO);
        self.apply_received_torque(received.torque, received.rpm);

        ctx.state
            .add_wear(
                self.drive
                    .torque
                    .saturating_abs()
                    .saturating_mul(params.tread_wear_rate)
                    .saturating_mul(ctx.dt),
            );
    }

    fn as_receiver(&self) -> Option<&dyn TorqueReceiver> {
        Some(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_drivetrain;
    use kitcar_core::behavior::PassiveBehavior;
    use kitcar_core::id::sockets;
    use kitcar_core::mount::SocketRef;
    use kitcar_core::test_utils::{Rig, fixed};

    #[test]
    fn load_sums_rolling_brake_and_ground() {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        let gearbox = rig.spawn("test_gearbox");
        let wheel = rig.spawn("test_wheel");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));
        assert!(rig.graph.try_attach(&SocketRef::new(engine, sockets::OUTPUT), gearbox));
        assert!(rig.graph.try_attach(&SocketRef::new(gearbox, sockets::OUTPUT), wheel));

        rig.graph
            .set_intent(v, Fixed64::ZERO, fixed(0.5), Fixed64::ZERO, 0, false)
            .unwrap();
        rig.graph
            .behavior_mut::<WheelBehavior>(wheel)
            .unwrap()
            .set_ground_load(fixed(25.0));
        rig.graph.pre_physics_tick(v, fixed(0.02)).unwrap();

        let view = rig.graph.view(wheel).unwrap();
        let behavior = rig.graph.behavior::<WheelBehavior>(wheel).unwrap();
        assert_eq!(behavior.brake_torque(), fixed(400.0));
        assert_eq!(behavior.imposed_load_torque(view), fixed(4.0) + fixed(400.0) + fixed(25.0));
    }

    #[test]
    fn negative_ground_load_is_ignored() {
        let mut wheel = WheelBehavior::new();
        wheel.set_ground_load(fixed(-3.0));
        assert_eq!(wheel.ground_load(), Fixed64::ZERO);
    }

    #[test]
    fn unpowered_wheel_has_no_drive() {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let chassis = rig.spawn("test_chassis");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        // A passive gearbox offers the receiver contract but provides nothing.
        let gearbox = rig.spawn_passive(
            "test_gearbox",
            Capabilities::TORQUE_PROVIDER | Capabilities::TORQUE_RECEIVER,
        );
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "gearbox_bay"), gearbox));
        let wheel = rig.spawn("test_wheel");
        assert!(rig.graph.try_attach(&SocketRef::new(gearbox, sockets::OUTPUT), wheel));

        rig.graph.pre_physics_tick(v, fixed(0.02)).unwrap();
        let behavior = rig.graph.behavior::<WheelBehavior>(wheel).unwrap();
        assert_eq!(behavior.drive(), TorqueOutput::ZERO);
        assert!(rig.graph.behavior::<PassiveBehavior>(gearbox).is_some());
    }

    #[test]
    fn tread_wears_with_transmitted_torque() {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        let gearbox = rig.spawn("test_gearbox");
        let wheel = rig.spawn("test_wheel");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));
        assert!(rig.graph.try_attach(&SocketRef::new(engine, sockets::OUTPUT), gearbox));
        assert!(rig.graph.try_attach(&SocketRef::new(gearbox, sockets::OUTPUT), wheel));
        rig.graph
            .get_mut(gearbox)
            .unwrap()
            .state_mut()
            .unwrap()
            .gearbox_mut()
            .unwrap()
            .current_gear = 1;
        rig.graph
            .behavior_mut::<crate::engine::EngineBehavior>(engine)
            .unwrap()
            .set_rpm(fixed(3000.0));
        rig.graph
            .set_intent(v, Fixed64::ONE, Fixed64::ZERO, Fixed64::ZERO, 1, true)
            .unwrap();

        rig.graph.pre_physics_tick(v, fixed(0.02)).unwrap();

        let behavior = rig.graph.behavior::<WheelBehavior>(wheel).unwrap();
        assert!(behavior.drive().torque > Fixed64::ZERO);
        let wear = rig.graph.get(wheel).unwrap().state().unwrap().wear();
        assert!(wear > Fixed64::ZERO);
    }
}
