//! Combustion engine: the torque provider at the head of a drivetrain.
//!
//! Shaft speed is transient: it lives on the behavior, is recomputed every
//! tick from the torque balance, and restarts at zero whenever the engine is
//! attached to a vehicle. Fluids, temperature, hours and the seized flag
//! live in the part's `RuntimeState`.

use crate::curve;
use kitcar_core::behavior::{PartBehavior, TickContext};
use kitcar_core::capability::Capabilities;
use kitcar_core::definition::{EngineParams, PartDefinition};
use kitcar_core::event::GraphEvent;
use kitcar_core::fixed::{Fixed64, clamp, clamp01};
use kitcar_core::id::{PartType, SocketId, sockets};
use kitcar_core::state::{EngineState, RuntimeState};
use kitcar_core::torque::{TorqueOutput, TorqueProvider};

const SECONDS_PER_HOUR: Fixed64 = Fixed64::const_from_int(3600);

/// Inputs to one engine step that come from outside the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineInput {
    pub throttle: Fixed64,
    pub ignition: bool,
    /// Load imposed by whatever is connected at the output.
    pub load: Fixed64,
    /// A broken (zero-durability) engine never fires.
    pub broken: bool,
    pub dt: Fixed64,
}

/// What happened during one engine step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOutcome {
    pub stalled: bool,
    pub seized: bool,
}

#[derive(Debug, Clone)]
pub struct EngineBehavior {
    rpm: Fixed64,
    output: TorqueOutput,
    /// Fired during the previous step.
    running: bool,
    output_socket: SocketId,
    fuel_line: SocketId,
}

impl EngineBehavior {
    pub fn new() -> Self {
        Self {
            rpm: Fixed64::ZERO,
            output: TorqueOutput::ZERO,
            running: false,
            output_socket: SocketId::new(sockets::OUTPUT),
            fuel_line: SocketId::new(sockets::FUEL_LINE),
        }
    }

    pub fn rpm(&self) -> Fixed64 {
        self.rpm
    }

    /// Force the shaft speed, e.g. when an external integrator couples the
    /// engine to the road.
    pub fn set_rpm(&mut self, rpm: Fixed64) {
        self.rpm = rpm.max(Fixed64::ZERO);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the engine by one step. Updates the persistent `state` and
    /// the transient RPM and output.
    pub fn step(
        &mut self,
        params: &EngineParams,
        state: &mut EngineState,
        input: EngineInput,
    ) -> EngineOutcome {
        let mut outcome = EngineOutcome::default();
        let zero = Fixed64::ZERO;

        if state.seized {
            self.rpm = zero;
            self.output = TorqueOutput::ZERO;
            self.running = false;
            return outcome;
        }

        let rpm = self.rpm;
        // Fires down to `stall_rpm`, not `idle_rpm`: a cranking engine below
        // idle must be able to catch. The governor holds it near idle.
        let firing = input.ignition && !input.broken && state.fuel > zero && rpm >= params.stall_rpm;

        if firing && state.oil <= zero {
            self.seize(state);
            outcome.seized = true;
            return outcome;
        }

        let throttle = if firing {
            self.governed_throttle(params, input.throttle)
        } else {
            zero
        };
        let produced = if firing {
            curve::sample(&params.torque_curve, rpm) * throttle
        } else {
            zero
        };
        let starter = if input.ignition && !input.broken && rpm < params.idle_rpm {
            params.starter_torque
        } else {
            zero
        };
        let friction = params
            .friction_torque
            .saturating_mul(rpm)
            .saturating_div(params.max_rpm);

        // Downstream loads are unbounded; the balance saturates.
        let net = produced
            .saturating_add(starter)
            .saturating_sub(friction)
            .saturating_sub(input.load);
        let accel = net.saturating_div(params.inertia).saturating_mul(input.dt);
        self.rpm = clamp(rpm.saturating_add(accel), zero, params.max_rpm);
        self.output = TorqueOutput::new(produced, rpm);

        // Consumables.
        if firing {
            let burned = produced
                .saturating_mul(params.fuel_consumption)
                .saturating_mul(input.dt);
            state.fuel = state.fuel.saturating_sub(burned).max(zero);
            state.oil = (state.oil - params.oil_consumption * input.dt).max(zero);
            state.operating_hours += input.dt / SECONDS_PER_HOUR;
        }

        // Heat: produced torque heats, coolant sheds heat toward ambient.
        let peak = curve::peak(&params.torque_curve);
        if peak > zero {
            state.temperature += params.heat_rate * (produced / peak) * input.dt;
        }
        let coolant_fraction = if params.coolant_capacity > zero {
            clamp01(state.coolant / params.coolant_capacity)
        } else {
            zero
        };
        let excess = state.temperature - params.ambient_temperature;
        state.temperature -= excess * params.cooling_rate * coolant_fraction * input.dt;

        if state.temperature >= params.seize_temperature {
            self.seize(state);
            outcome.seized = true;
            return outcome;
        }

        outcome.stalled = self.running && !firing && input.ignition;
        self.running = firing;
        outcome
    }

    /// Below idle a running engine opens the throttle itself so it settles
    /// near idle without driver input.
    fn governed_throttle(&self, params: &EngineParams, throttle: Fixed64) -> Fixed64 {
        let band = params.idle_rpm - params.stall_rpm;
        if self.rpm >= params.idle_rpm || band <= Fixed64::ZERO {
            return throttle;
        }
        throttle.max(clamp01((params.idle_rpm - self.rpm) / band))
    }

    fn seize(&mut self, state: &mut EngineState) {
        state.seized = true;
        self.rpm = Fixed64::ZERO;
        self.output = TorqueOutput::ZERO;
        self.running = false;
    }
}

impl Default for EngineBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl TorqueProvider for EngineBehavior {
    fn available_torque(&self) -> TorqueOutput {
        self.output
    }
}

impl PartBehavior for EngineBehavior {
    fn part_type(&self) -> PartType {
        PartType::Engine
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TORQUE_PROVIDER | Capabilities::FLUID_SINK
    }

    fn required_sockets(&self) -> &'static [&'static str] {
        &[sockets::OUTPUT]
    }

    fn reset_transient(&mut self, _state: &RuntimeState, _definition: &PartDefinition) {
        self.rpm = Fixed64::ZERO;
        self.output = TorqueOutput::ZERO;
        self.running = false;
    }

    fn pre_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let definition = ctx.definition;
        let Some(params) = definition.engine() else {
            return;
        };
        let load = ctx
            .receiver_at(&self.output_socket)
            .map(|(view, receiver)| receiver.imposed_load_torque(view))
            .unwrap_or(Fixed64::ZERO);
        let input = EngineInput {
            throttle: ctx.intent.throttle,
            ignition: ctx.intent.ignition,
            load,
            broken: ctx.state.is_broken(),
            dt: ctx.dt,
        };
        let rpm_before = self.rpm;
        let Some(state) = ctx.state.engine_mut() else {
            return;
        };
        let outcome = self.step(params, state, input);

        if self.running {
            ctx.state
                .add_wear(params.wear_rate * rpm_before / params.max_rpm * ctx.dt);
        }

        tracing::trace!(
            part = ?ctx.part(),
            torque = %self.output.torque,
            rpm = %self.rpm,
            %load,
            "engine step"
        );
        let (part, tick) = (ctx.part(), ctx.tick);
        if outcome.seized {
            tracing::warn!(?part, tick, "engine seized");
            ctx.emit(GraphEvent::EngineSeized { part, tick });
        }
        if outcome.stalled {
            tracing::debug!(?part, tick, "engine stalled");
            ctx.emit(GraphEvent::EngineStalled { part, tick });
        }
    }

    /// Top up the internal reservoir from the tank on the fuel line.
    fn post_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let definition = ctx.definition;
        let Some(params) = definition.engine() else {
            return;
        };
        let Some(fuel) = ctx.state.fuel() else {
            return;
        };
        let room = params.fuel_capacity - fuel;
        let want = room.min(params.fuel_feed_rate * ctx.dt);
        if want > Fixed64::ZERO {
            ctx.request_fluid(&self.fuel_line, want);
        }
    }

    fn as_provider(&self) -> Option<&dyn TorqueProvider> {
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
    use kitcar_core::id::{PartId, VehicleId};
    use kitcar_core::mount::SocketRef;
    use kitcar_core::test_utils::{self, Rig, fixed};

    fn params() -> EngineParams {
        match test_utils::engine_template("e").params {
            kitcar_core::definition::DefinitionParams::Engine(p) => p,
            _ => unreachable!(),
        }
    }

    fn full_state(p: &EngineParams) -> EngineState {
        EngineState {
            fuel: p.fuel_capacity,
            oil: p.oil_capacity,
            coolant: p.coolant_capacity,
            operating_hours: Fixed64::ZERO,
            seized: false,
            temperature: p.ambient_temperature,
        }
    }

    fn input(throttle: f64, ignition: bool) -> EngineInput {
        EngineInput {
            throttle: fixed(throttle),
            ignition,
            load: Fixed64::ZERO,
            broken: false,
            dt: fixed(0.02),
        }
    }

    /// Chassis + engine vehicle with real drivetrain behaviors.
    fn engine_rig() -> (Rig, VehicleId, PartId) {
        let mut rig = Rig::with_behaviors(register_drivetrain);
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));
        (rig, v, engine)
    }

    #[test]
    fn idle_full_throttle_delivers_curve_torque() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(800.0));
        engine.step(&p, &mut state, input(1.0, true));
        assert_eq!(engine.available_torque(), TorqueOutput::new(fixed(50.0), fixed(800.0)));
        assert!(engine.is_running());
        assert!(state.fuel < p.fuel_capacity);
    }

    #[test]
    fn zero_fuel_gives_zero_torque_at_speed() {
        let p = params();
        let mut state = full_state(&p);
        state.fuel = Fixed64::ZERO;
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(3000.0));
        engine.step(&p, &mut state, input(1.0, true));
        assert_eq!(engine.available_torque().torque, Fixed64::ZERO);
        assert!(engine.rpm() > Fixed64::ZERO);
    }

    #[test]
    fn seized_engine_is_dead() {
        let p = params();
        let mut state = full_state(&p);
        state.seized = true;
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(3000.0));
        engine.step(&p, &mut state, input(1.0, true));
        assert_eq!(engine.available_torque(), TorqueOutput::ZERO);
        assert_eq!(engine.rpm(), Fixed64::ZERO);
    }

    #[test]
    fn starter_cranks_engine_to_life() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        for _ in 0..500 {
            engine.step(&p, &mut state, input(0.0, true));
        }
        assert!(engine.is_running());
        assert!(engine.rpm() >= p.stall_rpm);
        assert!(engine.rpm() < p.idle_rpm + fixed(50.0));
    }

    #[test]
    fn huge_load_stops_the_shaft_without_overflow() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(p.idle_rpm);
        let mut loaded = input(1.0, true);
        loaded.load = fixed(1.0e9);
        engine.step(&p, &mut state, loaded);
        assert_eq!(engine.rpm(), Fixed64::ZERO);

        loaded.load = Fixed64::MAX;
        engine.step(&p, &mut state, loaded);
        assert_eq!(engine.rpm(), Fixed64::ZERO);
    }

    #[test]
    fn tiny_inertia_saturates_to_max_rpm() {
        let mut p = params();
        p.inertia = Fixed64::DELTA;
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(p.idle_rpm);
        engine.step(&p, &mut state, input(1.0, true));
        assert_eq!(engine.rpm(), p.max_rpm);
    }

    #[test]
    fn ignition_off_stalls_and_spins_down() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(900.0));
        engine.step(&p, &mut state, input(0.0, true));
        assert!(engine.is_running());

        let outcome = engine.step(&p, &mut state, input(0.0, false));
        assert!(!engine.is_running());
        assert!(!outcome.stalled, "switching off is not a stall");
        let rpm = engine.rpm();
        engine.step(&p, &mut state, input(0.0, false));
        assert!(engine.rpm() < rpm);
    }

    #[test]
    fn heavy_load_stalls_running_engine() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(p.stall_rpm);
        engine.step(&p, &mut state, input(0.0, true));
        assert!(engine.is_running());

        let mut stalled = false;
        for _ in 0..10 {
            let mut heavy = input(0.0, true);
            heavy.load = fixed(500.0);
            stalled |= engine.step(&p, &mut state, heavy).stalled;
        }
        assert!(stalled);
        assert!(!engine.is_running());
    }

    #[test]
    fn overheating_seizes() {
        let p = params();
        let mut state = full_state(&p);
        state.temperature = p.seize_temperature;
        state.coolant = Fixed64::ZERO;
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(3000.0));
        let outcome = engine.step(&p, &mut state, input(1.0, true));
        assert!(outcome.seized);
        assert!(state.seized);
        assert_eq!(engine.available_torque(), TorqueOutput::ZERO);
    }

    #[test]
    fn running_dry_of_oil_seizes() {
        let p = params();
        let mut state = full_state(&p);
        state.oil = Fixed64::ZERO;
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(1000.0));
        assert!(engine.step(&p, &mut state, input(0.5, true)).seized);
    }

    #[test]
    fn hours_accumulate_while_firing() {
        let p = params();
        let mut state = full_state(&p);
        let mut engine = EngineBehavior::new();
        engine.set_rpm(fixed(1000.0));
        for _ in 0..50 {
            engine.step(&p, &mut state, input(0.3, true));
        }
        assert!(state.operating_hours > Fixed64::ZERO);
    }

    #[test]
    fn seize_event_reaches_graph() {
        let (mut rig, v, engine) = engine_rig();
        rig.graph
            .get_mut(engine)
            .unwrap()
            .state_mut()
            .unwrap()
            .engine_mut()
            .unwrap()
            .oil = Fixed64::ZERO;
        rig.graph
            .behavior_mut::<EngineBehavior>(engine)
            .unwrap()
            .set_rpm(fixed(1000.0));
        rig.graph
            .set_intent(v, fixed(0.5), Fixed64::ZERO, Fixed64::ZERO, 0, true)
            .unwrap();
        rig.graph.drain_events();
        rig.graph.pre_physics_tick(v, fixed(0.02)).unwrap();
        assert_eq!(
            rig.graph.drain_events(),
            vec![GraphEvent::EngineSeized { part: engine, tick: 0 }]
        );
        assert!(rig.graph.get(engine).unwrap().state().unwrap().engine().unwrap().seized);
    }

    #[test]
    fn post_phase_draws_fuel_from_tank() {
        let (mut rig, v, engine) = engine_rig();
        let tank = rig.spawn("test_tank");
        assert!(rig.graph.try_attach(&SocketRef::new(engine, sockets::FUEL_LINE), tank));
        *rig.fuel_mut(engine) = fixed(1.0);

        rig.graph.post_physics_tick(v, fixed(0.02)).unwrap();

        // feed rate 0.5 l/s over 0.02 s
        assert_eq!(*rig.fuel_mut(engine), fixed(1.0) + fixed(0.5) * fixed(0.02));
        assert_eq!(*rig.fuel_mut(tank), fixed(40.0) - fixed(0.5) * fixed(0.02));
    }

    #[test]
    fn no_tank_no_refuel() {
        let (mut rig, v, engine) = engine_rig();
        *rig.fuel_mut(engine) = fixed(1.0);
        rig.graph.post_physics_tick(v, fixed(0.02)).unwrap();
        assert_eq!(*rig.fuel_mut(engine), fixed(1.0));
    }

    #[test]
    fn attach_resets_rpm() {
        let (mut rig, _v, engine) = engine_rig();
        rig.graph
            .behavior_mut::<EngineBehavior>(engine)
            .unwrap()
            .set_rpm(fixed(3000.0));
        let socket = rig.graph.detach_part(engine).unwrap();
        assert_eq!(rig.graph.behavior::<EngineBehavior>(engine).unwrap().rpm(), fixed(3000.0));
        assert!(rig.graph.try_attach(&socket, engine));
        assert_eq!(rig.graph.behavior::<EngineBehavior>(engine).unwrap().rpm(), Fixed64::ZERO);
    }
}
