//! Gearbox: receives torque from the engine on its plug, multiplies it
//! through the selected ratio, and offers the result at its output socket.
//!
//! The selected gear is persistent (`GearboxState::current_gear`). The shift
//! timer and the torque cached from the upstream provider are transient.

use kitcar_core::behavior::{PartBehavior, TickContext};
use kitcar_core::capability::Capabilities;
use kitcar_core::definition::{GearboxParams, PartDefinition};
use kitcar_core::event::GraphEvent;
use kitcar_core::fixed::{Fixed64, guarded_div, is_near_zero};
use kitcar_core::graph::GraphView;
use kitcar_core::id::{PartType, SocketId, sockets};
use kitcar_core::state::RuntimeState;
use kitcar_core::torque::{TorqueOutput, TorqueProvider, TorqueReceiver};

pub const NEUTRAL: i32 = 0;
pub const REVERSE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearboxMode {
    Engaged,
    /// Decoupled until `remaining` runs out, then `target` is engaged.
    Shifting { target: i32, remaining: Fixed64 },
}

/// A completed shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub from: i32,
    pub to: i32,
}

/// Total ratio (gear ratio times final drive) for `gear`. Zero in neutral
/// or for a gear the box does not have.
pub fn total_ratio(params: &GearboxParams, gear: i32) -> Fixed64 {
    let ratio = match gear {
        NEUTRAL => return Fixed64::ZERO,
        REVERSE => params.reverse_ratio,
        g if g > 0 => match params.forward_ratios.get(g as usize - 1) {
            Some(r) => *r,
            None => return Fixed64::ZERO,
        },
        _ => return Fixed64::ZERO,
    };
    ratio * params.final_drive
}

/// Highest and lowest gear a driver may ask for.
pub fn clamp_gear(params: &GearboxParams, gear: i32) -> i32 {
    gear.clamp(REVERSE, params.forward_ratios.len() as i32)
}

#[derive(Debug, Clone)]
pub struct GearboxBehavior {
    mode: GearboxMode,
    input: TorqueOutput,
    output: TorqueOutput,
    ratio: Fixed64,
    efficiency: Fixed64,
    friction: Fixed64,
    output_socket: SocketId,
}

impl GearboxBehavior {
    pub fn new() -> Self {
        Self {
            mode: GearboxMode::Engaged,
            input: TorqueOutput::ZERO,
            output: TorqueOutput::ZERO,
            ratio: Fixed64::ZERO,
            efficiency: Fixed64::ONE,
            friction: Fixed64::ZERO,
            output_socket: SocketId::new(sockets::OUTPUT),
        }
    }

    pub fn mode(&self) -> GearboxMode {
        self.mode
    }

    pub fn is_shifting(&self) -> bool {
        matches!(self.mode, GearboxMode::Shifting { .. })
    }

    /// Ratio of the engaged gear as of the last Pre phase.
    pub fn ratio(&self) -> Fixed64 {
        self.ratio
    }

    /// Torque and RPM received from upstream in the last Pre phase.
    pub fn input(&self) -> TorqueOutput {
        self.input
    }

    fn is_decoupled(&self) -> bool {
        self.is_shifting() || is_near_zero(self.ratio)
    }

    /// Move the shift state machine forward by `dt` toward `desired`.
    /// `current` is the engaged gear and is updated when a shift completes.
    pub fn advance_shift(
        &mut self,
        params: &GearboxParams,
        current: &mut i32,
        desired: i32,
        dt: Fixed64,
    ) -> Option<Shift> {
        let desired = clamp_gear(params, desired);
        match self.mode {
            GearboxMode::Engaged if desired == *current => None,
            GearboxMode::Engaged => {
                self.mode = GearboxMode::Shifting {
                    target: desired,
                    remaining: params.shift_duration,
                };
                self.finish_if_elapsed(current)
            }
            GearboxMode::Shifting { target, .. } if target != desired => {
                self.mode = GearboxMode::Shifting {
                    target: desired,
                    remaining: params.shift_duration,
                };
                self.finish_if_elapsed(current)
            }
            GearboxMode::Shifting { target, remaining } => {
                self.mode = GearboxMode::Shifting {
                    target,
                    remaining: remaining - dt,
                };
                self.finish_if_elapsed(current)
            }
        }
    }

    fn finish_if_elapsed(&mut self, current: &mut i32) -> Option<Shift> {
        match self.mode {
            GearboxMode::Shifting { target, remaining } if remaining <= Fixed64::ZERO => {
                self.mode = GearboxMode::Engaged;
                let from = std::mem::replace(current, target);
                (from != target).then_some(Shift { from, to: target })
            }
            _ => None,
        }
    }

    /// Recompute the output from the cached input.
    fn update_output(&mut self) {
        self.output = if self.is_decoupled() {
            TorqueOutput::ZERO
        } else {
            match guarded_div(self.input.rpm, self.ratio) {
                Some(rpm) => TorqueOutput::new(
                    self.input
                        .torque
                        .saturating_mul(self.ratio)
                        .saturating_mul(self.efficiency),
                    rpm,
                ),
                None => TorqueOutput::ZERO,
            }
        };
    }
}

impl Default for GearboxBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl TorqueProvider for GearboxBehavior {
    fn available_torque(&self) -> TorqueOutput {
        self.output
    }
}

impl TorqueReceiver for GearboxBehavior {
    /// Downstream load reflected back through the ratio plus internal
    /// friction. Zero while decoupled.
    fn imposed_load_torque(&self, at: GraphView<'_>) -> Fixed64 {
        if self.is_decoupled() {
            return Fixed64::ZERO;
        }
        let downstream = at
            .receiver_at(&self.output_socket)
            .map(|(view, receiver)| receiver.imposed_load_torque(view))
            .unwrap_or(Fixed64::ZERO);
        // Saturates rather than overflows on extreme loads.
        let reflected = if is_near_zero(self.efficiency) {
            Fixed64::ZERO
        } else {
            downstream
                .saturating_div(self.ratio.saturating_abs())
                .saturating_div(self.efficiency)
        };
        reflected.saturating_add(self.friction)
    }

    fn apply_received_torque(&mut self, torque: Fixed64, source_rpm: Fixed64) {
        self.input = TorqueOutput::new(torque, source_rpm);
    }

    fn current_input_rpm(&self) -> Fixed64 {
        self.input.rpm
    }
}

impl PartBehavior for GearboxBehavior {
    fn part_type(&self) -> PartType {
        PartType::Gearbox
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TORQUE_PROVIDER | Capabilities::TORQUE_RECEIVER
    }

    fn required_sockets(&self) -> &'static [&'static str] {
        &[sockets::OUTPUT]
    }

    fn reset_transient(&mut self, state: &RuntimeState, definition: &PartDefinition) {
        self.mode = GearboxMode::Engaged;
        self.input = TorqueOutput::ZERO;
        self.output = TorqueOutput::ZERO;
        if let (Some(params), Some(gearbox)) = (definition.gearbox(), state.gearbox()) {
            self.ratio = total_ratio(params, gearbox.current_gear);
            self.efficiency = params.efficiency;
            self.friction = params.friction_torque;
        }
    }

    fn pre_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let definition = ctx.definition;
        let Some(params) = definition.gearbox() else {
            return;
        };
        let (part, tick) = (ctx.part(), ctx.tick);
        let desired = ctx.intent.desired_gear;
        let Some(state) = ctx.state.gearbox_mut() else {
            return;
        };
        let shift = self.advance_shift(params, &mut state.current_gear, desired, ctx.dt);
        self.ratio = total_ratio(params, state.current_gear);
        self.efficiency = params.efficiency;
        self.friction = params.friction_torque;

        if let Some(Shift { from, to }) = shift {
            tracing::debug!(?part, from, to, tick, "gear shifted");
            ctx.emit(GraphEvent::GearShifted { part, from, to, tick });
        }

        let received = ctx
            .provider_at(&definition.plug)
            .map(|p| p.available_torque())
            .unwrap_or(TorqueOutput::ZERO);
        self.apply_received_torque(received.torque, received.rpm);
        self.update_output();

        tracing::trace!(
            ?part,
            torque = %self.output.torque,
            rpm = %self.output.rpm,
            ratio = %self.ratio,
            "gearbox output"
        );
    }

    fn as_provider(&self) -> Option<&dyn TorqueProvider> {
        Some(self)
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
