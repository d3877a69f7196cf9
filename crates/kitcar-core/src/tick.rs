//! The per-vehicle tick driver.
//!
//! Each phase walks the vehicle's parts in membership order (breadth-first
//! from the root). For every part the behavior and state are lifted out of
//! the arena for the duration of its callback, so the callback gets `&mut`
//! access to its own state and a shared [`GraphView`] of everything else.
//! Queued fluid transfers are applied as soon as the callback returns.

use crate::behavior::{FluidTransfer, TickContext};
use crate::fixed::Fixed64;
use crate::graph::{GraphView, PartGraph};
use crate::id::VehicleId;
use crate::part::PartError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pre,
    Post,
}

impl PartGraph {
    /// Run every part's Pre phase. Must precede physics integration.
    pub fn pre_physics_tick(&mut self, vehicle: VehicleId, dt: Fixed64) -> Result<(), PartError> {
        self.run_phase(vehicle, dt, Phase::Pre)
    }

    /// Run every part's Post phase and advance the vehicle's tick counter.
    pub fn post_physics_tick(&mut self, vehicle: VehicleId, dt: Fixed64) -> Result<(), PartError> {
        self.run_phase(vehicle, dt, Phase::Post)?;
        if let Some(v) = self.vehicles.get_mut(vehicle) {
            v.tick += 1;
        }
        Ok(())
    }

    fn run_phase(&mut self, vehicle: VehicleId, dt: Fixed64, phase: Phase) -> Result<(), PartError> {
        let v = self
            .vehicles
            .get(vehicle)
            .ok_or(PartError::VehicleNotFound(vehicle))?;
        let order = v.all_parts.clone();
        let intent = v.intent.clone();
        let tick = v.tick;
        let mut transfers = Vec::new();

        for part in order {
            let Some(inst) = self.parts.get_mut(part) else {
                continue;
            };
            if !inst.is_enabled() {
                continue;
            }
            let Some(definition) = inst.definition.clone() else {
                continue;
            };
            let (mut behavior, mut state) = match (inst.behavior.take(), inst.state.take()) {
                (Some(b), Some(s)) => (b, s),
                (b, s) => {
                    inst.behavior = b;
                    inst.state = s;
                    continue;
                }
            };

            {
                let mut ctx = TickContext {
                    view: GraphView::new(&self.parts, part),
                    state: &mut state,
                    definition: &definition,
                    intent: &intent,
                    vehicle,
                    dt,
                    tick,
                    transfers: &mut transfers,
                    events: &mut self.events,
                };
                match phase {
                    Phase::Pre => behavior.pre_physics_tick(&mut ctx),
                    Phase::Post => behavior.post_physics_tick(&mut ctx),
                }
            }

            if let Some(inst) = self.parts.get_mut(part) {
                inst.behavior = Some(behavior);
                inst.state = Some(state);
            }
            for transfer in transfers.drain(..) {
                self.apply_transfer(transfer);
            }
        }
        Ok(())
    }

    /// Move fuel from source to sink, clamped by what the source holds and
    /// what the sink has room for. Returns the amount moved.
    pub(crate) fn apply_transfer(&mut self, transfer: FluidTransfer) -> Fixed64 {
        let FluidTransfer {
            source,
            sink,
            requested,
        } = transfer;

        let available = self
            .parts
            .get(source)
            .filter(|p| p.is_enabled())
            .and_then(|p| p.state.as_ref()?.fuel())
            .unwrap_or(Fixed64::ZERO);
        let room = self
            .parts
            .get(sink)
            .filter(|p| p.is_enabled())
            .and_then(|p| {
                let capacity = p.definition.as_ref()?.fuel_capacity();
                Some(capacity - p.state.as_ref()?.fuel()?)
            })
            .unwrap_or(Fixed64::ZERO);

        let amount = requested.min(available).min(room);
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        if let Some(fuel) = self
            .parts
            .get_mut(source)
            .and_then(|p| p.state.as_mut()?.fuel_mut())
        {
            *fuel -= amount;
        }
        if let Some(fuel) = self
            .parts
            .get_mut(sink)
            .and_then(|p| p.state.as_mut()?.fuel_mut())
        {
            *fuel += amount;
        }
        tracing::trace!(?source, ?sink, %amount, "fluid transferred");
        amount
    }
}
