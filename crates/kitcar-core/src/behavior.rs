//! Per-kind simulation behavior attached to every part instance.
//!
//! A [`PartBehavior`] is the "concrete subtype" of a part: it decides which
//! [`PartType`] and [`RuntimeState`] shape the part accepts at bind time, which
//! capabilities it offers to sockets, and what it does in the Pre/Post
//! phases. Transient simulation variables live on the behavior; persistent
//! ones live in the part's `RuntimeState`.

use crate::capability::Capabilities;
use crate::definition::PartDefinition;
use crate::event::{EventBuffer, GraphEvent};
use crate::fixed::{Fixed64, Ticks};
use crate::graph::GraphView;
use crate::id::{PartId, PartType, SocketId, VehicleId};
use crate::state::RuntimeState;
use crate::torque::{TorqueProvider, TorqueReceiver};
use crate::vehicle::DriverIntent;

// ---------------------------------------------------------------------------
// PartBehavior trait
// ---------------------------------------------------------------------------

/// Kind-specific logic of a part. Default implementations are no-ops so a
/// behavior only overrides what it needs.
pub trait PartBehavior: std::fmt::Debug {
    /// The part type this behavior implements.
    fn part_type(&self) -> PartType;

    /// Contracts this part fulfils for socket requirement checks.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Socket (or plug) names the definition must declare.
    fn required_sockets(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reset transient variables. Called on bind and every time the part
    /// becomes attached to a vehicle.
    fn reset_transient(&mut self, state: &RuntimeState, definition: &PartDefinition) {
        let _ = (state, definition);
    }

    /// Compute intended outputs before physics integration.
    fn pre_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let _ = ctx;
    }

    /// React to physics results after integration.
    fn post_physics_tick(&mut self, ctx: &mut TickContext<'_>) {
        let _ = ctx;
    }

    fn as_provider(&self) -> Option<&dyn TorqueProvider> {
        None
    }

    fn as_receiver(&self) -> Option<&dyn TorqueReceiver> {
        None
    }

    /// Downcast to `&dyn Any` for access to concrete behavior types.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to `&mut dyn Any` for access to concrete behavior types.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ---------------------------------------------------------------------------
// Passive behavior
// ---------------------------------------------------------------------------

/// A behavior with no tick logic: structural parts like a chassis.
#[derive(Debug, Clone)]
pub struct PassiveBehavior {
    part_type: PartType,
    capabilities: Capabilities,
}

impl PassiveBehavior {
    pub fn new(part_type: PartType) -> Self {
        Self {
            part_type,
            capabilities: Capabilities::empty(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl PartBehavior for PassiveBehavior {
    fn part_type(&self) -> PartType {
        self.part_type
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Fluid transfer requests
// ---------------------------------------------------------------------------

/// A deferred request to move fluid between two connected parts. Applied by
/// the graph right after the requesting part's callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluidTransfer {
    pub source: PartId,
    pub sink: PartId,
    pub requested: Fixed64,
}

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// Everything a behavior may touch during one phase callback.
///
/// The part's own state is mutable; the rest of the graph is visible only
/// through a read-only [`GraphView`]. Cross-part effects are queued
/// (fluid transfers, events).
pub struct TickContext<'a> {
    /// View positioned on the ticking part.
    pub view: GraphView<'a>,
    pub state: &'a mut RuntimeState,
    pub definition: &'a PartDefinition,
    pub intent: &'a DriverIntent,
    pub vehicle: VehicleId,
    pub dt: Fixed64,
    pub tick: Ticks,
    pub(crate) transfers: &'a mut Vec<FluidTransfer>,
    pub(crate) events: &'a mut EventBuffer,
}

impl<'a> TickContext<'a> {
    /// The ticking part.
    pub fn part(&self) -> PartId {
        self.view.id()
    }

    /// The provider connected at `socket`, if it currently offers torque.
    pub fn provider_at(&self, socket: &SocketId) -> Option<&'a dyn TorqueProvider> {
        self.view.provider_at(socket).map(|(_, p)| p)
    }

    /// The receiver connected at `socket` together with a view on it.
    pub fn receiver_at(&self, socket: &SocketId) -> Option<(GraphView<'a>, &'a dyn TorqueReceiver)> {
        self.view.receiver_at(socket)
    }

    /// Queue a fluid draw from whatever is connected at `socket`.
    /// Returns false if nothing is connected there.
    pub fn request_fluid(&mut self, socket: &SocketId, amount: Fixed64) -> bool {
        match self.view.connected(socket) {
            Some(source) if amount > Fixed64::ZERO => {
                self.transfers.push(FluidTransfer {
                    source: source.id(),
                    sink: self.view.id(),
                    requested: amount,
                });
                true
            }
            _ => false,
        }
    }

    pub fn emit(&mut self, event: GraphEvent) {
        self.events.push(event);
    }
}
