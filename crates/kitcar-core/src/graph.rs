//! The part arena: every live part, every vehicle, and the derived ownership
//! relation between them.
//!
//! Parts live in a `SlotMap` keyed by [`PartId`]. Edges live only in the
//! parts' `connections` maps (see [`crate::mount`]). A vehicle's membership
//! list is a cache rebuilt by [`PartGraph::refresh_vehicle`] after every
//! topology change, so it never diverges from the live connections.

use crate::definition::PartDefinition;
use crate::event::{EventBuffer, GraphEvent};
use crate::fixed::Fixed64;
use crate::id::{PartId, SocketId, VehicleId};
use crate::part::{PartError, PartInstance};
use crate::pose::Pose;
use crate::state::RuntimeState;
use crate::torque::{TorqueProvider, TorqueReceiver};
use crate::vehicle::VehicleRoot;
use slotmap::SlotMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// GraphView
// ---------------------------------------------------------------------------

/// A read-only cursor positioned on one part.
///
/// Handed to behaviors during tick callbacks so they can follow connections
/// and query neighbours' torque roles without mutable access to the graph.
#[derive(Clone, Copy)]
pub struct GraphView<'a> {
    parts: &'a SlotMap<PartId, PartInstance>,
    part: PartId,
}

impl<'a> GraphView<'a> {
    pub(crate) fn new(parts: &'a SlotMap<PartId, PartInstance>, part: PartId) -> Self {
        Self { parts, part }
    }

    pub fn id(&self) -> PartId {
        self.part
    }

    pub fn instance(&self) -> Option<&'a PartInstance> {
        self.parts.get(self.part)
    }

    pub fn definition(&self) -> Option<&'a PartDefinition> {
        self.instance()?.definition.as_deref()
    }

    pub fn state(&self) -> Option<&'a RuntimeState> {
        self.instance()?.state.as_ref()
    }

    /// Follow the connection recorded under `socket` (a socket or the plug).
    pub fn connected(&self, socket: &SocketId) -> Option<GraphView<'a>> {
        let other = self.instance()?.connection(socket)?;
        Some(GraphView::new(self.parts, other))
    }

    /// This part as a torque provider. Disabled parts provide nothing.
    pub fn provider(&self) -> Option<&'a dyn TorqueProvider> {
        let inst = self.instance().filter(|i| i.is_enabled())?;
        inst.behavior.as_deref()?.as_provider()
    }

    /// This part as a torque receiver. Disabled parts receive nothing.
    pub fn receiver(&self) -> Option<&'a dyn TorqueReceiver> {
        let inst = self.instance().filter(|i| i.is_enabled())?;
        inst.behavior.as_deref()?.as_receiver()
    }

    pub fn provider_at(&self, socket: &SocketId) -> Option<(GraphView<'a>, &'a dyn TorqueProvider)> {
        let other = self.connected(socket)?;
        other.provider().map(|p| (other, p))
    }

    pub fn receiver_at(&self, socket: &SocketId) -> Option<(GraphView<'a>, &'a dyn TorqueReceiver)> {
        let other = self.connected(socket)?;
        other.receiver().map(|r| (other, r))
    }

    /// Downcast this part's behavior to a concrete type.
    pub fn behavior<T: 'static>(&self) -> Option<&'a T> {
        self.instance()?.behavior.as_deref()?.as_any().downcast_ref::<T>()
    }
}

impl std::fmt::Debug for GraphView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView").field("part", &self.part).finish()
    }
}

// ---------------------------------------------------------------------------
// PartGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PartGraph {
    pub(crate) parts: SlotMap<PartId, PartInstance>,
    pub(crate) vehicles: SlotMap<VehicleId, VehicleRoot>,
    pub(crate) events: EventBuffer,
}

impl PartGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph that keeps at most `capacity` undrained events.
    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            events: EventBuffer::new(capacity),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Parts
    // -----------------------------------------------------------------------

    /// Insert an unbound part.
    pub fn insert(&mut self, instance: PartInstance) -> PartId {
        self.parts.insert(instance)
    }

    /// Bind a part in the arena. A configuration error disables the part
    /// and is recorded as a [`GraphEvent::BindFailed`].
    pub fn bind(
        &mut self,
        part: PartId,
        state: RuntimeState,
        definition: Arc<PartDefinition>,
    ) -> Result<(), PartError> {
        let inst = self.parts.get_mut(part).ok_or(PartError::PartNotFound(part))?;
        let result = inst.bind(state, definition);
        if let Err(PartError::Config(error)) = &result {
            self.events.push(GraphEvent::BindFailed {
                part,
                error: error.clone(),
            });
        }
        result
    }

    pub fn get(&self, part: PartId) -> Option<&PartInstance> {
        self.parts.get(part)
    }

    pub fn get_mut(&mut self, part: PartId) -> Option<&mut PartInstance> {
        self.parts.get_mut(part)
    }

    pub fn contains(&self, part: PartId) -> bool {
        self.parts.contains_key(part)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartId, &PartInstance)> {
        self.parts.iter()
    }

    pub fn view(&self, part: PartId) -> Option<GraphView<'_>> {
        self.parts
            .contains_key(part)
            .then(|| GraphView::new(&self.parts, part))
    }

    /// Concrete behavior of a part.
    pub fn behavior<T: 'static>(&self, part: PartId) -> Option<&T> {
        self.parts
            .get(part)?
            .behavior
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn behavior_mut<T: 'static>(&mut self, part: PartId) -> Option<&mut T> {
        self.parts
            .get_mut(part)?
            .behavior
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    pub fn parent_of(&self, part: PartId) -> Option<PartId> {
        self.parts.get(part)?.parent()
    }

    /// Parts plugged into `part`'s sockets, in socket declaration order.
    pub fn children_of(&self, part: PartId) -> Vec<PartId> {
        self.parts
            .get(part)
            .map(|p| p.sockets.iter().filter_map(|m| m.attached).collect())
            .unwrap_or_default()
    }

    /// Parents of `part`, nearest first.
    pub fn ancestors(&self, part: PartId) -> impl Iterator<Item = PartId> + '_ {
        std::iter::successors(self.parent_of(part), move |p| self.parent_of(*p))
    }

    /// `part` and everything plugged into it, breadth-first, sockets in
    /// declaration order.
    pub fn subtree(&self, part: PartId) -> Vec<PartId> {
        let mut order = Vec::new();
        if !self.parts.contains_key(part) {
            return order;
        }
        let mut queue = VecDeque::from([part]);
        while let Some(next) = queue.pop_front() {
            order.push(next);
            queue.extend(self.children_of(next));
        }
        order
    }

    /// World-space pose, composed down from the topmost parent.
    pub fn world_pose(&self, part: PartId) -> Option<Pose> {
        let mut pose = self.parts.get(part)?.local_pose;
        let mut current = part;
        while let Some(parent) = self.parent_of(current) {
            pose = self.parts.get(parent)?.local_pose.compose(&pose);
            current = parent;
        }
        Some(pose)
    }

    /// True only for a bound, enabled part that belongs to no vehicle:
    /// either Detached or freshly spawned (Bound, never attached).
    pub fn can_grab(&self, part: PartId) -> bool {
        self.parts
            .get(part)
            .is_some_and(|p| p.is_enabled() && p.owner.is_none())
    }

    /// Remove a part from the world and hand back its state.
    ///
    /// The part is first unplugged from its parent and its children are
    /// unplugged from it; they stay in the world as free-standing parts. A
    /// vehicle rooted at the part is dissolved.
    pub fn destroy_part(&mut self, part: PartId) -> Result<RuntimeState, PartError> {
        self.destroy_inner(part).map(|(_, state)| state)
    }

    /// Destroy a part and discard its state.
    pub fn scrap_part(&mut self, part: PartId) -> Result<(), PartError> {
        self.destroy_inner(part)?;
        tracing::debug!(?part, "part scrapped");
        Ok(())
    }

    pub(crate) fn destroy_inner(
        &mut self,
        part: PartId,
    ) -> Result<(Arc<PartDefinition>, RuntimeState), PartError> {
        let inst = self.parts.get(part).ok_or(PartError::PartNotFound(part))?;
        let lifecycle = inst.lifecycle();
        let definition = match (&inst.definition, lifecycle.can_destroy()) {
            (Some(def), true) => def.clone(),
            _ => {
                tracing::warn!(?part, ?lifecycle, "rejected destroy");
                return Err(PartError::InvalidTransition {
                    from: lifecycle,
                    action: "destroy",
                });
            }
        };

        if let Some(vehicle) = self.vehicle_rooted_at(part) {
            self.dissolve_vehicle(vehicle)?;
        }
        self.detach_part(part);
        for child in self.children_of(part) {
            self.detach_part(child);
        }

        let mut inst = self.parts.remove(part).ok_or(PartError::PartNotFound(part))?;
        let state = inst.destroy()?;
        tracing::debug!(?part, definition = %definition.name, "part destroyed");
        self.events.push(GraphEvent::PartDestroyed {
            part,
            definition: definition.id,
        });
        Ok((definition, state))
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// Make a free-standing bound part the root of a new vehicle. Everything
    /// already plugged into it becomes owned by the vehicle.
    pub fn create_vehicle(&mut self, root: PartId) -> Result<VehicleId, PartError> {
        let inst = self.parts.get(root).ok_or(PartError::PartNotFound(root))?;
        if inst.config_error().is_some() {
            return Err(PartError::Disabled);
        }
        if !inst.is_bound() {
            return Err(PartError::InvalidTransition {
                from: inst.lifecycle(),
                action: "create a vehicle from",
            });
        }
        if inst.parent().is_some() {
            return Err(PartError::HasParent(root));
        }
        if inst.owner.is_some() {
            return Err(PartError::AlreadyOwned(root));
        }

        let vehicle = self
            .vehicles
            .insert_with_key(|id| VehicleRoot::new(id, root));
        self.refresh_vehicle(vehicle);
        tracing::debug!(?vehicle, ?root, "vehicle created");
        self.events.push(GraphEvent::VehicleCreated { vehicle, root });
        Ok(vehicle)
    }

    /// Remove a vehicle. Its parts stay in the world, unowned.
    pub fn dissolve_vehicle(&mut self, vehicle: VehicleId) -> Result<(), PartError> {
        let root = self
            .vehicles
            .remove(vehicle)
            .ok_or(PartError::VehicleNotFound(vehicle))?;
        for part in root.all_parts {
            self.assign_owner(part, None);
        }
        tracing::debug!(?vehicle, "vehicle dissolved");
        self.events.push(GraphEvent::VehicleDissolved { vehicle });
        Ok(())
    }

    pub fn vehicle(&self, vehicle: VehicleId) -> Option<&VehicleRoot> {
        self.vehicles.get(vehicle)
    }

    pub fn vehicle_mut(&mut self, vehicle: VehicleId) -> Option<&mut VehicleRoot> {
        self.vehicles.get_mut(vehicle)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = (VehicleId, &VehicleRoot)> {
        self.vehicles.iter()
    }

    /// The vehicle whose root is `part`, if any.
    pub fn vehicle_rooted_at(&self, part: PartId) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .find(|(_, v)| v.root == part)
            .map(|(id, _)| id)
    }

    pub fn set_intent(
        &mut self,
        vehicle: VehicleId,
        throttle: Fixed64,
        brake: Fixed64,
        steer: Fixed64,
        desired_gear: i32,
        ignition: bool,
    ) -> Result<(), PartError> {
        self.vehicles
            .get_mut(vehicle)
            .ok_or(PartError::VehicleNotFound(vehicle))?
            .set_intent(throttle, brake, steer, desired_gear, ignition);
        Ok(())
    }

    /// Rebuild a vehicle's membership from its root and push the owner
    /// reference onto every part that gained or lost it.
    pub(crate) fn refresh_vehicle(&mut self, vehicle: VehicleId) {
        let Some(root) = self.vehicles.get(vehicle).map(|v| v.root) else {
            return;
        };
        let reachable = self.subtree(root);
        let keep: HashSet<PartId> = reachable.iter().copied().collect();

        let previous = match self.vehicles.get_mut(vehicle) {
            Some(v) => std::mem::take(&mut v.all_parts),
            None => return,
        };
        for part in previous.into_iter().filter(|p| !keep.contains(p)) {
            self.assign_owner(part, None);
        }
        for &part in &reachable {
            self.assign_owner(part, Some(vehicle));
        }
        if let Some(v) = self.vehicles.get_mut(vehicle) {
            v.all_parts = reachable;
        }
    }

    fn assign_owner(&mut self, part: PartId, owner: Option<VehicleId>) {
        let Some(inst) = self.parts.get_mut(part) else {
            return;
        };
        if inst.owner == owner {
            return;
        }
        inst.set_owner(owner);
        tracing::debug!(?part, ?owner, lifecycle = ?inst.lifecycle(), "owner changed");
        self.events.push(GraphEvent::OwnerChanged { part, owner });
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Take every event recorded since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        self.events.drain()
    }

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }
}
