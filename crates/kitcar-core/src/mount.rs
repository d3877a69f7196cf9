//! Sockets, compatibility checks and the attach/detach operations.
//!
//! An edge is stored once per side: the parent records the child under the
//! socket id, the child records the parent under its plug id. The socket's
//! [`MountPoint`] mirrors the parent side so occupancy is a cheap lookup.

use crate::capability::Capabilities;
use crate::event::GraphEvent;
use crate::graph::PartGraph;
use crate::id::{PartId, PartType, SocketId};
use crate::pose::Pose;
use serde::{Deserialize, Serialize};

/// One socket on a live part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    pub(crate) socket: SocketId,
    pub(crate) attached: Option<PartId>,
}

impl MountPoint {
    pub(crate) fn empty(socket: SocketId) -> Self {
        Self {
            socket,
            attached: None,
        }
    }

    pub fn socket(&self) -> &SocketId {
        &self.socket
    }

    pub fn attached(&self) -> Option<PartId> {
        self.attached
    }

    pub fn is_occupied(&self) -> bool {
        self.attached.is_some()
    }
}

/// Addresses a socket: the part that owns it plus the socket id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketRef {
    pub part: PartId,
    pub socket: SocketId,
}

impl SocketRef {
    pub fn new(part: PartId, socket: impl Into<SocketId>) -> Self {
        Self {
            part,
            socket: socket.into(),
        }
    }
}

/// Why a candidate cannot go into a socket. Expected and recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttachRejection {
    #[error("socket owner does not exist")]
    SocketOwnerMissing,
    #[error("socket owner is unbound or disabled")]
    SocketOwnerUnusable,
    #[error("socket owner has no such socket")]
    UnknownSocket,
    #[error("socket is occupied")]
    Occupied,
    #[error("candidate does not exist")]
    CandidateMissing,
    #[error("candidate is unbound or disabled")]
    CandidateUnusable,
    #[error("a part cannot be plugged into itself")]
    SelfAttachment,
    #[error("candidate carries the socket owner; attaching would form a cycle")]
    WouldCreateCycle,
    #[error("candidate is the root of a vehicle")]
    CandidateIsVehicleRoot,
    #[error("socket does not accept {0} parts")]
    TypeNotAccepted(PartType),
    #[error("candidate lacks required capabilities {0:?}")]
    MissingCapabilities(Capabilities),
}

// ---------------------------------------------------------------------------
// Attach / detach
// ---------------------------------------------------------------------------

impl PartGraph {
    /// Check whether `candidate` may be plugged into `socket`. No side
    /// effects.
    pub fn check_compatibility(
        &self,
        socket: &SocketRef,
        candidate: PartId,
    ) -> Result<(), AttachRejection> {
        let owner = self
            .parts
            .get(socket.part)
            .ok_or(AttachRejection::SocketOwnerMissing)?;
        if !owner.is_enabled() {
            return Err(AttachRejection::SocketOwnerUnusable);
        }
        let spec = owner
            .definition
            .as_ref()
            .and_then(|d| d.socket(&socket.socket))
            .ok_or(AttachRejection::UnknownSocket)?;
        if owner
            .mount_point(&socket.socket)
            .is_some_and(|m| m.is_occupied())
        {
            return Err(AttachRejection::Occupied);
        }

        let cand = self
            .parts
            .get(candidate)
            .ok_or(AttachRejection::CandidateMissing)?;
        if !cand.is_enabled() {
            return Err(AttachRejection::CandidateUnusable);
        }
        if candidate == socket.part {
            return Err(AttachRejection::SelfAttachment);
        }
        if self.ancestors(socket.part).any(|a| a == candidate) {
            return Err(AttachRejection::WouldCreateCycle);
        }
        if self.vehicle_rooted_at(candidate).is_some() {
            return Err(AttachRejection::CandidateIsVehicleRoot);
        }

        let part_type = cand
            .part_type()
            .ok_or(AttachRejection::CandidateUnusable)?;
        if !spec.accepts_type(part_type) {
            return Err(AttachRejection::TypeNotAccepted(part_type));
        }
        let missing = spec.required_capabilities.missing_from(cand.capabilities());
        if !missing.is_empty() {
            return Err(AttachRejection::MissingCapabilities(missing));
        }
        Ok(())
    }

    pub fn is_compatible(&self, socket: &SocketRef, candidate: PartId) -> bool {
        self.check_compatibility(socket, candidate).is_ok()
    }

    /// Plug `candidate` (and everything it carries) into `socket`.
    ///
    /// Returns false, without touching any state, if the check fails. A
    /// candidate already plugged in elsewhere is detached first.
    pub fn try_attach(&mut self, socket: &SocketRef, candidate: PartId) -> bool {
        if let Err(reason) = self.check_compatibility(socket, candidate) {
            tracing::debug!(?candidate, socket = %socket.socket, %reason, "attach rejected");
            return false;
        }

        if self.parent_of(candidate).is_some() {
            self.detach_part(candidate);
        }

        let Some(owner) = self.parts.get_mut(socket.part) else {
            return false;
        };
        let snap = owner
            .definition
            .as_ref()
            .and_then(|d| d.socket(&socket.socket))
            .map(|s| s.local_pose)
            .unwrap_or(Pose::IDENTITY);
        let vehicle = owner.owner;
        if let Some(mount) = owner.mount_point_mut(&socket.socket) {
            mount.attached = Some(candidate);
        }
        owner.connections.insert(socket.socket.clone(), candidate);

        if let Some(cand) = self.parts.get_mut(candidate) {
            if let Some(plug) = cand.definition.as_ref().map(|d| d.plug.clone()) {
                cand.connections.insert(plug, socket.part);
            }
            cand.local_pose = snap;
        }

        if let Some(vid) = vehicle {
            self.refresh_vehicle(vid);
        }

        tracing::debug!(?candidate, parent = ?socket.part, socket = %socket.socket, ?vehicle, "part attached");
        self.events.push(GraphEvent::PartAttached {
            part: candidate,
            parent: socket.part,
            socket: socket.socket.clone(),
            vehicle,
        });
        true
    }

    /// Unplug whatever sits in `socket`. The detached part keeps its world
    /// pose and its runtime state.
    pub fn detach(&mut self, socket: &SocketRef) -> Option<PartId> {
        let child = self
            .parts
            .get(socket.part)?
            .mount_point(&socket.socket)?
            .attached?;
        let world = self.world_pose(child);

        let owner = self.parts.get_mut(socket.part)?;
        let vehicle = owner.owner;
        if let Some(mount) = owner.mount_point_mut(&socket.socket) {
            mount.attached = None;
        }
        owner.connections.remove(&socket.socket);

        if let Some(part) = self.parts.get_mut(child) {
            if let Some(plug) = part.definition.as_ref().map(|d| d.plug.clone()) {
                part.connections.remove(&plug);
            }
            if let Some(world) = world {
                part.local_pose = world;
            }
        }

        if let Some(vid) = vehicle {
            self.refresh_vehicle(vid);
        }

        tracing::debug!(part = ?child, parent = ?socket.part, socket = %socket.socket, "part detached");
        self.events.push(GraphEvent::PartDetached {
            part: child,
            parent: socket.part,
            socket: socket.socket.clone(),
            vehicle,
        });
        Some(child)
    }

    /// Unplug `part` from its parent. Returns the socket it was removed
    /// from, or `None` if it was free-standing.
    pub fn detach_part(&mut self, part: PartId) -> Option<SocketRef> {
        let socket = self.socket_holding(part)?;
        self.detach(&socket).map(|_| socket)
    }

    /// The parent socket `part` is plugged into.
    pub fn socket_holding(&self, part: PartId) -> Option<SocketRef> {
        let parent = self.parent_of(part)?;
        self.parts
            .get(parent)?
            .sockets
            .iter()
            .find(|m| m.attached == Some(part))
            .map(|m| SocketRef::new(parent, m.socket.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::sockets;
    use crate::part::Lifecycle;
    use crate::test_utils::Rig;
    use glam::Vec3;

    #[test]
    fn compatible_part_attaches_and_records_both_sides() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        let bay = SocketRef::new(chassis, "engine_bay");

        assert!(rig.graph.is_compatible(&bay, engine));
        assert!(rig.graph.try_attach(&bay, engine));

        let c = rig.graph.get(chassis).unwrap();
        assert_eq!(c.mount_point(&bay.socket).unwrap().attached(), Some(engine));
        assert_eq!(c.connection(&bay.socket), Some(engine));
        let e = rig.graph.get(engine).unwrap();
        assert_eq!(e.connection(&SocketId::new(sockets::MOUNT)), Some(chassis));
        assert_eq!(rig.graph.parent_of(engine), Some(chassis));
    }

    #[test]
    fn wheel_rejected_by_engine_socket() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let wheel = rig.spawn("test_wheel");
        let bay = SocketRef::new(chassis, "engine_bay");

        assert_eq!(
            rig.graph.check_compatibility(&bay, wheel),
            Err(AttachRejection::TypeNotAccepted(PartType::Wheel))
        );
        assert!(!rig.graph.try_attach(&bay, wheel));
        assert!(rig.graph.get(chassis).unwrap().connections().is_empty());
        assert!(rig.graph.get(wheel).unwrap().connections().is_empty());
    }

    #[test]
    fn occupied_socket_rejects() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let a = rig.spawn("test_engine");
        let b = rig.spawn("test_engine");
        let bay = SocketRef::new(chassis, "engine_bay");
        assert!(rig.graph.try_attach(&bay, a));
        assert_eq!(
            rig.graph.check_compatibility(&bay, b),
            Err(AttachRejection::Occupied)
        );
    }

    #[test]
    fn unknown_socket_rejects() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        assert_eq!(
            rig.graph
                .check_compatibility(&SocketRef::new(chassis, "roof_rack"), engine),
            Err(AttachRejection::UnknownSocket)
        );
    }

    #[test]
    fn self_and_cycle_rejected() {
        let mut rig = Rig::new();
        let gearbox = rig.spawn("test_gearbox");
        let wheel_hub = rig.spawn("test_gearbox");
        let out = SocketRef::new(gearbox, sockets::OUTPUT);
        assert_eq!(
            rig.graph.check_compatibility(&out, gearbox),
            Err(AttachRejection::SelfAttachment)
        );
        assert!(rig.graph.try_attach(&out, wheel_hub));
        // gearbox now carries wheel_hub; plugging gearbox under it loops.
        assert_eq!(
            rig.graph
                .check_compatibility(&SocketRef::new(wheel_hub, sockets::OUTPUT), gearbox),
            Err(AttachRejection::WouldCreateCycle)
        );
    }

    #[test]
    fn missing_capability_rejected() {
        let mut rig = Rig::new();
        let engine = rig.spawn("test_engine");
        let not_a_tank = rig.spawn_passive("test_tank", Capabilities::empty());
        assert_eq!(
            rig.graph
                .check_compatibility(&SocketRef::new(engine, sockets::FUEL_LINE), not_a_tank),
            Err(AttachRejection::MissingCapabilities(Capabilities::FLUID_SOURCE))
        );
    }

    #[test]
    fn vehicle_root_cannot_be_attached() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let other = rig.spawn("test_chassis");
        rig.graph.create_vehicle(other).unwrap();
        assert_eq!(
            rig.graph
                .check_compatibility(&SocketRef::new(chassis, "hitch"), other),
            Err(AttachRejection::CandidateIsVehicleRoot)
        );
    }

    #[test]
    fn attach_snaps_and_detach_preserves_world_pose() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        rig.graph
            .get_mut(chassis)
            .unwrap()
            .set_local_pose(Pose::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        rig.graph
            .get_mut(engine)
            .unwrap()
            .set_local_pose(Pose::from_translation(Vec3::new(-5.0, 3.0, 0.0)));

        let bay = SocketRef::new(chassis, "engine_bay");
        assert!(rig.graph.try_attach(&bay, engine));
        let socket_pose = rig
            .graph
            .get(chassis)
            .unwrap()
            .definition()
            .unwrap()
            .socket(&bay.socket)
            .unwrap()
            .local_pose;
        assert!(rig.graph.get(engine).unwrap().local_pose().approx_eq(&socket_pose, 1e-6));

        let world = rig.graph.world_pose(engine).unwrap();
        assert_eq!(rig.graph.detach(&bay), Some(engine));
        assert!(rig.graph.get(engine).unwrap().local_pose().approx_eq(&world, 1e-6));
        assert!(rig.graph.world_pose(engine).unwrap().approx_eq(&world, 1e-6));
    }

    #[test]
    fn detach_empty_socket_returns_none() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        assert_eq!(rig.graph.detach(&SocketRef::new(chassis, "engine_bay")), None);
        assert_eq!(rig.graph.detach_part(chassis), None);
    }

    #[test]
    fn reattach_elsewhere_detaches_first() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let tank = rig.spawn("test_tank");
        let engine = rig.spawn("test_engine");
        let tank_bay = SocketRef::new(chassis, "tank_bay");
        let fuel_line = SocketRef::new(engine, sockets::FUEL_LINE);

        assert!(rig.graph.try_attach(&tank_bay, tank));
        assert!(rig.graph.try_attach(&fuel_line, tank));

        assert!(!rig.graph.get(chassis).unwrap().mount_point(&tank_bay.socket).unwrap().is_occupied());
        assert_eq!(rig.graph.parent_of(tank), Some(engine));
        assert!(rig.graph.validate().is_empty());
    }

    #[test]
    fn disabled_part_cannot_attach() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let broken = rig.spawn_misconfigured();
        assert_eq!(
            rig.graph.get(broken).unwrap().lifecycle(),
            Lifecycle::Unbound
        );
        assert_eq!(
            rig.graph
                .check_compatibility(&SocketRef::new(chassis, "engine_bay"), broken),
            Err(AttachRejection::CandidateUnusable)
        );
    }
}
