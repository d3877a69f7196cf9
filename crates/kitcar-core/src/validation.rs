//! Structural invariant checks over a [`PartGraph`].
//!
//! Cheap enough to run after every topology change in tests. A healthy
//! graph yields no violations.

use crate::graph::PartGraph;
use crate::id::{PartId, SocketId, VehicleId};
use std::collections::{HashMap, HashSet};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A connection points at a part that no longer exists.
    DanglingConnection { part: PartId, socket: SocketId },
    /// `part` records `other` but `other` does not record `part` back.
    AsymmetricConnection {
        part: PartId,
        socket: SocketId,
        other: PartId,
    },
    /// A socket's occupant disagrees with the connection map.
    MountMismatch { part: PartId, socket: SocketId },
    /// A part's owner is not the vehicle it is reachable from.
    OwnerMismatch {
        part: PartId,
        expected: Option<VehicleId>,
        found: Option<VehicleId>,
    },
    /// A vehicle's membership list is not the closure of its root.
    MembershipMismatch { vehicle: VehicleId },
}

impl PartGraph {
    /// Check connection symmetry, socket occupancy, ownership and vehicle
    /// membership.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for (id, part) in self.parts.iter() {
            for mount in &part.sockets {
                if mount.attached != part.connection(&mount.socket) {
                    violations.push(InvariantViolation::MountMismatch {
                        part: id,
                        socket: mount.socket.clone(),
                    });
                }
            }

            for (socket, &other_id) in &part.connections {
                let Some(other) = self.parts.get(other_id) else {
                    violations.push(InvariantViolation::DanglingConnection {
                        part: id,
                        socket: socket.clone(),
                    });
                    continue;
                };
                let reciprocal = if part.mount_point(socket).is_some() {
                    // We are the parent: the child must point back via its plug.
                    other.parent() == Some(id)
                } else {
                    // We are the child: the parent must hold us in some socket.
                    other.sockets.iter().any(|m| m.attached == Some(id))
                };
                if !reciprocal {
                    violations.push(InvariantViolation::AsymmetricConnection {
                        part: id,
                        socket: socket.clone(),
                        other: other_id,
                    });
                }
            }
        }

        let mut expected_owner = HashMap::new();
        for (vid, vehicle) in self.vehicles.iter() {
            let closure = self.subtree(vehicle.root);
            if closure != vehicle.all_parts {
                violations.push(InvariantViolation::MembershipMismatch { vehicle: vid });
            }
            for part in closure {
                expected_owner.insert(part, vid);
            }
        }

        let mut seen = HashSet::new();
        for (id, part) in self.parts.iter() {
            seen.insert(id);
            let expected = expected_owner.get(&id).copied();
            if part.owner != expected {
                violations.push(InvariantViolation::OwnerMismatch {
                    part: id,
                    expected,
                    found: part.owner,
                });
            }
        }
        for (&part, &vehicle) in &expected_owner {
            if !seen.contains(&part) {
                violations.push(InvariantViolation::MembershipMismatch { vehicle });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::SocketRef;
    use crate::test_utils::Rig;

    #[test]
    fn healthy_graph_has_no_violations() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        rig.graph.create_vehicle(chassis).unwrap();
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));
        assert_eq!(rig.graph.validate(), Vec::new());
    }

    #[test]
    fn one_sided_edge_is_reported() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let engine = rig.spawn("test_engine");
        assert!(rig.graph.try_attach(&SocketRef::new(chassis, "engine_bay"), engine));

        // Break the child side by hand.
        rig.graph.get_mut(engine).unwrap().connections.clear();
        let violations = rig.graph.validate();
        assert!(violations.contains(&InvariantViolation::AsymmetricConnection {
            part: chassis,
            socket: SocketId::new("engine_bay"),
            other: engine,
        }));
    }

    #[test]
    fn stale_owner_is_reported() {
        let mut rig = Rig::new();
        let chassis = rig.spawn("test_chassis");
        let loose = rig.spawn("test_engine");
        let v = rig.graph.create_vehicle(chassis).unwrap();
        rig.graph.get_mut(loose).unwrap().owner = Some(v);
        assert!(rig.graph.validate().contains(&InvariantViolation::OwnerMismatch {
            part: loose,
            expected: None,
            found: Some(v),
        }));
    }
}
