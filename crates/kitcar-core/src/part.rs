//! Part instances and their lifecycle.
//!
//! ```text
//! Unbound --bind--> Bound --owner set--> Attached <--> Detached
//!                     |                     |            |
//!                     +--------destroy------+------------+--> Destroyed
//! ```
//!
//! A part is Attached exactly while it has an owning vehicle. Binding
//! validates the state and definition against the part's behavior; a
//! mismatch disables the part and leaves it Unbound.

use crate::behavior::PartBehavior;
use crate::capability::Capabilities;
use crate::definition::PartDefinition;
use crate::id::{PartType, SocketId, VehicleId};
use crate::mount::MountPoint;
use crate::pose::Pose;
use crate::state::RuntimeState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::id::PartId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors. Fatal to the part they are reported for, never to
/// the rest of the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{expected} part was given a {found} runtime state")]
    StateMismatch { expected: PartType, found: PartType },
    #[error("{expected} part was given a {found} definition")]
    DefinitionMismatch { expected: PartType, found: PartType },
    #[error("definition '{definition}' is missing required socket '{socket}'")]
    MissingSocket { definition: String, socket: String },
}

/// Lifecycle and graph misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("part not found: {0:?}")]
    PartNotFound(PartId),
    #[error("vehicle not found: {0:?}")]
    VehicleNotFound(VehicleId),
    #[error("cannot {action} a part in state {from:?}")]
    InvalidTransition { from: Lifecycle, action: &'static str },
    #[error("part is disabled by a configuration error")]
    Disabled,
    #[error("part {0:?} is plugged into another part")]
    HasParent(PartId),
    #[error("part {0:?} already belongs to a vehicle")]
    AlreadyOwned(PartId),
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Constructed, no state or definition yet.
    Unbound,
    /// State and definition assigned, never owned by a vehicle.
    Bound,
    /// Owned by a vehicle.
    Attached,
    /// Was attached, now free of any vehicle. Still bound.
    Detached,
    Destroyed,
}

impl Lifecycle {
    pub fn is_bound(self) -> bool {
        matches!(self, Lifecycle::Bound | Lifecycle::Attached | Lifecycle::Detached)
    }

    /// Bound parts may be destroyed; a freshly spawned, never attached part
    /// counts as free-standing.
    pub fn can_destroy(self) -> bool {
        self.is_bound()
    }
}

// ---------------------------------------------------------------------------
// PartInstance
// ---------------------------------------------------------------------------

/// The runtime node: one behavior, at most one definition and exactly one
/// `RuntimeState` once bound.
#[derive(Debug)]
pub struct PartInstance {
    pub(crate) definition: Option<Arc<PartDefinition>>,
    /// `None` while unbound, destroyed, or borrowed by a running tick callback.
    pub(crate) state: Option<RuntimeState>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) disabled: Option<ConfigError>,
    pub(crate) owner: Option<VehicleId>,
    pub(crate) sockets: Vec<MountPoint>,
    /// The only representation of an edge. Sockets map to children, the
    /// plug maps to the parent.
    pub(crate) connections: BTreeMap<SocketId, PartId>,
    /// Relative to the parent part when plugged in, to the world otherwise.
    pub(crate) local_pose: Pose,
    /// `None` only while a tick callback runs.
    pub(crate) behavior: Option<Box<dyn PartBehavior>>,
}

impl PartInstance {
    /// Construct an unbound part around its behavior.
    pub fn new(behavior: Box<dyn PartBehavior>) -> Self {
        Self {
            definition: None,
            state: None,
            lifecycle: Lifecycle::Unbound,
            disabled: None,
            owner: None,
            sockets: Vec::new(),
            connections: BTreeMap::new(),
            local_pose: Pose::IDENTITY,
            behavior: Some(behavior),
        }
    }

    /// Assign state and definition and initialize sockets.
    ///
    /// On a configuration error the part is disabled, stays Unbound, and the
    /// error is returned. A disabled part refuses any further bind.
    pub fn bind(
        &mut self,
        state: RuntimeState,
        definition: Arc<PartDefinition>,
    ) -> Result<(), PartError> {
        if self.lifecycle != Lifecycle::Unbound {
            return Err(PartError::InvalidTransition {
                from: self.lifecycle,
                action: "bind",
            });
        }
        if self.disabled.is_some() {
            return Err(PartError::Disabled);
        }
        let Some(behavior) = self.behavior.as_mut() else {
            return Err(PartError::Disabled);
        };

        let expected = behavior.part_type();
        let check = if state.part_type() != expected {
            Err(ConfigError::StateMismatch {
                expected,
                found: state.part_type(),
            })
        } else if definition.part_type != expected {
            Err(ConfigError::DefinitionMismatch {
                expected,
                found: definition.part_type,
            })
        } else if let Some(missing) = behavior.required_sockets().iter().find(|name| {
            let id = SocketId::new(**name);
            definition.plug != id && !definition.has_socket(&id)
        }) {
            Err(ConfigError::MissingSocket {
                definition: definition.name.clone(),
                socket: missing.to_string(),
            })
        } else {
            Ok(())
        };

        if let Err(err) = check {
            tracing::warn!(error = %err, definition = %definition.name, "part bind failed; part disabled");
            self.disabled = Some(err.clone());
            return Err(err.into());
        }

        behavior.reset_transient(&state, &definition);
        self.sockets = definition
            .sockets
            .iter()
            .map(|spec| MountPoint::empty(spec.id.clone()))
            .collect();
        self.state = Some(state);
        self.definition = Some(definition);
        self.lifecycle = Lifecycle::Bound;
        Ok(())
    }

    /// Record a new owning vehicle. Returns true if the part just became
    /// Attached (and its transient state was reset).
    pub(crate) fn set_owner(&mut self, owner: Option<VehicleId>) -> bool {
        self.owner = owner;
        match (owner, self.lifecycle) {
            (Some(_), Lifecycle::Bound | Lifecycle::Detached) => {
                self.lifecycle = Lifecycle::Attached;
                if let (Some(behavior), Some(state), Some(def)) =
                    (self.behavior.as_mut(), self.state.as_ref(), self.definition.as_ref())
                {
                    behavior.reset_transient(state, def);
                }
                true
            }
            (None, Lifecycle::Attached) => {
                self.lifecycle = Lifecycle::Detached;
                false
            }
            _ => false,
        }
    }

    /// Leave the world. Returns the state so it can be stored as inert data.
    pub fn destroy(&mut self) -> Result<RuntimeState, PartError> {
        if !self.lifecycle.can_destroy() {
            return Err(PartError::InvalidTransition {
                from: self.lifecycle,
                action: "destroy",
            });
        }
        let state = self.state.take().ok_or(PartError::InvalidTransition {
            from: self.lifecycle,
            action: "destroy",
        })?;
        self.lifecycle = Lifecycle::Destroyed;
        self.owner = None;
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_bound(&self) -> bool {
        self.lifecycle.is_bound()
    }

    /// Bound and not disabled.
    pub fn is_enabled(&self) -> bool {
        self.is_bound() && self.disabled.is_none()
    }

    pub fn config_error(&self) -> Option<&ConfigError> {
        self.disabled.as_ref()
    }

    pub fn owner(&self) -> Option<VehicleId> {
        self.owner
    }

    pub fn state(&self) -> Option<&RuntimeState> {
        self.state.as_ref()
    }

    /// Mutable access for game code between ticks (repairs, refuelling).
    pub fn state_mut(&mut self) -> Option<&mut RuntimeState> {
        self.state.as_mut()
    }

    pub fn definition(&self) -> Option<&Arc<PartDefinition>> {
        self.definition.as_ref()
    }

    pub fn part_type(&self) -> Option<PartType> {
        self.behavior.as_ref().map(|b| b.part_type())
    }

    pub fn capabilities(&self) -> Capabilities {
        self.behavior
            .as_ref()
            .map(|b| b.capabilities())
            .unwrap_or_default()
    }

    pub fn behavior(&self) -> Option<&dyn PartBehavior> {
        self.behavior.as_deref()
    }

    pub fn behavior_mut(&mut self) -> Option<&mut (dyn PartBehavior + 'static)> {
        self.behavior.as_deref_mut()
    }

    pub fn sockets(&self) -> &[MountPoint] {
        &self.sockets
    }

    pub fn mount_point(&self, socket: &SocketId) -> Option<&MountPoint> {
        self.sockets.iter().find(|m| &m.socket == socket)
    }

    pub(crate) fn mount_point_mut(&mut self, socket: &SocketId) -> Option<&mut MountPoint> {
        self.sockets.iter_mut().find(|m| &m.socket == socket)
    }

    pub fn connections(&self) -> &BTreeMap<SocketId, PartId> {
        &self.connections
    }

    pub fn connection(&self, socket: &SocketId) -> Option<PartId> {
        self.connections.get(socket).copied()
    }

    pub fn plug(&self) -> Option<&SocketId> {
        self.definition.as_ref().map(|d| &d.plug)
    }

    /// The part this one is plugged into.
    pub fn parent(&self) -> Option<PartId> {
        self.plug().and_then(|plug| self.connection(plug))
    }

    pub fn local_pose(&self) -> Pose {
        self.local_pose
    }

    /// Move a free-standing part. Ignored while plugged into a socket.
    pub fn set_local_pose(&mut self, pose: Pose) {
        if self.parent().is_none() {
            self.local_pose = pose;
        }
    }
}
