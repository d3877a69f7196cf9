//! Static, shared part definitions and the registry that freezes them.
//!
//! A [`PartDefinition`] is immutable once the registry is built. Every part
//! spawned from it holds an `Arc` to the same instance.

use crate::capability::Capabilities;
use crate::fixed::Fixed64;
use crate::id::{DefinitionId, PartType, SocketId, sockets};
use crate::pose::Pose;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Sockets
// ---------------------------------------------------------------------------

/// Declares one socket on a part type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountSocketSpec {
    pub id: SocketId,
    /// Part types this socket accepts. Empty accepts any type.
    #[serde(default)]
    pub accepted_part_types: Vec<PartType>,
    /// Capabilities the plugged part must offer.
    #[serde(default)]
    pub required_capabilities: Capabilities,
    /// Where an attached part is snapped to, relative to the owner.
    #[serde(default)]
    pub local_pose: Pose,
}

impl MountSocketSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: SocketId::new(id),
            accepted_part_types: Vec::new(),
            required_capabilities: Capabilities::empty(),
            local_pose: Pose::IDENTITY,
        }
    }

    pub fn accepting(mut self, types: &[PartType]) -> Self {
        self.accepted_part_types = types.to_vec();
        self
    }

    pub fn requiring(mut self, caps: Capabilities) -> Self {
        self.required_capabilities = caps;
        self
    }

    pub fn at(mut self, pose: Pose) -> Self {
        self.local_pose = pose;
        self
    }

    pub fn accepts_type(&self, part_type: PartType) -> bool {
        self.accepted_part_types.is_empty() || self.accepted_part_types.contains(&part_type)
    }
}

// ---------------------------------------------------------------------------
// Type-specific constants
// ---------------------------------------------------------------------------

/// One sample of an engine torque curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorquePoint {
    pub rpm: Fixed64,
    pub torque: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Full-throttle torque (Nm) by RPM, strictly ascending in RPM.
    pub torque_curve: Vec<TorquePoint>,
    pub idle_rpm: Fixed64,
    /// Below this RPM the engine does not fire.
    pub stall_rpm: Fixed64,
    pub max_rpm: Fixed64,
    /// Nm of net torque per RPM/s of acceleration.
    pub inertia: Fixed64,
    /// Internal friction (Nm) at `max_rpm`, linear in RPM.
    pub friction_torque: Fixed64,
    pub starter_torque: Fixed64,
    pub fuel_capacity: Fixed64,
    pub oil_capacity: Fixed64,
    pub coolant_capacity: Fixed64,
    /// Liters per (Nm * s) of produced torque at full throttle.
    pub fuel_consumption: Fixed64,
    /// Liters per second drawn from a connected tank.
    pub fuel_feed_rate: Fixed64,
    /// Liters of oil burnt per second while firing.
    pub oil_consumption: Fixed64,
    pub ambient_temperature: Fixed64,
    /// Degrees per second at full rated torque.
    pub heat_rate: Fixed64,
    /// Fraction of the gap to ambient shed per second.
    pub cooling_rate: Fixed64,
    pub seize_temperature: Fixed64,
    /// Wear per second at `max_rpm`.
    pub wear_rate: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearboxParams {
    /// Ratios for gears 1..=n.
    pub forward_ratios: Vec<Fixed64>,
    /// Ratio for gear -1. Negative.
    pub reverse_ratio: Fixed64,
    pub final_drive: Fixed64,
    /// In (0, 1].
    pub efficiency: Fixed64,
    /// Time spent decoupled while changing gear, in seconds.
    pub shift_duration: Fixed64,
    /// Constant drag (Nm) reflected upstream while engaged.
    pub friction_torque: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelParams {
    pub radius: Fixed64,
    pub rolling_resistance: Fixed64,
    pub max_brake_torque: Fixed64,
    /// Wear per (Nm * s) of transmitted torque.
    pub tread_wear_rate: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelTankParams {
    pub capacity: Fixed64,
}

/// Constants specific to a part type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionParams {
    Chassis,
    Engine(EngineParams),
    Gearbox(GearboxParams),
    Wheel(WheelParams),
    FuelTank(FuelTankParams),
}

impl DefinitionParams {
    pub fn part_type(&self) -> PartType {
        match self {
            DefinitionParams::Chassis => PartType::Chassis,
            DefinitionParams::Engine(_) => PartType::Engine,
            DefinitionParams::Gearbox(_) => PartType::Gearbox,
            DefinitionParams::Wheel(_) => PartType::Wheel,
            DefinitionParams::FuelTank(_) => PartType::FuelTank,
        }
    }
}

// ---------------------------------------------------------------------------
// PartDefinition
// ---------------------------------------------------------------------------

/// Immutable per-part-type data. Shared by every instance spawned from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub part_type: PartType,
    pub base_durability: Fixed64,
    /// The side of this part that goes into a parent socket.
    pub plug: SocketId,
    pub sockets: Vec<MountSocketSpec>,
    pub params: DefinitionParams,
}

impl PartDefinition {
    pub fn socket(&self, id: &SocketId) -> Option<&MountSocketSpec> {
        self.sockets.iter().find(|s| &s.id == id)
    }

    pub fn has_socket(&self, id: &SocketId) -> bool {
        self.socket(id).is_some()
    }

    pub fn engine(&self) -> Option<&EngineParams> {
        match &self.params {
            DefinitionParams::Engine(p) => Some(p),
            _ => None,
        }
    }

    pub fn gearbox(&self) -> Option<&GearboxParams> {
        match &self.params {
            DefinitionParams::Gearbox(p) => Some(p),
            _ => None,
        }
    }

    pub fn wheel(&self) -> Option<&WheelParams> {
        match &self.params {
            DefinitionParams::Wheel(p) => Some(p),
            _ => None,
        }
    }

    pub fn fuel_tank(&self) -> Option<&FuelTankParams> {
        match &self.params {
            DefinitionParams::FuelTank(p) => Some(p),
            _ => None,
        }
    }

    /// How much fuel a part of this definition can hold. Zero for parts
    /// that hold none.
    pub fn fuel_capacity(&self) -> Fixed64 {
        match &self.params {
            DefinitionParams::Engine(p) => p.fuel_capacity,
            DefinitionParams::FuelTank(p) => p.capacity,
            _ => Fixed64::ZERO,
        }
    }
}

/// Input to [`DefinitionRegistryBuilder::register`]; the id is assigned on
/// registration.
#[derive(Debug, Clone)]
pub struct DefinitionTemplate {
    pub name: String,
    pub base_durability: Fixed64,
    pub plug: SocketId,
    pub sockets: Vec<MountSocketSpec>,
    pub params: DefinitionParams,
}

impl DefinitionTemplate {
    pub fn new(name: &str, params: DefinitionParams) -> Self {
        Self {
            name: name.to_string(),
            base_durability: Fixed64::from_num(100),
            plug: SocketId::new(sockets::MOUNT),
            sockets: Vec::new(),
            params,
        }
    }

    pub fn with_plug(mut self, plug: &str) -> Self {
        self.plug = SocketId::new(plug);
        self
    }

    pub fn with_socket(mut self, socket: MountSocketSpec) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn with_durability(mut self, durability: Fixed64) -> Self {
        self.base_durability = durability;
        self
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("definition not found: {0}")]
    NotFound(String),
    #[error("duplicate definition name: {0}")]
    DuplicateName(String),
    #[error("invalid definition '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Builder for constructing an immutable [`DefinitionRegistry`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct DefinitionRegistryBuilder {
    definitions: Vec<PartDefinition>,
    name_to_id: HashMap<String, DefinitionId>,
}

impl DefinitionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Returns its ID.
    pub fn register(&mut self, template: DefinitionTemplate) -> Result<DefinitionId, RegistryError> {
        if self.name_to_id.contains_key(&template.name) {
            return Err(RegistryError::DuplicateName(template.name));
        }
        let id = DefinitionId(self.definitions.len() as u32);
        self.name_to_id.insert(template.name.clone(), id);
        self.definitions.push(PartDefinition {
            id,
            part_type: template.params.part_type(),
            name: template.name,
            base_durability: template.base_durability,
            plug: template.plug,
            sockets: template.sockets,
            params: template.params,
        });
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<DefinitionId> {
        self.name_to_id.get(name).copied()
    }

    /// Validate every definition and freeze the registry.
    pub fn build(self) -> Result<DefinitionRegistry, RegistryError> {
        for def in &self.definitions {
            validate_definition(def)?;
        }
        Ok(DefinitionRegistry {
            definitions: self.definitions.into_iter().map(Arc::new).collect(),
            name_to_id: self.name_to_id,
        })
    }
}

fn invalid(def: &PartDefinition, reason: impl Into<String>) -> RegistryError {
    RegistryError::Invalid {
        name: def.name.clone(),
        reason: reason.into(),
    }
}

fn validate_definition(def: &PartDefinition) -> Result<(), RegistryError> {
    let zero = Fixed64::ZERO;
    let hundred = Fixed64::from_num(100);

    if def.base_durability < zero || def.base_durability > hundred {
        return Err(invalid(def, "base durability outside [0, 100]"));
    }

    let mut seen = HashSet::new();
    for socket in &def.sockets {
        if socket.id == def.plug {
            return Err(invalid(def, format!("socket '{}' collides with the plug", socket.id)));
        }
        if !seen.insert(&socket.id) {
            return Err(invalid(def, format!("duplicate socket '{}'", socket.id)));
        }
    }

    match &def.params {
        DefinitionParams::Chassis | DefinitionParams::FuelTank(_) | DefinitionParams::Wheel(_) => {}
        DefinitionParams::Engine(p) => {
            if p.torque_curve.is_empty() {
                return Err(invalid(def, "empty torque curve"));
            }
            if p.torque_curve.windows(2).any(|w| w[0].rpm >= w[1].rpm) {
                return Err(invalid(def, "torque curve RPM must be strictly ascending"));
            }
            if p.stall_rpm < zero || p.stall_rpm > p.idle_rpm || p.idle_rpm >= p.max_rpm {
                return Err(invalid(def, "expected 0 <= stall_rpm <= idle_rpm < max_rpm"));
            }
            if p.inertia <= zero {
                return Err(invalid(def, "inertia must be positive"));
            }
        }
        DefinitionParams::Gearbox(p) => {
            if p.forward_ratios.is_empty() || p.forward_ratios.iter().any(|r| *r <= zero) {
                return Err(invalid(def, "forward ratios must be non-empty and positive"));
            }
            if p.reverse_ratio >= zero {
                return Err(invalid(def, "reverse ratio must be negative"));
            }
            if p.final_drive <= zero {
                return Err(invalid(def, "final drive must be positive"));
            }
            if p.efficiency <= zero || p.efficiency > Fixed64::ONE {
                return Err(invalid(def, "efficiency must be in (0, 1]"));
            }
            if p.shift_duration < zero {
                return Err(invalid(def, "shift duration must not be negative"));
            }
        }
    }
    Ok(())
}

/// Immutable registry. Frozen after build(). Definitions are shared via `Arc`.
#[derive(Debug, Clone)]
pub struct DefinitionRegistry {
    definitions: Vec<Arc<PartDefinition>>,
    name_to_id: HashMap<String, DefinitionId>,
}

impl DefinitionRegistry {
    pub fn get(&self, id: DefinitionId) -> Option<&Arc<PartDefinition>> {
        self.definitions.get(id.0 as usize)
    }

    pub fn id(&self, name: &str) -> Option<DefinitionId> {
        self.name_to_id.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<PartDefinition>> {
        self.id(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PartDefinition>> {
        self.definitions.iter()
    }
}
