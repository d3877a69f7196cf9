//! Persistent, per-part mutable state.
//!
//! A [`RuntimeState`] survives attach/detach, grabbing, storing into an
//! inventory and respawning. Fast-changing simulation variables (engine
//! RPM, shift timers, cached torque) never live here; they belong to the
//! part's behavior and are reset whenever the part becomes attached.

use crate::definition::{DefinitionParams, PartDefinition};
use crate::fixed::{Fixed64, clamp, clamp01};
use crate::id::PartType;
use serde::{Deserialize, Serialize};

/// Upper bound of [`RuntimeState::durability`].
pub const MAX_DURABILITY: Fixed64 = Fixed64::const_from_int(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub fuel: Fixed64,
    pub oil: Fixed64,
    pub coolant: Fixed64,
    /// Hours spent firing.
    pub operating_hours: Fixed64,
    pub seized: bool,
    pub temperature: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearboxState {
    /// 0 = neutral, -1 = reverse, n > 0 = forward ratio `n - 1`.
    pub current_gear: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelTankState {
    pub fuel: Fixed64,
}

/// The type-specific half of a [`RuntimeState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    Chassis,
    Engine(EngineState),
    Gearbox(GearboxState),
    Wheel,
    FuelTank(FuelTankState),
}

/// A part's persistent attributes. Cloning yields a fully independent copy.
///
/// Deserialized values pass through the same clamps as [`RuntimeState::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuntimeStateData")]
pub struct RuntimeState {
    durability: Fixed64,
    wear: Fixed64,
    pub kind: StateKind,
}

/// On-disk shape of [`RuntimeState`], before clamping.
#[derive(Deserialize)]
struct RuntimeStateData {
    durability: Fixed64,
    wear: Fixed64,
    kind: StateKind,
}

impl From<RuntimeStateData> for RuntimeState {
    fn from(data: RuntimeStateData) -> Self {
        Self::new(data.durability, data.wear, data.kind)
    }
}

impl RuntimeState {
    /// Build the default state for a freshly spawned part.
    ///
    /// Engines start with full fluids at ambient temperature, tanks full,
    /// gearboxes in neutral.
    pub fn from_definition(def: &PartDefinition) -> Self {
        let kind = match &def.params {
            DefinitionParams::Chassis => StateKind::Chassis,
            DefinitionParams::Engine(p) => StateKind::Engine(EngineState {
                fuel: p.fuel_capacity,
                oil: p.oil_capacity,
                coolant: p.coolant_capacity,
                operating_hours: Fixed64::ZERO,
                seized: false,
                temperature: p.ambient_temperature,
            }),
            DefinitionParams::Gearbox(_) => StateKind::Gearbox(GearboxState { current_gear: 0 }),
            DefinitionParams::Wheel(_) => StateKind::Wheel,
            DefinitionParams::FuelTank(p) => StateKind::FuelTank(FuelTankState { fuel: p.capacity }),
        };
        Self {
            durability: clamp(def.base_durability, Fixed64::ZERO, MAX_DURABILITY),
            wear: Fixed64::ZERO,
            kind,
        }
    }

    pub fn new(durability: Fixed64, wear: Fixed64, kind: StateKind) -> Self {
        Self {
            durability: clamp(durability, Fixed64::ZERO, MAX_DURABILITY),
            wear: clamp01(wear),
            kind,
        }
    }

    /// The part type this state is shaped for.
    pub fn part_type(&self) -> PartType {
        match self.kind {
            StateKind::Chassis => PartType::Chassis,
            StateKind::Engine(_) => PartType::Engine,
            StateKind::Gearbox(_) => PartType::Gearbox,
            StateKind::Wheel => PartType::Wheel,
            StateKind::FuelTank(_) => PartType::FuelTank,
        }
    }

    pub fn durability(&self) -> Fixed64 {
        self.durability
    }

    pub fn set_durability(&mut self, v: Fixed64) {
        self.durability = clamp(v, Fixed64::ZERO, MAX_DURABILITY);
    }

    pub fn damage(&mut self, amount: Fixed64) {
        self.set_durability(self.durability.saturating_sub(amount));
    }

    pub fn is_broken(&self) -> bool {
        self.durability == Fixed64::ZERO
    }

    pub fn wear(&self) -> Fixed64 {
        self.wear
    }

    pub fn set_wear(&mut self, v: Fixed64) {
        self.wear = clamp01(v);
    }

    pub fn add_wear(&mut self, amount: Fixed64) {
        self.set_wear(self.wear.saturating_add(amount));
    }

    pub fn engine(&self) -> Option<&EngineState> {
        match &self.kind {
            StateKind::Engine(s) => Some(s),
            _ => None,
        }
    }

    pub fn engine_mut(&mut self) -> Option<&mut EngineState> {
        match &mut self.kind {
            StateKind::Engine(s) => Some(s),
            _ => None,
        }
    }

    pub fn gearbox(&self) -> Option<&GearboxState> {
        match &self.kind {
            StateKind::Gearbox(s) => Some(s),
            _ => None,
        }
    }

    pub fn gearbox_mut(&mut self) -> Option<&mut GearboxState> {
        match &mut self.kind {
            StateKind::Gearbox(s) => Some(s),
            _ => None,
        }
    }

    pub fn fuel_tank(&self) -> Option<&FuelTankState> {
        match &self.kind {
            StateKind::FuelTank(s) => Some(s),
            _ => None,
        }
    }

    pub fn fuel_tank_mut(&mut self) -> Option<&mut FuelTankState> {
        match &mut self.kind {
            StateKind::FuelTank(s) => Some(s),
            _ => None,
        }
    }

    /// Fuel held by an engine's reservoir or a tank.
    pub fn fuel(&self) -> Option<Fixed64> {
        match &self.kind {
            StateKind::Engine(s) => Some(s.fuel),
            StateKind::FuelTank(s) => Some(s.fuel),
            _ => None,
        }
    }

    pub fn fuel_mut(&mut self) -> Option<&mut Fixed64> {
        match &mut self.kind {
            StateKind::Engine(s) => Some(&mut s.fuel),
            StateKind::FuelTank(s) => Some(&mut s.fuel),
            _ => None,
        }
    }
}
