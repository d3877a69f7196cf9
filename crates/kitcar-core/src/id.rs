use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Identifies a live part instance in the part graph.
    pub struct PartId;

    /// Identifies a vehicle root in the part graph.
    pub struct VehicleId;
}

/// Identifies a part definition in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub u32);

/// Names a socket (or plug) on a part. Unique within one definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(pub String);

impl SocketId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SocketId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of part kinds the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Chassis,
    Engine,
    Gearbox,
    Wheel,
    FuelTank,
}

impl PartType {
    pub const ALL: [PartType; 5] = [
        PartType::Chassis,
        PartType::Engine,
        PartType::Gearbox,
        PartType::Wheel,
        PartType::FuelTank,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PartType::Chassis => "chassis",
            PartType::Engine => "engine",
            PartType::Gearbox => "gearbox",
            PartType::Wheel => "wheel",
            PartType::FuelTank => "fuel_tank",
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Well-known socket names shared by definitions and behaviors.
pub mod sockets {
    /// Default plug name for parts that do not declare one.
    pub const MOUNT: &str = "mount";
    /// Torque input plug of a gearbox.
    pub const INPUT: &str = "input";
    /// Torque output socket of engines and gearboxes.
    pub const OUTPUT: &str = "output";
    /// Engine socket that accepts a fuel tank.
    pub const FUEL_LINE: &str = "fuel_line";
}
