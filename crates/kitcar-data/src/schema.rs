//! Serde data file structs for part definitions and simulation settings.
//!
//! Numbers are plain `f64` on disk and converted to `Fixed64` when the
//! loader resolves them into core types. Part types and capabilities are
//! closed enums, so an unknown name fails at parse time.

use kitcar_core::capability::Capabilities;
use kitcar_core::id::PartType;
use serde::Deserialize;

// ===========================================================================
// Parts
// ===========================================================================

/// One part definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct PartData {
    pub name: String,
    #[serde(default = "default_durability")]
    pub durability: f64,
    /// Socket id this part plugs in by. Defaults to `mount`.
    #[serde(default)]
    pub plug: Option<String>,
    #[serde(default)]
    pub sockets: Vec<SocketData>,
    pub params: ParamsData,
}

fn default_durability() -> f64 {
    100.0
}

/// A socket declared on a part.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketData {
    pub id: String,
    /// Empty accepts any part type.
    #[serde(default)]
    pub accepts: Vec<PartType>,
    #[serde(default)]
    pub requires: Vec<CapabilityData>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Quaternion `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// A capability a socket can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityData {
    TorqueProvider,
    TorqueReceiver,
    FluidSource,
    FluidSink,
}

impl CapabilityData {
    pub fn to_capabilities(self) -> Capabilities {
        match self {
            CapabilityData::TorqueProvider => Capabilities::TORQUE_PROVIDER,
            CapabilityData::TorqueReceiver => Capabilities::TORQUE_RECEIVER,
            CapabilityData::FluidSource => Capabilities::FLUID_SOURCE,
            CapabilityData::FluidSink => Capabilities::FLUID_SINK,
        }
    }
}

/// Type-specific constants. The variant picks the part type.
#[derive(Debug, Clone, Deserialize)]
pub enum ParamsData {
    Chassis,
    Engine(EngineData),
    Gearbox(GearboxData),
    Wheel(WheelData),
    FuelTank(FuelTankData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineData {
    /// `(rpm, torque)` samples, ascending in RPM.
    pub torque_curve: Vec<(f64, f64)>,
    pub idle_rpm: f64,
    pub stall_rpm: f64,
    pub max_rpm: f64,
    pub inertia: f64,
    #[serde(default)]
    pub friction_torque: f64,
    #[serde(default)]
    pub starter_torque: f64,
    pub fuel_capacity: f64,
    pub oil_capacity: f64,
    pub coolant_capacity: f64,
    #[serde(default)]
    pub fuel_consumption: f64,
    #[serde(default)]
    pub fuel_feed_rate: f64,
    #[serde(default)]
    pub oil_consumption: f64,
    #[serde(default = "default_ambient")]
    pub ambient_temperature: f64,
    #[serde(default)]
    pub heat_rate: f64,
    #[serde(default)]
    pub cooling_rate: f64,
    #[serde(default = "default_seize_temperature")]
    pub seize_temperature: f64,
    #[serde(default)]
    pub wear_rate: f64,
}

fn default_ambient() -> f64 {
    20.0
}

fn default_seize_temperature() -> f64 {
    130.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct GearboxData {
    pub forward_ratios: Vec<f64>,
    pub reverse_ratio: f64,
    pub final_drive: f64,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    #[serde(default)]
    pub shift_duration: f64,
    #[serde(default)]
    pub friction_torque: f64,
}

fn default_efficiency() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelData {
    pub radius: f64,
    #[serde(default)]
    pub rolling_resistance: f64,
    #[serde(default)]
    pub max_brake_torque: f64,
    #[serde(default)]
    pub tread_wear_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuelTankData {
    pub capacity: f64,
}

// ===========================================================================
// Simulation settings
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SimData {
    /// Fixed step in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_max_steps")]
    pub max_steps_per_advance: u32,
}

fn default_dt() -> f64 {
    0.02
}

fn default_max_steps() -> u32 {
    8
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for TOML part files: `[[parts]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlParts {
    pub parts: Vec<PartData>,
}
