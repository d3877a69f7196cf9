//! Data-driven configuration: part definitions and simulation settings
//! loaded from RON, TOML or JSON files.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, VehicleData, load_vehicle_data};
