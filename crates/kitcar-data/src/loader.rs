//! Resolution pipeline: reads data files, converts them into core types,
//! builds the definition registry.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_vehicle_data`].

use crate::schema::{ParamsData, PartData, SimData, SocketData};
use glam::{Quat, Vec3};
use kitcar_core::capability::Capabilities;
use kitcar_core::definition::{
    DefinitionParams, DefinitionRegistry, DefinitionRegistryBuilder, DefinitionTemplate,
    EngineParams, FuelTankParams, GearboxParams, MountSocketSpec, RegistryError, TorquePoint,
    WheelParams,
};
use kitcar_core::fixed::Fixed64;
use kitcar_core::pose::Pose;
use kitcar_core::sim::SimConfig;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A number cannot be represented in the simulation's fixed-point type.
    #[error("field '{field}' of '{name}' in {file} is out of range: {value}")]
    OutOfRange {
        file: PathBuf,
        name: String,
        field: &'static str,
        value: f64,
    },

    /// A socket pose is not a valid rigid transform.
    #[error("socket '{socket}' of '{name}' in {file} has an invalid pose")]
    InvalidPose {
        file: PathBuf,
        name: String,
        socket: String,
    },

    /// The converted definitions failed registry validation.
    #[error("invalid definitions in {file}: {source}")]
    Registry {
        file: PathBuf,
        #[source]
        source: RegistryError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without
/// extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from
/// extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    match detect_format(path)? {
        Format::Ron | Format::Json => deserialize_file(path),
        Format::Toml => {
            let table: toml::Value = deserialize_file(path)?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

/// Fail with `DuplicateName` if `name` was already seen.
pub fn check_duplicate(
    seen: &mut HashSet<String>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}

// ===========================================================================
// Conversion into core types
// ===========================================================================

/// Converts on-disk numbers for one named entry, attaching file and field
/// context to failures.
struct Converter<'a> {
    file: &'a Path,
    name: &'a str,
}

impl Converter<'_> {
    fn num(&self, field: &'static str, value: f64) -> Result<Fixed64, DataLoadError> {
        Fixed64::checked_from_num(value).ok_or_else(|| DataLoadError::OutOfRange {
            file: self.file.to_path_buf(),
            name: self.name.to_string(),
            field,
            value,
        })
    }

    fn socket(&self, data: &SocketData) -> Result<MountSocketSpec, DataLoadError> {
        let translation = Vec3::from_array(data.position);
        let rotation = Quat::from_array(data.rotation);
        if !translation.is_finite() || !rotation.is_finite() || rotation.length() < 1e-6 {
            return Err(DataLoadError::InvalidPose {
                file: self.file.to_path_buf(),
                name: self.name.to_string(),
                socket: data.id.clone(),
            });
        }
        let required = data
            .requires
            .iter()
            .fold(Capabilities::empty(), |acc, c| acc | c.to_capabilities());
        Ok(MountSocketSpec::new(data.id.clone())
            .accepting(&data.accepts)
            .requiring(required)
            .at(Pose::new(translation, rotation.normalize())))
    }

    fn params(&self, data: &ParamsData) -> Result<DefinitionParams, DataLoadError> {
        Ok(match data {
            ParamsData::Chassis => DefinitionParams::Chassis,
            ParamsData::Engine(e) => DefinitionParams::Engine(EngineParams {
                torque_curve: e
                    .torque_curve
                    .iter()
                    .map(|&(rpm, torque)| -> Result<TorquePoint, DataLoadError> {
                        Ok(TorquePoint {
                            rpm: self.num("torque_curve", rpm)?,
                            torque: self.num("torque_curve", torque)?,
                        })
                    })
                    .collect::<Result<_, _>>()?,
                idle_rpm: self.num("idle_rpm", e.idle_rpm)?,
                stall_rpm: self.num("stall_rpm", e.stall_rpm)?,
                max_rpm: self.num("max_rpm", e.max_rpm)?,
                inertia: self.num("inertia", e.inertia)?,
                friction_torque: self.num("friction_torque", e.friction_torque)?,
                starter_torque: self.num("starter_torque", e.starter_torque)?,
                fuel_capacity: self.num("fuel_capacity", e.fuel_capacity)?,
                oil_capacity: self.num("oil_capacity", e.oil_capacity)?,
                coolant_capacity: self.num("coolant_capacity", e.coolant_capacity)?,
                fuel_consumption: self.num("fuel_consumption", e.fuel_consumption)?,
                fuel_feed_rate: self.num("fuel_feed_rate", e.fuel_feed_rate)?,
                oil_consumption: self.num("oil_consumption", e.oil_consumption)?,
                ambient_temperature: self.num("ambient_temperature", e.ambient_temperature)?,
                heat_rate: self.num("heat_rate", e.heat_rate)?,
                cooling_rate: self.num("cooling_rate", e.cooling_rate)?,
                seize_temperature: self.num("seize_temperature", e.seize_temperature)?,
                wear_rate: self.num("wear_rate", e.wear_rate)?,
            }),
            ParamsData::Gearbox(g) => DefinitionParams::Gearbox(GearboxParams {
                forward_ratios: g
                    .forward_ratios
                    .iter()
                    .map(|&r| self.num("forward_ratios", r))
                    .collect::<Result<_, _>>()?,
                reverse_ratio: self.num("reverse_ratio", g.reverse_ratio)?,
                final_drive: self.num("final_drive", g.final_drive)?,
                efficiency: self.num("efficiency", g.efficiency)?,
                shift_duration: self.num("shift_duration", g.shift_duration)?,
                friction_torque: self.num("friction_torque", g.friction_torque)?,
            }),
            ParamsData::Wheel(w) => DefinitionParams::Wheel(WheelParams {
                radius: self.num("radius", w.radius)?,
                rolling_resistance: self.num("rolling_resistance", w.rolling_resistance)?,
                max_brake_torque: self.num("max_brake_torque", w.max_brake_torque)?,
                tread_wear_rate: self.num("tread_wear_rate", w.tread_wear_rate)?,
            }),
            ParamsData::FuelTank(t) => DefinitionParams::FuelTank(FuelTankParams {
                capacity: self.num("capacity", t.capacity)?,
            }),
        })
    }
}

/// Convert one on-disk part into a registry template.
pub fn part_template(data: &PartData, file: &Path) -> Result<DefinitionTemplate, DataLoadError> {
    let conv = Converter {
        file,
        name: &data.name,
    };
    let mut template = DefinitionTemplate::new(&data.name, conv.params(&data.params)?)
        .with_durability(conv.num("durability", data.durability)?);
    if let Some(plug) = &data.plug {
        template = template.with_plug(plug);
    }
    for socket in &data.sockets {
        template = template.with_socket(conv.socket(socket)?);
    }
    Ok(template)
}

/// Convert on-disk simulation settings.
pub fn sim_config(data: &SimData, file: &Path) -> Result<SimConfig, DataLoadError> {
    let conv = Converter { file, name: "sim" };
    Ok(SimConfig {
        dt: conv.num("dt", data.dt)?,
        max_steps_per_advance: data.max_steps_per_advance,
    })
}

// ===========================================================================
// Top-level loading
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug, Clone)]
pub struct VehicleData {
    pub registry: DefinitionRegistry,
    pub sim: SimConfig,
}

/// Load `parts.{ron,toml,json}` (required) and `sim.{ron,toml,json}`
/// (optional) from `dir`.
pub fn load_vehicle_data(dir: &Path) -> Result<VehicleData, DataLoadError> {
    let parts_path = require_data_file(dir, "parts")?;
    let parts: Vec<PartData> = deserialize_list(&parts_path, "parts")?;

    let mut seen = HashSet::new();
    let mut builder = DefinitionRegistryBuilder::new();
    for part in &parts {
        check_duplicate(&mut seen, &part.name, &parts_path)?;
        builder
            .register(part_template(part, &parts_path)?)
            .map_err(|source| DataLoadError::Registry {
                file: parts_path.clone(),
                source,
            })?;
    }
    let registry = builder.build().map_err(|source| DataLoadError::Registry {
        file: parts_path.clone(),
        source,
    })?;

    let sim = match find_data_file(dir, "sim")? {
        Some(path) => sim_config(&deserialize_file(&path)?, &path)?,
        None => SimConfig::default(),
    };

    tracing::debug!(
        dir = %dir.display(),
        parts = registry.len(),
        dt = %sim.dt,
        "loaded vehicle data"
    );
    Ok(VehicleData { registry, sim })
}

// ===========================================================================
// Tests
// ===========================================================================
