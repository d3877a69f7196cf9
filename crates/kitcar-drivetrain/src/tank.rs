//! Fuel tanks: passive fluid sources at the far end of an engine's fuel
//! line.

use kitcar_core::behavior::PartBehavior;
use kitcar_core::capability::Capabilities;
use kitcar_core::id::PartType;

/// A fuel tank. It has no tick logic of its own: engines on the other end
/// of a fuel line draw from it, and the graph applies those draws to the
/// tank's `FuelTankState`.
#[derive(Debug, Clone, Default)]
pub struct FuelTankBehavior;

impl FuelTankBehavior {
    pub fn new() -> Self {
        Self
    }
}

impl PartBehavior for FuelTankBehavior {
    fn part_type(&self) -> PartType {
        PartType::FuelTank
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FLUID_SOURCE
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
