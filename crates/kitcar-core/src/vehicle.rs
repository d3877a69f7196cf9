//! Vehicle roots and driver intent.
//!
//! A vehicle does not own its parts. Membership is derived: `all_parts` is
//! the closure of parts reachable from the root chassis and is rebuilt by
//! the graph on every topology change.

use crate::fixed::{Fixed64, Ticks, clamp, clamp01};
use crate::id::{PartId, VehicleId};
use serde::{Deserialize, Serialize};

/// What the driver (or AI) wants this frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverIntent {
    /// [0, 1]
    pub throttle: Fixed64,
    /// [0, 1]
    pub brake: Fixed64,
    /// [-1, 1]
    pub steer: Fixed64,
    pub desired_gear: i32,
    pub ignition: bool,
}

impl DriverIntent {
    /// Build an intent with every value clamped to its documented range.
    pub fn clamped(
        throttle: Fixed64,
        brake: Fixed64,
        steer: Fixed64,
        desired_gear: i32,
        ignition: bool,
    ) -> Self {
        Self {
            throttle: clamp01(throttle),
            brake: clamp01(brake),
            steer: clamp(steer, -Fixed64::ONE, Fixed64::ONE),
            desired_gear,
            ignition,
        }
    }
}

impl Default for DriverIntent {
    fn default() -> Self {
        Self {
            throttle: Fixed64::ZERO,
            brake: Fixed64::ZERO,
            steer: Fixed64::ZERO,
            desired_gear: 0,
            ignition: false,
        }
    }
}

/// A vehicle: a root chassis part plus the derived set of parts reachable
/// from it.
#[derive(Debug, Clone)]
pub struct VehicleRoot {
    pub(crate) id: VehicleId,
    pub(crate) root: PartId,
    /// Breadth-first from the root, sockets in declaration order.
    pub(crate) all_parts: Vec<PartId>,
    pub(crate) intent: DriverIntent,
    pub(crate) tick: Ticks,
}

impl VehicleRoot {
    pub(crate) fn new(id: VehicleId, root: PartId) -> Self {
        Self {
            id,
            root,
            all_parts: Vec::new(),
            intent: DriverIntent::default(),
            tick: 0,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn root(&self) -> PartId {
        self.root
    }

    pub fn all_parts(&self) -> &[PartId] {
        &self.all_parts
    }

    pub fn contains(&self, part: PartId) -> bool {
        self.all_parts.contains(&part)
    }

    pub fn intent(&self) -> &DriverIntent {
        &self.intent
    }

    /// Number of completed Pre/Post tick pairs.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Set this frame's driver intent. Values are clamped: throttle and
    /// brake to [0, 1], steer to [-1, 1].
    pub fn set_intent(
        &mut self,
        throttle: Fixed64,
        brake: Fixed64,
        steer: Fixed64,
        desired_gear: i32,
        ignition: bool,
    ) {
        self.intent = DriverIntent::clamped(throttle, brake, steer, desired_gear, ignition);
    }
}
