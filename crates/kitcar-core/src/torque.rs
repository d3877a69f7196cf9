//! The torque propagation contract between connected parts.
//!
//! Torque flows provider -> receiver; load flows receiver -> provider. Both
//! are resolved by direct calls along connections, never by a global solve:
//!
//! - A provider's [`TorqueProvider::available_torque`] is a pure read of what
//!   it computed during its own Pre phase.
//! - A receiver's [`TorqueReceiver::imposed_load_torque`] may recurse into
//!   its own downstream receivers through the [`GraphView`] it is given.
//! - A receiver pulls its upstream provider's torque during its Pre phase
//!   and caches it with [`TorqueReceiver::apply_received_torque`]. Anything
//!   it computed before that pull used the previous tick's value, so each
//!   stage lags its provider by one tick.

use crate::fixed::Fixed64;
use crate::graph::GraphView;
use serde::{Deserialize, Serialize};

/// Torque and shaft speed offered at an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TorqueOutput {
    pub torque: Fixed64,
    pub rpm: Fixed64,
}

impl TorqueOutput {
    pub const ZERO: TorqueOutput = TorqueOutput {
        torque: Fixed64::ZERO,
        rpm: Fixed64::ZERO,
    };

    pub fn new(torque: Fixed64, rpm: Fixed64) -> Self {
        Self { torque, rpm }
    }
}

/// A part that delivers rotational power at an output socket.
pub trait TorqueProvider {
    /// Torque computed in the provider's last Pre phase and its output RPM.
    fn available_torque(&self) -> TorqueOutput;
}

/// A part that accepts rotational power and pushes a load back upstream.
pub trait TorqueReceiver {
    /// The load torque this receiver imposes on its provider right now.
    ///
    /// `at` is a view positioned on the receiver itself, so it can ask its
    /// own downstream connections for their load.
    fn imposed_load_torque(&self, at: GraphView<'_>) -> Fixed64;

    /// Cache the torque delivered by the upstream provider.
    fn apply_received_torque(&mut self, torque: Fixed64, source_rpm: Fixed64);

    /// RPM at which the cached torque was delivered.
    fn current_input_rpm(&self) -> Fixed64;
}
