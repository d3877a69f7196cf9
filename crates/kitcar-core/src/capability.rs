//! Capability tags a socket can require of the part plugged into it.
//!
//! Capabilities are a closed bitset. A part's capabilities come from its
//! behavior (what it can actually do in the tick), never from its name.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Contracts a part can fulfil.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Delivers rotational power at an output socket.
        const TORQUE_PROVIDER = 1 << 0;
        /// Accepts rotational power and reflects a load back upstream.
        const TORQUE_RECEIVER = 1 << 1;
        /// Holds a fluid that connected parts may draw from.
        const FLUID_SOURCE = 1 << 2;
        /// Draws fluid from a connected source.
        const FLUID_SINK = 1 << 3;
    }
}

impl Capabilities {
    /// Capabilities required by `self` that `offered` lacks.
    pub fn missing_from(self, offered: Capabilities) -> Capabilities {
        self.difference(offered)
    }
}
