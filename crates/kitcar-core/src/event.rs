//! Events recorded by the part graph.
//!
//! Topology events are pushed synchronously by graph mutations; behavior
//! events are pushed from inside tick callbacks. Both land in one bounded
//! [`EventBuffer`] until the caller drains them with
//! [`crate::graph::PartGraph::drain_events`]. A caller that never drains
//! loses the oldest events, never memory.

use crate::fixed::Ticks;
use crate::id::{DefinitionId, PartId, SocketId, VehicleId};
use crate::part::ConfigError;
use std::collections::VecDeque;

/// Capacity of a graph's event buffer unless configured otherwise.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    // -- Lifecycle --
    PartSpawned {
        part: PartId,
        definition: DefinitionId,
    },
    BindFailed {
        part: PartId,
        error: ConfigError,
    },
    PartDestroyed {
        part: PartId,
        definition: DefinitionId,
    },

    // -- Topology --
    PartAttached {
        part: PartId,
        parent: PartId,
        socket: SocketId,
        vehicle: Option<VehicleId>,
    },
    PartDetached {
        part: PartId,
        parent: PartId,
        socket: SocketId,
        vehicle: Option<VehicleId>,
    },
    OwnerChanged {
        part: PartId,
        owner: Option<VehicleId>,
    },
    VehicleCreated {
        vehicle: VehicleId,
        root: PartId,
    },
    VehicleDissolved {
        vehicle: VehicleId,
    },

    // -- Drivetrain --
    EngineStalled {
        part: PartId,
        tick: Ticks,
    },
    EngineSeized {
        part: PartId,
        tick: Ticks,
    },
    GearShifted {
        part: PartId,
        from: i32,
        to: i32,
        tick: Ticks,
    },
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity event queue. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<GraphEvent>,
    capacity: usize,
    /// Events ever pushed, including dropped ones.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)),
            capacity,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: GraphEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events lost to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.total_written - self.events.len() as u64
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GraphEvent> {
        self.events.iter()
    }

    /// Remove and return every stored event, oldest first.
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dissolved(n: u64) -> GraphEvent {
        let mut vehicles = slotmap::SlotMap::<VehicleId, ()>::with_key();
        let mut last = vehicles.insert(());
        for _ in 0..n {
            last = vehicles.insert(());
        }
        GraphEvent::VehicleDissolved { vehicle: last }
    }

    #[test]
    fn full_buffer_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        let events: Vec<_> = (0..5).map(dissolved).collect();
        for e in &events {
            buf.push(e.clone());
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped(), 2);
        assert_eq!(buf.iter().cloned().collect::<Vec<_>>(), events[2..].to_vec());
    }

    #[test]
    fn drain_empties_but_keeps_totals() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(dissolved(0));
        buf.push(dissolved(1));
        assert_eq!(buf.drain(), vec![dissolved(1)]);
        assert!(buf.is_empty());
        assert_eq!(buf.total_written(), 2);
    }
}
