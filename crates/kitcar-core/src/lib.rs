//! Kitcar Core -- the composable-vehicle simulation core.
//!
//! A vehicle is a tree of discrete parts (chassis, engine, gearbox, wheels,
//! tanks) plugged into each other's typed sockets at runtime. This crate
//! owns that part graph, the lifecycle of each part's persistent state, and
//! the per-tick protocol along which parts exchange torque and fluids.
//!
//! # Tick Pipeline
//!
//! Each fixed step of [`sim::Simulation`] runs, for every vehicle:
//!
//! 1. **Pre** -- every part computes its intended outputs. Receivers pull
//!    their provider's torque; providers ask receivers for their load.
//! 2. **Physics** -- the external [`sim::PhysicsIntegrator`] runs.
//! 3. **Post** -- every part reacts to the physics results; queued fluid
//!    transfers are applied.
//!
//! Topology never changes during a phase: attach, detach and destroy take
//! `&mut PartGraph`, which a running callback cannot reach.
//!
//! # Key Types
//!
//! - [`graph::PartGraph`] -- Arena of parts and vehicles.
//! - [`part::PartInstance`] -- One part: behavior, definition, state,
//!   sockets, connections.
//! - [`mount::SocketRef`] -- Address of a socket for attach/detach.
//! - [`behavior::PartBehavior`] -- Per-kind tick logic.
//! - [`torque::TorqueProvider`] / [`torque::TorqueReceiver`] -- The torque
//!   propagation contract.
//! - [`definition::DefinitionRegistry`] -- Immutable part definitions
//!   (frozen at startup).
//! - [`state::RuntimeState`] -- Persistent per-part state.
//! - [`spawn::Spawner`] -- Part factory.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod behavior;
pub mod capability;
pub mod definition;
pub mod event;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod mount;
pub mod part;
pub mod pose;
pub mod sim;
pub mod spawn;
pub mod state;
pub mod store;
pub mod tick;
pub mod torque;
pub mod validation;
pub mod vehicle;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
