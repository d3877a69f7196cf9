//! Fixed-step driver.
//!
//! [`Simulation`] accumulates wall-clock deltas and runs as many fixed
//! steps as fit. Each step brackets the external physics integration with
//! the Pre and Post phases of every vehicle.

use crate::fixed::{Fixed64, Ticks};
use crate::graph::PartGraph;
use crate::id::VehicleId;
use serde::{Deserialize, Serialize};

/// Simulation rate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed step in seconds.
    pub dt: Fixed64,
    /// Upper bound on steps run by one `advance` call. Excess time is
    /// dropped so a long stall does not trigger a catch-up spiral.
    pub max_steps_per_advance: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: Fixed64::from_num(1) / 50,
            max_steps_per_advance: 8,
        }
    }
}

/// Rigid-body integration, run between the Pre and Post phases.
///
/// The core never calls into physics on its own; an integrator may read
/// wheel drive torque and write back ground loads through the graph.
pub trait PhysicsIntegrator {
    fn integrate(&mut self, graph: &mut PartGraph, dt: Fixed64);
}

/// Integrator that does nothing. Useful when only drivetrain state matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPhysics;

impl PhysicsIntegrator for NoPhysics {
    fn integrate(&mut self, _graph: &mut PartGraph, _dt: Fixed64) {}
}

/// Result of an `advance()` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    pub steps_run: u32,
    /// True if the step cap cut the accumulator short.
    pub dropped_time: bool,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    accumulator: Fixed64,
    steps: Ticks,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            accumulator: Fixed64::ZERO,
            steps: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn accumulator(&self) -> Fixed64 {
        self.accumulator
    }

    /// Total fixed steps run so far.
    pub fn steps(&self) -> Ticks {
        self.steps
    }

    /// Accumulate `elapsed` seconds and run as many fixed steps as fit.
    pub fn advance(
        &mut self,
        graph: &mut PartGraph,
        physics: &mut dyn PhysicsIntegrator,
        elapsed: Fixed64,
    ) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        let dt = self.config.dt;
        if dt <= Fixed64::ZERO {
            tracing::warn!(%dt, "non-positive timestep; nothing advanced");
            return result;
        }

        self.accumulator += elapsed.max(Fixed64::ZERO);
        while self.accumulator >= dt {
            if result.steps_run >= self.config.max_steps_per_advance {
                tracing::debug!(remaining = %self.accumulator, "step cap reached; dropping time");
                self.accumulator = Fixed64::ZERO;
                result.dropped_time = true;
                break;
            }
            self.accumulator -= dt;
            self.step(graph, physics);
            result.steps_run += 1;
        }
        result
    }

    /// Run exactly one fixed step: Pre for every vehicle, physics, Post for
    /// every vehicle.
    pub fn step(&mut self, graph: &mut PartGraph, physics: &mut dyn PhysicsIntegrator) {
        let dt = self.config.dt;
        let vehicles: Vec<VehicleId> = graph.vehicles().map(|(id, _)| id).collect();

        for &v in &vehicles {
            if let Err(err) = graph.pre_physics_tick(v, dt) {
                tracing::warn!(vehicle = ?v, error = %err, "pre-physics tick skipped");
            }
        }
        physics.integrate(graph, dt);
        for &v in &vehicles {
            if let Err(err) = graph.post_physics_tick(v, dt) {
                tracing::warn!(vehicle = ?v, error = %err, "post-physics tick skipped");
            }
        }
        self.steps += 1;
    }
}
