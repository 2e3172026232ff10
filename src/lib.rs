/*
 * Boid Ecosystem Simulation - Module Definitions
 *
 * This file defines the module structure of the simulation:
 * - core: boids, drives, steering, behaviour states and the manager
 * - ambient: configuration, errors, logging, reports
 * - viewer (feature "viewer"): nannou window, camera and egui panel
 */

// Re-export key components for easier access
pub use boid::{AgentId, Boid, BoidType, ResourceId, RootedBoid};
pub use debug::{Census, Removal, TickReport};
pub use environment::{Biome, Environment, FlatTerrain};
pub use error::{BoidError, Result};
pub use manager::{BoidsManager, WorldView};
pub use movable_boid::{AgentSnapshot, MovableBoid, Prey};
pub use parameters::MovableParameters;
pub use params::{RootedParams, SimulationParams, SpeciesCatalog, SpeciesParams};
pub use state::MovableState;
pub use transition::{DeathCause, Offspring};

// Define modules
pub mod boid;
pub mod debug;
pub mod environment;
pub mod error;
pub mod logging;
pub mod manager;
pub mod movable_boid;
pub mod parameters;
pub mod params;
pub mod physics;
pub mod state;
pub mod steering;
pub mod transition;

#[cfg(feature = "viewer")]
pub mod app;
#[cfg(feature = "viewer")]
pub mod camera;
#[cfg(feature = "viewer")]
pub mod ui;
