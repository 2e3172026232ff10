/*
 * Debug Information Module
 *
 * This module defines the summaries the manager hands back to its driver:
 * - TickReport: what happened during one tick
 * - Removal: what the end-of-tick sweep dropped
 * - Census: who is alive and what they are doing
 *
 * The headless driver logs them, the viewer shows them in its panel.
 */

use std::collections::BTreeMap;
use std::fmt;

use crate::boid::{BoidType, RootedBoid};
use crate::movable_boid::MovableBoid;
use crate::state::MovableState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub agents: usize,
    pub resources: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub transitions: usize,
    pub deaths: usize,
    // Filled in by tick(); step() alone never adds or removes boids
    pub births: usize,
    pub removed: Removal,
}

impl TickReport {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: {} transitions, {} deaths, {} births, removed {} agents and {} resources",
            self.tick,
            self.transitions,
            self.deaths,
            self.births,
            self.removed.agents,
            self.removed.resources
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Census {
    pub tick: u64,
    pub by_species: BTreeMap<BoidType, usize>,
    pub by_state: BTreeMap<MovableState, usize>,
    pub resources: usize,
    pub food_remaining: f32,
}

impl Census {
    pub fn from_population(tick: u64, agents: &[MovableBoid], rooted: &[RootedBoid]) -> Self {
        let mut census = Self {
            tick,
            resources: rooted.len(),
            food_remaining: rooted.iter().filter_map(RootedBoid::food_remaining).sum(),
            ..Self::default()
        };

        for agent in agents.iter().filter(|agent| agent.is_alive()) {
            *census.by_species.entry(agent.species()).or_default() += 1;
            *census.by_state.entry(agent.state()).or_default() += 1;
        }
        census
    }

    pub fn living(&self) -> usize {
        self.by_species.values().sum()
    }

    pub fn species(&self, species: BoidType) -> usize {
        self.by_species.get(&species).copied().unwrap_or(0)
    }

    pub fn state(&self, state: MovableState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

impl fmt::Display for Census {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {}: {} alive", self.tick, self.living())?;
        for (species, count) in &self.by_species {
            write!(f, ", {} {}", count, species)?;
        }
        write!(f, " |")?;
        for (state, count) in &self.by_state {
            write!(f, " {}={}", state, count)?;
        }
        write!(
            f,
            " | {} resources, {:.1} food left",
            self.resources, self.food_remaining
        )
    }
}
