/*
 * Boid Module
 *
 * This module defines the pieces every simulated entity shares:
 * - BoidType: the species tag (two animals, one food source, one obstacle)
 * - AgentId / ResourceId: stable handles into the manager's collections
 * - Boid: the stationary base (position, facing angle, species)
 * - RootedBoid: a boid that never moves and may hold food
 */

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::BoidError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoidType {
    Rabbit,
    Wolf,
    Carrot,
    Tree,
}

impl BoidType {
    pub const ALL: [BoidType; 4] = [BoidType::Rabbit, BoidType::Wolf, BoidType::Carrot, BoidType::Tree];

    pub fn is_movable(self) -> bool {
        matches!(self, BoidType::Rabbit | BoidType::Wolf)
    }

    pub fn name(self) -> &'static str {
        match self {
            BoidType::Rabbit => "rabbit",
            BoidType::Wolf => "wolf",
            BoidType::Carrot => "carrot",
            BoidType::Tree => "tree",
        }
    }
}

impl fmt::Display for BoidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BoidType {
    type Err = BoidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        BoidType::ALL
            .into_iter()
            .find(|species| species.name() == wanted)
            .ok_or_else(|| BoidError::UnknownSpecies(s.to_owned()))
    }
}

// Ids are handed out in increasing order and never reused, so a stale id
// simply stops resolving once its owner is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(u64);

impl AgentId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

// Stationary base shared by animals and plants
#[derive(Debug, Clone, PartialEq)]
pub struct Boid {
    position: Vec3,
    angle: f32,
    species: BoidType,
    min_distance: f32,
    movable: bool,
}

impl Boid {
    pub fn new(position: Vec3, species: BoidType) -> Self {
        Self {
            position,
            angle: 0.0,
            species,
            min_distance: 1.0,
            movable: species.is_movable(),
        }
    }

    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
    }

    pub fn species(&self) -> BoidType {
        self.species
    }

    /// Closest distance another boid is expected to come to this one.
    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn is_movable(&self) -> bool {
        self.movable
    }
}

/*
 * A rooted boid is either food (a finite amount that shrinks as it is
 * eaten) or an obstacle (no food at all, never exhausted).
 */
#[derive(Debug, Clone, PartialEq)]
pub struct RootedBoid {
    id: ResourceId,
    boid: Boid,
    food_remaining: Option<f32>,
}

impl RootedBoid {
    pub fn new(id: ResourceId, boid: Boid, food: Option<f32>) -> Self {
        Self {
            id,
            boid,
            food_remaining: food.map(|f| f.max(0.0)),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn boid(&self) -> &Boid {
        &self.boid
    }

    pub fn position(&self) -> Vec3 {
        self.boid.position()
    }

    pub fn species(&self) -> BoidType {
        self.boid.species()
    }

    pub fn is_edible(&self) -> bool {
        self.food_remaining.is_some()
    }

    pub fn food_remaining(&self) -> Option<f32> {
        self.food_remaining
    }

    // Obstacles never run out; food runs out at zero
    pub fn is_food_remaining(&self) -> bool {
        self.food_remaining.map_or(true, |food| food > 0.0)
    }

    /// Takes up to `amount` of food and returns how much was actually eaten.
    pub fn consume(&mut self, amount: f32) -> f32 {
        match self.food_remaining.as_mut() {
            Some(food) => {
                let eaten = amount.max(0.0).min(*food);
                *food -= eaten;
                eaten
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_names_round_trip_through_from_str() {
        for species in BoidType::ALL {
            assert_eq!(species.name().parse::<BoidType>(), Ok(species));
        }
        assert_eq!("  Wolf ".parse::<BoidType>(), Ok(BoidType::Wolf));
    }

    #[test]
    fn unknown_species_is_rejected() {
        assert_eq!(
            "dragon".parse::<BoidType>(),
            Err(BoidError::UnknownSpecies("dragon".to_owned()))
        );
    }

    #[test]
    fn consuming_food_stops_at_zero() {
        let boid = Boid::new(Vec3::ZERO, BoidType::Carrot);
        let mut carrot = RootedBoid::new(ResourceId::new(0), boid, Some(3.0));

        assert_eq!(carrot.consume(2.0), 2.0);
        assert_eq!(carrot.consume(2.0), 1.0);
        assert!(!carrot.is_food_remaining());
        assert_eq!(carrot.consume(2.0), 0.0);
    }

    #[test]
    fn obstacles_are_never_exhausted() {
        let boid = Boid::new(Vec3::ZERO, BoidType::Tree);
        let mut tree = RootedBoid::new(ResourceId::new(1), boid, None);

        assert_eq!(tree.consume(5.0), 0.0);
        assert!(tree.is_food_remaining());
        assert!(!tree.is_edible());
    }
}
