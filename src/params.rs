/*
 * Simulation Parameters Module
 *
 * This module holds every tunable the simulation reads:
 * - SimulationParams: world-wide settings (bounds, forecast constant, seed, ...)
 * - SpeciesParams: per-species constants for movable boids
 * - RootedParams: per-species constants for plants and obstacles
 * - SpeciesCatalog: the injected table the manager builds boids from
 *
 * Everything is plain data with serde derives so a driver can load it from
 * JSON. The simulation core itself never touches the filesystem.
 */

use std::collections::BTreeMap;
use std::f32::consts::PI;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::boid::BoidType;
use crate::error::{BoidError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub world_size: f32,
    pub wall_margin: f32,
    // Multiplier applied to velocity * dt when forecasting positions
    pub forecast_factor: f32,
    // Largest random angular step taken by wander, in radians
    pub wander_jitter: f32,
    pub lost_wander_scale: f32,
    pub leader_follow_distance: f32,
    pub drink_distance: f32,
    pub mate_distance: f32,
    // Stamina a caught prey loses each tick an attacker holds it
    pub bite_damage: f32,
    pub search_timeout: u32,
    pub max_population: usize,
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            world_size: 200.0,
            wall_margin: 10.0,
            forecast_factor: 1.0,
            wander_jitter: 0.35,
            lost_wander_scale: 2.0,
            leader_follow_distance: 3.0,
            drink_distance: 1.5,
            mate_distance: 1.5,
            bite_damage: 25.0,
            search_timeout: 150,
            max_population: 400,
            seed: 0x5eed,
        }
    }
}

impl SimulationParams {
    pub fn half_world(&self) -> f32 {
        self.world_size / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("world_size", self.world_size),
            ("forecast_factor", self.forecast_factor),
            ("lost_wander_scale", self.lost_wander_scale),
            ("drink_distance", self.drink_distance),
            ("mate_distance", self.mate_distance),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(BoidError::InvalidSimulation { field, value });
            }
        }

        let non_negative = [
            ("wall_margin", self.wall_margin),
            ("wander_jitter", self.wander_jitter),
            ("leader_follow_distance", self.leader_follow_distance),
            ("bite_damage", self.bite_damage),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(BoidError::InvalidSimulation { field, value });
            }
        }

        if self.wall_margin * 2.0 >= self.world_size {
            return Err(BoidError::InvalidSimulation {
                field: "wall_margin",
                value: self.wall_margin,
            });
        }

        Ok(())
    }
}

// Increase and decrease steps of one drive, applied once per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepSizes {
    pub increase: f32,
    pub decrease: f32,
}

impl StepSizes {
    pub const fn new(increase: f32, decrease: f32) -> Self {
        Self { increase, decrease }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveRates {
    pub hunger: StepSizes,
    pub thirst: StepSizes,
    pub stamina: StepSizes,
    pub danger: StepSizes,
    pub affinity: StepSizes,
    // Stamina drain multiplier while fleeing or attacking
    pub sprint_factor: f32,
}

impl Default for DriveRates {
    fn default() -> Self {
        Self {
            hunger: StepSizes::new(1.0, 0.02),
            thirst: StepSizes::new(0.025, 1.0),
            stamina: StepSizes::new(0.5, 0.05),
            danger: StepSizes::new(25.0, 2.0),
            affinity: StepSizes::new(0.04, 1.0),
            sprint_factor: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub low_stamina: f32,
    pub high_stamina: f32,
    pub low_hunger: f32,
    pub high_hunger: f32,
    pub low_thirst: f32,
    pub high_thirst: f32,
    pub danger: f32,
    pub mate_affinity: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_stamina: 10.0,
            high_stamina: 90.0,
            low_hunger: 10.0,
            high_hunger: 90.0,
            low_thirst: 5.0,
            high_thirst: 80.0,
            danger: 20.0,
            mate_affinity: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesParams {
    pub max_speed: f32,
    pub max_force: f32,
    // Half-angle of the vision cone, radians
    pub angle_view: f32,
    pub dist_view_separate: f32,
    pub dist_view_cohesion: f32,
    pub dist_view_max: f32,
    pub dist_start_slowing_down: f32,
    pub r_circle_wander: f32,
    pub dist_to_circle: f32,
    pub mass: f32,
    pub min_distance: f32,
    pub eat_distance: f32,
    // A hunter closes in with pursuit until its prey is this near
    pub attack_distance: f32,
    // Food a carcass of this species is worth to its hunter
    pub food_value: f32,
    pub prey: BoidType,
    pub predator: Option<BoidType>,
    pub thresholds: Thresholds,
    pub rates: DriveRates,
    pub stay_interval: u32,
    pub stay_duration: u32,
}

impl Default for SpeciesParams {
    fn default() -> Self {
        Self::rabbit()
    }
}

impl SpeciesParams {
    pub fn rabbit() -> Self {
        Self {
            max_speed: 3.5,
            max_force: 2.0,
            angle_view: 3.0 * PI / 4.0,
            dist_view_separate: 2.0,
            dist_view_cohesion: 6.0,
            dist_view_max: 12.0,
            dist_start_slowing_down: 5.0,
            r_circle_wander: 9.0,
            dist_to_circle: 3.0,
            mass: 1.0,
            min_distance: 1.0,
            eat_distance: 1.0,
            attack_distance: 5.0,
            food_value: 60.0,
            prey: BoidType::Carrot,
            predator: Some(BoidType::Wolf),
            thresholds: Thresholds::default(),
            rates: DriveRates::default(),
            stay_interval: 400,
            stay_duration: 60,
        }
    }

    pub fn wolf() -> Self {
        Self {
            max_speed: 4.5,
            max_force: 2.5,
            angle_view: 2.0 * PI / 3.0,
            dist_view_separate: 3.0,
            dist_view_cohesion: 10.0,
            dist_view_max: 20.0,
            dist_start_slowing_down: 6.0,
            r_circle_wander: 9.0,
            dist_to_circle: 4.0,
            mass: 1.5,
            min_distance: 1.5,
            eat_distance: 3.0,
            attack_distance: 8.0,
            food_value: 80.0,
            prey: BoidType::Rabbit,
            predator: None,
            thresholds: Thresholds {
                low_hunger: 30.0,
                ..Thresholds::default()
            },
            rates: DriveRates {
                hunger: StepSizes::new(1.0, 0.03),
                sprint_factor: 2.0,
                ..DriveRates::default()
            },
            stay_interval: 600,
            stay_duration: 90,
        }
    }

    /// Built-in constants of a movable species, the base any JSON entry
    /// for it is merged onto.
    pub fn defaults_for(species: BoidType) -> Self {
        match species {
            BoidType::Wolf => Self::wolf(),
            _ => Self::rabbit(),
        }
    }

    fn validate(&self, species: BoidType) -> Result<()> {
        if self.prey == species {
            return Err(BoidError::SelfRelation { species, role: "prey" });
        }
        if self.predator == Some(species) {
            return Err(BoidError::SelfRelation { species, role: "predator" });
        }

        let positive = [
            ("max_speed", self.max_speed),
            ("max_force", self.max_force),
            ("angle_view", self.angle_view),
            ("dist_view_separate", self.dist_view_separate),
            ("dist_view_cohesion", self.dist_view_cohesion),
            ("dist_view_max", self.dist_view_max),
            ("dist_start_slowing_down", self.dist_start_slowing_down),
            ("r_circle_wander", self.r_circle_wander),
            ("mass", self.mass),
            ("eat_distance", self.eat_distance),
            ("attack_distance", self.attack_distance),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(BoidError::InvalidParameter { species, field, value });
            }
        }

        let t = &self.thresholds;
        let percentages = [
            ("thresholds.low_stamina", t.low_stamina),
            ("thresholds.high_stamina", t.high_stamina),
            ("thresholds.low_hunger", t.low_hunger),
            ("thresholds.high_hunger", t.high_hunger),
            ("thresholds.low_thirst", t.low_thirst),
            ("thresholds.high_thirst", t.high_thirst),
            ("thresholds.danger", t.danger),
            ("thresholds.mate_affinity", t.mate_affinity),
        ];
        for (field, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(BoidError::InvalidParameter { species, field, value });
            }
        }

        let r = &self.rates;
        let steps = [
            ("rates.hunger", r.hunger),
            ("rates.thirst", r.thirst),
            ("rates.stamina", r.stamina),
            ("rates.danger", r.danger),
            ("rates.affinity", r.affinity),
        ];
        for (field, step) in steps {
            for value in [step.increase, step.decrease] {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(BoidError::InvalidParameter { species, field, value });
                }
            }
        }

        let non_negative = [
            ("dist_to_circle", self.dist_to_circle),
            ("min_distance", self.min_distance),
            ("food_value", self.food_value),
            ("rates.sprint_factor", r.sprint_factor),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(BoidError::InvalidParameter { species, field, value });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootedParams {
    // None marks an obstacle that can't be eaten
    pub food: Option<f32>,
    pub min_distance: f32,
}

impl RootedParams {
    pub fn carrot() -> Self {
        Self {
            food: Some(40.0),
            min_distance: 0.5,
        }
    }

    pub fn tree() -> Self {
        Self {
            food: None,
            min_distance: 2.0,
        }
    }
}

/*
 * The catalog is resolved once when a boid is created; the boid keeps its
 * own copy of the constants afterwards.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCatalog {
    #[serde(default, deserialize_with = "movable_over_species_defaults")]
    movable: BTreeMap<BoidType, SpeciesParams>,
    #[serde(default)]
    rooted: BTreeMap<BoidType, RootedParams>,
}

// Each JSON entry only overrides the fields it names; everything else,
// nested tables included, keeps that species' own built-in value
fn movable_over_species_defaults<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<BoidType, SpeciesParams>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = BTreeMap::<BoidType, Value>::deserialize(deserializer)?;
    entries
        .into_iter()
        .map(|(species, overrides)| {
            let mut merged =
                serde_json::to_value(SpeciesParams::defaults_for(species)).map_err(D::Error::custom)?;
            merge_json(&mut merged, overrides);
            let params: SpeciesParams = serde_json::from_value(merged).map_err(D::Error::custom)?;
            Ok::<_, D::Error>((species, params))
        })
        .collect()
}

fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.movable.insert(BoidType::Rabbit, SpeciesParams::rabbit());
        catalog.movable.insert(BoidType::Wolf, SpeciesParams::wolf());
        catalog.rooted.insert(BoidType::Carrot, RootedParams::carrot());
        catalog.rooted.insert(BoidType::Tree, RootedParams::tree());
        catalog
    }
}

impl SpeciesCatalog {
    pub fn empty() -> Self {
        Self {
            movable: BTreeMap::new(),
            rooted: BTreeMap::new(),
        }
    }

    pub fn movable(&self, species: BoidType) -> Result<&SpeciesParams> {
        if !species.is_movable() {
            return Err(BoidError::NotMovable(species));
        }
        self.movable
            .get(&species)
            .ok_or(BoidError::MissingSpecies(species))
    }

    pub fn rooted(&self, species: BoidType) -> Result<&RootedParams> {
        if species.is_movable() {
            return Err(BoidError::NotRooted(species));
        }
        self.rooted
            .get(&species)
            .ok_or(BoidError::MissingSpecies(species))
    }

    pub fn insert_movable(&mut self, species: BoidType, params: SpeciesParams) -> Result<()> {
        if !species.is_movable() {
            return Err(BoidError::NotMovable(species));
        }
        params.validate(species)?;
        self.movable.insert(species, params);
        Ok(())
    }

    pub fn insert_rooted(&mut self, species: BoidType, params: RootedParams) -> Result<()> {
        if species.is_movable() {
            return Err(BoidError::NotRooted(species));
        }
        self.rooted.insert(species, params);
        Ok(())
    }

    pub fn movable_species(&self) -> impl Iterator<Item = BoidType> + '_ {
        self.movable.keys().copied()
    }

    // Run once before the first tick; a bad catalog never reaches the loop
    pub fn validate(&self) -> Result<()> {
        for (&species, params) in &self.movable {
            if !species.is_movable() {
                return Err(BoidError::NotMovable(species));
            }
            params.validate(species)?;
        }
        for (&species, params) in &self.rooted {
            if species.is_movable() {
                return Err(BoidError::NotRooted(species));
            }
            if let Some(food) = params.food {
                if !(food.is_finite() && food >= 0.0) {
                    return Err(BoidError::InvalidParameter {
                        species,
                        field: "food",
                        value: food,
                    });
                }
            }
        }
        Ok(())
    }
}
