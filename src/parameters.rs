/*
 * Movable Parameters Module
 *
 * The drive model of one movable boid. It bundles the species constants the
 * boid was created with, the five needs that push it from one state to
 * another (hunger, thirst, stamina, danger, affinity) and the id of the boid
 * it currently follows.
 *
 * Every need lives in [0, 100]. Hunger and stamina count down towards
 * trouble (0 means starving or exhausted); thirst, danger and affinity count
 * up (100 means dying of thirst, terrified, or eager to mate).
 */

use crate::boid::AgentId;
use crate::params::SpeciesParams;

pub const DRIVE_MIN: f32 = 0.0;
pub const DRIVE_MAX: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Drive(f32);

impl Drive {
    pub fn new(value: f32) -> Self {
        Self(clamp_drive(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn increase(&mut self, amount: f32) {
        self.0 = clamp_drive(self.0 + amount.max(0.0));
    }

    pub fn decrease(&mut self, amount: f32) {
        self.0 = clamp_drive(self.0 - amount.max(0.0));
    }

    pub fn set(&mut self, value: f32) {
        self.0 = clamp_drive(value);
    }
}

fn clamp_drive(value: f32) -> f32 {
    if value.is_nan() {
        return DRIVE_MIN;
    }
    value.clamp(DRIVE_MIN, DRIVE_MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovableParameters {
    species: SpeciesParams,
    hunger: Drive,
    thirst: Drive,
    stamina: Drive,
    danger: Drive,
    affinity: Drive,
    leader: Option<AgentId>,
}

impl MovableParameters {
    pub fn new(species: SpeciesParams, stamina: f32) -> Self {
        Self {
            species,
            hunger: Drive::new(DRIVE_MAX),
            thirst: Drive::new(DRIVE_MIN),
            stamina: Drive::new(stamina),
            danger: Drive::new(DRIVE_MIN),
            affinity: Drive::new(DRIVE_MIN),
            leader: None,
        }
    }

    pub fn species(&self) -> &SpeciesParams {
        &self.species
    }

    // Species constants

    pub fn max_speed(&self) -> f32 {
        self.species.max_speed
    }

    pub fn max_force(&self) -> f32 {
        self.species.max_force
    }

    pub fn angle_view(&self) -> f32 {
        self.species.angle_view
    }

    pub fn dist_separate(&self) -> f32 {
        self.species.dist_view_separate
    }

    pub fn dist_view_cohesion(&self) -> f32 {
        self.species.dist_view_cohesion
    }

    pub fn dist_view_max(&self) -> f32 {
        self.species.dist_view_max
    }

    pub fn dist_start_slowing_down(&self) -> f32 {
        self.species.dist_start_slowing_down
    }

    pub fn radius_circle_wander(&self) -> f32 {
        self.species.r_circle_wander
    }

    pub fn dist_to_circle_wander(&self) -> f32 {
        self.species.dist_to_circle
    }

    // Hunger

    pub fn hunger(&self) -> f32 {
        self.hunger.value()
    }

    pub fn hunger_increase(&mut self) {
        self.hunger_increase_by(self.species.rates.hunger.increase);
    }

    pub fn hunger_increase_by(&mut self, amount: f32) {
        self.hunger.increase(amount);
    }

    pub fn hunger_decrease(&mut self) {
        self.hunger_decrease_by(self.species.rates.hunger.decrease);
    }

    pub fn hunger_decrease_by(&mut self, amount: f32) {
        self.hunger.decrease(amount);
    }

    // Thirst

    pub fn thirst(&self) -> f32 {
        self.thirst.value()
    }

    pub fn thirst_increase(&mut self) {
        self.thirst_increase_by(self.species.rates.thirst.increase);
    }

    pub fn thirst_increase_by(&mut self, amount: f32) {
        self.thirst.increase(amount);
    }

    pub fn thirst_decrease(&mut self) {
        self.thirst_decrease_by(self.species.rates.thirst.decrease);
    }

    pub fn thirst_decrease_by(&mut self, amount: f32) {
        self.thirst.decrease(amount);
    }

    // Stamina

    pub fn stamina(&self) -> f32 {
        self.stamina.value()
    }

    pub fn stamina_increase(&mut self) {
        self.stamina_increase_by(self.species.rates.stamina.increase);
    }

    pub fn stamina_increase_by(&mut self, amount: f32) {
        self.stamina.increase(amount);
    }

    pub fn stamina_decrease(&mut self) {
        self.stamina_decrease_by(self.species.rates.stamina.decrease);
    }

    pub fn stamina_decrease_by(&mut self, amount: f32) {
        self.stamina.decrease(amount);
    }

    // Running drains stamina faster than walking
    pub fn stamina_sprint(&mut self) {
        let rates = self.species.rates;
        self.stamina_decrease_by(rates.stamina.decrease * rates.sprint_factor);
    }

    // Danger

    pub fn danger(&self) -> f32 {
        self.danger.value()
    }

    pub fn danger_increase(&mut self) {
        self.danger.increase(self.species.rates.danger.increase);
    }

    pub fn danger_decrease(&mut self) {
        self.danger.decrease(self.species.rates.danger.decrease);
    }

    // Affinity

    pub fn affinity(&self) -> f32 {
        self.affinity.value()
    }

    pub fn affinity_increase(&mut self) {
        self.affinity.increase(self.species.rates.affinity.increase);
    }

    pub fn affinity_increase_by(&mut self, amount: f32) {
        self.affinity.increase(amount);
    }

    pub fn affinity_decrease(&mut self) {
        self.affinity.decrease(self.species.rates.affinity.decrease);
    }

    pub fn affinity_reset(&mut self) {
        self.affinity.set(DRIVE_MIN);
    }

    // Threshold predicates feeding the state machine

    pub fn is_low_stamina(&self) -> bool {
        self.stamina() <= self.species.thresholds.low_stamina
    }

    pub fn is_high_stamina(&self) -> bool {
        self.stamina() >= self.species.thresholds.high_stamina
    }

    pub fn is_exhausted(&self) -> bool {
        self.stamina() <= DRIVE_MIN
    }

    pub fn is_low_hunger(&self) -> bool {
        self.hunger() <= self.species.thresholds.low_hunger
    }

    pub fn is_sated(&self) -> bool {
        self.hunger() >= self.species.thresholds.high_hunger
    }

    pub fn is_thirsty(&self) -> bool {
        self.thirst() >= self.species.thresholds.high_thirst
    }

    pub fn is_quenched(&self) -> bool {
        self.thirst() <= self.species.thresholds.low_thirst
    }

    pub fn is_in_danger(&self) -> bool {
        self.danger() >= self.species.thresholds.danger
    }

    pub fn is_ready_to_mate(&self) -> bool {
        self.affinity() >= self.species.thresholds.mate_affinity
    }

    /// True once hunger has hit zero or thirst has hit its ceiling.
    pub fn is_starving(&self) -> bool {
        self.hunger() <= DRIVE_MIN || self.thirst() >= DRIVE_MAX
    }

    // Leader (who this boid follows, not who follows it)

    pub fn leader(&self) -> Option<AgentId> {
        self.leader
    }

    pub fn set_new_leader(&mut self, leader: Option<AgentId>) {
        self.leader = leader;
    }
}
