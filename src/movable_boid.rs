/*
 * Movable Boid Module
 *
 * A movable boid is a Boid with kinematics (velocity, acceleration, mass),
 * a behaviour state, a drive model and a handful of links to other boids:
 * who it follows, who hunts it, what it is eating and who it courts.
 *
 * Links are ids, never references. They are resolved against the current
 * tick's snapshot and simply stop resolving when the other boid is removed.
 */

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use log::debug;

use crate::boid::{AgentId, Boid, BoidType, ResourceId};
use crate::parameters::MovableParameters;
use crate::state::MovableState;

// Vision cones this wide see everything; the cone test is skipped
const FULL_CIRCLE_TOLERANCE: f32 = 1e-4;
const MIN_HEADING_SPEED: f32 = 1e-4;

/// What a boid is currently eating or chasing. Holding a single value makes
/// "a movable prey and a rooted prey at the same time" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prey {
    Movable(AgentId),
    Rooted(ResourceId),
}

/// Read-only copy of the parts of a boid other boids may look at during a
/// tick. Every boid reads the same snapshot, whatever order they run in.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub species: BoidType,
    pub position: Vec3,
    pub velocity: Vec3,
    pub angle: f32,
    pub alive: bool,
    pub state: MovableState,
    pub stamina: f32,
    pub affinity: f32,
    pub ready_to_mate: bool,
    pub eat_distance: f32,
    pub food_value: f32,
    pub prey: Option<Prey>,
    pub leader: Option<AgentId>,
    pub soulmate: Option<AgentId>,
}

impl AgentSnapshot {
    pub fn is_leader(&self) -> bool {
        self.leader == Some(self.id)
    }
}

#[derive(Debug, Clone)]
pub struct MovableBoid {
    id: AgentId,
    boid: Boid,
    velocity: Vec3,
    acceleration: Vec3,
    mass: f32,
    alive: bool,
    state: MovableState,
    ticks_in_state: u32,
    parameters: MovableParameters,
    prey: Option<Prey>,
    hunter: Option<AgentId>,
    soulmate: Option<AgentId>,
    predator: Option<BoidType>,
}

impl MovableBoid {
    pub fn new(
        id: AgentId,
        species: BoidType,
        position: Vec3,
        velocity: Vec3,
        parameters: MovableParameters,
    ) -> Self {
        let constants = parameters.species();
        let boid = Boid::new(position, species).with_min_distance(constants.min_distance);
        let mass = constants.mass;
        let predator = constants.predator;
        let velocity = velocity.clamp_length_max(parameters.max_speed());

        let mut movable = Self {
            id,
            boid,
            velocity,
            acceleration: Vec3::ZERO,
            mass,
            alive: true,
            state: MovableState::Walk,
            ticks_in_state: 0,
            parameters,
            prey: None,
            hunter: None,
            soulmate: None,
            predator,
        };
        movable.update_angle();
        movable
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn boid(&self) -> &Boid {
        &self.boid
    }

    pub fn position(&self) -> Vec3 {
        self.boid.position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.boid.set_position(position);
    }

    pub fn angle(&self) -> f32 {
        self.boid.angle()
    }

    pub fn species(&self) -> BoidType {
        self.boid.species()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity.clamp_length_max(self.parameters.max_speed());
        self.update_angle();
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn state(&self) -> MovableState {
        self.state
    }

    pub fn ticks_in_state(&self) -> u32 {
        self.ticks_in_state
    }

    pub fn parameters(&self) -> &MovableParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut MovableParameters {
        &mut self.parameters
    }

    pub fn eat_distance(&self) -> f32 {
        self.parameters.species().eat_distance
    }

    pub fn prey_species(&self) -> BoidType {
        self.parameters.species().prey
    }

    pub fn predator_type(&self) -> Option<BoidType> {
        self.predator
    }

    pub fn set_predator_type(&mut self, predator: Option<BoidType>) {
        self.predator = predator;
    }

    // Relationship links

    pub fn prey(&self) -> Option<Prey> {
        self.prey
    }

    pub fn has_prey(&self) -> bool {
        self.prey.is_some()
    }

    pub fn movable_prey(&self) -> Option<AgentId> {
        match self.prey {
            Some(Prey::Movable(id)) => Some(id),
            _ => None,
        }
    }

    pub fn rooted_prey(&self) -> Option<ResourceId> {
        match self.prey {
            Some(Prey::Rooted(id)) => Some(id),
            _ => None,
        }
    }

    // Setting one kind of prey always replaces the other
    pub fn set_movable_prey(&mut self, prey: AgentId) {
        self.prey = Some(Prey::Movable(prey));
    }

    pub fn set_rooted_prey(&mut self, prey: ResourceId) {
        self.prey = Some(Prey::Rooted(prey));
    }

    pub fn clear_prey(&mut self) {
        self.prey = None;
    }

    pub fn hunter(&self) -> Option<AgentId> {
        self.hunter
    }

    pub fn set_hunter(&mut self, hunter: Option<AgentId>) {
        self.hunter = hunter;
    }

    pub fn soulmate(&self) -> Option<AgentId> {
        self.soulmate
    }

    pub fn set_soulmate(&mut self, soulmate: Option<AgentId>) {
        self.soulmate = soulmate;
    }

    pub fn leader(&self) -> Option<AgentId> {
        self.parameters.leader()
    }

    pub fn set_new_leader(&mut self, leader: Option<AgentId>) {
        self.parameters.set_new_leader(leader);
    }

    pub fn is_leader(&self) -> bool {
        self.parameters.leader() == Some(self.id)
    }

    // Following itself does not count as having a leader
    pub fn has_leader(&self) -> bool {
        matches!(self.parameters.leader(), Some(leader) if leader != self.id)
    }

    // Vision

    /// Unit heading in the ground plane. Falls back to the facing angle when
    /// the boid is standing still.
    pub fn forward(&self) -> Vec2 {
        self.velocity
            .truncate()
            .try_normalize()
            .unwrap_or_else(|| Vec2::from_angle(self.angle()))
    }

    pub fn dist_vision(&self, other: Vec3, dist_view: f32) -> bool {
        self.position().distance_squared(other) <= dist_view * dist_view
    }

    pub fn angle_vision(&self, other: Vec3) -> bool {
        let half_angle = self.parameters.angle_view();
        if half_angle >= PI - FULL_CIRCLE_TOLERANCE {
            return true;
        }

        let Some(to_other) = (other - self.position()).truncate().try_normalize() else {
            // Standing on top of it
            return true;
        };
        let cos = self.forward().dot(to_other).clamp(-1.0, 1.0);
        cos.acos() <= half_angle
    }

    pub fn can_see(&self, other: Vec3, dist_view: f32) -> bool {
        self.dist_vision(other, dist_view) && self.angle_vision(other)
    }

    pub fn same_species(&self, other: BoidType) -> bool {
        self.species() == other
    }

    // Kinematics

    pub fn reset_acceleration(&mut self) {
        self.acceleration = Vec3::ZERO;
    }

    pub(crate) fn set_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration = if acceleration.is_finite() {
            acceleration
        } else {
            Vec3::ZERO
        };
    }

    /// Integrates one time step: velocity from acceleration (capped at the
    /// species' max speed), then position from velocity.
    pub fn compute_next_step(&mut self, dt: f32) {
        let mut velocity = self.velocity + self.acceleration * dt;
        if !velocity.is_finite() {
            velocity = Vec3::ZERO;
        }
        self.velocity = velocity.clamp_length_max(self.parameters.max_speed());

        let position = self.position() + self.velocity * dt;
        self.boid.set_position(position);
        self.update_angle();
    }

    // Boids walk on the terrain; the vertical component never survives a step
    pub(crate) fn settle_on_ground(&mut self, height: f32) {
        let mut position = self.position();
        position.z = height;
        self.boid.set_position(position);
        self.velocity.z = 0.0;
    }

    fn update_angle(&mut self) {
        let planar = self.velocity.truncate();
        if planar.length_squared() > MIN_HEADING_SPEED * MIN_HEADING_SPEED {
            self.boid.set_angle(planar.y.atan2(planar.x));
        }
    }

    // Drives

    /// Per-tick bookkeeping of the needs this boid can settle on its own.
    /// Eating is settled by the manager, which owns the food.
    pub fn update_drives(&mut self) {
        if !self.alive {
            return;
        }
        self.ticks_in_state = self.ticks_in_state.saturating_add(1);

        let params = &mut self.parameters;
        params.hunger_decrease();
        params.thirst_increase();

        match self.state {
            MovableState::Sleep => params.stamina_increase(),
            MovableState::Stay | MovableState::Eat | MovableState::Drink => {}
            MovableState::Flee | MovableState::Attack => params.stamina_sprint(),
            _ => params.stamina_decrease(),
        }

        if self.state == MovableState::Drink {
            params.thirst_decrease();
        }
        if self.state != MovableState::Mate {
            params.affinity_increase();
        }
    }

    // State

    /// Moves the boid into `next`, applying the entry rules of that state.
    /// Dead is absorbing: nothing leaves it.
    pub fn switch_to_state(&mut self, next: MovableState) {
        if self.state == MovableState::Dead || self.state == next {
            return;
        }
        debug!(
            "{} ({}) {:?} -> {:?}",
            self.id,
            self.species(),
            self.state,
            next
        );

        let previous = self.state;
        self.state = next;
        self.ticks_in_state = 0;

        if previous == MovableState::Mate {
            self.soulmate = None;
        }
        if !matches!(next, MovableState::Attack | MovableState::Eat) {
            self.prey = None;
        }
        if next.is_stationary() {
            self.velocity = Vec3::ZERO;
            self.acceleration = Vec3::ZERO;
        }
        if next == MovableState::Dead {
            self.alive = false;
            self.hunter = None;
            self.soulmate = None;
            self.parameters.set_new_leader(None);
        }
    }

    pub fn kill(&mut self) {
        self.switch_to_state(MovableState::Dead);
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            species: self.species(),
            position: self.position(),
            velocity: self.velocity,
            angle: self.angle(),
            alive: self.alive,
            state: self.state,
            stamina: self.parameters.stamina(),
            affinity: self.parameters.affinity(),
            ready_to_mate: self.parameters.is_ready_to_mate(),
            eat_distance: self.eat_distance(),
            food_value: self.parameters.species().food_value,
            prey: self.prey,
            leader: self.parameters.leader(),
            soulmate: self.soulmate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SpeciesParams;
    use approx::assert_abs_diff_eq;

    fn rabbit_at(id: u64, position: Vec3, velocity: Vec3) -> MovableBoid {
        let params = MovableParameters::new(SpeciesParams::rabbit(), 50.0);
        MovableBoid::new(AgentId::new(id), BoidType::Rabbit, position, velocity, params)
    }

    #[test]
    fn speed_is_capped_after_integration() {
        let mut rabbit = rabbit_at(0, Vec3::ZERO, Vec3::X);
        rabbit.set_acceleration(Vec3::new(1000.0, 0.0, 0.0));
        rabbit.compute_next_step(1.0);

        let max_speed = rabbit.parameters().max_speed();
        assert_abs_diff_eq!(rabbit.velocity().length(), max_speed, epsilon = 1e-5);
        assert_abs_diff_eq!(rabbit.position().x, max_speed, epsilon = 1e-5);
    }

    #[test]
    fn non_finite_acceleration_is_discarded() {
        let mut rabbit = rabbit_at(0, Vec3::ZERO, Vec3::X);
        rabbit.set_acceleration(Vec3::new(f32::NAN, 0.0, 0.0));
        rabbit.compute_next_step(0.5);
        assert!(rabbit.position().is_finite());
        assert!(rabbit.velocity().is_finite());
    }

    #[test]
    fn facing_angle_follows_velocity() {
        let rabbit = rabbit_at(0, Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0));
        assert_abs_diff_eq!(rabbit.angle(), PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn behind_the_cone_is_invisible() {
        let rabbit = rabbit_at(0, Vec3::ZERO, Vec3::X);
        assert!(rabbit.can_see(Vec3::new(5.0, 0.0, 0.0), 10.0));
        assert!(!rabbit.can_see(Vec3::new(-5.0, 0.0, 0.0), 10.0));
        assert!(!rabbit.can_see(Vec3::new(50.0, 0.0, 0.0), 10.0));
    }

    #[test]
    fn full_circle_vision_sees_behind() {
        let mut constants = SpeciesParams::rabbit();
        constants.angle_view = PI;
        let params = MovableParameters::new(constants, 50.0);
        let rabbit = MovableBoid::new(AgentId::new(0), BoidType::Rabbit, Vec3::ZERO, Vec3::X, params);

        assert!(rabbit.can_see(Vec3::new(-5.0, 0.0, 0.0), 10.0));
        assert!(rabbit.can_see(Vec3::new(-5.0, 0.001, 0.0), 10.0));
    }

    #[test]
    fn prey_kinds_are_mutually_exclusive() {
        let mut wolf = rabbit_at(0, Vec3::ZERO, Vec3::ZERO);
        wolf.set_movable_prey(AgentId::new(7));
        wolf.set_rooted_prey(ResourceId::new(3));
        assert_eq!(wolf.movable_prey(), None);
        assert_eq!(wolf.rooted_prey(), Some(ResourceId::new(3)));

        wolf.set_movable_prey(AgentId::new(7));
        assert_eq!(wolf.rooted_prey(), None);
        assert_eq!(wolf.movable_prey(), Some(AgentId::new(7)));
    }

    #[test]
    fn dead_is_absorbing() {
        let mut rabbit = rabbit_at(0, Vec3::ZERO, Vec3::X);
        rabbit.set_hunter(Some(AgentId::new(4)));
        rabbit.kill();

        assert!(!rabbit.is_alive());
        assert_eq!(rabbit.velocity(), Vec3::ZERO);
        assert_eq!(rabbit.hunter(), None);

        rabbit.switch_to_state(MovableState::Walk);
        assert_eq!(rabbit.state(), MovableState::Dead);
    }

    #[test]
    fn resting_states_stop_the_boid() {
        let mut rabbit = rabbit_at(0, Vec3::ZERO, Vec3::X);
        rabbit.switch_to_state(MovableState::Sleep);
        assert_eq!(rabbit.velocity(), Vec3::ZERO);
    }

    #[test]
    fn leaving_the_hunt_drops_the_prey() {
        let mut wolf = rabbit_at(0, Vec3::ZERO, Vec3::X);
        wolf.switch_to_state(MovableState::FindFood);
        wolf.set_movable_prey(AgentId::new(9));
        wolf.switch_to_state(MovableState::Attack);
        assert_eq!(wolf.movable_prey(), Some(AgentId::new(9)));

        wolf.switch_to_state(MovableState::Walk);
        assert!(!wolf.has_prey());
    }
}
