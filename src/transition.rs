/*
 * Transition Module
 *
 * Decides, once per tick and after everyone has moved, which state a boid
 * is in next. The boid only ever changes itself; anything it knows about
 * other boids comes from the post-integration WorldView.
 *
 * Checks run in a fixed order:
 * 1. death (starvation, dehydration, caught while exhausted)
 * 2. danger (a sensed hunter and a danger drive over threshold -> Flee)
 * 3. the current state's own exits
 */

use glam::{Vec2, Vec3};
use log::{debug, warn};

use crate::boid::{AgentId, BoidType};
use crate::manager::WorldView;
use crate::movable_boid::{AgentSnapshot, MovableBoid, Prey};
use crate::parameters::{DRIVE_MAX, DRIVE_MIN};
use crate::state::MovableState;

/// A completed mating asks the registry for one new boid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offspring {
    pub species: BoidType,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Starvation,
    Dehydration,
    Killed(AgentId),
}

// Distances between boids are measured on the ground plane
fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    a.truncate().distance(b.truncate())
}

impl MovableBoid {
    /// Runs the transition checks and applies the resulting switch, if any.
    pub fn evaluate_transition(&mut self, world: &WorldView<'_>) -> Option<Offspring> {
        if !self.is_alive() {
            return None;
        }

        if let Some(cause) = self.fatal_condition(world) {
            debug!("{} ({}) died: {:?}", self.id(), self.species(), cause);
            self.kill();
            return None;
        }

        let state = self.state();
        if state == MovableState::Test {
            return None;
        }
        if state != MovableState::Flee && self.is_threatened(world) {
            self.switch_to_state(MovableState::Flee);
            return None;
        }

        let mut offspring = None;
        let next = match state {
            MovableState::Walk => self.next_from_walk(world),
            MovableState::Stay => (self.ticks_in_state() >= self.parameters().species().stay_duration)
                .then_some(MovableState::Walk),
            MovableState::FindFood => self.next_from_find_food(world),
            MovableState::Attack => self.next_from_attack(world),
            MovableState::Eat => self.next_from_eat(world),
            MovableState::Flee => {
                (!self.is_threatened(world)).then_some(MovableState::Walk)
            }
            MovableState::Lost => self.next_from_lost(world),
            MovableState::Sleep => self
                .parameters()
                .is_high_stamina()
                .then_some(MovableState::Walk),
            MovableState::FindWater => self.next_from_find_water(world),
            MovableState::Drink => self
                .parameters()
                .is_quenched()
                .then_some(MovableState::Walk),
            MovableState::Mate => {
                let (next, child) = self.next_from_mate(world);
                offspring = child;
                next
            }
            MovableState::Test | MovableState::Dead => None,
        };

        if let Some(next) = next {
            self.switch_to_state(next);
        }
        offspring
    }

    /*
     * A boid caught by an attacker is worn down bite by bite; once its
     * stamina is gone the same contact kills it. The attacker reads the same
     * snapshot and claims the carcass in the same evaluation.
     */
    fn fatal_condition(&mut self, world: &WorldView<'_>) -> Option<DeathCause> {
        let params = self.parameters();
        if params.hunger() <= DRIVE_MIN {
            return Some(DeathCause::Starvation);
        }
        if params.thirst() >= DRIVE_MAX {
            return Some(DeathCause::Dehydration);
        }

        let attacker = self.attacker_in_reach(world)?;
        if self.parameters().is_exhausted() {
            return Some(DeathCause::Killed(attacker));
        }
        let bite = world.params().bite_damage;
        self.parameters_mut().stamina_decrease_by(bite);
        None
    }

    fn attacker_in_reach(&self, world: &WorldView<'_>) -> Option<AgentId> {
        let me = Some(Prey::Movable(self.id()));
        world
            .agents()
            .iter()
            .find(|other| {
                other.alive
                    && other.state == MovableState::Attack
                    && other.prey == me
                    && planar_distance(other.position, self.position()) <= other.eat_distance
            })
            .map(|other| other.id)
    }

    fn is_threatened(&self, world: &WorldView<'_>) -> bool {
        let hunter_alive = self
            .hunter()
            .is_some_and(|id| world.living_agent(id).is_some());
        hunter_alive && self.parameters().is_in_danger()
    }

    // Visible living boids of the same species
    fn visible_kin<'w>(
        &'w self,
        world: &'w WorldView<'_>,
    ) -> impl Iterator<Item = &'w AgentSnapshot> + 'w {
        let range = self.parameters().dist_view_max();
        world.agents().iter().filter(move |other| {
            other.alive
                && other.id != self.id()
                && self.same_species(other.species)
                && self.can_see(other.position, range)
        })
    }

    fn is_alone(&self, world: &WorldView<'_>) -> bool {
        self.visible_kin(world).next().is_none()
    }

    fn find_partner(&self, world: &WorldView<'_>) -> Option<AgentId> {
        let position = self.position();
        let me = Some(self.id());
        self.visible_kin(world)
            .filter(|other| {
                other.ready_to_mate
                    && (other.state == MovableState::Walk
                        || (other.state == MovableState::Mate && other.soulmate == me))
            })
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
            .map(|other| other.id)
    }

    fn next_from_walk(&mut self, world: &WorldView<'_>) -> Option<MovableState> {
        let params = self.parameters();
        if params.is_low_stamina() {
            return Some(MovableState::Sleep);
        }
        if params.is_low_hunger() {
            return Some(MovableState::FindFood);
        }
        if params.is_thirsty() && world.nearest_lake(self.position().truncate()).is_some() {
            return Some(MovableState::FindWater);
        }
        if params.is_ready_to_mate() {
            if let Some(partner) = self.find_partner(world) {
                self.set_soulmate(Some(partner));
                return Some(MovableState::Mate);
            }
        }
        if world.is_night() && world.followed_leader(self).is_none() && self.is_alone(world) {
            return Some(MovableState::Lost);
        }
        if self.ticks_in_state() >= self.parameters().species().stay_interval {
            return Some(MovableState::Stay);
        }
        None
    }

    fn next_from_find_food(&mut self, world: &WorldView<'_>) -> Option<MovableState> {
        if self.parameters().is_sated() {
            return Some(MovableState::Walk);
        }
        match self.prey() {
            Some(Prey::Movable(id)) => {
                let target = world.living_agent(id)?;
                let reach = self.parameters().species().attack_distance;
                (planar_distance(self.position(), target.position) <= reach)
                    .then_some(MovableState::Attack)
            }
            Some(Prey::Rooted(id)) => {
                let food = world.resource(id)?;
                let reach = self.eat_distance() + food.boid().min_distance();
                (planar_distance(self.position(), food.position()) <= reach)
                    .then_some(MovableState::Eat)
            }
            None => (self.ticks_in_state() >= world.params().search_timeout)
                .then_some(MovableState::Walk),
        }
    }

    fn next_from_attack(&mut self, world: &WorldView<'_>) -> Option<MovableState> {
        let range = self.parameters().dist_view_max();
        let Some(target) = self
            .movable_prey()
            .and_then(|id| world.living_agent(id))
            .filter(|target| self.dist_vision(target.position, range))
        else {
            return Some(MovableState::FindFood);
        };

        let caught = planar_distance(self.position(), target.position) <= self.eat_distance();
        if caught && target.stamina <= DRIVE_MIN {
            debug!("{} ({}) killed {}", self.id(), self.species(), target.id);
            let meal = target.food_value;
            self.parameters_mut().hunger_increase_by(meal);
            return Some(MovableState::Eat);
        }
        if self.parameters().is_exhausted() {
            return Some(MovableState::Sleep);
        }
        None
    }

    fn next_from_eat(&self, world: &WorldView<'_>) -> Option<MovableState> {
        match self.prey() {
            // A carcass is credited in one go on the kill
            Some(Prey::Movable(_)) | None => Some(MovableState::Walk),
            Some(Prey::Rooted(id)) => {
                let food_left = world
                    .resource(id)
                    .is_some_and(|food| food.is_food_remaining());
                (!food_left || self.parameters().is_sated()).then_some(MovableState::Walk)
            }
        }
    }

    fn next_from_lost(&self, world: &WorldView<'_>) -> Option<MovableState> {
        let found = !world.is_night()
            || world.followed_leader(self).is_some()
            || !self.is_alone(world);
        found.then_some(MovableState::Walk)
    }

    fn next_from_find_water(&self, world: &WorldView<'_>) -> Option<MovableState> {
        let position: Vec2 = self.position().truncate();
        match world.nearest_lake(position) {
            None => {
                warn!("{} ({}) found no lake to drink from", self.id(), self.species());
                Some(MovableState::Walk)
            }
            Some(shore) if shore.distance(position) <= world.params().drink_distance => {
                Some(MovableState::Drink)
            }
            Some(_) => None,
        }
    }

    fn next_from_mate(&mut self, world: &WorldView<'_>) -> (Option<MovableState>, Option<Offspring>) {
        let me = Some(self.id());
        let partner = self
            .soulmate()
            .and_then(|id| world.living_agent(id))
            .filter(|partner| partner.state == MovableState::Mate && partner.soulmate == me);
        let Some(partner) = partner else {
            return (Some(MovableState::Walk), None);
        };

        if planar_distance(self.position(), partner.position) <= world.params().mate_distance {
            self.parameters_mut().affinity_reset();
            // Only one of the two asks for the child
            let child = (self.id() < partner.id).then(|| Offspring {
                species: self.species(),
                position: self.position().lerp(partner.position, 0.5),
            });
            return (Some(MovableState::Walk), child);
        }

        if self.ticks_in_state() >= world.params().search_timeout {
            return (Some(MovableState::Walk), None);
        }
        (None, None)
    }
}
