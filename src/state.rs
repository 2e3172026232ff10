/*
 * Behaviour State Module
 *
 * MovableState is the closed set of behaviours a movable boid can be in.
 * Each variant turns the boid's surroundings into one steering force:
 *
 *   compute_acceleration = reset + perceive + steering_force / mass
 *
 * Perception is the only part allowed to write to the boid here: it keeps
 * the hunter link and the danger drive current and, while looking for food,
 * picks a prey. Everything else reads the tick's WorldView snapshot.
 *
 * Transitions between variants live in transition.rs.
 */

use std::fmt;

use glam::Vec3;
use rand::Rng;

use crate::manager::WorldView;
use crate::movable_boid::{MovableBoid, Prey};
use crate::steering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MovableState {
    // Wander inside the walls, nothing else; used to exercise the steering code
    Test,
    Walk,
    Stay,
    FindFood,
    Attack,
    Eat,
    Flee,
    Lost,
    Sleep,
    FindWater,
    Drink,
    Mate,
    Dead,
}

impl MovableState {
    pub const ALL: [MovableState; 13] = [
        MovableState::Test,
        MovableState::Walk,
        MovableState::Stay,
        MovableState::FindFood,
        MovableState::Attack,
        MovableState::Eat,
        MovableState::Flee,
        MovableState::Lost,
        MovableState::Sleep,
        MovableState::FindWater,
        MovableState::Drink,
        MovableState::Mate,
        MovableState::Dead,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MovableState::Test => "test",
            MovableState::Walk => "walk",
            MovableState::Stay => "stay",
            MovableState::FindFood => "find food",
            MovableState::Attack => "attack",
            MovableState::Eat => "eat",
            MovableState::Flee => "flee",
            MovableState::Lost => "lost",
            MovableState::Sleep => "sleep",
            MovableState::FindWater => "find water",
            MovableState::Drink => "drink",
            MovableState::Mate => "mate",
            MovableState::Dead => "dead",
        }
    }

    /// States in which the boid produces no locomotion at all.
    pub fn is_stationary(self) -> bool {
        matches!(
            self,
            MovableState::Stay
                | MovableState::Eat
                | MovableState::Drink
                | MovableState::Sleep
                | MovableState::Dead
        )
    }

    pub fn is_terminal(self) -> bool {
        self == MovableState::Dead
    }

    /// Phase one of a tick for a single boid. `self` is the boid's current
    /// state; the result is also stored as the boid's acceleration.
    pub fn compute_acceleration<R: Rng + ?Sized>(
        self,
        boid: &mut MovableBoid,
        world: &WorldView<'_>,
        dt: f32,
        rng: &mut R,
    ) -> Vec3 {
        boid.reset_acceleration();
        if self.is_terminal() {
            return Vec3::ZERO;
        }

        perceive(self, boid, world);

        let force = self.steering_force(boid, world, dt, rng);
        boid.set_acceleration(force / boid.mass());
        boid.acceleration()
    }

    /// The composed force of this state, already truncated to max force.
    pub fn steering_force<R: Rng + ?Sized>(
        self,
        boid: &MovableBoid,
        world: &WorldView<'_>,
        dt: f32,
        rng: &mut R,
    ) -> Vec3 {
        let params = world.params();
        let neighbors = world.agents();
        let separation = boid.parameters().dist_separate();

        let force = match self {
            MovableState::Test => {
                steering::wander(boid, params.wander_jitter, rng)
                    + steering::stay_within_walls(boid, params)
            }

            MovableState::Walk => match world.followed_leader(boid) {
                Some(leader) => {
                    steering::follow_leader(boid, leader, neighbors, dt, params)
                        + global_avoid(boid, world, true)
                }
                None => {
                    steering::wander(boid, params.wander_jitter, rng)
                        + global_avoid(boid, world, true)
                        + steering::separate(boid, neighbors, separation)
                        + steering::align(boid, neighbors)
                        + steering::cohesion(boid, neighbors)
                }
            },

            MovableState::Stay
            | MovableState::Eat
            | MovableState::Drink
            | MovableState::Sleep
            | MovableState::Dead => Vec3::ZERO,

            MovableState::FindFood => {
                let towards_food = match boid.prey() {
                    Some(Prey::Movable(id)) => world
                        .living_agent(id)
                        .map(|target| {
                            steering::pursuit(boid, target, dt, params.forecast_factor)
                        })
                        .unwrap_or(Vec3::ZERO),
                    Some(Prey::Rooted(id)) => world
                        .resource(id)
                        .map(|food| steering::arrive(boid, food.position()))
                        .unwrap_or(Vec3::ZERO),
                    None => steering::wander(boid, params.wander_jitter, rng),
                };
                towards_food
                    + steering::separate(boid, neighbors, separation)
                    + global_avoid(boid, world, true)
            }

            MovableState::Attack => {
                let chase = boid
                    .movable_prey()
                    .and_then(|id| world.living_agent(id))
                    .map(|target| steering::pursuit(boid, target, dt, params.forecast_factor))
                    .unwrap_or(Vec3::ZERO);
                chase + steering::separate(boid, neighbors, separation)
            }

            MovableState::Flee => {
                let escape = boid
                    .hunter()
                    .and_then(|id| world.living_agent(id))
                    .map(|hunter| steering::evade(boid, hunter, dt, params.forecast_factor))
                    .unwrap_or(Vec3::ZERO);
                escape
                    + steering::separate(boid, neighbors, separation)
                    + global_avoid(boid, world, true)
            }

            MovableState::Lost => {
                steering::wander_scaled(boid, params.lost_wander_scale, params.wander_jitter, rng)
                    + steering::separate(boid, neighbors, separation)
                    + global_avoid(boid, world, true)
            }

            MovableState::FindWater => {
                let position = boid.position();
                // Water is the goal here, so only walls and obstacles are avoided
                let towards_lake = world
                    .nearest_lake(position.truncate())
                    .map(|shore| steering::arrive(boid, shore.extend(position.z)))
                    .unwrap_or(Vec3::ZERO);
                towards_lake
                    + steering::separate(boid, neighbors, separation)
                    + global_avoid(boid, world, false)
            }

            MovableState::Mate => {
                let courting = boid
                    .soulmate()
                    .and_then(|id| world.living_agent(id))
                    .map(|partner| steering::arrive(boid, partner.position))
                    .unwrap_or(Vec3::ZERO);
                courting + global_avoid(boid, world, true)
            }
        };

        steering::truncate(force, boid.parameters().max_force())
    }
}

impl fmt::Display for MovableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Walls, obstacles and, optionally, water just ahead of the boid
fn global_avoid(boid: &MovableBoid, world: &WorldView<'_>, avoid_water: bool) -> Vec3 {
    let mut force = steering::stay_within_walls(boid, world.params())
        + steering::collision_avoid(boid, world.rooted());

    if avoid_water {
        let position = boid.position();
        let look_ahead = boid.parameters().dist_to_circle_wander().max(1.0);
        let ahead = position.truncate() + boid.forward() * look_ahead;
        if world.biome_at(ahead).is_water() {
            force += steering::flee(boid, ahead.extend(position.z));
        }
    }

    force
}

fn perceive(state: MovableState, boid: &mut MovableBoid, world: &WorldView<'_>) {
    sense_danger(boid, world);
    if state == MovableState::FindFood {
        acquire_prey(boid, world);
    }
}

/*
 * A new hunter has to be spotted inside the vision cone. Once known, it is
 * tracked by distance alone so a fleeing boid does not forget a predator
 * the moment it turns its back on it.
 */
fn sense_danger(boid: &mut MovableBoid, world: &WorldView<'_>) {
    let Some(predator) = boid.predator_type() else {
        boid.set_hunter(None);
        boid.parameters_mut().danger_decrease();
        return;
    };
    let range = boid.parameters().dist_view_max();
    let position = boid.position();

    let tracked = boid
        .hunter()
        .and_then(|id| world.living_agent(id))
        .filter(|hunter| boid.dist_vision(hunter.position, range))
        .map(|hunter| hunter.id);

    let hunter = tracked.or_else(|| {
        world
            .agents()
            .iter()
            .filter(|other| {
                other.alive
                    && other.id != boid.id()
                    && other.species == predator
                    && boid.can_see(other.position, range)
            })
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
            .map(|other| other.id)
    });

    boid.set_hunter(hunter);
    if hunter.is_some() {
        boid.parameters_mut().danger_increase();
    } else {
        boid.parameters_mut().danger_decrease();
    }
}

fn acquire_prey(boid: &mut MovableBoid, world: &WorldView<'_>) {
    let range = boid.parameters().dist_view_max();
    let position = boid.position();

    let current_is_valid = match boid.prey() {
        Some(Prey::Movable(id)) => world
            .living_agent(id)
            .is_some_and(|target| boid.dist_vision(target.position, range)),
        Some(Prey::Rooted(id)) => world
            .resource(id)
            .is_some_and(|food| food.is_edible() && food.is_food_remaining()),
        None => false,
    };
    if current_is_valid {
        return;
    }

    let wanted = boid.prey_species();
    if wanted.is_movable() {
        let target = world
            .agents()
            .iter()
            .filter(|other| {
                other.alive
                    && other.id != boid.id()
                    && other.species == wanted
                    && boid.can_see(other.position, range)
            })
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
            .map(|other| other.id);
        match target {
            Some(id) => boid.set_movable_prey(id),
            None => boid.clear_prey(),
        }
    } else {
        let target = world
            .rooted()
            .iter()
            .filter(|food| {
                food.species() == wanted
                    && food.is_edible()
                    && food.is_food_remaining()
                    && boid.can_see(food.position(), range)
            })
            .min_by(|a, b| {
                a.position()
                    .distance_squared(position)
                    .total_cmp(&b.position().distance_squared(position))
            })
            .map(|food| food.id());
        match target {
            Some(id) => boid.set_rooted_prey(id),
            None => boid.clear_prey(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::{AgentId, Boid, BoidType, ResourceId, RootedBoid};
    use crate::environment::FlatTerrain;
    use crate::movable_boid::AgentSnapshot;
    use crate::parameters::MovableParameters;
    use crate::params::{SimulationParams, SpeciesParams};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn agent(id: u64, species: BoidType, position: Vec3, velocity: Vec3) -> MovableBoid {
        let constants = match species {
            BoidType::Wolf => SpeciesParams::wolf(),
            _ => SpeciesParams::rabbit(),
        };
        let params = MovableParameters::new(constants, 50.0);
        MovableBoid::new(AgentId::new(id), species, position, velocity, params)
    }

    fn snapshots(agents: &[&MovableBoid]) -> Vec<AgentSnapshot> {
        agents.iter().map(|agent| agent.snapshot()).collect()
    }

    #[rstest]
    fn composed_force_never_exceeds_max_force(
        #[values(
            MovableState::Test,
            MovableState::Walk,
            MovableState::FindFood,
            MovableState::Attack,
            MovableState::Flee,
            MovableState::Lost,
            MovableState::FindWater,
            MovableState::Mate
        )]
        state: MovableState,
    ) {
        let params = SimulationParams::default();
        let edge = params.half_world() - 1.0;
        let terrain = FlatTerrain::new(0.0).with_lake(glam::Vec2::new(edge - 5.0, 0.0), 3.0);

        // Crowded corner, pushed against the wall, with a wolf right behind
        let mut rabbit = agent(0, BoidType::Rabbit, Vec3::new(edge, edge, 0.0), Vec3::X * 3.0);
        let crowd: Vec<MovableBoid> = (1..6)
            .map(|i| {
                let offset = Vec3::new(-0.1 * i as f32, -0.2, 0.0);
                agent(i, BoidType::Rabbit, rabbit.position() + offset, -Vec3::X)
            })
            .collect();
        let wolf = agent(9, BoidType::Wolf, rabbit.position() - Vec3::X, Vec3::X * 4.0);
        rabbit.set_hunter(Some(wolf.id()));
        rabbit.set_soulmate(Some(crowd[0].id()));

        let mut all: Vec<&MovableBoid> = vec![&rabbit];
        all.extend(crowd.iter());
        all.push(&wolf);
        let agents = snapshots(&all);
        let rooted = vec![RootedBoid::new(
            ResourceId::new(0),
            Boid::new(rabbit.position() + Vec3::new(0.3, 0.0, 0.0), BoidType::Tree),
            None,
        )];
        let world = WorldView::new(&agents, &rooted, &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let force = state.steering_force(&rabbit, &world, 0.1, &mut rng);
            assert!(force.is_finite());
            assert!(force.length() <= rabbit.parameters().max_force() + 1e-5);
        }
    }

    #[rstest]
    #[case(MovableState::Stay)]
    #[case(MovableState::Eat)]
    #[case(MovableState::Drink)]
    #[case(MovableState::Sleep)]
    #[case(MovableState::Dead)]
    fn resting_states_produce_no_force(#[case] state: MovableState) {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
        let agents = snapshots(&[&rabbit]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(state.is_stationary());
        assert_eq!(state.steering_force(&rabbit, &world, 0.1, &mut rng), Vec3::ZERO);
    }

    #[test]
    fn acceleration_is_force_over_mass() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut wolf = agent(0, BoidType::Wolf, Vec3::ZERO, Vec3::ZERO);
        let agents = snapshots(&[&wolf]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let force = MovableState::Test.steering_force(&wolf, &world, 0.1, &mut rng);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let acceleration = MovableState::Test.compute_acceleration(&mut wolf, &world, 0.1, &mut rng);

        assert_eq!(acceleration, force / wolf.mass());
        assert_eq!(wolf.acceleration(), acceleration);
    }

    #[test]
    fn visible_predator_becomes_the_hunter() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
        let wolf = agent(1, BoidType::Wolf, Vec3::new(5.0, 0.0, 0.0), -Vec3::X);
        let agents = snapshots(&[&rabbit, &wolf]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        MovableState::Walk.compute_acceleration(&mut rabbit, &world, 0.1, &mut rng);

        assert_eq!(rabbit.hunter(), Some(wolf.id()));
        assert!(rabbit.parameters().is_in_danger());
    }

    #[test]
    fn a_boid_never_senses_itself_as_its_hunter() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        // Wolves told to fear wolves; a validated catalog refuses this
        let wary = SpeciesParams {
            predator: Some(BoidType::Wolf),
            ..SpeciesParams::wolf()
        };
        let wolf_at = |id, position| {
            let params = MovableParameters::new(wary.clone(), 50.0);
            MovableBoid::new(AgentId::new(id), BoidType::Wolf, position, Vec3::X, params)
        };
        let mut alone = wolf_at(0, Vec3::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let agents = snapshots(&[&alone]);
        let world = WorldView::new(&agents, &[], &terrain, &params);
        MovableState::Walk.compute_acceleration(&mut alone, &world, 0.1, &mut rng);
        assert_eq!(alone.hunter(), None);
        assert!(!alone.parameters().is_in_danger());

        let other = wolf_at(1, Vec3::new(5.0, 0.0, 0.0));
        let agents = snapshots(&[&alone, &other]);
        let world = WorldView::new(&agents, &[], &terrain, &params);
        MovableState::Walk.compute_acceleration(&mut alone, &world, 0.1, &mut rng);
        assert_eq!(alone.hunter(), Some(other.id()));
    }

    #[test]
    fn flee_pushes_away_from_the_hunter() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::ZERO);
        let wolf = agent(1, BoidType::Wolf, Vec3::new(4.0, 0.0, 0.0), Vec3::ZERO);
        rabbit.set_hunter(Some(wolf.id()));
        let agents = snapshots(&[&rabbit, &wolf]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let force = MovableState::Flee.steering_force(&rabbit, &world, 0.1, &mut rng);
        assert!(force.x < 0.0);
    }

    #[test]
    fn looking_for_food_picks_the_nearest_visible_carrot() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
        let agents = snapshots(&[&rabbit]);
        let carrot = |id, x: f32| {
            RootedBoid::new(
                ResourceId::new(id),
                Boid::new(Vec3::new(x, 0.0, 0.0), BoidType::Carrot),
                Some(10.0),
            )
        };
        // The closest one is behind the rabbit and out of its cone
        let rooted = vec![carrot(0, 8.0), carrot(1, 4.0), carrot(2, -1.0)];
        let world = WorldView::new(&agents, &rooted, &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        MovableState::FindFood.compute_acceleration(&mut rabbit, &world, 0.1, &mut rng);

        assert_eq!(rabbit.rooted_prey(), Some(ResourceId::new(1)));
        assert_eq!(rabbit.movable_prey(), None);
    }

    #[test]
    fn lost_boid_wanders_on_the_wider_circle() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
        let agents = snapshots(&[&rabbit]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let force = MovableState::Lost.steering_force(&rabbit, &world, 0.1, &mut rng);

        let mut replay = ChaCha8Rng::seed_from_u64(5);
        let wide = steering::wander_scaled(
            &rabbit,
            params.lost_wander_scale,
            params.wander_jitter,
            &mut replay,
        );
        let max_force = rabbit.parameters().max_force();
        assert_abs_diff_eq!(force, steering::truncate(wide, max_force), epsilon = 1e-5);
    }

    #[test]
    fn dead_boids_do_not_move() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut rabbit = agent(0, BoidType::Rabbit, Vec3::ZERO, Vec3::X);
        rabbit.kill();
        let agents = snapshots(&[&rabbit]);
        let world = WorldView::new(&agents, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let acceleration =
            MovableState::Dead.compute_acceleration(&mut rabbit, &world, 0.1, &mut rng);
        assert_eq!(acceleration, Vec3::ZERO);
    }
}
