/*
 * Physics Module
 *
 * This module runs the two movement passes of a tick:
 * - compute_accelerations: every boid asks its state for a force, reading
 *   only the snapshot taken before anyone moved
 * - integrate: every boid applies its own acceleration, then settles on
 *   the terrain
 *
 * Keeping the passes apart means boid N never sees boid N+1's new position,
 * so the result does not depend on the order of the collection.
 */

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::environment::Environment;
use crate::manager::WorldView;
use crate::movable_boid::{AgentSnapshot, MovableBoid};
use crate::params::SimulationParams;

// Copy of the boids for the calculations
pub fn snapshot(agents: &[MovableBoid]) -> Vec<AgentSnapshot> {
    agents.iter().map(MovableBoid::snapshot).collect()
}

pub fn compute_accelerations<R: Rng + ?Sized>(
    agents: &mut [MovableBoid],
    world: &WorldView<'_>,
    dt: f32,
    rng: &mut R,
) {
    for agent in agents.iter_mut().filter(|agent| agent.is_alive()) {
        let state = agent.state();
        state.compute_acceleration(agent, world, dt, rng);
    }
}

pub fn integrate(agents: &mut [MovableBoid], environment: &dyn Environment, dt: f32) {
    for agent in agents.iter_mut().filter(|agent| agent.is_alive()) {
        agent.compute_next_step(dt);

        // Walkers follow the ground
        let position = agent.position();
        agent.settle_on_ground(environment.height_at(position.x, position.y));
    }
}

/// Random spawn point inside the walls, away from water when possible.
pub fn scatter_position<R: Rng + ?Sized>(
    rng: &mut R,
    params: &SimulationParams,
    environment: &dyn Environment,
) -> Vec2 {
    const ATTEMPTS: usize = 16;

    let half = (params.half_world() - params.wall_margin).max(1.0);
    let mut point = Vec2::ZERO;
    for _ in 0..ATTEMPTS {
        point = Vec2::new(rng.gen_range(-half..half), rng.gen_range(-half..half));
        if !environment.biome_at(point.x, point.y).is_water() {
            break;
        }
    }
    point
}

/// Random heading at a random fraction of `max_speed`.
pub fn scatter_velocity<R: Rng + ?Sized>(rng: &mut R, max_speed: f32) -> Vec3 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let speed = rng.gen_range(0.0..=max_speed.max(0.0));
    (Vec2::from_angle(angle) * speed).extend(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::{AgentId, BoidType};
    use crate::environment::FlatTerrain;
    use crate::parameters::MovableParameters;
    use crate::params::SpeciesParams;
    use crate::state::MovableState;
    use crate::steering;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rabbit(id: u64, position: Vec3, velocity: Vec3) -> MovableBoid {
        let params = MovableParameters::new(SpeciesParams::rabbit(), 50.0);
        MovableBoid::new(AgentId::new(id), BoidType::Rabbit, position, velocity, params)
    }

    // Runs one acceleration pass over `agents` in the order given
    fn accelerations(agents: &mut [MovableBoid], seed: u64) -> Vec<(AgentId, Vec3)> {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::default();
        let mut sorted = snapshot(agents);
        sorted.sort_by_key(|snapshot| snapshot.id);
        let world = WorldView::new(&sorted, &[], &terrain, &params);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        compute_accelerations(agents, &world, 0.1, &mut rng);
        let mut result: Vec<_> = agents.iter().map(|a| (a.id(), a.acceleration())).collect();
        result.sort_by_key(|(id, _)| *id);
        result
    }

    // A fleeing rabbit with no wolf around only keeps its distance from
    // the others; none of that draws from the rng
    fn huddle() -> Vec<MovableBoid> {
        let mut agents = vec![
            rabbit(0, Vec3::ZERO, Vec3::X),
            rabbit(1, Vec3::new(1.0, 0.2, 0.0), Vec3::Y),
            rabbit(2, Vec3::new(0.5, -0.5, 0.0), -Vec3::X),
        ];
        for agent in &mut agents {
            agent.switch_to_state(MovableState::Flee);
        }
        agents
    }

    #[test]
    fn acceleration_pass_reads_the_snapshot_only() {
        let mut agents = huddle();
        let before = snapshot(&agents);

        let computed = accelerations(&mut agents, 1);

        for (agent, old) in agents.iter().zip(&before) {
            assert_eq!(agent.position(), old.position);
            assert_eq!(agent.velocity(), old.velocity);
        }
        for (agent, (id, acceleration)) in huddle().iter().zip(&computed) {
            assert_eq!(agent.id(), *id);
            let params = agent.parameters();
            let push = steering::separate(agent, &before, params.dist_separate());
            let expected = steering::truncate(push, params.max_force()) / agent.mass();
            assert_abs_diff_eq!(*acceleration, expected, epsilon = 1e-6);
            assert!(acceleration.length() > 0.0);
        }
    }

    #[test]
    fn acceleration_pass_does_not_depend_on_order() {
        let forward = accelerations(&mut huddle(), 1);
        let mut reversed_agents = huddle();
        reversed_agents.reverse();
        let reversed = accelerations(&mut reversed_agents, 1);

        assert_eq!(forward, reversed);
    }

    #[test]
    fn integration_snaps_boids_to_the_ground() {
        let terrain = FlatTerrain::new(4.0);
        let mut agents = vec![rabbit(0, Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 0.0, 1.0))];

        integrate(&mut agents, &terrain, 1.0);

        assert_eq!(agents[0].position().z, 4.0);
        assert_eq!(agents[0].velocity().z, 0.0);
        assert!(agents[0].velocity().length() <= agents[0].parameters().max_speed());
    }

    #[test]
    fn dead_boids_are_left_where_they_fell() {
        let terrain = FlatTerrain::default();
        let mut agents = vec![rabbit(0, Vec3::ZERO, Vec3::X)];
        agents[0].kill();

        integrate(&mut agents, &terrain, 1.0);
        assert_eq!(agents[0].position(), Vec3::ZERO);
    }

    #[test]
    fn scattered_boids_avoid_water_and_walls() {
        let params = SimulationParams::default();
        let terrain = FlatTerrain::new(0.0).with_lake(Vec2::ZERO, 30.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let limit = params.half_world() - params.wall_margin;

        for _ in 0..100 {
            let point = scatter_position(&mut rng, &params, &terrain);
            assert!(point.x.abs() <= limit && point.y.abs() <= limit);
            assert!(point.length() > 30.0);

            let velocity = scatter_velocity(&mut rng, 3.5);
            assert!(velocity.length() <= 3.5 + 1e-5);
        }
    }
}
