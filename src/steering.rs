/*
 * Steering Module
 *
 * Reynolds-style steering behaviours. Each function looks at the acting
 * boid plus whatever context it is given and returns a desired force:
 * Steering = Desired - Velocity.
 *
 * None of these clamp their result. Behaviour states sum several of them
 * and truncate the total to the boid's max force exactly once.
 * Degenerate directions (zero-length offsets) always yield a zero force so
 * NaN never reaches the integrator.
 */

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::boid::RootedBoid;
use crate::movable_boid::{AgentSnapshot, MovableBoid};
use crate::params::SimulationParams;

const MIN_DISTANCE: f32 = 1e-6;

/// Caps the length of `force` at `max`. Non-finite input becomes zero.
pub fn truncate(force: Vec3, max: f32) -> Vec3 {
    if !force.is_finite() {
        return Vec3::ZERO;
    }
    force.clamp_length_max(max.max(0.0))
}

pub fn seek(boid: &MovableBoid, target: Vec3) -> Vec3 {
    let Some(direction) = (target - boid.position()).try_normalize() else {
        return Vec3::ZERO;
    };
    direction * boid.parameters().max_speed() - boid.velocity()
}

pub fn flee(boid: &MovableBoid, point: Vec3) -> Vec3 {
    -seek(boid, point)
}

/// Like seek, but the desired speed falls linearly to zero inside the
/// slowing-down radius. On the target itself the boid just brakes.
pub fn arrive(boid: &MovableBoid, target: Vec3) -> Vec3 {
    let offset = target - boid.position();
    let distance = offset.length();
    if distance <= MIN_DISTANCE {
        return -boid.velocity();
    }

    let params = boid.parameters();
    let slowing = params.dist_start_slowing_down();
    let speed = if distance < slowing {
        params.max_speed() * distance / slowing
    } else {
        params.max_speed()
    };

    offset / distance * speed - boid.velocity()
}

pub fn wander<R: Rng + ?Sized>(boid: &MovableBoid, jitter: f32, rng: &mut R) -> Vec3 {
    wander_scaled(boid, 1.0, jitter, rng)
}

/*
 * Wander projects a circle in front of the boid and seeks a point on it.
 * The point sits at the current heading plus a random angular nudge drawn
 * fresh on every call, so the walk is smooth but never straight.
 */
pub fn wander_scaled<R: Rng + ?Sized>(
    boid: &MovableBoid,
    radius_scale: f32,
    jitter: f32,
    rng: &mut R,
) -> Vec3 {
    let params = boid.parameters();
    let forward = boid.forward();
    let heading = forward.y.atan2(forward.x);

    let nudge = if jitter > 0.0 {
        rng.gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    let theta = heading + nudge;

    let center = boid.position() + (forward * params.dist_to_circle_wander()).extend(0.0);
    let radius = params.radius_circle_wander() * radius_scale;
    let target = center + Vec3::new(theta.cos(), theta.sin(), 0.0) * radius;

    seek(boid, target)
}

/// Pushes away from every living neighbour closer than `desired_separation`,
/// closer ones counting more.
pub fn separate(boid: &MovableBoid, neighbors: &[AgentSnapshot], desired_separation: f32) -> Vec3 {
    separate_from(boid, neighbors.iter(), desired_separation)
}

fn separate_from<'a>(
    boid: &MovableBoid,
    neighbors: impl IntoIterator<Item = &'a AgentSnapshot>,
    desired_separation: f32,
) -> Vec3 {
    let position = boid.position();
    let mut steering = Vec3::ZERO;
    let mut count = 0;

    for other in neighbors {
        if other.id == boid.id() || !other.alive {
            continue;
        }
        let offset = position - other.position;
        let d = offset.length();
        if d > MIN_DISTANCE && d < desired_separation {
            // Unit vector away from the neighbour, weighted by 1/d
            steering += offset / (d * d);
            count += 1;
        }
    }

    repulsion(boid, steering, count)
}

fn repulsion(boid: &MovableBoid, sum: Vec3, count: usize) -> Vec3 {
    if count == 0 {
        return Vec3::ZERO;
    }
    let average = sum / count as f32;
    average.normalize_or_zero() * boid.parameters().max_speed()
}

// Flockmates: same species, alive, inside the cohesion vision cone
fn flockmates<'a>(
    boid: &'a MovableBoid,
    neighbors: &'a [AgentSnapshot],
) -> impl Iterator<Item = &'a AgentSnapshot> + 'a {
    let range = boid.parameters().dist_view_cohesion();
    neighbors.iter().filter(move |other| {
        other.id != boid.id()
            && other.alive
            && boid.same_species(other.species)
            && boid.can_see(other.position, range)
    })
}

pub fn align(boid: &MovableBoid, neighbors: &[AgentSnapshot]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for other in flockmates(boid, neighbors) {
        sum += other.velocity;
        count += 1;
    }
    if count == 0 {
        return Vec3::ZERO;
    }

    let Some(heading) = (sum / count as f32).try_normalize() else {
        return Vec3::ZERO;
    };
    heading * boid.parameters().max_speed() - boid.velocity()
}

pub fn cohesion(boid: &MovableBoid, neighbors: &[AgentSnapshot]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    let mut count = 0;
    for other in flockmates(boid, neighbors) {
        sum += other.position;
        count += 1;
    }
    if count == 0 {
        return Vec3::ZERO;
    }
    seek(boid, sum / count as f32)
}

/// Separation against obstacles. Food is left alone so it can be reached.
pub fn collision_avoid(boid: &MovableBoid, rooted: &[RootedBoid]) -> Vec3 {
    let position = boid.position();
    let reach = boid.parameters().dist_separate();
    let mut steering = Vec3::ZERO;
    let mut count = 0;

    for obstacle in rooted.iter().filter(|r| !r.is_edible()) {
        let offset = position - obstacle.position();
        let d = offset.length();
        if d > MIN_DISTANCE && d < reach + obstacle.boid().min_distance() {
            steering += offset / (d * d);
            count += 1;
        }
    }

    repulsion(boid, steering, count)
}

/// Where `target` will be after `dt` if it keeps its velocity, stretched by
/// the forecast constant `factor`.
pub fn position_forecast(target: &AgentSnapshot, dt: f32, factor: f32) -> Vec3 {
    target.position + target.velocity * dt * factor
}

pub fn pursuit(hunter: &MovableBoid, target: &AgentSnapshot, dt: f32, factor: f32) -> Vec3 {
    seek(hunter, position_forecast(target, dt, factor))
}

pub fn evade(prey: &MovableBoid, hunter: &AgentSnapshot, dt: f32, factor: f32) -> Vec3 {
    flee(prey, position_forecast(hunter, dt, factor))
}

/// Arrive at a point behind where the leader is heading, keeping clear of
/// the leader and of the other boids following it.
pub fn follow_leader(
    boid: &MovableBoid,
    leader: &AgentSnapshot,
    neighbors: &[AgentSnapshot],
    dt: f32,
    params: &SimulationParams,
) -> Vec3 {
    let forecast = position_forecast(leader, dt, params.forecast_factor);
    let leader_heading = leader
        .velocity
        .truncate()
        .try_normalize()
        .unwrap_or_else(|| Vec2::from_angle(leader.angle));
    let behind = forecast - (leader_heading * params.leader_follow_distance).extend(0.0);

    let queue = neighbors
        .iter()
        .filter(|other| other.id == leader.id || other.leader == Some(leader.id));

    arrive(boid, behind) + separate_from(boid, queue, boid.parameters().dist_separate())
}

/// Corrective force once the boid is within `wall_margin` of the world's
/// edge, growing with how deep it has gone.
pub fn stay_within_walls(boid: &MovableBoid, params: &SimulationParams) -> Vec3 {
    let limit = params.half_world() - params.wall_margin;
    let stiffness = boid.parameters().max_speed() / params.wall_margin.max(1.0);
    let position = boid.position();

    let push = |coordinate: f32| -> f32 {
        if coordinate > limit {
            -(coordinate - limit) * stiffness
        } else if coordinate < -limit {
            (-limit - coordinate) * stiffness
        } else {
            0.0
        }
    };

    Vec3::new(push(position.x), push(position.y), 0.0)
}
