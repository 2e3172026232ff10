/*
 * Boids Manager Module
 *
 * The registry that owns the population. It holds the movable boids and the
 * rooted boids, hands out ids, forwards environment queries to the terrain
 * and drives the tick:
 *
 *   advance clock -> snapshot -> accelerations -> integrate -> drives/food
 *   -> snapshot -> transitions -> leadership  (step)
 *   step -> remove_expired -> spawn offspring  (tick)
 *
 * Both collections stay sorted by id: ids only grow and new boids are
 * appended, so lookups are binary searches.
 */

use glam::{Vec2, Vec3};
use log::{debug, info, trace, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::boid::{AgentId, Boid, BoidType, ResourceId, RootedBoid};
use crate::debug::{Census, Removal, TickReport};
use crate::environment::{Biome, Environment, FlatTerrain};
use crate::error::Result;
use crate::movable_boid::{AgentSnapshot, MovableBoid};
use crate::parameters::MovableParameters;
use crate::params::{SimulationParams, SpeciesCatalog};
use crate::physics;
use crate::state::MovableState;
use crate::transition::Offspring;

// Initial stamina is drawn uniformly from this range
const STAMINA_RANGE: std::ops::Range<f32> = 1.0..99.0;

/// Read-only view of the world during one pass of a tick. Every boid in the
/// pass sees the same snapshot, rooted boids, terrain and settings.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    agents: &'a [AgentSnapshot],
    rooted: &'a [RootedBoid],
    environment: &'a dyn Environment,
    params: &'a SimulationParams,
}

impl<'a> WorldView<'a> {
    /// `agents` and `rooted` must be sorted by id.
    pub fn new(
        agents: &'a [AgentSnapshot],
        rooted: &'a [RootedBoid],
        environment: &'a dyn Environment,
        params: &'a SimulationParams,
    ) -> Self {
        Self {
            agents,
            rooted,
            environment,
            params,
        }
    }

    pub fn agents(&self) -> &'a [AgentSnapshot] {
        self.agents
    }

    pub fn rooted(&self) -> &'a [RootedBoid] {
        self.rooted
    }

    pub fn params(&self) -> &'a SimulationParams {
        self.params
    }

    pub fn agent(&self, id: AgentId) -> Option<&'a AgentSnapshot> {
        self.agents
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.agents[index])
    }

    // A link to a dead or removed boid reads as no link at all
    pub fn living_agent(&self, id: AgentId) -> Option<&'a AgentSnapshot> {
        self.agent(id).filter(|snapshot| snapshot.alive)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&'a RootedBoid> {
        self.rooted
            .binary_search_by_key(&id, |rooted| rooted.id())
            .ok()
            .map(|index| &self.rooted[index])
    }

    /// The living leader `boid` follows, if it follows anyone but itself.
    pub fn followed_leader(&self, boid: &MovableBoid) -> Option<&'a AgentSnapshot> {
        boid.leader()
            .filter(|&leader| leader != boid.id())
            .and_then(|leader| self.living_agent(leader))
    }

    pub fn height_at(&self, point: Vec2) -> f32 {
        self.environment.height_at(point.x, point.y)
    }

    pub fn biome_at(&self, point: Vec2) -> Biome {
        self.environment.biome_at(point.x, point.y)
    }

    pub fn is_night(&self) -> bool {
        self.environment.is_night()
    }

    pub fn nearest_lake(&self, position: Vec2) -> Option<Vec2> {
        self.environment.nearest_lake(position)
    }
}

#[derive(Clone)]
pub struct BoidsManager<E: Environment = FlatTerrain> {
    environment: E,
    catalog: SpeciesCatalog,
    params: SimulationParams,
    agents: Vec<MovableBoid>,
    rooted: Vec<RootedBoid>,
    next_agent: u64,
    next_resource: u64,
    tick: u64,
    rng: ChaCha8Rng,
    pending_offspring: Vec<Offspring>,
}

impl<E: Environment> BoidsManager<E> {
    /// Checks the configuration once; a bad catalog never reaches a tick.
    pub fn new(environment: E, catalog: SpeciesCatalog, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        catalog.validate()?;
        info!(
            "Boids manager ready: world size {}, seed {:#x}",
            params.world_size, params.seed
        );

        let rng = ChaCha8Rng::seed_from_u64(params.seed);
        Ok(Self {
            environment,
            catalog,
            params,
            agents: Vec::new(),
            rooted: Vec::new(),
            next_agent: 0,
            next_resource: 0,
            tick: 0,
            rng,
            pending_offspring: Vec::new(),
        })
    }

    // Population

    pub fn add_movable_agent(
        &mut self,
        species: BoidType,
        position: Vec3,
        velocity: Vec3,
    ) -> Result<AgentId> {
        let constants = self.catalog.movable(species)?.clone();
        let stamina = self.rng.gen_range(STAMINA_RANGE);
        let parameters = MovableParameters::new(constants, stamina);

        let id = AgentId::new(self.next_agent);
        self.next_agent += 1;

        let mut agent = MovableBoid::new(id, species, position, velocity, parameters);
        agent.settle_on_ground(self.environment.height_at(position.x, position.y));
        debug!("Added {} ({}) at {:?}", id, species, agent.position());

        self.agents.push(agent);
        Ok(id)
    }

    pub fn add_stationary_resource(&mut self, species: BoidType, position: Vec3) -> Result<ResourceId> {
        let constants = self.catalog.rooted(species)?;
        let ground = position
            .truncate()
            .extend(self.environment.height_at(position.x, position.y));
        let boid = Boid::new(ground, species).with_min_distance(constants.min_distance);

        let id = ResourceId::new(self.next_resource);
        self.next_resource += 1;

        self.rooted.push(RootedBoid::new(id, boid, constants.food));
        debug!("Added {} ({}) at {:?}", id, species, ground);
        Ok(id)
    }

    /// Adds `count` boids of `species` at random spots with random headings.
    pub fn scatter_movable(&mut self, species: BoidType, count: usize) -> Result<Vec<AgentId>> {
        let max_speed = self.catalog.movable(species)?.max_speed;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let position = physics::scatter_position(&mut self.rng, &self.params, &self.environment);
            let velocity = physics::scatter_velocity(&mut self.rng, max_speed);
            ids.push(self.add_movable_agent(species, position.extend(0.0), velocity)?);
        }
        Ok(ids)
    }

    pub fn scatter_rooted(&mut self, species: BoidType, count: usize) -> Result<Vec<ResourceId>> {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let position = physics::scatter_position(&mut self.rng, &self.params, &self.environment);
            ids.push(self.add_stationary_resource(species, position.extend(0.0))?);
        }
        Ok(ids)
    }

    // Accessors

    pub fn movable_boids(&self) -> &[MovableBoid] {
        &self.agents
    }

    pub fn rooted_boids(&self) -> &[RootedBoid] {
        &self.rooted
    }

    pub fn agent(&self, id: AgentId) -> Option<&MovableBoid> {
        self.agents
            .binary_search_by_key(&id, MovableBoid::id)
            .ok()
            .map(|index| &self.agents[index])
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut MovableBoid> {
        self.agents
            .binary_search_by_key(&id, MovableBoid::id)
            .ok()
            .map(|index| &mut self.agents[index])
    }

    pub fn resource(&self, id: ResourceId) -> Option<&RootedBoid> {
        self.rooted
            .binary_search_by_key(&id, RootedBoid::id)
            .ok()
            .map(|index| &self.rooted[index])
    }

    /// Candidates for neighbour queries: the whole population. Vision and
    /// distance filtering is left to the caller.
    pub fn neighbors_of(&self, _agent: AgentId) -> &[MovableBoid] {
        &self.agents
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn census(&self) -> Census {
        Census::from_population(self.tick, &self.agents, &self.rooted)
    }

    // Environment passthrough

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.environment
    }

    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        self.environment.height_at(x, y)
    }

    pub fn biome_at(&self, x: f32, y: f32) -> Biome {
        self.environment.biome_at(x, y)
    }

    pub fn is_night(&self) -> bool {
        self.environment.is_night()
    }

    pub fn nearest_lake(&self, position: Vec2) -> Option<Vec2> {
        self.environment.nearest_lake(position)
    }

    // Tick

    /// Moves everyone and evaluates transitions. Nothing is added or removed
    /// here; offspring wait for the `tick` running this step, and a bare
    /// `step` drops them.
    pub fn step(&mut self, dt: f32) -> TickReport {
        if !self.pending_offspring.is_empty() {
            debug!("{} offspring requests expired unspawned", self.pending_offspring.len());
            self.pending_offspring.clear();
        }
        self.tick += 1;
        self.environment.advance(dt);

        // Phase 1 and 2: forces against the old positions, then movement
        let before = physics::snapshot(&self.agents);
        {
            let world = WorldView::new(&before, &self.rooted, &self.environment, &self.params);
            physics::compute_accelerations(&mut self.agents, &world, dt, &mut self.rng);
        }
        physics::integrate(&mut self.agents, &self.environment, dt);

        for agent in &mut self.agents {
            agent.update_drives();
        }
        self.feed();

        let mut report = TickReport::new(self.tick);
        let after = physics::snapshot(&self.agents);
        let world = WorldView::new(&after, &self.rooted, &self.environment, &self.params);
        for agent in self.agents.iter_mut().filter(|agent| agent.is_alive()) {
            let previous = agent.state();
            if let Some(child) = agent.evaluate_transition(&world) {
                self.pending_offspring.push(child);
            }
            match agent.state() {
                state if state == previous => {}
                MovableState::Dead => {
                    report.transitions += 1;
                    report.deaths += 1;
                }
                _ => report.transitions += 1,
            }
        }

        self.maintain_leadership();
        report
    }

    /// Drops dead boids and eaten-up food. Runs between ticks only.
    pub fn remove_expired(&mut self) -> Removal {
        let agents_before = self.agents.len();
        self.agents.retain(|agent| {
            if !agent.is_alive() {
                debug!("Removing {} ({})", agent.id(), agent.species());
            }
            agent.is_alive()
        });

        let rooted_before = self.rooted.len();
        self.rooted.retain(|rooted| {
            if !rooted.is_food_remaining() {
                debug!("Removing {} ({}), eaten up", rooted.id(), rooted.species());
            }
            rooted.is_food_remaining()
        });

        Removal {
            agents: agents_before - self.agents.len(),
            resources: rooted_before - self.rooted.len(),
        }
    }

    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = self.step(dt);
        report.removed = self.remove_expired();
        report.births = self.spawn_offspring();
        trace!("{}", report);
        report
    }

    // Eating rooted food is the one need a boid can't settle alone
    fn feed(&mut self) {
        for agent in &mut self.agents {
            if !agent.is_alive() || agent.state() != MovableState::Eat {
                continue;
            }
            let Some(id) = agent.rooted_prey() else {
                continue;
            };
            let Ok(index) = self.rooted.binary_search_by_key(&id, RootedBoid::id) else {
                continue;
            };

            let bite = agent.parameters().species().rates.hunger.increase;
            let eaten = self.rooted[index].consume(bite);
            agent.parameters_mut().hunger_increase_by(eaten);
        }
    }

    /*
     * Per species: the lowest-id living boid takes the lead if nobody holds
     * it. The others follow that leader while they can see it and drop it
     * once it is out of range.
     */
    fn maintain_leadership(&mut self) {
        for species in BoidType::ALL.into_iter().filter(|species| species.is_movable()) {
            let current = self
                .agents
                .iter()
                .find(|agent| agent.is_alive() && agent.species() == species && agent.is_leader())
                .map(|agent| (agent.id(), agent.position()));

            let leader = current.or_else(|| {
                let candidate = self
                    .agents
                    .iter_mut()
                    .find(|agent| agent.is_alive() && agent.species() == species)?;
                let id = candidate.id();
                candidate.set_new_leader(Some(id));
                debug!("{} ({}) now leads", id, species);
                Some((id, candidate.position()))
            });
            let Some((leader, leader_position)) = leader else {
                continue;
            };

            for agent in self.agents.iter_mut() {
                if !agent.is_alive() || agent.species() != species || agent.id() == leader {
                    continue;
                }
                let range = agent.parameters().dist_view_max();
                let follows = agent.dist_vision(leader_position, range).then_some(leader);
                if agent.leader() != follows {
                    agent.set_new_leader(follows);
                }
            }
        }
    }

    fn spawn_offspring(&mut self) -> usize {
        let mut births = 0;
        for child in std::mem::take(&mut self.pending_offspring) {
            if self.agents.len() >= self.params.max_population {
                debug!("Population cap reached, {} offspring dropped", child.species);
                continue;
            }
            match self.add_movable_agent(child.species, child.position, Vec3::ZERO) {
                Ok(id) => {
                    debug!("{} ({}) was born", id, child.species);
                    births += 1;
                }
                Err(err) => warn!("Offspring dropped: {}", err),
            }
        }
        births
    }
}
