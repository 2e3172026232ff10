/*
 * Boid Ecosystem Simulation
 *
 * Driver for the simulation library. It builds a world from the command
 * line (population sizes, lakes, seed, optional species catalog in JSON)
 * and then either runs a fixed number of ticks headless, logging a census
 * as it goes, or opens the interactive viewer when built with the
 * "viewer" feature.
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use boids::{logging, BoidType, BoidsManager, FlatTerrain, SimulationParams, SpeciesCatalog};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for every random draw of the run
    #[arg(long, default_value_t = SimulationParams::default().seed)]
    seed: u64,

    #[arg(long, default_value_t = 60)]
    rabbits: usize,

    #[arg(long, default_value_t = 6)]
    wolves: usize,

    #[arg(long, default_value_t = 40)]
    carrots: usize,

    #[arg(long, default_value_t = 15)]
    trees: usize,

    #[arg(long, default_value_t = 2)]
    lakes: usize,

    /// Ticks to run in headless mode
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Simulated seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Length of a day (and of a night) in simulated seconds, 0 for endless day
    #[arg(long, default_value_t = 60.0)]
    day_length: f32,

    /// JSON species catalog replacing the built-in one
    #[arg(long, value_name = "JSON")]
    species: Option<PathBuf>,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_catalog(path: &Path) -> Result<SpeciesCatalog> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read species catalog {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse species catalog {}", path.display()))
}

// Lakes are placed from their own generator so adding one does not shift
// the population draws of the manager
fn build_terrain(args: &Args, params: &SimulationParams) -> FlatTerrain {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(1));
    let reach = (params.half_world() - params.wall_margin).max(1.0);
    let mut terrain = FlatTerrain::new(0.0).with_day_length(args.day_length);

    for _ in 0..args.lakes {
        let center = Vec2::new(rng.gen_range(-reach..reach), rng.gen_range(-reach..reach));
        let radius = rng.gen_range(6.0..16.0);
        terrain = terrain.with_lake(center, radius);
    }
    terrain
}

fn build_world(args: &Args) -> Result<BoidsManager<FlatTerrain>> {
    let catalog = match &args.species {
        Some(path) => load_catalog(path)?,
        None => SpeciesCatalog::default(),
    };
    let params = SimulationParams {
        seed: args.seed,
        ..SimulationParams::default()
    };

    let terrain = build_terrain(args, &params);
    let mut manager =
        BoidsManager::new(terrain, catalog, params).context("invalid simulation settings")?;

    manager.scatter_rooted(BoidType::Tree, args.trees)?;
    manager.scatter_rooted(BoidType::Carrot, args.carrots)?;
    manager.scatter_movable(BoidType::Rabbit, args.rabbits)?;
    manager.scatter_movable(BoidType::Wolf, args.wolves)?;

    Ok(manager)
}

fn run_headless(mut manager: BoidsManager<FlatTerrain>, ticks: u64, dt: f32) {
    let every = (ticks / 10).max(1);
    let mut deaths = 0;
    let mut births = 0;

    for _ in 0..ticks {
        let report = manager.tick(dt);
        deaths += report.deaths;
        births += report.births;

        if report.tick % every == 0 {
            info!("{}", manager.census());
        }
        if manager.census().living() == 0 {
            info!("Every movable boid is dead after {} ticks", report.tick);
            break;
        }
    }

    info!(
        "Finished after {} ticks: {} deaths, {} births",
        manager.tick_count(),
        deaths,
        births
    );
    info!("{}", manager.census());
}

#[cfg(feature = "viewer")]
fn present(manager: BoidsManager<FlatTerrain>, args: &Args) {
    if args.headless {
        run_headless(manager, args.ticks, args.dt);
    } else {
        boids::app::run(manager, args.dt);
    }
}

#[cfg(not(feature = "viewer"))]
fn present(manager: BoidsManager<FlatTerrain>, args: &Args) {
    if !args.headless {
        log::warn!("Built without the viewer feature, running headless");
    }
    run_headless(manager, args.ticks, args.dt);
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let manager = build_world(&args)?;
    info!(
        "World ready: {} movable and {} rooted boids, seed {}",
        manager.movable_boids().len(),
        manager.rooted_boids().len(),
        args.seed
    );

    present(manager, &args);
    Ok(())
}
