//! Ray Limits command line
//!
//! Loads a scene, builds its limits, and prints one JSON line per ray query.

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use glam::DVec3;
use serde::Serialize;

use ray_limits::scene::RayQuery;
use ray_limits::{Limits, SceneDescriptor, SceneError, Settings};

#[derive(Parser)]
#[command(name = "ray-limits")]
#[command(about = "Evaluate range-limited rays through a scene")]
#[command(version)]
struct Cli {
    /// Scene file (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Settings file (JSON); defaults are used if it does not exist
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct QueryResult {
    target_hit: bool,
    elapsed_time: f64,
    remaining_energy: f64,
    destination: DVec3,
}

fn evaluate(limits: &mut Limits, query: &RayQuery) -> QueryResult {
    let mut ray = limits.cast_ray(&query.sense, query.min_range, query.origin, query.target);
    QueryResult {
        target_hit: ray.target_hit(),
        elapsed_time: ray.elapsed_time(),
        remaining_energy: ray.remaining_energy(),
        destination: ray.destination(),
    }
}

fn main() -> Result<(), SceneError> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let scene = SceneDescriptor::load(&cli.scene)?;
    let mut limits = Limits::from_scene(&scene, &settings)?;

    for query in &scene.queries {
        let result = evaluate(&mut limits, query);
        println!("{}", serde_json::to_string(&result)?);
    }

    log::info!("Evaluated {} queries", scene.queries.len());
    Ok(())
}
