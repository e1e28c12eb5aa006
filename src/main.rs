//! Colony AI - sandbox runner
//!
//! Generates a random frontier map, lets one computer player run on it for a
//! while and reports what it did.

use std::path::PathBuf;

use clap::Parser;
use colony_ai::core::config::AiConfig;
use colony_ai::core::error::Result;
use colony_ai::core::types::{BuildSize, Cover, PlayerNumber};
use colony_ai::core::Coords;
use colony_ai::engine::{Command, GameEngine, SandboxField, SandboxWorld};
use colony_ai::planner::BuildingCatalog;
use colony_ai::player::{load_personality, ComputerPlayer, Personality};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Run a computer player on a generated sandbox map
#[derive(Parser, Debug)]
#[command(name = "colony_ai")]
#[command(about = "Run the computer player on a generated sandbox map")]
struct Args {
    /// Random seed for the map
    #[arg(long)]
    seed: Option<u64>,

    /// Game minutes to simulate
    #[arg(long, default_value_t = 30)]
    minutes: u64,

    /// Personality name (loaded from data/personalities/)
    #[arg(long, default_value = "default")]
    personality: String,

    /// Building catalog
    #[arg(long, default_value = "data/catalogs/frontier.toml")]
    catalog: PathBuf,

    /// Optional AI configuration overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host tick length in milliseconds
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

/// JSON output structure
#[derive(Serialize, Default)]
struct RunSummary {
    seed: u64,
    personality: String,
    minutes: u64,
    jobs_executed: u64,
    buildings_ordered: usize,
    flags_built: usize,
    roads_built: usize,
    roads_removed: usize,
    flags_removed: usize,
    dismantled: usize,
    enhanced: usize,
    stop_start: usize,
    sites_standing: usize,
    halted: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "colony_ai=info".into()),
        )
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let catalog = BuildingCatalog::load(&args.catalog)?;
    let config = match &args.config {
        Some(path) => AiConfig::load(path)?,
        None => AiConfig::default(),
    };
    let personality = load_personality(&args.personality).unwrap_or_else(|e| {
        tracing::warn!(
            "failed to load personality '{}': {}; using default",
            args.personality,
            e
        );
        Personality::default()
    });

    let mut world = generate_map(seed, &catalog);
    let mut player = ComputerPlayer::new(config, catalog, personality, world.now())?;
    tracing::info!("simulating {} minutes, seed {}", args.minutes, seed);

    let end = args.minutes * 60_000;
    while world.now() < end {
        world.advance(args.tick_ms.max(1));
        if player.tick(&mut world).is_err() {
            break;
        }
    }

    let summary = summarize(seed, &args, &player, &world);
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Owned start territory with a headquarters, surrounded by unowned land
fn generate_map(seed: u64, catalog: &BuildingCatalog) -> SandboxWorld {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let me = PlayerNumber(1);
    let center = Coords::new(0, 0);
    let mut world = SandboxWorld::new(me);

    world.add_land(center, 16, None);
    let resources: Vec<_> = ["coal", "iron", "gold", "granite"]
        .iter()
        .filter_map(|name| catalog.resource_by_name(name))
        .collect();

    for coords in center.within(16) {
        if coords.distance(&center) < 3 {
            continue;
        }
        let roll: f32 = rng.gen();
        let field = if roll < 0.18 {
            SandboxField {
                cover: Cover::Tree,
                ..SandboxField::default()
            }
        } else if roll < 0.24 {
            SandboxField {
                cover: Cover::Rock,
                ..SandboxField::default()
            }
        } else if roll < 0.28 {
            SandboxField {
                cover: Cover::Water,
                ..SandboxField::default()
            }
        } else if roll < 0.36 && !resources.is_empty() {
            SandboxField {
                base_size: BuildSize::None,
                mineable: true,
                resource: Some(resources[rng.gen_range(0..resources.len())]),
                resource_amount: rng.gen_range(5..=20),
                ..SandboxField::default()
            }
        } else {
            continue;
        };
        world.set_field(coords, field);
    }
    world.add_land(center, 9, Some(me));

    if let Some(hq) = catalog.type_by_name("warehouse") {
        world.place_site(hq, center, true);
    }
    if let Some(soldier) = catalog.soldier() {
        world.set_soldier_type(soldier);
        world.set_worker_stock(soldier, 10);
    }
    for ware in catalog.wares() {
        world.set_ware_stock(ware.id, rng.gen_range(0..=ware.target));
    }
    world
}

fn summarize(seed: u64, args: &Args, player: &ComputerPlayer, world: &SandboxWorld) -> RunSummary {
    let mut summary = RunSummary {
        seed,
        personality: player.personality().name.clone(),
        minutes: args.minutes,
        jobs_executed: player.scheduler().executed_total(),
        sites_standing: world.own_sites().len(),
        halted: player.is_halted(),
        ..Default::default()
    };
    for command in &world.issued {
        match command {
            Command::Build { .. } => summary.buildings_ordered += 1,
            Command::BuildFlag { .. } => summary.flags_built += 1,
            Command::BuildRoad { .. } => summary.roads_built += 1,
            Command::RemoveRoad { .. } => summary.roads_removed += 1,
            Command::RemoveFlag { .. } => summary.flags_removed += 1,
            Command::Dismantle { .. } | Command::Bulldoze { .. } => summary.dismantled += 1,
            Command::Enhance { .. } => summary.enhanced += 1,
            Command::SetStopped { .. } => summary.stop_start += 1,
            Command::SetInputTarget { .. } | Command::EvictWorker { .. } => {}
        }
    }
    summary
}

fn print_summary(summary: &RunSummary) {
    println!("\n=== COLONY AI ===");
    println!(
        "personality '{}', seed {}, {} minutes",
        summary.personality, summary.seed, summary.minutes
    );
    println!("jobs executed:     {}", summary.jobs_executed);
    println!("buildings ordered: {}", summary.buildings_ordered);
    println!("sites standing:    {}", summary.sites_standing);
    println!(
        "roads:             {} built, {} removed",
        summary.roads_built, summary.roads_removed
    );
    println!(
        "flags:             {} built, {} removed",
        summary.flags_built, summary.flags_removed
    );
    println!("dismantled:        {}", summary.dismantled);
    println!("enhanced:          {}", summary.enhanced);
    println!("stop/start:        {}", summary.stop_start);
    if summary.halted {
        println!("player HALTED");
    }
}
