//! Headless skirmish runner
//!
//! Generates a seeded battle map, deploys two squads, orders every unit
//! across the field and runs the tick loop until everyone is idle. Prints a
//! JSON (or text) summary of where everybody ended up.

use std::path::PathBuf;

use battlescape::battle::{
    BattleMap, BattleSimulation, BodyProfile, Equipment, GotoOptions, Mission, TilePos, WallSide,
    IMPASSABLE,
};
use battlescape::core::types::{ForceId, ItemId};
use battlescape::core::{MovementConfig, Result, TacticalError};
use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headless skirmish runner for the movement core
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run a seeded movement skirmish and print a summary")]
struct Args {
    /// Movement config (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map width in tiles
    #[arg(long, default_value_t = 24)]
    width: i32,

    /// Map depth in tiles
    #[arg(long, default_value_t = 16)]
    depth: i32,

    /// Map levels
    #[arg(long, default_value_t = 2)]
    levels: i32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Units per side
    #[arg(long, default_value_t = 4)]
    units: u32,

    /// Maximum ticks before giving up
    #[arg(long, default_value_t = 3000)]
    max_ticks: u64,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose {
        "battlescape=debug"
    } else {
        "battlescape=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("skirmish failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if args.width < 8 || args.depth < 4 || args.levels < 1 {
        return Err(TacticalError::InvalidConfig(format!(
            "map {}x{}x{} is too small for a skirmish",
            args.width, args.depth, args.levels
        )));
    }
    let config = match &args.config {
        Some(path) => MovementConfig::load(path)?,
        None => MovementConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    info!("Skirmish seed {}", seed);

    let map = generate_map(args.width, args.depth, args.levels, &mut rng);
    let mut sim = BattleSimulation::new(map, config)?;

    let rows = args.depth - 2;
    let mut squads = Vec::new();
    for side in 0..2u32 {
        for n in 0..args.units as i32 {
            let rank = n / rows;
            let column = if side == 0 { 1 + rank } else { args.width - 2 - rank };
            let tile = TilePos::new(column, 1 + n % rows, 0);
            clear_spot(&mut sim.map, tile);
            let id = sim.spawn_unit(ForceId::new(side), BodyProfile::soldier(), tile)?;
            sim.unit_mut(id)?
                .state
                .inventory
                .equip(Equipment::grenade(ItemId::new(id.0)));
            squads.push((id, side));
        }
    }

    for &(id, side) in &squads {
        let target = TilePos::new(
            if side == 0 {
                rng.gen_range(args.width / 2..args.width - 1)
            } else {
                rng.gen_range(1..args.width / 2)
            },
            rng.gen_range(1..args.depth - 1),
            0,
        );
        let options = GotoOptions {
            allow_running_away: side == 0,
            ..GotoOptions::from_config(&sim.config)
        };
        let mission = Mission::goto_location(&sim.unit(id)?.state, target, options);
        sim.order(id, mission)?;

        // Every third unit lobs its grenade at where it is going
        if id.0 % 3 == 0 {
            let state = &sim.unit(id)?.state;
            match Mission::throw_item(state, ItemId::new(id.0), target, &sim.items) {
                Some(throw) => sim.order(id, throw)?,
                None => warn!("Unit {:?} cannot reach {:?} with a throw", id, target),
            }
        }
    }

    let mut elapsed = 0;
    while elapsed < args.max_ticks && !sim.all_idle() {
        sim.begin_turn();
        let ran = sim.run_until_idle(args.max_ticks - elapsed);
        if ran == 0 {
            break;
        }
        elapsed += ran;
    }

    let summary = sim.summary();
    match args.format.as_str() {
        "text" => {
            println!("Skirmish Result");
            println!("===============");
            println!("Seed: {}", seed);
            println!("Ticks: {}", summary.tick);
            for unit in &summary.units {
                println!(
                    "  {:?} (force {}) at ({:.1}, {:.1}, {:.1}) facing {:?}, {} TU{}{}",
                    unit.id,
                    unit.owner.0,
                    unit.position.x,
                    unit.position.y,
                    unit.position.z,
                    unit.facing,
                    unit.time_units,
                    if unit.idle { "" } else { ", busy" },
                    if unit.retreated { ", retreated" } else { "" },
                );
            }
            println!("Items in world: {}", summary.items_in_world);
            println!("Events: {}", summary.events.len());
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

/// Flat ground with pillars, door-studded walls, and exits on the east edge
fn generate_map(width: i32, depth: i32, levels: i32, rng: &mut ChaCha8Rng) -> BattleMap {
    let mut map = BattleMap::new(width, depth, levels);

    for y in 0..depth {
        for x in 0..width {
            if rng.gen_bool(0.06) {
                let pos = TilePos::new(x, y, 0);
                map.set_movement_cost(pos, IMPASSABLE);
                map.set_height(pos, 1.0);
            }
        }
    }

    let wall_x = width / 2;
    for y in 0..depth {
        let pos = TilePos::new(wall_x, y, 0);
        if rng.gen_bool(0.3) {
            map.set_wall(pos, WallSide::Left, 4, true);
        } else if rng.gen_bool(0.5) {
            map.set_wall(pos, WallSide::Left, IMPASSABLE, false);
        }
    }

    for y in 0..depth {
        map.set_exit(TilePos::new(width - 1, y, 0), true);
    }
    map
}

fn clear_spot(map: &mut BattleMap, pos: TilePos) {
    map.set_movement_cost(pos, battlescape::battle::DEFAULT_MOVEMENT_COST);
    map.set_height(pos, 0.0);
}
