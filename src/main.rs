use clap::Parser;
use env_logger::Env;
use log::info;

use haul_sim::simulation::{ResourceKind, SimWorld};

#[derive(Parser)]
#[command(name = "haul_sim")]
#[command(about = "Headless truck logistics simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for scattering extra trees and stones around the demo layout
    #[arg(long)]
    seed: Option<u64>,

    /// Only print the final state
    #[arg(long)]
    quiet: bool,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn,haul_sim=info")).init();

    let cli = Cli::parse();
    if cli.delta <= 0.0 {
        eprintln!("Error: --delta must be positive");
        std::process::exit(1);
    }

    run_headless(cli.ticks, cli.delta, cli.seed, cli.quiet);
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(ticks: u32, delta: f32, seed: Option<u64>, quiet: bool) {
    println!("Running logistics simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", ticks, delta);

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = ((1.0 / delta).ceil() as u32).max(1);
    println!();

    let mut world = SimWorld::create_demo_world(seed);

    if !quiet {
        println!("Initial state:");
        world.print_summary();
        world.draw_map();
        println!();
    }

    let mut tick = 0;
    while tick < ticks {
        // Run ticks_per_second ticks (or remaining ticks if fewer)
        let ticks_to_run = ticks_per_second.min(ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(delta);
        }

        if !quiet {
            println!("--- After tick {} ({:.1}s simulated time) ---", tick, tick as f32 * delta);
            world.print_summary();
            world.draw_map();
            println!();
        }
    }

    println!("=== Final State ===");
    world.print_summary();
    world.draw_map();

    info!("=== SIMULATION COMPLETE ===");
    info!("Elapsed time: {:.2}s", world.time);
    info!("Trucks: {}", world.trucks.len());
    info!("Facilities: {}", world.facilities.len());
    info!("Deliveries completed: {}", world.deliveries_completed);
    info!("Wood at base: {}", world.resources.get(ResourceKind::Wood));
    info!("Stone at base: {}", world.resources.get(ResourceKind::Stone));
    info!("Bmats at base: {}", world.resources.get(ResourceKind::Bmats));
}
