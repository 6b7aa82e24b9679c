#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs police maze rooms headlessly.

mod room_definition;
mod save_transfer;
mod simulation;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use police_maze_core::{Difficulty, RoomSnapshot, TrackIndex};
use police_maze_system_room::{Room, RoomTick};
use police_maze_world::Config;

use crate::{room_definition::RoomDefinition, save_transfer::SaveTransfer, simulation::Simulation};

#[derive(Parser, Debug)]
#[command(
    name = "police-maze",
    about = "Runs scripted police maze rooms without a renderer",
    version
)]
struct Cli {
    /// Enable debug logging and per-frame event output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Simulate a room for a number of frames
    Run(RunArgs),
    /// List every track's decoded program
    Disasm(DisasmArgs),
    /// Decode a save transfer string
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Room definition TOML file (default: bundled demo room)
    #[arg(long)]
    room: Option<PathBuf>,

    /// Number of host frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Milliseconds that elapse per host frame
    #[arg(long, default_value_t = 66)]
    frame_ms: u64,

    /// Seed for the host random number generator
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// Difficulty selecting the track update rate
    #[arg(long, value_enum, default_value_t = DifficultyArg::Normal)]
    difficulty: DifficultyArg,

    /// Write a save transfer string here after the run
    #[arg(long)]
    save_out: Option<PathBuf>,

    /// Continue from a save transfer string instead of starting fresh
    #[arg(long)]
    resume: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DisasmArgs {
    /// Room definition TOML file (default: bundled demo room)
    #[arg(long)]
    room: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// File holding a save transfer string
    file: PathBuf,

    /// Print the full snapshot as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

/// Entry point for the police maze command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        CliCommand::Run(args) => run(args, cli.verbose),
        CliCommand::Disasm(args) => disasm(&args),
        CliCommand::Inspect(args) => inspect(&args),
    }
}

fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let definition = RoomDefinition::load(args.room.as_deref())?;
    let config = Config::new(args.seed, args.difficulty.into(), 0);
    let mut simulation = match &args.resume {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read save {}", path.display()))?;
            let save = SaveTransfer::decode(&text)
                .with_context(|| format!("failed to decode save {}", path.display()))?;
            Simulation::resume(&definition, config, &save)?
        }
        None => Simulation::start(&definition, config)?,
    };

    let mut completed_at = None;
    let mut faults = 0_usize;
    for frame in 0..args.frames {
        let outcome = simulation.step(args.frame_ms);
        if verbose {
            for event in &outcome.events {
                println!("[{frame:>5}] {event:?}");
            }
        }
        if let RoomTick::Advanced(report) = outcome.tick {
            for (slot, fault) in &report.faults {
                println!("[{frame:>5}] track {slot} halted: {fault}");
            }
            faults += report.faults.len();
            if report.completed {
                completed_at = Some(frame);
            }
        }
    }

    println!(
        "simulated {} frames ({} ms)",
        simulation.frames(),
        simulation.now_ms()
    );
    println!("score: {}", simulation.score());
    match completed_at {
        Some(frame) => println!("maze completed at frame {frame}"),
        None => println!("maze not completed"),
    }
    if faults > 0 {
        println!("track faults: {faults}");
    }
    if let Some(overlay) = simulation.room().debug_overlay() {
        println!("live tracks: {}", overlay.live_tracks);
    }
    if verbose {
        for (id, item) in simulation.items() {
            let position = item.position();
            println!(
                "item {id}: ({:.1}, {:.1}, {:.1}) facing {}",
                position.x,
                position.y,
                position.z,
                item.facing()
            );
        }
    }

    if let Some(path) = &args.save_out {
        let save = simulation.save()?;
        fs::write(path, format!("{}\n", save.encode()))
            .with_context(|| format!("failed to write save {}", path.display()))?;
        println!("saved to {}", path.display());
    }
    Ok(())
}

fn disasm(args: &DisasmArgs) -> Result<()> {
    let definition = RoomDefinition::load(args.room.as_deref())?;
    for (track, (slot, program)) in definition.tracks.iter().zip(definition.programs()?) {
        let state = if track.active { "active" } else { "paused" };
        println!(
            "track {slot}: item {} over {} waypoints ({state})",
            track.item, track.steps
        );
        for (offset, instruction) in program.iter() {
            println!("  {offset:>4}  {instruction}");
        }
    }
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read save {}", args.file.display()))?;
    let save = SaveTransfer::decode(&text)
        .with_context(|| format!("failed to decode save {}", args.file.display()))?;
    let snapshot = save
        .snapshot()
        .context("save does not describe a police maze room")?;
    Room::default()
        .restore(&snapshot)
        .context("save does not describe a police maze room")?;

    if args.json {
        let json = serde_json::to_string_pretty(&snapshot).context("failed to render snapshot")?;
        println!("{json}");
    } else {
        print_summary(&snapshot);
    }
    Ok(())
}

fn print_summary(snapshot: &RoomSnapshot) {
    println!(
        "room: paused={} active={} ending={}",
        snapshot.paused, snapshot.active, snapshot.ending
    );
    for (index, track) in snapshot.tracks.iter().enumerate() {
        if !track.present {
            continue;
        }
        let slot = TrackIndex::new(u32::try_from(index).unwrap_or(u32::MAX));
        let mut state = Vec::new();
        if track.paused {
            state.push("paused".to_owned());
        }
        if track.waiting {
            state.push(format!("waiting {} ms", track.wait_remaining_ms));
        }
        if let (true, Some(target)) = (track.moving, track.waypoint_target) {
            state.push(format!("moving to {target}"));
        }
        if track.rotating {
            state.push(format!("turning to {}", track.rotation_target));
        }
        println!(
            "track {slot}: item {} cursor {} at waypoint {}/{} {}",
            track.item,
            track.cursor,
            track.waypoint_index,
            track.waypoint_count,
            state.join(", ")
        );
    }
}
