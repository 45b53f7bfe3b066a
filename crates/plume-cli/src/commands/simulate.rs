//! Simulate command

use anyhow::{Context, Result};
use plume_core::Vec2;
use plume_particles::{DefinitionTable, EffectManager, StepStats, TextureCache};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct SimulateArgs {
    pub file: PathBuf,
    pub effect: Option<String>,
    pub frames: u32,
    pub dt: f32,
    pub x: f32,
    pub y: f32,
    pub report_every: u32,
    pub format: String,
}

#[derive(Serialize)]
struct FrameReport {
    frame: u32,
    time: f64,
    alive: usize,
    batches: usize,
    #[serde(flatten)]
    stats: StepStats,
}

#[derive(Serialize)]
struct SimulationReport {
    effect: String,
    frames: u32,
    dt: f32,
    finished_at: Option<u32>,
    peak_alive: usize,
    totals: StepStats,
    history: Vec<FrameReport>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.dt <= 0.0 {
        anyhow::bail!("--dt must be positive, got {}", args.dt);
    }

    let table = DefinitionTable::load_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    log::info!("loaded {} effect(s) from {}", table.len(), args.file.display());
    let definition = match &args.effect {
        Some(name) => table.get(name)?,
        None => table
            .iter()
            .next()
            .with_context(|| format!("No effects defined in {}", args.file.display()))?,
    };

    let root = args.file.parent().unwrap_or(Path::new("."));
    let mut manager = EffectManager::new(table.simulation.clone(), TextureCache::with_root(root));
    let handle = manager
        .spawn(definition, Vec2::new(args.x, args.y))
        .with_context(|| format!("Failed to spawn '{}'", definition.name))?;

    let text = args.format == "text";
    let every = args.report_every.max(1);
    let mut totals = StepStats::default();
    let mut history = Vec::new();
    let mut peak_alive = 0;
    let mut finished_at = None;

    if text {
        println!(
            "Simulating '{}' for {} frame(s) at dt={}",
            definition.name, args.frames, args.dt
        );
    }

    for frame in 1..=args.frames {
        let stats = manager.update(args.dt)?;
        totals += stats;
        manager.pack_instances();

        let alive = manager.total_alive();
        peak_alive = peak_alive.max(alive);
        let report = FrameReport {
            frame,
            time: manager.total_time(),
            alive,
            batches: manager.draw_batches().len(),
            stats,
        };

        if text && (frame % every == 0 || frame == args.frames) {
            println!(
                "  frame {:>5}  t={:>8.3}  alive={:>6}  batches={:>3}  +{} -{}",
                report.frame,
                report.time,
                report.alive,
                report.batches,
                report.stats.emitted,
                report.stats.destroyed
            );
        }
        if !text {
            history.push(report);
        }

        if manager.get(handle).is_none() {
            finished_at = Some(frame);
            break;
        }
    }

    if text {
        println!();
        println!("Emitted:   {}", totals.emitted);
        println!("Destroyed: {}", totals.destroyed);
        println!("Peak:      {}", peak_alive);
        if totals.capped_nodes > 0 {
            println!("Capped:    {} node-frame(s)", totals.capped_nodes);
        }
        match finished_at {
            Some(frame) => println!("Finished at frame {}", frame),
            None => println!("Still running after {} frame(s)", args.frames),
        }
    } else {
        let report = SimulationReport {
            effect: definition.name.clone(),
            frames: args.frames,
            dt: args.dt,
            finished_at,
            peak_alive,
            totals,
            history,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
