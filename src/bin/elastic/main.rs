//! Elastic CLI - pin-driven mesh deformation from the command line.
//!
//! Usage: elastic <COMMAND> [OPTIONS] <INPUT> ...
//!
//! Run `elastic --help` for available commands.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use elastic_mesh::algo::geodesic::{dijkstra, DijkstraOptions};
use elastic_mesh::algo::{
    deform_with_progress, BlendWeighting, DeformOptions, Progress, UnreachablePolicy,
};
use elastic_mesh::io;

#[derive(Parser)]
#[command(name = "elastic")]
#[command(author, version, about = "Pin-driven mesh deformation CLI", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deform a mesh so that pinned vertices reach their targets
    Deform {
        /// Input mesh file
        input: PathBuf,

        /// JSON pin file
        pins: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Number of ARAP iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Move pins to their targets at once instead of easing them in
        #[arg(long)]
        no_ease: bool,

        /// Stop early once no vertex moves more than this per iteration
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Inverse-distance exponent
        #[arg(short, long, default_value = "2.0")]
        power: f64,

        /// Distance below which a vertex counts as sitting on a pin
        #[arg(short, long, default_value = "0.001")]
        epsilon: f64,

        /// Skip the rigid pre-alignment of the pins
        #[arg(long)]
        no_rigid: bool,

        /// How per-pin falloff values combine
        #[arg(short, long, value_enum, default_value = "max")]
        weighting: Weighting,

        /// What to do with vertices no pin can reach
        #[arg(short, long, value_enum, default_value = "keep")]
        unreachable: Unreachable,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Summarize edge-path distances from one vertex
    Distances {
        /// Input mesh file
        input: PathBuf,

        /// Source vertex index
        vertex: usize,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Weighting {
    /// Strongest single-pin falloff
    Max,
    /// Falloff scaled by normalized inverse-distance weights
    Idw,
}

impl From<Weighting> for BlendWeighting {
    fn from(w: Weighting) -> Self {
        match w {
            Weighting::Max => BlendWeighting::MaxFalloff,
            Weighting::Idw => BlendWeighting::InverseDistanceScaled,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Unreachable {
    /// Leave unreachable vertices at rest
    Keep,
    /// Fall back to straight-line distances
    Euclidean,
    /// Abort the deformation
    Error,
}

impl From<Unreachable> for UnreachablePolicy {
    fn from(u: Unreachable) -> Self {
        match u {
            Unreachable::Keep => UnreachablePolicy::KeepRest,
            Unreachable::Euclidean => UnreachablePolicy::EuclideanFallback,
            Unreachable::Error => UnreachablePolicy::Error,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Deform {
            input,
            pins,
            output,
            iterations,
            no_ease,
            tolerance,
            power,
            epsilon,
            no_rigid,
            weighting,
            unreachable,
            sequential,
        } => {
            let mut options = DeformOptions::default()
                .with_iterations(iterations)
                .with_weighting(weighting.into())
                .with_unreachable(unreachable.into())
                .with_parallel(!sequential);
            options.arap = options.arap.with_ease_pins(!no_ease);
            if let Some(tol) = tolerance {
                options.arap = options.arap.with_convergence_tolerance(tol);
            }
            options.idw = options
                .idw
                .with_power(power)
                .with_epsilon(epsilon)
                .with_rigid(!no_rigid);

            cmd_deform(&input, &pins, &output, &options)?;
        }

        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Distances { input, vertex } => {
            cmd_distances(&input, vertex)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever move forward.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        let percent = previous.max(raw_percent);
        if percent == previous && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {:<32}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_deform(
    input: &PathBuf,
    pins_path: &PathBuf,
    output: &PathBuf,
    options: &DeformOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    let pins = io::pins::load(pins_path)?;

    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!(
        "Deforming with {} pins ({} iterations, {})...",
        pins.len(),
        options.arap.iterations,
        mode
    );

    let progress = create_progress();
    let start = Instant::now();
    let result = deform_with_progress(&mesh.vertices, &mesh.faces, &pins, options, &progress)?;
    let elapsed = start.elapsed();

    if options.arap.convergence_tolerance.is_some() {
        println!(
            "ARAP: {} iterations, {}",
            result.iterations_run,
            if result.converged { "converged" } else { "not converged" }
        );
    }
    if result.degenerate_corners > 0 {
        println!("Degenerate triangle corners: {}", result.degenerate_corners);
    }
    if !result.unreachable.is_empty() {
        println!("Unreachable vertices: {}", result.unreachable.len());
    }

    let deformed = mesh.with_positions(result.positions)?;
    io::save(&deformed, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    let ctx = mesh.context()?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", ctx.adjacency().num_directed_edges() / 2);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    println!("Average edge length: {:.6}", mesh.average_edge_length());

    let (_, components) = ctx.adjacency().connected_components();
    println!("Connected components: {}", components);
    println!("Degenerate triangle corners: {}", ctx.weights().degenerate_corners());

    Ok(())
}

fn cmd_distances(input: &PathBuf, vertex: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    let ctx = mesh.context()?;
    if vertex >= mesh.num_vertices() {
        return Err(format!(
            "vertex {} out of range (mesh has {} vertices)",
            vertex,
            mesh.num_vertices()
        )
        .into());
    }

    let start = Instant::now();
    let result = dijkstra(ctx.adjacency(), ctx.vertices(), vertex, &DijkstraOptions::default());
    let elapsed = start.elapsed();

    let reachable: Vec<f64> = result
        .distances()
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .collect();
    let mean = reachable.iter().sum::<f64>() / reachable.len() as f64;

    println!("Source vertex: {}", vertex);
    println!("Reachable: {} of {}", result.reachable_count(), mesh.num_vertices());
    if let Some((far, dist)) = result.farthest_vertex() {
        println!("Farthest: vertex {} at {:.6}", far, dist);
    }
    println!("Mean distance: {:.6}", mean);
    println!("Computed in {:.2?}", elapsed);

    Ok(())
}
