//! vcad-project - closest-point projection onto analytic B-rep scenes
//!
//! Reads a JSON scene of trimmed analytic faces and projects points onto
//! it, printing JSON results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vcad_kernel_math::Point3;
use vcad_kernel_projection::{
    Brep, BrepFaces, Parameter, ProjectionConfig, ProjectionResult, ProjectionSolver, Tolerance,
};

mod scene;

use scene::Scene;

#[derive(Parser)]
#[command(name = "vcad-project")]
#[command(about = "Project points onto the closest point of a B-rep scene", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SolverArgs {
    /// JSON scene file
    #[arg(short, long)]
    scene: PathBuf,
    /// TOML solver configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the configured tolerance
    #[arg(short, long)]
    tolerance: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project a single point
    Project {
        #[command(flatten)]
        solver: SolverArgs,
        /// Query point coordinates
        #[arg(required = true, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        point: Vec<f64>,
    },
    /// Project every point in a JSON array of [x, y, z] triples
    Batch {
        #[command(flatten)]
        solver: SolverArgs,
        /// Input points file
        points: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Project on the calling thread instead of the thread pool
        #[arg(long)]
        sequential: bool,
    },
    /// Report how many samples each face receives
    Samples {
        #[command(flatten)]
        solver: SolverArgs,
    },
}

/// A projection result with the face reported by its position in the scene.
#[derive(Serialize)]
struct ResultRecord {
    query: [f64; 3],
    point: [f64; 3],
    face: usize,
    parameter: Vec<f64>,
    distance: f64,
    converged: bool,
    iterations: usize,
}

#[derive(Serialize)]
struct SampleReport {
    total: usize,
    per_face: Vec<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Project { solver, point } => {
            let [x, y, z] = point[..] else {
                bail!("expected 3 coordinates, got {}", point.len());
            };
            let (brep, solver) = build_solver(&solver)?;
            let query = Point3::new(x, y, z);
            let result = solver.project(&query)?;
            println!("{}", serde_json::to_string_pretty(&record(&brep, &result)?)?);
        }
        Commands::Batch {
            solver,
            points,
            output,
            sequential,
        } => {
            let (brep, solver) = build_solver(&solver)?;
            let queries = read_points(&points)?;
            let results = if sequential {
                solver.project_batch_sequential(&queries)?
            } else {
                solver.project_batch(&queries)?
            };
            let unconverged = results.iter().filter(|r| !r.converged).count();
            info!(count = results.len(), unconverged, "projected batch");
            let records = results
                .iter()
                .map(|r| record(&brep, r))
                .collect::<Result<Vec<_>>>()?;
            let json = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {} results to {}", records.len(), path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Samples { solver } => {
            let (brep, solver) = build_solver(&solver)?;
            let report = SampleReport {
                total: solver.samples().len(),
                per_face: brep
                    .faces()
                    .into_iter()
                    .map(|f| solver.samples().face_sample_count(f))
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &SolverArgs) -> Result<ProjectionConfig> {
    let mut config: ProjectionConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => ProjectionConfig::default(),
    };
    if let Some(tolerance) = args.tolerance {
        config.tolerance = Tolerance::new(tolerance)?;
    }
    Ok(config)
}

fn build_solver(args: &SolverArgs) -> Result<(Arc<Brep>, ProjectionSolver)> {
    let config = load_config(args)?;
    let text = fs::read_to_string(&args.scene)
        .with_context(|| format!("failed to read {}", args.scene.display()))?;
    let brep = Arc::new(Scene::from_json(&text)?.to_brep()?);
    let solver = ProjectionSolver::with_config(brep.clone(), config)?;
    Ok((brep, solver))
}

fn read_points(path: &Path) -> Result<Vec<Point3>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Vec<[f64; 3]> =
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(raw.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect())
}

fn record(brep: &Brep, result: &ProjectionResult) -> Result<ResultRecord> {
    let Some(face) = brep.face_index(result.face) else {
        bail!("result refers to a face outside the scene");
    };
    let parameter = match result.parameter {
        Parameter::Curve(t) => vec![t],
        Parameter::Surface(uv) => vec![uv.x, uv.y],
    };
    Ok(ResultRecord {
        query: result.query.coords.into(),
        point: result.point.coords.into(),
        face,
        parameter,
        distance: result.distance,
        converged: result.converged,
        iterations: result.iterations,
    })
}
