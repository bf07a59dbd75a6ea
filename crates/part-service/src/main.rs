//! `part-analyze`: analyze one STEP file and print the JSON record.
//!
//! ```text
//! part-analyze bracket.step --material aluminum
//! part-analyze bracket.step --mesh glb --embed
//! part-analyze bracket.step --mesh stl --artifacts ./meshes
//! ```
//!
//! Logs go to stderr. Default level is WARN; override with `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use part_analysis::MeshFormat;
use part_service::{AnalysisOptions, PartService, ServiceConfig};
use step_kernel::TruckKernel;

#[derive(Parser)]
#[command(name = "part-analyze")]
#[command(about = "Dimensions, volume and weight of a STEP part", long_about = None)]
#[command(version)]
struct Cli {
    /// STEP file to analyze (.step or .stp)
    #[arg(name = "FILE")]
    file: PathBuf,

    /// Material used for the weight (default: steel)
    #[arg(long)]
    material: Option<String>,

    /// Also export a mesh (stl, stl-ascii or glb)
    #[arg(long)]
    mesh: Option<MeshFormat>,

    /// Embed the mesh in the record instead of writing an artifact
    #[arg(long, requires = "mesh")]
    embed: bool,

    /// JSON service configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for mesh artifacts (overrides the configuration)
    #[arg(long)]
    artifacts: Option<PathBuf>,
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = cli.artifacts {
        config.artifact_dir = dir;
    }

    let options = AnalysisOptions {
        material: cli.material,
        mesh: cli.mesh,
        embed_mesh: cli.embed,
    };

    let service = PartService::new(TruckKernel::new(), config)?;
    let record = service
        .analyze_file(&cli.file, &options)
        .with_context(|| format!("analyzing {}", cli.file.display()))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
