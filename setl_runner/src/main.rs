use anyhow::{Context, bail};
use setl::loader::{load_pattern, load_world};
use setl::report::{startup_banner, write_report};
use setl::{PipelineConfig, SearchPipeline, save_png};
use std::env;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!(
            "Usage: {} <world file> <Iterations> <pattern file> [snapshot.png]",
            args.first().map_or("setl", String::as_str)
        );
    }
    let world_path = &args[1];
    let generations: usize = args[2]
        .parse()
        .with_context(|| format!("invalid iteration count {:?}", args[2]))?;
    let pattern_path = &args[3];

    // --- 2. Input Loading ---
    let world = load_world(world_path)?;
    let pattern = load_pattern(pattern_path)?;
    if let Some(snapshot_path) = args.get(4) {
        save_png(&world, snapshot_path)
            .with_context(|| format!("writing snapshot to {snapshot_path}"))?;
    }

    // --- 3. Pipeline Configuration ---
    let mut config = PipelineConfig::new(generations);
    if let Ok(workers) = env::var("SETL_WORKERS") {
        config.workers = workers
            .parse()
            .with_context(|| format!("invalid SETL_WORKERS {workers:?}"))?;
    }
    tracing::info!(?config, "pipeline configured");

    print!(
        "{}",
        startup_banner(world.logical_size(), generations, pattern.size())
    );
    std::io::stdout().flush()?;

    // --- 4. Run & Report ---
    let report = SearchPipeline::new(config).run(&world, pattern).await?;
    let mut stdout = std::io::stdout().lock();
    write_report(&mut stdout, &report)?;

    Ok(())
}
