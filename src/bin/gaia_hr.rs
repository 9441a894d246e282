//! Batch HR diagrams from a table of sky regions
//!
//! Reads a CSV target table (`name,ra,dec[,radius_arcmin,row_limit,process]`), queries Gaia DR3
//! around every enabled region, filters and derives the stars, then writes one HR diagram per
//! region plus a combined figure.
//!
//! Usage:
//! ```
//! cargo run --bin gaia-hr -- --targets demos/targets.csv --plots-dir plots
//! ```
//!
//! Logging honours `--log-level`, then `RUST_LOG`, then defaults to `info`.
use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gaia_hr::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PARALLAX_ERROR_MAX, DEFAULT_ROW_LIMIT, DEFAULT_RUWE_MAX,
    DEFAULT_SAMPLE_ROWS, DEFAULT_SEARCH_RADIUS_ARCMIN,
};
use gaia_hr::prelude::*;

/// Command line arguments of the batch run
#[derive(Parser, Debug)]
#[command(
    name = "gaia-hr",
    about = "Query Gaia DR3 around sky regions and draw Hertzsprung-Russell diagrams",
    long_about = None
)]
struct Args {
    /// CSV table of regions to process
    #[arg(short, long, default_value = "demos/targets.csv")]
    targets: Utf8PathBuf,

    /// Directory receiving the PNG files
    #[arg(short, long, default_value = "plots")]
    plots_dir: Utf8PathBuf,

    /// Keep every retrieved star (no quality cut)
    #[arg(long)]
    no_filters: bool,

    /// Upper bound (exclusive) on parallax_error in mas
    #[arg(long, default_value_t = DEFAULT_PARALLAX_ERROR_MAX)]
    parallax_error_max: f64,

    /// Upper bound (exclusive) on RUWE
    #[arg(long, default_value_t = DEFAULT_RUWE_MAX)]
    ruwe_max: f64,

    /// Cone radius in arcminutes for rows leaving it empty
    #[arg(long, default_value_t = DEFAULT_SEARCH_RADIUS_ARCMIN)]
    radius_arcmin: f64,

    /// Row cap for rows leaving it empty
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    row_limit: usize,

    /// HTTP timeout of one catalog query, in seconds
    #[arg(long, default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Query the regions concurrently
    #[arg(long)]
    parallel: bool,

    /// Skip image output
    #[arg(long)]
    no_plots: bool,

    /// Also draw the density diagram of each region
    #[arg(long)]
    density: bool,

    /// Rows shown in the debug sample table
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    sample_rows: usize,

    /// Log filter, e.g. `debug` or `gaia_hr=trace`
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_runner(args: &Args) -> Result<BatchRunner<GaiaTapClient>, HrError> {
    let filter = FilterParams::builder()
        .parallax_error_max(args.parallax_error_max)
        .ruwe_max(args.ruwe_max)
        .build()?;
    let config = PipelineConfig::builder()
        .filter(filter)
        .sample_rows(args.sample_rows)
        .build()?;
    let defaults = BatchDefaults::new(args.radius_arcmin, args.row_limit, !args.no_filters)?;

    let client = GaiaTapClient::new(HrEnv::with_timeout(Duration::from_secs(args.timeout_secs)));
    Ok(BatchRunner::new(RetrievalPipeline::new(client, config), defaults))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let runner = match build_runner(&args) {
        Ok(runner) => runner,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };
    let targets = match load_targets(&args.targets) {
        Ok(targets) => targets,
        Err(err) => {
            error!(file = %args.targets, "{err}");
            return ExitCode::from(2);
        }
    };

    println!(
        "gaia-hr {}: {} regions from {} ({} enabled)",
        env!("CARGO_PKG_VERSION"),
        targets.len(),
        args.targets,
        targets.iter().filter(|t| t.process).count()
    );

    let filters = if args.no_filters {
        "disabled".to_string()
    } else {
        runner.pipeline().config().filter().to_string()
    };
    info!(
        regions = targets.len(),
        %filters,
        "Processing {} with {}",
        args.targets,
        runner.pipeline().client().service_name()
    );

    let report = if args.parallel {
        runner.run_parallel(&targets)
    } else {
        runner.run(&targets)
    };
    println!("{report:#}");

    if !args.no_plots {
        let renderer = PlotRenderer::new(args.plots_dir.clone());
        let summary = render_results(&renderer, report.completed(), args.density);
        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            "Diagrams written to {}",
            renderer.output_dir()
        );
    }

    ExitCode::SUCCESS
}
