//! Dynconn Application
//!
//! Command-line entry point for dynamic functional connectivity batch analysis.
//!
//! # Usage
//!
//! ```bash
//! # Full analysis of every subject in the manifest
//! dynconn analyse --input data/ --output results/ --subjects subjects.json \
//!     --network-type full_network --window-type sliding \
//!     --analysis-type graph_analysis --nclusters 5 --rand-ind 10
//!
//! # Only compute the reference-cohort threshold
//! dynconn threshold --input data/ --output results/ --subjects subjects.json \
//!     --network-type full_network --window-type non-sliding
//!
//! # Settings from a JSON file, command-line values win
//! dynconn analyse --config run.json --input data/ --output results/ --subjects subjects.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dynconn_core::AnalysisType;
use dynconn_native::{AnalysisConfig, BatchReport, BatchRunner, ConfigOverrides, SubjectManifest};

/// Dynamic functional connectivity analysis
#[derive(Parser, Debug)]
#[command(name = "dynconn")]
#[command(author, version, about = "Dynamic functional connectivity of BOLD time series", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline: dynamic measures, threshold, graphs and clustering
    Analyse(RunArgs),

    /// Compute dynamic measures and the reference-cohort threshold only
    Threshold(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input root holding `<subject>/<network unit>.txt`
    #[arg(short, long)]
    input: PathBuf,

    /// Output root for cached artifacts
    #[arg(short, long)]
    output: PathBuf,

    /// Subject manifest (JSON list of `{"id", "group"}`)
    #[arg(short, long)]
    subjects: PathBuf,

    /// JSON configuration file; command-line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// full_network, within_network or between_network
    #[arg(long)]
    network_type: Option<String>,

    /// non-sliding or sliding
    #[arg(long)]
    window_type: Option<String>,

    /// BOLD, synchrony or graph_analysis
    #[arg(long)]
    analysis_type: Option<String>,

    /// Number of k-means clusters
    #[arg(long = "nclusters")]
    n_clusters: Option<usize>,

    /// Null-model rewiring iterations
    #[arg(long)]
    rand_ind: Option<usize>,

    /// Base RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Sliding-window length in samples
    #[arg(long)]
    window_size: Option<usize>,

    /// Number of within-network sub-networks
    #[arg(long)]
    n_networks: Option<usize>,

    /// Expected timepoints per input file
    #[arg(long)]
    n_timepoints: Option<usize>,
}

impl RunArgs {
    /// Configuration file (if any) overlaid with command-line values
    fn overrides(&self) -> anyhow::Result<ConfigOverrides> {
        let base = match &self.config {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        let cli = ConfigOverrides {
            network_type: self.network_type.clone(),
            window_type: self.window_type.clone(),
            analysis_type: self.analysis_type.clone(),
            n_clusters: self.n_clusters,
            rand_ind: self.rand_ind,
            seed: self.seed,
            window_size: self.window_size,
            n_networks: self.n_networks,
            n_timepoints: self.n_timepoints,
            ..ConfigOverrides::default()
        };
        Ok(base.merge(cli))
    }

    fn runner(&self, overrides: ConfigOverrides) -> anyhow::Result<BatchRunner> {
        let config = AnalysisConfig::resolve(overrides)?;
        let manifest = SubjectManifest::load(&self.subjects)?;
        info!(
            "{} subjects ({} reference), {} / {} / {}",
            manifest.len(),
            manifest.reference_cohort().count(),
            config.network_type,
            config.window_type,
            config.analysis_type
        );
        Ok(BatchRunner::new(config, &self.input, &self.output, manifest)?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Dynconn v{}", env!("CARGO_PKG_VERSION"));

    let report = match cli.command {
        Commands::Analyse(args) => {
            let runner = args.runner(args.overrides()?)?;
            runner.run()?
        }
        Commands::Threshold(args) => {
            let mut overrides = args.overrides()?;
            // Settings of the later phases do not affect the threshold
            overrides
                .analysis_type
                .get_or_insert_with(|| AnalysisType::Synchrony.name().to_string());
            overrides.n_clusters.get_or_insert(1);
            overrides.rand_ind.get_or_insert(0);
            let runner = args.runner(overrides)?;
            let report = runner.run_threshold_only()?;
            if let Some(threshold) = &report.threshold {
                println!("{:.6}", threshold.k);
            }
            report
        }
    };

    summarize(&report)
}

fn summarize(report: &BatchReport) -> anyhow::Result<()> {
    for (subject, reason) in &report.failed {
        warn!("{}: {}", subject, reason);
    }
    info!(
        "Finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    if report.all_failed() {
        anyhow::bail!("every subject failed");
    }
    Ok(())
}
