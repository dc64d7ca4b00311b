//! RNAlytics command-line interface.
//!
//! `run` analyses the configured treatments, `serve` exposes the results
//! over HTTP, `example` writes a starting configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rnalytics::pipeline::{Analyzer, PipelineConfig};
use rnalytics::service::{self, DataSource, ServiceConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// RNA-seq differential expression pipeline and query service
#[derive(Parser)]
#[command(name = "rnalytics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the analysis for every configured treatment
    Run {
        /// Pipeline configuration YAML (defaults are used if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory with <T>_counts.csv and <T>_metadata.csv
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Directory for deg_<T>.csv and volcano_<T>.png
        #[arg(long)]
        processed_dir: Option<PathBuf>,

        /// Treatment to analyse (repeatable; replaces the configured list)
        #[arg(short, long = "treatment")]
        treatments: Vec<String>,

        /// Minimum number of expressing samples per gene
        #[arg(long)]
        min_samples: Option<usize>,

        /// Per-sample total after normalization
        #[arg(long)]
        target_sum: Option<f64>,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Serve the results over HTTP
    Serve {
        /// Directory holding the pipeline's result tables
        #[arg(long, env = "RNALYTICS_PROCESSED_DIR", default_value = "data/processed")]
        processed_dir: PathBuf,

        /// Listen address
        #[arg(long, env = "RNALYTICS_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Accepted treatment (repeatable)
        #[arg(
            short,
            long = "treatment",
            env = "RNALYTICS_TREATMENTS",
            value_delimiter = ',',
            default_values_t = ["CsA".to_string(), "VOC".to_string()]
        )]
        treatments: Vec<String>,

        /// Summary source: files or stub
        #[arg(long, env = "RNALYTICS_SOURCE", default_value = "files")]
        source: DataSource,
    },

    /// Write an example pipeline configuration
    Example {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            raw_dir,
            processed_dir,
            treatments,
            min_samples,
            target_sum,
            report,
        } => cmd_run(
            config.as_deref(),
            RunOverrides {
                raw_dir,
                processed_dir,
                treatments,
                min_samples,
                target_sum,
            },
            report.as_deref(),
        ),

        Commands::Serve {
            processed_dir,
            bind,
            treatments,
            source,
        } => cmd_serve(ServiceConfig {
            processed_dir,
            treatments,
            bind,
            source,
        }),

        Commands::Example { output } => cmd_example(&output).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Command-line values that take precedence over the YAML config.
struct RunOverrides {
    raw_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
    treatments: Vec<String>,
    min_samples: Option<usize>,
    target_sum: Option<f64>,
}

impl RunOverrides {
    fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = self.raw_dir {
            config.raw_dir = dir;
        }
        if let Some(dir) = self.processed_dir {
            config.processed_dir = dir;
        }
        if !self.treatments.is_empty() {
            config.treatments = self.treatments;
        }
        if let Some(n) = self.min_samples {
            config.min_samples = n;
        }
        if let Some(target) = self.target_sum {
            config.target_sum = target;
        }
        config
    }
}

/// Returns `Ok(false)` when any treatment failed.
fn cmd_run(config_path: Option<&Path>, overrides: RunOverrides, report_path: Option<&Path>) -> anyhow::Result<bool> {
    let config = match config_path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading pipeline configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let config = overrides.apply(config);

    tracing::info!(
        raw_dir = %config.raw_dir.display(),
        processed_dir = %config.processed_dir.display(),
        treatments = ?config.treatments,
        "starting run"
    );
    let report = Analyzer::new(config).run()?;

    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("writing run report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote run report");
    }
    print!("{}", report);

    Ok(report.all_succeeded())
}

fn cmd_serve(config: ServiceConfig) -> anyhow::Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime
        .block_on(service::serve(config))
        .context("serving API")?;
    Ok(true)
}

fn cmd_example(output_path: &Path) -> anyhow::Result<()> {
    let yaml = PipelineConfig::example_yaml()?;
    std::fs::write(output_path, &yaml)
        .with_context(|| format!("writing {}", output_path.display()))?;
    eprintln!("Wrote example pipeline configuration to {}", output_path.display());
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);
    Ok(())
}
