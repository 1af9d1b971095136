use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use anomaly_scan::config::{Job, Manifest, RunParams};
use anomaly_scan::pipeline::{run_batch, BatchOptions, BatchReport};
use anomaly_scan::prompt::prompt_params;

#[derive(Parser)]
#[command(name = "anomaly-scan")]
#[command(about = "Flag experimental cells whose ratio to the control drifts from 1", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a single control/experimental pair
    Run {
        /// Control table (.csv, .tsv, .json, .parquet)
        #[arg(long)]
        control: PathBuf,

        /// Experimental table, same shape as the control
        #[arg(long)]
        experimental: PathBuf,

        /// Output CSV (Value,Cell)
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compare every pair listed in a manifest
    Batch {
        /// Manifest file (.json or .toml)
        #[arg(long)]
        manifest: PathBuf,

        /// Stop at the first failing pair
        #[arg(long)]
        fail_fast: bool,

        /// Process pairs in parallel
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Args)]
struct ParamArgs {
    /// Threshold multiplier (>= 0)
    #[arg(long)]
    multiplier: Option<f64>,

    /// Cross-validation folds (>= 2)
    #[arg(long)]
    folds: Option<usize>,

    /// Fold shuffle seed
    #[arg(long)]
    seed: Option<u64>,

    /// Ask for the multiplier and folds on stdin
    #[arg(long, conflicts_with_all = ["multiplier", "folds"])]
    interactive: bool,

    /// Retries per question in interactive mode
    #[arg(long, default_value_t = 3)]
    max_attempts: usize,
}

impl ParamArgs {
    /// Flags override `base`; interactive answers override both.
    fn resolve(&self, base: RunParams) -> Result<RunParams> {
        let mut params = if self.interactive {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            let answered = prompt_params(&mut input, &mut output, self.max_attempts)?;
            RunParams { seed: base.seed, ..answered }
        } else {
            RunParams {
                multiplier: self.multiplier.unwrap_or(base.multiplier),
                folds: self.folds.unwrap_or(base.folds),
                ..base
            }
        };
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        params.validate()?;
        Ok(params)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match execute(cli.command) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> Result<BatchReport> {
    let (jobs, params, options) = match command {
        Commands::Run {
            control,
            experimental,
            output,
            params,
        } => (
            vec![Job::new(control, experimental, output)],
            params.resolve(RunParams::default())?,
            BatchOptions::default(),
        ),
        Commands::Batch {
            manifest,
            fail_fast,
            parallel,
            params,
        } => {
            let loaded = Manifest::load(&manifest)?;
            if loaded.jobs.is_empty() {
                bail!("{} lists no jobs", manifest.display());
            }
            let options = BatchOptions {
                fail_fast: fail_fast || loaded.fail_fast,
                parallel,
            };
            let resolved = params.resolve(loaded.params())?;
            (loaded.jobs, resolved, options)
        }
    };

    log::info!(
        "Processing {} pair(s) with multiplier {} and {} folds",
        jobs.len(),
        params.multiplier,
        params.folds
    );
    let report = run_batch(&jobs, &params, options).context("batch rejected")?;

    for pair in &report.succeeded {
        println!(
            "{}: {} anomalies in {}x{} cells (threshold {:.6}) -> {}",
            pair.job.experimental.display(),
            pair.anomalies,
            pair.shape.0,
            pair.shape.1,
            pair.threshold.value(),
            pair.job.output.display()
        );
    }
    for failure in &report.failed {
        eprintln!("FAILED {failure}");
    }
    if report.skipped > 0 {
        eprintln!("{} pair(s) skipped after the first failure", report.skipped);
    }

    Ok(report)
}
