use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_energy_settings, check_required_filename, EnergyModelSettings, AFTER_HELP, FULL_VERSION};

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct FoldSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    ribofold_version: String,

    /// Input sequences (FASTA)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_fasta: PathBuf,

    /// Optional output directory for the summary, JSON results, energy logs, and pair probabilities
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: Option<PathBuf>,

    /// Suppresses the per-record console output
    #[clap(short = 'q')]
    #[clap(long = "quiet")]
    #[clap(help_heading = Some("Input/Output"))]
    pub quiet: bool,

    #[command(flatten)]
    pub energy: EnergyModelSettings,

    /// Computes the partition function, base-pair probabilities, centroid, and MEA structures
    #[clap(short = 'p')]
    #[clap(long = "partition")]
    #[clap(help_heading = Some("Ensemble"))]
    pub enable_partition: bool,

    /// Weight of base pairs in the MEA objective
    #[clap(long = "mea-gamma")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Ensemble"))]
    #[clap(default_value = "1.0")]
    pub mea_gamma: f64,

    /// Number of structures to draw from the ensemble by stochastic backtracking
    #[clap(long = "samples")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Ensemble"))]
    #[clap(default_value = "0")]
    pub num_samples: usize,

    /// Seed for stochastic backtracking
    #[clap(long = "seed")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Ensemble"))]
    #[clap(default_value = "0")]
    pub seed: u64,

    /// Minimum probability for a pair to be saved to the pair probability files
    #[clap(long = "bpp-cutoff")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Ensemble"))]
    #[clap(default_value = "1e-5")]
    pub bpp_cutoff: f64,

    /// Number of threads to use for folding records
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Checks the ensemble options shared by `fold` and `alifold`
pub(crate) fn check_ensemble_settings(enable_partition: bool, mea_gamma: f64, num_samples: usize, seed: u64, bpp_cutoff: f64) -> anyhow::Result<()> {
    info!("Ensemble:");
    info!("\tPartition function: {}", if enable_partition { "ENABLED" } else { "DISABLED" });
    ensure!(mea_gamma > 0.0, "--mea-gamma must be >0");
    ensure!((0.0..=1.0).contains(&bpp_cutoff), "--bpp-cutoff must be in the range [0, 1]");
    ensure!(num_samples == 0 || enable_partition, "--samples requires --partition");
    if enable_partition {
        info!("\tMEA gamma: {mea_gamma}");
        info!("\tPair probability cutoff: {bpp_cutoff}");
        if num_samples > 0 {
            info!("\tSamples: {num_samples} (seed {seed})");
        }
    }
    Ok(())
}

pub fn check_fold_settings(mut settings: FoldSettings) -> anyhow::Result<FoldSettings> {
    // hard code the version in
    settings.ribofold_version = FULL_VERSION.clone();
    info!("Ribofold version: {:?}", &settings.ribofold_version);
    info!("Sub-command: fold");
    info!("Inputs:");

    check_required_filename(&settings.input_fasta, "Input FASTA")?;
    info!("\tInput FASTA: {:?}", &settings.input_fasta);

    info!("Outputs:");
    if let Some(output_folder) = settings.output_folder.as_ref() {
        info!("\tOutput folder: {output_folder:?}");
    } else {
        info!("\tOutput folder: None");
    }
    info!("\tConsole output: {}", if settings.quiet { "DISABLED" } else { "ENABLED" });

    check_energy_settings(&settings.energy)?;
    check_ensemble_settings(
        settings.enable_partition, settings.mea_gamma, settings.num_samples, settings.seed, settings.bpp_cutoff
    )?;

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
