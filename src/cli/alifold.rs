use anyhow::ensure;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_energy_settings, check_required_filename, EnergyModelSettings, AFTER_HELP, FULL_VERSION};
use crate::cli::fold::check_ensemble_settings;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct AlifoldSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    ribofold_version: String,

    /// Aligned input sequences (FASTA), all rows of equal length
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_fasta: PathBuf,

    /// Optional output directory for the summary, JSON results, energy log, and pair probabilities
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: Option<PathBuf>,

    #[command(flatten)]
    pub energy: EnergyModelSettings,

    /// Weight of the covariance bonus
    #[clap(long = "cv-factor")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Covariance"))]
    #[clap(default_value = "1.0")]
    pub cv_factor: f64,

    /// Weight of the penalty for rows that cannot form a pair
    #[clap(long = "nc-factor")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Covariance"))]
    #[clap(default_value = "1.0")]
    pub nc_factor: f64,

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

    /// Minimum probability for a pair to be saved to the pair probability file
    #[clap(long = "bpp-cutoff")]
    #[clap(value_name = "FLOAT")]
    #[clap(help_heading = Some("Ensemble"))]
    #[clap(default_value = "1e-5")]
    pub bpp_cutoff: f64,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_alifold_settings(mut settings: AlifoldSettings) -> anyhow::Result<AlifoldSettings> {
    // hard code the version in
    settings.ribofold_version = FULL_VERSION.clone();
    info!("Ribofold version: {:?}", &settings.ribofold_version);
    info!("Sub-command: alifold");
    info!("Inputs:");

    check_required_filename(&settings.input_fasta, "Input alignment")?;
    info!("\tInput alignment: {:?}", &settings.input_fasta);

    info!("Outputs:");
    if let Some(output_folder) = settings.output_folder.as_ref() {
        info!("\tOutput folder: {output_folder:?}");
    } else {
        info!("\tOutput folder: None");
    }

    check_energy_settings(&settings.energy)?;

    info!("Covariance:");
    ensure!(settings.cv_factor >= 0.0, "--cv-factor must be >=0");
    ensure!(settings.nc_factor >= 0.0, "--nc-factor must be >=0");
    info!("\tCovariance factor: {}", settings.cv_factor);
    info!("\tNon-compatible factor: {}", settings.nc_factor);

    check_ensemble_settings(
        settings.enable_partition, settings.mea_gamma, settings.num_samples, settings.seed, settings.bpp_cutoff
    )?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_alifold_settings() {
        let folder = tempfile::tempdir().unwrap();
        let input_fasta = folder.path().join("input.fa");
        std::fs::write(&input_fasta, ">seq1\nGGGAAACCC\n>seq2\nGGCAAAGCC\n").unwrap();

        let settings = AlifoldSettings {
            input_fasta: input_fasta.clone(),
            cv_factor: 1.0,
            nc_factor: 1.0,
            mea_gamma: 1.0,
            ..Default::default()
        };
        assert!(check_alifold_settings(settings).is_ok());

        let settings = AlifoldSettings {
            input_fasta,
            cv_factor: -1.0,
            nc_factor: 1.0,
            mea_gamma: 1.0,
            ..Default::default()
        };
        assert!(check_alifold_settings(settings).is_err());
    }
}
