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
pub struct SuboptSettings {
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

    /// Optional output file with one row per structure (TSV/CSV)
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: Option<PathBuf>,

    /// Suppresses the per-record console output
    #[clap(short = 'q')]
    #[clap(long = "quiet")]
    #[clap(help_heading = Some("Input/Output"))]
    pub quiet: bool,

    #[command(flatten)]
    pub energy: EnergyModelSettings,

    /// Energy band above the MFE in kcal/mol
    #[clap(short = 'e')]
    #[clap(long = "delta")]
    #[clap(value_name = "KCAL")]
    #[clap(help_heading = Some("Enumeration"))]
    #[clap(default_value = "1.0")]
    pub delta: f64,

    /// Stops after this many structures per record
    #[clap(long = "max-structures")]
    #[clap(value_name = "INT")]
    #[clap(help_heading = Some("Enumeration"))]
    pub max_structures: Option<usize>,

    /// Number of threads to use for enumerating records
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

pub fn check_subopt_settings(mut settings: SuboptSettings) -> anyhow::Result<SuboptSettings> {
    // hard code the version in
    settings.ribofold_version = FULL_VERSION.clone();
    info!("Ribofold version: {:?}", &settings.ribofold_version);
    info!("Sub-command: subopt");
    info!("Inputs:");

    check_required_filename(&settings.input_fasta, "Input FASTA")?;
    info!("\tInput FASTA: {:?}", &settings.input_fasta);

    info!("Outputs:");
    if let Some(output_filename) = settings.output_filename.as_ref() {
        info!("\tOutput file: {output_filename:?}");
    } else {
        info!("\tOutput file: None");
    }

    check_energy_settings(&settings.energy)?;

    info!("Enumeration:");
    ensure!(settings.delta.is_finite() && settings.delta >= 0.0, "--delta must be >=0");
    info!("\tEnergy band: {:.2} kcal/mol", settings.delta);
    if let Some(max_structures) = settings.max_structures {
        info!("\tMaximum structures: {max_structures}");
    }

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_subopt_settings() {
        let folder = tempfile::tempdir().unwrap();
        let input_fasta = folder.path().join("input.fa");
        std::fs::write(&input_fasta, ">seq\nGGGAAACCC\n").unwrap();

        let settings = SuboptSettings {
            input_fasta: input_fasta.clone(),
            delta: 1.0,
            ..Default::default()
        };
        assert!(check_subopt_settings(settings).is_ok());

        let settings = SuboptSettings {
            input_fasta,
            delta: -1.0,
            ..Default::default()
        };
        assert!(check_subopt_settings(settings).is_err());
    }
}
