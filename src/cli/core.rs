use anyhow::{bail, ensure};
use clap::{Args, Parser, Subcommand};
use chrono::Datelike;
use lazy_static::lazy_static;
use log::info;
use serde::Serialize;
use std::path::Path;

use crate::cli::alifold::AlifoldSettings;
use crate::cli::eval::EvalSettings;
use crate::cli::fold::FoldSettings;
use crate::cli::subopt::SuboptSettings;
use crate::energy::loops::Dangles;
use crate::energy::parameters::MAXLOOP;

lazy_static! {
    /// Stores the full version string we plan to use, which is generated in build.rs
    /// # Examples
    /// * `0.3.1-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.1-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));

    /// Shared after help string containing the legalese.
    pub static ref AFTER_HELP: String = format!("Copyright (C) 2024-{}     The ribofold developers
This program comes with ABSOLUTELY NO WARRANTY; it is distributed
under the MIT license.", chrono::Utc::now().year());
}

#[derive(Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = &**AFTER_HELP)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

/// Ribofold, RNA secondary structure prediction from minimum free energy to ensemble statistics.
/// Select a subcommand to see more usage information:
#[derive(Subcommand)]
pub enum Commands {
    /// Folds each sequence of a FASTA file into its MFE structure, optionally with ensemble statistics
    Fold(Box<FoldSettings>),
    /// Enumerates all structures within an energy band above the MFE
    Subopt(Box<SuboptSettings>),
    /// Folds an alignment into a consensus structure
    Alifold(Box<AlifoldSettings>),
    /// Evaluates the free energy of a given structure loop by loop
    Eval(Box<EvalSettings>)
}

pub fn get_cli() -> Cli {
    Cli::parse()
}

/// Energy model options shared by every sub-command
#[derive(Args, Clone, Debug, Serialize)]
pub struct EnergyModelSettings {
    /// Folding temperature in Celsius
    #[clap(short = 'T')]
    #[clap(long = "temperature")]
    #[clap(value_name = "CELSIUS")]
    #[clap(help_heading = Some("Energy model"))]
    #[clap(default_value = "37.0")]
    pub temperature: f64,

    /// Dangling end model
    #[clap(short = 'd')]
    #[clap(long = "dangles")]
    #[clap(value_name = "MODEL")]
    #[clap(help_heading = Some("Energy model"))]
    #[clap(default_value = "double")]
    pub dangles: Dangles,

    /// Maximum number of unpaired bases in an interior loop
    #[clap(long = "max-loop")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Energy model"))]
    #[clap(default_value_t = MAXLOOP)]
    pub max_loop: usize,
}

impl Default for EnergyModelSettings {
    fn default() -> Self {
        Self {
            temperature: 37.0,
            dangles: Dangles::Double,
            max_loop: MAXLOOP
        }
    }
}

/// Checks the shared energy model options and dumps them to the logger
pub fn check_energy_settings(settings: &EnergyModelSettings) -> anyhow::Result<()> {
    info!("Energy model:");
    ensure!(settings.temperature.is_finite() && settings.temperature > -273.15, "--temperature must be above absolute zero");
    info!("\tTemperature: {} C", settings.temperature);
    info!("\tDangles: {}", settings.dangles);
    ensure!(settings.max_loop > 0, "--max-loop must be >0");
    info!("\tMaximum loop size: {}", settings.max_loop);
    Ok(())
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
pub fn check_required_filename(filename: &Path, label: &str) -> anyhow::Result<()> {
    if !filename.exists() {
        bail!("{} does not exist: \"{}\"", label, filename.display());
    }

    // file exists
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_help() {
        assert!(AFTER_HELP.starts_with("Copyright (C) 2024-"));
        assert!(AFTER_HELP.ends_with("under the MIT license."));
    }

    #[test]
    fn test_check_energy_settings() {
        let mut settings = EnergyModelSettings::default();
        assert!(check_energy_settings(&settings).is_ok());

        settings.temperature = -300.0;
        assert!(check_energy_settings(&settings).is_err());

        settings.temperature = 24.0;
        settings.max_loop = 0;
        assert!(check_energy_settings(&settings).is_err());
    }

    #[test]
    fn test_check_required_filename() {
        let folder = tempfile::tempdir().unwrap();
        assert!(check_required_filename(folder.path(), "Folder").is_ok());
        assert!(check_required_filename(&folder.path().join("missing.fa"), "Input FASTA").is_err());
    }

    #[test]
    fn test_parse_fold() {
        let cli = Cli::try_parse_from([
            "ribofold", "fold", "-i", "input.fa", "--partition", "-T", "25", "--dangles", "none"
        ]).unwrap();
        match cli.command {
            Commands::Fold(settings) => {
                assert_eq!(settings.input_fasta.to_str(), Some("input.fa"));
                assert!(settings.enable_partition);
                assert_eq!(settings.energy.temperature, 25.0);
                assert_eq!(settings.energy.dangles, Dangles::None);
                assert_eq!(settings.energy.max_loop, MAXLOOP);
            },
            _ => panic!("expected the fold command")
        };
    }

    #[test]
    fn test_parse_subopt() {
        let cli = Cli::try_parse_from([
            "ribofold", "subopt", "-i", "input.fa", "-e", "2.5", "--max-structures", "10"
        ]).unwrap();
        match cli.command {
            Commands::Subopt(settings) => {
                assert_eq!(settings.delta, 2.5);
                assert_eq!(settings.max_structures, Some(10));
            },
            _ => panic!("expected the subopt command")
        };
    }

    #[test]
    fn test_parse_missing_input() {
        assert!(Cli::try_parse_from(["ribofold", "fold"]).is_err());
        assert!(Cli::try_parse_from(["ribofold", "alifold", "-T", "30"]).is_err());
    }
}
