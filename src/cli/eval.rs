use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_energy_settings, check_required_filename, EnergyModelSettings, AFTER_HELP, FULL_VERSION};
use crate::data_types::structure::Structure;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct EvalSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    ribofold_version: String,

    /// Input sequences (FASTA); each record is evaluated with --structure
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(requires = "structure")]
    pub input_fasta: Option<PathBuf>,

    /// Structure to evaluate, in dot-bracket notation
    #[clap(short = 's')]
    #[clap(long = "structure")]
    #[clap(value_name = "DOT-BRACKET")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(requires = "input_fasta")]
    pub structure: Option<String>,

    /// Energy log to re-evaluate, replaces --input and --structure
    #[clap(short = 'l')]
    #[clap(long = "energy-log")]
    #[clap(value_name = "LOG")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(conflicts_with_all = ["input_fasta", "structure"])]
    pub energy_log: Option<PathBuf>,

    /// Optional output directory for the energy logs
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: Option<PathBuf>,

    #[command(flatten)]
    pub energy: EnergyModelSettings,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_eval_settings(mut settings: EvalSettings) -> anyhow::Result<EvalSettings> {
    // hard code the version in
    settings.ribofold_version = FULL_VERSION.clone();
    info!("Ribofold version: {:?}", &settings.ribofold_version);
    info!("Sub-command: eval");
    info!("Inputs:");

    match (settings.input_fasta.as_ref(), settings.structure.as_ref(), settings.energy_log.as_ref()) {
        (Some(input_fasta), Some(structure), None) => {
            check_required_filename(input_fasta, "Input FASTA")?;
            info!("\tInput FASTA: {input_fasta:?}");
            // catch malformed brackets before loading anything
            Structure::from_dot_bracket(structure)?;
            info!("\tStructure: {structure}");
        },
        (None, None, Some(energy_log)) => {
            check_required_filename(energy_log, "Energy log")?;
            info!("\tEnergy log: {energy_log:?}");
        },
        _ => bail!("Either --input with --structure, or --energy-log is required")
    };

    info!("Outputs:");
    if let Some(output_folder) = settings.output_folder.as_ref() {
        info!("\tOutput folder: {output_folder:?}");
    } else {
        info!("\tOutput folder: None");
    }

    check_energy_settings(&settings.energy)?;
    Ok(settings)
}
