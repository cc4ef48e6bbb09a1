use anyhow::{ensure, Context};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data_types::energy_log::EnergyLog;

/// Saves the loop-by-loop energy breakdown as plain text
/// # Arguments
/// * `filename` - output path, usually `<name>.energy.log`
/// * `log` - the breakdown to save
/// # Errors
/// * if the file cannot be created or written
pub fn write_energy_log(filename: &Path, log: &EnergyLog) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(
        File::create(filename)
            .with_context(|| format!("Error while creating {filename:?}"))?
    );
    write!(writer, "{log}")
        .with_context(|| format!("Error while writing {filename:?}"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {filename:?}"))?;
    Ok(())
}

/// Loads an energy breakdown that was saved with `write_energy_log`
/// # Arguments
/// * `filename` - the log to parse
/// # Errors
/// * if the file cannot be read
/// * if the content is not a valid energy log
/// * if the loop energies do not add up to the total
pub fn read_energy_log(filename: &Path) -> anyhow::Result<EnergyLog> {
    let content = std::fs::read_to_string(filename)
        .with_context(|| format!("Error while reading {filename:?}"))?;
    let log = content.parse::<EnergyLog>()
        .with_context(|| format!("Error while parsing energy log {filename:?}"))?;

    // each printed value is rounded to 0.01
    let tolerance = 0.005 * (log.loops.len() + 1) as f64;
    let loop_sum = log.loop_sum();
    ensure!(
        (loop_sum - log.total).abs() <= tolerance,
        "Loop energies in {filename:?} sum to {loop_sum:.2}, but the total is {:.2}", log.total
    );
    Ok(log)
}
