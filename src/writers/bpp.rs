use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// One pair probability row; positions are 1-based
#[derive(Serialize)]
struct PairProbabilityRow {
    i: usize,
    j: usize,
    probability: f64
}

/// Writes base-pair probabilities to a gzipped, tab-delimited file.
/// # Arguments
/// * `filename` - path to the output; expected to be .tsv.gz
/// * `pair_probabilities` - (i, j, p) with 0-based positions
/// # Errors
/// * if the file cannot be created or written
pub fn write_pair_probabilities(filename: &Path, pair_probabilities: &[(usize, usize, f64)]) -> anyhow::Result<()> {
    let gzip_writer = GzEncoder::new(
        File::create(filename)?,
        flate2::Compression::default()
    );
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(gzip_writer);

    for &(i, j, probability) in pair_probabilities.iter() {
        csv_writer.serialize(PairProbabilityRow {
            i: i + 1,
            j: j + 1,
            probability
        })?;
    }

    // the gzip footer is only written on finish
    let gzip_writer = csv_writer.into_inner()
        .map_err(|e| anyhow::anyhow!("Error while flushing {filename:?}: {e}"))?;
    gzip_writer.finish()?;
    Ok(())
}
