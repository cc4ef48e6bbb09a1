use anyhow::{bail, ensure, Context};
use bio::io::fasta;
use indexmap::IndexMap;
use log::debug;
use std::path::Path;

use crate::data_types::alignment::MultipleAlignment;
use crate::util::file_io::open_reader;

/// Loads all records of a FASTA file into memory, keyed by name in file order.
/// The name is the first whitespace-delimited token of the header.
/// # Arguments
/// * `filename` - FASTA file, optionally gzipped
/// # Errors
/// * if the file cannot be opened or parsed
/// * if a record name is repeated
/// * if the file has no records
pub fn load_sequence_records(filename: &Path) -> anyhow::Result<IndexMap<String, Vec<u8>>> {
    let reader = fasta::Reader::from_bufread(open_reader(filename)?);

    let mut records = IndexMap::new();
    for result in reader.records() {
        let record = result
            .with_context(|| format!("Error while parsing FASTA {filename:?}"))?;
        let name = record.id().to_string();
        ensure!(!name.is_empty(), "Empty FASTA header in {filename:?}");
        if records.contains_key(&name) {
            bail!("Duplicate record name {name:?} in {filename:?}");
        }
        debug!("Loaded {name:?} ({} nt)", record.seq().len());
        records.insert(name, record.seq().to_vec());
    }
    ensure!(!records.is_empty(), "No FASTA records found in {filename:?}");
    Ok(records)
}

/// Loads an aligned FASTA file; every row must have the same length.
/// # Arguments
/// * `filename` - aligned FASTA file, gaps as `-`, `.`, `_`, or `~`
/// # Errors
/// * if the file cannot be loaded
/// * if the rows do not form a valid alignment
pub fn load_alignment(filename: &Path) -> anyhow::Result<MultipleAlignment> {
    let records = load_sequence_records(filename)?;
    let alignment = MultipleAlignment::new(records.into_iter().collect())
        .with_context(|| format!("Error while building alignment from {filename:?}"))?;
    for (row, name) in alignment.names().iter().enumerate() {
        debug!("Row {name:?}: {} nt without gaps", alignment.ungapped_row(row).len());
    }
    Ok(alignment)
}
