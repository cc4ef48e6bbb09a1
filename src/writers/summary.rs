use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::fold_results::{AlifoldReport, EnsembleReport, FoldReport};

/// This is a wrapper for writing out one summary row per folded record
#[derive(Default)]
pub struct FoldSummaryWriter {
    /// Rows in the order they were added
    rows: Vec<FoldSummaryRow>,
    /// Number of records that failed to fold
    error_records: u64
}

/// Contains all the data written to each row of our summary file
#[derive(Clone, Debug, Serialize)]
struct FoldSummaryRow {
    /// Record name, or the joined row names for an alignment
    name: String,
    /// Number of nucleotides (or alignment columns)
    length: usize,
    /// MFE structure in dot-bracket notation
    mfe_structure: String,
    /// MFE in kcal/mol
    mfe_energy: f64,
    /// Ensemble free energy in kcal/mol
    ensemble_energy: Option<f64>,
    /// Probability of the MFE structure in the ensemble
    mfe_frequency: Option<f64>,
    /// Ensemble diversity
    diversity: Option<f64>,
    centroid_structure: Option<String>,
    centroid_energy: Option<f64>,
    centroid_distance: Option<f64>,
    mea_structure: Option<String>,
    mea_energy: Option<f64>,
    mea_accuracy: Option<f64>
}

impl FoldSummaryRow {
    /// Creates a new row from the MFE and optional ensemble results
    fn new(name: String, length: usize, mfe_structure: String, mfe_energy: f64, ensemble: Option<&EnsembleReport>) -> Self {
        Self {
            name, length, mfe_structure, mfe_energy,
            ensemble_energy: ensemble.map(|e| e.stats.ensemble_energy),
            mfe_frequency: ensemble.map(|e| e.stats.mfe_frequency),
            diversity: ensemble.map(|e| e.stats.diversity),
            centroid_structure: ensemble.map(|e| e.centroid.structure.to_string()),
            centroid_energy: ensemble.map(|e| e.centroid.energy),
            centroid_distance: ensemble.map(|e| e.centroid.distance),
            mea_structure: ensemble.map(|e| e.mea.structure.to_string()),
            mea_energy: ensemble.map(|e| e.mea.energy),
            mea_accuracy: ensemble.map(|e| e.mea.expected_accuracy)
        }
    }
}

impl FoldSummaryWriter {
    /// Creates a new writer to accumulate rows
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a single-sequence result
    /// # Arguments
    /// * `report` - the folding results for one record
    pub fn add_fold_report(&mut self, report: &FoldReport) {
        self.rows.push(FoldSummaryRow::new(
            report.name.clone(), report.sequence.len(),
            report.mfe.structure.to_string(), report.mfe.energy,
            report.ensemble.as_ref()
        ));
    }

    /// Adds a consensus folding result
    /// # Arguments
    /// * `report` - the folding results for an alignment
    pub fn add_alifold_report(&mut self, report: &AlifoldReport) {
        self.rows.push(FoldSummaryRow::new(
            report.names.join(","), report.consensus.len(),
            report.mfe.structure.to_string(), report.mfe.energy,
            report.ensemble.as_ref()
        ));
    }

    /// Tracks a record that could not be folded
    pub fn add_error(&mut self) {
        self.error_records += 1;
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&mut self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        for row in self.rows.iter() {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    // getters
    pub fn solved_records(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn error_records(&self) -> u64 {
        self.error_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold_solver::{solve_fold_record, FoldConfigBuilder};

    #[test]
    fn test_write_summary() {
        let mut writer = FoldSummaryWriter::new();
        let config = FoldConfigBuilder::default()
            .enable_partition(true)
            .build().unwrap();
        writer.add_fold_report(&solve_fold_record("first", b"GGGGAAACCCC", config).unwrap());
        let config = FoldConfigBuilder::default().build().unwrap();
        writer.add_fold_report(&solve_fold_record("second", b"AAAAAAAA", config).unwrap());
        writer.add_error();
        assert_eq!(writer.solved_records(), 2);
        assert_eq!(writer.error_records(), 1);

        let folder = tempfile::tempdir().unwrap();
        let filename = folder.path().join("summary.tsv");
        writer.write_summary(&filename).unwrap();

        let content = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name\tlength\tmfe_structure\tmfe_energy\tensemble_energy"));
        assert!(lines[1].starts_with("first\t11\t"));
        // no ensemble for the second record, so the trailing columns are empty
        assert!(lines[2].starts_with("second\t8\t........\t0.0\t\t"));
    }

    #[test]
    fn test_write_summary_csv() {
        let mut writer = FoldSummaryWriter::new();
        let config = FoldConfigBuilder::default().build().unwrap();
        writer.add_fold_report(&solve_fold_record("only", b"GGGGAAACCCC", config).unwrap());

        let folder = tempfile::tempdir().unwrap();
        let filename = folder.path().join("summary.csv");
        writer.write_summary(&filename).unwrap();
        let content = std::fs::read_to_string(&filename).unwrap();
        assert!(content.starts_with("name,length,mfe_structure"));
    }
}
