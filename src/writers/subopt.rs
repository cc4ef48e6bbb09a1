use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::fold_results::SuboptReport;

/// This is a wrapper for writing suboptimal structures, one per row
pub struct SuboptWriter {
    /// Handle on the writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of our subopt file
#[derive(Serialize)]
struct SuboptRow<'a> {
    /// Record name
    name: &'a str,
    /// 1-based rank within the record, by energy
    rank: usize,
    /// Structure in dot-bracket notation
    structure: String,
    /// Free energy in kcal/mol
    energy: f64,
    /// Distance above the MFE in kcal/mol
    delta_energy: f64
}

impl SuboptWriter {
    /// Creates a new writer; the output is tab-delimited unless the filename ends with .csv
    /// # Arguments
    /// * `filename` - path to the filename that will get opened
    pub fn new(filename: &Path) -> anyhow::Result<Self> {
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(Self {
            csv_writer
        })
    }

    /// Writes every structure of a record
    /// # Arguments
    /// * `report` - suboptimal structures of one record, sorted by energy
    pub fn write_report(&mut self, report: &SuboptReport) -> csv::Result<()> {
        let mfe_energy = report.structures.first().map(|s| s.energy).unwrap_or_default();
        for (index, scored) in report.structures.iter().enumerate() {
            let row = SuboptRow {
                name: &report.name,
                rank: index + 1,
                structure: scored.structure.to_string(),
                energy: scored.energy,
                delta_energy: scored.energy - mfe_energy
            };
            self.csv_writer.serialize(&row)?;
        }
        Ok(())
    }

    /// Flushes everything to disk
    pub fn finish(mut self) -> csv::Result<()> {
        self.csv_writer.flush()?;
        Ok(())
    }
}
