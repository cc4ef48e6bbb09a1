use itertools::Itertools;

use crate::data_types::nucleotides::{encode_sequence, Nucleotide, SequenceError, NUM_NUCLEOTIDES};

#[derive(thiserror::Error, Debug)]
pub enum AlignmentError {
    #[error("alignment has no rows")]
    Empty,
    #[error("row {name:?} has length {length}, expected {expected}")]
    RowLength { name: String, length: usize, expected: usize },
    #[error("row {name:?}: {error}")]
    Sequence { name: String, error: SequenceError },
}

/// A set of aligned sequences; every row has the same number of columns and gaps are stored as `Nucleotide::N`
#[derive(Clone, Debug)]
pub struct MultipleAlignment {
    /// Row labels, in input order
    names: Vec<String>,
    /// Encoded rows
    rows: Vec<Vec<Nucleotide>>,
    /// True where the raw input had a gap character; we need this to tell gaps from real `N`s
    gaps: Vec<Vec<bool>>,
}

impl MultipleAlignment {
    /// Builds an alignment from named raw rows.
    /// # Arguments
    /// * `records` - (name, aligned sequence) pairs
    /// # Errors
    /// * if there are no rows
    /// * if any row has an invalid character
    /// * if the rows do not all have the same length
    pub fn new(records: Vec<(String, Vec<u8>)>) -> Result<Self, AlignmentError> {
        if records.is_empty() {
            return Err(AlignmentError::Empty);
        }

        let expected = records[0].1.len();
        let mut names = Vec::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());
        let mut gaps = Vec::with_capacity(records.len());
        for (name, raw) in records.into_iter() {
            if raw.len() != expected {
                return Err(AlignmentError::RowLength { name, length: raw.len(), expected });
            }
            let row = match encode_sequence(&raw) {
                Ok(r) => r,
                Err(error) => return Err(AlignmentError::Sequence { name, error })
            };
            gaps.push(raw.iter().map(|&b| matches!(b, b'-' | b'.' | b'_' | b'~')).collect());
            rows.push(row);
            names.push(name);
        }

        Ok(Self {
            names, rows, gaps
        })
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.rows[0].len()
    }

    /// Number of rows (sequences)
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if row `row` has a gap in `column`
    pub fn is_gap(&self, row: usize, column: usize) -> bool {
        self.gaps[row][column]
    }

    /// Most frequent non-gap nucleotide per column; ties go to the earlier nucleotide (A < C < G < U).
    /// Columns without any nucleotide are reported as `-`.
    pub fn consensus_sequence(&self) -> String {
        (0..self.num_columns())
            .map(|column| {
                let mut counts = [0_usize; NUM_NUCLEOTIDES];
                for row in self.rows.iter() {
                    counts[row[column].index()] += 1;
                }

                // ignore N/gaps for the vote
                let best = [Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::U].into_iter()
                    .filter(|n| counts[n.index()] > 0)
                    .max_by_key(|n| (counts[n.index()], std::cmp::Reverse(n.index())));
                best.map(|n| n.to_char()).unwrap_or('-')
            })
            .collect()
    }

    /// Returns row `row` with gaps removed, useful for reporting
    pub fn ungapped_row(&self, row: usize) -> String {
        self.rows[row].iter().zip(self.gaps[row].iter())
            .filter(|&(_n, &is_gap)| !is_gap)
            .map(|(n, _g)| n.to_char())
            .join("")
    }

    // getters
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<Nucleotide>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_alignment() -> MultipleAlignment {
        MultipleAlignment::new(vec![
            ("seq1".to_string(), b"GGGA-AACCC".to_vec()),
            ("seq2".to_string(), b"GGCAUAAGCC".to_vec()),
            ("seq3".to_string(), b"GAGAUA-CUC".to_vec()),
        ]).unwrap()
    }

    #[test]
    fn test_alignment_basics() {
        let alignment = mock_alignment();
        assert_eq!(alignment.num_rows(), 3);
        assert_eq!(alignment.num_columns(), 10);
        assert_eq!(alignment.names(), &["seq1".to_string(), "seq2".to_string(), "seq3".to_string()]);
        assert!(alignment.is_gap(0, 4));
        assert!(!alignment.is_gap(1, 4));
        assert_eq!(alignment.ungapped_row(0), "GGGAAACCC");
        assert_eq!(alignment.ungapped_row(2), "GAGAUACUC");
    }

    #[test]
    fn test_consensus() {
        let alignment = mock_alignment();
        // column 2 is G/C/G -> G; column 7 is C/G/C -> C; column 8 is C/C/U -> C
        assert_eq!(alignment.consensus_sequence(), "GGGAUAACCC");

        let gapped = MultipleAlignment::new(vec![
            ("a".to_string(), b"A-C".to_vec()),
            ("b".to_string(), b"U-G".to_vec()),
        ]).unwrap();
        // column 0 is a tie, A wins
        assert_eq!(gapped.consensus_sequence(), "A-C");
    }

    #[test]
    fn test_alignment_errors() {
        assert!(matches!(MultipleAlignment::new(vec![]), Err(AlignmentError::Empty)));
        let result = MultipleAlignment::new(vec![
            ("a".to_string(), b"ACGU".to_vec()),
            ("b".to_string(), b"ACG".to_vec()),
        ]);
        assert!(matches!(result, Err(AlignmentError::RowLength { length: 3, expected: 4, .. })));
        let result = MultipleAlignment::new(vec![
            ("a".to_string(), b"ACGZ".to_vec()),
        ]);
        assert!(matches!(result, Err(AlignmentError::Sequence { .. })));
    }
}
