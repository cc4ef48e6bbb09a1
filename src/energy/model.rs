use crate::data_types::alignment::MultipleAlignment;
use crate::data_types::nucleotides::{Nucleotide, PairType};
use crate::data_types::structure::MIN_HAIRPIN_SIZE;
use crate::energy::loops::{exterior_stem_energy, hairpin_energy, interior_energy, multi_closing_energy, multi_stem_energy, Dangles};
use crate::energy::parameters::EnergyParameters;

/// Lowest covariance score an alignment column pair may have and still be allowed to pair (dcal/mol)
pub const MIN_PSCORE: i32 = -200;

/// The loop-level energy interface that every folding algorithm is written against.
/// Energies are integers; `to_kcal` converts them into kcal/mol using the model's divisor.
pub trait LoopEnergyModel {
    /// Number of positions (nucleotides or alignment columns)
    fn len(&self) -> usize;

    /// True if positions i < j may form a pair
    fn can_pair(&self, i: usize, j: usize) -> bool;

    /// Hairpin closed by (i, j)
    fn hairpin(&self, i: usize, j: usize) -> i32;

    /// Stack, bulge, or interior loop closed by (i, j) with inner pair (k, l)
    fn interior(&self, i: usize, j: usize, k: usize, l: usize) -> i32;

    /// Multiloop closed by (i, j), excluding its branches and unpaired bases
    fn multi_closing(&self, i: usize, j: usize) -> i32;

    /// Branch (i, j) inside a multiloop
    fn multi_stem(&self, i: usize, j: usize) -> i32;

    /// Each unpaired base inside a multiloop
    fn multi_unpaired(&self) -> i32;

    /// Branch (i, j) in the exterior loop
    fn exterior_stem(&self, i: usize, j: usize) -> i32;

    /// Maximum number of unpaired bases in an interior loop
    fn max_loop(&self) -> usize;

    /// Energies are reported as `value / (100 * divisor)` kcal/mol
    fn divisor(&self) -> i32;

    /// RT in kcal/mol
    fn kt(&self) -> f64;

    /// Two letter label of the pair (i, j), used in logs
    fn pair_label(&self, i: usize, j: usize) -> String;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts a model energy into kcal/mol
    fn to_kcal(&self, energy: i32) -> f64 {
        energy as f64 / (100.0 * self.divisor() as f64)
    }
}

/// Energy model for a single sequence
#[derive(Clone, Debug)]
pub struct SequenceModel {
    sequence: Vec<Nucleotide>,
    params: EnergyParameters,
    dangles: Dangles,
    max_loop: usize
}

impl SequenceModel {
    /// Constructor
    /// # Arguments
    /// * `sequence` - the encoded sequence
    /// * `params` - temperature adjusted parameters
    /// * `dangles` - the dangle model
    /// * `max_loop` - maximum interior loop size considered by the folding algorithms
    pub fn new(sequence: Vec<Nucleotide>, params: EnergyParameters, dangles: Dangles, max_loop: usize) -> Self {
        Self {
            sequence, params, dangles, max_loop
        }
    }

    pub fn sequence(&self) -> &[Nucleotide] {
        &self.sequence
    }
}

impl LoopEnergyModel for SequenceModel {
    fn len(&self) -> usize {
        self.sequence.len()
    }

    fn can_pair(&self, i: usize, j: usize) -> bool {
        j > i + MIN_HAIRPIN_SIZE && PairType::from_bases(self.sequence[i], self.sequence[j]).is_some()
    }

    fn hairpin(&self, i: usize, j: usize) -> i32 {
        hairpin_energy(&self.params, &self.sequence, i, j)
    }

    fn interior(&self, i: usize, j: usize, k: usize, l: usize) -> i32 {
        interior_energy(&self.params, &self.sequence, i, j, k, l)
    }

    fn multi_closing(&self, i: usize, j: usize) -> i32 {
        multi_closing_energy(&self.params, self.dangles, &self.sequence, i, j)
    }

    fn multi_stem(&self, i: usize, j: usize) -> i32 {
        multi_stem_energy(&self.params, self.dangles, &self.sequence, i, j)
    }

    fn multi_unpaired(&self) -> i32 {
        self.params.ml_base
    }

    fn exterior_stem(&self, i: usize, j: usize) -> i32 {
        exterior_stem_energy(&self.params, self.dangles, &self.sequence, i, j)
    }

    fn max_loop(&self) -> usize {
        self.max_loop
    }

    fn divisor(&self) -> i32 {
        1
    }

    fn kt(&self) -> f64 {
        self.params.kt()
    }

    fn pair_label(&self, i: usize, j: usize) -> String {
        format!("{}{}", self.sequence[i].to_char(), self.sequence[j].to_char())
    }
}

/// Energy model for consensus folding of an alignment.
/// Every loop energy is the sum over all rows, and each closed pair receives a covariance bonus.
#[derive(Clone, Debug)]
pub struct AlignmentModel {
    rows: Vec<Vec<Nucleotide>>,
    consensus: Vec<char>,
    params: EnergyParameters,
    dangles: Dangles,
    max_loop: usize,
    /// Covariance score per column pair (dcal/mol), `None` if the columns may not pair; flattened n x n
    pscores: Vec<Option<i32>>
}

impl AlignmentModel {
    /// Constructor, pre-computes the covariance scores of every column pair
    /// # Arguments
    /// * `alignment` - the input alignment
    /// * `params` - temperature adjusted parameters
    /// * `dangles` - the dangle model
    /// * `max_loop` - maximum interior loop size considered by the folding algorithms
    /// * `cv_factor` - weight of the covariance term
    /// * `nc_factor` - weight of the non-compatible penalty
    pub fn new(alignment: &MultipleAlignment, params: EnergyParameters, dangles: Dangles, max_loop: usize, cv_factor: f64, nc_factor: f64) -> Self {
        let n = alignment.num_columns();
        let mut pscores = vec![None; n * n];
        for i in 0..n {
            for j in (i+MIN_HAIRPIN_SIZE+1)..n {
                pscores[i*n + j] = column_pair_score(alignment, i, j, cv_factor, nc_factor);
            }
        }

        Self {
            rows: alignment.rows().to_vec(),
            consensus: alignment.consensus_sequence().chars().collect(),
            params, dangles, max_loop, pscores
        }
    }

    /// Covariance score of columns (i, j), if they may pair
    pub fn covariance(&self, i: usize, j: usize) -> Option<i32> {
        self.pscores[i*self.len() + j]
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Total covariance bonus for a set of pairs in model units (already scaled by the number of rows)
    fn pair_bonus(&self, i: usize, j: usize) -> i32 {
        self.covariance(i, j).unwrap_or(0) * self.rows.len() as i32
    }
}

/// Computes the covariance score for alignment columns i and j.
/// Rows that cannot pair are penalized, gap-gap rows only count a quarter.
/// Returns `None` if the pair is forbidden: no row pairs canonically, or half or more of the rows
/// are non-compatible with a gap-gap row counting as half a non-compatible row.
fn column_pair_score(alignment: &MultipleAlignment, i: usize, j: usize, cv_factor: f64, nc_factor: f64) -> Option<i32> {
    let num_rows = alignment.num_rows();
    let mut pair_rows: Vec<(Nucleotide, Nucleotide)> = vec![];
    let mut non_compatible = 0;
    let mut gap_gap = 0;
    for (r, row) in alignment.rows().iter().enumerate() {
        if PairType::from_bases(row[i], row[j]).is_some() {
            pair_rows.push((row[i], row[j]));
        } else if alignment.is_gap(r, i) && alignment.is_gap(r, j) {
            gap_gap += 1;
        } else {
            non_compatible += 1;
        }
    }

    if pair_rows.is_empty() || 2 * non_compatible + gap_gap >= num_rows {
        return None;
    }

    // hamming distance summed over all pairs of compatible rows
    let mut covariance = 0;
    for (s, &(a1, b1)) in pair_rows.iter().enumerate() {
        for &(a2, b2) in pair_rows[(s+1)..].iter() {
            covariance += usize::from(a1 != a2) + usize::from(b1 != b2);
        }
    }

    let pscore = cv_factor * (100.0 * covariance as f64 / num_rows as f64) -
        nc_factor * 100.0 * (non_compatible as f64 + 0.25 * gap_gap as f64);
    let pscore = pscore.round() as i32;
    if pscore < MIN_PSCORE {
        None
    } else {
        Some(pscore)
    }
}

impl LoopEnergyModel for AlignmentModel {
    fn len(&self) -> usize {
        self.consensus.len()
    }

    fn can_pair(&self, i: usize, j: usize) -> bool {
        j > i + MIN_HAIRPIN_SIZE && self.covariance(i, j).is_some()
    }

    fn hairpin(&self, i: usize, j: usize) -> i32 {
        let total: i32 = self.rows.iter()
            .map(|row| hairpin_energy(&self.params, row, i, j))
            .sum();
        total - self.pair_bonus(i, j)
    }

    fn interior(&self, i: usize, j: usize, k: usize, l: usize) -> i32 {
        let total: i32 = self.rows.iter()
            .map(|row| interior_energy(&self.params, row, i, j, k, l))
            .sum();
        total - self.pair_bonus(i, j)
    }

    fn multi_closing(&self, i: usize, j: usize) -> i32 {
        let total: i32 = self.rows.iter()
            .map(|row| multi_closing_energy(&self.params, self.dangles, row, i, j))
            .sum();
        total - self.pair_bonus(i, j)
    }

    fn multi_stem(&self, i: usize, j: usize) -> i32 {
        self.rows.iter()
            .map(|row| multi_stem_energy(&self.params, self.dangles, row, i, j))
            .sum()
    }

    fn multi_unpaired(&self) -> i32 {
        self.params.ml_base * self.rows.len() as i32
    }

    fn exterior_stem(&self, i: usize, j: usize) -> i32 {
        self.rows.iter()
            .map(|row| exterior_stem_energy(&self.params, self.dangles, row, i, j))
            .sum()
    }

    fn max_loop(&self) -> usize {
        self.max_loop
    }

    fn divisor(&self) -> i32 {
        self.rows.len() as i32
    }

    fn kt(&self) -> f64 {
        self.params.kt()
    }

    fn pair_label(&self, i: usize, j: usize) -> String {
        format!("{}{}", self.consensus[i], self.consensus[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::parameters::MAXLOOP;

    #[test]
    fn test_sequence_model() {
        let sequence = encode_sequence(b"GGGAAACCC").unwrap();
        let model = SequenceModel::new(sequence, EnergyParameters::default(), Dangles::Double, MAXLOOP);
        assert_eq!(model.len(), 9);
        assert!(model.can_pair(0, 8));
        assert!(model.can_pair(2, 6));
        // too short
        assert!(!model.can_pair(3, 6));
        // not complementary
        assert!(!model.can_pair(0, 5));
        assert_eq!(model.hairpin(2, 6), 540);
        assert_eq!(model.pair_label(0, 8), "GC");
        assert_eq!(model.divisor(), 1);
        assert_eq!(model.to_kcal(-120), -1.2);
    }

    #[test]
    fn test_single_row_alignment_matches_sequence() {
        let alignment = MultipleAlignment::new(vec![
            ("only".to_string(), b"GGGAAACCC".to_vec())
        ]).unwrap();
        let ali_model = AlignmentModel::new(&alignment, EnergyParameters::default(), Dangles::Double, MAXLOOP, 1.0, 1.0);
        let seq_model = SequenceModel::new(encode_sequence(b"GGGAAACCC").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);

        // a single row has no covariance
        assert_eq!(ali_model.covariance(0, 8), Some(0));
        assert_eq!(ali_model.covariance(0, 5), None);
        for (i, j) in [(0, 8), (1, 7), (2, 6)] {
            assert_eq!(ali_model.can_pair(i, j), seq_model.can_pair(i, j));
            assert_eq!(ali_model.hairpin(i, j), seq_model.hairpin(i, j));
            assert_eq!(ali_model.exterior_stem(i, j), seq_model.exterior_stem(i, j));
        }
        assert_eq!(ali_model.interior(0, 8, 1, 7), seq_model.interior(0, 8, 1, 7));
    }

    #[test]
    fn test_covariance_scores() {
        // column 0/8 has GC, CG, and AU pairs -> compensatory changes
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGAAACCC".to_vec()),
            ("s2".to_string(), b"CGGAAACCG".to_vec()),
            ("s3".to_string(), b"AGGAAACCU".to_vec()),
        ]).unwrap();
        let model = AlignmentModel::new(&alignment, EnergyParameters::default(), Dangles::Double, MAXLOOP, 1.0, 1.0);
        // distances: GC vs CG = 2, GC vs AU = 2, CG vs AU = 2 -> 6 total; 100 * 6 / 3 = 200
        assert_eq!(model.covariance(0, 8), Some(200));
        // conserved column pair has no covariance
        assert_eq!(model.covariance(1, 7), Some(0));
        // the pair bonus scales with the number of rows
        let seq_total: i32 = alignment.rows().iter()
            .map(|row| SequenceModel::new(row.clone(), EnergyParameters::default(), Dangles::Double, MAXLOOP).interior(0, 8, 1, 7))
            .sum();
        assert_eq!(model.interior(0, 8, 1, 7), seq_total - 600);

        // one incompatible row out of two is too many
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGAAACCC".to_vec()),
            ("s2".to_string(), b"AGGAAACCC".to_vec()),
        ]).unwrap();
        let model = AlignmentModel::new(&alignment, EnergyParameters::default(), Dangles::Double, MAXLOOP, 1.0, 1.0);
        assert_eq!(model.covariance(0, 8), None);
        assert_eq!(model.covariance(1, 7), Some(0));
    }

    #[test]
    fn test_gap_gap_rows_count_half() {
        // column 0/8: two GC rows, one AC row, one gap-gap row -> 2 * 1 + 1 < 4
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGAAACCC".to_vec()),
            ("s2".to_string(), b"GGGAAACCC".to_vec()),
            ("s3".to_string(), b"AGGAAACCC".to_vec()),
            ("s4".to_string(), b"-GGAAACC-".to_vec()),
        ]).unwrap();
        let model = AlignmentModel::new(&alignment, EnergyParameters::default(), Dangles::Double, MAXLOOP, 1.0, 1.0);
        // no covariance, penalty of 1 + 0.25 rows
        assert_eq!(model.covariance(0, 8), Some(-125));

        // dropping one GC row leaves 2 * 1 + 1 >= 3
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGAAACCC".to_vec()),
            ("s3".to_string(), b"AGGAAACCC".to_vec()),
            ("s4".to_string(), b"-GGAAACC-".to_vec()),
        ]).unwrap();
        let model = AlignmentModel::new(&alignment, EnergyParameters::default(), Dangles::Double, MAXLOOP, 1.0, 1.0);
        assert_eq!(model.covariance(0, 8), None);
        assert!(!model.can_pair(0, 8));
        assert_eq!(model.covariance(1, 7), Some(0));
    }
}
