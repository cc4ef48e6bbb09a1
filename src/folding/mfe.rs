use anyhow::bail;
use log::trace;

use crate::data_types::structure::{Structure, MIN_HAIRPIN_SIZE};
use crate::energy::model::LoopEnergyModel;
use crate::energy::parameters::INF;
use crate::folding::matrix::PairMatrix;

/// Smallest allowed value of j - i for a pair (i, j)
pub const MIN_PAIR_SPAN: usize = MIN_HAIRPIN_SIZE + 1;

/// A sub-problem of the folding recursion.
/// Every structure decomposes into these in exactly one way, which is what lets us enumerate without duplicates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    /// The exterior loop over the prefix of the given length
    Exterior(usize),
    /// Positions i and j pair with each other
    Pair(usize, usize),
    /// Part of a multiloop from i to j with at least one branch
    Multi(usize, usize),
    /// Part of a multiloop from i to j with exactly one branch, which starts at i
    MultiOne(usize, usize)
}

/// One way of splitting a segment into a loop term and smaller segments
#[derive(Clone, Copy, Debug)]
pub struct Alternative {
    /// Energy of the loop (or loop part) that this choice fixes
    pub energy: i32,
    /// `energy` plus the optimum of every remaining segment
    pub bound: i32,
    /// The remaining segments
    pub segments: [Option<Segment>; 2]
}

/// The MFE dynamic programming arrays
#[derive(Clone, Debug)]
pub struct MfeArrays {
    /// C[i][j]: best energy of the region i..=j given that i and j pair
    c: PairMatrix<i32>,
    /// M[i][j]: best energy of the multiloop part i..=j containing at least one branch
    m: PairMatrix<i32>,
    /// M1[i][j]: best energy of the multiloop part i..=j with a single branch starting at i
    m1: PairMatrix<i32>,
    /// F5[k]: best energy of the prefix of length k
    f5: Vec<i32>
}

impl MfeArrays {
    /// Fills all arrays for the given model.
    /// # Arguments
    /// * `model` - the energy model, single sequence or alignment
    pub fn fill(model: &impl LoopEnergyModel) -> Self {
        let n = model.len();
        let max_loop = model.max_loop();
        let ml_base = model.multi_unpaired();
        let mut c = PairMatrix::new(n, INF);
        let mut m = PairMatrix::new(n, INF);
        let mut m1 = PairMatrix::new(n, INF);

        for span in MIN_PAIR_SPAN..n {
            for i in 0..(n - span) {
                let j = i + span;

                if model.can_pair(i, j) {
                    let mut best = model.hairpin(i, j);

                    // stacks, bulges, and interior loops
                    for k in (i+1)..=(i+1+max_loop).min(j.saturating_sub(MIN_PAIR_SPAN + 1)) {
                        let n1 = k - i - 1;
                        let min_l = (k + MIN_PAIR_SPAN).max((j - 1).saturating_sub(max_loop - n1));
                        for l in min_l..j {
                            let inner = c.get(k, l);
                            if inner < INF {
                                best = best.min(model.interior(i, j, k, l) + inner);
                            }
                        }
                    }

                    // multiloops, at least one branch on the left and exactly one on the right
                    let mut best_multi = INF;
                    for u in (i+1)..(j-1) {
                        let left = m.get(i+1, u);
                        let right = m1.get(u+1, j-1);
                        if left < INF && right < INF {
                            best_multi = best_multi.min(left + right);
                        }
                    }
                    if best_multi < INF {
                        best = best.min(model.multi_closing(i, j) + best_multi);
                    }
                    c.set(i, j, best);
                }

                let mut best_m1 = INF;
                let closed = c.get(i, j);
                if closed < INF {
                    best_m1 = closed + model.multi_stem(i, j);
                }
                let shorter = m1.get(i, j-1);
                if shorter < INF {
                    best_m1 = best_m1.min(shorter + ml_base);
                }
                m1.set(i, j, best_m1);

                let mut best_m = INF;
                for u in i..=(j - MIN_PAIR_SPAN) {
                    let branch = m1.get(u, j);
                    if branch >= INF {
                        continue;
                    }
                    best_m = best_m.min((u - i) as i32 * ml_base + branch);
                    if u > i {
                        let left = m.get(i, u-1);
                        if left < INF {
                            best_m = best_m.min(left + branch);
                        }
                    }
                }
                m.set(i, j, best_m);
            }
        }

        let mut f5 = vec![0; n + 1];
        for j in 0..n {
            let mut best = f5[j];
            if j >= MIN_PAIR_SPAN {
                for k in 0..=(j - MIN_PAIR_SPAN) {
                    let closed = c.get(k, j);
                    if closed < INF {
                        best = best.min(f5[k] + closed + model.exterior_stem(k, j));
                    }
                }
            }
            f5[j+1] = best;
        }
        trace!("MFE arrays filled for {n} positions, mfe = {}", f5[n]);

        Self {
            c, m, m1, f5
        }
    }

    /// The minimum free energy in model units
    pub fn mfe(&self) -> i32 {
        self.f5[self.f5.len() - 1]
    }

    /// Optimal energy of a segment
    pub fn optimum(&self, segment: Segment) -> i32 {
        match segment {
            Segment::Exterior(len) => self.f5[len],
            Segment::Pair(i, j) => self.c.get(i, j),
            Segment::Multi(i, j) => self.m.get(i, j),
            Segment::MultiOne(i, j) => self.m1.get(i, j)
        }
    }

    /// Lists every feasible way to decompose a segment, in the same order the fill explores them.
    /// # Arguments
    /// * `model` - the model used to fill these arrays
    /// * `segment` - the segment to split
    pub fn decompose(&self, model: &impl LoopEnergyModel, segment: Segment) -> Vec<Alternative> {
        let mut alternatives = vec![];
        let mut push = |energy: i32, segments: [Option<Segment>; 2]| {
            let mut bound = energy;
            for s in segments.iter().flatten() {
                let opt = self.optimum(*s);
                if opt >= INF {
                    return;
                }
                bound += opt;
            }
            alternatives.push(Alternative { energy, bound, segments });
        };

        match segment {
            Segment::Exterior(0) => push(0, [None, None]),
            Segment::Exterior(len) => {
                let j = len - 1;
                push(0, [exterior_segment(j), None]);
                if j >= MIN_PAIR_SPAN {
                    for k in 0..=(j - MIN_PAIR_SPAN) {
                        if self.c.get(k, j) < INF {
                            push(model.exterior_stem(k, j), [exterior_segment(k), Some(Segment::Pair(k, j))]);
                        }
                    }
                }
            },
            Segment::Pair(i, j) => {
                let max_loop = model.max_loop();
                push(model.hairpin(i, j), [None, None]);
                for k in (i+1)..=(i+1+max_loop).min(j.saturating_sub(MIN_PAIR_SPAN + 1)) {
                    let n1 = k - i - 1;
                    let min_l = (k + MIN_PAIR_SPAN).max((j - 1).saturating_sub(max_loop - n1));
                    for l in min_l..j {
                        if self.c.get(k, l) < INF {
                            push(model.interior(i, j, k, l), [Some(Segment::Pair(k, l)), None]);
                        }
                    }
                }
                let closing = model.multi_closing(i, j);
                for u in (i+1)..(j-1) {
                    push(closing, [Some(Segment::Multi(i+1, u)), Some(Segment::MultiOne(u+1, j-1))]);
                }
            },
            Segment::MultiOne(i, j) => {
                if self.c.get(i, j) < INF {
                    push(model.multi_stem(i, j), [Some(Segment::Pair(i, j)), None]);
                }
                if j > i {
                    push(model.multi_unpaired(), [Some(Segment::MultiOne(i, j-1)), None]);
                }
            },
            Segment::Multi(i, j) => {
                let ml_base = model.multi_unpaired();
                if j >= i + MIN_PAIR_SPAN {
                    for u in i..=(j - MIN_PAIR_SPAN) {
                        if self.m1.get(u, j) >= INF {
                            continue;
                        }
                        push((u - i) as i32 * ml_base, [Some(Segment::MultiOne(u, j)), None]);
                        if u > i {
                            push(0, [Some(Segment::Multi(i, u-1)), Some(Segment::MultiOne(u, j))]);
                        }
                    }
                }
            }
        };
        alternatives
    }

    /// Recovers one optimal structure from the filled arrays.
    /// # Arguments
    /// * `model` - the model used to fill these arrays
    /// # Errors
    /// * if the arrays are not consistent with the model
    pub fn backtrack(&self, model: &impl LoopEnergyModel) -> anyhow::Result<Structure> {
        let n = model.len();
        let mut pairs = vec![];
        let mut stack = vec![Segment::Exterior(n)];
        while let Some(segment) = stack.pop() {
            if let Segment::Pair(i, j) = segment {
                pairs.push((i, j));
            }

            let target = self.optimum(segment);
            match self.decompose(model, segment).into_iter().find(|a| a.bound == target) {
                Some(alternative) => stack.extend(alternative.segments.into_iter().flatten()),
                None => bail!("Failed to backtrack {segment:?} with energy {target}")
            };
        }
        Ok(Structure::from_pairs(n, &pairs)?)
    }
}

/// Empty prefixes do not need a segment
fn exterior_segment(len: usize) -> Option<Segment> {
    if len == 0 {
        None
    } else {
        Some(Segment::Exterior(len))
    }
}

/// An optimal structure and its energy in model units
#[derive(Clone, Debug)]
pub struct MfeSolution {
    pub structure: Structure,
    pub energy: i32
}

/// Folds the model into its minimum free energy structure.
/// # Arguments
/// * `model` - the energy model, single sequence or alignment
/// # Errors
/// * if backtracking fails
pub fn fold_mfe(model: &impl LoopEnergyModel) -> anyhow::Result<(MfeArrays, MfeSolution)> {
    let arrays = MfeArrays::fill(model);
    let structure = arrays.backtrack(model)?;
    let solution = MfeSolution {
        structure,
        energy: arrays.mfe()
    };
    Ok((arrays, solution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::eval::evaluate_structure;
    use crate::energy::loops::Dangles;
    use crate::energy::model::SequenceModel;
    use crate::energy::parameters::{EnergyParameters, MAXLOOP};
    use crate::folding::tests::{enumerate_structures, random_sequence};

    fn model(sequence: &[u8], dangles: Dangles) -> SequenceModel {
        SequenceModel::new(encode_sequence(sequence).unwrap(), EnergyParameters::default(), dangles, MAXLOOP)
    }

    #[test]
    fn test_simple_hairpin() {
        let model = model(b"GGGAAACCC", Dangles::None);
        let (_arrays, solution) = fold_mfe(&model).unwrap();
        assert_eq!(solution.structure.to_dot_bracket(), "(((...)))");
        assert_eq!(solution.energy, -120);
    }

    #[test]
    fn test_short_sequences() {
        for sequence in [&b"A"[..], b"ACGU", b"GAAAC"] {
            let model = model(sequence, Dangles::Double);
            let (_arrays, solution) = fold_mfe(&model).unwrap();
            assert_eq!(solution.energy, 0);
            assert_eq!(solution.structure.num_pairs(), 0);
        }
    }

    #[test]
    fn test_mfe_matches_evaluation() {
        let sequences: [&[u8]; 3] = [
            b"GGGGAAAACCCCAUAUGGGGAAAACCCCA",
            b"GCGCUUCGGCGCAAGCUAGCUUCGGCUAGCAA",
            b"UUAGCCGAUAGCUAGGCUAACGGAUCCGUUAGCAUCG"
        ];
        for sequence in sequences {
            for dangles in [Dangles::None, Dangles::Double] {
                let model = model(sequence, dangles);
                let (_arrays, solution) = fold_mfe(&model).unwrap();
                let evaluation = evaluate_structure(&model, &solution.structure).unwrap();
                assert_eq!(evaluation.total, solution.energy);
            }
        }
    }

    #[test]
    fn test_mfe_brute_force() {
        for seed in 0..20 {
            let sequence = random_sequence(seed, 14);
            for dangles in [Dangles::None, Dangles::Double] {
                let model = SequenceModel::new(sequence.clone(), EnergyParameters::default(), dangles, MAXLOOP);
                let best = enumerate_structures(&model).iter()
                    .map(|s| evaluate_structure(&model, s).unwrap().total)
                    .min()
                    .unwrap();
                let (_arrays, solution) = fold_mfe(&model).unwrap();
                assert_eq!(solution.energy, best);
            }
        }
    }

    #[test]
    fn test_decompose_bounds() {
        let model = model(b"GGGAAACCC", Dangles::Double);
        let arrays = MfeArrays::fill(&model);
        let alternatives = arrays.decompose(&model, Segment::Exterior(9));
        // the optimum is always one of the alternatives, and none beat it
        let best = alternatives.iter().map(|a| a.bound).min().unwrap();
        assert_eq!(best, arrays.mfe());
    }
}
