use anyhow::ensure;
use log::debug;

use crate::energy::model::LoopEnergyModel;
use crate::folding::matrix::PairMatrix;
use crate::folding::mfe::MIN_PAIR_SPAN;

/// Multiplier on the MFE when estimating the per-nucleotide scale
const SCALE_FACTOR: f64 = 1.07;

/// Boltzmann weight of an energy in model units
pub fn boltzmann_weight(model: &impl LoopEnergyModel, energy: i32) -> f64 {
    (-model.to_kcal(energy) / model.kt()).exp()
}

/// The inside and outside partition function arrays along with base-pair probabilities.
/// All inside values are scaled by `scale^-(number of covered nucleotides)` to stay in floating-point range.
#[derive(Clone, Debug)]
pub struct PartitionFunction {
    /// Number of positions
    length: usize,
    /// RT in kcal/mol
    kt: f64,
    /// Per-nucleotide scale
    scale: f64,
    /// `scale^-d` for every d in 0..=length
    inverse_scale_powers: Vec<f64>,
    /// Qb[i][j]: i and j pair
    qb: PairMatrix<f64>,
    /// Qm[i][j]: multiloop part with at least one branch
    qm: PairMatrix<f64>,
    /// Qm1[i][j]: multiloop part with exactly one branch, starting at i
    qm1: PairMatrix<f64>,
    /// Q5[k]: prefix of length k
    q5: Vec<f64>,
    /// P[i][j] for i < j
    probabilities: PairMatrix<f64>
}

impl PartitionFunction {
    /// Runs the inside and outside recursions.
    /// # Arguments
    /// * `model` - the energy model
    /// * `mfe` - the minimum free energy in model units, used to pick a scale
    /// # Errors
    /// * if the partition function is not a positive finite number
    pub fn compute(model: &impl LoopEnergyModel, mfe: i32) -> anyhow::Result<Self> {
        let n = model.len();
        let kt = model.kt();
        let scale = if n > 0 {
            (-SCALE_FACTOR * model.to_kcal(mfe) / (kt * n as f64)).exp()
        } else {
            1.0
        };
        let inverse_scale_powers: Vec<f64> = (0..=(n+2)).map(|d| scale.powi(-(d as i32))).collect();

        let mut pf = Self {
            length: n,
            kt,
            scale,
            inverse_scale_powers,
            qb: PairMatrix::new(n, 0.0),
            qm: PairMatrix::new(n, 0.0),
            qm1: PairMatrix::new(n, 0.0),
            q5: vec![1.0; n + 1],
            probabilities: PairMatrix::new(n, 0.0)
        };
        pf.fill_inside(model);
        let z = pf.q5[n];
        ensure!(z.is_finite() && z > 0.0, "Partition function is out of range (scaled Z = {z})");
        pf.fill_outside(model);
        debug!("Partition function for {n} positions: scale = {scale:.4}, G = {:.2}", pf.ensemble_energy());
        Ok(pf)
    }

    fn fill_inside(&mut self, model: &impl LoopEnergyModel) {
        let n = self.length;
        let max_loop = model.max_loop();
        let unpaired_weight = boltzmann_weight(model, model.multi_unpaired()) / self.scale;
        let unpaired_powers: Vec<f64> = (0..=n).map(|d| unpaired_weight.powi(d as i32)).collect();

        for span in MIN_PAIR_SPAN..n {
            for i in 0..(n - span) {
                let j = i + span;

                if model.can_pair(i, j) {
                    let mut total = boltzmann_weight(model, model.hairpin(i, j)) * self.inverse_scale_powers[span + 1];
                    for k in (i+1)..=(i+1+max_loop).min(j.saturating_sub(MIN_PAIR_SPAN + 1)) {
                        let n1 = k - i - 1;
                        let min_l = (k + MIN_PAIR_SPAN).max((j - 1).saturating_sub(max_loop - n1));
                        for l in min_l..j {
                            let inner = self.qb.get(k, l);
                            if inner > 0.0 {
                                total += boltzmann_weight(model, model.interior(i, j, k, l)) * inner *
                                    self.inverse_scale_powers[(k - i) + (j - l)];
                            }
                        }
                    }

                    let mut multi = 0.0;
                    for u in (i+1)..(j-1) {
                        multi += self.qm.get(i+1, u) * self.qm1.get(u+1, j-1);
                    }
                    if multi > 0.0 {
                        total += boltzmann_weight(model, model.multi_closing(i, j)) * multi * self.inverse_scale_powers[2];
                    }
                    self.qb.set(i, j, total);
                }

                let mut qm1 = self.qm1.get(i, j-1) * unpaired_weight;
                let closed = self.qb.get(i, j);
                if closed > 0.0 {
                    qm1 += closed * boltzmann_weight(model, model.multi_stem(i, j));
                }
                self.qm1.set(i, j, qm1);

                let mut qm = 0.0;
                for u in i..=(j - MIN_PAIR_SPAN) {
                    let branch = self.qm1.get(u, j);
                    if branch > 0.0 {
                        let left = if u > i { self.qm.get(i, u-1) } else { 0.0 };
                        qm += (unpaired_powers[u - i] + left) * branch;
                    }
                }
                self.qm.set(i, j, qm);
            }
        }

        for j in 0..n {
            let mut total = self.q5[j] * self.inverse_scale_powers[1];
            if j >= MIN_PAIR_SPAN {
                for k in 0..=(j - MIN_PAIR_SPAN) {
                    let closed = self.qb.get(k, j);
                    if closed > 0.0 {
                        total += self.q5[k] * closed * boltzmann_weight(model, model.exterior_stem(k, j));
                    }
                }
            }
            self.q5[j+1] = total;
        }
    }

    /// Propagates the derivative of Z back through every inside term, in reverse order.
    /// The outside value of a pair times its inside value is the weight of all structures containing it.
    fn fill_outside(&mut self, model: &impl LoopEnergyModel) {
        let n = self.length;
        let max_loop = model.max_loop();
        let unpaired_weight = boltzmann_weight(model, model.multi_unpaired()) / self.scale;
        let unpaired_powers: Vec<f64> = (0..=n).map(|d| unpaired_weight.powi(d as i32)).collect();

        let mut q5_hat = vec![0.0; n + 1];
        let mut qb_hat = PairMatrix::new(n, 0.0);
        let mut qm_hat = PairMatrix::new(n, 0.0);
        let mut qm1_hat = PairMatrix::new(n, 0.0);

        q5_hat[n] = 1.0;
        for j in (0..n).rev() {
            let outer = q5_hat[j+1];
            q5_hat[j] += outer * self.inverse_scale_powers[1];
            if j >= MIN_PAIR_SPAN {
                for k in 0..=(j - MIN_PAIR_SPAN) {
                    let closed = self.qb.get(k, j);
                    if closed > 0.0 {
                        let w = boltzmann_weight(model, model.exterior_stem(k, j));
                        q5_hat[k] += outer * closed * w;
                        qb_hat.add(k, j, outer * self.q5[k] * w);
                    }
                }
            }
        }

        for span in (MIN_PAIR_SPAN..n).rev() {
            for i in 0..(n - span) {
                let j = i + span;

                // Qm
                let outer = qm_hat.get(i, j);
                if outer > 0.0 {
                    for u in i..=(j - MIN_PAIR_SPAN) {
                        let branch = self.qm1.get(u, j);
                        let left = if u > i { self.qm.get(i, u-1) } else { 0.0 };
                        qm1_hat.add(u, j, outer * (unpaired_powers[u - i] + left));
                        if u > i && branch > 0.0 {
                            qm_hat.add(i, u-1, outer * branch);
                        }
                    }
                }

                // Qm1
                let outer = qm1_hat.get(i, j);
                if outer > 0.0 {
                    qm1_hat.add(i, j-1, outer * unpaired_weight);
                    if self.qb.get(i, j) > 0.0 {
                        qb_hat.add(i, j, outer * boltzmann_weight(model, model.multi_stem(i, j)));
                    }
                }

                // Qb
                let outer = qb_hat.get(i, j);
                let closed = self.qb.get(i, j);
                if outer <= 0.0 || closed <= 0.0 {
                    continue;
                }
                self.probabilities.set(i, j, closed * outer / self.q5[n]);

                for k in (i+1)..=(i+1+max_loop).min(j.saturating_sub(MIN_PAIR_SPAN + 1)) {
                    let n1 = k - i - 1;
                    let min_l = (k + MIN_PAIR_SPAN).max((j - 1).saturating_sub(max_loop - n1));
                    for l in min_l..j {
                        if self.qb.get(k, l) > 0.0 {
                            qb_hat.add(k, l, outer * boltzmann_weight(model, model.interior(i, j, k, l)) *
                                self.inverse_scale_powers[(k - i) + (j - l)]);
                        }
                    }
                }

                let closing = outer * boltzmann_weight(model, model.multi_closing(i, j)) * self.inverse_scale_powers[2];
                for u in (i+1)..(j-1) {
                    let left = self.qm.get(i+1, u);
                    let right = self.qm1.get(u+1, j-1);
                    if left > 0.0 && right > 0.0 {
                        qm_hat.add(i+1, u, closing * right);
                        qm1_hat.add(u+1, j-1, closing * left);
                    }
                }
            }
        }
    }

    /// Ensemble free energy in kcal/mol
    pub fn ensemble_energy(&self) -> f64 {
        -self.kt * (self.q5[self.length].ln() + self.length as f64 * self.scale.ln())
    }

    /// Boltzmann probability of a structure with the given energy in kcal/mol
    pub fn structure_probability(&self, energy: f64) -> f64 {
        (-(energy - self.ensemble_energy()) / self.kt).exp()
    }

    /// Probability that i and j pair, with i < j
    pub fn probability(&self, i: usize, j: usize) -> f64 {
        self.probabilities.get(i, j)
    }

    /// Probability that each position is unpaired
    pub fn unpaired_probabilities(&self) -> Vec<f64> {
        let mut unpaired = vec![1.0; self.length];
        for (i, j, p) in self.pair_list(0.0) {
            unpaired[i] -= p;
            unpaired[j] -= p;
        }
        unpaired
    }

    /// Mean base-pair distance between two structures drawn from the ensemble
    pub fn ensemble_diversity(&self) -> f64 {
        self.pair_list(0.0).iter()
            .map(|&(_i, _j, p)| 2.0 * p * (1.0 - p))
            .sum()
    }

    /// All pairs with probability above `cutoff`, ordered by (i, j)
    pub fn pair_list(&self, cutoff: f64) -> Vec<(usize, usize, f64)> {
        let n = self.length;
        let mut pairs = vec![];
        for i in 0..n {
            for j in (i+MIN_PAIR_SPAN)..n {
                let p = self.probabilities.get(i, j);
                if p > cutoff {
                    pairs.push((i, j, p));
                }
            }
        }
        pairs
    }

    // getters for stochastic backtracking
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn inverse_scale_power(&self, d: usize) -> f64 {
        self.inverse_scale_powers[d]
    }

    pub fn qb(&self, i: usize, j: usize) -> f64 {
        self.qb.get(i, j)
    }

    pub fn qm(&self, i: usize, j: usize) -> f64 {
        self.qm.get(i, j)
    }

    pub fn qm1(&self, i: usize, j: usize) -> f64 {
        self.qm1.get(i, j)
    }

    pub fn q5(&self, k: usize) -> f64 {
        self.q5[k]
    }
}

#[cfg(test)]
mod tests {
    use approx_eq::assert_approx_eq;

    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::eval::evaluate_structure;
    use crate::energy::loops::Dangles;
    use crate::energy::model::SequenceModel;
    use crate::energy::parameters::{EnergyParameters, MAXLOOP};
    use crate::folding::mfe::fold_mfe;
    use crate::folding::tests::{enumerate_structures, random_sequence};

    #[test]
    fn test_partition_brute_force() {
        for seed in 0..10 {
            let sequence = random_sequence(200 + seed, 14);
            for dangles in [Dangles::None, Dangles::Double] {
                let model = SequenceModel::new(sequence.clone(), EnergyParameters::default(), dangles, MAXLOOP);
                let (_arrays, mfe) = fold_mfe(&model).unwrap();
                let pf = PartitionFunction::compute(&model, mfe.energy).unwrap();

                let structures = enumerate_structures(&model);
                let weights: Vec<f64> = structures.iter()
                    .map(|s| boltzmann_weight(&model, evaluate_structure(&model, s).unwrap().total))
                    .collect();
                let z: f64 = weights.iter().sum();
                // both sides are at least 1 from the open chain
                assert_approx_eq!((-pf.ensemble_energy() / model.kt()).exp(), z);

                for i in 0..model.len() {
                    for j in (i+1)..model.len() {
                        let expected: f64 = structures.iter().zip(weights.iter())
                            .filter(|(s, _w)| s.partner(i) == Some(j))
                            .map(|(_s, w)| w)
                            .sum::<f64>() / z;
                        assert!((pf.probability(i, j) - expected).abs() < 1e-9, "p({i}, {j}) = {} != {expected}", pf.probability(i, j));
                    }
                }
            }
        }
    }

    #[test]
    fn test_ensemble_stats() {
        let model = SequenceModel::new(encode_sequence(b"GGGGAAAACCCCAUAUGGGGAAAACCCCA").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let (_arrays, mfe) = fold_mfe(&model).unwrap();
        let pf = PartitionFunction::compute(&model, mfe.energy).unwrap();

        // the ensemble is always at least as stable as its best structure
        let mfe_kcal = model.to_kcal(mfe.energy);
        assert!(pf.ensemble_energy() <= mfe_kcal);
        let frequency = pf.structure_probability(mfe_kcal);
        assert!(frequency > 0.0 && frequency <= 1.0);
        assert!(pf.ensemble_diversity() >= 0.0);

        for (i, j, p) in pf.pair_list(0.0) {
            assert!(i < j);
            assert!(p > 0.0 && p <= 1.0 + 1e-9);
        }
        for q in pf.unpaired_probabilities() {
            assert!(q > -1e-9 && q <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_unstructured() {
        let model = SequenceModel::new(encode_sequence(b"AAAAAAAA").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let pf = PartitionFunction::compute(&model, 0).unwrap();
        // only the open chain
        assert!(pf.ensemble_energy().abs() < 1e-12);
        assert!(pf.pair_list(0.0).is_empty());
        assert_eq!(pf.ensemble_diversity(), 0.0);
    }
}
