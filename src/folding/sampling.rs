use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data_types::structure::Structure;
use crate::energy::model::LoopEnergyModel;
use crate::folding::mfe::{Segment, MIN_PAIR_SPAN};
use crate::folding::partition::{boltzmann_weight, PartitionFunction};

/// Picks one of the weighted options with probability proportional to its weight.
/// Rounding can leave `r` just past the last option, in which case the last non-zero option wins.
fn choose<R: Rng>(rng: &mut R, options: &[(f64, [Option<Segment>; 2])]) -> Option<[Option<Segment>; 2]> {
    let total: f64 = options.iter().map(|(w, _s)| w).sum();
    let r = rng.gen::<f64>() * total;
    let mut accumulated = 0.0;
    let mut last = None;
    for (weight, segments) in options.iter() {
        if *weight <= 0.0 {
            continue;
        }
        accumulated += weight;
        last = Some(*segments);
        if r < accumulated {
            return last;
        }
    }
    last
}

/// Lists the weighted decompositions of a segment, mirroring the inside recursion
fn weighted_options(model: &impl LoopEnergyModel, pf: &PartitionFunction, segment: Segment) -> Vec<(f64, [Option<Segment>; 2])> {
    let mut options = vec![];
    let unpaired_weight = boltzmann_weight(model, model.multi_unpaired()) / pf.scale();
    match segment {
        Segment::Exterior(0) => {},
        Segment::Exterior(len) => {
            let j = len - 1;
            let rest = if j > 0 { Some(Segment::Exterior(j)) } else { None };
            options.push((pf.q5(j) * pf.inverse_scale_power(1), [rest, None]));
            if j >= MIN_PAIR_SPAN {
                for k in 0..=(j - MIN_PAIR_SPAN) {
                    let closed = pf.qb(k, j);
                    if closed > 0.0 {
                        let prefix = if k > 0 { Some(Segment::Exterior(k)) } else { None };
                        let weight = pf.q5(k) * closed * boltzmann_weight(model, model.exterior_stem(k, j));
                        options.push((weight, [prefix, Some(Segment::Pair(k, j))]));
                    }
                }
            }
        },
        Segment::Pair(i, j) => {
            let max_loop = model.max_loop();
            options.push((boltzmann_weight(model, model.hairpin(i, j)) * pf.inverse_scale_power(j - i + 1), [None, None]));
            for k in (i+1)..=(i+1+max_loop).min(j.saturating_sub(MIN_PAIR_SPAN + 1)) {
                let n1 = k - i - 1;
                let min_l = (k + MIN_PAIR_SPAN).max((j - 1).saturating_sub(max_loop - n1));
                for l in min_l..j {
                    let inner = pf.qb(k, l);
                    if inner > 0.0 {
                        let weight = boltzmann_weight(model, model.interior(i, j, k, l)) * inner *
                            pf.inverse_scale_power((k - i) + (j - l));
                        options.push((weight, [Some(Segment::Pair(k, l)), None]));
                    }
                }
            }
            let closing = boltzmann_weight(model, model.multi_closing(i, j)) * pf.inverse_scale_power(2);
            for u in (i+1)..(j-1) {
                let weight = closing * pf.qm(i+1, u) * pf.qm1(u+1, j-1);
                if weight > 0.0 {
                    options.push((weight, [Some(Segment::Multi(i+1, u)), Some(Segment::MultiOne(u+1, j-1))]));
                }
            }
        },
        Segment::MultiOne(i, j) => {
            let closed = pf.qb(i, j);
            if closed > 0.0 {
                options.push((closed * boltzmann_weight(model, model.multi_stem(i, j)), [Some(Segment::Pair(i, j)), None]));
            }
            if j > i {
                options.push((pf.qm1(i, j-1) * unpaired_weight, [Some(Segment::MultiOne(i, j-1)), None]));
            }
        },
        Segment::Multi(i, j) => {
            if j >= i + MIN_PAIR_SPAN {
                for u in i..=(j - MIN_PAIR_SPAN) {
                    let branch = pf.qm1(u, j);
                    if branch <= 0.0 {
                        continue;
                    }
                    options.push((unpaired_weight.powi((u - i) as i32) * branch, [Some(Segment::MultiOne(u, j)), None]));
                    if u > i {
                        options.push((pf.qm(i, u-1) * branch, [Some(Segment::Multi(i, u-1)), Some(Segment::MultiOne(u, j))]));
                    }
                }
            }
        }
    };
    options
}

/// Draws a single structure with its Boltzmann probability.
/// # Arguments
/// * `model` - the model used to compute `pf`
/// * `pf` - the filled partition function
/// * `rng` - random source
/// # Errors
/// * if a segment with non-zero weight has no way to decompose
pub fn sample_structure<R: Rng>(model: &impl LoopEnergyModel, pf: &PartitionFunction, rng: &mut R) -> anyhow::Result<Structure> {
    let n = pf.len();
    let mut pairs = vec![];
    let mut stack = vec![];
    if n > 0 {
        stack.push(Segment::Exterior(n));
    }

    while let Some(segment) = stack.pop() {
        if let Segment::Pair(i, j) = segment {
            pairs.push((i, j));
        }

        let options = weighted_options(model, pf, segment);
        match choose(rng, &options) {
            Some(segments) => stack.extend(segments.into_iter().flatten()),
            None => bail!("No decomposition available for {segment:?}")
        };
    }
    Ok(Structure::from_pairs(n, &pairs)?)
}

/// Draws `count` structures from the ensemble with a seeded generator, so results are reproducible.
/// # Arguments
/// * `model` - the model used to compute `pf`
/// * `pf` - the filled partition function
/// * `count` - number of structures to draw
/// * `seed` - seed for the random generator
/// # Errors
/// * see `sample_structure`
pub fn sample_structures(model: &impl LoopEnergyModel, pf: &PartitionFunction, count: usize, seed: u64) -> anyhow::Result<Vec<Structure>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| sample_structure(model, pf, &mut rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::eval::evaluate_structure;
    use crate::energy::loops::Dangles;
    use crate::energy::model::SequenceModel;
    use crate::energy::parameters::{EnergyParameters, MAXLOOP};
    use crate::folding::mfe::fold_mfe;

    #[test]
    fn test_sample_frequencies() {
        let model = SequenceModel::new(encode_sequence(b"GGGAUACGAAAGCGUAUCCCAAUGC").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let (_arrays, mfe) = fold_mfe(&model).unwrap();
        let pf = PartitionFunction::compute(&model, mfe.energy).unwrap();

        let num_samples = 2000;
        let samples = sample_structures(&model, &pf, num_samples, 7).unwrap();
        assert_eq!(samples.len(), num_samples);
        for sample in samples.iter() {
            assert!(evaluate_structure(&model, sample).is_ok());
        }

        for (i, j, p) in pf.pair_list(0.05) {
            let observed = samples.iter().filter(|s| s.partner(i) == Some(j)).count() as f64 / num_samples as f64;
            assert!((observed - p).abs() < 0.05, "pair ({i}, {j}): sampled {observed}, expected {p}");
        }
    }

    #[test]
    fn test_reproducible() {
        let model = SequenceModel::new(encode_sequence(b"GCGCUUCGGCGCAAGCUAGCUUCGGCUAGC").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let (_arrays, mfe) = fold_mfe(&model).unwrap();
        let pf = PartitionFunction::compute(&model, mfe.energy).unwrap();
        let first = sample_structures(&model, &pf, 10, 42).unwrap();
        let second = sample_structures(&model, &pf, 10, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_model() {
        let model = SequenceModel::new(vec![], EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let pf = PartitionFunction::compute(&model, 0).unwrap();
        let samples = sample_structures(&model, &pf, 3, 0).unwrap();
        assert!(samples.iter().all(|s| s.is_empty()));
    }
}
