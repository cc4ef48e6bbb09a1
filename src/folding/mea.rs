use crate::data_types::structure::Structure;
use crate::folding::matrix::PairMatrix;
use crate::folding::partition::PartitionFunction;

/// Pairs below this probability are not considered by the MEA recursion
pub const MIN_MEA_PROBABILITY: f64 = 1e-5;

/// A maximum expected accuracy structure
#[derive(Clone, Debug)]
pub struct MeaStructure {
    pub structure: Structure,
    /// The maximized objective: 2 * gamma * p for every pair plus the unpaired probability of every unpaired position
    pub expected_accuracy: f64
}

/// Computes the MEA structure from pair probabilities.
/// # Arguments
/// * `pf` - the filled partition function
/// * `gamma` - weight of paired positions relative to unpaired ones; larger values produce more pairs
/// # Errors
/// * if the backtracked pairs do not form a valid structure
pub fn mea_structure(pf: &PartitionFunction, gamma: f64) -> anyhow::Result<MeaStructure> {
    let n = pf.len();
    let unpaired = pf.unpaired_probabilities();
    let mut partners: Vec<Vec<(usize, f64)>> = vec![vec![]; n];
    for (i, j, p) in pf.pair_list(MIN_MEA_PROBABILITY) {
        partners[i].push((j, 2.0 * gamma * p));
    }

    // best[i][e] is the best score of the region i..e (exclusive end); choice records the partner of i, if any
    let mut best = PairMatrix::new(n + 1, 0.0);
    let mut choice: PairMatrix<Option<usize>> = PairMatrix::new(n + 1, None);
    for i in (0..n).rev() {
        for e in (i+1)..=n {
            let mut score = best.get(i+1, e) + unpaired[i];
            let mut partner = None;
            for &(k, pair_score) in partners[i].iter() {
                if k >= e {
                    break;
                }
                let candidate = pair_score + best.get(i+1, k) + best.get(k+1, e);
                if candidate > score {
                    score = candidate;
                    partner = Some(k);
                }
            }
            best.set(i, e, score);
            choice.set(i, e, partner);
        }
    }

    let mut pairs = vec![];
    let mut stack = vec![(0, n)];
    while let Some((i, e)) = stack.pop() {
        if i >= e {
            continue;
        }
        match choice.get(i, e) {
            Some(k) => {
                pairs.push((i, k));
                stack.push((i+1, k));
                stack.push((k+1, e));
            },
            None => stack.push((i+1, e))
        };
    }

    Ok(MeaStructure {
        structure: Structure::from_pairs(n, &pairs)?,
        expected_accuracy: best.get(0, n)
    })
}
