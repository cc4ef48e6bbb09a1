use std::cmp::Reverse;

use anyhow::bail;
use log::{debug, trace};
use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap;

use crate::data_types::structure::Structure;
use crate::energy::model::LoopEnergyModel;
use crate::folding::mfe::{MfeArrays, Segment};

/// A structure found by suboptimal enumeration
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuboptStructure {
    pub structure: Structure,
    /// Energy in model units
    pub energy: i32
}

/// A partially decomposed structure waiting in the queue
#[derive(Clone, Debug)]
struct PartialStructure {
    /// Pairs that are already fixed
    pairs: Vec<(usize, usize)>,
    /// Segments that still need a decomposition
    pending: Vec<Segment>,
    /// Energy of every loop fixed so far
    energy: i32,
    /// Lowest energy of any structure that can come out of this one
    bound: i32
}

/// Streams every structure with energy within `delta` of the MFE to `callback`, in non-decreasing energy order.
/// Each structure is reported exactly once.
/// # Arguments
/// * `model` - the energy model used to fill `arrays`
/// * `arrays` - the filled MFE arrays
/// * `delta` - energy band above the MFE, in model units
/// * `max_structures` - optional cap on the number of reported structures
/// * `callback` - receives each structure as it is completed
/// # Errors
/// * if an internal state goes missing, or a completed structure is invalid
pub fn enumerate_suboptimals<F>(
    model: &impl LoopEnergyModel, arrays: &MfeArrays, delta: i32, max_structures: Option<usize>, mut callback: F
) -> anyhow::Result<usize> where F: FnMut(SuboptStructure) {
    let n = model.len();
    let threshold = arrays.mfe() + delta;
    if max_structures == Some(0) {
        return Ok(0);
    }

    let mut states: FxHashMap<u64, PartialStructure> = Default::default();
    let mut queue: PriorityQueue<u64, Reverse<(i32, u64)>> = PriorityQueue::new();
    let mut next_id: u64 = 0;
    states.insert(next_id, PartialStructure {
        pairs: vec![],
        pending: vec![Segment::Exterior(n)],
        energy: 0,
        bound: arrays.mfe()
    });
    queue.push(next_id, Reverse((arrays.mfe(), next_id)));

    let mut num_reported = 0;
    let mut max_queue_size = 0;
    while let Some((state_id, _priority)) = queue.pop() {
        let Some(mut state) = states.remove(&state_id) else {
            bail!("Missing partial structure #{state_id}");
        };

        let Some(segment) = state.pending.pop() else {
            // fully decomposed, the bound is now exact
            let structure = Structure::from_pairs(n, &state.pairs)?;
            trace!("Subopt #{num_reported}: {structure} {}", state.energy);
            callback(SuboptStructure { structure, energy: state.energy });
            num_reported += 1;
            if max_structures.is_some_and(|m| num_reported >= m) {
                debug!("Reached the cap of {num_reported} suboptimal structures");
                break;
            }
            continue;
        };

        if let Segment::Pair(i, j) = segment {
            state.pairs.push((i, j));
        }

        let base_bound = state.bound - arrays.optimum(segment);
        for alternative in arrays.decompose(model, segment) {
            let bound = base_bound + alternative.bound;
            if bound > threshold {
                continue;
            }

            let mut child = PartialStructure {
                pairs: state.pairs.clone(),
                pending: state.pending.clone(),
                energy: state.energy + alternative.energy,
                bound
            };
            child.pending.extend(alternative.segments.into_iter().flatten());

            next_id += 1;
            queue.push(next_id, Reverse((bound, next_id)));
            states.insert(next_id, child);
        }
        max_queue_size = max_queue_size.max(queue.len());
    }

    debug!("Suboptimal enumeration reported {num_reported} structures, max queue size {max_queue_size}");
    Ok(num_reported)
}

/// Collects every structure within `delta` of the MFE, sorted by energy and then dot-bracket.
/// # Arguments
/// * `model` - the energy model used to fill `arrays`
/// * `arrays` - the filled MFE arrays
/// * `delta` - energy band above the MFE, in model units
/// * `max_structures` - optional cap on the number of structures
/// # Errors
/// * see `enumerate_suboptimals`
pub fn suboptimal_structures(model: &impl LoopEnergyModel, arrays: &MfeArrays, delta: i32, max_structures: Option<usize>) -> anyhow::Result<Vec<SuboptStructure>> {
    let mut results = vec![];
    enumerate_suboptimals(model, arrays, delta, max_structures, |s| results.push(s))?;
    results.sort_by_cached_key(|s| (s.energy, s.structure.to_dot_bracket()));
    Ok(results)
}
