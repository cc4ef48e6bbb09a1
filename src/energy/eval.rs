use serde::Serialize;

use crate::data_types::structure::{Structure, StructureError};
use crate::energy::model::LoopEnergyModel;

/// The loop types produced by a loop decomposition
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display, strum_macros::EnumString, Serialize)]
pub enum LoopKind {
    #[strum(serialize = "External")]
    Exterior,
    #[strum(serialize = "Hairpin")]
    Hairpin,
    #[strum(serialize = "Stack")]
    Stack,
    #[strum(serialize = "Bulge")]
    Bulge,
    #[strum(serialize = "Interior")]
    Interior,
    #[strum(serialize = "Multi")]
    Multi
}

/// Energy of a single loop in a structure
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoopContribution {
    /// The type of loop
    pub kind: LoopKind,
    /// The closing pair, `None` for the exterior loop
    pub closing: Option<(usize, usize)>,
    /// Pairs directly enclosed by this loop (the branches)
    pub inner: Vec<(usize, usize)>,
    /// Energy in model units
    pub energy: i32
}

/// Loop-by-loop energy of a structure
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EnergyEvaluation {
    /// Total energy in model units; always the sum of the contributions
    pub total: i32,
    /// One entry per loop, exterior loop first and the remaining loops ordered by their closing pair
    pub contributions: Vec<LoopContribution>
}

impl EnergyEvaluation {
    /// Returns the total energy in kcal/mol
    pub fn total_kcal(&self, model: &impl LoopEnergyModel) -> f64 {
        model.to_kcal(self.total)
    }
}

/// Collects the pairs directly enclosed by the region (start..end) of the pair table
fn enclosed_pairs(structure: &Structure, start: usize, end: usize) -> (Vec<(usize, usize)>, usize) {
    let mut branches = vec![];
    let mut unpaired = 0;
    let mut k = start;
    while k < end {
        match structure.partner(k) {
            Some(l) if l > k => {
                branches.push((k, l));
                k = l + 1;
            },
            _ => {
                unpaired += 1;
                k += 1;
            }
        }
    }
    (branches, unpaired)
}

/// Evaluates the free energy of a structure with a loop decomposition.
/// # Arguments
/// * `model` - the energy model that scores each loop
/// * `structure` - the structure to evaluate, must match the model length
/// # Errors
/// * if the structure length does not match the model
/// * if any pair cannot be formed under the model
pub fn evaluate_structure(model: &impl LoopEnergyModel, structure: &Structure) -> Result<EnergyEvaluation, StructureError> {
    let n = model.len();
    if structure.len() != n {
        return Err(StructureError::LengthMismatch { structure_len: structure.len(), sequence_len: n });
    }
    for (i, j) in structure.pairs() {
        if !model.can_pair(i, j) {
            return Err(StructureError::InvalidPair { i, j });
        }
    }

    let mut contributions = vec![];

    // exterior loop first
    let (outer_pairs, _unpaired) = enclosed_pairs(structure, 0, n);
    let exterior: i32 = outer_pairs.iter()
        .map(|&(i, j)| model.exterior_stem(i, j))
        .sum();
    contributions.push(LoopContribution {
        kind: LoopKind::Exterior,
        closing: None,
        inner: outer_pairs,
        energy: exterior
    });

    for (i, j) in structure.pairs() {
        let (branches, unpaired) = enclosed_pairs(structure, i+1, j);
        let contribution = match branches.len() {
            0 => LoopContribution {
                kind: LoopKind::Hairpin,
                closing: Some((i, j)),
                inner: branches,
                energy: model.hairpin(i, j)
            },
            1 => {
                let (k, l) = branches[0];
                let kind = match (k - i - 1, j - l - 1) {
                    (0, 0) => LoopKind::Stack,
                    (0, _) | (_, 0) => LoopKind::Bulge,
                    _ => LoopKind::Interior
                };
                LoopContribution {
                    kind,
                    closing: Some((i, j)),
                    inner: branches,
                    energy: model.interior(i, j, k, l)
                }
            },
            _ => {
                let energy = model.multi_closing(i, j) +
                    branches.iter().map(|&(k, l)| model.multi_stem(k, l)).sum::<i32>() +
                    unpaired as i32 * model.multi_unpaired();
                LoopContribution {
                    kind: LoopKind::Multi,
                    closing: Some((i, j)),
                    inner: branches,
                    energy
                }
            }
        };
        contributions.push(contribution);
    }

    let total = contributions.iter().map(|c| c.energy).sum();
    Ok(EnergyEvaluation {
        total,
        contributions
    })
}
