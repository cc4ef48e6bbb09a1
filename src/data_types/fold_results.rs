use serde::Serialize;

use crate::data_types::energy_log::EnergyLog;
use crate::data_types::structure::Structure;

/// A structure paired with its free energy in kcal/mol
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredStructure {
    /// The structure, serialized as dot-bracket
    pub structure: Structure,
    /// Free energy in kcal/mol
    pub energy: f64
}

impl ScoredStructure {
    /// Constructor
    pub fn new(structure: Structure, energy: f64) -> Self {
        Self {
            structure, energy
        }
    }
}

/// Statistics of the Boltzmann ensemble
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EnsembleStats {
    /// Ensemble free energy, -kT ln(Z), in kcal/mol
    pub ensemble_energy: f64,
    /// Boltzmann probability of the MFE structure
    pub mfe_frequency: f64,
    /// Expected base-pair distance between two structures drawn from the ensemble
    pub diversity: f64
}

/// The centroid structure with its energy and expected distance to the ensemble
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CentroidResult {
    pub structure: Structure,
    pub energy: f64,
    pub distance: f64
}

/// The MEA structure with its energy and expected accuracy
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeaResult {
    pub structure: Structure,
    pub energy: f64,
    pub gamma: f64,
    pub expected_accuracy: f64
}

/// Everything derived from the partition function
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnsembleReport {
    pub stats: EnsembleStats,
    pub centroid: CentroidResult,
    pub mea: MeaResult,
    /// Structures drawn by stochastic backtracking
    pub samples: Vec<ScoredStructure>,
    /// (i, j, p) with 0-based positions, only pairs above the reporting cutoff; written to its own file
    #[serde(skip)]
    pub pair_probabilities: Vec<(usize, usize, f64)>
}

/// All results for a single folded sequence
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoldReport {
    /// Record name from the FASTA file
    pub name: String,
    /// Sequence as folded (RNA alphabet)
    pub sequence: String,
    /// The minimum free energy structure
    pub mfe: ScoredStructure,
    /// Loop decomposition of the MFE structure
    pub mfe_log: EnergyLog,
    /// Present when ensemble calculations were requested
    pub ensemble: Option<EnsembleReport>
}

/// Suboptimal structures of a single sequence
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuboptReport {
    pub name: String,
    pub sequence: String,
    /// The energy band above the MFE in kcal/mol
    pub delta: f64,
    /// Sorted by energy, then dot-bracket
    pub structures: Vec<ScoredStructure>
}

/// Results for the consensus folding of an alignment
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlifoldReport {
    /// Row names
    pub names: Vec<String>,
    /// Consensus sequence of the alignment
    pub consensus: String,
    /// Consensus MFE structure with total energy per sequence
    pub mfe: ScoredStructure,
    /// Average free energy of the rows folded into the consensus structure, in kcal/mol
    pub free_energy: f64,
    /// Covariance contribution, in kcal/mol
    pub covariance: f64,
    /// Loop decomposition of the consensus structure, energies per sequence
    pub mfe_log: EnergyLog,
    /// Present when ensemble calculations were requested
    pub ensemble: Option<EnsembleReport>
}
