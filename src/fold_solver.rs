use anyhow::{ensure, Context};
use derive_builder::Builder;
use log::{debug, trace};

use crate::data_types::alignment::MultipleAlignment;
use crate::data_types::energy_log::EnergyLog;
use crate::data_types::fold_results::{AlifoldReport, CentroidResult, EnsembleReport, EnsembleStats, FoldReport, MeaResult, ScoredStructure, SuboptReport};
use crate::data_types::nucleotides::{decode_sequence, encode_sequence};
use crate::data_types::structure::Structure;
use crate::energy::eval::evaluate_structure;
use crate::energy::loops::Dangles;
use crate::energy::model::{AlignmentModel, LoopEnergyModel, SequenceModel};
use crate::energy::parameters::{EnergyParameters, MAXLOOP};
use crate::folding::centroid::centroid_structure;
use crate::folding::mea::mea_structure;
use crate::folding::mfe::fold_mfe;
use crate::folding::partition::PartitionFunction;
use crate::folding::sampling::sample_structures;
use crate::folding::subopt::suboptimal_structures;

/// Controls the energy model and which ensemble calculations are run for each record
#[derive(Builder, Clone, Copy, Debug)]
#[builder(default)]
pub struct FoldConfig {
    /// Temperature in Celsius
    temperature: f64,
    /// Dangling end model
    dangles: Dangles,
    /// Maximum interior loop size
    max_loop: usize,
    /// if True, computes the partition function, centroid, and MEA structures
    enable_partition: bool,
    /// Weight of pairs in the MEA objective
    mea_gamma: f64,
    /// Number of structures drawn by stochastic backtracking; requires `enable_partition`
    num_samples: usize,
    /// Seed for stochastic backtracking
    seed: u64,
    /// Only pair probabilities above this are reported
    bpp_cutoff: f64
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            temperature: 37.0,
            dangles: Dangles::Double,
            max_loop: MAXLOOP,
            enable_partition: false,
            mea_gamma: 1.0,
            num_samples: 0,
            seed: 0,
            bpp_cutoff: 1e-5
        }
    }
}

impl FoldConfig {
    /// Builds the temperature-adjusted energy parameters for this config
    pub fn energy_parameters(&self) -> EnergyParameters {
        EnergyParameters::at_temperature(self.temperature)
    }

    // getters
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn dangles(&self) -> Dangles {
        self.dangles
    }

    pub fn max_loop(&self) -> usize {
        self.max_loop
    }

    pub fn enable_partition(&self) -> bool {
        self.enable_partition
    }

    pub fn mea_gamma(&self) -> f64 {
        self.mea_gamma
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bpp_cutoff(&self) -> f64 {
        self.bpp_cutoff
    }
}

/// Folding settings for alignments, the regular fold settings plus the covariance weights
#[derive(Builder, Clone, Copy, Debug)]
#[builder(default)]
pub struct AlifoldConfig {
    /// Shared folding settings
    fold_config: FoldConfig,
    /// Weight of the covariance bonus
    cv_factor: f64,
    /// Weight of the penalty for rows that cannot pair
    nc_factor: f64
}

impl Default for AlifoldConfig {
    fn default() -> Self {
        Self {
            fold_config: FoldConfig::default(),
            cv_factor: 1.0,
            nc_factor: 1.0
        }
    }
}

impl AlifoldConfig {
    // getters
    pub fn fold_config(&self) -> &FoldConfig {
        &self.fold_config
    }

    pub fn cv_factor(&self) -> f64 {
        self.cv_factor
    }

    pub fn nc_factor(&self) -> f64 {
        self.nc_factor
    }
}

/// Builds the single-sequence model for a raw sequence
fn build_sequence_model(name: &str, sequence: &[u8], config: &FoldConfig) -> anyhow::Result<SequenceModel> {
    let encoded = encode_sequence(sequence)
        .with_context(|| format!("Error while encoding sequence {name:?}"))?;
    Ok(SequenceModel::new(encoded, config.energy_parameters(), config.dangles(), config.max_loop()))
}

/// Evaluates a structure under `model` and scores it in kcal/mol
fn score_structure(model: &impl LoopEnergyModel, structure: Structure) -> anyhow::Result<ScoredStructure> {
    let evaluation = evaluate_structure(model, &structure)
        .with_context(|| format!("Error while evaluating {structure}"))?;
    Ok(ScoredStructure::new(structure, model.to_kcal(evaluation.total)))
}

/// Runs the partition function and everything derived from it
/// # Arguments
/// * `model` - the energy model, single sequence or alignment
/// * `mfe` - the minimum free energy in model units
/// * `config` - controls MEA gamma, sampling, and the probability cutoff
fn solve_ensemble(model: &impl LoopEnergyModel, mfe: i32, config: &FoldConfig) -> anyhow::Result<EnsembleReport> {
    let pf = PartitionFunction::compute(model, mfe)?;
    let stats = EnsembleStats {
        ensemble_energy: pf.ensemble_energy(),
        mfe_frequency: pf.structure_probability(model.to_kcal(mfe)),
        diversity: pf.ensemble_diversity()
    };
    trace!("Ensemble stats: {stats:?}");

    let centroid = centroid_structure(&pf)?;
    let centroid_scored = score_structure(model, centroid.structure)?;
    let centroid = CentroidResult {
        structure: centroid_scored.structure,
        energy: centroid_scored.energy,
        distance: centroid.distance
    };

    let mea = mea_structure(&pf, config.mea_gamma())?;
    let mea_scored = score_structure(model, mea.structure)?;
    let mea = MeaResult {
        structure: mea_scored.structure,
        energy: mea_scored.energy,
        gamma: config.mea_gamma(),
        expected_accuracy: mea.expected_accuracy
    };

    let samples = sample_structures(model, &pf, config.num_samples(), config.seed())?
        .into_iter()
        .map(|s| score_structure(model, s))
        .collect::<anyhow::Result<Vec<ScoredStructure>>>()?;

    Ok(EnsembleReport {
        stats,
        centroid,
        mea,
        samples,
        pair_probabilities: pf.pair_list(config.bpp_cutoff())
    })
}

/// Entry point for folding a single sequence
/// # Arguments
/// * `name` - record name, used for reporting
/// * `sequence` - raw sequence, T is read as U
/// * `config` - energy model and ensemble settings
/// # Errors
/// * if the sequence contains unsupported characters
/// * if any of the folding steps fail
pub fn solve_fold_record(name: &str, sequence: &[u8], config: FoldConfig) -> anyhow::Result<FoldReport> {
    debug!("Folding {name:?} ({} nt)...", sequence.len());
    let model = build_sequence_model(name, sequence, &config)?;
    let rna = decode_sequence(model.sequence());

    let (_arrays, solution) = fold_mfe(&model)?;
    let evaluation = evaluate_structure(&model, &solution.structure)?;
    ensure!(
        evaluation.total == solution.energy,
        "MFE energy {} does not match the evaluated energy {} for {name:?}", solution.energy, evaluation.total
    );
    let mfe_log = EnergyLog::from_evaluation(name, &rna, &solution.structure, &evaluation, &model);
    let mfe = ScoredStructure::new(solution.structure, model.to_kcal(solution.energy));
    debug!("{name:?} MFE: {} ({:.2})", mfe.structure, mfe.energy);

    let ensemble = if config.enable_partition() {
        Some(solve_ensemble(&model, solution.energy, &config)?)
    } else {
        None
    };

    Ok(FoldReport {
        name: name.to_string(),
        sequence: rna,
        mfe,
        mfe_log,
        ensemble
    })
}

/// Entry point for suboptimal enumeration of a single sequence
/// # Arguments
/// * `name` - record name, used for reporting
/// * `sequence` - raw sequence, T is read as U
/// * `config` - energy model settings, ensemble settings are ignored
/// * `delta` - energy band above the MFE in kcal/mol
/// * `max_structures` - optional cap on the number of structures
/// # Errors
/// * if the sequence contains unsupported characters
/// * if delta is negative
pub fn solve_subopt_record(name: &str, sequence: &[u8], config: FoldConfig, delta: f64, max_structures: Option<usize>) -> anyhow::Result<SuboptReport> {
    ensure!(delta >= 0.0, "Energy band must be non-negative, got {delta}");
    debug!("Enumerating suboptimal structures for {name:?} within {delta:.2} kcal/mol...");
    let model = build_sequence_model(name, sequence, &config)?;
    let rna = decode_sequence(model.sequence());

    let (arrays, _solution) = fold_mfe(&model)?;
    let delta_units = (delta * 100.0 * model.divisor() as f64).round() as i32;
    let structures = suboptimal_structures(&model, &arrays, delta_units, max_structures)?
        .into_iter()
        .map(|s| ScoredStructure::new(s.structure, model.to_kcal(s.energy)))
        .collect();

    Ok(SuboptReport {
        name: name.to_string(),
        sequence: rna,
        delta,
        structures
    })
}

/// Entry point for consensus folding of an alignment
/// # Arguments
/// * `alignment` - the aligned sequences
/// * `config` - energy model, ensemble, and covariance settings
/// # Errors
/// * if any of the folding steps fail
pub fn solve_alifold(alignment: &MultipleAlignment, config: AlifoldConfig) -> anyhow::Result<AlifoldReport> {
    let fold_config = config.fold_config();
    debug!("Folding alignment of {} rows x {} columns...", alignment.num_rows(), alignment.num_columns());
    let model = AlignmentModel::new(
        alignment, fold_config.energy_parameters(), fold_config.dangles(), fold_config.max_loop(),
        config.cv_factor(), config.nc_factor()
    );
    let consensus = alignment.consensus_sequence();

    let (_arrays, solution) = fold_mfe(&model)?;
    let evaluation = evaluate_structure(&model, &solution.structure)?;
    ensure!(
        evaluation.total == solution.energy,
        "Consensus MFE energy {} does not match the evaluated energy {}", solution.energy, evaluation.total
    );
    let mfe_log = EnergyLog::from_evaluation("consensus", &consensus, &solution.structure, &evaluation, &model);

    // the bonus is applied once per row, so per sequence it is just the summed pscores
    let covariance_units: i32 = solution.structure.pairs().iter()
        .map(|&(i, j)| -model.covariance(i, j).unwrap_or(0))
        .sum();
    let covariance = covariance_units as f64 / 100.0;
    let total = model.to_kcal(solution.energy);
    debug!("Consensus MFE: {} ({total:.2} = {:.2} + {covariance:.2})", solution.structure, total - covariance);

    let ensemble = if fold_config.enable_partition() {
        Some(solve_ensemble(&model, solution.energy, fold_config)?)
    } else {
        None
    };

    Ok(AlifoldReport {
        names: alignment.names().to_vec(),
        consensus,
        mfe: ScoredStructure::new(solution.structure, total),
        free_energy: total - covariance,
        covariance,
        mfe_log,
        ensemble
    })
}

/// Entry point for evaluating a given structure on a sequence
/// # Arguments
/// * `name` - record name, used for reporting
/// * `sequence` - raw sequence, T is read as U
/// * `dot_bracket` - the structure to evaluate
/// * `config` - energy model settings
/// # Errors
/// * if the sequence or structure is invalid, or they do not fit together
pub fn evaluate_record(name: &str, sequence: &[u8], dot_bracket: &str, config: FoldConfig) -> anyhow::Result<EnergyLog> {
    let model = build_sequence_model(name, sequence, &config)?;
    let structure = Structure::from_dot_bracket(dot_bracket)
        .with_context(|| format!("Error while parsing structure for {name:?}"))?;
    structure.validate_against(model.sequence())
        .with_context(|| format!("Structure does not fit sequence {name:?}"))?;
    let evaluation = evaluate_structure(&model, &structure)?;
    Ok(EnergyLog::from_evaluation(name, &decode_sequence(model.sequence()), &structure, &evaluation, &model))
}

#[cfg(test)]
mod tests {
    use approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_solve_fold_record() {
        let config = FoldConfigBuilder::default()
            .dangles(Dangles::None)
            .build().unwrap();
        let report = solve_fold_record("hairpin", b"GGGAAACCC", config).unwrap();
        assert_eq!(report.sequence, "GGGAAACCC");
        assert_eq!(report.mfe.structure.to_dot_bracket(), "(((...)))");
        assert_approx_eq!(report.mfe.energy, -1.2);
        assert_approx_eq!(report.mfe_log.total, -1.2);
        assert!(report.ensemble.is_none());
    }

    #[test]
    fn test_fold_with_ensemble() {
        let config = FoldConfigBuilder::default()
            .enable_partition(true)
            .num_samples(5)
            .seed(3)
            .build().unwrap();
        let report = solve_fold_record("dna_input", b"GGGGAAAACCCCATATGGGGAAAACCCCA", config).unwrap();
        // T is converted
        assert!(!report.sequence.contains('T'));
        let ensemble = report.ensemble.unwrap();
        assert!(ensemble.stats.ensemble_energy <= report.mfe.energy);
        assert!(ensemble.stats.mfe_frequency > 0.0 && ensemble.stats.mfe_frequency <= 1.0);
        assert_eq!(ensemble.samples.len(), 5);
        assert!(ensemble.samples.iter().all(|s| s.energy >= report.mfe.energy - 1e-9));
        assert!(ensemble.centroid.energy >= report.mfe.energy - 1e-9);
        assert!(ensemble.mea.energy >= report.mfe.energy - 1e-9);
        assert!(ensemble.pair_probabilities.iter().all(|&(_i, _j, p)| p > config.bpp_cutoff()));
    }

    #[test]
    fn test_temperature_changes_energy() {
        let cold = FoldConfigBuilder::default().temperature(20.0).build().unwrap();
        let hot = FoldConfigBuilder::default().temperature(60.0).build().unwrap();
        let sequence = b"GGGGAAAACCCC";
        let cold_report = solve_fold_record("cold", sequence, cold).unwrap();
        let hot_report = solve_fold_record("hot", sequence, hot).unwrap();
        assert!(cold_report.mfe.energy < hot_report.mfe.energy);
    }

    #[test]
    fn test_solve_subopt_record() {
        let report = solve_subopt_record("s", b"GGGGAAAACCCCAUAUGGGGAAAACCCC", FoldConfig::default(), 2.0, None).unwrap();
        assert!(!report.structures.is_empty());
        let mfe = report.structures[0].energy;
        assert!(report.structures.iter().all(|s| s.energy <= mfe + 2.0 + 1e-9));

        let capped = solve_subopt_record("s", b"GGGGAAAACCCCAUAUGGGGAAAACCCC", FoldConfig::default(), 2.0, Some(1)).unwrap();
        assert_eq!(capped.structures.len(), 1);
        assert!(solve_subopt_record("s", b"GGGG", FoldConfig::default(), -1.0, None).is_err());
    }

    #[test]
    fn test_solve_alifold() {
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGGAAAACCCC".to_vec()),
            ("s2".to_string(), b"GCGGAAAACCGC".to_vec()),
            ("s3".to_string(), b"GAGGAAAACCUC".to_vec()),
        ]).unwrap();
        let config = AlifoldConfigBuilder::default()
            .fold_config(FoldConfigBuilder::default().enable_partition(true).build().unwrap())
            .build().unwrap();
        let report = solve_alifold(&alignment, config).unwrap();
        // column 1 is G/C/A, the tie goes to A
        assert_eq!(report.consensus, "GAGGAAAACCCC");
        assert_eq!(report.names.len(), 3);
        assert_approx_eq!(report.free_energy + report.covariance, report.mfe.energy);
        assert!(report.ensemble.is_some());
    }

    #[test]
    fn test_alifold_compensatory_pairs() {
        // five GC-type pairs closing an AAAA loop; columns 1/12 and 3/10 flip GC <-> CG in one row each
        let alignment = MultipleAlignment::new(vec![
            ("s1".to_string(), b"GGGGGAAAACCCCC".to_vec()),
            ("s2".to_string(), b"GCGGGAAAACCCGC".to_vec()),
            ("s3".to_string(), b"GGGCGAAAAGCCCC".to_vec()),
        ]).unwrap();
        let report = solve_alifold(&alignment, AlifoldConfig::default()).unwrap();
        assert_eq!(report.consensus, "GGGGGAAAACCCCC");
        assert_eq!(report.mfe.structure.to_string(), "(((((....)))))");

        // each flipped column pair scores round(100 * 4 / 3) = 133
        assert!(report.covariance < 0.0);
        assert_approx_eq!(report.covariance, -2.66);
        assert_approx_eq!(report.free_energy + report.covariance, report.mfe.energy);
    }

    #[test]
    fn test_single_row_alifold_matches_fold() {
        let sequence = b"GGGAUACGAAAGCGUAUCCCAAUGC";
        let alignment = MultipleAlignment::new(vec![("only".to_string(), sequence.to_vec())]).unwrap();
        let ali_report = solve_alifold(&alignment, AlifoldConfig::default()).unwrap();
        let report = solve_fold_record("only", sequence, FoldConfig::default()).unwrap();
        assert_eq!(ali_report.mfe.structure, report.mfe.structure);
        assert_approx_eq!(ali_report.mfe.energy, report.mfe.energy);
        assert_eq!(ali_report.covariance, 0.0);
    }

    #[test]
    fn test_evaluate_record() {
        let log = evaluate_record("e", b"GGGAAACCC", "(((...)))", FoldConfigBuilder::default().dangles(Dangles::None).build().unwrap()).unwrap();
        assert_approx_eq!(log.total, -1.2);
        assert_eq!(log.loops.len(), 4);

        // non-canonical pair
        assert!(evaluate_record("e", b"GGGAAAACC", "(((...)))", FoldConfig::default()).is_err());
        // length mismatch
        assert!(evaluate_record("e", b"GGGAAACCC", "(((....)))", FoldConfig::default()).is_err());
    }
}
