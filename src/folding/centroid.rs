use crate::data_types::structure::Structure;
use crate::folding::partition::PartitionFunction;

/// The centroid of the ensemble and its expected distance to it
#[derive(Clone, Debug)]
pub struct CentroidStructure {
    pub structure: Structure,
    /// Expected base-pair distance between the centroid and a structure drawn from the ensemble
    pub distance: f64
}

/// Builds the centroid structure, which contains exactly the pairs with probability above one half.
/// Two such pairs can never cross or share a position, so the result is always a valid structure.
/// # Errors
/// * if the probable pairs do not form a valid structure, which indicates broken probabilities
pub fn centroid_structure(pf: &PartitionFunction) -> anyhow::Result<CentroidStructure> {
    let all_pairs = pf.pair_list(0.0);
    let centroid_pairs: Vec<(usize, usize)> = all_pairs.iter()
        .filter(|&&(_i, _j, p)| p > 0.5)
        .map(|&(i, j, _p)| (i, j))
        .collect();
    let structure = Structure::from_pairs(pf.len(), &centroid_pairs)?;

    // pairs in the centroid count 1 - p, every other pair counts p
    let distance = all_pairs.iter()
        .map(|&(_i, _j, p)| if p > 0.5 { 1.0 - p } else { p })
        .sum();

    Ok(CentroidStructure {
        structure,
        distance
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;
    use crate::energy::loops::Dangles;
    use crate::energy::model::SequenceModel;
    use crate::energy::parameters::{EnergyParameters, MAXLOOP};
    use crate::folding::mfe::fold_mfe;

    #[test]
    fn test_centroid() {
        let model = SequenceModel::new(encode_sequence(b"GGGGGAAAACCCCCAUAUAUGCGCAAAAGCGCA").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let (_arrays, mfe) = fold_mfe(&model).unwrap();
        let pf = PartitionFunction::compute(&model, mfe.energy).unwrap();
        let centroid = centroid_structure(&pf).unwrap();

        for (i, j) in centroid.structure.pairs() {
            assert!(pf.probability(i, j) > 0.5);
        }
        assert!(centroid.distance >= 0.0);

        // the distance matches the definition written against the pair table
        let mut expected = 0.0;
        for (i, j, p) in pf.pair_list(0.0) {
            if centroid.structure.partner(i) == Some(j) {
                expected += 1.0 - p;
            } else {
                expected += p;
            }
        }
        assert!((centroid.distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unstructured_centroid() {
        let model = SequenceModel::new(encode_sequence(b"AAAAAAAAAA").unwrap(), EnergyParameters::default(), Dangles::Double, MAXLOOP);
        let pf = PartitionFunction::compute(&model, 0).unwrap();
        let centroid = centroid_structure(&pf).unwrap();
        assert_eq!(centroid.structure.to_dot_bracket(), "..........");
        assert_eq!(centroid.distance, 0.0);
    }
}
