use serde::Serialize;
use strum_macros::EnumString;

use crate::data_types::nucleotides::{Nucleotide, PairType};
use crate::energy::parameters::EnergyParameters;

/// Controls how unpaired neighbors of a helix end are scored in exterior and multi loops
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum Dangles {
    /// No dangling end contributions (d0)
    #[strum(ascii_case_insensitive, serialize = "none")]
    #[clap(name = "none")]
    None,
    /// Both neighbors always dangle, regardless of their own pairing state (d2)
    #[default]
    #[strum(ascii_case_insensitive, serialize = "double")]
    #[clap(name = "double")]
    Double,
}

/// Energy of the hairpin closed by (i, j)
/// # Arguments
/// * `params` - the energy parameters
/// * `sequence` - the sequence the loop lives in
/// * `i` - 5' position of the closing pair
/// * `j` - 3' position of the closing pair
pub fn hairpin_energy(params: &EnergyParameters, sequence: &[Nucleotide], i: usize, j: usize) -> i32 {
    let pair_type = PairType::from_bases_or_ns(sequence[i], sequence[j]);
    let size = j - i - 1;
    let mut energy = params.loop_initiation(&params.hairpin, size);

    if size == 3 {
        // triloops get the terminal penalty instead of a mismatch
        energy += params.terminal_penalty(pair_type);
    } else {
        energy += params.hairpin_mismatch_energy(pair_type, sequence[i+1], sequence[j-1]);
    }

    if sequence[i+1..j].iter().all(|&n| n == Nucleotide::C) {
        energy += if size == 3 {
            params.c_hairpin3
        } else {
            params.c_hairpin_slope * size as i32 + params.c_hairpin_intercept
        };
    }
    energy
}

/// Energy of the loop between outer pair (i, j) and inner pair (k, l); covers stacks, bulges, and interior loops
/// # Arguments
/// * `params` - the energy parameters
/// * `sequence` - the sequence the loop lives in
/// * `i`, `j` - the outer (closing) pair
/// * `k`, `l` - the inner pair, with i < k < l < j
pub fn interior_energy(params: &EnergyParameters, sequence: &[Nucleotide], i: usize, j: usize, k: usize, l: usize) -> i32 {
    let outer_type = PairType::from_bases_or_ns(sequence[i], sequence[j]);
    // the inner pair is read from inside the loop, so it is reversed
    let inner_type = PairType::from_bases_or_ns(sequence[l], sequence[k]);
    let n1 = k - i - 1;
    let n2 = j - l - 1;

    if n1 == 0 && n2 == 0 {
        params.stack_energy(outer_type, inner_type)
    } else if n1 == 0 || n2 == 0 {
        let size = n1 + n2;
        let mut energy = params.loop_initiation(&params.bulge, size);
        if size == 1 {
            // single bulges keep the stack across them
            energy += params.stack_energy(outer_type, inner_type);
        } else {
            energy += params.terminal_penalty(outer_type) + params.terminal_penalty(inner_type);
        }
        energy
    } else {
        let size = n1 + n2;
        let asymmetry = (params.ninio * n1.abs_diff(n2) as i32).min(params.max_ninio);
        let mut energy = params.loop_initiation(&params.interior, size) + asymmetry;
        if n1 == 1 || n2 == 1 {
            // 1x1, 1x2, and 1xn loops only get the closure penalties
            energy += params.interior_closure_penalty(outer_type) + params.interior_closure_penalty(inner_type);
        } else {
            energy += params.interior_mismatch_energy(outer_type, sequence[i+1], sequence[j-1]);
            energy += params.interior_mismatch_energy(inner_type, sequence[l+1], sequence[k-1]);
        }
        energy
    }
}

/// Dangle contributions for a helix end, given its 5' and 3' neighbors (if any)
fn dangle_energy(params: &EnergyParameters, dangles: Dangles, pair_type: PairType, five_prime: Option<Nucleotide>, three_prime: Option<Nucleotide>) -> i32 {
    match dangles {
        Dangles::None => 0,
        Dangles::Double => {
            five_prime.map(|n| params.dangle5_energy(pair_type, n)).unwrap_or(0) +
                three_prime.map(|n| params.dangle3_energy(pair_type, n)).unwrap_or(0)
        }
    }
}

/// Energy of a helix (i, j) branching off the exterior loop
pub fn exterior_stem_energy(params: &EnergyParameters, dangles: Dangles, sequence: &[Nucleotide], i: usize, j: usize) -> i32 {
    let pair_type = PairType::from_bases_or_ns(sequence[i], sequence[j]);
    let five_prime = if i > 0 { Some(sequence[i-1]) } else { None };
    let three_prime = sequence.get(j+1).copied();
    params.terminal_penalty(pair_type) + dangle_energy(params, dangles, pair_type, five_prime, three_prime)
}

/// Energy of a helix (i, j) branching off a multiloop, including the per-branch penalty
pub fn multi_stem_energy(params: &EnergyParameters, dangles: Dangles, sequence: &[Nucleotide], i: usize, j: usize) -> i32 {
    let pair_type = PairType::from_bases_or_ns(sequence[i], sequence[j]);
    let five_prime = if i > 0 { Some(sequence[i-1]) } else { None };
    let three_prime = sequence.get(j+1).copied();
    params.ml_intern + params.terminal_penalty(pair_type) + dangle_energy(params, dangles, pair_type, five_prime, three_prime)
}

/// Energy of closing a multiloop with (i, j): closing penalty plus the closing pair seen as a branch from inside
pub fn multi_closing_energy(params: &EnergyParameters, dangles: Dangles, sequence: &[Nucleotide], i: usize, j: usize) -> i32 {
    let reversed_type = PairType::from_bases_or_ns(sequence[j], sequence[i]);
    params.ml_closing + params.ml_intern + params.terminal_penalty(reversed_type) +
        dangle_energy(params, dangles, reversed_type, Some(sequence[j-1]), Some(sequence[i+1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;

    #[test]
    fn test_hairpin_energy() {
        let params = EnergyParameters::default();
        let sequence = encode_sequence(b"GGGAAACCC").unwrap();
        // (2, 6) closes a GC triloop: 540 + no penalty
        assert_eq!(hairpin_energy(&params, &sequence, 2, 6), 540);
        // (1, 7) closes a 5-loop GC with mismatch G..C: 570 - 150
        assert_eq!(hairpin_energy(&params, &sequence, 1, 7), 420);

        let poly_c = encode_sequence(b"GCCCCC").unwrap();
        // GC pair around CCCC: 560 - 150 + 30*4 + 160
        assert_eq!(hairpin_energy(&params, &poly_c, 0, 5), 690);

        let au_triloop = encode_sequence(b"AGAAU").unwrap();
        assert_eq!(hairpin_energy(&params, &au_triloop, 0, 4), 540 + 50);
    }

    #[test]
    fn test_interior_energy() {
        let params = EnergyParameters::default();
        let sequence = encode_sequence(b"GGGAAACCC").unwrap();
        // 5'-GG-3'/3'-CC-5' stack
        assert_eq!(interior_energy(&params, &sequence, 0, 8, 1, 7), -330);

        // bulge of size 1 keeps the stack: G(0)-C(9) over G(1)-C(7), bulge at 8
        let bulged = encode_sequence(b"GGGAAACCAC").unwrap();
        assert_eq!(interior_energy(&params, &bulged, 0, 9, 1, 7), 380 - 330);

        // 1x1 interior loop: G(0)-C(10) with A(1) and A(9), inner G(2)-C(8)
        let mismatch = encode_sequence(b"GAGGAAACCAC").unwrap();
        assert_eq!(interior_energy(&params, &mismatch, 0, 10, 2, 8), 50);

        // 2x2 interior loop
        let generic = encode_sequence(b"GGAGGAAACCAGC").unwrap();
        // outer G(0)-C(12), inner G(3)-C(9); n1 = 2 (G, A), n2 = 2 (A, G)
        // outer mismatch (seq[1]=G, seq[11]=G) -> GG bonus; inner mismatch (seq[10]=A, seq[2]=A) -> none
        assert_eq!(interior_energy(&params, &generic, 0, 12, 3, 9), 110 - 100);
    }

    #[test]
    fn test_stem_energies() {
        let params = EnergyParameters::default();
        let sequence = encode_sequence(b"AGGGAAACCCA").unwrap();
        // GC pair at (1, 9) with A on both sides
        let d2 = exterior_stem_energy(&params, Dangles::Double, &sequence, 1, 9);
        assert_eq!(d2, -20 + -170);
        let d0 = exterior_stem_energy(&params, Dangles::None, &sequence, 1, 9);
        assert_eq!(d0, 0);

        let ml = multi_stem_energy(&params, Dangles::None, &sequence, 1, 9);
        assert_eq!(ml, -90);

        // closing (1, 9) seen from inside is CG with 5' neighbor C(8) and 3' neighbor G(2)
        let closing = multi_closing_energy(&params, Dangles::Double, &sequence, 1, 9);
        assert_eq!(closing, 930 - 90 + -30 + -130);
    }
}
