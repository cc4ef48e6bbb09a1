use serde::{Serialize, Serializer};
use std::fmt;

use crate::data_types::nucleotides::{Nucleotide, PairType};

/// Minimum number of unpaired bases enclosed by a hairpin
pub const MIN_HAIRPIN_SIZE: usize = 3;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StructureError {
    #[error("unsupported character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("unmatched ')' at position {position}")]
    UnmatchedClose { position: usize },
    #[error("unmatched '(' at position {position}")]
    UnmatchedOpen { position: usize },
    #[error("structure length {structure_len} does not match sequence length {sequence_len}")]
    LengthMismatch { structure_len: usize, sequence_len: usize },
    #[error("positions {i} and {j} cannot form a pair")]
    InvalidPair { i: usize, j: usize },
    #[error("hairpin closed by ({i}, {j}) has fewer than 3 unpaired bases")]
    HairpinTooShort { i: usize, j: usize },
    #[error("pairs ({i}, {j}) and ({k}, {l}) cross or share a position")]
    Crossing { i: usize, j: usize, k: usize, l: usize },
}

/// A pseudoknot-free secondary structure stored as a pair table.
/// `pair_table[i] == Some(j)` iff `pair_table[j] == Some(i)`.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Structure {
    pair_table: Vec<Option<usize>>
}

impl Structure {
    /// Creates the open chain (no pairs) of a given length
    pub fn unpaired(length: usize) -> Self {
        Self {
            pair_table: vec![None; length]
        }
    }

    /// Builds a structure from a list of 0-based pairs `(i, j)` with `i < j`.
    /// # Errors
    /// * if any pair is out of range, has i >= j, shares a position with another pair, or crosses another pair
    pub fn from_pairs(length: usize, pairs: &[(usize, usize)]) -> Result<Self, StructureError> {
        let mut pair_table = vec![None; length];
        for &(i, j) in pairs.iter() {
            if i >= j || j >= length {
                return Err(StructureError::InvalidPair { i, j });
            }
            for p in [i, j] {
                if let Some(other) = pair_table[p] {
                    let (k, l) = if p < other { (p, other) } else { (other, p) };
                    return Err(StructureError::Crossing { i, j, k, l });
                }
            }
            pair_table[i] = Some(j);
            pair_table[j] = Some(i);
        }

        // a single stack pass finds any crossing pairs
        let mut stack: Vec<usize> = vec![];
        for (p, partner) in pair_table.iter().enumerate() {
            match partner {
                Some(q) if *q > p => stack.push(p),
                Some(q) => {
                    let top = stack.pop();
                    if top != Some(*q) {
                        let k = top.unwrap_or(*q);
                        let l = pair_table[k].unwrap_or(p);
                        return Err(StructureError::Crossing { i: *q, j: p, k, l });
                    }
                },
                None => {}
            }
        }

        Ok(Self { pair_table })
    }

    /// Parses dot-bracket notation.
    /// # Errors
    /// * if the string contains anything other than `(`, `)`, and `.`
    /// * if the brackets are unbalanced
    pub fn from_dot_bracket(dot_bracket: &str) -> Result<Self, StructureError> {
        let mut pair_table = vec![None; dot_bracket.chars().count()];
        let mut stack: Vec<usize> = vec![];
        for (position, character) in dot_bracket.chars().enumerate() {
            match character {
                '(' => stack.push(position),
                ')' => {
                    let open = stack.pop()
                        .ok_or(StructureError::UnmatchedClose { position })?;
                    pair_table[open] = Some(position);
                    pair_table[position] = Some(open);
                },
                '.' => {},
                _ => return Err(StructureError::InvalidCharacter { character, position })
            }
        }

        if let Some(&position) = stack.last() {
            return Err(StructureError::UnmatchedOpen { position });
        }
        Ok(Self { pair_table })
    }

    /// Renders the structure in dot-bracket notation
    pub fn to_dot_bracket(&self) -> String {
        self.pair_table.iter().enumerate()
            .map(|(i, partner)| match partner {
                Some(j) if *j > i => '(',
                Some(_) => ')',
                None => '.'
            })
            .collect()
    }

    /// Checks that every pair is canonical for `sequence` and that hairpins are long enough
    /// # Errors
    /// * if the lengths differ
    /// * if a pair is not canonical
    /// * if a pair encloses fewer than `MIN_HAIRPIN_SIZE` bases
    pub fn validate_against(&self, sequence: &[Nucleotide]) -> Result<(), StructureError> {
        if self.len() != sequence.len() {
            return Err(StructureError::LengthMismatch {
                structure_len: self.len(), sequence_len: sequence.len()
            });
        }
        for (i, j) in self.pairs() {
            if PairType::from_bases(sequence[i], sequence[j]).is_none() {
                return Err(StructureError::InvalidPair { i, j });
            }
            if j - i - 1 < MIN_HAIRPIN_SIZE {
                return Err(StructureError::HairpinTooShort { i, j });
            }
        }
        Ok(())
    }

    /// All pairs `(i, j)` with `i < j`, ordered by `i`
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        self.pair_table.iter().enumerate()
            .filter_map(|(i, partner)| match partner {
                Some(j) if *j > i => Some((i, *j)),
                _ => None
            })
            .collect()
    }

    /// Base-pair distance: the number of pairs in exactly one of the two structures
    /// # Panics
    /// * if the structures have different lengths
    pub fn bp_distance(&self, other: &Structure) -> usize {
        assert_eq!(self.len(), other.len(), "structures must have equal length");
        self.pair_table.iter().zip(other.pair_table.iter()).enumerate()
            .map(|(i, (p1, p2))| {
                if p1 == p2 {
                    0
                } else {
                    usize::from(p1.is_some_and(|j| j > i)) + usize::from(p2.is_some_and(|j| j > i))
                }
            })
            .sum()
    }

    /// Partner of position `i`, if any
    pub fn partner(&self, i: usize) -> Option<usize> {
        self.pair_table[i]
    }

    pub fn num_pairs(&self) -> usize {
        self.pair_table.iter().filter(|p| p.is_some()).count() / 2
    }

    pub fn len(&self) -> usize {
        self.pair_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pair_table.is_empty()
    }

    pub fn pair_table(&self) -> &[Option<usize>] {
        &self.pair_table
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dot_bracket())
    }
}

// structures always serialize as dot-bracket strings
impl Serialize for Structure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dot_bracket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::nucleotides::encode_sequence;

    #[test]
    fn test_dot_bracket() {
        let structure = Structure::from_dot_bracket("((..((...))..))").unwrap();
        assert_eq!(structure.len(), 15);
        assert_eq!(structure.pairs(), vec![(0, 14), (1, 13), (4, 10), (5, 9)]);
        assert_eq!(structure.partner(4), Some(10));
        assert_eq!(structure.partner(2), None);
        assert_eq!(structure.num_pairs(), 4);
        assert_eq!(structure.to_dot_bracket(), "((..((...))..))");
        assert_eq!(format!("{structure}"), "((..((...))..))");
    }

    #[test]
    fn test_dot_bracket_errors() {
        assert_eq!(Structure::from_dot_bracket("(()"), Err(StructureError::UnmatchedOpen { position: 0 }));
        assert_eq!(Structure::from_dot_bracket("())"), Err(StructureError::UnmatchedClose { position: 2 }));
        assert_eq!(Structure::from_dot_bracket("(.x)"), Err(StructureError::InvalidCharacter { character: 'x', position: 2 }));
    }

    #[test]
    fn test_from_pairs() {
        let structure = Structure::from_pairs(9, &[(1, 7), (0, 8)]).unwrap();
        assert_eq!(structure.to_dot_bracket(), "((.....))");

        // crossing
        assert!(matches!(Structure::from_pairs(10, &[(0, 5), (2, 8)]), Err(StructureError::Crossing { .. })));
        // shared position
        assert!(matches!(Structure::from_pairs(10, &[(0, 5), (5, 9)]), Err(StructureError::Crossing { .. })));
        // reversed
        assert_eq!(Structure::from_pairs(10, &[(5, 0)]), Err(StructureError::InvalidPair { i: 5, j: 0 }));
    }

    #[test]
    fn test_bp_distance() {
        let s1 = Structure::from_dot_bracket("(((...)))").unwrap();
        let s2 = Structure::from_dot_bracket("((.....))").unwrap();
        let s3 = Structure::from_dot_bracket(".((...)).").unwrap();
        let open = Structure::unpaired(9);
        assert_eq!(s1.bp_distance(&s1), 0);
        assert_eq!(s1.bp_distance(&s2), 1);
        assert_eq!(s1.bp_distance(&open), 3);
        assert_eq!(s1.bp_distance(&s3), 1);
        assert_eq!(s2.bp_distance(&s3), 2);
    }

    #[test]
    fn test_validate_against() {
        let sequence = encode_sequence(b"GGGAAACCC").unwrap();
        let good = Structure::from_dot_bracket("(((...)))").unwrap();
        assert!(good.validate_against(&sequence).is_ok());

        let bad_pair = Structure::from_dot_bracket(".(((.))).").unwrap();
        assert_eq!(bad_pair.validate_against(&sequence), Err(StructureError::InvalidPair { i: 3, j: 5 }));

        let short = Structure::from_dot_bracket("((.))").unwrap();
        let short_sequence = encode_sequence(b"GGACC").unwrap();
        assert_eq!(short.validate_against(&short_sequence), Err(StructureError::HairpinTooShort { i: 1, j: 3 }));

        let wrong_len = Structure::unpaired(4);
        assert!(matches!(wrong_len.validate_against(&sequence), Err(StructureError::LengthMismatch { .. })));
    }
}
