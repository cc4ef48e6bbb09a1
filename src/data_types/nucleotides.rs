/// Nucleotides understood by the energy model.
/// Anything that cannot take part in a pair (gaps, N, IUPAC codes we do not resolve) is collapsed into `N`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Nucleotide {
    A=0,
    C,
    G,
    U,
    /// Unknown or gap, never pairs and never contributes dangles or mismatches
    N // make sure N is always the last one in the list
}

/// The canonical pair types, plus a non-standard placeholder that only the alignment model uses
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum PairType {
    CG=0,
    GC,
    GU,
    UG,
    AU,
    UA,
    /// Two nucleotides in paired alignment columns that cannot pair in this particular row
    NS
}

#[derive(thiserror::Error, Debug)]
pub enum SequenceError {
    #[error("unsupported character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("sequence is empty")]
    EmptySequence,
}

/// Number of `Nucleotide` variants, used to size tables
pub const NUM_NUCLEOTIDES: usize = 5;
/// Number of `PairType` variants, used to size tables
pub const NUM_PAIR_TYPES: usize = 7;

impl Nucleotide {
    /// Converts a single character, `T` is treated as `U`.
    /// Gap characters and `N` become `Nucleotide::N`.
    pub fn from_char(c: char) -> Option<Nucleotide> {
        match c.to_ascii_uppercase() {
            'A' => Some(Nucleotide::A),
            'C' => Some(Nucleotide::C),
            'G' => Some(Nucleotide::G),
            'U' | 'T' => Some(Nucleotide::U),
            'N' | '-' | '.' | '_' | '~' => Some(Nucleotide::N),
            _ => None
        }
    }

    /// Returns the printable character for this nucleotide
    pub fn to_char(&self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
            Nucleotide::U => 'U',
            Nucleotide::N => 'N'
        }
    }

    /// Index into the energy tables
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl PairType {
    /// Returns the pair type for a 5' nucleotide `a` pairing with a 3' nucleotide `b`, if the pair is canonical.
    pub fn from_bases(a: Nucleotide, b: Nucleotide) -> Option<PairType> {
        use Nucleotide::*;
        match (a, b) {
            (C, G) => Some(PairType::CG),
            (G, C) => Some(PairType::GC),
            (G, U) => Some(PairType::GU),
            (U, G) => Some(PairType::UG),
            (A, U) => Some(PairType::AU),
            (U, A) => Some(PairType::UA),
            _ => None
        }
    }

    /// Same as `from_bases`, but falls back to `PairType::NS` for anything non-canonical
    pub fn from_bases_or_ns(a: Nucleotide, b: Nucleotide) -> PairType {
        PairType::from_bases(a, b).unwrap_or(PairType::NS)
    }

    /// Returns true for the pairs that receive the terminal AU/GU penalty
    pub fn is_weak(&self) -> bool {
        match self {
            PairType::GU |
            PairType::UG |
            PairType::AU |
            PairType::UA |
            PairType::NS => true,

            PairType::CG |
            PairType::GC => false,
        }
    }

    /// Index into the energy tables
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Short label like "GC", used by the energy logs
    pub fn label(&self) -> &'static str {
        match self {
            PairType::CG => "CG",
            PairType::GC => "GC",
            PairType::GU => "GU",
            PairType::UG => "UG",
            PairType::AU => "AU",
            PairType::UA => "UA",
            PairType::NS => "NS",
        }
    }
}

/// Converts raw sequence bytes into nucleotides.
/// Whitespace is not allowed here; callers should strip it beforehand.
/// # Arguments
/// * `sequence` - the raw sequence, case-insensitive
/// # Errors
/// * if the sequence is empty
/// * if any character is not a nucleotide, `N`, or a gap
pub fn encode_sequence(sequence: &[u8]) -> Result<Vec<Nucleotide>, SequenceError> {
    if sequence.is_empty() {
        return Err(SequenceError::EmptySequence);
    }

    sequence.iter().enumerate()
        .map(|(position, &b)| {
            let character = b as char;
            Nucleotide::from_char(character)
                .ok_or(SequenceError::InvalidCharacter { character, position })
        })
        .collect()
}

/// Converts nucleotides back into an RNA string
pub fn decode_sequence(sequence: &[Nucleotide]) -> String {
    sequence.iter().map(|n| n.to_char()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sequence() {
        let encoded = encode_sequence(b"acgTn-").unwrap();
        assert_eq!(encoded, vec![
            Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::U, Nucleotide::N, Nucleotide::N
        ]);
        assert_eq!(decode_sequence(&encoded), "ACGUNN");
    }

    #[test]
    fn test_encode_errors() {
        assert!(matches!(encode_sequence(b""), Err(SequenceError::EmptySequence)));
        match encode_sequence(b"ACGX") {
            Err(SequenceError::InvalidCharacter { character, position }) => {
                assert_eq!(character, 'X');
                assert_eq!(position, 3);
            },
            other => panic!("unexpected result: {other:?}")
        }
    }

    #[test]
    fn test_pair_types() {
        use Nucleotide::*;
        assert_eq!(PairType::from_bases(G, C), Some(PairType::GC));
        assert_eq!(PairType::from_bases(U, G), Some(PairType::UG));
        assert_eq!(PairType::from_bases(A, A), None);
        assert_eq!(PairType::from_bases(N, U), None);
        assert_eq!(PairType::from_bases_or_ns(A, C), PairType::NS);
        assert!(PairType::AU.is_weak());
        assert!(!PairType::CG.is_weak());
    }
}
