/// Multiple sequence alignments and their consensus
pub mod alignment;
/// Plain-text loop energy breakdowns of a structure
pub mod energy_log;
/// Serializable results of the folding commands
pub mod fold_results;
/// Nucleotide and pair-type encodings
pub mod nucleotides;
/// Secondary structures as pair tables and dot-bracket strings
pub mod structure;
