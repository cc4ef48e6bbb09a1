/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Loads sequences and alignments from FASTA files
pub mod fasta;
