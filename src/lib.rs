/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Nearest neighbor energy model and structure evaluation
pub mod energy;
/// Per-record orchestration of the folding algorithms
pub mod fold_solver;
/// Dynamic programming engines for MFE, suboptimal, and ensemble folding
pub mod folding;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
