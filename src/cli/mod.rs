/// Settings for consensus folding of an alignment
pub mod alifold;
/// Shared core functionality and the top-level command parser
pub mod core;
/// Settings for loop-by-loop energy evaluation
pub mod eval;
/// Settings for MFE and ensemble folding
pub mod fold;
/// Settings for suboptimal structure enumeration
pub mod subopt;
