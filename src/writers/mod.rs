/*!
# Writers module
Contains the logic for writing the output files and console output of each command.
*/
/// Gzipped base-pair probability lists
pub mod bpp;
/// RNAfold-style text rendering of results
pub mod console;
/// Plain-text loop energy breakdowns
pub mod energy_log;
/// Generates one row per suboptimal structure
pub mod subopt;
/// Generates the summary file; each line corresponds to a folded record
pub mod summary;
