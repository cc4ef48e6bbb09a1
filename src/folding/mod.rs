/// Centroid structure of the Boltzmann ensemble
pub mod centroid;
/// Dense pair-indexed matrices shared by the dynamic programming engines
pub mod matrix;
/// Maximum expected accuracy structures
pub mod mea;
/// Minimum free energy fill and backtracking
pub mod mfe;
/// McCaskill partition function and base-pair probabilities
pub mod partition;
/// Stochastic backtracking from the partition function
pub mod sampling;
/// Suboptimal structure enumeration
pub mod subopt;
