/// Loop decomposition of a structure into per-loop energies
pub mod eval;
/// Free functions that score individual loops of a single sequence
pub mod loops;
/// The energy model trait that all folding algorithms are written against
pub mod model;
/// Nearest-neighbor parameter tables and temperature rescaling
pub mod parameters;
