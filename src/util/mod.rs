/// Helper functions for reading/writing plain, gzipped, and JSON files
pub mod file_io;
/// Helper functions for generating the progress bars
pub mod progress_bar;
