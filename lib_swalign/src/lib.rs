pub mod aligner;
pub mod alignment_matrix;
pub mod alignment_result;
pub mod enumerator;
pub mod error;
pub mod score;
pub mod scoring_model;
