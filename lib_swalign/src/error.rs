use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("The scoring parameter '{name}' has the invalid value {value}: {reason}.")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        reason: &'static str,
    },

    #[error(
        "A substitution matrix over an alphabet of {alphabet_length} characters needs {expected} scores, but {actual} were given."
    )]
    InvalidMatrixSize {
        alphabet_length: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Aligning sequences of length {sequence_a_length} and {sequence_b_length} requires more memory than the limit of {limit} bytes."
    )]
    DimensionOverflow {
        sequence_a_length: usize,
        sequence_b_length: usize,
        limit: usize,
    },
}
