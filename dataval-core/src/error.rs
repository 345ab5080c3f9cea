//! Error taxonomy for the valuation engine
//!
//! Engine functions return `ValuationError`; orchestration code (config
//! loading, input files) wraps it in `anyhow` with file context.
//!
//! An empty risk register is not an error; it resolves to the best-case
//! risk coefficient.

/// Errors raised by the pure valuation functions and the stage machine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("invalid grade {value:?} (expected A, B, C or 5, 3, 0)")]
    InvalidGrade { value: String },

    #[error("invalid coefficient letter {value:?} (expected A, B, C, D or E)")]
    InvalidLetter { value: String },

    #[error("the data name must be filled in before leaving the preparation stage")]
    MissingIdentity,

    #[error("slider value for {criterion} must be between 0 and 5 (got {value})")]
    InvalidSliderValue { criterion: String, value: u8 },

    #[error("{field} must be 1, 2 or 3 (got {value})")]
    InvalidRiskLevel { field: &'static str, value: u8 },

    #[error("stage {requested} cannot run while stage {current} is active")]
    StageMismatch { requested: u8, current: u8 },

    #[error("stage {value} does not exist (expected 1 to 7)")]
    InvalidStage { value: u8 },

    #[error("table {table} has {expected} criteria but {actual} grades were supplied")]
    GradeCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, ValuationError>;
