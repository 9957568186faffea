//! Policy configuration error types.
//!
//! Configuration inconsistency is a programming/config error and fails fast
//! at load time, never mid-run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keyframe table is empty")]
    EmptyKeyframeTable,

    #[error("Keyframe budget {0} is not a finite non-negative number")]
    InvalidKeyframeBudget(f64),

    #[error("Keyframe field `{field}` decreases at budget {budget}")]
    NonMonotonicKeyframe { field: &'static str, budget: f64 },

    #[error("Keyframe at budget {budget} is invalid: {reason}")]
    InvalidKeyframe { budget: f64, reason: String },

    #[error("Capital weight for `{department}` is invalid: {weight}")]
    InvalidWeight { department: String, weight: f64 },

    #[error("Capital weights sum to {0}; expected a value in (0, 1.5]")]
    WeightSumOutOfRange(f64),
}

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
