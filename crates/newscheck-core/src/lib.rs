//! NewsCheck Core
//!
//! Core types and error handling shared across NewsCheck components.
//!
//! This crate provides:
//! - The error taxonomy used by model loading and inference
//! - Prediction and explanation result types returned to callers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ExplanationResult, InputSource, PredictionResult, TermContribution,
    DEFAULT_ABSTAIN_THRESHOLD, DEFAULT_TOP_K,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ExplanationResult, PredictionResult, TermContribution};
}
