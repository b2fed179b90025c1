//! Turning free-form model output into one structured answer.
//!
//! Each model's text goes through extraction, optional repair and
//! normalization; the surviving answers are then reconciled.

pub mod aggregator;
pub mod extract;
pub mod normalize;
pub mod repair;
pub mod scorer;

pub use aggregator::process;
pub use scorer::{heuristic_score, score_explanation};

use thiserror::Error;

/// Why a model's output could not be turned into a canonical response.
///
/// These never escape the aggregator; a failing model simply contributes
/// nothing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("JSON could not be repaired")]
    Unrepairable,

    #[error("JSON value is not an object")]
    NotAnObject,

    #[error("score is not numeric: {0}")]
    InvalidScore(String),
}
