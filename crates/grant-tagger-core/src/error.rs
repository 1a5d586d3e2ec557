//! Error taxonomy for grant submission and tag resolution.
//!
//! Each variant maps to one HTTP status in the server:
//!
//! | Variant | Status | Raised when |
//! |---------|--------|-------------|
//! | [`Validation`](TaggerError::Validation) | 400 | malformed body, missing field, bad URL |
//! | [`Configuration`](TaggerError::Configuration) | 400 | sources supplied but no LLM credential |
//! | [`Conflict`](TaggerError::Conflict) | 409 | duplicate `grant_name` |
//! | [`Upstream`](TaggerError::Upstream) | 400 | LLM failure while sources were supplied |
//! | [`Store`](TaggerError::Store) | 500 | persistence failure |

use crate::store::InsertError;

#[derive(Debug, thiserror::Error)]
pub enum TaggerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Conflict(String),

    #[error("language model request failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<InsertError> for TaggerError {
    fn from(err: InsertError) -> Self {
        match err {
            InsertError::DuplicateName(name) => {
                TaggerError::Conflict(format!("grant_name '{}' already exists.", name))
            }
            InsertError::Other(e) => TaggerError::Store(e),
        }
    }
}

pub type Result<T, E = TaggerError> = std::result::Result<T, E>;
