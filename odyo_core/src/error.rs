//! Error types for the audiometry core.
//!
//! The decision paths (threshold lookup, tone presentation, plateau detection)
//! never fail; these errors cover case validation, config loading, and the
//! scoring precondition.

use thiserror::Error;

use crate::types::PointKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Required audiogram points were not marked before scoring.
    #[error("Incomplete submission: {} required point(s) unmarked", missing.len())]
    Incomplete { missing: Vec<PointKey> },

    /// Patient case violates the threshold invariants.
    #[error("Invalid case: {0}")]
    InvalidCase(String),

    /// Configuration value out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
