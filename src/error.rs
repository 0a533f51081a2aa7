//! Error types for the core crate.
//!
//! Mirrors the teacher's per-concern `thiserror` enums (see
//! `traits/labels.rs`, `visits/mod.rs` in the webgraph-rs source) rather
//! than a single catch-all `anyhow::Error`; the CLI adapter wraps these
//! with `anyhow::Context` instead.

use thiserror::Error;

/// Errors produced by the hypergraph grammar core.
#[derive(Error, Debug)]
pub enum Error {
    /// A hyperedge line or CLI pattern could not be parsed.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The on-disk file failed a structural check (magic, lengths, VByte).
    #[error("structural file error: {0}")]
    StructuralFile(String),

    /// A rank exceeded `LIMIT_MAX_RANK` or another hard capacity.
    #[error("capacity exceeded: {what} ({value} > {limit})")]
    CapacityExceeded {
        what: &'static str,
        value: u64,
        limit: u64,
    },

    /// A handle or iterator was used out of its allowed lifecycle state.
    #[error("state violation: {0}")]
    StateViolation(&'static str),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
