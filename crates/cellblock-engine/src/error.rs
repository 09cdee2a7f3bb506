//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and replay so that
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cellblock_core::ConfigError,
    },

    /// The damage registry rejected an operation.
    #[error("damage registry error: {source}")]
    Damage {
        /// The underlying registry error.
        #[from]
        source: cellblock_core::DamageError,
    },

    /// Reading the scenario failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A scenario line is not a valid step.
    #[error("scenario line {line}: {source}")]
    Scenario {
        /// One-based line number in the scenario.
        line: usize,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Scenario steps must be listed in tick order.
    #[error("scenario line {line}: tick {tick} comes after tick {previous}")]
    OutOfOrder {
        /// One-based line number in the scenario.
        line: usize,
        /// Tick of the offending step.
        tick: u64,
        /// Tick of the step before it.
        previous: u64,
    },
}
