//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or preset selection failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ecosim_core::ConfigError,
    },

    /// The engine could not be built from the configuration.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: ecosim_core::SimulationError,
    },

    /// Writing the final report failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing the final report failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
