use thiserror::Error;

/// Common error types for the towerdemo tooling layer.
///
/// The playback engine itself never returns errors across its action
/// boundary; these cover the edges that legitimately can fail, i.e. catalog
/// construction, configuration, and scenario file handling.
#[derive(Error, Debug)]
pub enum DemoError {
    #[error("Unknown scenario: '{id}'")]
    UnknownScenario { id: String },

    #[error("Scenario file error: {message}")]
    ScenarioFile { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
