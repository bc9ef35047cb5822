use thiserror::Error;

/// Result type for wire3d operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Malformed OBJ records and degenerate geometry are not errors: they are
/// skipped or defaulted, logged, and counted in the import report.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Projection matrix is not invertible")]
    SingularProjection,

    #[error("Cannot attach a body beneath itself or one of its descendants")]
    HierarchyCycle,
}
