use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Requested output key is not part of the feature record.
    #[error("Feature inconnue : {name}")]
    UnknownFeature {
        /// The key that was looked up.
        name: String,
    },
}
