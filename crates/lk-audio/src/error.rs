use lk_core::CoreError;
use thiserror::Error;

/// Errors originating from the audio module.
///
/// Every variant is local to one `update` call: the engine state is left as
/// it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Frame length or channel count does not match the configured hop.
    #[error(
        "Frame invalide : {got} échantillons pour {channels} canal(aux), attendu {expected} par canal"
    )]
    InvalidInputShape {
        /// Samples per channel expected (the hop length).
        expected: usize,
        /// Total samples received.
        got: usize,
        /// Channel count received.
        channels: usize,
    },

    /// Input contained NaN or infinite samples.
    #[error("Échantillon non fini à l'index {index}")]
    NumericDegenerate {
        /// Index of the first offending sample in the interleaved input.
        index: usize,
    },

    /// Engine configuration rejected.
    #[error(transparent)]
    Config(#[from] CoreError),
}
