//! Real-time audio feature extraction for lumikey.
//!
//! One [`FeatureEngine`] per audio stream: feed it one hop of samples at a
//! time and get back a [`lk_core::FeatureFrame`] of lighting-ready values.

pub mod batch;
pub mod decode;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod fft;
pub mod normalizer;
pub mod onset;
pub mod ring;
pub mod section;
pub mod tempo;

pub use batch::{BatchAnalyzer, analyze_file};
pub use engine::FeatureEngine;
pub use error::AudioError;
