//! Configuration, types, and shared structures for lumikey.
//!
//! This crate contains the band definitions, engine configuration, and the
//! per-hop output record shared across the lumikey workspace.

pub mod band;
pub mod config;
pub mod error;
pub mod features;
pub mod timeline;

pub use band::{Aggregation, BandDef, Percussion, VisualBand};
pub use config::EngineConfig;
pub use error::CoreError;
pub use features::{FEATURE_NAMES, FeatureFrame};
pub use timeline::{FeatureTimeline, TimelineSummary};
