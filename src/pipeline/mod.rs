//! Unified configuration for text extraction tuning.
//!
//! Document-type-specific extraction parameters (word boundary detection,
//! spacing thresholds, bold-marker behavior) live here, consolidated from
//! what used to be scattered across several extractor-local config structs.

pub mod config;

pub use config::{
    BoldMarkerBehavior, LogLevel, OutputConfig, ReadingOrderConfig, ReadingOrderStrategyType,
    SpacingConfig, TextPipelineConfig, TjThresholdConfig, WordBoundaryMode,
};
