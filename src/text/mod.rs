//! Text-extraction support: word boundary detection, script awareness and
//! ligature expansion.
//!
//! [`word_boundary`] implements the spec-compliant (ISO 32000-1:2008 Section
//! 9.4.4) word boundary algorithm that the core text extractor runs on every
//! decoded character. The script-specific submodules (`rtl_detector`,
//! `script_detector`, `complex_script_detector`, `cjk_punctuation`) supply the
//! per-script rules it dispatches to; [`ligature_processor`] expands ligature
//! glyphs into searchable component letters; [`document_classifier`]
//! classifies a page's text so extraction can pick tuned thresholds.

pub mod cjk_punctuation;
pub mod complex_script_detector;
pub mod document_classifier;
pub mod hyphenation;
pub mod ligature_processor;
pub mod rtl_detector;
pub mod script_detector;
pub mod word_boundary;

pub use word_boundary::{
    detect_word_boundaries, BoundaryContext, CharacterInfo, DocumentScript, WordBoundaryDetector,
};
