//! Configuration for PDF processing.

// use std::path::PathBuf; // Will be used later

/// PDF processing configuration.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Enable ML features.
    pub use_ml: bool,

    /// Enable table detection ML.
    pub table_ml: bool,

    /// Enable OCR.
    pub ocr: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            use_ml: false,
            table_ml: false,
            ocr: false,
        }
    }

    /// Enable ML features.
    pub fn with_ml(mut self, enable: bool) -> Self {
        self.use_ml = enable;
        self
    }

    /// Enable table detection ML.
    pub fn with_table_ml(mut self, enable: bool) -> Self {
        self.table_ml = enable;
        self
    }

    /// Enable OCR.
    pub fn with_ocr(mut self, enable: bool) -> Self {
        self.ocr = enable;
        self
    }
}

/// Coarse document classification used to select text-extraction thresholds.
///
/// Produced by [`crate::text::document_classifier::DocumentClassifier`] from
/// a sample of extracted text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// Academic papers, theses, dense technical writing.
    Academic,
    /// Legal or policy documents with justified, section-numbered text.
    Policy,
    /// Forms with field labels, checkboxes and short lines.
    Form,
    /// No single type dominates, or the document is too short to classify.
    Mixed,
}

/// Extraction thresholds tuned for a particular kind of document.
///
/// These parameters feed [`crate::extractors::TextExtractionConfig::with_profile`],
/// controlling how aggressively gaps between glyphs are treated as word
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionProfile {
    /// TJ array offset (in thousandths of em) below which a gap is treated
    /// as an explicit space. More negative = more conservative.
    pub tj_offset_threshold: f32,
    /// Geometric gap threshold as a fraction of the average glyph width.
    pub word_margin_ratio: f32,
    /// Whether to additionally adapt the TJ threshold from font metrics.
    pub use_adaptive_threshold: bool,
}

impl ExtractionProfile {
    /// Balanced defaults used when no document-type signal is available.
    pub const CONSERVATIVE: ExtractionProfile = ExtractionProfile {
        tj_offset_threshold: -120.0,
        word_margin_ratio: 0.1,
        use_adaptive_threshold: true,
    };

    /// Dense academic text: tighter spacing, more aggressive space insertion.
    pub const ACADEMIC: ExtractionProfile = ExtractionProfile {
        tj_offset_threshold: -130.0,
        word_margin_ratio: 0.12,
        use_adaptive_threshold: true,
    };

    /// Justified legal/policy text: wider margins to avoid merging columns.
    pub const POLICY: ExtractionProfile = ExtractionProfile {
        tj_offset_threshold: -110.0,
        word_margin_ratio: 0.18,
        use_adaptive_threshold: true,
    };

    /// Forms: conservative thresholds that avoid merging adjacent fields.
    pub const FORM: ExtractionProfile = ExtractionProfile {
        tj_offset_threshold: -120.0,
        word_margin_ratio: 0.2,
        use_adaptive_threshold: false,
    };

    /// Select the profile tuned for a given document type.
    pub fn for_document_type(doc_type: DocumentType) -> ExtractionProfile {
        match doc_type {
            DocumentType::Academic => Self::ACADEMIC,
            DocumentType::Policy => Self::POLICY,
            DocumentType::Form => Self::FORM,
            DocumentType::Mixed => Self::CONSERVATIVE,
        }
    }
}
