//! Lightweight document-type classification from extracted text lines.
//!
//! A first extraction pass samples a page's text lines and classifies the
//! document so the second pass can select extraction thresholds tuned to
//! that document type (see [`crate::config::ExtractionProfile`]).

use crate::config::DocumentType;

/// Counts gathered while scanning lines, useful for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationStats {
    /// Number of lines inspected.
    pub line_count: usize,
    /// Lines that look like form fields (short, colon- or box-terminated).
    pub form_like_lines: usize,
    /// Lines containing policy/legal section markers.
    pub policy_markers: usize,
    /// Lines containing academic markers (citations, abstract, references).
    pub academic_markers: usize,
}

/// Classifies a document from a sample of extracted text lines.
pub struct DocumentClassifier;

impl DocumentClassifier {
    /// Classify a document type from an iterator of text lines.
    ///
    /// Returns the best-guess [`DocumentType`] along with the stats used to
    /// make the decision.
    pub fn classify_lines<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> (DocumentType, ClassificationStats) {
        let mut stats = ClassificationStats::default();

        for line in lines {
            stats.line_count += 1;
            let trimmed = line.trim();

            if trimmed.len() < 40
                && (trimmed.ends_with(':') || trimmed.ends_with('\u{2610}') || trimmed.is_empty())
            {
                stats.form_like_lines += 1;
            }

            let lower = trimmed.to_lowercase();
            if lower.starts_with("section")
                || lower.starts_with("article")
                || trimmed.contains('\u{00A7}')
                || lower.starts_with("whereas")
            {
                stats.policy_markers += 1;
            }

            if lower.starts_with("abstract")
                || lower.starts_with("references")
                || lower.contains("et al.")
                || lower.contains("doi:")
            {
                stats.academic_markers += 1;
            }
        }

        if stats.line_count == 0 {
            return (DocumentType::Mixed, stats);
        }

        let form_ratio = stats.form_like_lines as f32 / stats.line_count as f32;

        let doc_type = if form_ratio > 0.4 {
            DocumentType::Form
        } else if stats.academic_markers > 0 {
            DocumentType::Academic
        } else if stats.policy_markers > 0 {
            DocumentType::Policy
        } else {
            DocumentType::Mixed
        };

        (doc_type, stats)
    }
}
