//! CJK punctuation boundary scoring.
//!
//! Ideographic punctuation (sentence-ending marks, enumeration commas, bracket
//! pairs) attaches tightly to the preceding character and does not participate
//! in the normal geometric/TJ spacing heuristics. This module scores a code
//! point's affinity for starting a word boundary so that callers can decide
//! how confidently to split there.

/// Return a confidence score in `[0.0, 1.0]` that `code` should be treated as
/// a word-boundary-creating punctuation mark.
///
/// `density` optionally carries a document-wide CJK punctuation density
/// measurement (reserved for future tuning); unused for now.
pub fn get_cjk_punctuation_boundary_score(code: u32, _density: Option<f32>) -> f32 {
    match code {
        // Sentence-ending punctuation: strong boundary signal.
        0x3002 // IDEOGRAPHIC FULL STOP
        | 0xFF01 // FULLWIDTH EXCLAMATION MARK
        | 0xFF1F // FULLWIDTH QUESTION MARK
        | 0xFF0C // FULLWIDTH COMMA
        | 0x3001 // IDEOGRAPHIC COMMA
        | 0xFF1B // FULLWIDTH SEMICOLON
        | 0xFF1A => 0.95, // FULLWIDTH COLON

        // Closing brackets/quotes: attach to what precedes them, but still
        // mark a boundary before the next token.
        0x3009 | 0x300B | 0x300D | 0x300F | 0x3011 | 0x3015 | 0xFF09 | 0x300A | 0x300C | 0x300E
        | 0x3010 | 0x3014 | 0xFF08 => 0.9,

        _ => 0.0,
    }
}
