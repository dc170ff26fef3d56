//! Ligature expansion for searchable text extraction.
//!
//! PDF fonts frequently substitute a single ligature glyph (U+FB00-U+FB06)
//! for common letter pairs such as "fi" or "ffl". Keeping the ligature
//! code point makes extracted text harder to search and copy, so by default
//! extraction expands ligatures back into their component letters, splitting
//! the original glyph width proportionally across the components.

use super::{BoundaryContext, CharacterInfo};

/// Whether a ligature glyph should be expanded into its component letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LigatureDecision {
    /// Expand the ligature into its component characters.
    Split,
    /// Leave the ligature glyph as a single character.
    Keep,
}

/// Decides whether a given ligature character should be split.
pub struct LigatureDecisionMaker;

impl LigatureDecisionMaker {
    /// Decide how to handle a ligature character.
    ///
    /// Ligatures with no known component expansion are kept as-is since
    /// splitting them would discard information with no replacement.
    pub fn decide(
        char_info: &CharacterInfo,
        _context: &BoundaryContext,
        _next_char: Option<&CharacterInfo>,
    ) -> LigatureDecision {
        let Some(ligature_char) = char::from_u32(char_info.code) else {
            return LigatureDecision::Keep;
        };
        if get_ligature_components(ligature_char).is_some() {
            LigatureDecision::Split
        } else {
            LigatureDecision::Keep
        }
    }
}

/// Return the plain-letter expansion of a ligature character, if known.
pub fn get_ligature_components(ch: char) -> Option<&'static str> {
    match ch {
        '\u{FB00}' => Some("ff"),
        '\u{FB01}' => Some("fi"),
        '\u{FB02}' => Some("fl"),
        '\u{FB03}' => Some("ffi"),
        '\u{FB04}' => Some("ffl"),
        '\u{FB05}' => Some("st"),
        '\u{FB06}' => Some("st"),
        _ => None,
    }
}

/// Expand a ligature character into `(component_char, width)` pairs whose
/// widths sum to `original_width`, split evenly across the components.
pub fn expand_ligature_to_chars(ligature_char: char, original_width: f32) -> Vec<(char, f32)> {
    let Some(components) = get_ligature_components(ligature_char) else {
        return Vec::new();
    };
    let count = components.chars().count().max(1);
    let component_width = original_width / count as f32;
    components
        .chars()
        .map(|c| (c, component_width))
        .collect()
}
