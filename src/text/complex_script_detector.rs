//! Boundary handling for complex (non-Latin, non-CJK) scripts that use
//! combining vowel signs and virama/conjunct characters.

use super::CharacterInfo;

/// A complex script family requiring special combining-mark handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexScript {
    /// Devanagari (Hindi, Marathi, Sanskrit).
    Devanagari,
    /// Thai.
    Thai,
    /// Khmer.
    Khmer,
    /// Tamil.
    Tamil,
    /// Telugu.
    Telugu,
    /// Kannada.
    Kannada,
    /// Malayalam.
    Malayalam,
    /// Bengali.
    Bengali,
}

/// Classify a code point into a complex script family, if applicable.
pub fn detect_complex_script(code: u32) -> Option<ComplexScript> {
    match code {
        0x0900..=0x097F => Some(ComplexScript::Devanagari),
        0x0E00..=0x0E7F => Some(ComplexScript::Thai),
        0x1780..=0x17FF => Some(ComplexScript::Khmer),
        0x0B80..=0x0BFF => Some(ComplexScript::Tamil),
        0x0C00..=0x0C7F => Some(ComplexScript::Telugu),
        0x0C80..=0x0CFF => Some(ComplexScript::Kannada),
        0x0D00..=0x0D7F => Some(ComplexScript::Malayalam),
        0x0980..=0x09FF => Some(ComplexScript::Bengali),
        _ => None,
    }
}

/// Devanagari virama (U+094D) joins the following consonant into a
/// conjunct; matras (vowel signs) attach to the preceding consonant.
pub fn handle_devanagari_boundary(
    prev_char: &CharacterInfo,
    curr_char: &CharacterInfo,
) -> Option<bool> {
    const VIRAMA: u32 = 0x094D;
    const MATRA_START: u32 = 0x093E;
    const MATRA_END: u32 = 0x094C;

    if prev_char.code == VIRAMA {
        return Some(false);
    }
    if (MATRA_START..=MATRA_END).contains(&curr_char.code) {
        return Some(false);
    }
    None
}

/// Thai has no inter-word spaces; tone marks and vowel signs above/below the
/// base consonant never start a new word.
pub fn handle_thai_boundary(prev_char: &CharacterInfo, curr_char: &CharacterInfo) -> Option<bool> {
    const TONE_MARK_START: u32 = 0x0E48;
    const TONE_MARK_END: u32 = 0x0E4B;
    const VOWEL_SIGN_START: u32 = 0x0E31;
    const VOWEL_SIGN_END: u32 = 0x0E3A;

    if (TONE_MARK_START..=TONE_MARK_END).contains(&curr_char.code)
        || (VOWEL_SIGN_START..=VOWEL_SIGN_END).contains(&curr_char.code)
    {
        return Some(false);
    }
    let _ = prev_char;
    None
}

/// Khmer COENG (U+17D2) forms a subscript consonant stack with what
/// follows; dependent vowels attach to the preceding consonant.
pub fn handle_khmer_boundary(
    prev_char: &CharacterInfo,
    curr_char: &CharacterInfo,
) -> Option<bool> {
    const COENG: u32 = 0x17D2;
    const VOWEL_START: u32 = 0x17B6;
    const VOWEL_END: u32 = 0x17C8;

    if prev_char.code == COENG {
        return Some(false);
    }
    if (VOWEL_START..=VOWEL_END).contains(&curr_char.code) {
        return Some(false);
    }
    None
}

/// Shared rule for the South Asian Indic scripts (Tamil, Telugu, Kannada,
/// Malayalam, Bengali): dependent vowel signs and virama-like joiners stay
/// attached to the preceding base consonant.
pub fn handle_indic_boundary(
    prev_char: &CharacterInfo,
    curr_char: &CharacterInfo,
) -> Option<bool> {
    // Dependent vowel signs and viramas sit in the 0xxE-0xxF / 0xx4D-ish
    // offsets relative to each block's base; checking the low nibble range
    // that all of these scripts share is sufficient for boundary purposes.
    let offset = curr_char.code & 0x7F;
    if (0x3E..=0x4D).contains(&offset) {
        return Some(false);
    }
    let _ = prev_char;
    None
}
