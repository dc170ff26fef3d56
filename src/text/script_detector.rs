//! CJK script identification and language-specific boundary rules.

use super::CharacterInfo;

/// Which CJK script family a code point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CjkScript {
    /// Han ideographs, shared by Chinese, Japanese and Korean text.
    Han,
    /// Japanese Hiragana syllabary.
    Hiragana,
    /// Japanese Katakana syllabary.
    Katakana,
    /// Korean Hangul syllables.
    Hangul,
}

/// Document-level language hint, used to pick language-specific boundary rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLanguage {
    /// Japanese (Hiragana/Katakana/Han mix).
    Japanese,
    /// Korean (Hangul, occasionally mixed with Han).
    Korean,
    /// Chinese (Han only) or unclassified CJK.
    Chinese,
}

/// Classify a code point by CJK script family, if it belongs to one.
pub fn detect_cjk_script(code: u32) -> Option<CjkScript> {
    match code {
        0x3040..=0x309F => Some(CjkScript::Hiragana),
        0x30A0..=0x30FF => Some(CjkScript::Katakana),
        0xAC00..=0xD7AF => Some(CjkScript::Hangul),
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0x2CEB0..=0x2EBEF => Some(CjkScript::Han),
        _ => None,
    }
}

/// Japanese-specific boundary handling: Hiragana particles and Han compounds
/// tend to run together, while transitions between Katakana (loanwords) and
/// other scripts are natural breaks.
pub fn handle_japanese_text(
    _prev_char: &CharacterInfo,
    _curr_char: &CharacterInfo,
    prev_script: Option<CjkScript>,
    curr_script: Option<CjkScript>,
) -> Option<bool> {
    match (prev_script, curr_script) {
        (Some(CjkScript::Katakana), Some(s)) if s != CjkScript::Katakana => Some(true),
        (Some(s), Some(CjkScript::Katakana)) if s != CjkScript::Katakana => Some(true),
        _ => None,
    }
}

/// Korean-specific boundary handling: Hangul syllable blocks already encode
/// word-internal structure, so transitions to/from Han (Hanja) are the main
/// signal worth splitting on.
pub fn handle_korean_text(
    _prev_char: &CharacterInfo,
    _curr_char: &CharacterInfo,
    prev_script: Option<CjkScript>,
    curr_script: Option<CjkScript>,
) -> Option<bool> {
    match (prev_script, curr_script) {
        (Some(CjkScript::Hangul), Some(CjkScript::Han))
        | (Some(CjkScript::Han), Some(CjkScript::Hangul)) => Some(true),
        _ => None,
    }
}

/// Generic script-transition rule used for Chinese text or when the document
/// language is unknown: a transition between two different CJK scripts is a
/// boundary, a transition within the same script is not.
pub fn should_split_on_script_transition(
    prev_script: Option<CjkScript>,
    curr_script: Option<CjkScript>,
    _language: Option<DocumentLanguage>,
) -> Option<bool> {
    match (prev_script, curr_script) {
        (Some(p), Some(c)) if p != c => Some(true),
        (Some(_), Some(_)) => Some(false),
        _ => None,
    }
}
