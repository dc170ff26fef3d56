//! Right-to-left script boundary detection (Arabic, Hebrew).

use super::{BoundaryContext, CharacterInfo};

/// Arabic, Arabic Supplement, Arabic Presentation Forms.
fn is_arabic(code: u32) -> bool {
    (0x0600..=0x06FF).contains(&code)
        || (0x0750..=0x077F).contains(&code)
        || (0xFB50..=0xFDFF).contains(&code)
        || (0xFE70..=0xFEFF).contains(&code)
}

/// Hebrew block, including presentation forms.
fn is_hebrew(code: u32) -> bool {
    (0x0590..=0x05FF).contains(&code) || (0xFB1D..=0xFB4F).contains(&code)
}

fn is_rtl(code: u32) -> bool {
    is_arabic(code) || is_hebrew(code)
}

/// Arabic combining marks (harakat) attach to the base letter and never start
/// a new word on their own.
fn is_arabic_combining_mark(code: u32) -> bool {
    (0x064B..=0x065F).contains(&code) || code == 0x0670
}

/// Decide whether an RTL-aware boundary should be created between two
/// characters. Returns `None` when neither character is RTL, deferring to
/// the caller's other heuristics.
pub fn should_split_at_rtl_boundary(
    prev_char: &CharacterInfo,
    curr_char: &CharacterInfo,
    _context: Option<&BoundaryContext>,
) -> Option<bool> {
    let prev_rtl = is_rtl(prev_char.code);
    let curr_rtl = is_rtl(curr_char.code);

    if !prev_rtl && !curr_rtl {
        return None;
    }

    // Combining marks never start a boundary.
    if is_arabic_combining_mark(curr_char.code) {
        return Some(false);
    }

    // A transition between RTL and non-RTL text is a script boundary.
    if prev_rtl != curr_rtl {
        return Some(true);
    }

    None
}
