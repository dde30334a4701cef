//! String canonicalization for cross-alphabet, case-insensitive matching.
//!
//! Every name-variant row stores both the literal string and its normalized
//! form; the resolver falls back to the normalized form when an exact lookup
//! misses. Changes here invalidate stored `name_str_norm` columns.

use any_ascii::any_ascii;
use unicode_normalization::UnicodeNormalization;

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Normalize a string for matching: NFKD decomposition with combining marks
/// removed, remaining non-ASCII transliterated, then lowercased.
/// e.g., "Fauré" → "faure", "Dvořák" → "dvorak"
///
/// Total function: any input maps to some ASCII-ish lowercase string.
pub fn norm(s: &str) -> String {
    let stripped: String = s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    any_ascii(&stripped).to_lowercase()
}
