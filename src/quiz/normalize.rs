//! Answer normalization.
//!
//! Turns a raw title or guess into the key used for comparisons: lower case,
//! no whitespace, only ASCII word characters and Hangul syllables, and
//! everything from the first `(` or `-` on is dropped as "extra info"
//! (`"Title (Remix)"` and `"Title - Live"` both become `"title"`).

const EXTRA_INFO_DELIMITERS: [char; 2] = ['(', '-'];

pub fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || is_hangul_syllable(c)
        || c == '('
        || c == ')'
        || c == '-'
}

/// Total over all inputs and idempotent.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw.to_lowercase().chars().filter(|c| is_kept(*c)).collect();

    match cleaned.find(EXTRA_INFO_DELIMITERS) {
        Some(cut) => cleaned[..cut].to_string(),
        None => cleaned,
    }
}
