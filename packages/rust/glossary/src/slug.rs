//! Term → ID slugs.

/// Slugify a glossary term for use as its ID.
///
/// Lowercases, drops apostrophes, collapses every run of characters outside
/// `[a-z0-9]` into one hyphen and trims hyphens from both ends:
/// `"Ohm's Law"` → `"ohms-law"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.to_lowercase().chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}') {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
