// src/utils/slug.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static NON_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid")
});

/// Lowercases the text and turns every run of characters outside `[a-z0-9]`
/// into a single hyphen, trimming hyphens from both ends. Non-ASCII letters
/// are not transliterated, so a name written only in them yields `""`.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Like [`slugify`] but rejects text that leaves nothing behind.
pub fn require_slug(text: &str) -> Result<String, AppError> {
    let slug = slugify(text);
    if slug.is_empty() {
        return Err(AppError::Validation(format!(
            "'{}' does not contain any letters or digits to build a slug from.",
            text
        )));
    }
    Ok(slug)
}

/// Picks `base`, or the first of `base-2`, `base-3`, ... not in `taken`.
pub fn next_free_slug<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_becomes_hyphenated_lowercase() {
        assert_eq!(slugify("Data Structures"), "data-structures");
        assert_eq!(slugify("  C++ & Rust: Basics!  "), "c-rust-basics");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }

    #[test]
    fn punctuation_only_is_rejected() {
        assert_eq!(slugify("?!"), "");
        assert!(require_slug("?!").is_err());

        assert_eq!(slugify("Алгебра"), "");
        assert!(matches!(require_slug("Алгебра"), Err(AppError::Validation(_))));
        assert_eq!(slugify("Алгебра 101"), "101");
    }

    #[test]
    fn suffix_skips_taken_candidates() {
        assert_eq!(next_free_slug("algebra", ["geometry"]), "algebra");
        assert_eq!(next_free_slug("algebra", ["algebra"]), "algebra-2");
        assert_eq!(
            next_free_slug("algebra", ["algebra", "algebra-2", "algebra-3"]),
            "algebra-4"
        );
    }
}
