//! Unicode-aware, case-insensitive comparison for `Literal` qualifier
//! values, grounded on the teacher's default-caseless-matching helper.

use caseless::Caseless;
use unicode_normalization::UnicodeNormalization;

/// Map input characters into their collated form, which ignores casing and
/// is unicode-normalized. Follows the conformance guidelines in Unicode
/// TR #13.13, "Default Caseless Matching".
pub fn collate<I>(i: I) -> impl Iterator<Item = char>
where
    I: Iterator<Item = char>,
{
    i.nfd().default_case_fold().nfkc()
}

/// Compares two strings under default caseless matching.
pub fn eq_caseless(a: &str, b: &str) -> bool {
    collate(a.chars()).eq(collate(b.chars()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn caseless_matching_ignores_case_and_composition() {
        assert!(eq_caseless("Dark", "DARK"));
        assert!(eq_caseless("a\u{0045}\u{0300}", "aè"));
        assert!(!eq_caseless("dark", "light"));
    }
}
