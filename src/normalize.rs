//! Query and value normalization.
//!
//! Queries and candidate values are normalized the same way before scoring,
//! so "Météri" matches "meteri". The raw strings are kept for display and for
//! highlighting offsets.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Anything that is not a letter, a number or a separator.
static STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\p{Z}]").expect("valid regex"));

/// A pure string normalization function.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, input: &str) -> String;
}

/// Trim, lowercase, NFKD-decompose, then drop everything that is not a
/// letter, number or separator (which removes the combining diacritics).
#[derive(Debug, Clone, Copy, Default)]
pub struct Nfkd;

impl Normalizer for Nfkd {
    fn normalize(&self, input: &str) -> String {
        let lowered = input.trim().to_lowercase();
        let decomposed: String = lowered.nfkd().collect();
        STRIP.replace_all(&decomposed, "").into_owned()
    }
}

impl<F> Normalizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, input: &str) -> String {
        self(input)
    }
}
