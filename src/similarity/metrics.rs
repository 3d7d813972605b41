//! Pure string similarity metrics.
//!
//! All functions take `(expected, found)`: `expected` is the (normalized) query
//! or query token, `found` the candidate value. Bigger is better. None of them
//! return NaN; degenerate inputs score `0.0`.

use std::collections::HashMap;

/// Number of leading characters shared by both strings.
pub fn common_prefix(expected: &str, found: &str) -> f64 {
    expected
        .chars()
        .zip(found.chars())
        .take_while(|(a, b)| a == b)
        .count() as f64
}

/// Length of `found` if it is a prefix of `expected`, else `0`.
///
/// Used for relation keys: a relation whose value is a prefix of the query
/// covers every member the query could match.
pub fn strict_prefix(expected: &str, found: &str) -> f64 {
    if expected.starts_with(found) {
        found.chars().count() as f64
    } else {
        0.0
    }
}

fn bigrams(s: &str) -> impl Iterator<Item = (char, char)> + '_ {
    s.chars().zip(s.chars().skip(1))
}

/// Dice-like coefficient that only looks for the bigrams of `expected` in
/// `found`, so longer results are not penalized while the query is still
/// incomplete.
pub fn asymmetric_dice(expected: &str, found: &str) -> f64 {
    let mut wanted: HashMap<(char, char), usize> = HashMap::new();
    for bigram in bigrams(expected) {
        *wanted.entry(bigram).or_insert(0) += 1;
    }
    let distinct = wanted.len().max(1);

    let mut intersection = 0usize;
    for bigram in bigrams(found) {
        if let Some(count) = wanted.get_mut(&bigram) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    intersection as f64 / distinct as f64
}

/// Map each character to `max_len - first_index`, so earlier occurrences weigh more.
fn first_occurrence(term: &[char], max_len: usize) -> HashMap<char, f64> {
    let mut map = HashMap::new();
    for (i, c) in term.iter().enumerate().rev() {
        map.insert(*c, (max_len - i) as f64);
    }
    map
}

/// Cosine similarity of first-occurrence vectors: characters that appear
/// early in both strings pull the score towards `1.0`.
pub fn fuzzy_index(expected: &str, found: &str) -> f64 {
    let a: Vec<char> = expected.chars().collect();
    let b: Vec<char> = found.chars().collect();
    let max_len = a.len().max(b.len());
    let va = first_occurrence(&a, max_len);
    let vb = first_occurrence(&b, max_len);

    let dot: f64 = va
        .iter()
        .filter_map(|(c, x)| vb.get(c).map(|y| x * y))
        .sum();
    let norm_a = va.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = vb.values().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Common prefix length plus [`fuzzy_index`].
pub fn fuzzy_prefix(expected: &str, found: &str) -> f64 {
    common_prefix(expected, found) + fuzzy_index(expected, found)
}

/// For every whitespace token of `expected`, take the best score `metric`
/// gives against any token of `found`; sum those maxima.
pub fn tokenwise(metric: impl Fn(&str, &str) -> f64, expected: &str, found: &str) -> f64 {
    let found_tokens: Vec<&str> = found.split_whitespace().collect();
    expected
        .split_whitespace()
        .map(|e| {
            found_tokens
                .iter()
                .map(|f| metric(e, f))
                .fold(0.0, f64::max)
        })
        .sum()
}

/// How many of `expected`'s tokens occur in `found` as whole tokens.
///
/// One token may be matched as a prefix only (the one still being typed).
/// Repeated query tokens must be present as often as they are repeated.
pub fn token_coverage(expected: &str, found: &str) -> f64 {
    const PREFIX_TOLERANCE: usize = 1;

    let mut wanted: Vec<(&str, usize)> = Vec::new();
    for token in expected.split_whitespace() {
        match wanted.iter_mut().find(|(t, _)| *t == token) {
            Some((_, n)) => *n += 1,
            None => wanted.push((token, 1)),
        }
    }

    let found_tokens: Vec<&str> = found.split_whitespace().collect();
    let mut prefix_matches = 0usize;
    let mut score = 0usize;
    for (token, expected_count) in wanted {
        let mut count = 0usize;
        for found_token in &found_tokens {
            if *found_token == token {
                count += 1;
            } else if prefix_matches < PREFIX_TOLERANCE && found_token.starts_with(token) {
                prefix_matches += 1;
                count += 1;
            }
        }
        if count >= expected_count {
            score += expected_count;
        }
    }
    score as f64
}

/// Negative character length: shorter values rank first.
pub fn shortest_first(_expected: &str, found: &str) -> f64 {
    -(found.chars().count() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_counts_chars() {
        assert_eq!(common_prefix("ann", "anne"), 3.0);
        assert_eq!(common_prefix("anne", "ann"), 3.0);
        assert_eq!(common_prefix("bob", "anne"), 0.0);
        assert_eq!(common_prefix("", "anne"), 0.0);
        assert_eq!(common_prefix("éa", "éb"), 1.0);
    }

    #[test]
    fn strict_prefix_requires_found_to_prefix_expected() {
        assert_eq!(strict_prefix("anne", "an"), 2.0);
        assert_eq!(strict_prefix("an", "anne"), 0.0);
        assert_eq!(strict_prefix("anne", ""), 0.0);
    }

    #[test]
    fn dice_counts_expected_bigrams_only() {
        // "ann" has bigrams {an, nn}; "anne" contains both.
        assert_eq!(asymmetric_dice("ann", "anne"), 1.0);
        assert_eq!(asymmetric_dice("ann", "xyz"), 0.0);
        // Single character has no bigrams: 0 / max(0, 1).
        assert_eq!(asymmetric_dice("a", "anne"), 0.0);
    }

    #[test]
    fn dice_respects_multiplicity() {
        // "aaa" → {aa: 2}; "aa" has one "aa".
        assert_eq!(asymmetric_dice("aaa", "aa"), 1.0);
        assert_eq!(asymmetric_dice("aaa", "aaa"), 2.0);
    }

    #[test]
    fn fuzzy_index_identical_is_one() {
        let s = fuzzy_index("anne", "anne");
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_index_empty_is_zero() {
        assert_eq!(fuzzy_index("", "anne"), 0.0);
        assert_eq!(fuzzy_index("", ""), 0.0);
    }

    #[test]
    fn fuzzy_index_disjoint_is_zero() {
        assert_eq!(fuzzy_index("abc", "xyz"), 0.0);
    }

    #[test]
    fn tokenwise_sums_best_per_expected_token() {
        let score = tokenwise(common_prefix, "van gogh", "vincent van gogh");
        assert_eq!(score, 3.0 + 4.0);
    }

    #[test]
    fn tokenwise_empty_expected_is_zero() {
        assert_eq!(tokenwise(common_prefix, "", "anne"), 0.0);
        assert_eq!(tokenwise(common_prefix, "   ", "anne"), 0.0);
    }

    #[test]
    fn token_coverage_tolerates_one_prefix() {
        assert_eq!(token_coverage("frank ann", "frank anne"), 2.0);
        // Two incomplete tokens: only one may be a prefix match.
        assert_eq!(token_coverage("fra ann", "frank anne"), 1.0);
        assert_eq!(token_coverage("anne anne", "anne"), 0.0);
    }

    #[test]
    fn shortest_first_is_negative_length() {
        assert_eq!(shortest_first("x", "anne"), -4.0);
    }
}
