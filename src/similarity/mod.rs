//! Similarity configurations and lexicographic score vectors.
//!
//! A [`SimilarityConfiguration`] pairs a scoring strategy with an optional
//! eligibility filter. An ordered list of configurations defines a comparison
//! vector: candidates are compared stage by stage, the first differing stage
//! decides. The same mechanism drives both traversal prioritization (which
//! relation to follow next) and final result ranking.
//!
//! Ineligibility is explicit: [`SimilarityConfiguration::evaluate`] returns
//! `None`, and a [`ScoreVector`] only ever contains real scores.

pub mod metrics;
pub mod presets;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A pure metric on `(expected, found)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CommonPrefix,
    StrictPrefix,
    AsymmetricDice,
    FuzzyIndex,
    FuzzyPrefix,
}

impl Metric {
    pub fn score(self, expected: &str, found: &str) -> f64 {
        match self {
            Metric::CommonPrefix => metrics::common_prefix(expected, found),
            Metric::StrictPrefix => metrics::strict_prefix(expected, found),
            Metric::AsymmetricDice => metrics::asymmetric_dice(expected, found),
            Metric::FuzzyIndex => metrics::fuzzy_index(expected, found),
            Metric::FuzzyPrefix => metrics::fuzzy_prefix(expected, found),
        }
    }
}

/// User-supplied scoring function.
pub type SimilarityFn = Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>;
/// User-supplied eligibility predicate on `(expected, found, score)`.
pub type FilterFn = Arc<dyn Fn(&str, &str, f64) -> bool + Send + Sync>;

/// Scoring strategy of one comparison stage.
#[derive(Clone)]
pub enum Similarity {
    /// Apply the metric to the whole strings.
    Whole(Metric),
    /// Apply the metric per token, see [`metrics::tokenwise`].
    Tokenwise(Metric),
    /// See [`metrics::token_coverage`].
    TokenCoverage,
    /// See [`metrics::shortest_first`].
    ShortestFirst,
    Custom(SimilarityFn),
}

impl Similarity {
    pub fn score(&self, expected: &str, found: &str) -> f64 {
        match self {
            Similarity::Whole(metric) => metric.score(expected, found),
            Similarity::Tokenwise(metric) => {
                metrics::tokenwise(|e, f| metric.score(e, f), expected, found)
            }
            Similarity::TokenCoverage => metrics::token_coverage(expected, found),
            Similarity::ShortestFirst => metrics::shortest_first(expected, found),
            Similarity::Custom(f) => f(expected, found),
        }
    }
}

impl fmt::Debug for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Whole(m) => f.debug_tuple("Whole").field(m).finish(),
            Similarity::Tokenwise(m) => f.debug_tuple("Tokenwise").field(m).finish(),
            Similarity::TokenCoverage => f.write_str("TokenCoverage"),
            Similarity::ShortestFirst => f.write_str("ShortestFirst"),
            Similarity::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Eligibility filter applied after scoring.
#[derive(Clone)]
pub enum Filter {
    /// Score must be strictly positive.
    Positive,
    /// Score must be at least the given value.
    AtLeast(f64),
    /// Score must equal the number of whitespace tokens in `expected`.
    AllTokensCovered,
    Custom(FilterFn),
}

impl Filter {
    pub fn accepts(&self, expected: &str, found: &str, score: f64) -> bool {
        match self {
            Filter::Positive => score > 0.0,
            Filter::AtLeast(min) => score >= *min,
            Filter::AllTokensCovered => expected.split_whitespace().count() as f64 == score,
            Filter::Custom(f) => f(expected, found, score),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Positive => f.write_str("Positive"),
            Filter::AtLeast(x) => f.debug_tuple("AtLeast").field(x).finish(),
            Filter::AllTokensCovered => f.write_str("AllTokensCovered"),
            Filter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One stage of a comparison vector.
#[derive(Debug, Clone)]
pub struct SimilarityConfiguration {
    similarity: Similarity,
    filter: Option<Filter>,
}

impl SimilarityConfiguration {
    pub fn new(similarity: Similarity) -> Self {
        Self {
            similarity,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Wrap arbitrary closures.
    pub fn custom(f: impl Fn(&str, &str) -> f64 + Send + Sync + 'static) -> Self {
        Self::new(Similarity::Custom(Arc::new(f)))
    }

    pub fn similarity(&self) -> &Similarity {
        &self.similarity
    }

    /// Score `found` against `expected`; `None` means ineligible.
    ///
    /// A NaN score is ineligible as well, whatever the filter says.
    pub fn evaluate(&self, expected: &str, found: &str) -> Option<f64> {
        let score = self.similarity.score(expected, found);
        if score.is_nan() {
            return None;
        }
        match &self.filter {
            Some(filter) if !filter.accepts(expected, found, score) => None,
            _ => Some(score),
        }
    }
}

/// Ordered scores, one per configuration stage. Higher is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector(Vec<f64>);

impl ScoreVector {
    pub fn new(scores: Vec<f64>) -> Self {
        Self(scores)
    }

    /// Evaluate every configuration left to right, stopping at the first
    /// ineligible stage.
    pub fn evaluate(
        configs: &[SimilarityConfiguration],
        expected: &str,
        found: &str,
    ) -> Option<Self> {
        configs
            .iter()
            .map(|c| c.evaluate(expected, found))
            .collect::<Option<Vec<f64>>>()
            .map(Self)
    }

    /// Best eligible vector over several candidate values.
    pub fn best_of<'a>(
        configs: &[SimilarityConfiguration],
        expected: &str,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Option<Self> {
        values
            .into_iter()
            .filter_map(|v| Self::evaluate(configs, expected, v))
            .max_by(|a, b| a.compare(b))
    }

    /// Lexicographic comparison; `Greater` means `self` is better.
    ///
    /// Vectors of different length compare on their common prefix only.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}
