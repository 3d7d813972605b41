//! Ready-made comparison vectors.
//!
//! - **strict**: follow only relations whose key is a prefix of a query token;
//!   results must contain every query token (one may be incomplete).
//! - **fuzzy**: follow every relation whose key shares characters with the
//!   query; rank results by prefix overlap, then bigram overlap.
//!
//! Both break remaining ties by preferring shorter values.

use super::{Filter, Metric, Similarity, SimilarityConfiguration};

/// Relation prioritization and result ranking vectors for one preset.
#[derive(Debug, Clone)]
pub struct Preset {
    pub relations: Vec<SimilarityConfiguration>,
    pub results: Vec<SimilarityConfiguration>,
}

pub fn strict() -> Preset {
    Preset {
        relations: vec![
            SimilarityConfiguration::new(Similarity::Tokenwise(Metric::StrictPrefix))
                .with_filter(Filter::Positive),
        ],
        results: vec![
            SimilarityConfiguration::new(Similarity::TokenCoverage)
                .with_filter(Filter::AllTokensCovered),
            SimilarityConfiguration::new(Similarity::Tokenwise(Metric::AsymmetricDice)),
            SimilarityConfiguration::new(Similarity::ShortestFirst),
        ],
    }
}

pub fn fuzzy() -> Preset {
    Preset {
        relations: vec![
            SimilarityConfiguration::new(Similarity::Tokenwise(Metric::FuzzyIndex))
                .with_filter(Filter::Positive),
        ],
        results: vec![
            SimilarityConfiguration::new(Similarity::Tokenwise(Metric::CommonPrefix)),
            SimilarityConfiguration::new(Similarity::Tokenwise(Metric::AsymmetricDice)),
            SimilarityConfiguration::new(Similarity::ShortestFirst),
        ],
    }
}
