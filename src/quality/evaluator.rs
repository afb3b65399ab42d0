//! Multi-dimension source quality evaluation.
//!
//! [`QualityEvaluator::evaluate`] is a pure function of the candidate,
//! the query and the evaluator's static tables, so identical inputs
//! always rank identically.
//!
//! # Dimensions
//!
//! | Dimension        | Weight | Computed from                         |
//! |------------------|--------|---------------------------------------|
//! | Authority        | 0.30   | domain table, then suffix heuristics  |
//! | Relevance        | 0.40   | query/title and query/snippet overlap |
//! | Content quality  | 0.20   | content length, title length, markers |
//! | Recency          | 0.05   | neutral 0.5 (no signal available)     |
//! | Completeness     | 0.05   | neutral 0.5 (no signal available)     |

use std::collections::{BTreeMap, HashMap, HashSet};

use super::dimension::Dimension;
use super::score::{NEUTRAL_SCORE, QualityScore};
use super::source::Evaluable;

/// Domains with a known authority score. Exact matches take priority
/// over the suffix rules.
const HIGH_AUTHORITY_DOMAINS: &[(&str, f64)] = &[
    ("sec.gov", 0.95),
    ("nih.gov", 0.95),
    ("cdc.gov", 0.95),
    ("nature.com", 0.95),
    ("science.org", 0.95),
    ("who.int", 0.93),
    ("thelancet.com", 0.93),
    ("nejm.org", 0.93),
    ("arxiv.org", 0.90),
    ("ieee.org", 0.90),
    ("acm.org", 0.90),
    ("reuters.com", 0.90),
    ("apnews.com", 0.90),
    ("bloomberg.com", 0.88),
    ("ft.com", 0.88),
    ("wsj.com", 0.88),
    ("economist.com", 0.87),
    ("bbc.com", 0.87),
    ("bbc.co.uk", 0.87),
    ("nytimes.com", 0.87),
    ("worldbank.org", 0.90),
    ("imf.org", 0.90),
    ("oecd.org", 0.90),
    ("iea.org", 0.90),
    ("wikipedia.org", 0.85),
];

/// Domain suffix rules, checked in order after the exact table.
const SUFFIX_RULES: &[(&str, f64)] = &[(".gov", 0.85), (".edu", 0.80), (".org", 0.70)];

/// Tokens suggesting a news outlet.
const NEWS_TOKENS: &[&str] = &["news", "times", "post", "journal"];
/// Authority of a news-like domain.
const NEWS_AUTHORITY: f64 = 0.75;

/// Markers of substantive content, matched case-insensitively.
const QUALITY_INDICATORS: &[&str] = &["research", "study", "analysis", "report", "data", "evidence"];

const HIGH_AUTHORITY_NOTE: f64 = 0.8;
const LOW_AUTHORITY_NOTE: f64 = 0.3;
const HIGH_RELEVANCE_NOTE: f64 = 0.8;
const LOW_RELEVANCE_NOTE: f64 = 0.4;

/// Scores candidate sources against a query.
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    authority_domains: HashMap<String, f64>,
}

impl Default for QualityEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityEvaluator {
    /// Creates an evaluator with the built-in authority table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            authority_domains: HIGH_AUTHORITY_DOMAINS
                .iter()
                .map(|&(d, s)| (d.to_string(), s))
                .collect(),
        }
    }

    /// Adds or overrides an exact-match authority entry.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>, score: f64) -> Self {
        self.authority_domains
            .insert(domain.into().to_ascii_lowercase(), score.clamp(0.0, 1.0));
        self
    }

    /// Scores `candidate` against `query`.
    #[must_use]
    pub fn evaluate(&self, candidate: &dyn Evaluable, query: &str) -> QualityScore {
        let mut reasoning = Vec::new();

        let authority = self.authority(candidate.url());
        if authority > HIGH_AUTHORITY_NOTE {
            reasoning.push(format!(
                "high authority domain: {}",
                extract_domain(candidate.url())
            ));
        } else if authority < LOW_AUTHORITY_NOTE {
            reasoning.push(format!(
                "low authority domain: {}",
                extract_domain(candidate.url())
            ));
        }

        let relevance = relevance(query, candidate.title(), candidate.snippet());
        if relevance > HIGH_RELEVANCE_NOTE {
            reasoning.push("high relevance to query".to_string());
        } else if relevance < LOW_RELEVANCE_NOTE {
            reasoning.push("low relevance to query".to_string());
        }

        let content_quality = content_quality(candidate.title(), candidate.content());

        let computed = [authority, relevance, content_quality];
        let confidence = confidence(candidate, &computed);

        let mut dimensions = BTreeMap::new();
        dimensions.insert(Dimension::Authority, authority);
        dimensions.insert(Dimension::Relevance, relevance);
        dimensions.insert(Dimension::ContentQuality, content_quality);
        dimensions.insert(Dimension::Recency, NEUTRAL_SCORE);
        dimensions.insert(Dimension::Completeness, NEUTRAL_SCORE);

        QualityScore::from_dimensions(dimensions, confidence, reasoning)
    }

    /// Authority of the domain behind `url`.
    #[must_use]
    pub fn authority(&self, url: &str) -> f64 {
        if url.trim().is_empty() {
            return NEUTRAL_SCORE;
        }
        let domain = extract_domain(url);
        if let Some(&score) = self.authority_domains.get(&domain) {
            return score;
        }
        if let Some(&(_, score)) = SUFFIX_RULES
            .iter()
            .find(|(suffix, _)| domain.ends_with(suffix))
        {
            return score;
        }
        if NEWS_TOKENS.iter().any(|t| domain.contains(t)) {
            return NEWS_AUTHORITY;
        }
        NEUTRAL_SCORE
    }
}

/// Host part of a URL: after the scheme, before the first path separator.
///
/// Lower-cased, with any port, credentials and leading `www.` removed.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    let rest = url.trim().split_once("://").map_or(url.trim(), |(_, r)| r);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next().unwrap_or_default().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// `min(1, 0.7 · title overlap + 0.3 · snippet overlap)`, neutral for an
/// empty query.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn relevance(query: &str, title: &str, snippet: &str) -> f64 {
    let query_words = word_set(query);
    if query_words.is_empty() {
        return NEUTRAL_SCORE;
    }
    let denominator = query_words.len().max(1) as f64;
    let title_words = word_set(title);
    let snippet_words = word_set(snippet);

    let title_overlap = query_words.intersection(&title_words).count() as f64 / denominator;
    let snippet_overlap = query_words.intersection(&snippet_words).count() as f64 / denominator;

    0.3f64.mul_add(snippet_overlap, 0.7 * title_overlap).min(1.0)
}

/// Baseline 0.5 plus bonuses for length, a well-sized title and
/// substantive markers.
#[must_use]
pub fn content_quality(title: &str, content: &str) -> f64 {
    let mut score = 0.5;
    let content_len = content.chars().count();
    if content_len > 1000 {
        score += 0.2;
    } else if content_len > 500 {
        score += 0.1;
    }
    let title_len = title.chars().count();
    if (10..=100).contains(&title_len) {
        score += 0.1;
    }
    let lowered = content.to_lowercase();
    if QUALITY_INDICATORS.iter().any(|m| lowered.contains(m)) {
        score += 0.1;
    }
    f64::min(score, 1.0)
}

/// Evidence-based confidence, independent of score magnitude.
fn confidence(candidate: &dyn Evaluable, computed: &[f64]) -> f64 {
    let mut confidence = 0.5;
    if candidate.content().chars().count() > 100 {
        confidence += 0.2;
    }
    if !candidate.title().is_empty() {
        confidence += 0.1;
    }
    if !candidate.url().is_empty() {
        confidence += 0.1;
    }
    if std_dev(computed) < 0.2 {
        confidence += 0.1;
    }
    f64::min(confidence, 1.0)
}

/// Population standard deviation.
#[allow(clippy::cast_precision_loss)]
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;
    use crate::quality::source::CandidateSource;

    #[test_case("https://sec.gov/cgi-bin/browse-edgar", 0.95 ; "exact table beats gov suffix")]
    #[test_case("https://www.nature.com/articles/x", 0.95 ; "www prefix stripped")]
    #[test_case("https://energy.gov/eere", 0.85 ; "gov suffix")]
    #[test_case("https://mit.edu/research", 0.80 ; "edu suffix")]
    #[test_case("https://example.org/about", 0.70 ; "org suffix")]
    #[test_case("https://dailynews.com/story", 0.75 ; "news token")]
    #[test_case("https://washingtonpost.com/a", 0.75 ; "post token")]
    #[test_case("https://randomblog.io/post", 0.50 ; "default")]
    #[test_case("", 0.50 ; "empty url")]
    fn test_authority(url: &str, expected: f64) {
        let evaluator = QualityEvaluator::new();
        assert!((evaluator.authority(url) - expected).abs() < f64::EPSILON);
    }

    #[test_case("https://www.SEC.gov:443/path?q=1", "sec.gov" ; "port and case")]
    #[test_case("sec.gov/filings", "sec.gov" ; "no scheme")]
    #[test_case("https://user:pw@host.example.com/", "host.example.com" ; "credentials")]
    fn test_extract_domain(url: &str, expected: &str) {
        assert_eq!(extract_domain(url), expected);
    }

    #[test]
    fn test_custom_domain_override() {
        let evaluator = QualityEvaluator::new().with_domain("Example.com", 0.9);
        assert!((evaluator.authority("https://example.com/x") - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_relevance_empty_query() {
        assert!((relevance("", "AI Agents Overview", "ai agents everywhere") - 0.5).abs() < f64::EPSILON);
        assert!((relevance("   ", "anything", "") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_relevance_full_title_overlap() {
        // titleOverlap = 1.0, snippetOverlap = 1/2
        let score = relevance("ai agents", "AI Agents Overview", "how agents plan");
        assert!((score - (0.7 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_capped_at_one() {
        let score = relevance("ai agents", "AI Agents", "ai agents");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_no_overlap() {
        assert!(relevance("solar power", "Cooking pasta", "boil water").abs() < f64::EPSILON);
    }

    #[test]
    fn test_content_quality_bonuses() {
        let long = "word ".repeat(250);
        assert!((content_quality("", "") - 0.5).abs() < 1e-9);
        assert!((content_quality("", &"x".repeat(600)) - 0.6).abs() < 1e-9);
        assert!((content_quality("A reasonable title", &long) - 0.8).abs() < 1e-9);
        let rich = format!("{long} this study presents new data");
        assert!((content_quality("A reasonable title", &rich) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_content_quality_title_bounds() {
        assert!((content_quality("short", "") - 0.5).abs() < 1e-9);
        assert!((content_quality(&"t".repeat(10), "") - 0.6).abs() < 1e-9);
        assert!((content_quality(&"t".repeat(101), "") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_authoritative_source() {
        let evaluator = QualityEvaluator::new();
        let source = CandidateSource::new(
            "https://www.iea.org/reports/renewables-2024",
            "Benefits of renewable energy",
        )
        .with_snippet("renewable energy benefits include lower emissions")
        .with_content("This report analyses ".repeat(80));

        let score = evaluator.evaluate(&source, "benefits of renewable energy");
        assert!((score.dimension(Dimension::Authority) - 0.90).abs() < f64::EPSILON);
        // 0.7 * 4/4 + 0.3 * 3/4
        assert!((score.dimension(Dimension::Relevance) - 0.925).abs() < 1e-9);
        // long content, sized title, "report" marker
        assert!((score.dimension(Dimension::ContentQuality) - 0.9).abs() < 1e-9);
        assert_eq!(
            score.reasoning(),
            &[
                "high authority domain: iea.org".to_string(),
                "high relevance to query".to_string()
            ]
        );
        // 0.3*0.9 + 0.4*0.925 + 0.2*0.9 + 0.05*0.5 + 0.05*0.5
        assert!((score.overall() - 0.87).abs() < 1e-9);
        // 0.5 + 0.2 + 0.1 + 0.1 + 0.1 (computed scores are tightly grouped)
        assert!((score.confidence() - 1.0).abs() < 1e-9);
        assert!(score.is_high_quality());
    }

    #[test]
    fn test_evaluate_bare_source() {
        let evaluator = QualityEvaluator::new();
        let score = evaluator.evaluate(&CandidateSource::default(), "quantum computing");
        assert!((score.dimension(Dimension::Authority) - 0.5).abs() < f64::EPSILON);
        assert!(score.dimension(Dimension::Relevance).abs() < f64::EPSILON);
        assert_eq!(score.reasoning(), &["low relevance to query".to_string()]);
        // std of [0.5, 0.0, 0.5] is ~0.236, so no consistency bonus.
        assert!((score.confidence() - 0.5).abs() < 1e-9);
        assert!(!score.is_high_quality());
    }

    #[test]
    fn test_evaluate_low_authority_domain_noted_first() {
        let evaluator = QualityEvaluator::new().with_domain("spam.example", 0.1);
        let source = CandidateSource::new("https://www.spam.example/deal", "Cheap pills");
        let score = evaluator.evaluate(&source, "solar power");
        assert!((score.dimension(Dimension::Authority) - 0.1).abs() < f64::EPSILON);
        assert_eq!(
            score.reasoning(),
            &[
                "low authority domain: spam.example".to_string(),
                "low relevance to query".to_string(),
            ]
        );
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let evaluator = QualityEvaluator::new();
        let source = CandidateSource::new("https://news.example.com/a", "Market update today")
            .with_snippet("markets rallied");
        let a = evaluator.evaluate(&source, "market rally");
        let b = evaluator.evaluate(&source, "market rally");
        assert_eq!(a, b);
    }

    #[test]
    fn test_std_dev() {
        assert!(std_dev(&[]).abs() < f64::EPSILON);
        assert!(std_dev(&[0.5, 0.5, 0.5]).abs() < f64::EPSILON);
        assert!((std_dev(&[0.0, 1.0]) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_scores_bounded(
            url in ".{0,40}",
            title in ".{0,120}",
            snippet in ".{0,200}",
            content in ".{0,1200}",
            query in ".{0,60}",
        ) {
            let evaluator = QualityEvaluator::new();
            let source = CandidateSource { url, title, snippet, content };
            let score = evaluator.evaluate(&source, &query);
            prop_assert!((0.0..=1.0).contains(&score.overall()));
            prop_assert!((0.0..=1.0).contains(&score.confidence()));
            for value in score.dimensions().values() {
                prop_assert!((0.0..=1.0).contains(value));
            }
        }
    }
}
