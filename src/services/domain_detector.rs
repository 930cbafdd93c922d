//! Keyword-based domain classification.

use serde::Serialize;

use crate::domain::models::Domain;
use crate::domain::text::count_hits;

/// Hits needed for full confidence.
const SATURATION_HITS: f32 = 3.0;

/// Outcome of domain detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DomainMatch {
    pub domain: Domain,
    /// `min(hits / 3, 1)`; exactly 0.0 when nothing matched.
    pub confidence: f32,
    pub hits: usize,
}

impl DomainMatch {
    const fn general() -> Self {
        Self {
            domain: Domain::General,
            confidence: 0.0,
            hits: 0,
        }
    }
}

/// Classifies text into a registered domain by counting keyword hits.
///
/// Pure and stateless. When two domains have the same hit count, the one
/// with the lexicographically smallest id wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainDetector;

impl DomainDetector {
    pub const fn new() -> Self {
        Self
    }

    pub fn detect(&self, text: &str) -> DomainMatch {
        let haystack = text.to_lowercase();
        let mut best = DomainMatch::general();

        // `Domain::all()` is ordered by id, so a strict `>` keeps the
        // smallest id on ties.
        for &domain in Domain::all() {
            let hits = count_hits(&haystack, domain.definition().keywords);
            if hits > best.hits {
                best = DomainMatch {
                    domain,
                    confidence: (hits as f32 / SATURATION_HITS).min(1.0),
                    hits,
                };
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hits_is_general_with_zero_confidence() {
        let m = DomainDetector::new().detect("what a lovely day");
        assert_eq!(m.domain, Domain::General);
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.hits, 0);
    }

    #[test]
    fn test_case_insensitive_match() {
        let m = DomainDetector::new().detect("Our CONCRETE pour needs REBAR inspection");
        assert_eq!(m.domain, Domain::Construction);
        assert_eq!(m.hits, 2);
        assert!((m.confidence - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_saturates() {
        let m = DomainDetector::new().detect("鋼筋 混凝土 施工 工地 模板");
        assert_eq!(m.domain, Domain::Construction);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn test_tie_resolves_to_smallest_id() {
        // One finance hit ("budget") and one legal hit ("contract").
        let m = DomainDetector::new().detect("review the budget and the contract");
        assert_eq!(m.hits, 1);
        assert_eq!(m.domain, Domain::Finance);

        // Same hits, reversed order in the text: still finance.
        let m = DomainDetector::new().detect("the contract and the budget");
        assert_eq!(m.domain, Domain::Finance);
    }

    #[test]
    fn test_software_phrase_counts_once() {
        let m = DomainDetector::new().detect("這段程式碼有問題");
        assert_eq!(m.domain, Domain::Software);
        assert_eq!(m.hits, 1);
    }

    #[test]
    fn test_chinese_keywords() {
        let m = DomainDetector::new().detect("這份合約的違約條款");
        assert_eq!(m.domain, Domain::Legal);
        assert_eq!(m.hits, 3);
    }
}
