//! Concept matching: rank catalog records against a free-text query.
//!
//! A record's score is the sum of two contributions that are computed and
//! tested separately:
//! - keyword contribution: one point per keyword contained in the query
//! - topic bonus: extra points when the whole topic name is in the query
//!
//! The best record is the first one reaching the highest score, so catalog
//! order breaks ties.

use crate::catalog::{Catalog, ConceptRecord};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

// ============================================================================
// Scoring Weights
// ============================================================================

/// Points awarded per match type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWeights {
    /// Each keyword contained in the query
    pub keyword: u32,
    /// Topic name contained in the query
    pub topic_bonus: u32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            keyword: 1,
            topic_bonus: 3,
        }
    }
}

// ============================================================================
// Match Results
// ============================================================================

/// The winning record with scoring details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptMatch<'a> {
    pub record: &'a ConceptRecord,
    pub score: u32,
    /// What triggered the match, e.g. `keyword:paging` or `topic:binary search`
    pub evidence: Vec<String>,
}

/// Score of one record, serializable for batch output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicScore {
    pub id: String,
    pub topic: String,
    pub score: u32,
}

/// Best match for one query of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchMatch {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub score: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

/// Every record's score for one query of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchScores {
    pub query: String,
    pub scores: Vec<TopicScore>,
}

// ============================================================================
// Matching Logic
// ============================================================================

/// Keywords of `record` contained in the already-lowercased query.
pub fn matching_keywords<'r>(query_lower: &str, record: &'r ConceptRecord) -> Vec<&'r str> {
    if query_lower.is_empty() {
        return Vec::new();
    }
    record
        .keywords
        .iter()
        .filter(|kw| {
            let kw_lower = kw.to_lowercase();
            !kw_lower.is_empty() && query_lower.contains(&kw_lower)
        })
        .map(String::as_str)
        .collect()
}

/// Points from keyword hits; hits from the same record accumulate.
pub fn keyword_contribution(query_lower: &str, record: &ConceptRecord, weights: &MatchWeights) -> u32 {
    matching_keywords(query_lower, record).len() as u32 * weights.keyword
}

/// Points from the topic name appearing in the query.
pub fn topic_bonus(query_lower: &str, record: &ConceptRecord, weights: &MatchWeights) -> u32 {
    let topic_lower = record.topic.to_lowercase();
    if !topic_lower.is_empty() && query_lower.contains(&topic_lower) {
        weights.topic_bonus
    } else {
        0
    }
}

/// Total score for one record.
pub fn score_record(query_lower: &str, record: &ConceptRecord, weights: &MatchWeights) -> u32 {
    keyword_contribution(query_lower, record, weights) + topic_bonus(query_lower, record, weights)
}

/// Find the single best record for `query` with default weights.
pub fn best_match<'a>(query: &str, catalog: &'a Catalog) -> Option<ConceptMatch<'a>> {
    best_match_with(query, catalog, &MatchWeights::default())
}

/// Find the single best record for `query`.
///
/// Returns `None` when every record scores zero, which includes the empty
/// query. On equal scores the record earlier in the catalog wins.
pub fn best_match_with<'a>(
    query: &str,
    catalog: &'a Catalog,
    weights: &MatchWeights,
) -> Option<ConceptMatch<'a>> {
    let query_lower = query.to_lowercase();

    let mut best: Option<(&ConceptRecord, u32)> = None;
    for record in catalog.iter() {
        let score = score_record(&query_lower, record, weights);
        // Strictly greater: a later record with the same score never replaces
        // the current best.
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((record, score));
        }
    }

    let (record, score) = best?;

    let mut evidence: Vec<String> = matching_keywords(&query_lower, record)
        .into_iter()
        .map(|kw| format!("keyword:{}", kw))
        .collect();
    if topic_bonus(&query_lower, record, weights) > 0 {
        evidence.push(format!("topic:{}", record.topic.to_lowercase()));
    }

    debug!("Matched {:?} with score {} ({:?})", record.topic, score, evidence);

    Some(ConceptMatch {
        record,
        score,
        evidence,
    })
}

/// Scores for every record in catalog order.
pub fn score_all(query: &str, catalog: &Catalog) -> Vec<TopicScore> {
    let weights = MatchWeights::default();
    let query_lower = query.to_lowercase();
    catalog
        .iter()
        .map(|record| TopicScore {
            id: record.id.clone(),
            topic: record.topic.clone(),
            score: score_record(&query_lower, record, &weights),
        })
        .collect()
}

// ============================================================================
// Batch Matching
// ============================================================================

/// Best match for each query, scored in parallel. Output order is input order.
pub fn match_batch(queries: &[&str], catalog: &Catalog) -> Vec<BatchMatch> {
    debug!("Batch matching {} queries", queries.len());
    queries
        .par_iter()
        .map(|query| match best_match(query, catalog) {
            Some(m) => BatchMatch {
                query: query.to_string(),
                topic: Some(m.record.topic.clone()),
                score: m.score,
                evidence: m.evidence,
            },
            None => BatchMatch {
                query: query.to_string(),
                topic: None,
                score: 0,
                evidence: Vec::new(),
            },
        })
        .collect()
}

/// Full score table for each query, scored in parallel. Output order is input order.
pub fn score_batch(queries: &[&str], catalog: &Catalog) -> Vec<BatchScores> {
    debug!("Batch scoring {} queries", queries.len());
    queries
        .par_iter()
        .map(|query| BatchScores {
            query: query.to_string(),
            scores: score_all(query, catalog),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
