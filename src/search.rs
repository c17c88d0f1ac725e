//! Search Engine (C8): vector similarity with usage-aware re-ranking, plus
//! hybrid (vector + lexical) fusion and facet filtering (spec.md §4.6).
//!
//! Cosine similarity lives on the storage backends
//! (`storage::sqlite::SqliteStorage::cosine_similarity`, reused by the
//! in-memory backend) since both already need it to rank
//! `nearest_neighbors` candidates; this module owns everything downstream
//! of that: threshold filtering, usage scoring, fusion, and facets.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::llm::LlmGateway;
use crate::models::{DocumentId, Hit};
use crate::storage::{SearchFilters, Storage, UsageTouch};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Either a text query (embedded before searching) or a pre-computed
/// vector (spec.md §4.6 `search_similar_content`).
pub enum QueryInput {
    Text(String),
    Vector(Vec<f32>),
}

/// Per-call search parameters; anything left `None` falls back to the
/// engine's `SearchConfig` defaults.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub similarity_threshold: Option<f32>,
    pub filters: SearchFilters,
    pub semantic_weight: Option<f32>,
    pub text_weight: Option<f32>,
}

/// Facet filters for `faceted_search` (spec.md §4.6 "Facet filtering").
#[derive(Debug, Clone, Default)]
pub struct FacetFilters {
    /// AND-of-substring matches against `metadata.keywords`.
    pub keywords: Vec<String>,
    /// Exact match against `metadata.classification`.
    pub classification: Option<String>,
    /// Array-contains match against `metadata.tags`.
    pub tags: Vec<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

pub struct SearchEngine {
    storage: Arc<dyn Storage>,
    llm: Arc<LlmGateway>,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(storage: Arc<dyn Storage>, llm: Arc<LlmGateway>, config: SearchConfig) -> Self {
        Self { storage, llm, config }
    }

    /// Embeds `query` then delegates to `search_similar_content`. Returns
    /// an empty result (not an error) if the query can't be embedded,
    /// per spec.md §4.7 "search with an unproducible query embedding
    /// returns an empty result set rather than an error".
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<Hit> {
        let vector = match self.llm.embed(query).await {
            Ok(r) if !r.embedding.is_empty() => r.embedding,
            Ok(_) => {
                warn!("empty query embedding for search, returning no results");
                return Vec::new();
            }
            Err(e) => {
                warn!("query embedding failed ({e}), returning no results (SearchError)");
                return Vec::new();
            }
        };
        self.search_similar_content(QueryInput::Vector(vector), options)
            .await
            .unwrap_or_default()
    }

    /// Accepts either a text query (embedded first) or a pre-computed
    /// vector, runs the semantic-search algorithm of spec.md §4.6.
    pub async fn search_similar_content(
        &self,
        input: QueryInput,
        options: &SearchOptions,
    ) -> Result<Vec<Hit>> {
        let vector = match input {
            QueryInput::Vector(v) => v,
            QueryInput::Text(text) => {
                let response = self.llm.embed(&text).await?;
                if response.embedding.is_empty() {
                    return Ok(Vec::new());
                }
                response.embedding
            }
        };

        let limit = options.limit.unwrap_or(self.config.max_results);
        let threshold = options.similarity_threshold.unwrap_or(self.config.similarity_threshold);

        // Step 2: request k = 2 * limit to allow threshold filtering.
        let k = limit.saturating_mul(2).max(limit);
        let candidates = self.storage.nearest_neighbors(&vector, k, &options.filters).await?;

        let now = Utc::now();
        let mut scored: Vec<Hit> = candidates
            .into_iter()
            .filter(|hit| hit.similarity >= threshold)
            .map(|mut hit| {
                let usage_score = compute_usage_score(hit.usage_count, hit.returned_at, now);
                hit.usage_score = usage_score;
                hit.combined_score = hit.similarity + usage_score;
                hit
            })
            .collect();

        scored.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        // Step 6: one atomic batch update, not per-hit.
        let touches: Vec<UsageTouch> = scored
            .iter()
            .map(|hit| UsageTouch {
                embedding_id: hit.embedding_id,
                returned_at: now,
            })
            .collect();
        if !touches.is_empty() {
            self.storage.batch_touch_embeddings(&touches).await?;
        }

        Ok(scored)
    }

    /// Fuses semantic hits with lexical (full-text) hits, weighted by
    /// `semantic_weight`/`text_weight` (defaults 0.7/0.3), deduped by
    /// document id (spec.md §4.6 "Fusion").
    pub async fn hybrid_search(
        &self,
        query: &str,
        query_vector: Option<Vec<f32>>,
        options: &SearchOptions,
    ) -> Result<Vec<Hit>> {
        let limit = options.limit.unwrap_or(self.config.max_results);
        let semantic_weight = options.semantic_weight.unwrap_or(self.config.semantic_weight);
        let text_weight = options.text_weight.unwrap_or(self.config.text_weight);

        let semantic_hits = match query_vector {
            Some(v) => self.search_similar_content(QueryInput::Vector(v), options).await?,
            None => self.search_similar_content(QueryInput::Text(query.to_string()), options).await?,
        };
        let lexical_hits = self.storage.lexical_search(query, limit).await?;

        Ok(fuse(semantic_hits, lexical_hits, semantic_weight, text_weight, limit))
    }

    /// Facet filtering over `documents.metadata` combined with a semantic
    /// search pass (spec.md §4.6 "Facet filtering").
    pub async fn faceted_search(
        &self,
        query: &str,
        facets: &FacetFilters,
        options: &SearchOptions,
    ) -> Result<Vec<Hit>> {
        let candidates = self.search(query, options).await;
        let mut doc_cache: HashMap<DocumentId, bool> = HashMap::new();

        let mut out = Vec::with_capacity(candidates.len());
        for hit in candidates {
            let passes = match doc_cache.get(&hit.document_id) {
                Some(v) => *v,
                None => {
                    let doc = self.storage.get_document(hit.document_id).await?;
                    let passes = doc.map(|d| facets_match(&d, facets)).unwrap_or(false);
                    doc_cache.insert(hit.document_id, passes);
                    passes
                }
            };
            if passes {
                out.push(hit);
            }
        }
        Ok(out)
    }
}

/// Usage score: frequency (log-scaled usage count, capped at 1.0) weighted
/// 0.7, plus recency (exponential decay over 30 days) weighted 0.3
/// (spec.md §4.6 "Usage score").
pub fn compute_usage_score(usage_count: i64, returned_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
    let returned_at = match (usage_count, returned_at) {
        (0, _) | (_, None) => return 0.0,
        (_, Some(t)) => t,
    };

    let frequency_score = ((usage_count as f64 + 1.0).ln() / 100f64.ln()).min(1.0) as f32;

    let days_since = (now - returned_at).num_seconds() as f64 / 86_400.0;
    let recency_score = (-days_since / 30.0).exp() as f32;

    0.7 * frequency_score + 0.3 * recency_score
}

fn facets_match(doc: &crate::models::Document, facets: &FacetFilters) -> bool {
    if let Some(classification) = &facets.classification {
        let matches = doc
            .metadata
            .get("classification")
            .and_then(|v| v.as_str())
            .map(|s| s == classification)
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }

    if !facets.keywords.is_empty() {
        let doc_keywords: Vec<String> = doc
            .metadata
            .get("keywords")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(|s| s.to_lowercase()).collect())
            .unwrap_or_default();
        let all_present = facets.keywords.iter().all(|kw| {
            let needle = kw.to_lowercase();
            doc_keywords.iter().any(|k| k.contains(&needle))
        });
        if !all_present {
            return false;
        }
    }

    if !facets.tags.is_empty() {
        let doc_tags: Vec<String> = doc
            .metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).map(|s| s.to_string()).collect())
            .unwrap_or_default();
        let all_present = facets.tags.iter().all(|t| doc_tags.contains(t));
        if !all_present {
            return false;
        }
    }

    if let Some(after) = facets.created_after {
        if doc.created_at < after {
            return false;
        }
    }
    if let Some(before) = facets.created_before {
        if doc.created_at > before {
            return false;
        }
    }

    true
}

/// Keeps, per document id, the hit with the highest weighted score; sums
/// weighted scores across search types into `combined_score`; records the
/// union of sources in `search_types` (spec.md §4.6 "Fusion").
fn fuse(
    semantic_hits: Vec<Hit>,
    lexical_hits: Vec<Hit>,
    semantic_weight: f32,
    text_weight: f32,
    limit: usize,
) -> Vec<Hit> {
    let mut by_doc: HashMap<DocumentId, Hit> = HashMap::new();

    for mut hit in semantic_hits {
        let weighted = hit.combined_score * semantic_weight;
        hit.combined_score = weighted;
        hit.search_types = vec!["semantic".to_string()];
        by_doc.insert(hit.document_id, hit);
    }

    for mut hit in lexical_hits {
        let weighted = hit.combined_score * text_weight;
        match by_doc.get_mut(&hit.document_id) {
            Some(existing) => {
                existing.combined_score += weighted;
                if !existing.search_types.contains(&"lexical".to_string()) {
                    existing.search_types.push("lexical".to_string());
                }
            }
            None => {
                hit.combined_score = weighted;
                hit.search_types = vec!["lexical".to_string()];
                by_doc.insert(hit.document_id, hit);
            }
        }
    }

    let mut fused: Vec<Hit> = by_doc.into_values().collect();
    fused.sort_by(|a, b| b.combined_score.partial_cmp(&a.combined_score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(limit);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, EmbeddingId};

    fn hit_with(similarity: f32, usage_count: i64, returned_at: Option<DateTime<Utc>>) -> Hit {
        Hit {
            embedding_id: EmbeddingId::new(),
            content: "c".to_string(),
            document_id: DocumentId::new(),
            document_title: "t".to_string(),
            document_location: "l".to_string(),
            chunk_index: 0,
            similarity,
            distance: 1.0 - similarity,
            usage_count,
            returned_at,
            usage_score: 0.0,
            combined_score: similarity,
            metadata: HashMap::new(),
            search_types: vec!["semantic".to_string()],
        }
    }

    #[test]
    fn test_usage_score_zero_when_never_used() {
        let score = compute_usage_score(0, None, Utc::now());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_usage_score_higher_for_frequent_recent_embedding() {
        let now = Utc::now();
        let frequent = compute_usage_score(50, Some(now), now);
        let unused = compute_usage_score(0, None, now);
        assert!(frequent > unused);
    }

    #[test]
    fn test_usage_ranking_breaks_similarity_tie() {
        let now = Utc::now();
        let used = hit_with(0.8, 50, Some(now));
        let unused = hit_with(0.8, 0, None);

        let used_score = used.similarity + compute_usage_score(used.usage_count, used.returned_at, now);
        let unused_score = unused.similarity + compute_usage_score(unused.usage_count, unused.returned_at, now);
        assert!(used_score > unused_score);
    }

    #[test]
    fn test_fuse_places_stronger_semantic_hit_first_and_dedups() {
        let doc_a = DocumentId::new();
        let doc_b = DocumentId::new();

        let mut semantic = hit_with(0.9, 0, None);
        semantic.document_id = doc_a;
        semantic.combined_score = 0.9;

        let mut lexical = hit_with(0.0, 0, None);
        lexical.document_id = doc_b;
        lexical.combined_score = 1.0;
        lexical.search_types = vec!["lexical".to_string()];

        let fused = fuse(vec![semantic], vec![lexical], 0.7, 0.3, 10);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].document_id, doc_a);
        assert_eq!(fused[1].document_id, doc_b);
    }

    #[test]
    fn test_fuse_same_document_appears_once_with_summed_score() {
        let doc_a = DocumentId::new();

        let mut semantic = hit_with(0.9, 0, None);
        semantic.document_id = doc_a;
        semantic.combined_score = 0.9;

        let mut lexical = hit_with(0.0, 0, None);
        lexical.document_id = doc_a;
        lexical.combined_score = 1.0;

        let fused = fuse(vec![semantic], vec![lexical], 0.7, 0.3, 10);
        assert_eq!(fused.len(), 1);
        let expected = 0.9 * 0.7 + 1.0 * 0.3;
        assert!((fused[0].combined_score - expected).abs() < 1e-6);
    }
}
