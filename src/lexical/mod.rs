//! Lexical Shadow Index: in-process, lowercased, bigram-augmented TF-IDF over the same
//! corpus as the vector index, used as the router's fallback and hybrid signal.
//!
//! Maintained with a `parking_lot::RwLock` the way [`crate::embedding::health`] and other
//! hot-path state in this crate is: add/remove only mark the index stale, and the IDF
//! vocabulary is rebuilt synchronously on the next `search`, amortising the O(corpus-size)
//! rebuild cost over batches of writes rather than paying it per write.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::vector::SearchHit;

/// A document as the lexical index sees it: full text plus an arbitrary payload.
#[derive(Debug, Clone)]
pub struct LexicalRecord {
    pub chunk_id: String,
    pub text: String,
    pub payload: HashMap<String, Value>,
}

struct Document {
    term_counts: HashMap<String, u32>,
    term_total: u32,
    payload: HashMap<String, Value>,
}

struct Index {
    documents: HashMap<String, Document>,
    vocab: HashMap<String, TermStats>,
    stale: bool,
}

#[derive(Clone, Copy, Default)]
struct TermStats {
    document_freq: u32,
    idf: f32,
}

/// TF-IDF shadow index, capped to a configured vocabulary size.
pub struct LexicalIndex {
    inner: RwLock<Index>,
    max_vocab_size: usize,
}

impl LexicalIndex {
    pub fn new(max_vocab_size: usize) -> Self {
        Self {
            inner: RwLock::new(Index {
                documents: HashMap::new(),
                vocab: HashMap::new(),
                stale: false,
            }),
            max_vocab_size,
        }
    }

    /// Number of documents currently indexed.
    pub fn len(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scans every indexed document's payload, for `document_stats()`-style aggregation.
    pub fn payloads(&self) -> Vec<(String, HashMap<String, Value>)> {
        self.inner
            .read()
            .documents
            .iter()
            .map(|(id, doc)| (id.clone(), doc.payload.clone()))
            .collect()
    }

    /// Adds or replaces records, marking the vocabulary stale.
    pub fn add_or_update(&self, records: Vec<LexicalRecord>) {
        let mut index = self.inner.write();
        for record in records {
            let terms = tokenize(&record.text);
            let mut term_counts = HashMap::new();
            for term in terms {
                *term_counts.entry(term).or_insert(0) += 1;
            }
            let term_total = term_counts.values().sum();
            index.documents.insert(
                record.chunk_id,
                Document {
                    term_counts,
                    term_total,
                    payload: record.payload,
                },
            );
        }
        index.stale = true;
    }

    /// Removes records by id, marking the vocabulary stale.
    pub fn remove(&self, chunk_ids: &[String]) {
        let mut index = self.inner.write();
        for id in chunk_ids {
            index.documents.remove(id);
        }
        index.stale = true;
    }

    /// Scores `query_text` against every indexed document by TF-IDF cosine similarity,
    /// returning the top `k` by descending score. Triggers a synchronous vocabulary
    /// rebuild first if the index is stale.
    pub fn search(&self, query_text: &str, k: usize) -> Vec<SearchHit> {
        {
            let stale = self.inner.read().stale;
            if stale {
                self.rebuild();
            }
        }

        let index = self.inner.read();
        let query_terms = tokenize(query_text);
        if query_terms.is_empty() || index.documents.is_empty() {
            return Vec::new();
        }

        let query_vector = tfidf_vector(&query_terms, &index.vocab);
        let query_norm = norm(&query_vector);
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = index
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                let doc_vector = tfidf_vector_for_document(doc, &index.vocab);
                let doc_norm = norm(&doc_vector);
                if doc_norm == 0.0 {
                    return None;
                }
                let dot: f32 = query_vector
                    .iter()
                    .map(|(term, w)| w * doc_vector.get(term).copied().unwrap_or(0.0))
                    .sum();
                let score = dot / (query_norm * doc_norm);
                if score <= 0.0 {
                    return None;
                }
                Some(SearchHit {
                    chunk_id: id.clone(),
                    score: score as f64,
                    payload: doc.payload.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    fn rebuild(&self) {
        let mut index = self.inner.write();
        if !index.stale {
            return;
        }

        let total_docs = index.documents.len() as f32;
        let mut document_freq: HashMap<String, u32> = HashMap::new();
        for doc in index.documents.values() {
            for term in doc.term_counts.keys() {
                *document_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, u32)> = document_freq.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_vocab_size);

        index.vocab = terms
            .into_iter()
            .map(|(term, df)| {
                let idf = ((total_docs + 1.0) / (df as f32 + 1.0)).ln() + 1.0;
                (term, TermStats { document_freq: df, idf })
            })
            .collect();
        index.stale = false;
    }
}

fn tfidf_vector(terms: &[String], vocab: &HashMap<String, TermStats>) -> HashMap<String, f32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for term in terms {
        *counts.entry(term.clone()).or_insert(0) += 1;
    }
    let total = terms.len() as f32;
    counts
        .into_iter()
        .filter_map(|(term, count)| {
            vocab.get(&term).map(|stats| {
                let tf = count as f32 / total;
                (term, tf * stats.idf)
            })
        })
        .collect()
}

fn tfidf_vector_for_document(doc: &Document, vocab: &HashMap<String, TermStats>) -> HashMap<String, f32> {
    if doc.term_total == 0 {
        return HashMap::new();
    }
    let total = doc.term_total as f32;
    doc.term_counts
        .iter()
        .filter_map(|(term, &count)| {
            vocab.get(term).map(|stats| {
                let tf = count as f32 / total;
                (term.clone(), tf * stats.idf)
            })
        })
        .collect()
}

fn norm(vector: &HashMap<String, f32>) -> f32 {
    vector.values().map(|w| w * w).sum::<f32>().sqrt()
}

/// Lowercases and splits on non-alphanumeric boundaries, then augments the unigram stream
/// with adjacent-pair bigrams so phrase-level matches (e.g. "gun violence") score higher
/// than the sum of their parts.
fn tokenize(text: &str) -> Vec<String> {
    let unigrams: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut tokens = unigrams.clone();
    for pair in unigrams.windows(2) {
        tokens.push(format!("{} {}", pair[0], pair[1]));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> LexicalRecord {
        LexicalRecord {
            chunk_id: id.to_string(),
            text: text.to_string(),
            payload: HashMap::new(),
        }
    }

    #[test]
    fn finds_exact_term_match() {
        let index = LexicalIndex::new(5000);
        index.add_or_update(vec![
            record("a", "a scene of graphic violence"),
            record("b", "a romantic comedy about friendship"),
        ]);
        let hits = index.search("violence", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn remove_drops_document_from_results() {
        let index = LexicalIndex::new(5000);
        index.add_or_update(vec![record("a", "graphic violence")]);
        index.remove(&["a".to_string()]);
        assert!(index.search("violence", 5).is_empty());
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let index = LexicalIndex::new(5000);
        index.add_or_update(vec![record("a", "graphic violence")]);
        assert!(index.search("   ", 5).is_empty());
    }

    #[test]
    fn bigram_boosts_phrase_match() {
        let index = LexicalIndex::new(5000);
        index.add_or_update(vec![
            record("a", "gun violence in schools"),
            record("b", "violence of the storm and a gun show"),
        ]);
        let hits = index.search("gun violence", 5);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[test]
    fn vocab_cap_keeps_most_frequent_terms() {
        let index = LexicalIndex::new(2);
        index.add_or_update(vec![
            record("a", "alpha alpha beta"),
            record("b", "alpha gamma"),
            record("c", "alpha beta delta"),
        ]);
        let hits = index.search("delta", 5);
        // "delta" only appears once and should have been dropped by the vocab cap,
        // favoring "alpha" and "beta" which are more frequent.
        assert!(hits.is_empty());
    }
}
