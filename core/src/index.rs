//! Inverted index that keeps its term dictionary in a B-tree.
//!
//! Every distinct term maps to a [`TermStats`]: how many documents contain
//! the term and, per document, how often. The stats record is created the
//! first time a term is seen and from then on only mutated through the merge
//! function handed to [`BTree::insert`].

use crate::btree::{BTree, DuplicatePolicy, InOrderIter};
use crate::error::Result;
use crate::score;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = String;

/// Per-term statistics stored as the dictionary value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermStats {
    /// Number of distinct documents containing the term.
    pub df: u32,
    /// doc id -> term frequency within that document.
    pub postings: HashMap<DocId, u32>,
}

impl TermStats {
    /// Fragment describing one term's occurrences in a single document.
    fn single(doc_id: DocId, tf: u32) -> Self {
        let mut postings = HashMap::with_capacity(1);
        postings.insert(doc_id, tf);
        TermStats { df: 1, postings }
    }
}

/// Optional per-document metadata supplied by the ingestion side, used only
/// to derive a scoring weight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub length: Option<u32>,
}

impl DocumentMeta {
    /// Scalar score multiplier. Neutral (1.0) unless the document is flagged
    /// important.
    pub fn weight(&self) -> f64 {
        if self.important {
            1.5
        } else {
            1.0
        }
    }
}

/// Merge an incoming single-document fragment into the stored stats.
///
/// The fragment must carry exactly one postings entry; anything else means
/// the caller built it wrong, and failing loudly beats desynchronizing `df`
/// from the postings map. A repeated (term, doc) contribution accumulates
/// additively rather than overwriting.
fn merge_term_stats(existing: &mut TermStats, incoming: TermStats) {
    assert_eq!(
        incoming.postings.len(),
        1,
        "term stats fragment must hold exactly one posting"
    );
    let (doc_id, tf) = incoming
        .postings
        .into_iter()
        .next()
        .expect("fragment checked non-empty");
    match existing.postings.get_mut(&doc_id) {
        Some(count) => *count += tf,
        None => {
            existing.postings.insert(doc_id, tf);
            existing.df += 1;
        }
    }
}

/// In-memory inverted index. The B-tree is its only storage structure;
/// corpus-level counters live beside it and are instance-scoped.
pub struct InvertedIndex {
    dictionary: BTree<TermStats>,
    doc_count: u32,
    doc_lengths: HashMap<DocId, u32>,
}

impl InvertedIndex {
    pub fn new(min_degree: usize) -> Result<Self> {
        Ok(InvertedIndex {
            dictionary: BTree::new(min_degree)?,
            doc_count: 0,
            doc_lengths: HashMap::new(),
        })
    }

    /// Index one document given its already-normalized token sequence.
    ///
    /// Corpus counters advance exactly once per call, even for an empty token
    /// sequence, which leaves the dictionary untouched.
    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: &str, tokens: &[S]) {
        self.doc_count += 1;
        *self.doc_lengths.entry(doc_id.to_string()).or_insert(0) += tokens.len() as u32;

        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            *frequencies.entry(token.as_ref()).or_insert(0) += 1;
        }
        let distinct = frequencies.len();
        for (term, count) in frequencies {
            self.dictionary.insert(
                term.to_string(),
                TermStats::single(doc_id.to_string(), count),
                DuplicatePolicy::Merge(merge_term_stats),
            );
        }
        tracing::debug!(doc_id, tokens = tokens.len(), distinct, "indexed document");
    }

    /// Postings for a term, cloned. A missing term yields an empty map, same
    /// as a term with zero postings.
    pub fn postings(&self, term: &str) -> HashMap<DocId, u32> {
        self.dictionary
            .search(term)
            .map(|stats| stats.postings.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.dictionary.search(term).is_some()
    }

    /// All terms with their stats, ascending, lazily from the tree walk.
    pub fn all_terms(&self) -> InOrderIter<'_, TermStats> {
        self.dictionary.iter()
    }

    pub fn term_stats(&self, term: &str) -> Option<&TermStats> {
        self.dictionary.search(term)
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn doc_length(&self, doc_id: &str) -> Option<u32> {
        self.doc_lengths.get(doc_id).copied()
    }

    /// TF-IDF score for one (term, document) pair. Zero when the term has no
    /// posting for the document.
    pub fn score(&self, term: &str, doc_id: &str) -> f64 {
        let Some(stats) = self.dictionary.search(term) else {
            return 0.0;
        };
        let Some(&tf) = stats.postings.get(doc_id) else {
            return 0.0;
        };
        score::tf_idf(tf, stats.df, self.doc_count)
    }

    /// Like [`score`](Self::score), scaled by an externally derived document
    /// weight (see [`DocumentMeta::weight`]).
    pub fn score_weighted(&self, term: &str, doc_id: &str, weight: f64) -> f64 {
        self.score(term, doc_id) * weight
    }

    /// Diagnostic rendering: the level-order shape of the tree followed by
    /// every entry in sort order.
    pub fn describe(&self) -> String {
        let mut lines = vec![
            "B-tree dictionary (level order):".to_string(),
            self.dictionary.pretty_print(),
            String::new(),
            "Dictionary entries (in-order traversal):".to_string(),
        ];
        for (term, stats) in self.all_terms() {
            let mut entries: Vec<(&DocId, &u32)> = stats.postings.iter().collect();
            entries.sort();
            let postings_str = entries
                .iter()
                .map(|(doc_id, tf)| format!("{doc_id}:{tf}"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("- {term} -> df={} [{postings_str}]", stats.df));
        }
        lines.join("\n")
    }

    /// Node count of the underlying tree, for diagnostics.
    pub fn dictionary_nodes(&self) -> usize {
        self.dictionary.node_count()
    }
}
