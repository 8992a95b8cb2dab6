use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lexitree_core::corpus::CorpusDoc;
use lexitree_core::tokenizer::tokenize;
use lexitree_core::{DocId, InvertedIndex};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize {
    10
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub title: Option<String>,
    pub url: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct TermEntry {
    pub term: String,
    pub df: u32,
}

/// Document text and metadata kept beside the index so results can show
/// titles and snippets. The index itself stores only term statistics.
pub struct StoredDoc {
    pub title: Option<String>,
    pub url: Option<String>,
    pub body: String,
    pub weight: f64,
}

/// Everything behind the lock: the index plus its document store. Node
/// splits are multi-step, so searches must never observe a tree mid-insert;
/// a single writer with concurrent readers is the whole policy.
pub struct IndexStore {
    pub index: InvertedIndex,
    pub docs: HashMap<DocId, StoredDoc>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<IndexStore>>,
}

pub fn build_app(corpus: Vec<CorpusDoc>, min_degree: usize) -> Result<Router> {
    let mut index = InvertedIndex::new(min_degree)?;
    let mut docs = HashMap::new();
    for doc in corpus {
        ingest(&mut index, &mut docs, doc);
    }
    tracing::info!(num_docs = index.doc_count(), "index ready");
    let state = AppState {
        store: Arc::new(RwLock::new(IndexStore { index, docs })),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/terms", get(terms_handler))
        .route("/describe", get(describe_handler))
        .route("/documents", post(add_document_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

fn ingest(index: &mut InvertedIndex, docs: &mut HashMap<DocId, StoredDoc>, doc: CorpusDoc) {
    let tokens = tokenize(&doc.body);
    index.add_document(&doc.id, &tokens);
    docs.insert(
        doc.id,
        StoredDoc {
            title: doc.title,
            url: doc.url,
            body: doc.body,
            weight: doc.meta.weight(),
        },
    );
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let terms = tokenize(&params.q);
    let store = state.store.read();

    // Sum per-document tf-idf over the query terms, weighted by metadata.
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for term in &terms {
        for (doc_id, _tf) in store.index.postings(term) {
            let weight = store.docs.get(&doc_id).map_or(1.0, |d| d.weight);
            let contrib = store.index.score_weighted(term, &doc_id, weight);
            *scores.entry(doc_id).or_insert(0.0) += contrib;
        }
    }

    let mut scored: Vec<(DocId, f64)> = scores.into_iter().collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let total_hits = scored.len();
    let k = params.k.clamp(1, 100);

    let raw_terms: Vec<String> = params.q.split_whitespace().map(str::to_string).collect();
    let mut results = Vec::new();
    for (doc_id, score) in scored.into_iter().take(k) {
        let (title, url, snippet) = match store.docs.get(&doc_id) {
            Some(doc) => (
                doc.title.clone(),
                doc.url.clone(),
                snippet_from_text(&doc.body, &raw_terms),
            ),
            None => (None, None, None),
        };
        results.push(SearchHit { doc_id, score, title, url, snippet });
    }

    Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits,
        results,
    })
}

pub async fn terms_handler(State(state): State<AppState>) -> Json<Vec<TermEntry>> {
    let store = state.store.read();
    let entries = store
        .index
        .all_terms()
        .map(|(term, stats)| TermEntry { term: term.to_string(), df: stats.df })
        .collect();
    Json(entries)
}

pub async fn describe_handler(State(state): State<AppState>) -> String {
    state.store.read().index.describe()
}

pub async fn add_document_handler(
    State(state): State<AppState>,
    Json(doc): Json<CorpusDoc>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, String)> {
    let mut store = state.store.write();
    if store.docs.contains_key(&doc.id) {
        return Err((StatusCode::CONFLICT, format!("document {} already indexed", doc.id)));
    }
    let doc_id = doc.id.clone();
    let IndexStore { index, docs } = &mut *store;
    ingest(index, docs, doc);
    let response = serde_json::json!({
        "doc_id": doc_id,
        "num_docs": index.doc_count(),
    });
    Ok((StatusCode::CREATED, Json(response)))
}

fn snippet_from_text(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    // First case-insensitive match of any raw query term anchors the snippet.
    let lower = text.to_lowercase();
    let mut first_idx: Option<usize> = None;
    for term in raw_terms {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(pos) = lower.find(&needle) {
            first_idx = Some(pos.min(text.len()));
            break;
        }
    }
    let snippet = match first_idx {
        Some(idx) => {
            let idx = idx.min(text.len());
            let mut start = idx.saturating_sub(100);
            while start > 0 && !text.is_char_boundary(start) {
                start -= 1;
            }
            let mut end = (idx + 200).min(text.len());
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, raw_terms))
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut out = snippet.to_string();
    for term in terms {
        if term.trim().is_empty() {
            continue;
        }
        let Ok(pattern) = regex::RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        out = pattern
            .replace_all(&out, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0]))
            .to_string();
    }
    out
}
