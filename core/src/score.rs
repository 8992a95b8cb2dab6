//! TF-IDF relevance scoring over term statistics.
//!
//! The formula uses add-one smoothing on both sides of the IDF ratio, so the
//! result stays positive and finite even when a term occurs in every
//! document or in none.

/// Inverse document frequency with smoothing: `ln((N + 1) / (df + 1)) + 1`
/// where `N = max(1, doc_count)`.
pub fn idf(df: u32, doc_count: u32) -> f64 {
    let n = doc_count.max(1) as f64;
    ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0
}

/// TF-IDF score for one (term, document) pair. Zero when the term does not
/// occur in the document; otherwise strictly positive, strictly increasing
/// in `tf` and strictly decreasing in `df`.
pub fn tf_idf(tf: u32, df: u32, doc_count: u32) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    tf as f64 * idf(df, doc_count)
}
