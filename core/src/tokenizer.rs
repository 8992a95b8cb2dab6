use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a", "an", "and", "are", "as", "at", "be", "been", "before", "but", "by", "come",
            "for", "from", "has", "have", "he", "her", "his", "how", "if", "in", "into", "is",
            "it", "its", "of", "on", "or", "that", "the", "their", "then", "there", "these",
            "they", "this", "to", "was", "we", "were", "what", "when", "which", "who", "will",
            "with",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Normalize and tokenize raw text: NFKC normalization, lowercase, word
/// extraction, stopword removal, and English stemming. Deterministic and
/// side-effect free; the index itself never touches raw text.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if is_stopword(token) {
            continue;
        }
        tokens.push(STEMMER.stem(token).to_string());
    }
    tokens
}
