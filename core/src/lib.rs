//! In-memory inverted index whose term dictionary is a B-tree.
//!
//! The [`btree`] module provides the ordered dictionary (search, merge-aware
//! insert, lazy in-order traversal). The [`index`] module layers term
//! statistics and corpus counters on top of it, and [`score`] turns those
//! statistics into TF-IDF relevance scores. [`tokenizer`] and [`corpus`] are
//! the ingestion-side adapters: everything else consumes already-normalized
//! tokens.

pub mod btree;
pub mod corpus;
pub mod error;
pub mod index;
pub mod score;
pub mod tokenizer;

pub use btree::{BTree, DuplicatePolicy};
pub use error::{Error, Result};
pub use index::{DocId, DocumentMeta, InvertedIndex, TermStats};
