//! Corpus file loading for the CLI and server adapters.
//!
//! Accepts a `.json` file holding a single document object or an array of
//! them, or a `.jsonl` file with one document per line. The core index never
//! reads files itself; adapters load a corpus and feed tokens in.

use crate::error::{Error, Result};
use crate::index::DocumentMeta;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One raw document as it appears in a corpus file.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusDoc {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub meta: DocumentMeta,
}

/// Load documents from a JSON or JSONL file, by extension.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<CorpusDoc>> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("jsonl") => load_jsonl(path),
        Some("json") => load_json(path),
        other => Err(Error::UnsupportedCorpus(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn load_jsonl(path: &Path) -> Result<Vec<CorpusDoc>> {
    let reader = BufReader::new(File::open(path)?);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        docs.push(serde_json::from_str(&line)?);
    }
    Ok(docs)
}

fn load_json(path: &Path) -> Result<Vec<CorpusDoc>> {
    let reader = BufReader::new(File::open(path)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_json_array() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            f,
            r#"[{{"id": "d1", "body": "red blue red"}},
                {{"id": "d2", "title": "T", "body": "blue green", "important": true}}]"#
        )
        .unwrap();
        let docs = load_corpus(f.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "d1");
        assert!(!docs[0].meta.important);
        assert!(docs[1].meta.important);
    }

    #[test]
    fn loads_jsonl_skipping_blank_lines() {
        let mut f = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(f, r#"{{"id": "d1", "body": "one"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"id": "d2", "body": "two", "length": 1}}"#).unwrap();
        let docs = load_corpus(f.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].meta.length, Some(1));
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(load_corpus("corpus.txt").is_err());
    }
}
