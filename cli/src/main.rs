use anyhow::Result;
use clap::{Parser, Subcommand};
use lexitree_core::corpus::{load_corpus, CorpusDoc};
use lexitree_core::tokenizer::tokenize;
use lexitree_core::InvertedIndex;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "lexitree")]
#[command(about = "B-tree backed inverted index over a document corpus", long_about = None)]
struct Cli {
    /// B-tree minimum degree (branching factor bound)
    #[arg(long, default_value_t = 3)]
    min_degree: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the built-in sample corpus and print diagnostics plus sample lookups
    Demo,
    /// Build an index from a JSON/JSONL corpus and start an interactive term prompt
    Search {
        /// Corpus file (.json or .jsonl)
        #[arg(long)]
        corpus: String,
    },
    /// Print the dictionary's level-order shape and in-order entries
    Describe {
        /// Corpus file (.json or .jsonl)
        #[arg(long)]
        corpus: String,
    },
}

fn sample_corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        ("d1", "Information retrieval relies on inverted indexes to be fast."),
        ("d2", "A B-tree dictionary keeps terms balanced for quick lookups."),
        ("d3", "Tokenization and normalization come before indexing in the pipeline."),
        ("d4", "Visualization of the B-tree helps debug the dictionary layout."),
        ("d5", "Search engines map user terms to documents using inverted indexes."),
    ]
}

fn build_index(docs: &[CorpusDoc], min_degree: usize) -> Result<InvertedIndex> {
    let mut index = InvertedIndex::new(min_degree)?;
    for doc in docs {
        let tokens = tokenize(&doc.body);
        index.add_document(&doc.id, &tokens);
    }
    tracing::info!(
        num_docs = index.doc_count(),
        num_terms = index.all_terms().count(),
        "built index"
    );
    Ok(index)
}

fn run_demo(min_degree: usize) -> Result<()> {
    let mut index = InvertedIndex::new(min_degree)?;
    for (doc_id, text) in sample_corpus() {
        index.add_document(doc_id, &tokenize(text));
    }
    println!("{}", index.describe());
    println!("\nSample lookups:");
    for raw in ["b", "tree", "dictionary", "pipeline", "missing"] {
        let terms = tokenize(raw);
        let Some(term) = terms.first() else {
            println!("- '{raw}': no terms after preprocessing");
            continue;
        };
        let postings = index.postings(term);
        if postings.is_empty() {
            println!("- '{raw}': no match");
        } else {
            let mut hits: Vec<_> = postings.into_iter().collect();
            hits.sort();
            let rendered = hits
                .iter()
                .map(|(doc_id, tf)| format!("{doc_id} (tf={tf})"))
                .collect::<Vec<_>>()
                .join(", ");
            println!("- '{raw}': {rendered}");
        }
    }
    Ok(())
}

fn search_loop(index: &InvertedIndex) -> Result<()> {
    println!("Enter one or more terms. Type 'quit' or 'exit' to leave.\n");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("term> ");
        stdout.flush()?;
        let mut raw = String::new();
        if stdin.lock().read_line(&mut raw)? == 0 {
            break;
        }
        let raw = raw.trim();
        if matches!(raw.to_lowercase().as_str(), "quit" | "exit") {
            println!("bye");
            break;
        }
        let terms = tokenize(raw);
        if terms.is_empty() {
            println!("(no terms found after preprocessing)");
            continue;
        }
        for term in &terms {
            let postings = index.postings(term);
            if postings.is_empty() {
                println!("{term}: no documents found");
                continue;
            }
            let mut hits: Vec<_> = postings.into_iter().collect();
            hits.sort();
            let rendered = hits
                .iter()
                .map(|(doc_id, tf)| {
                    format!("{doc_id} (tf={tf}, score={:.3})", index.score(term, doc_id))
                })
                .collect::<Vec<_>>()
                .join(", ");
            println!("{term}: {rendered}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => run_demo(cli.min_degree),
        Commands::Search { corpus } => {
            let docs = load_corpus(&corpus)?;
            let index = build_index(&docs, cli.min_degree)?;
            search_loop(&index)
        }
        Commands::Describe { corpus } => {
            let docs = load_corpus(&corpus)?;
            let index = build_index(&docs, cli.min_degree)?;
            println!("{}", index.describe());
            Ok(())
        }
    }
}
