use criterion::{criterion_group, criterion_main, Criterion};
use lexitree_core::btree::{BTree, DuplicatePolicy};
use lexitree_core::InvertedIndex;

fn synthetic_doc(seed: usize) -> Vec<String> {
    (0..80).map(|j| format!("term{:03}", (seed * 13 + j * 7) % 500)).collect()
}

fn bench_btree_insert(c: &mut Criterion) {
    c.bench_function("btree_insert_1000", |b| {
        b.iter(|| {
            let mut tree = BTree::new(3).unwrap();
            for i in 0..1000u32 {
                tree.insert(format!("key{:04}", (i * 37) % 1000), i, DuplicatePolicy::Replace);
            }
            tree.node_count()
        })
    });
}

fn bench_index_documents(c: &mut Criterion) {
    c.bench_function("index_100_docs", |b| {
        b.iter(|| {
            let mut idx = InvertedIndex::new(3).unwrap();
            for d in 0..100 {
                idx.add_document(&format!("doc{d}"), &synthetic_doc(d));
            }
            idx.doc_count()
        })
    });
}

criterion_group!(benches, bench_btree_insert, bench_index_documents);
criterion_main!(benches);
