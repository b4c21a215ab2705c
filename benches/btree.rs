use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use saplingdb::btree::BTree;
use saplingdb::row::Row;

fn sample_row(id: u32) -> Row {
    Row {
        id,
        username: format!("user{id}"),
        email: format!("person{id}@example.com"),
    }
}

fn bench_sequential_insert(c: &mut Criterion) {
    c.bench_function("insert_1000_sequential", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let mut tree = BTree::open(dir.path().join("bench.db")).unwrap();
            for id in 1..=1000 {
                tree.insert(&sample_row(id)).unwrap();
            }
            tree
        })
    });
}

fn bench_shuffled_insert(c: &mut Criterion) {
    let mut ids: Vec<u32> = (1..=1000).collect();
    ids.sort_by_key(|&id| (id * 389) % 997);

    c.bench_function("insert_1000_shuffled", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let mut tree = BTree::open(dir.path().join("bench.db")).unwrap();
            for id in &ids {
                tree.insert(&sample_row(*id)).unwrap();
            }
            tree
        })
    });
}

fn bench_full_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut tree = BTree::open(dir.path().join("bench.db")).unwrap();
    for id in 1..=1000 {
        tree.insert(&sample_row(id)).unwrap();
    }

    c.bench_function("scan_1000", |b| {
        b.iter(|| {
            let count = tree.scan().unwrap().count();
            assert_eq!(count, 1000);
        })
    });
}

criterion_group!(
    benches,
    bench_sequential_insert,
    bench_shuffled_insert,
    bench_full_scan
);
criterion_main!(benches);
