// model = "claude-opus-4-5"
// created = "2026-08-01"
// modified = "2026-08-02"
// driver = "Isaac Clayton"

//! Micro-benchmarks for the replicated sequence hot paths.

use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use omnisync::crdt::sequence::Sequence;
use omnisync::crdt::version::VersionMap;

const DOC_SIZE: usize = 2000;

fn sequential_append(c: &mut Criterion) {
    c.bench_function("sequential_append_2k", |b| {
        b.iter(|| {
            let mut doc = Sequence::new(1);
            for i in 0..DOC_SIZE {
                doc.local_insert(i, b'a' + (i % 26) as u8);
            }
            black_box(doc.len())
        })
    });
}

fn random_insert(c: &mut Criterion) {
    c.bench_function("random_insert_2k", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            let mut doc = Sequence::new(1);
            for _ in 0..DOC_SIZE {
                let position = rng.gen_range(0..=doc.len());
                doc.local_insert(position, b'x');
            }
            black_box(doc.len())
        })
    });
}

fn delta_sync(c: &mut Criterion) {
    let mut source = Sequence::new(1);
    for i in 0..DOC_SIZE {
        source.local_insert(i, b'a' + (i % 26) as u8);
    }
    let empty_peer = VersionMap::new(2);

    c.bench_function("delta_produce_2k", |b| {
        b.iter(|| black_box(source.delta(&empty_peer).len()))
    });

    let delta = source.delta(&empty_peer);
    c.bench_function("delta_apply_2k", |b| {
        b.iter(|| {
            let mut sink = Sequence::new(2);
            sink.apply_delta(&delta);
            black_box(sink.len())
        })
    });
}

fn reclamation(c: &mut Criterion) {
    c.bench_function("gc_local_1k_tombstones", |b| {
        b.iter_with_setup(
            || {
                let mut doc = Sequence::new(1);
                for i in 0..DOC_SIZE {
                    doc.local_insert(i, b'x');
                }
                for _ in 0..DOC_SIZE / 2 {
                    doc.local_delete(0);
                }
                doc
            },
            |mut doc| black_box(doc.gc_local(0)),
        )
    });
}

criterion_group!(
    benches,
    sequential_append,
    random_insert,
    delta_sync,
    reclamation
);
criterion_main!(benches);
