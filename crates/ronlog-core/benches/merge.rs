use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ronlog_core::crdt::{RGA, merge, scan_tombstones};
use ronlog_core::hash::HashChain;
use ronlog_core::op::{Atom, Builder, Cursor, Frame, Marker, Op, Uuid};

struct Tier {
    name: &'static str,
    ops: u64,
    yarns: u64,
}

const TIERS: [Tier; 3] = [
    Tier {
        name: "small",
        ops: 100,
        yarns: 2,
    },
    Tier {
        name: "medium",
        ops: 2_000,
        yarns: 4,
    },
    Tier {
        name: "large",
        ops: 20_000,
        yarns: 8,
    },
];

/// One frame per yarn. Each yarn types a run of characters after an
/// anchor on the shared header, deleting every seventh one.
fn corpus(tier: &Tier) -> Vec<Frame> {
    let root = Uuid::event(1 << 54, 10 << 54);
    let per_yarn = tier.ops / tier.yarns;
    let mut header = Builder::new();
    header.append(&Op::header(root, RGA));
    let mut frames = vec![header.into_frame()];

    for y in 0..tier.yarns {
        let origin = (11 + y) << 54;
        let mut b = Builder::new();
        let mut parent = root;
        for i in 0..per_yarn {
            let id = Uuid::event((2 + i) << 30, origin);
            let op = if i % 7 == 6 {
                Op::marker(id, parent, Marker::Remove)
            } else {
                Op::value(id, parent, vec![Atom::string("x")])
            };
            b.append(&op);
            parent = id;
        }
        frames.push(b.into_frame());
    }
    frames
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("rga");

    for tier in &TIERS {
        let frames = corpus(tier);
        group.throughput(Throughput::Elements(tier.ops));

        group.bench_with_input(BenchmarkId::new("merge", tier.name), &frames, |b, frames| {
            b.iter(|| black_box(merge(frames.iter().map(Frame::cursor)).map(|f| f.as_str().len())));
        });

        let merged = merge(frames.iter().map(Frame::cursor)).expect("corpus is closed");
        group.bench_with_input(BenchmarkId::new("scan", tier.name), &merged, |b, merged| {
            b.iter(|| black_box(scan_tombstones(merged).map(|bits| bits.len())));
        });

        let chain = HashChain::for_object(&Uuid::ZERO, &RGA, Default::default());
        group.bench_with_input(BenchmarkId::new("hash", tier.name), &merged, |b, merged| {
            b.iter(|| black_box(chain.hash_frame(merged).map(|d| d.len())));
        });

        group.bench_with_input(BenchmarkId::new("decode", tier.name), &merged, |b, merged| {
            b.iter(|| {
                let mut cursor = Cursor::new(merged.as_str());
                let mut count = 0usize;
                while cursor.valid() {
                    count += 1;
                    cursor.advance();
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
