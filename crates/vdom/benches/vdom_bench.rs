use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vdom::{ArenaHost, ElementBuilder, Prop, VNode, apply_patch, diff, materialize, reorder};

const LIST_LEN: usize = 5_000;
const TREE_BLOCKS: usize = 2_000;

type Node = VNode<ArenaHost>;

fn keyed_list(keys: impl Iterator<Item = usize>) -> Node {
    ElementBuilder::new("ul")
        .children(keys.map(|k| {
            ElementBuilder::new("li")
                .key(k.to_string())
                .prop("className", "row")
                .text(format!("row {k}"))
                .build()
                .expect("build failed")
        }))
        .build()
        .expect("build failed")
}

/// `<div class=box><span>label</span><img src=..></div>` repeated, with the
/// label and style varying by `generation`.
fn blocks(count: usize, generation: usize) -> Node {
    ElementBuilder::new("main")
        .children((0..count).map(|i| {
            let label = if i % 7 == 0 {
                format!("block {i} gen {generation}")
            } else {
                format!("block {i}")
            };
            ElementBuilder::new("div")
                .prop("className", "box")
                .prop(
                    "style",
                    Prop::map([("width", format!("{}px", 10 + (i + generation) % 3))]),
                )
                .child(
                    ElementBuilder::new("span")
                        .text(label)
                        .build()
                        .expect("build failed"),
                )
                .child(
                    ElementBuilder::new("img")
                        .prop("src", "x")
                        .build()
                        .expect("build failed"),
                )
                .build()
                .expect("build failed")
        }))
        .build()
        .expect("build failed")
}

fn bench_reorder_reversed(c: &mut Criterion) {
    let current: Vec<Option<String>> = (0..LIST_LEN).map(|k| Some(k.to_string())).collect();
    let next: Vec<Option<String>> = (0..LIST_LEN).rev().map(|k| Some(k.to_string())).collect();
    let current: Vec<Option<&str>> = current.iter().map(Option::as_deref).collect();
    let next: Vec<Option<&str>> = next.iter().map(Option::as_deref).collect();
    c.bench_function("bench_reorder_reversed", |b| {
        b.iter(|| black_box(reorder(black_box(&current), black_box(&next))));
    });
}

fn bench_diff_keyed_shuffle(c: &mut Criterion) {
    let current = keyed_list(0..LIST_LEN);
    let next = keyed_list((0..LIST_LEN).map(|k| (k * 7919) % LIST_LEN));
    c.bench_function("bench_diff_keyed_shuffle", |b| {
        b.iter(|| black_box(diff(black_box(&current), black_box(&next)).len()));
    });
}

fn bench_diff_large_tree(c: &mut Criterion) {
    let current = blocks(TREE_BLOCKS, 0);
    let next = blocks(TREE_BLOCKS, 1);
    c.bench_function("bench_diff_large_tree", |b| {
        b.iter(|| black_box(diff(black_box(&current), black_box(&next)).len()));
    });
}

fn bench_apply_large_tree(c: &mut Criterion) {
    let current = blocks(TREE_BLOCKS, 0);
    let next = blocks(TREE_BLOCKS, 1);
    let patches = diff(&current, &next);
    c.bench_function("bench_apply_large_tree", |b| {
        b.iter_batched(
            || {
                let mut host = ArenaHost::new();
                let root = materialize(&mut host, &current).expect("materialize failed");
                (host, root)
            },
            |(mut host, root)| {
                let out = apply_patch(&mut host, &root, &patches).expect("apply failed");
                black_box(out);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_reorder_reversed,
    bench_diff_keyed_shuffle,
    bench_diff_large_tree,
    bench_apply_large_tree
);
criterion_main!(benches);
