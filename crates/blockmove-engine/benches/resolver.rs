use blockmove_engine::{BlockKind, DocumentTree, DropResolver, LayoutMap, Point};
use criterion::{Criterion, criterion_group, criterion_main};

/// `sections` top-level items, each with `per_section` children
fn generate_outline(sections: usize, per_section: usize) -> DocumentTree {
    let mut tree = DocumentTree::new();
    for section in 0..sections {
        let parent = tree
            .push(None, BlockKind::ListItem, format!("Section {section}"))
            .unwrap();
        for item in 0..per_section {
            tree.push(Some(&parent), BlockKind::ListItem, format!("Item {item}"))
                .unwrap();
        }
    }
    tree
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver");
    group.sample_size(20);

    let tree = generate_outline(100, 20);
    let layout = LayoutMap::stacked(&tree, 0.0, 24.0, 16.0);
    let dragged = tree.roots()[0].clone();
    let resolver = DropResolver::default();

    group.bench_function("resolve_2100_blocks", |b| {
        b.iter(|| {
            let pointer = Point::new(40.0, std::hint::black_box(24.0 * 1500.5));
            let target = resolver.resolve(&tree, &layout, &dragged, pointer);
            std::hint::black_box(target);
        });
    });

    group.bench_function("move_block", |b| {
        let mut tree = tree.clone();
        let first = tree.roots()[0].clone();
        let last = tree.roots()[tree.roots().len() - 1].clone();
        b.iter(|| {
            let target = tree
                .target_for(&last, blockmove_engine::Relation::After)
                .unwrap();
            let record = tree.move_block(&first, &target).unwrap();
            std::hint::black_box(record);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_resolution);
criterion_main!(benches);
