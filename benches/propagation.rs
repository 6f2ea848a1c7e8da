use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tree_support::{
    generate_tree_supports, LayerGeometry, Point, Polygons, TreeSupportCancelToken,
    TreeSupportInput, TreeSupportSettings,
};

fn flat_layers(count: usize) -> Vec<LayerGeometry> {
    vec![LayerGeometry::default(); count]
}

fn single_trunk_pipeline() {
    let settings = TreeSupportSettings::from_nozzle(400, 200);
    let top_layer = 99;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(0, 0), 10_000, 24);

    let input = TreeSupportInput::new(layers);
    let cancel = TreeSupportCancelToken::new();
    black_box(generate_tree_supports(&input, &settings, &cancel).unwrap());
}

fn merging_trunks_pipeline() {
    let settings = TreeSupportSettings::from_nozzle(400, 200);
    let top_layer = 119;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(-3_000, 0), 5_000, 24)
        .union(&Polygons::circle(Point::new(3_000, 0), 5_000, 24))
        .union(&Polygons::circle(Point::new(0, 6_000), 5_000, 24));

    let input = TreeSupportInput::new(layers);
    let cancel = TreeSupportCancelToken::new();
    black_box(generate_tree_supports(&input, &settings, &cancel).unwrap());
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("single trunk, 100 layers", |b| b.iter(single_trunk_pipeline));
    c.bench_function("three trunks merging, 120 layers", |b| {
        b.iter(merging_trunks_pipeline)
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
