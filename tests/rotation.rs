//! Translation and rotation round-trip properties (spec §8: "rotating all
//! inputs by theta rotates outputs by theta"; scenario 6: "complete_objects"
//! -style identical copies offset from one another produce translated
//! output).

use tree_support::{
    LayerGeometry, Point, Polygons, TreeSupportCancelToken, TreeSupportInput, TreeSupportSettings,
};

fn settings() -> TreeSupportSettings {
    TreeSupportSettings::from_nozzle(400, 200).with_tip_layers(5)
}

fn disk_overhang_layers(top_layer: usize, center: Point) -> Vec<LayerGeometry> {
    let mut layers = vec![LayerGeometry::default(); top_layer + 1];
    layers[top_layer].overhangs = Polygons::circle(center, 6_000, 24);
    layers
}

/// Rotates every polygon on every layer around the origin by `radians`,
/// using `Point::rotate` through `Polygons::map_points`.
fn rotate_layers(layers: &[LayerGeometry], radians: f64) -> Vec<LayerGeometry> {
    layers
        .iter()
        .map(|layer| LayerGeometry {
            outlines: layer.outlines.map_points(|p| p.rotate(radians)),
            overhangs: layer.overhangs.map_points(|p| p.rotate(radians)),
            placeable_top_surfaces: layer.placeable_top_surfaces.map_points(|p| p.rotate(radians)),
            blockers: layer.blockers.map_points(|p| p.rotate(radians)),
            enforcers: layer.enforcers.map_points(|p| p.rotate(radians)),
            z: layer.z,
        })
        .collect()
}

fn run(layers: Vec<LayerGeometry>) -> tree_support::TreeSupportOutput {
    let input = TreeSupportInput::new(layers);
    let cancel = TreeSupportCancelToken::new();
    tree_support::generate_tree_supports(&input, &settings(), &cancel).expect("generation should succeed")
}

/// Translating every input polygon by the same offset should translate the
/// output polygons by that offset too, up to the simplification tolerance;
/// the pipeline has no notion of absolute position, only relative geometry.
#[test]
fn translating_the_model_translates_the_output() {
    const OFFSET: i64 = 30_000;

    let base = run(disk_overhang_layers(29, Point::new(0, 0)));
    let shifted = run(disk_overhang_layers(29, Point::new(OFFSET, 0)));

    assert_eq!(base.layers.len(), shifted.layers.len());

    for (base_layer, shifted_layer) in base.layers.iter().zip(&shifted.layers) {
        // Area is translation-invariant exactly; it's a robust proxy for
        // "the same shape, just moved" without requiring bit-exact polygon
        // vertex equality out of independent offset/union passes.
        let area_delta = (base_layer.support_base.area() - shifted_layer.support_base.area()).abs();
        let scale = base_layer.support_base.area().max(1.0);
        assert!(
            area_delta / scale < 0.05,
            "support_base area should be translation-invariant: {} vs {}",
            base_layer.support_base.area(),
            shifted_layer.support_base.area(),
        );

        if let (Some(base_centroid), Some(shifted_centroid)) =
            (base_layer.support_base.centroid(), shifted_layer.support_base.centroid())
        {
            let moved = base_centroid.translate(OFFSET, 0);
            assert!(
                moved.distance_to(shifted_centroid) < 1_000.0,
                "centroid should have moved by the same offset as the input",
            );
        }
    }
}

/// Running the same input twice must produce byte-equal output; the
/// pipeline's tie-break rules must not leave any result to thread
/// interleaving.
#[test]
fn repeated_runs_on_the_same_input_are_byte_equal() {
    let layers = disk_overhang_layers(29, Point::new(1_000, -2_000));

    let first = run(layers.clone());
    let second = run(layers);

    for (a, b) in first.layers.iter().zip(&second.layers) {
        assert_eq!(a.support_base, b.support_base);
        assert_eq!(a.support_roof_interface, b.support_roof_interface);
        assert_eq!(a.support_floor_interface, b.support_floor_interface);
    }
}

/// Rotating every input polygon about the origin by `theta` should rotate
/// the output polygons by the same `theta`, up to simplification tolerance;
/// like translation, the pipeline has no notion of absolute orientation.
#[test]
fn rotating_the_model_rotates_the_output() {
    let radians = std::f64::consts::FRAC_PI_4;
    let center = Point::new(5_000, -2_000);

    let base_layers = disk_overhang_layers(29, center);
    let rotated_layers = rotate_layers(&base_layers, radians);

    let base = run(base_layers);
    let rotated = run(rotated_layers);

    assert_eq!(base.layers.len(), rotated.layers.len());

    for (base_layer, rotated_layer) in base.layers.iter().zip(&rotated.layers) {
        let area_delta = (base_layer.support_base.area() - rotated_layer.support_base.area()).abs();
        let scale = base_layer.support_base.area().max(1.0);
        assert!(
            area_delta / scale < 0.05,
            "support_base area should be rotation-invariant: {} vs {}",
            base_layer.support_base.area(),
            rotated_layer.support_base.area(),
        );

        if let (Some(base_centroid), Some(rotated_centroid)) =
            (base_layer.support_base.centroid(), rotated_layer.support_base.centroid())
        {
            let expected = base_centroid.rotate(radians);
            assert!(
                expected.distance_to(rotated_centroid) < 1_000.0,
                "centroid should have rotated by theta along with the input",
            );
        }
    }
}
