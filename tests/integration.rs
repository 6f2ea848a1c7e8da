use tree_support::{
    AvoidanceType, GenerationDiagnostics, InterfacePreference, LayerGeometry, Point, Polygons,
    TreeSupportCancelToken, TreeSupportInput, TreeSupportOutput, TreeSupportSettings,
};

fn settings() -> TreeSupportSettings {
    TreeSupportSettings::from_nozzle(400, 200)
        .with_maximum_move_distance(500, 250)
        .with_tip_layers(5)
}

fn flat_layers(count: usize) -> Vec<LayerGeometry> {
    vec![LayerGeometry::default(); count]
}

fn run(layers: Vec<LayerGeometry>, settings: &TreeSupportSettings) -> TreeSupportOutput {
    // The library emits `tracing` events but installs no subscriber itself
    // (it has no Bevy `App` to borrow one from); wire up a test-local one so
    // `cargo test -- --nocapture` shows them.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let input = TreeSupportInput::new(layers);
    let cancel = TreeSupportCancelToken::new();
    tree_support::generate_tree_supports(&input, settings, &cancel).expect("generation should succeed")
}

#[test]
fn empty_overhang_input_produces_empty_output_with_no_errors() {
    let settings = settings();
    let output = run(flat_layers(20), &settings);

    assert_eq!(output.layers.len(), 20);
    assert_eq!(output.diagnostics.total_branches, 0);
    for layer in &output.layers {
        assert!(layer.support_base.is_empty());
    }
}

/// Scenario 1: a single disk floating above a bare bed grows one trunk that
/// reaches layer 0 and leaves a roof interface directly beneath the disk.
#[test]
fn single_floating_disk_grows_one_trunk_to_the_plate() {
    let settings = settings();
    let top_layer = 49;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(0, 0), 10_000, 24);

    let output = run(layers, &settings);

    assert!(!output.layers[0].support_base.is_empty(), "trunk should reach the build plate");
    let has_roof = !output.layers[top_layer].support_roof_interface.is_empty()
        || !output.layers[top_layer - 1].support_roof_interface.is_empty();
    assert!(has_roof, "a roof interface should appear directly beneath the overhang");
    assert_eq!(output.diagnostics.lost_branches, 0);

    // The trunk has had 49 layers to grow from `min_radius`, far more than
    // `tip_layers = 5`, so it should have reached at least `branch_radius`
    // by the time it lands at the build plate (spec scenario 1: "a single
    // trunk of final radius >= branch_radius").
    let min_trunk_area = std::f64::consts::PI * (settings.branch_radius as f64).powi(2);
    assert!(
        output.layers[0].support_base.area() >= min_trunk_area * 0.9,
        "trunk at the build plate should have grown to at least branch_radius: area {} vs minimum {} for radius {}",
        output.layers[0].support_base.area(),
        min_trunk_area,
        settings.branch_radius,
    );
}

/// Scenario 2: two nearby disks should converge into a single trunk well
/// before they reach the build plate.
#[test]
fn two_nearby_disks_merge_into_one_trunk() {
    let settings = settings();
    let top_layer = 59;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(-3_000, 0), 5_000, 24)
        .union(&Polygons::circle(Point::new(3_000, 0), 5_000, 24));

    let output = run(layers, &settings);

    let components_at_plate = output.layers[0].support_base.to_point_rings().len();
    assert_eq!(components_at_plate, 1, "the two branches should have merged by the build plate");
    assert!(output.diagnostics.total_branches >= 2);
}

/// Scenario 4: a model obstacle sits beneath part of an overhang; support
/// must route around it rather than overlapping it.
#[test]
fn support_routes_around_a_model_obstacle() {
    let mut settings = settings();
    settings.xy_distance = 1_000;
    settings.xy_min_distance = 500;

    let top_layer = 39;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(0, 0), 6_000, 24);

    // A solid column directly beneath part of the overhang, spanning from
    // the bed partway up.
    let obstacle = Polygons::circle(Point::new(2_000, 0), 1_500, 16);
    for layer in layers.iter_mut().take(20) {
        layer.outlines = obstacle.clone();
    }

    let output = run(layers, &settings);

    for (layer_idx, layer) in output.layers.iter().enumerate().take(20) {
        let overlap = layer.support_base.intersection(&obstacle);
        assert!(overlap.is_empty(), "support overlapped the model obstacle on layer {layer_idx}");
    }
}

/// Scenario 5: a user-painted blocker beneath an overhang must never be
/// covered by support, even if the branch has to detour or gets culled.
#[test]
fn support_never_covers_a_blocker() {
    let settings = settings();
    let top_layer = 29;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(0, 0), 4_000, 24);

    let blocker = Polygons::circle(Point::new(0, 0), 2_000, 16);
    for layer in layers.iter_mut().take(10) {
        layer.blockers = blocker.clone();
    }

    let output = run(layers, &settings);

    for layer in output.layers.iter().take(10) {
        let overlap = layer.support_base.intersection(&blocker);
        assert!(overlap.is_empty());
    }
}

/// Scenario 3: an overhang directly above a model plateau lands on it
/// instead of continuing to the build plate.
#[test]
fn branch_lands_gracefully_on_a_model_plateau() {
    let mut settings = settings();
    settings.support_rests_on_model = true;

    let top_layer = 29;
    let plateau_layer = 10;
    let mut layers = flat_layers(top_layer + 1);

    let plateau = Polygons::circle(Point::new(0, 0), 6_000, 24);
    layers[top_layer].overhangs = Polygons::circle(Point::new(0, 0), 1_500, 16);
    layers[plateau_layer].placeable_top_surfaces = plateau.clone();
    for layer in layers.iter_mut().take(plateau_layer + 1) {
        layer.outlines = plateau.clone();
    }

    let output = run(layers, &settings);

    assert!(output.layers[0].support_base.is_empty(), "no support should continue below the plateau");
    let floor_present = (plateau_layer..=plateau_layer + settings.support_bottom_layers as usize)
        .filter(|&l| l <= top_layer)
        .any(|l| !output.layers[l].support_floor_interface.is_empty());
    assert!(floor_present, "a floor interface should appear on or above the plateau");
}

#[test]
fn generation_is_deterministic_across_runs() {
    let settings = settings();
    let top_layer = 29;
    let mut layers = flat_layers(top_layer + 1);
    layers[top_layer].overhangs = Polygons::circle(Point::new(-2_000, 1_000), 4_000, 20)
        .union(&Polygons::circle(Point::new(3_000, -1_500), 3_000, 20));

    let first = run(layers.clone(), &settings);
    let second = run(layers, &settings);

    assert_eq!(first.diagnostics.total_branches, second.diagnostics.total_branches);
    for (a, b) in first.layers.iter().zip(&second.layers) {
        assert_eq!(a.support_base, b.support_base);
        assert_eq!(a.support_roof_interface, b.support_roof_interface);
        assert_eq!(a.support_floor_interface, b.support_floor_interface);
    }
}

#[test]
fn invalid_settings_are_rejected_up_front() {
    let input = TreeSupportInput::new(flat_layers(5));
    let cancel = TreeSupportCancelToken::new();
    let mut bad = settings();
    bad.tip_layers = 0;

    let result = tree_support::generate_tree_supports(&input, &bad, &cancel);
    assert!(result.is_err());
}

#[test]
fn interface_preference_and_avoidance_type_are_exposed() {
    // Compile-time / API-shape check: both enums round-trip through the
    // public settings surface used by callers configuring a run.
    let mut s = settings();
    s = s.with_interface_preference(InterfacePreference::InterfaceAreaOverwritesSupport);
    assert_eq!(s.interface_preference, InterfacePreference::InterfaceAreaOverwritesSupport);
    assert!(AvoidanceType::FastSafe.is_safe());

    let _: GenerationDiagnostics = GenerationDiagnostics::default();
}
