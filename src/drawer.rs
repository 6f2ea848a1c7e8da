//! `Drawer`: rasterizes the frozen element tree into printable polygons.
//!
//! Circle-per-element plus convex-hull ovalisation between parent and child
//! is grounded in the same "assemble a polygon from adjacent cross-section
//! spans" shape as the teacher's `mesher.rs`, here over disks instead of
//! heightfield spans; convex hulls are computed with `geo::ConvexHull`.

use rayon::prelude::*;

use crate::element::SupportElement;
use crate::geometry::Polygons;
use crate::input::LayerOutput;
use crate::settings::{InterfacePreference, TreeSupportSettings};

const CIRCLE_RESOLUTION: usize = 25;

/// Rasterizes every layer in parallel; each layer's output only depends on
/// its own and its immediate neighbors' elements, so no per-layer barrier is
/// needed here unlike propagation.
pub fn draw_all(layers: &[Vec<SupportElement>], settings: &TreeSupportSettings) -> Vec<LayerOutput> {
    (0..layers.len())
        .into_par_iter()
        .map(|layer| draw_layer(layers, layer, settings))
        .collect()
}

fn draw_layer(layers: &[Vec<SupportElement>], layer: usize, settings: &TreeSupportSettings) -> LayerOutput {
    let elements = &layers[layer];

    let mut per_element = Vec::with_capacity(elements.len());
    for element in elements {
        per_element.push(element_footprint(element, settings));
    }

    let mut raw_support = Polygons::empty();
    for footprint in &per_element {
        raw_support = raw_support.union(footprint);
    }

    // A parent lives one layer above (`layer_idx + 1`); `.get` alone handles
    // the topmost layer, where no such layer exists.
    for (idx, element) in elements.iter().enumerate() {
        if element.flags.skip_ovalisation {
            continue;
        }
        let Some(parent_layer) = layers.get(layer + 1) else {
            continue;
        };
        for &parent_id in &element.parents {
            let Some(parent) = parent_layer.get(parent_id.0 as usize) else {
                continue;
            };
            if parent.flags.skip_ovalisation {
                continue;
            }

            let oval = oval_between(&per_element[idx], &element_footprint(parent, settings));
            raw_support = raw_support.union(&oval);
        }
    }

    let roof_interface = roof_interface_footprint(elements, &per_element, settings);
    let floor_interface = floor_interface_footprint(layers, layer, settings);

    let (support_base, roof, floor) = resolve_interfaces(raw_support, roof_interface, floor_interface, settings.interface_preference);

    LayerOutput {
        support_base: support_base.simplify(settings.resolution),
        support_roof_interface: roof.simplify(settings.resolution),
        support_floor_interface: floor.simplify(settings.resolution),
    }
}

fn element_footprint(element: &SupportElement, settings: &TreeSupportSettings) -> Polygons {
    let Some(center) = element.result_on_layer else {
        return Polygons::empty();
    };
    let radius = settings.radius_for(element.effective_radius_height, element.elephant_foot_increases);
    Polygons::circle(center, radius, CIRCLE_RESOLUTION)
}

/// Convex hull of a parent/child disk pair (the "ovalisation" that smooths
/// the trunk between consecutive layers).
fn oval_between(child: &Polygons, parent: &Polygons) -> Polygons {
    if child.is_empty() || parent.is_empty() {
        return Polygons::empty();
    }
    child.convex_hull_with(parent)
}

fn roof_interface_footprint(
    elements: &[SupportElement],
    per_element: &[Polygons],
    settings: &TreeSupportSettings,
) -> Polygons {
    let mut roof = Polygons::empty();
    for (element, footprint) in elements.iter().zip(per_element) {
        if element.flags.supports_roof && element.distance_to_top < settings.support_roof_layers {
            roof = roof.union(footprint);
        }
    }
    roof
}

/// For every element that just landed on the model, paints `support_bottom_layers`
/// worth of floor interface upward through its ancestor chain.
fn floor_interface_footprint(layers: &[Vec<SupportElement>], layer: usize, settings: &TreeSupportSettings) -> Polygons {
    let mut floor = Polygons::empty();

    for land_layer in layer.saturating_sub(settings.support_bottom_layers as usize)..=layer {
        if land_layer >= layers.len() {
            continue;
        }
        let steps_up = layer - land_layer;

        for (idx, element) in layers[land_layer].iter().enumerate() {
            if !element.flags.landed {
                continue;
            }

            if let Some((anc_layer, anc_idx)) = ancestor_at(layers, land_layer, idx, steps_up) {
                if anc_layer == layer {
                    floor = floor.union(&element_footprint(&layers[anc_layer][anc_idx], settings));
                }
            }
        }
    }

    floor
}

/// Walks `steps_up` parent links starting from `(layer, idx)`, returning the
/// element reached. Ambiguous (merged) ancestry follows the first parent;
/// floor-interface placement only needs an approximate footprint.
fn ancestor_at(
    layers: &[Vec<SupportElement>],
    layer: usize,
    idx: usize,
    steps_up: usize,
) -> Option<(usize, usize)> {
    let mut current_layer = layer;
    let mut current_idx = idx;

    for _ in 0..steps_up {
        let element = layers.get(current_layer)?.get(current_idx)?;
        let parent = element.parents.first()?;
        current_layer += 1;
        current_idx = parent.0 as usize;
        if current_layer >= layers.len() {
            return None;
        }
    }

    Some((current_layer, current_idx))
}

fn resolve_interfaces(
    support: Polygons,
    roof: Polygons,
    floor: Polygons,
    preference: InterfacePreference,
) -> (Polygons, Polygons, Polygons) {
    let interface = roof.union(&floor);

    match preference {
        InterfacePreference::InterfaceAreaOverwritesSupport => (support.difference(&interface), roof, floor),
        InterfacePreference::SupportAreaOverwritesInterface => {
            (support.clone(), roof.difference(&support), floor.difference(&support))
        }
        // Line-level cutting is a slicer-side path-planning concern beyond
        // this crate's polygon output; both resolve the same as their
        // area-level counterpart here.
        InterfacePreference::InterfaceLinesOverwriteSupport => (support.difference(&interface), roof, floor),
        InterfacePreference::SupportLinesOverwriteInterface => {
            (support.clone(), roof.difference(&support), floor.difference(&support))
        }
        InterfacePreference::Nothing => (support, roof, floor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementFlags, ParentList};
    use crate::geometry::Point;

    fn element_at(x: CoordTTest, layer: i32, landed: bool, supports_roof: bool) -> SupportElement {
        SupportElement {
            target_height: layer,
            target_position: Point::new(x, 0),
            layer_idx: layer,
            next_position: Point::new(x, 0),
            effective_radius_height: 0,
            distance_to_top: 0,
            dont_move_until: 0,
            elephant_foot_increases: 0.0,
            increased_to_model_radius: 0,
            missing_roof_layers: 0,
            last_area_increase: None,
            result_on_layer: Some(Point::new(x, 0)),
            flags: ElementFlags {
                to_buildplate: !landed,
                to_model_gracious: landed,
                use_min_xy_dist: false,
                supports_roof,
                can_use_safe_radius: false,
                skip_ovalisation: false,
                deleted: false,
                marked: false,
                landed,
            },
            parents: ParentList::new(),
            influence_area: Polygons::circle(Point::new(x, 0), 1000, 12),
        }
    }

    type CoordTTest = crate::geometry::CoordT;

    #[test]
    fn draws_a_single_layer_with_one_element() {
        let settings = TreeSupportSettings::from_nozzle(400, 200);
        let layers = vec![vec![element_at(0, 0, false, false)]];
        let output = draw_all(&layers, &settings);
        assert_eq!(output.len(), 1);
        assert!(!output[0].support_base.is_empty());
    }

    #[test]
    fn roof_interface_only_for_roof_supporting_tips() {
        let settings = TreeSupportSettings::from_nozzle(400, 200);
        let layers = vec![vec![element_at(0, 0, false, true)]];
        let output = draw_all(&layers, &settings);
        assert!(!output[0].support_roof_interface.is_empty());
    }
}
