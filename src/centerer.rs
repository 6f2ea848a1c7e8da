//! `Centerer`: chooses one center point per element per layer.
//!
//! Walks the frozen tree bottom-up, adjusting one point per element to
//! satisfy an influence-area / collision / continuity budget, relaxing the
//! weakest constraint first when nothing satisfies all three.

use std::collections::HashMap;

use crate::element::SupportElement;
use crate::geometry::{Point, Polygons};
use crate::model_volumes::{Field, ModelVolumes};
use crate::settings::TreeSupportSettings;

/// Resolves `result_on_layer` for every element, processing layers
/// bottom-up so a parent can see its children's already-chosen points.
pub fn resolve_centers(
    layers: &mut [Vec<SupportElement>],
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) {
    for layer in 0..layers.len() {
        let children_points = collect_children_points(layers, layer);

        for idx in 0..layers[layer].len() {
            let element = &layers[layer][idx];
            let radius = settings.radius_for(element.effective_radius_height, element.elephant_foot_increases);
            let collision = volumes.get(Field::Collision, radius, layer as i32);
            let usable = element.influence_area.difference(&collision);

            let children = children_points.get(&idx).cloned().unwrap_or_default();

            let point = choose_point(element, &usable, &children, settings);
            layers[layer][idx].result_on_layer = Some(point);
        }
    }
}

fn collect_children_points(
    layers: &[Vec<SupportElement>],
    layer: usize,
) -> HashMap<usize, Vec<Point>> {
    let mut map: HashMap<usize, Vec<Point>> = HashMap::new();
    if layer == 0 {
        return map;
    }

    for child in &layers[layer - 1] {
        let Some(point) = child.result_on_layer else {
            continue;
        };
        for parent in &child.parents {
            map.entry(parent.0 as usize).or_default().push(point);
        }
    }

    map
}

/// Picks a point inside `usable` that is within `maximum_move_distance` of
/// every child's point; relaxes continuity (3), then the collision
/// constraint (2), if nothing satisfies all of them.
fn choose_point(
    element: &SupportElement,
    usable: &Polygons,
    children: &[Point],
    settings: &TreeSupportSettings,
) -> Point {
    if !usable.is_empty() {
        if let Some(point) = pick_within_move_budget(usable, children, settings.maximum_move_distance) {
            return point;
        }
    }

    // Relax (3): any point satisfying (1) and (2).
    if !usable.is_empty() {
        return representative_point(usable, element.target_position);
    }

    // Relax (2) too: invariant 5 guarantees influence_area is non-empty.
    representative_point(&element.influence_area, element.target_position)
}

fn pick_within_move_budget(usable: &Polygons, children: &[Point], max_move: crate::geometry::CoordT) -> Option<Point> {
    if children.is_empty() {
        return Some(representative_point(usable, usable.centroid().unwrap_or(Point::new(0, 0))));
    }

    let mut feasible = usable.clone();
    for &child in children {
        feasible = feasible.intersection(&Polygons::circle(child, max_move, 24));
    }

    if feasible.is_empty() {
        None
    } else {
        Some(representative_point(&feasible, children[0]))
    }
}

/// Centroid of `area` if it lies inside (the common case for convex
/// regions); otherwise the nearest vertex to `fallback_towards`.
fn representative_point(area: &Polygons, fallback_towards: Point) -> Point {
    if let Some(centroid) = area.centroid() {
        if area.contains_point(centroid) {
            return centroid;
        }
    }

    let mut best: Option<(Point, f64)> = None;
    for (outer, holes) in area.to_point_rings() {
        for ring in std::iter::once(&outer).chain(holes.iter()) {
            for &candidate in ring {
                let dist = candidate.distance_to(fallback_towards);
                if best.map(|(_, d)| dist < d).unwrap_or(true) {
                    best = Some((candidate, dist));
                }
            }
        }
    }

    best.map(|(point, _)| point).unwrap_or(fallback_towards)
}
