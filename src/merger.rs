//! `Merger`: fuses overlapping influence areas on the same layer.
//!
//! Repeatedly folds the highest-priority overlapping pair into a single
//! survivor, in a fixed deterministic order, until no pair qualifies.

use crate::element::{ParentList, SupportElement};
use crate::model_volumes::{Field, ModelVolumes};
use crate::settings::{AvoidanceType, TreeSupportSettings};

/// A layer's working set during merging: each entry keeps a stable id
/// (assigned once on entry to the layer) purely to break ties
/// deterministically, independent of its current position in the vector.
struct Candidate {
    id: u64,
    element: SupportElement,
}

/// Runs merging to a fixed point: repeatedly finds the highest-priority
/// valid overlapping pair and fuses it, until no pair qualifies.
pub fn merge_layer(
    elements: Vec<SupportElement>,
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> Vec<SupportElement> {
    let mut candidates: Vec<Candidate> = elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| Candidate { id: i as u64, element })
        .collect();

    loop {
        let Some((i, j, merged)) = find_best_merge(&candidates, settings, volumes) else {
            break;
        };

        let id = candidates[i].id.min(candidates[j].id);
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        candidates.remove(hi);
        candidates.remove(lo);
        candidates.push(Candidate { id, element: merged });
    }

    candidates.into_iter().map(|c| c.element).collect()
}

fn find_best_merge(
    candidates: &[Candidate],
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> Option<(usize, usize, SupportElement)> {
    let mut best: Option<(usize, usize, SupportElement, f64, u64, u64)> = None;

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let a = &candidates[i];
            let b = &candidates[j];

            if shares_ancestry(&a.element.parents, &b.element.parents) {
                continue;
            }

            let intersection = a.element.influence_area.intersection(&b.element.influence_area);
            if intersection.is_empty() {
                continue;
            }

            let Some(merged) = try_merge(a, b, &intersection, settings, volumes) else {
                continue;
            };

            let area = intersection.area();
            let tie_break = (a.id.min(b.id), a.id.max(b.id));
            let better = match &best {
                None => true,
                Some((_, _, _, best_area, best_lo, best_hi)) => {
                    area > *best_area
                        || (area == *best_area && tie_break < (*best_lo, *best_hi))
                }
            };

            if better {
                best = Some((i, j, merged, area, tie_break.0, tie_break.1));
            }
        }
    }

    best.map(|(i, j, merged, _, _, _)| (i, j, merged))
}

fn shares_ancestry(a: &ParentList, b: &ParentList) -> bool {
    a.iter().any(|id| b.contains(id))
}

/// Checks the combined-radius constraint and builds the merged element if it
/// holds.
fn try_merge(
    a: &Candidate,
    b: &Candidate,
    intersection: &crate::geometry::Polygons,
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> Option<SupportElement> {
    let a = &a.element;
    let b = &b.element;

    let distance_to_top = a.distance_to_top.max(b.distance_to_top);
    let effective_radius_height = a.effective_radius_height.max(b.effective_radius_height);
    let elephant_foot_increases = a.elephant_foot_increases + b.elephant_foot_increases;

    let to_buildplate = a.flags.to_buildplate || b.flags.to_buildplate;
    let to_model_gracious = a.flags.to_model_gracious && b.flags.to_model_gracious;

    let increased_to_model_radius = if a.flags.to_buildplate != b.flags.to_buildplate {
        (a.increased_to_model_radius + b.increased_to_model_radius)
            .min(settings.max_to_model_radius_increase)
    } else {
        a.increased_to_model_radius + b.increased_to_model_radius
    };

    // Use the same radius notion the drawer and centerer use
    // (`effective_radius_height`, not `distance_to_top`), so the avoidance a
    // merge is validated against matches the radius the merged trunk is
    // actually drawn and centered at.
    let base_radius = settings.radius_for(effective_radius_height, elephant_foot_increases);
    let merged_radius = if a.flags.to_buildplate != b.flags.to_buildplate {
        let capped = settings.radius_for(effective_radius_height, 0.0)
            + settings.max_to_model_radius_increase;
        base_radius.min(capped)
    } else {
        base_radius
    };

    let avoidance_type = if a.flags.can_use_safe_radius || b.flags.can_use_safe_radius {
        AvoidanceType::SlowSafe
    } else {
        AvoidanceType::Fast
    };
    let field = if to_buildplate {
        Field::Avoidance(avoidance_type)
    } else {
        Field::AvoidanceToModel(avoidance_type)
    };

    let layer = a.layer_idx;
    let avoidance = volumes.get(field, merged_radius, layer);
    let influence_area = intersection.difference(&avoidance);
    if influence_area.is_empty() {
        return None;
    }

    let mut parents: ParentList = a.parents.clone();
    for p in &b.parents {
        if !parents.contains(p) {
            parents.push(*p);
        }
    }

    let target_position = if a.distance_to_top >= b.distance_to_top {
        a.target_position
    } else {
        b.target_position
    };
    let target_height = if a.distance_to_top >= b.distance_to_top {
        a.target_height
    } else {
        b.target_height
    };

    Some(SupportElement {
        target_height,
        target_position,
        layer_idx: a.layer_idx,
        next_position: a.next_position,
        effective_radius_height,
        distance_to_top,
        dont_move_until: 0,
        elephant_foot_increases,
        increased_to_model_radius,
        missing_roof_layers: a.missing_roof_layers.max(b.missing_roof_layers),
        last_area_increase: a.last_area_increase.or(b.last_area_increase),
        result_on_layer: None,
        flags: crate::element::ElementFlags {
            to_buildplate,
            to_model_gracious,
            use_min_xy_dist: a.flags.use_min_xy_dist || b.flags.use_min_xy_dist,
            supports_roof: a.flags.supports_roof || b.flags.supports_roof,
            can_use_safe_radius: a.flags.can_use_safe_radius || b.flags.can_use_safe_radius,
            skip_ovalisation: false,
            deleted: false,
            marked: false,
            landed: a.flags.landed || b.flags.landed,
        },
        parents,
        influence_area,
    })
}
