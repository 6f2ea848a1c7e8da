//! `AreaPropagator`: the layer-by-layer core state machine.
//!
//! Exception-like fallback control flow in the original algorithm is modeled
//! as the explicit [`PropagationOutcome`] result kind
//! rather than early-return/panic-based control flow.

use crate::element::{ElementId, ParentList, SupportElement};
use crate::geometry::{Point, Polygons};
use crate::input::BranchDiagnostic;
use crate::model_volumes::{Field, ModelVolumes};
use crate::settings::{AreaIncreaseSettings, AvoidanceType, TreeSupportSettings};

/// Result of trying a single `AreaIncreaseSettings` candidate.
pub enum PropagationOutcome {
    Accepted(Polygons),
    Rejected,
    /// Terminal: the element rests on the model; no further descendants
    /// are emitted below this layer.
    Landed(Polygons),
}

/// Outcome of propagating one element from `layer` to `layer - 1`.
pub enum StepResult {
    Propagated(SupportElement),
    Deleted(Option<BranchDiagnostic>),
}

/// Attempts every candidate in policy order for one element, returning the
/// first non-empty area.
pub fn propagate_element(
    element_id: ElementId,
    element: &SupportElement,
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> StepResult {
    let layer_below = element.layer_idx - 1;
    let candidates = settings.area_increase_candidates(element.flags.to_buildplate);
    let own_parents: ParentList = std::iter::once(element_id).collect();

    for candidate in &candidates {
        if element.flags.can_use_safe_radius && !candidate.avoidance_type.is_safe() {
            // A regression from safe to non-safe avoidance is forbidden
            // once latched.
            continue;
        }

        match try_candidate(element, candidate, layer_below, settings, volumes) {
            PropagationOutcome::Accepted(area) => {
                let mut child = build_child(element, candidate, area, layer_below, settings);
                child.parents = own_parents;
                return StepResult::Propagated(child);
            }
            PropagationOutcome::Landed(area) => {
                let mut child = build_landed_child(element, area, layer_below);
                child.parents = own_parents;
                return StepResult::Propagated(child);
            }
            PropagationOutcome::Rejected => continue,
        }
    }

    // Every candidate failed.
    if element.flags.to_buildplate {
        if settings.support_rests_on_model {
            if let Some(mut landed) = try_land_on_model(element, layer_below, settings, volumes) {
                landed.parents = own_parents;
                return StepResult::Propagated(landed);
            }
            // The model-landing fallback was available and still failed:
            // this branch has exhausted every recovery path, not just the
            // ordinary build-plate candidate list.
            return StepResult::Deleted(Some(BranchDiagnostic::VeryLost));
        }
        StepResult::Deleted(Some(BranchDiagnostic::Lost))
    } else {
        // Not required to reach anything further down; quietly pruned.
        StepResult::Deleted(None)
    }
}

fn try_candidate(
    element: &SupportElement,
    candidate: &AreaIncreaseSettings,
    layer_below: i32,
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> PropagationOutcome {
    let can_grow = candidate.increase_radius && element.distance_to_top >= element.dont_move_until;
    let effective_radius_height = if can_grow {
        element.effective_radius_height + 1
    } else {
        element.effective_radius_height
    };

    let radius = settings.radius_for(effective_radius_height, element.elephant_foot_increases);

    let field = if element.flags.to_buildplate {
        Field::Avoidance(candidate.avoidance_type)
    } else {
        Field::AvoidanceToModel(candidate.avoidance_type)
    };

    let min_distance_radius = if candidate.use_min_distance {
        radius - (settings.xy_distance - settings.xy_min_distance).max(0)
    } else {
        radius
    };

    let avoidance = volumes.get(field, min_distance_radius, layer_below);

    let grown = element.influence_area.offset(candidate.increase_speed);
    let mut candidate_area = grown.difference(&avoidance);

    if !candidate.move_point {
        candidate_area = candidate_area.intersection(&element.influence_area);
    }

    if candidate_area.is_empty() {
        // `no_error` marks this as the last-resort candidate the original
        // algorithm tries before giving up on a build-plate-bound branch; it
        // does not conjure area out of nowhere. A candidate that resolves to
        // nothing is still rejected so a genuinely unreachable branch falls
        // through to the `lost` path in `propagate_element` (spec.md §7:
        // failures on every §4.C candidate are recovered by deleting the
        // element and marking it lost), rather than smuggling through a
        // stale area that may no longer sit outside the current avoidance.
        return PropagationOutcome::Rejected;
    }

    PropagationOutcome::Accepted(candidate_area)
}

fn build_child(
    element: &SupportElement,
    candidate: &AreaIncreaseSettings,
    area: Polygons,
    layer_below: i32,
    settings: &TreeSupportSettings,
) -> SupportElement {
    let mut next = element.clone();

    let can_grow = candidate.increase_radius && element.distance_to_top >= element.dont_move_until;
    next.effective_radius_height = if can_grow {
        element.effective_radius_height + 1
    } else {
        element.effective_radius_height
    };
    next.distance_to_top = element.distance_to_top + 1;
    next.layer_idx = layer_below;

    let next_position = if candidate.move_point {
        let cap = match candidate.avoidance_type {
            AvoidanceType::Fast | AvoidanceType::FastSafe => settings.maximum_move_distance,
            AvoidanceType::Slow | AvoidanceType::SlowSafe => settings.maximum_move_distance_slow,
        };
        let desired = element.next_position.move_towards(element.target_position, cap);
        nearest_point_in(&area, desired)
    } else {
        element.next_position
    };

    let moved = next_position != element.next_position;
    next.next_position = next_position;
    next.dont_move_until = if moved { 0 } else { element.dont_move_until };

    if candidate.avoidance_type.is_safe() {
        next.flags.can_use_safe_radius = true;
    }

    next.last_area_increase = Some(*candidate);
    next.influence_area = area;
    next.result_on_layer = None;

    bump_elephant_foot(&mut next, layer_below, settings);

    next
}

fn build_landed_child(element: &SupportElement, area: Polygons, layer_below: i32) -> SupportElement {
    let mut next = element.clone();
    next.distance_to_top += 1;
    next.layer_idx = layer_below;
    next.influence_area = area;
    next.result_on_layer = None;
    next.flags.to_buildplate = false;
    next.flags.to_model_gracious = true;
    next.flags.landed = true;
    next.dont_move_until = 0;
    next
}

fn try_land_on_model(
    element: &SupportElement,
    layer_below: i32,
    settings: &TreeSupportSettings,
    volumes: &ModelVolumes,
) -> Option<SupportElement> {
    // A branch that would land after fewer than `min_dtt_to_model` layers is
    // too short to be structurally useful; refuse the landing so the caller
    // falls through to the ordinary "lost" path instead.
    if element.distance_to_top + 1 < settings.min_dtt_to_model {
        return None;
    }

    let radius = settings.radius_for(element.effective_radius_height, element.elephant_foot_increases);
    let placeable = volumes.get(Field::PlaceableOnModel, radius, layer_below);
    if placeable.is_empty() {
        return None;
    }

    let area = element.influence_area.intersection(&placeable);
    if area.is_empty() {
        return None;
    }

    Some(build_landed_child(element, area, layer_below))
}

/// Accumulates elephant-foot widening near the build plate, up to
/// `layer_start_bp_radius` layers above it.
fn bump_elephant_foot(element: &mut SupportElement, layer_below: i32, settings: &TreeSupportSettings) {
    if !element.flags.to_buildplate {
        return;
    }
    if layer_below > settings.layer_start_bp_radius {
        return;
    }

    element.elephant_foot_increases += 1.0;
}

/// Point inside `area` closest to `desired`. Exact point-to-polygon
/// projection is not part of the polygon library contract, so this
/// approximates with the nearest ring vertex when `desired` itself falls
/// outside the area.
fn nearest_point_in(area: &Polygons, desired: Point) -> Point {
    if area.contains_point(desired) {
        return desired;
    }

    let mut best: Option<(Point, f64)> = None;
    for (outer, holes) in area.to_point_rings() {
        for ring in std::iter::once(&outer).chain(holes.iter()) {
            for &candidate in ring {
                let dist = candidate.distance_to(desired);
                if best.map(|(_, best_dist)| dist < best_dist).unwrap_or(true) {
                    best = Some((candidate, dist));
                }
            }
        }
    }

    best.map(|(point, _)| point).unwrap_or(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementFlags;
    use crate::input::TreeSupportInput;

    fn settings() -> TreeSupportSettings {
        TreeSupportSettings::from_nozzle(400, 200)
    }

    fn flat_tip(settings: &TreeSupportSettings, layer: i32) -> SupportElement {
        let disk = Polygons::circle(Point::new(0, 0), settings.min_radius, 12);
        SupportElement::new_tip(layer, Point::new(0, 0), disk, settings.tip_layers, true, false)
    }

    #[test]
    fn propagates_over_empty_model() {
        let settings = settings();
        let input = TreeSupportInput::new(vec![Default::default(); 10]);
        let volumes = ModelVolumes::new(&input, &settings);

        let tip = flat_tip(&settings, 9);
        match propagate_element(ElementId(0), &tip, &settings, &volumes) {
            StepResult::Propagated(child) => {
                assert_eq!(child.layer_idx, 8);
                assert_eq!(child.distance_to_top, 1);
                assert!(!child.influence_area.is_empty());
            }
            StepResult::Deleted(_) => panic!("expected propagation over an empty model to succeed"),
        }
    }

    #[test]
    fn flags_default_sane() {
        let flags = ElementFlags::default();
        assert!(!flags.to_buildplate);
        assert!(!flags.deleted);
    }
}
