//! `SupportElement`: one node of the branch tree.
//!
//! Elements are stored in a flat arena per layer with stable integer ids;
//! `parents` is a small vector of ids into the arena one layer above. The
//! relation is a DAG (children are always exactly one layer below their
//! parents), so no owning back-pointers exist anywhere.

use smallvec::SmallVec;

use crate::geometry::{CoordT, Point, Polygons};
use crate::settings::AreaIncreaseSettings;

/// Index of a [`SupportElement`] within the arena of a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u32);

/// Up to four direct ancestors inline before spilling to the heap, since a
/// merge of more than a handful of branches on one layer is rare.
pub type ParentList = SmallVec<[ElementId; 4]>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementFlags {
    pub to_buildplate: bool,
    pub to_model_gracious: bool,
    pub use_min_xy_dist: bool,
    pub supports_roof: bool,
    pub can_use_safe_radius: bool,
    pub skip_ovalisation: bool,
    pub deleted: bool,
    pub marked: bool,
    /// Set once the element has terminated by resting on the model;
    /// no further descendants are emitted below this layer.
    pub landed: bool,
}

/// One node of the branch tree, live on exactly one layer at a time.
#[derive(Debug, Clone)]
pub struct SupportElement {
    /// Layer this branch originated on; immutable for the branch's lifetime.
    pub target_height: i32,
    /// Point on `target_height` this branch aims to support; immutable.
    pub target_position: Point,

    /// Layer this element currently lives on.
    pub layer_idx: i32,

    /// Suggested direction hint for the next propagation step.
    pub next_position: Point,

    /// Distance-to-top used to compute radius; lags `distance_to_top` when
    /// the branch was forced to move without growing.
    pub effective_radius_height: u32,
    /// Layer count below this branch's tip.
    pub distance_to_top: u32,

    /// Propagation-step index below which this element refuses to move.
    pub dont_move_until: u32,

    /// Fractional extra radius accumulated near the build plate.
    pub elephant_foot_increases: f64,
    /// Extra radius absorbed by merging with build-plate-reachable peers.
    pub increased_to_model_radius: CoordT,
    /// Interface layers still owed but deferred while the branch was moving.
    pub missing_roof_layers: u32,

    /// `AreaIncreaseSettings` most recently used successfully.
    pub last_area_increase: Option<AreaIncreaseSettings>,

    /// The final chosen centerline point on `layer_idx`, set by the centerer.
    pub result_on_layer: Option<Point>,

    pub flags: ElementFlags,

    /// Ancestors on `layer_idx + 1`. Empty for a fresh tip, >=2 after a merge.
    pub parents: ParentList,

    /// The polygonal region the centerline must lie within on this layer.
    pub influence_area: Polygons,
}

impl SupportElement {
    /// A fresh tip at `distance_to_top = 0`.
    pub fn new_tip(
        target_height: i32,
        target_position: Point,
        min_radius_area: Polygons,
        dont_move_until: u32,
        supports_roof: bool,
        use_min_xy_dist: bool,
    ) -> Self {
        SupportElement {
            target_height,
            target_position,
            layer_idx: target_height,
            next_position: target_position,
            effective_radius_height: 0,
            distance_to_top: 0,
            dont_move_until,
            elephant_foot_increases: 0.0,
            increased_to_model_radius: 0,
            missing_roof_layers: 0,
            last_area_increase: None,
            result_on_layer: None,
            flags: ElementFlags {
                to_buildplate: true,
                to_model_gracious: false,
                use_min_xy_dist,
                supports_roof,
                can_use_safe_radius: false,
                skip_ovalisation: false,
                deleted: false,
                marked: false,
                landed: false,
            },
            parents: ParentList::new(),
            influence_area: min_radius_area,
        }
    }
}
