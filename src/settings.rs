//! Settings for tree-support generation.
//!
//! Mirrors the shape of a Recast-style settings struct: a flat, `Clone`
//! configuration value with `with_*` builder setters and a `from_*`
//! convenience constructor, threaded by shared reference into every
//! operation rather than stored as mutable global state.

use crate::error::TreeSupportError;
use crate::geometry::CoordT;

/// Which of the four avoidance fields a propagation candidate
/// should query. Modeled as a tagged variant, not inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvoidanceType {
    Fast,
    Slow,
    FastSafe,
    SlowSafe,
}

impl AvoidanceType {
    pub fn is_safe(self) -> bool {
        matches!(self, AvoidanceType::FastSafe | AvoidanceType::SlowSafe)
    }

    pub fn to_safe(self) -> AvoidanceType {
        match self {
            AvoidanceType::Fast => AvoidanceType::FastSafe,
            AvoidanceType::Slow => AvoidanceType::SlowSafe,
            safe => safe,
        }
    }
}

/// Resolves where overlapping support/interface geometry is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfacePreference {
    InterfaceAreaOverwritesSupport,
    SupportAreaOverwritesInterface,
    InterfaceLinesOverwriteSupport,
    SupportLinesOverwriteInterface,
    Nothing,
}

/// One entry of the ordered candidate list a propagating element tries,
/// from cheapest-most-conservative to most-aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaIncreaseSettings {
    pub avoidance_type: AvoidanceType,
    pub increase_speed: CoordT,
    pub increase_radius: bool,
    /// Marks this as the last-resort candidate the propagator tries before
    /// giving up on a build-plate-bound branch. Kept for parity with
    /// `last_area_increase` diagnostics; it does not relax the requirement
    /// that a candidate still produce a non-empty area to be accepted.
    pub no_error: bool,
    pub use_min_distance: bool,
    pub move_point: bool,
}

/// All options recognized for one generation run.
///
/// Immutable once built; cheap to `Clone` since every field is `Copy` or a
/// small owned value.
#[derive(Debug, Clone)]
pub struct TreeSupportSettings {
    /// Radius a branch reaches after `tip_layers` layers of growth.
    pub branch_radius: CoordT,
    /// Radius of a freshly seeded tip.
    pub min_radius: CoordT,
    /// Number of layers over which a tip grows from `min_radius` to `branch_radius`.
    pub tip_layers: u32,
    /// Radius growth per layer once a branch has passed `tip_layers`.
    pub branch_radius_increase_per_layer: CoordT,

    /// Additional radius target near the build plate, for adhesion ("elephant foot").
    pub bp_radius: CoordT,
    /// Per-layer widening rate contributing to the elephant foot.
    pub bp_radius_increase_per_layer: CoordT,
    /// Layer at which elephant-foot widening begins counting down from.
    pub layer_start_bp_radius: i32,

    /// Per-layer translation cap under the "fast" avoidance policy.
    pub maximum_move_distance: CoordT,
    /// Per-layer translation cap under the "slow" (careful) avoidance policy.
    pub maximum_move_distance_slow: CoordT,

    /// Horizontal clearance from the model at the current xy policy.
    pub xy_distance: CoordT,
    /// Minimum horizontal clearance from the model (z-overrides-xy floor).
    pub xy_min_distance: CoordT,

    /// Vertical gap, in layers, kept above the model.
    pub z_distance_top_layers: u32,
    /// Vertical gap, in layers, kept below the model.
    pub z_distance_bottom_layers: u32,

    /// Whether branches may terminate by resting on the model instead of the plate.
    pub support_rests_on_model: bool,
    /// Branches landing on the model with fewer layers than this are culled.
    pub min_dtt_to_model: u32,

    /// Extra radius a to-model branch may absorb from a to-buildplate peer on merge.
    pub max_to_model_radius_increase: CoordT,

    /// Interface (roof) layer count directly beneath an overhang.
    pub support_roof_layers: u32,
    /// Interface (floor) layer count directly above a model landing.
    pub support_bottom_layers: u32,
    /// Nozzle line width used to derive tip seed spacing.
    pub support_line_width: CoordT,
    /// How overlapping support/interface geometry resolves.
    pub interface_preference: InterfacePreference,

    /// Smallest feature the slicer is willing to print; below this, branches merge eagerly.
    pub min_feature_size: CoordT,
    /// Number of optional raft layers, addressed by negative layer indices.
    pub raft_layers: u32,

    /// Radii are quantized to this resolution before querying `ModelVolumes`.
    pub collision_resolution: CoordT,
    /// Hausdorff deviation tolerance for final polygon simplification.
    pub resolution: CoordT,

    /// Layer height, in micrometers, used to convert layer counts to z heights.
    pub layer_height: CoordT,

    /// When set, user-painted blocker polygons are unioned into every
    /// collision field.
    pub avoid_support_blocker: bool,
}

impl TreeSupportSettings {
    /// Reasonable defaults scaled from a nozzle/line-width pair.
    pub fn from_nozzle(line_width: CoordT, layer_height: CoordT) -> Self {
        let branch_radius = line_width * 2;

        TreeSupportSettings {
            branch_radius,
            min_radius: line_width / 2,
            tip_layers: 5,
            branch_radius_increase_per_layer: line_width / 20,

            bp_radius: branch_radius * 4,
            bp_radius_increase_per_layer: line_width / 5,
            layer_start_bp_radius: 0,

            maximum_move_distance: line_width,
            maximum_move_distance_slow: line_width / 2,

            xy_distance: line_width,
            xy_min_distance: line_width / 2,

            z_distance_top_layers: 1,
            z_distance_bottom_layers: 1,

            support_rests_on_model: false,
            min_dtt_to_model: 2,

            max_to_model_radius_increase: branch_radius,

            support_roof_layers: 2,
            support_bottom_layers: 2,
            support_line_width: line_width,
            interface_preference: InterfacePreference::SupportLinesOverwriteInterface,

            min_feature_size: line_width / 4,
            raft_layers: 0,

            collision_resolution: line_width / 4,
            resolution: line_width / 10,

            layer_height,

            avoid_support_blocker: true,
        }
    }

    pub fn with_branch_radius(mut self, branch_radius: CoordT) -> Self {
        self.branch_radius = branch_radius;
        self
    }

    pub fn with_tip_layers(mut self, tip_layers: u32) -> Self {
        self.tip_layers = tip_layers;
        self
    }

    pub fn with_maximum_move_distance(
        mut self,
        fast: CoordT,
        slow: CoordT,
    ) -> Self {
        self.maximum_move_distance = fast;
        self.maximum_move_distance_slow = slow;
        self
    }

    pub fn with_support_rests_on_model(mut self, rests_on_model: bool) -> Self {
        self.support_rests_on_model = rests_on_model;
        self
    }

    pub fn with_interface_preference(mut self, preference: InterfacePreference) -> Self {
        self.interface_preference = preference;
        self
    }

    /// Performs the consistency checks named by `ConfigInvalid`.
    /// Called once before a generation run begins; no work begins if it fails.
    pub fn validate(&self) -> Result<(), TreeSupportError> {
        let mut problems = Vec::new();

        if self.branch_radius <= 0 {
            problems.push("branch_radius must be positive");
        }
        if self.min_radius <= 0 {
            problems.push("min_radius must be positive");
        }
        if self.min_radius > self.branch_radius {
            problems.push("min_radius must not exceed branch_radius");
        }
        if self.tip_layers == 0 {
            problems.push("tip_layers must be at least 1");
        }
        if self.maximum_move_distance <= 0 {
            problems.push("maximum_move_distance must be positive");
        }
        if self.maximum_move_distance_slow > self.maximum_move_distance {
            problems.push("maximum_move_distance_slow must not exceed maximum_move_distance");
        }
        if self.xy_min_distance > self.xy_distance {
            problems.push("xy_min_distance must not exceed xy_distance");
        }
        if self.collision_resolution <= 0 {
            problems.push("collision_resolution must be positive");
        }
        if self.resolution < 0 {
            problems.push("resolution must not be negative");
        }
        if self.layer_height <= 0 {
            problems.push("layer_height must be positive");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TreeSupportError::ConfigInvalid {
                reason: problems.join("; "),
            })
        }
    }

    /// The radius schedule R(dtt): grows from `min_radius` at the tip to
    /// `branch_radius` over `tip_layers`, then continues widening by
    /// `diameter_angle_scale_factor` per layer, plus the elephant-foot
    /// widening term.
    pub fn radius_for(&self, effective_radius_height: u32, elephant_foot_increases: f64) -> CoordT {
        let dtt = effective_radius_height;
        let base = if dtt <= self.tip_layers {
            let t = dtt as f64 / self.tip_layers.max(1) as f64;
            self.min_radius as f64 + (self.branch_radius - self.min_radius) as f64 * t
        } else {
            self.branch_radius as f64
                + (dtt - self.tip_layers) as f64 * self.branch_radius_increase_per_layer as f64
        };

        let bp_rate = (self.bp_radius_increase_per_layer - self.branch_radius_increase_per_layer)
            .max(0) as f64;
        let elephant_foot_widening = elephant_foot_increases * bp_rate;

        (base + elephant_foot_widening).round() as CoordT
    }

    /// Rounds an arbitrary radius up to the next quantized sample used as a
    /// `ModelVolumes` cache key.
    pub fn quantize_radius(&self, radius: CoordT) -> CoordT {
        if radius <= 0 {
            return 0;
        }

        // Linear sampling up to 1.5mm, exponential ladder beyond it, bounding
        // the number of distinct cached radii.
        const LADDER_START: CoordT = 1500;
        if radius <= LADDER_START {
            let step = self.collision_resolution.max(1);
            ((radius + step - 1) / step) * step
        } else {
            let mut sample = LADDER_START;
            let step = self.collision_resolution.max(1);
            let mut cur_step = step;
            while sample < radius {
                sample += cur_step;
                cur_step = (cur_step * 3 / 2).max(step);
            }
            sample
        }
    }

    /// The ordered candidate list for propagation: cheapest and most
    /// conservative first, falling through to more aggressive options.
    ///
    /// Radius growth is tried before holding the radius steady. Avoidance
    /// is monotone in radius (a bigger branch is never less obstructed), so
    /// a grown candidate's area is always a subset of the same candidate
    /// tried without growth; trying the no-grow candidate first would
    /// always accept it and growth would never happen. Growing first and
    /// falling back to no-grow only once the grown area collides is what
    /// lets `effective_radius_height` actually track `distance_to_top`.
    pub fn area_increase_candidates(&self, to_buildplate: bool) -> Vec<AreaIncreaseSettings> {
        let mut candidates = Vec::with_capacity(16);

        for &avoidance_type in &[AvoidanceType::Fast, AvoidanceType::Slow] {
            for &increase_radius in &[true, false] {
                for &move_point in &[false, true] {
                    let speed = if move_point {
                        if avoidance_type == AvoidanceType::Fast {
                            self.maximum_move_distance
                        } else {
                            self.maximum_move_distance_slow
                        }
                    } else {
                        0
                    };

                    candidates.push(AreaIncreaseSettings {
                        avoidance_type,
                        increase_speed: speed,
                        increase_radius,
                        no_error: false,
                        use_min_distance: false,
                        move_point,
                    });
                }
            }
        }

        // Safe (holefree) variants, tried only after the non-safe ones fail.
        for &avoidance_type in &[AvoidanceType::FastSafe, AvoidanceType::SlowSafe] {
            candidates.push(AreaIncreaseSettings {
                avoidance_type,
                increase_speed: self.maximum_move_distance_slow,
                increase_radius: false,
                no_error: false,
                use_min_distance: false,
                move_point: true,
            });
        }

        // Last resort: accept even degenerate geometry rather than lose a
        // build-plate-bound branch outright.
        if to_buildplate {
            candidates.push(AreaIncreaseSettings {
                avoidance_type: AvoidanceType::Slow,
                increase_speed: self.maximum_move_distance_slow,
                increase_radius: false,
                no_error: true,
                use_min_distance: true,
                move_point: true,
            });
        }

        candidates
    }
}
