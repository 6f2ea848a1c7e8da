//! External interface types: what the surrounding slicer hands in,
//! and what the core hands back.

use std::collections::HashMap;

use crate::element::ElementId;
use crate::geometry::{CoordT, Point, Polygons};
use crate::model_volumes::{Field, FieldCacheStats};

/// Everything the core needs for one sliced layer, supplied by the
/// surrounding slicer. Slicing the mesh into these outlines, and deciding
/// which regions require support, are both out of scope.
#[derive(Debug, Clone, Default)]
pub struct LayerGeometry {
    /// The model's own slice outline on this layer.
    pub outlines: Polygons,
    /// Regions of this layer that require support from below.
    pub overhangs: Polygons,
    /// Upward-facing, flat-enough model surfaces a branch may land on.
    pub placeable_top_surfaces: Polygons,
    /// User-painted "no support here" regions.
    pub blockers: Polygons,
    /// User-painted "support required" regions.
    pub enforcers: Polygons,
    /// Actual world-space z height of this layer, in micrometers.
    pub z: CoordT,
}

/// The full sliced model, indexed by layer index: layer 0 is the bottom
/// printed layer; negative indices address optional raft layers.
#[derive(Debug, Clone, Default)]
pub struct TreeSupportInput {
    layers: Vec<LayerGeometry>,
}

impl TreeSupportInput {
    pub fn new(layers: Vec<LayerGeometry>) -> Self {
        TreeSupportInput { layers }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn top_layer(&self) -> i32 {
        self.layers.len() as i32 - 1
    }

    /// Returns `None` for out-of-range layers; callers treat that as "no
    /// obstacle" per the `ModelVolumes` failure contract.
    pub fn layer(&self, layer_idx: i32) -> Option<&LayerGeometry> {
        if layer_idx < 0 {
            return None;
        }
        self.layers.get(layer_idx as usize)
    }

    /// Resolved per-layer actual z, extending linearly at the last known
    /// layer height past the end of the known range.
    pub fn actual_z(&self, layer_idx: i32, layer_height: CoordT) -> CoordT {
        if self.layers.is_empty() {
            return layer_idx as CoordT * layer_height;
        }

        let top = self.top_layer();
        if layer_idx <= top {
            return self
                .layer(layer_idx.max(0))
                .map(|l| l.z)
                .unwrap_or(layer_idx as CoordT * layer_height);
        }

        let last_z = self.layers[self.layers.len() - 1].z;
        last_z + (layer_idx - top) as CoordT * layer_height
    }
}

/// Three polygon collections per layer.
#[derive(Debug, Clone, Default)]
pub struct LayerOutput {
    pub support_base: Polygons,
    pub support_roof_interface: Polygons,
    pub support_floor_interface: Polygons,
}

/// Diagnostic flag attached to a terminated branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDiagnostic {
    /// Ran out of propagation candidates with no model-landing fallback
    /// to try.
    Lost,
    /// Ran out of propagation candidates *and* the model-landing
    /// fallback; every recovery path was exhausted.
    VeryLost,
}

/// Aggregate telemetry for a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationDiagnostics {
    pub total_branches: u64,
    pub lost_branches: u64,
    pub elements_per_layer: Vec<usize>,
    /// `ModelVolumes` hit/miss/eviction counts per field, for callers
    /// deciding whether the cache bound needs tuning for a given model.
    pub cache_stats: HashMap<Field, FieldCacheStats>,
}

impl GenerationDiagnostics {
    pub fn lost_ratio(&self) -> f64 {
        if self.total_branches == 0 {
            0.0
        } else {
            self.lost_branches as f64 / self.total_branches as f64
        }
    }
}

/// Everything handed back to the surrounding slicer.
#[derive(Debug, Clone, Default)]
pub struct TreeSupportOutput {
    /// Indexed the same way as the input: `layers[i]` is layer `i`.
    pub layers: Vec<LayerOutput>,
    pub diagnostics: GenerationDiagnostics,
    pub branch_diagnostics: Vec<(ElementId, i32, BranchDiagnostic)>,
}
