//! Organic tree-support generator for fused-filament 3D printing slicers.
//!
//! Takes per-layer model outlines, overhang regions and placeable top
//! surfaces and produces a branching support structure: thin tips seeded
//! under overhangs widen and converge as they descend, routed around the
//! model by a per-layer avoidance field, merging where branches cross and
//! finally rasterized into printable polygons.
//!
//! ## Quick start
//!
//! ```no_run
//! use tree_support::{
//!     generate_tree_supports, LayerGeometry, TreeSupportCancelToken, TreeSupportInput,
//!     TreeSupportSettings,
//! };
//!
//! let layers = vec![LayerGeometry::default(); 200];
//! let input = TreeSupportInput::new(layers);
//! let settings = TreeSupportSettings::from_nozzle(400, 200);
//! let cancel = TreeSupportCancelToken::new();
//!
//! let output = generate_tree_supports(&input, &settings, &cancel)?;
//! # Ok::<(), tree_support::TreeSupportError>(())
//! ```
//!
//! This crate never slices the mesh, decides which regions need support, or
//! emits G-code toolpaths (those stay the surrounding slicer's job). It also
//! never implements its own polygon boolean-ops or offsetting; see
//! [`geometry`] for the thin seam onto the [`geo`] ecosystem.

mod centerer;
mod drawer;
mod element;
mod error;
mod geometry;
mod input;
mod merger;
mod model_volumes;
mod pipeline;
mod propagation;
mod settings;
mod tip_generator;

pub use element::ElementId;
pub use error::{Result, TreeSupportError};
pub use geometry::{CoordT, Point, Polygons};
pub use input::{
    BranchDiagnostic, GenerationDiagnostics, LayerGeometry, LayerOutput, TreeSupportInput,
    TreeSupportOutput,
};
pub use model_volumes::{Field, FieldCacheStats};
pub use pipeline::{generate_tree_supports, TreeSupportCancelToken};
pub use settings::{AreaIncreaseSettings, AvoidanceType, InterfacePreference, TreeSupportSettings};
