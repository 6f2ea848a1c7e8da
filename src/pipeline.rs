//! Top-level orchestration: wires tip generation, propagation, merging,
//! centering and drawing into one top-down pass over the model.
//!
//! Mirrors the teacher's tile-generation entry point in its overall shape
//! (validate settings, build a shared cache, fan work out per unit of
//! vertical structure, join on a barrier, hand back the finished geometry),
//! substituting `rayon` for the teacher's `bevy::tasks::AsyncComputeTaskPool`
//! since this crate has no running `App` to borrow a task pool from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
#[cfg(feature = "trace")]
use tracing::info_span;
use tracing::{debug, info, warn};

use crate::centerer;
use crate::drawer;
use crate::element::{ElementId, SupportElement};
use crate::error::{Result, TreeSupportError};
use crate::input::{BranchDiagnostic, GenerationDiagnostics, TreeSupportInput, TreeSupportOutput};
use crate::merger;
use crate::model_volumes::ModelVolumes;
use crate::propagation::{self, StepResult};
use crate::settings::TreeSupportSettings;
use crate::tip_generator::TipGenerator;

/// An externally settable flag, polled at every layer boundary and before
/// drawing. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct TreeSupportCancelToken(Arc<AtomicBool>);

impl TreeSupportCancelToken {
    pub fn new() -> Self {
        TreeSupportCancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(TreeSupportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

const LOST_BRANCH_WARN_RATIO: f64 = 0.05;

/// Runs the full influence-area pipeline over `input`, producing printable
/// support and interface polygons for every layer.
pub fn generate_tree_supports(
    input: &TreeSupportInput,
    settings: &TreeSupportSettings,
    cancel: &TreeSupportCancelToken,
) -> Result<TreeSupportOutput> {
    settings.validate()?;

    let top_layer = input.top_layer();
    if top_layer < 0 {
        return Ok(TreeSupportOutput::default());
    }

    let _span = info_span(top_layer);
    let volumes = ModelVolumes::new(input, settings);

    let tips = TipGenerator::new(settings).generate(input, &volumes);
    let seeded_layers = tips.len();
    debug!(seeded_layers, "seeded tip layers");

    let mut incoming: HashMap<i32, Vec<SupportElement>> = tips;
    let mut layers: Vec<Vec<SupportElement>> = vec![Vec::new(); (top_layer + 1) as usize];
    let mut diagnostics = GenerationDiagnostics {
        elements_per_layer: vec![0; (top_layer + 1) as usize],
        ..Default::default()
    };
    let mut branch_diagnostics = Vec::new();

    for layer in (0..=top_layer).rev() {
        cancel.check()?;

        let Some(queued) = incoming.remove(&layer) else {
            continue;
        };
        if queued.is_empty() {
            continue;
        }

        volumes.pin_layer(layer);
        if layer + 1 <= top_layer {
            volumes.unpin_layer(layer + 1);
        }

        let merged = {
            #[cfg(feature = "trace")]
            let _span = info_span!("merge_layer", layer).entered();
            merger::merge_layer(queued, settings, &volumes)
        };
        debug!(layer, elements = merged.len(), "merged layer");

        let step_results: Vec<StepResult> = {
            #[cfg(feature = "trace")]
            let _span = info_span!("propagate_layer", layer).entered();
            merged
                .par_iter()
                .enumerate()
                .map(|(idx, element)| {
                    if element.flags.landed {
                        StepResult::Deleted(None)
                    } else {
                        propagation::propagate_element(ElementId(idx as u32), element, settings, &volumes)
                    }
                })
                .collect()
        };

        diagnostics.total_branches += merged.len() as u64;
        diagnostics.elements_per_layer[layer as usize] = merged.len();

        for (idx, result) in step_results.into_iter().enumerate() {
            match result {
                StepResult::Propagated(child) => {
                    incoming.entry(layer - 1).or_default().push(child);
                }
                StepResult::Deleted(Some(diagnostic)) => {
                    diagnostics.lost_branches += 1;
                    branch_diagnostics.push((ElementId(idx as u32), layer, diagnostic));
                }
                StepResult::Deleted(None) => {}
            }
        }

        layers[layer as usize] = merged;
    }

    let lost_ratio = diagnostics.lost_ratio();
    if lost_ratio > LOST_BRANCH_WARN_RATIO {
        warn!(lost_ratio, "high proportion of branches failed to reach the build plate or model");
    }

    cancel.check()?;
    {
        #[cfg(feature = "trace")]
        let _span = info_span!("resolve_centers").entered();
        centerer::resolve_centers(&mut layers, settings, &volumes);
    }

    cancel.check()?;
    let outputs = {
        #[cfg(feature = "trace")]
        let _span = info_span!("draw_all").entered();
        drawer::draw_all(&layers, settings)
    };

    diagnostics.cache_stats = volumes.cache_stats();

    info!(layers = outputs.len(), branches = diagnostics.total_branches, "tree support generation finished");

    Ok(TreeSupportOutput {
        layers: outputs,
        diagnostics,
        branch_diagnostics,
    })
}

fn info_span(top_layer: i32) -> tracing::span::EnteredSpan {
    tracing::info_span!("generate_tree_supports", top_layer).entered()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::LayerGeometry;

    #[test]
    fn empty_model_produces_no_support() {
        let settings = TreeSupportSettings::from_nozzle(400, 200);
        let input = TreeSupportInput::new(vec![LayerGeometry::default(); 5]);
        let cancel = TreeSupportCancelToken::new();

        let output = generate_tree_supports(&input, &settings, &cancel).unwrap();
        assert_eq!(output.layers.len(), 5);
        assert_eq!(output.diagnostics.total_branches, 0);
    }

    #[test]
    fn invalid_settings_are_rejected_before_any_work() {
        let mut settings = TreeSupportSettings::from_nozzle(400, 200);
        settings.branch_radius = -1;
        let input = TreeSupportInput::new(vec![LayerGeometry::default(); 1]);
        let cancel = TreeSupportCancelToken::new();

        assert!(generate_tree_supports(&input, &settings, &cancel).is_err());
    }

    #[test]
    fn cancellation_is_observed() {
        let settings = TreeSupportSettings::from_nozzle(400, 200);
        let input = TreeSupportInput::new(vec![LayerGeometry::default(); 3]);
        let cancel = TreeSupportCancelToken::new();
        cancel.cancel();

        match generate_tree_supports(&input, &settings, &cancel) {
            Err(TreeSupportError::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }
}
