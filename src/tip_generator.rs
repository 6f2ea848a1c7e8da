//! `TipGenerator`: seeds branches under overhang regions.

use std::collections::HashMap;

use crate::element::SupportElement;
use crate::geometry::{CoordT, Point, Polygons};
use crate::input::TreeSupportInput;
use crate::model_volumes::{Field, ModelVolumes};
use crate::settings::TreeSupportSettings;

pub struct TipGenerator<'a> {
    settings: &'a TreeSupportSettings,
}

impl<'a> TipGenerator<'a> {
    pub fn new(settings: &'a TreeSupportSettings) -> Self {
        TipGenerator { settings }
    }

    /// For each overhang polygon on every layer, produces tip elements.
    /// Returns a `layer -> tips` map to be injected as propagation reaches
    /// each layer.
    pub fn generate(
        &self,
        input: &TreeSupportInput,
        volumes: &ModelVolumes,
    ) -> HashMap<i32, Vec<SupportElement>> {
        let mut tips_by_layer: HashMap<i32, Vec<SupportElement>> = HashMap::new();

        for layer in 0..=input.top_layer() {
            let Some(geometry) = input.layer(layer) else {
                continue;
            };
            // Enforcer regions demand support the same as a detected
            // overhang, even where the slicer didn't flag one.
            let required = geometry.overhangs.union(&geometry.enforcers);
            if required.is_empty() {
                continue;
            }

            let shrunk = required.offset(-(self.settings.support_line_width / 2));
            if shrunk.is_empty() {
                continue;
            }

            let seeds = self.seed_points(&shrunk);
            if seeds.is_empty() {
                continue;
            }

            let collision = volumes.get(Field::Collision, self.settings.min_radius, layer);
            let mut tips = Vec::with_capacity(seeds.len());

            for seed in seeds {
                let disk = Polygons::circle(seed, self.settings.min_radius, 12).difference(&collision);
                if disk.is_empty() {
                    continue;
                }

                // Roof interface is only owed where the slicer actually
                // flagged an overhang; an enforcer-only seed supports
                // nothing above it.
                let supports_roof = geometry.overhangs.contains_point(seed);

                tips.push(SupportElement::new_tip(
                    layer,
                    seed,
                    disk,
                    self.settings.tip_layers,
                    supports_roof,
                    false,
                ));
            }

            if !tips.is_empty() {
                tips_by_layer.entry(layer).or_default().extend(tips);
            }
        }

        tips_by_layer
    }

    /// Hexagonal-packed sample points spaced so that a fully grown tree
    /// (radius = `branch_radius`) covers the overhang without gaps.
    fn seed_points(&self, area: &Polygons) -> Vec<Point> {
        let spacing = (self.settings.branch_radius as f64 * 3f64.sqrt()).round() as CoordT;
        let spacing = spacing.max(1);
        let row_height = (spacing as f64 * 3f64.sqrt() / 2.0).round() as CoordT;

        let mut points = Vec::new();

        for (outer, _holes) in area.to_point_rings() {
            let (min_x, max_x, min_y, max_y) = bounds(&outer);

            let mut row = 0i64;
            let mut y = min_y;
            while y <= max_y {
                let x_offset = if row % 2 == 0 { 0 } else { spacing / 2 };
                let mut x = min_x + x_offset;
                while x <= max_x {
                    let candidate = Point::new(x, y);
                    if area.contains_point(candidate) {
                        points.push(candidate);
                    }
                    x += spacing;
                }
                y += row_height.max(1);
                row += 1;
            }
        }

        // Degenerate / very small overhangs: fall back to the centroid so a
        // tiny region still gets at least one support branch.
        if points.is_empty() {
            if let Some(centroid) = area.centroid() {
                points.push(centroid);
            }
        }

        points
    }
}

fn bounds(points: &[Point]) -> (CoordT, CoordT, CoordT, CoordT) {
    let mut min_x = CoordT::MAX;
    let mut max_x = CoordT::MIN;
    let mut min_y = CoordT::MAX;
    let mut max_y = CoordT::MIN;

    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    (min_x, max_x, min_y, max_y)
}
