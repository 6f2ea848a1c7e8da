//! Polygon primitives and the seam between this crate's fixed-point support
//! geometry and the [`geo`] ecosystem.
//!
//! This crate never implements its own polygon boolean-ops or offsetting.
//! [`Polygons`] is a thin wrapper around [`geo::MultiPolygon<f64>`],
//! converting to/from the integer micrometer coordinates used everywhere
//! else in the crate at the boundary.

use geo::{
    Area as GeoArea, BooleanOps, Contains, ConvexHull, Coord as GeoCoord, LineString,
    MultiPolygon, Polygon as GeoPolygon, Simplify,
};

/// Fixed-point scalar, in micrometers. Shared by coordinates, radii, and
/// offsets throughout the crate.
pub type CoordT = i64;

/// A single point in the layer plane, in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub x: CoordT,
    pub y: CoordT,
}

impl Point {
    pub const fn new(x: CoordT, y: CoordT) -> Self {
        Point { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotates this point by `radians` around the origin.
    pub fn rotate(self, radians: f64) -> Point {
        let (sin, cos) = radians.sin_cos();
        Point {
            x: (self.x as f64 * cos - self.y as f64 * sin).round() as CoordT,
            y: (self.x as f64 * sin + self.y as f64 * cos).round() as CoordT,
        }
    }

    pub fn translate(self, dx: CoordT, dy: CoordT) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Moves towards `target` by at most `max_distance`, never overshooting.
    pub fn move_towards(self, target: Point, max_distance: CoordT) -> Point {
        let dist = self.distance_to(target);
        if dist <= max_distance as f64 || dist == 0.0 {
            return target;
        }

        let t = max_distance as f64 / dist;
        Point {
            x: self.x + ((target.x - self.x) as f64 * t).round() as CoordT,
            y: self.y + ((target.y - self.y) as f64 * t).round() as CoordT,
        }
    }

    fn to_geo(self) -> GeoCoord<f64> {
        GeoCoord {
            x: self.x as f64,
            y: self.y as f64,
        }
    }

    fn from_geo(coord: GeoCoord<f64>) -> Self {
        Point {
            x: coord.x.round() as CoordT,
            y: coord.y.round() as CoordT,
        }
    }
}

/// A possibly multi-component polygonal region: an outer contour (CCW) plus
/// holes (CW), or several disjoint such components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygons(pub(crate) MultiPolygon<f64>);

impl Polygons {
    pub fn empty() -> Self {
        Polygons(MultiPolygon::new(Vec::new()))
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.iter().all(|polygon| polygon.unsigned_area() < 1.0)
    }

    /// Builds a region from one or more rings. The first ring of each
    /// `(outer, holes)` pair is the outer contour; the rest are holes.
    pub fn from_rings(components: Vec<(Vec<Point>, Vec<Vec<Point>>)>) -> Self {
        let polygons = components
            .into_iter()
            .filter(|(outer, _)| outer.len() >= 3)
            .map(|(outer, holes)| {
                let exterior = LineString::new(outer.iter().map(|p| p.to_geo()).collect());
                let interiors = holes
                    .into_iter()
                    .filter(|hole| hole.len() >= 3)
                    .map(|hole| LineString::new(hole.iter().map(|p| p.to_geo()).collect()))
                    .collect();
                GeoPolygon::new(exterior, interiors)
            })
            .collect();

        Polygons(MultiPolygon::new(polygons))
    }

    /// A regular `resolution`-gon of the given radius centered at `center`,
    /// used by the drawer to rasterize a branch cross-section.
    pub fn circle(center: Point, radius: CoordT, resolution: usize) -> Self {
        if radius <= 0 || resolution < 3 {
            return Polygons::empty();
        }

        let points = (0..resolution)
            .map(|i| {
                let theta = (i as f64) / (resolution as f64) * std::f64::consts::TAU;
                Point::new(
                    center.x + (radius as f64 * theta.cos()).round() as CoordT,
                    center.y + (radius as f64 * theta.sin()).round() as CoordT,
                )
            })
            .collect();

        Polygons::from_rings(vec![(points, Vec::new())])
    }

    pub fn union(&self, other: &Polygons) -> Polygons {
        Polygons(self.0.union(&other.0))
    }

    pub fn union_all<'a>(polygons: impl IntoIterator<Item = &'a Polygons>) -> Polygons {
        polygons
            .into_iter()
            .fold(Polygons::empty(), |acc, p| acc.union(p))
    }

    pub fn intersection(&self, other: &Polygons) -> Polygons {
        Polygons(self.0.intersection(&other.0))
    }

    pub fn difference(&self, other: &Polygons) -> Polygons {
        Polygons(self.0.difference(&other.0))
    }

    /// Minkowski offset: positive grows the region, negative shrinks it.
    /// Joins are rounded.
    pub fn offset(&self, delta: CoordT) -> Polygons {
        if delta == 0 {
            return self.clone();
        }

        if self.is_empty() {
            return Polygons::empty();
        }

        let distance = delta as f64;
        let grown: Vec<MultiPolygon<f64>> = self
            .0
             .0
            .iter()
            .map(|polygon| geo_buffer::buffer_polygon(polygon, distance))
            .collect();

        grown
            .into_iter()
            .fold(Polygons::empty(), |acc, multi| acc.union(&Polygons(multi)))
    }

    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.0.contains(&point.to_geo())
    }

    /// Simplifies every component to within `tolerance` Hausdorff deviation
    /// (Douglas-Peucker), per the resolution setting.
    pub fn simplify(&self, tolerance: CoordT) -> Polygons {
        if tolerance <= 0 {
            return self.clone();
        }
        Polygons(self.0.simplify(&(tolerance as f64)))
    }

    /// Convex hull of every vertex across all components, used by the
    /// drawer's ovalisation step.
    pub fn convex_hull_with(&self, other: &Polygons) -> Polygons {
        let mut combined = self.0.clone();
        combined.0.extend(other.0 .0.iter().cloned());
        let hull = combined.convex_hull();
        Polygons(MultiPolygon::new(vec![hull]))
    }

    /// Iterates the outer-contour + hole rings of every component, as
    /// integer points, for output / rasterization.
    pub fn to_point_rings(&self) -> Vec<(Vec<Point>, Vec<Vec<Point>>)> {
        self.0
             .0
            .iter()
            .map(|polygon| {
                let outer = polygon.exterior().coords().map(|c| Point::from_geo(*c)).collect();
                let holes = polygon
                    .interiors()
                    .iter()
                    .map(|ring| ring.coords().map(|c| Point::from_geo(*c)).collect())
                    .collect();
                (outer, holes)
            })
            .collect()
    }

    pub fn centroid(&self) -> Option<Point> {
        use geo::Centroid;
        self.0.centroid().map(Point::from_geo)
    }

    /// Applies `f` to every vertex. Used by the rotation/translation
    /// round-trip tests in `tests/`; not otherwise reachable from the
    /// pipeline.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Polygons {
        let rings = self
            .to_point_rings()
            .into_iter()
            .map(|(outer, holes)| {
                let outer = outer.into_iter().map(&f).collect();
                let holes = holes
                    .into_iter()
                    .map(|hole| hole.into_iter().map(&f).collect())
                    .collect();
                (outer, holes)
            })
            .collect();
        Polygons::from_rings(rings)
    }
}
