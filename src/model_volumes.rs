//! `ModelVolumes`: radius- and layer-indexed polygon caches.
//!
//! Each `(field, radius, layer)` key fills at most once: concurrent callers
//! block on the same `OnceLock` rather than recomputing. A bounded
//! least-recently-used list per field evicts cold entries once the cache
//! grows past its cap, skipping any layer still pinned by a live element.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, RwLock};

use lru::LruCache;

use crate::geometry::{CoordT, Polygons};
use crate::input::TreeSupportInput;
use crate::settings::{AvoidanceType, TreeSupportSettings};

/// Which cached field a query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Collision,
    Avoidance(AvoidanceType),
    AvoidanceToModel(AvoidanceType),
    PlaceableOnModel,
}

/// Hit/miss/eviction counters for one field kind, for introspection only,
/// never consulted by the pipeline itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> FieldCacheStats {
        FieldCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    field: Field,
    radius: CoordT,
    layer: i32,
}

struct Slot {
    value: OnceLock<Polygons>,
}

/// Computes and memoizes `collision`/`avoidance`/`placeable_on_model` fields.
/// Shared across all layer workers; reads dominate, writes happen once per
/// key.
pub struct ModelVolumes<'a> {
    input: &'a TreeSupportInput,
    settings: &'a TreeSupportSettings,

    entries: RwLock<HashMap<CacheKey, std::sync::Arc<Slot>>>,
    // Bounded recency list per field kind, guarded separately from `entries`
    // so eviction bookkeeping never blocks a concurrent fill.
    recency: Mutex<HashMap<Field, LruCache<CacheKey, ()>>>,
    // Layers some live element still references; never evict these.
    pinned_layers: RwLock<std::collections::HashSet<i32>>,

    max_entries_per_field: usize,

    counters: RwLock<HashMap<Field, Counters>>,
}

const DEFAULT_MAX_ENTRIES_PER_FIELD: usize = 256;

impl<'a> ModelVolumes<'a> {
    pub fn new(input: &'a TreeSupportInput, settings: &'a TreeSupportSettings) -> Self {
        ModelVolumes {
            input,
            settings,
            entries: RwLock::new(HashMap::new()),
            recency: Mutex::new(HashMap::new()),
            pinned_layers: RwLock::new(std::collections::HashSet::new()),
            max_entries_per_field: DEFAULT_MAX_ENTRIES_PER_FIELD,
            counters: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of hits/misses/evictions per field kind queried so far.
    pub fn cache_stats(&self) -> HashMap<Field, FieldCacheStats> {
        self.counters
            .read()
            .unwrap()
            .iter()
            .map(|(field, counters)| (*field, counters.snapshot()))
            .collect()
    }

    fn record(&self, field: Field, hit: bool) {
        let counters = self.counters.read().unwrap();
        if let Some(counters) = counters.get(&field) {
            if hit {
                counters.hits.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.misses.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }
        drop(counters);

        let mut counters = self.counters.write().unwrap();
        let entry = counters.entry(field).or_default();
        if hit {
            entry.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            entry.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_eviction(&self, field: Field) {
        let mut counters = self.counters.write().unwrap();
        counters.entry(field).or_default().evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks `layer` as referenced by at least one live element; pinned
    /// layers are skipped by eviction.
    pub fn pin_layer(&self, layer: i32) {
        self.pinned_layers.write().unwrap().insert(layer);
    }

    pub fn unpin_layer(&self, layer: i32) {
        self.pinned_layers.write().unwrap().remove(&layer);
    }

    /// Total query: on cache miss, computes synchronously; results are
    /// immutable once cached.
    pub fn get(&self, field: Field, radius: CoordT, layer: i32) -> Polygons {
        if layer < 0 || layer > self.input.top_layer() {
            return Polygons::empty();
        }

        let radius = self.settings.quantize_radius(radius.max(0));
        let key = CacheKey { field, radius, layer };

        let slot = self.slot_for(key);
        let mut was_computed = false;
        let value = slot
            .value
            .get_or_init(|| {
                was_computed = true;
                self.compute(field, radius, layer)
            })
            .clone();

        self.record(field, !was_computed);
        self.touch(key);
        value
    }

    fn slot_for(&self, key: CacheKey) -> std::sync::Arc<Slot> {
        if let Some(slot) = self.entries.read().unwrap().get(&key) {
            return slot.clone();
        }

        let mut entries = self.entries.write().unwrap();
        entries
            .entry(key)
            .or_insert_with(|| std::sync::Arc::new(Slot { value: OnceLock::new() }))
            .clone()
    }

    fn touch(&self, key: CacheKey) {
        let mut recency = self.recency.lock().unwrap();
        let cache = recency
            .entry(key.field)
            .or_insert_with(|| LruCache::new(std::num::NonZeroUsize::new(self.max_entries_per_field).unwrap()));
        cache.put(key, ());

        if let Some(evicted) = Self::evict_one(cache, &self.pinned_layers) {
            drop(recency);
            self.entries.write().unwrap().remove(&evicted);
            self.record_eviction(evicted.field);
        }
    }

    fn evict_one(
        cache: &mut LruCache<CacheKey, ()>,
        pinned: &RwLock<std::collections::HashSet<i32>>,
    ) -> Option<CacheKey> {
        if cache.len() <= cache.cap().get() {
            return None;
        }

        let pinned = pinned.read().unwrap();
        // Walk from least-recently-used, skipping anything pinned.
        let victim = cache
            .iter()
            .rev()
            .find(|(key, _)| !pinned.contains(&key.layer))
            .map(|(key, _)| *key);

        if let Some(victim) = victim {
            cache.pop(&victim);
            Some(victim)
        } else {
            None
        }
    }

    fn compute(&self, field: Field, radius: CoordT, layer: i32) -> Polygons {
        match field {
            Field::Collision => self.compute_collision(radius, layer),
            Field::Avoidance(avoidance_type) => self.compute_avoidance(avoidance_type, radius, layer, false),
            Field::AvoidanceToModel(avoidance_type) => {
                self.compute_avoidance(avoidance_type, radius, layer, true)
            }
            Field::PlaceableOnModel => self.compute_placeable_on_model(radius, layer),
        }
    }

    /// Model outline grown by `r + xy_distance`, with clearance for
    /// `z_distance_top/bottom_layers`, unioned with any blocker polygons.
    fn compute_collision(&self, radius: CoordT, layer: i32) -> Polygons {
        let top = layer + self.settings.z_distance_top_layers as i32;
        let bottom = layer - self.settings.z_distance_bottom_layers as i32;

        let mut nearby_outlines = Polygons::empty();
        let mut blockers = Polygons::empty();
        for l in bottom..=top {
            if let Some(geometry) = self.input.layer(l) {
                nearby_outlines = nearby_outlines.union(&geometry.outlines);
                if self.settings.avoid_support_blocker {
                    blockers = blockers.union(&geometry.blockers);
                }
            }
        }

        let offset = radius + self.settings.xy_distance;
        nearby_outlines.offset(offset).union(&blockers)
    }

    /// Inductively built from the avoidance on the layer above, grown by the
    /// per-layer maximum move, unioned with this layer's collision field
    ///. "Safe" variants additionally union a holefree dilation.
    fn compute_avoidance(
        &self,
        avoidance_type: AvoidanceType,
        radius: CoordT,
        layer: i32,
        to_model: bool,
    ) -> Polygons {
        let collision = self.compute_collision(radius, layer);

        let move_distance = match avoidance_type {
            AvoidanceType::Fast | AvoidanceType::FastSafe => self.settings.maximum_move_distance,
            AvoidanceType::Slow | AvoidanceType::SlowSafe => self.settings.maximum_move_distance_slow,
        };

        let field = if to_model {
            Field::AvoidanceToModel(avoidance_type)
        } else {
            Field::Avoidance(avoidance_type)
        };

        let above = self.get(field, radius, layer + 1);
        let grown_above = above.offset(move_distance);

        let mut avoidance = grown_above.union(&collision);

        if avoidance_type.is_safe() {
            avoidance = avoidance.union(&self.holefree_dilation(radius, layer));
        }

        if to_model {
            let placeable = self.compute_placeable_on_model(radius, layer);
            avoidance = avoidance.difference(&placeable);
        }

        avoidance
    }

    /// Fills in the model's own holes at this layer so a branch can never
    /// hover over empty space inside the model.
    fn holefree_dilation(&self, radius: CoordT, layer: i32) -> Polygons {
        let Some(geometry) = self.input.layer(layer) else {
            return Polygons::empty();
        };

        let outer_only: Vec<_> = geometry
            .outlines
            .to_point_rings()
            .into_iter()
            .map(|(outer, _holes)| (outer, Vec::new()))
            .collect();

        Polygons::from_rings(outer_only).offset(radius + self.settings.xy_distance)
    }

    /// Flat-enough upward-facing model surfaces, eroded by `r` so a full
    /// circle of that radius fits entirely on the surface.
    fn compute_placeable_on_model(&self, radius: CoordT, layer: i32) -> Polygons {
        let Some(geometry) = self.input.layer(layer) else {
            return Polygons::empty();
        };

        if !self.settings.support_rests_on_model {
            return Polygons::empty();
        }

        geometry.placeable_top_surfaces.offset(-radius)
    }
}
