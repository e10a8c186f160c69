//! Random selection of one reviewable entry.
//!
//! The pool is the feed's candidate list minus resolved entries, narrowed by
//! an optional city box and an optional minimum epoch. Candidates are then
//! drawn uniformly at random without replacement until one whose full text
//! has not been seen in an existing resolution turns up. Every draw removes
//! its index from the unvisited set, so a pool of `n` entries costs at most
//! `n` detail lookups and duplicate probes.

use std::collections::HashSet;
use std::sync::Arc;

use fieldcheck_common::{EntryId, LocationCandidate, Selection};
use fieldcheck_store::LocationStore;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::geo::{maps_link, CityRegistry, GeoBox};
use crate::{CheckError, LocationSource, Result};

/// Optional narrowing for a selection request. Zero, empty and unparseable
/// values all mean "not given".
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SelectQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    pub city_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub starting_at: Option<i64>,
}

fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

pub struct Selector {
    source: Arc<dyn LocationSource>,
    store: Arc<dyn LocationStore>,
    cities: CityRegistry,
    rng: Mutex<StdRng>,
}

impl Selector {
    /// The RNG is seeded once here from the OS and reused for every request.
    pub fn new(source: Arc<dyn LocationSource>, store: Arc<dyn LocationStore>) -> Self {
        Self {
            source,
            store,
            cities: CityRegistry::default(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_cities(mut self, cities: CityRegistry) -> Self {
        self.cities = cities;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub async fn select(&self, query: SelectQuery) -> Result<Selection> {
        let candidates = self.source.all_candidates().await?;
        let resolved = self.store.resolved_entry_ids().await?;
        let pool = self.build_pool(candidates, &resolved, query);

        if pool.is_empty() {
            debug!(?query, "No candidates left after filtering");
            return Ok(Selection::empty());
        }

        let count = pool.len();
        let mut unvisited: Vec<usize> = (0..count).collect();

        while !unvisited.is_empty() {
            let pick = self.random_index(unvisited.len());
            let candidate = &pool[unvisited.swap_remove(pick)];

            let detail = match self.source.detail(candidate.entry_id).await {
                Ok(detail) => detail,
                Err(CheckError::NotFound(_)) => {
                    warn!(entry_id = candidate.entry_id, "Entry vanished from feed, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if self.store.is_duplicate(&detail.full_text).await? {
                debug!(entry_id = candidate.entry_id, "Skipping duplicate entry");
                continue;
            }

            let mut selected = candidate.clone();
            selected.original_location = Some(maps_link(selected.lat(), selected.lng()));
            selected.original_message = Some(detail.full_text);
            return Ok(Selection {
                count,
                location: Some(selected),
            });
        }

        debug!(count, "Every candidate in the pool was a duplicate");
        Ok(Selection::empty())
    }

    fn build_pool(
        &self,
        candidates: Vec<LocationCandidate>,
        resolved: &HashSet<EntryId>,
        query: SelectQuery,
    ) -> Vec<LocationCandidate> {
        let mut pool = exclude_resolved(candidates, resolved);

        if let Some(city_id) = query.city_id.filter(|id| *id > 0) {
            match self.cities.get(city_id) {
                Some(geo_box) => pool = within_box(pool, geo_box),
                None => warn!(city_id, "Unknown city id, ignoring city filter"),
            }
        }

        if let Some(starting_at) = query.starting_at {
            pool = since_epoch(pool, starting_at);
        }

        pool
    }

    fn random_index(&self, len: usize) -> usize {
        self.rng.lock().random_range(0..len)
    }
}

pub fn exclude_resolved(
    candidates: Vec<LocationCandidate>,
    resolved: &HashSet<EntryId>,
) -> Vec<LocationCandidate> {
    candidates
        .into_iter()
        .filter(|c| !resolved.contains(&c.entry_id))
        .collect()
}

pub fn within_box(candidates: Vec<LocationCandidate>, geo_box: &GeoBox) -> Vec<LocationCandidate> {
    candidates
        .into_iter()
        .filter(|c| geo_box.contains(c.lat(), c.lng()))
        .collect()
}

/// Keep candidates at or after `starting_at`. Non-positive values keep everything.
pub fn since_epoch(candidates: Vec<LocationCandidate>, starting_at: i64) -> Vec<LocationCandidate> {
    if starting_at <= 0 {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| c.epoch >= starting_at)
        .collect()
}
