//! Availability cache.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{InstanceAvailability, ShowInstanceAvailability};

/// Storage for computed availability, keyed by external ID.
///
/// Entries live until `clear` is called; there is no expiry.
pub trait AvailabilityCache: Send + Sync {
    fn get_movie(&self, tmdb_id: u32) -> Option<InstanceAvailability>;
    fn put_movie(&self, tmdb_id: u32, availability: InstanceAvailability);
    fn get_show(&self, tvdb_id: u32) -> Option<ShowInstanceAvailability>;
    fn put_show(&self, tvdb_id: u32, availability: ShowInstanceAvailability);
    fn clear(&self);
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct InMemoryAvailabilityCache {
    movies: RwLock<HashMap<u32, InstanceAvailability>>,
    shows: RwLock<HashMap<u32, ShowInstanceAvailability>>,
}

impl InMemoryAvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let movies = self.movies.read().unwrap_or_else(|e| e.into_inner()).len();
        let shows = self.shows.read().unwrap_or_else(|e| e.into_inner()).len();
        movies + shows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AvailabilityCache for InMemoryAvailabilityCache {
    fn get_movie(&self, tmdb_id: u32) -> Option<InstanceAvailability> {
        self.movies
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tmdb_id)
            .cloned()
    }

    fn put_movie(&self, tmdb_id: u32, availability: InstanceAvailability) {
        self.movies
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tmdb_id, availability);
    }

    fn get_show(&self, tvdb_id: u32) -> Option<ShowInstanceAvailability> {
        self.shows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&tvdb_id)
            .cloned()
    }

    fn put_show(&self, tvdb_id: u32, availability: ShowInstanceAvailability) {
        self.shows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tvdb_id, availability);
    }

    fn clear(&self) {
        self.movies.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.shows.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
