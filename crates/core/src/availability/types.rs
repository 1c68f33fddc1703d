//! Availability summary types.

use serde::{Deserialize, Serialize};

/// One instance that holds a title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceHit {
    pub instance_id: i64,
    pub instance_name: String,
    pub is_4k: bool,
    /// Item ID inside the instance.
    pub external_item_id: i64,
}

/// Availability of a movie across all instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InstanceAvailability {
    pub has_standard: bool,
    pub has_4k: bool,
    pub instances: Vec<InstanceHit>,
}

impl InstanceAvailability {
    pub(crate) fn record(&mut self, hit: InstanceHit) {
        if hit.is_4k {
            self.has_4k = true;
        } else {
            self.has_standard = true;
        }
        self.instances.push(hit);
    }
}

/// Episode files of one season, per track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonAvailability {
    pub season_number: u32,
    pub episodes_standard: u32,
    pub episodes_4k: u32,
}

/// Availability of a show across all instances.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowInstanceAvailability {
    pub has_standard: bool,
    pub has_4k: bool,
    pub instances: Vec<InstanceHit>,
    /// Sorted by season number.
    pub seasons: Vec<SeasonAvailability>,
}

impl ShowInstanceAvailability {
    pub fn season(&self, season_number: u32) -> Option<&SeasonAvailability> {
        self.seasons.iter().find(|s| s.season_number == season_number)
    }
}
