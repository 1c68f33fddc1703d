//! Availability of a title across all configured instances.

mod aggregator;
mod cache;
mod types;

pub use aggregator::AvailabilityAggregator;
pub use cache::{AvailabilityCache, InMemoryAvailabilityCache};
pub use types::*;
