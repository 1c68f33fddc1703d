//! Request routing.
//!
//! Two resolvers decide which Radarr/Sonarr/Readarr instance receives a
//! request and with which profile, folder and tags:
//!
//! - [`RoutingResolver`]: prioritized rules, first match wins.
//! - [`OverrideEvaluator`]: legacy per-instance overrides, most specific wins.
//!
//! [`RequestRouter`] picks one of them according to configuration and
//! records the resulting request.

mod overrides;
mod resolver;
mod router;
mod sqlite_store;
mod store;
mod types;

pub use overrides::OverrideEvaluator;
pub use resolver::RoutingResolver;
pub use router::{service_for, RequestError, RequestRouter, SubmitRequest};
pub use sqlite_store::SqliteRuleStore;
pub use store::{NewOverrideRule, NewRoutingRule, RuleStore};
pub use types::*;
