//! Status reconciliation.
//!
//! Every write of media, season or episode status goes through
//! [`ReconciliationEngine::apply`], which compares the incoming snapshot to
//! the stored one and performs the request transitions that follow from the
//! difference:
//!
//! - PENDING -> AVAILABLE on a track approves the pending requests on it.
//! - A track reaching AVAILABLE/DELETED completes approved requests.
//! - For TV, season requests complete as their seasons become available and
//!   the parent completes once all of its seasons have.

mod engine;
mod types;

pub use engine::ReconciliationEngine;
pub use types::*;
