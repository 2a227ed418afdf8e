//! Pluggable policies consulted by allocation and the event systems.
//!
//! Each family is a closed enum chosen once at startup and stored as a resource. Policies
//! only inspect state and return decisions; the systems apply them.

pub mod recharge;
pub mod repositioning;
pub mod ridesharing;

pub use recharge::{validate_plan, InterleavedPlan, PlanRejection, RechargePolicy};
pub use repositioning::{Reposition, RepositionParams, RepositioningPolicy};
pub use ridesharing::{RideSharingPolicy, SharedRoute};
