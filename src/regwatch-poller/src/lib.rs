//! Poll coordinator for registry watches.
//!
//! One coordinator per watched company: it owns the cached snapshot, drives a
//! single-flight refresh timer, and fans successful updates out to
//! subscribers. Failed refreshes keep serving the last good snapshot.

mod coordinator;

pub use coordinator::{
    CoordinatorState, PollCoordinator, PollHandle, SetupError, Subscription, TickOutcome,
};
