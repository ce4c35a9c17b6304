//! Injected dependencies for ticketing operations.

use crate::mapping::{MapService, OfflineMap};
use crate::snapshot::{MemorySnapshotStore, SnapshotStore};
use crate::types::Password;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticketbook_core::environment::{Clock, SystemClock};

/// Business rules that are configuration rather than code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Shared secret a new staff member must know
    pub staff_secret: Password,
    /// Consumers may not cancel once the event starts within this window
    pub cancellation_window: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            staff_secret: Password::new("Nec temere nec timide"),
            cancellation_window: Duration::hours(24),
        }
    }
}

/// Environment for every ticketing operation
#[derive(Clone)]
pub struct TicketingEnvironment {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Geocoding and routing
    pub map: Arc<dyn MapService>,
    /// Snapshot storage
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Business rules
    pub policy: Policy,
}

impl TicketingEnvironment {
    /// Creates an environment with the default policy
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, map: Arc<dyn MapService>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            clock,
            map,
            snapshots,
            policy: Policy::default(),
        }
    }

    /// Replaces the policy
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Current time
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// System clock, offline map, in-memory snapshots
impl Default for TicketingEnvironment {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(OfflineMap::default()),
            Arc::new(MemorySnapshotStore::new()),
        )
    }
}

impl std::fmt::Debug for TicketingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketingEnvironment")
            .field("now", &self.now())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
