//! Whole-state save and merge-on-load.

use crate::environment::TicketingEnvironment;
use crate::merge::{merge, MergeConflict, MergeSummary};
use crate::snapshot::{self, SnapshotError};
use crate::state::TicketingState;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

// ============================================================================
// SaveSnapshot
// ============================================================================

/// Writes the whole state to the snapshot store
#[derive(Debug, Clone)]
pub struct SaveSnapshot {
    /// Snapshot name
    pub name: String,
}

/// Why a snapshot was not written
#[derive(Error, Debug)]
pub enum SaveSnapshotError {
    /// Logged-in user is not staff
    #[error("Only staff can save the application state (current user: {role})")]
    NotStaff {
        /// Role of the session user
        role: &'static str,
    },

    /// Encoding or writing failed
    #[error(transparent)]
    Storage(#[from] SnapshotError),
}

impl Rejection for SaveSnapshotError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStaff { .. } => "SAVE_APP_STATE_USER_NOT_STAFF",
            Self::Storage(_) => "SAVE_APP_STATE_IO_FAILURE",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotStaff { role } => Context::new().with("currentUser", *role),
            Self::Storage(error) => Context::new().with("reason", error.to_string()),
        }
    }

    fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl Operation for SaveSnapshot {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = usize;
    type Error = SaveSnapshotError;

    const NAME: &'static str = "SaveAppState";

    fn execute(self, state: &mut TicketingState, env: &TicketingEnvironment) -> Result<Applied<usize>, SaveSnapshotError> {
        if state.current_staff().is_none() {
            return Err(SaveSnapshotError::NotStaff {
                role: state.session_role(),
            });
        }

        let bytes = snapshot::encode(state)?;
        env.snapshots.save(&self.name, &bytes)?;

        let report = Report::new(
            "SAVE_APP_STATE_SUCCESS",
            Context::new()
                .with("filename", self.name.as_str())
                .with("bytes", bytes.len()),
        );
        Ok(Applied::new(bytes.len(), report))
    }
}

// ============================================================================
// LoadSnapshot
// ============================================================================

/// Reads a snapshot and merges it into the current state
#[derive(Debug, Clone)]
pub struct LoadSnapshot {
    /// Snapshot name
    pub name: String,
}

/// Why a snapshot was not merged
#[derive(Error, Debug)]
pub enum LoadSnapshotError {
    /// Logged-in user is not staff
    #[error("Only staff can load an application state (current user: {role})")]
    NotStaff {
        /// Role of the session user
        role: &'static str,
    },

    /// Nothing stored under that name
    #[error("Snapshot not found: {name}")]
    NotFound {
        /// Requested snapshot
        name: String,
    },

    /// Reading or decoding failed
    #[error(transparent)]
    Storage(SnapshotError),

    /// The snapshot conflicts with local records
    #[error(transparent)]
    Conflict(#[from] MergeConflict),
}

impl From<SnapshotError> for LoadSnapshotError {
    fn from(error: SnapshotError) -> Self {
        match error {
            SnapshotError::NotFound { name } => Self::NotFound { name },
            other => Self::Storage(other),
        }
    }
}

impl Rejection for LoadSnapshotError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStaff { .. } => "LOAD_APP_STATE_USER_NOT_STAFF",
            Self::NotFound { .. } => "LOAD_APP_STATE_FILE_NOT_FOUND",
            Self::Storage(_) => "LOAD_APP_STATE_IO_FAILURE",
            Self::Conflict(MergeConflict::ClashingTags { .. }) => "LOAD_APP_STATE_CLASHING_TAGS",
            Self::Conflict(MergeConflict::ClashingEmail { .. }) => "LOAD_APP_STATE_CLASHING_EMAIL",
            Self::Conflict(MergeConflict::ClashingEvents { .. }) => "LOAD_APP_STATE_CLASHING_EVENTS",
            Self::Conflict(MergeConflict::ClashingBookings { .. }) => "LOAD_APP_STATE_CLASHING_BOOKINGS",
            Self::Conflict(MergeConflict::DanglingBooking { .. }) => "LOAD_APP_STATE_DANGLING_BOOKING",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotStaff { role } => Context::new().with("currentUser", *role),
            Self::NotFound { name } => Context::new().with("filename", name.as_str()),
            Self::Storage(error) => Context::new().with("reason", error.to_string()),
            Self::Conflict(conflict) => Context::new().with("conflict", conflict.to_string()),
        }
    }

    fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl Operation for LoadSnapshot {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = MergeSummary;
    type Error = LoadSnapshotError;

    const NAME: &'static str = "LoadAppState";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<MergeSummary>, LoadSnapshotError> {
        if state.current_staff().is_none() {
            return Err(LoadSnapshotError::NotStaff {
                role: state.session_role(),
            });
        }

        let bytes = env.snapshots.load(&self.name)?;
        let foreign = snapshot::decode(&bytes)?;
        let summary = merge(state, foreign)?;

        tracing::info!(
            snapshot = %self.name,
            tags = summary.tags,
            users = summary.users,
            events = summary.events,
            bookings = summary.bookings,
            "Snapshot merged"
        );

        let report = Report::new(
            "LOAD_APP_STATE_SUCCESS",
            Context::new()
                .with("filename", self.name.as_str())
                .with_serialized("merged", &summary),
        );
        Ok(Applied::new(summary, report))
    }
}
