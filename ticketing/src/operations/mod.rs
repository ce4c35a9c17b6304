//! Ticketing operations.
//!
//! Each operation is an input struct implementing
//! [`Operation`](ticketbook_core::operation::Operation) over
//! [`TicketingState`](crate::state::TicketingState). Checks run in a fixed
//! order and the first failure wins; state is only touched after the last
//! check passes.

pub mod bookings;
pub mod directions;
pub mod events;
pub mod listing;
pub mod persistence;
pub mod profile;
pub mod reviews;
pub mod session;
pub mod tags;

#[cfg(test)]
pub(crate) mod fixtures;

pub use bookings::{BookEvent, BookEventError, CancelBooking, CancelBookingError};
pub use directions::{GetEventDirections, GetEventDirectionsError};
pub use events::{CancelEvent, CancelEventError, CancelledEvent, CreateEvent, CreateEventError};
pub use listing::{ListEvents, ListEventsByDistance, ListEventsByDistanceError, ListEventsError};
pub use persistence::{LoadSnapshot, LoadSnapshotError, SaveSnapshot, SaveSnapshotError};
pub use profile::{UpdateConsumerProfile, UpdateConsumerProfileError, UpdateStaffProfile, UpdateStaffProfileError};
pub use reviews::{ListReviews, ReviewEvent, ReviewEventError};
pub use session::{Login, LoginError, Logout, RegisterConsumer, RegisterConsumerError, RegisterStaff, RegisterStaffError};
pub use tags::{AddEventTag, AddEventTagError};

use crate::mapping::{locate, MapError, MapService};

/// Empty or whitespace only
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Treats a blank address as no address
pub(crate) fn normalize_address(address: Option<String>) -> Option<String> {
    address.filter(|a| !is_blank(a)).map(|a| a.trim().to_string())
}

/// Why an address was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressFault {
    /// Not a "lat lng" pair
    Invalid,
    /// Outside the map
    OutOfBounds,
}

pub(crate) fn check_address(map: &dyn MapService, address: &str) -> Result<(), AddressFault> {
    match locate(map, address) {
        Ok(_) => Ok(()),
        Err(MapError::OutOfBounds { .. }) => Err(AddressFault::OutOfBounds),
        Err(_) => Err(AddressFault::Invalid),
    }
}
