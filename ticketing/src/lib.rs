//! # Ticketing
//!
//! Event ticketing engine: staff publish capacity-limited events, consumers
//! book, cancel and review them, and whole states can be saved and merged.
//!
//! ## Layout
//!
//! - [`types`]: identifiers, money, users, events, bookings, reviews
//! - [`tags`]: the tag registry and tag collections
//! - [`state`]: the single aggregate every operation works on
//! - [`operations`]: one input struct per request, each implementing
//!   [`Operation`](ticketbook_core::operation::Operation)
//! - [`filter`]: preference, date and distance filters
//! - [`mapping`]: the geocoding/routing collaborator and an offline stand-in
//! - [`snapshot`] and [`merge`]: versioned persistence and additive import
//! - [`environment`] and [`config`]: injected dependencies and their
//!   configuration
//!
//! ## Example
//!
//! ```ignore
//! use ticketing::operations::{BookEvent, Login};
//! use ticketing::{TicketingState, TicketingStore, TicketingEnvironment};
//!
//! let store = TicketingStore::new(TicketingState::new(), TicketingEnvironment::default());
//! store.send(Login { email, password }).await?;
//! let booking = store.send(BookEvent { event_number, tickets: 2 }).await?;
//! ```

pub mod config;
pub mod environment;
pub mod filter;
pub mod mapping;
pub mod merge;
pub mod operations;
pub mod snapshot;
pub mod state;
pub mod tags;
pub mod types;

pub use config::Config;
pub use environment::{Policy, TicketingEnvironment};
pub use merge::{MergeConflict, MergeSummary};
pub use state::TicketingState;
pub use tags::{EventTag, EventTagCollection, TagRegistry};
pub use types::{Booking, BookingNumber, BookingStatus, Event, EventCategory, EventNumber, EventStatus, Money, User};

/// Store specialised to the ticketing aggregate
pub type TicketingStore = ticketbook_runtime::Store<TicketingState, TicketingEnvironment>;
