//! Domain types for the ticketing engine.
//!
//! Value objects, entities and the user capability union. Everything here is
//! plain data: invariants that span entities (remaining tickets against active
//! bookings, status transitions) are enforced by the operations.

use crate::tags::EventTagCollection;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Sequential, 1-based event number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventNumber(u64);

impl EventNumber {
    /// The number given to the first event
    pub const FIRST: Self = Self(1);

    /// Creates an `EventNumber`
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Raw number
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The number that follows this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EventNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential, 1-based booking number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingNumber(u64);

impl BookingNumber {
    /// The number given to the first booking
    pub const FIRST: Self = Self(1);

    /// Creates a `BookingNumber`
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Raw number
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The number that follows this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for BookingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (minor units to avoid floating point errors)
// ============================================================================

/// Ticket price in minor currency units (pence, cents)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// Account password.
///
/// Never rendered: `Debug` and `Display` both print `***`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wraps a plain-text password
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Checks a login attempt
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    /// Empty or whitespace only
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ticketbook_core::outcome::MASKED)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Staff member. No fields beyond identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Unique, case-sensitive login
    pub email: String,
    /// Login secret
    pub password: Password,
}

/// Consumer account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    /// Unique, case-sensitive login
    pub email: String,
    /// Login secret
    pub password: Password,
    /// Display name
    pub name: String,
    /// Phone number used for notifications
    pub phone: String,
    /// Home location as a "lat lng" pair
    pub address: Option<String>,
    /// Tag preferences used to filter listings
    pub preferences: EventTagCollection,
    /// Owned bookings, oldest first
    pub bookings: Vec<BookingNumber>,
}

impl Consumer {
    /// Equal in every field except the booking list
    #[must_use]
    pub fn same_account(&self, other: &Self) -> bool {
        self.email == other.email
            && self.password == other.password
            && self.name == other.name
            && self.phone == other.phone
            && self.address == other.address
            && self.preferences == other.preferences
    }
}

/// A registered account: exactly one capability variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum User {
    /// Organises events
    Staff(Staff),
    /// Books and reviews events
    Consumer(Consumer),
}

impl User {
    /// Account e-mail
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Staff(staff) => &staff.email,
            Self::Consumer(consumer) => &consumer.email,
        }
    }

    /// Account password
    #[must_use]
    pub const fn password(&self) -> &Password {
        match self {
            Self::Staff(staff) => &staff.password,
            Self::Consumer(consumer) => &consumer.password,
        }
    }

    /// Capability name for reports
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Staff(_) => "staff",
            Self::Consumer(_) => "consumer",
        }
    }

    /// Same variant, equal in every field except bookings
    #[must_use]
    pub fn same_account(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Staff(a), Self::Staff(b)) => a == b,
            (Self::Consumer(a), Self::Consumer(b)) => a.same_account(b),
            _ => false,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Event category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Concerts and gigs
    Music,
    /// Plays
    Theatre,
    /// Dance performances
    Dance,
    /// Screenings
    Movie,
    /// Matches and races
    Sports,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Music => "Music",
            Self::Theatre => "Theatre",
            Self::Dance => "Dance",
            Self::Movie => "Movie",
            Self::Sports => "Sports",
        };
        f.write_str(name)
    }
}

impl FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "music" => Ok(Self::Music),
            "theatre" => Ok(Self::Theatre),
            "dance" => Ok(Self::Dance),
            "movie" => Ok(Self::Movie),
            "sports" => Ok(Self::Sports),
            other => Err(format!("unknown event category: {other}")),
        }
    }
}

/// Event status. Only `Active -> Cancelled` is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// Open for booking
    Active,
    /// Retired by staff
    Cancelled,
}

/// A published event with its ticket inventory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned at creation, never reused
    pub number: EventNumber,
    /// Title (not unique on its own)
    pub title: String,
    /// Category
    pub category: EventCategory,
    /// Tickets available at creation
    pub ticket_cap: u32,
    /// Tickets still available (`0..=ticket_cap`)
    pub remaining_tickets: u32,
    /// Price per ticket
    pub price: Money,
    /// Venue location as a "lat lng" pair
    pub venue_address: Option<String>,
    /// Free text
    pub description: String,
    /// Start time, strictly before `end`
    pub start: DateTime<Utc>,
    /// End time
    pub end: DateTime<Utc>,
    /// Declared attributes
    pub tags: EventTagCollection,
    /// Reviews, oldest first
    pub reviews: Vec<Review>,
    /// Lifecycle status
    pub status: EventStatus,
}

impl Event {
    /// Returns true if not cancelled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// True if `(title, start, end)` matches
    #[must_use]
    pub fn has_key(&self, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.title == title && self.start == start && self.end == end
    }

    /// Equal in every field except the locally assigned number
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.title == other.title
            && self.category == other.category
            && self.ticket_cap == other.ticket_cap
            && self.remaining_tickets == other.remaining_tickets
            && self.price == other.price
            && self.venue_address == other.venue_address
            && self.description == other.description
            && self.start == other.start
            && self.end == other.end
            && self.tags == other.tags
            && self.status == other.status
            && self.reviews.len() == other.reviews.len()
            && self
                .reviews
                .iter()
                .zip(&other.reviews)
                .all(|(a, b)| a.same_as(b))
    }

    /// Calendar date the event starts on
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Calendar date the event ends on
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Booking status. Once it leaves `Active` it never returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Holds tickets
    Active,
    /// Cancelled by the booker; tickets went back to the event
    CancelledByConsumer,
    /// Refunded because staff cancelled the event
    CancelledByProvider,
}

/// Tickets held by one consumer for one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Assigned at creation, never reused
    pub number: BookingNumber,
    /// Booker's e-mail
    pub booker: String,
    /// Booked event
    pub event: EventNumber,
    /// Ticket quantity, at least one
    pub tickets: u32,
    /// When the booking was made
    pub created_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: BookingStatus,
}

impl Booking {
    /// Returns true if the booking still holds tickets
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }
}

// ============================================================================
// Reviews
// ============================================================================

/// Append-only review of a concluded event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Author's e-mail
    pub author: String,
    /// Reviewed event
    pub event: EventNumber,
    /// When the review was written
    pub created_at: DateTime<Utc>,
    /// Free text
    pub content: String,
}

impl Review {
    /// Equal ignoring the locally assigned event number
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.author == other.author && self.created_at == other.created_at && self.content == other.content
    }
}
