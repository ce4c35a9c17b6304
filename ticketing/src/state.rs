//! The ticketing aggregate.
//!
//! One value holds every registry: users, events, bookings and tags, plus the
//! session. Operations are its only mutators.

use crate::tags::{EventTagCollection, TagRegistry};
use crate::types::{Booking, BookingNumber, Consumer, Event, EventCategory, EventNumber, EventStatus, Money, Staff, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields of a new event, before a number is assigned
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDraft {
    /// Title
    pub title: String,
    /// Category
    pub category: EventCategory,
    /// Tickets on sale
    pub ticket_cap: u32,
    /// Price per ticket
    pub price: Money,
    /// Venue "lat lng", already validated
    pub venue_address: Option<String>,
    /// Free text
    pub description: String,
    /// Start time
    pub start: DateTime<Utc>,
    /// End time
    pub end: DateTime<Utc>,
    /// Declared tags, already validated
    pub tags: EventTagCollection,
}

/// Whole ticketing state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketingState {
    /// Accounts keyed by e-mail
    pub users: BTreeMap<String, User>,
    /// E-mail of the logged-in user. Never persisted.
    #[serde(skip)]
    pub session: Option<String>,
    /// Catalog in creation order
    pub events: Vec<Event>,
    /// Ledger in creation order
    pub bookings: Vec<Booking>,
    /// Registered tags
    pub tags: TagRegistry,
    next_event_number: EventNumber,
    next_booking_number: BookingNumber,
}

impl Default for TicketingState {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketingState {
    /// Empty state with the baseline tags registered
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: BTreeMap::new(),
            session: None,
            events: Vec::new(),
            bookings: Vec::new(),
            tags: TagRegistry::seeded(),
            next_event_number: EventNumber::FIRST,
            next_booking_number: BookingNumber::FIRST,
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// The logged-in user, if any
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.session.as_deref().and_then(|email| self.users.get(email))
    }

    /// The logged-in user if they are staff
    #[must_use]
    pub fn current_staff(&self) -> Option<&Staff> {
        match self.current_user() {
            Some(User::Staff(staff)) => Some(staff),
            _ => None,
        }
    }

    /// The logged-in user if they are a consumer
    #[must_use]
    pub fn current_consumer(&self) -> Option<&Consumer> {
        match self.current_user() {
            Some(User::Consumer(consumer)) => Some(consumer),
            _ => None,
        }
    }

    /// Role of the logged-in user for reports, `none` when logged out
    #[must_use]
    pub fn session_role(&self) -> &'static str {
        self.current_user().map_or("none", User::role)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Event by number
    #[must_use]
    pub fn find_event(&self, number: EventNumber) -> Option<&Event> {
        self.events.iter().find(|event| event.number == number)
    }

    pub(crate) fn find_event_mut(&mut self, number: EventNumber) -> Option<&mut Event> {
        self.events.iter_mut().find(|event| event.number == number)
    }

    /// Event with the given `(title, start, end)`
    #[must_use]
    pub fn find_event_by_key(&self, title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<&Event> {
        self.events.iter().find(|event| event.has_key(title, start, end))
    }

    /// Booking by number
    #[must_use]
    pub fn find_booking(&self, number: BookingNumber) -> Option<&Booking> {
        self.bookings.iter().find(|booking| booking.number == number)
    }

    pub(crate) fn find_booking_mut(&mut self, number: BookingNumber) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|booking| booking.number == number)
    }

    /// Bookings for one event
    pub fn bookings_for(&self, event: EventNumber) -> impl Iterator<Item = &Booking> {
        self.bookings.iter().filter(move |booking| booking.event == event)
    }

    /// Tickets left for an event
    #[must_use]
    pub fn remaining_tickets(&self, event: EventNumber) -> Option<u32> {
        self.find_event(event).map(|event| event.remaining_tickets)
    }

    /// Next number `create_event` will assign
    #[must_use]
    pub const fn next_event_number(&self) -> EventNumber {
        self.next_event_number
    }

    /// Next number `add_booking` will assign
    #[must_use]
    pub const fn next_booking_number(&self) -> BookingNumber {
        self.next_booking_number
    }

    // ========================================================================
    // Mutators (called only after validation)
    // ========================================================================

    /// Adds an event with the next number, full stock and `Active` status
    pub(crate) fn create_event(&mut self, draft: EventDraft) -> &Event {
        let number = self.next_event_number;
        self.next_event_number = number.next();

        let index = self.events.len();
        self.events.push(Event {
            number,
            title: draft.title,
            category: draft.category,
            ticket_cap: draft.ticket_cap,
            remaining_tickets: draft.ticket_cap,
            price: draft.price,
            venue_address: draft.venue_address,
            description: draft.description,
            start: draft.start,
            end: draft.end,
            tags: draft.tags,
            reviews: Vec::new(),
            status: EventStatus::Active,
        });
        &self.events[index]
    }

    /// Stores `user` under its (possibly changed) e-mail and re-points
    /// bookings, reviews and the session from `old_email`
    pub(crate) fn replace_user(&mut self, old_email: &str, user: User) {
        let new_email = user.email().to_string();
        self.users.remove(old_email);
        self.users.insert(new_email.clone(), user);

        if new_email == old_email {
            return;
        }
        for booking in self.bookings.iter_mut().filter(|b| b.booker == old_email) {
            booking.booker.clone_from(&new_email);
        }
        for review in self
            .events
            .iter_mut()
            .flat_map(|event| event.reviews.iter_mut())
            .filter(|review| review.author == old_email)
        {
            review.author.clone_from(&new_email);
        }
        if self.session.as_deref() == Some(old_email) {
            self.session = Some(new_email);
        }
    }

    /// Adds a booking with the next number and links it to its booker
    pub(crate) fn add_booking(&mut self, mut booking: Booking) -> &Booking {
        booking.number = self.next_booking_number;
        self.next_booking_number = booking.number.next();

        if let Some(User::Consumer(consumer)) = self.users.get_mut(&booking.booker) {
            consumer.bookings.push(booking.number);
        }

        let index = self.bookings.len();
        self.bookings.push(booking);
        &self.bookings[index]
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{BookingStatus, Password};
    use chrono::Duration;

    fn draft(title: &str, start: DateTime<Utc>) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            category: EventCategory::Music,
            ticket_cap: 10,
            price: Money::from_minor(500),
            venue_address: None,
            description: String::new(),
            start,
            end: start + Duration::hours(2),
            tags: EventTagCollection::new(),
        }
    }

    #[test]
    fn event_numbers_are_sequential_from_one() {
        let mut state = TicketingState::new();
        let now = Utc::now();

        let first = state.create_event(draft("A", now)).number;
        let second = state.create_event(draft("B", now)).number;

        assert_eq!(first, EventNumber::new(1));
        assert_eq!(second, EventNumber::new(2));
        assert_eq!(state.next_event_number(), EventNumber::new(3));
        assert_eq!(state.remaining_tickets(first), Some(10));
        assert!(state.find_event_by_key("B", now, now + Duration::hours(2)).is_some());
    }

    #[test]
    fn bookings_link_to_consumer() {
        let mut state = TicketingState::new();
        state.users.insert(
            "c@x.org".to_string(),
            User::Consumer(Consumer {
                email: "c@x.org".to_string(),
                password: Password::new("pw"),
                name: "C".to_string(),
                phone: "1".to_string(),
                address: None,
                preferences: EventTagCollection::new(),
                bookings: vec![],
            }),
        );

        let number = state
            .add_booking(Booking {
                number: BookingNumber::new(0),
                booker: "c@x.org".to_string(),
                event: EventNumber::FIRST,
                tickets: 2,
                created_at: Utc::now(),
                status: BookingStatus::Active,
            })
            .number;

        assert_eq!(number, BookingNumber::FIRST);
        match state.users.get("c@x.org") {
            Some(User::Consumer(consumer)) => assert_eq!(consumer.bookings, vec![number]),
            other => panic!("unexpected user {other:?}"),
        }
    }

    #[test]
    fn session_resolves_capability() {
        let mut state = TicketingState::new();
        state.users.insert(
            "s@x.org".to_string(),
            User::Staff(Staff {
                email: "s@x.org".to_string(),
                password: Password::new("pw"),
            }),
        );
        assert_eq!(state.session_role(), "none");

        state.session = Some("s@x.org".to_string());
        assert!(state.current_staff().is_some());
        assert!(state.current_consumer().is_none());
        assert_eq!(state.session_role(), "staff");
    }
}
