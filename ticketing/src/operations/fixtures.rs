//! Shared setup for operation tests.

use crate::environment::TicketingEnvironment;
use crate::mapping::OfflineMap;
use crate::snapshot::MemorySnapshotStore;
use crate::state::{EventDraft, TicketingState};
use crate::tags::EventTagCollection;
use crate::types::{Consumer, EventCategory, EventNumber, Money, Password, Staff, User};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticketbook_core::environment::Clock;
use ticketbook_testing::{test_clock, MockClock};

pub const STAFF: &str = "boss@x.org";
pub const ALICE: &str = "alice@x.org";
pub const BOB: &str = "bob@x.org";

/// Usher Hall, Edinburgh
pub const VENUE: &str = "55.9469 -3.2058";
/// Edinburgh Castle
pub const HOME: &str = "55.9486 -3.1999";

pub fn now() -> DateTime<Utc> {
    test_clock().now()
}

pub fn clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(now()))
}

pub fn env(clock: &Arc<MockClock>) -> TicketingEnvironment {
    TicketingEnvironment::new(
        clock.clone(),
        Arc::new(OfflineMap::default()),
        Arc::new(MemorySnapshotStore::new()),
    )
}

pub fn staff(email: &str) -> User {
    User::Staff(Staff {
        email: email.to_string(),
        password: Password::new("pw"),
    })
}

pub fn consumer(email: &str, address: Option<&str>) -> User {
    User::Consumer(Consumer {
        email: email.to_string(),
        password: Password::new("pw"),
        name: email.split('@').next().unwrap_or_default().to_string(),
        phone: "0131 000 0000".to_string(),
        address: address.map(str::to_string),
        preferences: EventTagCollection::new(),
        bookings: Vec::new(),
    })
}

/// Staff, Alice (with a home address) and Bob (without), nobody logged in
pub fn populated() -> TicketingState {
    let mut state = TicketingState::new();
    for user in [staff(STAFF), consumer(ALICE, Some(HOME)), consumer(BOB, None)] {
        state.users.insert(user.email().to_string(), user);
    }
    state
}

pub fn login(state: &mut TicketingState, email: &str) {
    state.session = Some(email.to_string());
}

pub fn draft(title: &str, start: DateTime<Utc>, cap: u32) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        category: EventCategory::Music,
        ticket_cap: cap,
        price: Money::from_minor(2_000),
        venue_address: Some(VENUE.to_string()),
        description: String::new(),
        start,
        end: start + Duration::hours(3),
        tags: EventTagCollection::new(),
    }
}

/// Adds an event starting `hours` after [`now`]
pub fn event_in(state: &mut TicketingState, title: &str, hours: i64, cap: u32) -> EventNumber {
    state.create_event(draft(title, now() + Duration::hours(hours), cap)).number
}
