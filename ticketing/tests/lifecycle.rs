//! End-to-end booking lifecycle through the Store.
//!
//! Every test drives a real `TicketingStore` with a mock clock and recording
//! observers, the way a front end would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use std::sync::Arc;
use ticketbook_core::environment::Clock;
use ticketbook_core::outcome::Rejection;
use ticketbook_testing::assertions::{assert_last_failure, assert_nothing_reported};
use ticketbook_testing::{init_test_tracing, test_clock, MockClock, RecordingNotifier, RecordingSink};
use ticketing::mapping::OfflineMap;
use ticketing::operations::{
    BookEvent, CancelBooking, CancelEvent, CreateEvent, ListEvents, Login, Logout, RegisterConsumer, RegisterStaff,
    UpdateConsumerProfile,
};
use ticketing::snapshot::MemorySnapshotStore;
use ticketing::types::Password;
use ticketing::{
    BookingStatus, EventCategory, EventNumber, EventStatus, EventTagCollection, Policy, TicketingEnvironment,
    TicketingState, TicketingStore,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const STAFF: &str = "organiser@example.org";

struct Harness {
    store: TicketingStore,
    clock: Arc<MockClock>,
    sink: Arc<RecordingSink>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        init_test_tracing();
        let clock = Arc::new(MockClock::new(test_clock().now()));
        let environment = TicketingEnvironment::new(
            clock.clone(),
            Arc::new(OfflineMap::default()),
            Arc::new(MemorySnapshotStore::new()),
        );
        let sink = Arc::new(RecordingSink::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let store = TicketingStore::with_observers(TicketingState::new(), environment, sink.clone(), notifier.clone());
        Self {
            store,
            clock,
            sink,
            notifier,
        }
    }

    async fn as_staff(&self) {
        self.store.send(Logout).await.unwrap();
        let registered = self.store.state(|s| s.users.contains_key(STAFF)).await;
        if registered {
            self.store
                .send(Login {
                    email: STAFF.to_string(),
                    password: "pw".to_string(),
                })
                .await
                .unwrap();
        } else {
            self.store
                .send(RegisterStaff {
                    email: STAFF.to_string(),
                    password: Password::new("pw"),
                    secret: Policy::default().staff_secret,
                })
                .await
                .unwrap();
        }
    }

    async fn as_consumer(&self, email: &str) {
        self.store.send(Logout).await.unwrap();
        let registered = self.store.state(|s| s.users.contains_key(email)).await;
        if registered {
            self.store
                .send(Login {
                    email: email.to_string(),
                    password: "pw".to_string(),
                })
                .await
                .unwrap();
        } else {
            self.store
                .send(RegisterConsumer {
                    name: "Consumer".to_string(),
                    email: email.to_string(),
                    phone: "0131 496 0000".to_string(),
                    address: None,
                    password: Password::new("pw"),
                })
                .await
                .unwrap();
        }
    }

    async fn create_event(&self, hours_ahead: i64, cap: u32) -> EventNumber {
        self.as_staff().await;
        let start = self.clock.now() + Duration::hours(hours_ahead);
        self.store
            .send(CreateEvent {
                title: format!("Show in {hours_ahead}h"),
                category: EventCategory::Theatre,
                ticket_cap: cap,
                price_minor: 2_500,
                venue_address: None,
                description: String::new(),
                start,
                end: start + Duration::hours(2),
                tags: EventTagCollection::new(),
            })
            .await
            .unwrap()
            .number
    }

    async fn remaining(&self, event: EventNumber) -> u32 {
        self.store.state(|s| s.remaining_tickets(event)).await.unwrap()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn sold_out_event_runs_its_course() {
    let h = Harness::new();
    let event = h.create_event(2, 1).await;
    h.as_consumer("alice@example.org").await;

    let booking = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 1,
        })
        .await
        .unwrap();
    assert_eq!(h.remaining(event).await, 0);

    let err = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 1,
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejection().unwrap().code(), "BOOK_EVENT_NOT_ENOUGH_TICKETS_LEFT");

    let err = h
        .store
        .send(CancelBooking {
            booking_number: booking.number,
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejection().unwrap().code(), "CANCEL_BOOKING_WITHIN_CANCELLATION_WINDOW");

    h.clock.advance(Duration::hours(5));
    let err = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 1,
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejection().unwrap().code(), "BOOK_EVENT_ALREADY_OVER");
    assert_last_failure(&h.sink, "BOOK_EVENT_ALREADY_OVER");

    // Each call produced exactly one terminal outcome
    let failures: Vec<_> = h.sink.failures().into_iter().map(|r| r.outcome).collect();
    assert_eq!(
        failures,
        vec![
            "BOOK_EVENT_NOT_ENOUGH_TICKETS_LEFT",
            "CANCEL_BOOKING_WITHIN_CANCELLATION_WINDOW",
            "BOOK_EVENT_ALREADY_OVER",
        ]
    );
    assert_eq!(h.remaining(event).await, 0);
}

#[tokio::test]
async fn cancellation_window_boundary() {
    let h = Harness::new();
    let soon = h.create_event(12, 10).await;
    let later = h.create_event(48, 10).await;
    h.as_consumer("alice@example.org").await;

    for (event, expected_ok) in [(soon, false), (later, true)] {
        let booking = h
            .store
            .send(BookEvent {
                event_number: event,
                tickets: 3,
            })
            .await
            .unwrap();
        let result = h
            .store
            .send(CancelBooking {
                booking_number: booking.number,
            })
            .await;
        assert_eq!(result.is_ok(), expected_ok, "event {event}");
    }

    assert_eq!(h.remaining(soon).await, 7);
    assert_eq!(h.remaining(later).await, 10);
}

#[tokio::test]
async fn provider_cancellation_refunds_without_restocking() {
    let h = Harness::new();
    let event = h.create_event(72, 10).await;

    h.as_consumer("alice@example.org").await;
    let kept = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 4,
        })
        .await
        .unwrap();

    h.as_consumer("bob@example.org").await;
    let dropped = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 2,
        })
        .await
        .unwrap();
    h.store
        .send(CancelBooking {
            booking_number: dropped.number,
        })
        .await
        .unwrap();
    // Consumer cancellation puts tickets back
    assert_eq!(h.remaining(event).await, 6);

    h.as_staff().await;
    h.sink.clear();
    let cancelled = h
        .store
        .send(CancelEvent {
            event_number: event,
            reason: "Venue flooded".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(cancelled.refunded, vec![kept.number]);
    assert_eq!(h.remaining(event).await, 6);
    let (event_status, kept_status, dropped_status) = h
        .store
        .state(|s| {
            (
                s.find_event(event).unwrap().status,
                s.find_booking(kept.number).unwrap().status,
                s.find_booking(dropped.number).unwrap().status,
            )
        })
        .await;
    assert_eq!(event_status, EventStatus::Cancelled);
    assert_eq!(kept_status, BookingStatus::CancelledByProvider);
    assert_eq!(dropped_status, BookingStatus::CancelledByConsumer);

    assert_eq!(
        h.sink.outcomes(),
        vec!["CANCEL_EVENT_REFUND_BOOKING_SUCCESS", "CANCEL_EVENT_SUCCESS"]
    );
    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].recipient, "alice@example.org");
    assert_eq!(notices[0].contact.as_deref(), Some("0131 496 0000"));
    assert!(notices[0].message.contains("Venue flooded"));

    // A retired event cannot be booked
    h.as_consumer("alice@example.org").await;
    let err = h
        .store
        .send(BookEvent {
            event_number: event,
            tickets: 1,
        })
        .await
        .unwrap_err();
    assert_eq!(err.rejection().unwrap().code(), "BOOK_EVENT_EVENT_NOT_ACTIVE");
}

#[tokio::test]
async fn undeclared_tag_matches_only_its_default() {
    let h = Harness::new();
    let event = h.create_event(24, 10).await;
    h.as_consumer("alice@example.org").await;

    for (preference, listed) in [("false", true), ("true", false)] {
        h.store
            .send(UpdateConsumerProfile {
                old_password: "pw".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.org".to_string(),
                phone: "0131 496 0000".to_string(),
                address: None,
                new_password: Password::new("pw"),
                preferences: EventTagCollection::new().with("hasAirFiltration", preference),
            })
            .await
            .unwrap();

        let events = h
            .store
            .send(ListEvents {
                user_events_only: true,
                active_only: true,
                on_date: None,
            })
            .await
            .unwrap();
        let numbers: Vec<EventNumber> = events.iter().map(|e| e.number).collect();
        let expected = if listed { vec![event] } else { vec![] };
        assert_eq!(numbers, expected, "preference {preference}");
    }
}

#[tokio::test]
async fn shutdown_stops_new_operations() {
    let h = Harness::new();
    h.store.shutdown();

    let err = h.store.send(Logout).await.unwrap_err();

    assert!(err.rejection().is_none());
    assert_nothing_reported(&h.sink);
}
