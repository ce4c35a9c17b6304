//! Additive merge of a foreign state into the local one.
//!
//! Every conflict check runs before anything is inserted, so a rejected
//! merge leaves the local state untouched. Numbering is local: foreign
//! events and bookings are renumbered on the way in and bookings are
//! re-pointed at the local number of their event.

use crate::state::{EventDraft, TicketingState};
use crate::types::{Booking, BookingNumber, Event, EventNumber, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// What a merge added
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// New tags
    pub tags: usize,
    /// New accounts
    pub users: usize,
    /// New events
    pub events: usize,
    /// New bookings
    pub bookings: usize,
}

impl MergeSummary {
    /// Returns true if nothing was added
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tags == 0 && self.users == 0 && self.events == 0 && self.bookings == 0
    }
}

/// Why a merge was refused, in check order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeConflict {
    /// Same tag name, different values or default
    #[error("Tag {name} is defined differently")]
    ClashingTags {
        /// Tag name
        name: String,
    },

    /// Same e-mail, different account
    #[error("Account {email} differs")]
    ClashingEmail {
        /// Account e-mail
        email: String,
    },

    /// Same title and times, different event
    #[error("Event {title} at {start} differs")]
    ClashingEvents {
        /// Event title
        title: String,
        /// Event start
        start: DateTime<Utc>,
    },

    /// Same event, booker and timestamp as a local booking
    #[error("Booking by {booker} at {created_at} already exists")]
    ClashingBookings {
        /// Booker e-mail
        booker: String,
        /// Booking timestamp
        created_at: DateTime<Utc>,
    },

    /// Foreign booking names an event the foreign state does not have
    #[error("Booking {booking} refers to unknown event {event}")]
    DanglingBooking {
        /// Foreign booking number
        booking: BookingNumber,
        /// Foreign event number
        event: EventNumber,
    },
}

type EventKey = (String, DateTime<Utc>, DateTime<Utc>);

fn key_of(event: &Event) -> EventKey {
    (event.title.clone(), event.start, event.end)
}

/// Merges `foreign` into `local`.
///
/// # Errors
///
/// Returns the first [`MergeConflict`]; `local` is unchanged in that case.
pub fn merge(local: &mut TicketingState, foreign: TicketingState) -> Result<MergeSummary, MergeConflict> {
    let foreign_keys = check(local, &foreign)?;
    Ok(apply(local, foreign, &foreign_keys))
}

/// Runs every conflict pass and returns the foreign event key per foreign
/// event number
fn check(local: &TicketingState, foreign: &TicketingState) -> Result<BTreeMap<EventNumber, EventKey>, MergeConflict> {
    for (name, tag) in foreign.tags.iter() {
        if local.tags.get(name).is_some_and(|existing| existing != tag) {
            return Err(MergeConflict::ClashingTags { name: name.to_string() });
        }
    }

    for (email, user) in &foreign.users {
        if local.users.get(email).is_some_and(|existing| !existing.same_account(user)) {
            return Err(MergeConflict::ClashingEmail { email: email.clone() });
        }
    }

    for event in &foreign.events {
        if local
            .find_event_by_key(&event.title, event.start, event.end)
            .is_some_and(|existing| !existing.same_as(event))
        {
            return Err(MergeConflict::ClashingEvents {
                title: event.title.clone(),
                start: event.start,
            });
        }
    }

    let foreign_keys: BTreeMap<EventNumber, EventKey> =
        foreign.events.iter().map(|event| (event.number, key_of(event))).collect();

    for booking in &foreign.bookings {
        let Some((title, start, end)) = foreign_keys.get(&booking.event) else {
            continue;
        };
        let Some(local_event) = local.find_event_by_key(title, *start, *end) else {
            continue;
        };
        let clash = local.bookings_for(local_event.number).any(|existing| {
            existing.booker == booking.booker && existing.created_at == booking.created_at
        });
        if clash {
            return Err(MergeConflict::ClashingBookings {
                booker: booking.booker.clone(),
                created_at: booking.created_at,
            });
        }
    }

    if let Some(booking) = foreign
        .bookings
        .iter()
        .find(|booking| !foreign_keys.contains_key(&booking.event))
    {
        return Err(MergeConflict::DanglingBooking {
            booking: booking.number,
            event: booking.event,
        });
    }

    Ok(foreign_keys)
}

fn apply(local: &mut TicketingState, foreign: TicketingState, foreign_keys: &BTreeMap<EventNumber, EventKey>) -> MergeSummary {
    let mut summary = MergeSummary::default();

    for (name, tag) in foreign.tags.iter() {
        if !local.tags.contains(name) {
            local.tags.insert_unchecked(name.to_string(), tag.clone());
            summary.tags += 1;
        }
    }

    for (email, mut user) in foreign.users {
        if local.users.contains_key(&email) {
            continue;
        }
        // Rebuilt below as bookings are renumbered
        if let User::Consumer(consumer) = &mut user {
            consumer.bookings.clear();
        }
        local.users.insert(email, user);
        summary.users += 1;
    }

    for event in foreign.events {
        if local
            .find_event_by_key(&event.title, event.start, event.end)
            .is_some()
        {
            continue;
        }
        let number = local
            .create_event(EventDraft {
                title: event.title,
                category: event.category,
                ticket_cap: event.ticket_cap,
                price: event.price,
                venue_address: event.venue_address,
                description: event.description,
                start: event.start,
                end: event.end,
                tags: event.tags,
            })
            .number;
        // Foreign stock, status and reviews replace the creation defaults
        if let Some(created) = local.find_event_mut(number) {
            created.remaining_tickets = event.remaining_tickets;
            created.status = event.status;
            created.reviews = event
                .reviews
                .into_iter()
                .map(|mut review| {
                    review.event = number;
                    review
                })
                .collect();
        }
        summary.events += 1;
    }

    for booking in foreign.bookings {
        let Some(event) = foreign_keys
            .get(&booking.event)
            .and_then(|(title, start, end)| local.find_event_by_key(title, *start, *end))
            .map(|event| event.number)
        else {
            continue;
        };
        let number = local
            .add_booking(Booking {
                number: BookingNumber::FIRST,
                event,
                ..booking
            })
            .number;
        tracing::debug!(event = %event, booking = %number, "Merged booking");
        summary.bookings += 1;
    }

    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tags::{values, EventTag};
    use crate::types::{BookingStatus, Consumer, EventCategory, Money, Password, Review, Staff};
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 19, 0, 0).unwrap()
    }

    fn draft(title: &str, day: u32) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            category: EventCategory::Dance,
            ticket_cap: 20,
            price: Money::from_minor(1_000),
            venue_address: None,
            description: String::new(),
            start: at(day),
            end: at(day) + Duration::hours(2),
            tags: crate::tags::EventTagCollection::new(),
        }
    }

    fn consumer(email: &str) -> User {
        User::Consumer(Consumer {
            email: email.to_string(),
            password: Password::new("pw"),
            name: "Name".to_string(),
            phone: "1".to_string(),
            address: None,
            preferences: crate::tags::EventTagCollection::new(),
            bookings: vec![],
        })
    }

    fn book(state: &mut TicketingState, email: &str, event: EventNumber, tickets: u32, day: u32) -> BookingNumber {
        state.find_event_mut(event).unwrap().remaining_tickets -= tickets;
        state
            .add_booking(Booking {
                number: BookingNumber::FIRST,
                booker: email.to_string(),
                event,
                tickets,
                created_at: at(day) - Duration::days(10),
                status: BookingStatus::Active,
            })
            .number
    }

    /// Local state with one event and one consumer
    fn local() -> TicketingState {
        let mut state = TicketingState::new();
        state.users.insert("a@x.org".to_string(), consumer("a@x.org"));
        state.create_event(draft("Local", 10));
        state
    }

    /// Foreign state sharing nothing with [`local`]
    fn foreign() -> TicketingState {
        let mut state = TicketingState::new();
        state
            .tags
            .register("outdoor".to_string(), values(["yes", "no"]), "no".to_string())
            .unwrap();
        state.users.insert("b@x.org".to_string(), consumer("b@x.org"));
        state.create_event(draft("Filler", 1));
        let event = state.create_event(draft("Foreign", 12)).number;
        book(&mut state, "b@x.org", event, 3, 12);
        state.find_event_mut(event).unwrap().reviews.push(Review {
            author: "b@x.org".to_string(),
            event,
            created_at: at(20),
            content: "ok".to_string(),
        });
        state
    }

    #[test]
    fn disjoint_merge_is_a_union() {
        let mut state = local();
        let summary = merge(&mut state, foreign()).unwrap();

        assert_eq!(
            summary,
            MergeSummary {
                tags: 1,
                users: 1,
                events: 2,
                bookings: 1
            }
        );
        assert!(state.tags.contains("outdoor"));
        assert_eq!(state.events.len(), 3);

        // Renumbered locally, inventory and reviews carried over
        let merged = state.find_event_by_key("Foreign", at(12), at(12) + Duration::hours(2)).unwrap();
        assert_eq!(merged.number, EventNumber::new(3));
        assert_eq!(merged.remaining_tickets, 17);
        assert_eq!(merged.reviews[0].event, merged.number);

        let booking = &state.bookings[0];
        assert_eq!(booking.event, merged.number);
        assert_eq!(booking.number, BookingNumber::FIRST);
        assert!(matches!(
            state.users.get("b@x.org"),
            Some(User::Consumer(c)) if c.bookings == vec![booking.number]
        ));
    }

    #[test]
    fn imported_event_keeps_foreign_status() {
        let mut foreign = foreign();
        let retired = foreign.create_event(draft("Retired", 14)).number;
        foreign.find_event_mut(retired).unwrap().status = crate::types::EventStatus::Cancelled;
        let mut state = local();

        merge(&mut state, foreign).unwrap();

        let imported = state.find_event_by_key("Retired", at(14), at(14) + Duration::hours(2)).unwrap();
        assert_eq!(imported.status, crate::types::EventStatus::Cancelled);
        assert_eq!(imported.remaining_tickets, 20);
        assert!(imported.reviews.is_empty());
    }

    #[test]
    fn remerging_bookings_clashes_without_changes() {
        let mut state = local();
        merge(&mut state, foreign()).unwrap();
        let before = state.clone();

        let err = merge(&mut state, foreign()).unwrap_err();
        assert_eq!(
            err,
            MergeConflict::ClashingBookings {
                booker: "b@x.org".to_string(),
                created_at: at(2),
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn remerging_without_bookings_is_a_noop() {
        let mut foreign = foreign();
        foreign.bookings.clear();
        let mut state = local();
        merge(&mut state, foreign.clone()).unwrap();
        let before = state.clone();

        let summary = merge(&mut state, foreign).unwrap();

        assert!(summary.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn conflicts_are_checked_in_order() {
        // Tag clash wins over an account clash
        let mut theirs = foreign();
        theirs.tags.insert_unchecked(
            "hasAirFiltration".to_string(),
            EventTag {
                values: values(["true", "false"]),
                default_value: "true".to_string(),
            },
        );
        theirs.users.insert("a@x.org".to_string(), consumer("other@x.org"));
        let mut state = local();
        assert_eq!(
            merge(&mut state, theirs).unwrap_err(),
            MergeConflict::ClashingTags {
                name: "hasAirFiltration".to_string()
            }
        );

        // Same e-mail with a different role
        let mut theirs = foreign();
        theirs.users.insert(
            "a@x.org".to_string(),
            User::Staff(Staff {
                email: "a@x.org".to_string(),
                password: Password::new("pw"),
            }),
        );
        assert_eq!(
            merge(&mut state, theirs).unwrap_err(),
            MergeConflict::ClashingEmail {
                email: "a@x.org".to_string()
            }
        );

        // Same key, different price
        let mut theirs = foreign();
        let mut twin = draft("Local", 10);
        twin.price = Money::from_minor(1);
        theirs.create_event(twin);
        assert_eq!(
            merge(&mut state, theirs).unwrap_err(),
            MergeConflict::ClashingEvents {
                title: "Local".to_string(),
                start: at(10),
            }
        );

        assert_eq!(state, local());
    }

    #[test]
    fn accounts_equal_except_bookings_do_not_clash() {
        let mut state = local();
        let event = EventNumber::FIRST;
        book(&mut state, "a@x.org", event, 1, 10);

        let mut theirs = TicketingState::new();
        theirs.users.insert("a@x.org".to_string(), consumer("a@x.org"));

        let summary = merge(&mut state, theirs).unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn booking_for_missing_event_is_dangling() {
        let mut theirs = foreign();
        theirs.bookings[0].event = EventNumber::new(77);
        let mut state = local();

        let err = merge(&mut state, theirs).unwrap_err();
        assert!(matches!(err, MergeConflict::DanglingBooking { .. }));
        assert_eq!(state, local());
    }

    #[test]
    fn session_is_never_imported() {
        let mut theirs = foreign();
        theirs.session = Some("b@x.org".to_string());
        let mut state = local();

        merge(&mut state, theirs).unwrap();

        assert_eq!(state.session, None);
    }
}
