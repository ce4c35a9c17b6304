//! Event catalog operations: creation and provider cancellation.

use super::{check_address, is_blank, normalize_address, AddressFault};
use crate::environment::TicketingEnvironment;
use crate::state::{EventDraft, TicketingState};
use crate::tags::EventTagCollection;
use crate::types::{BookingNumber, BookingStatus, Event, EventCategory, EventNumber, EventStatus, Money, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use ticketbook_core::effect::{Effect, Notice};
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

// ============================================================================
// CreateEvent
// ============================================================================

/// Publishes a new event
#[derive(Debug, Clone)]
pub struct CreateEvent {
    /// Title
    pub title: String,
    /// Category
    pub category: EventCategory,
    /// Tickets on sale
    pub ticket_cap: u32,
    /// Price per ticket in minor units; negative prices are rejected
    pub price_minor: i64,
    /// Venue "lat lng", blank for none
    pub venue_address: Option<String>,
    /// Free text
    pub description: String,
    /// Start time, must be in the future
    pub start: DateTime<Utc>,
    /// End time, must be after `start`
    pub end: DateTime<Utc>,
    /// Declared tags
    pub tags: EventTagCollection,
}

/// Why an event could not be created
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateEventError {
    /// Logged-in user is not staff
    #[error("Only staff can create events (current user: {role})")]
    NotStaff {
        /// Role of the session user
        role: &'static str,
    },

    /// Start is not before end
    #[error("Event starts at {start} but ends at {end}")]
    StartAfterEnd {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },

    /// Start is not in the future
    #[error("Event start {start} is not after {now}")]
    InThePast {
        /// Requested start
        start: DateTime<Utc>,
        /// Time of the request
        now: DateTime<Utc>,
    },

    /// Same title and times as an existing event
    #[error("Event {existing} already has this title and time")]
    TitleAndTimeClash {
        /// Clashing event
        existing: EventNumber,
    },

    /// Venue is not a "lat lng" pair
    #[error("Venue address {address} is not a \"lat lng\" pair")]
    InvalidAddress {
        /// Rejected address
        address: String,
    },

    /// Venue is outside the map
    #[error("Venue address {address} is outside the map")]
    AddressOutOfBounds {
        /// Rejected address
        address: String,
    },

    /// Price below zero
    #[error("Ticket price {price_minor} is negative")]
    NegativePrice {
        /// Requested price
        price_minor: i64,
    },

    /// A tag is unknown or has a value outside its set
    #[error("Tag {name}={value} does not match the registry")]
    TagsDoNotMatch {
        /// Tag name
        name: String,
        /// Selected value
        value: String,
    },
}

impl Rejection for CreateEventError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStaff { .. } => "CREATE_EVENT_USER_NOT_STAFF",
            Self::StartAfterEnd { .. } => "CREATE_EVENT_START_AFTER_END",
            Self::InThePast { .. } => "CREATE_EVENT_IN_THE_PAST",
            Self::TitleAndTimeClash { .. } => "CREATE_EVENT_TITLE_AND_TIME_CLASH",
            Self::InvalidAddress { .. } => "CREATE_EVENT_INVALID_ADDRESS",
            Self::AddressOutOfBounds { .. } => "CREATE_EVENT_ADDRESS_OUT_OF_BOUNDS",
            Self::NegativePrice { .. } => "CREATE_EVENT_NEGATIVE_TICKET_PRICE",
            Self::TagsDoNotMatch { .. } => "CREATE_EVENT_TAGS_DO_NOT_MATCH",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotStaff { role } => Context::new().with("currentUser", *role),
            Self::StartAfterEnd { start, end } => Context::new()
                .with("start", start.to_rfc3339())
                .with("end", end.to_rfc3339()),
            Self::InThePast { start, now } => Context::new()
                .with("start", start.to_rfc3339())
                .with("now", now.to_rfc3339()),
            Self::TitleAndTimeClash { existing } => Context::new().with("eventNumber", existing.get()),
            Self::InvalidAddress { address } | Self::AddressOutOfBounds { address } => {
                Context::new().with("venueAddress", address.as_str())
            }
            Self::NegativePrice { price_minor } => Context::new().with("ticketPrice", *price_minor),
            Self::TagsDoNotMatch { name, value } => {
                Context::new().with("tag", name.as_str()).with("value", value.as_str())
            }
        }
    }
}

impl Operation for CreateEvent {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Event;
    type Error = CreateEventError;

    const NAME: &'static str = "CreateEvent";

    fn execute(self, state: &mut TicketingState, env: &TicketingEnvironment) -> Result<Applied<Event>, CreateEventError> {
        if state.current_staff().is_none() {
            return Err(CreateEventError::NotStaff {
                role: state.session_role(),
            });
        }
        if self.start >= self.end {
            return Err(CreateEventError::StartAfterEnd {
                start: self.start,
                end: self.end,
            });
        }
        let now = env.now();
        if self.start <= now {
            return Err(CreateEventError::InThePast { start: self.start, now });
        }
        if let Some(existing) = state.find_event_by_key(&self.title, self.start, self.end) {
            return Err(CreateEventError::TitleAndTimeClash {
                existing: existing.number,
            });
        }
        let venue_address = normalize_address(self.venue_address);
        if let Some(address) = &venue_address {
            match check_address(env.map.as_ref(), address) {
                Ok(()) => {}
                Err(AddressFault::Invalid) => {
                    return Err(CreateEventError::InvalidAddress {
                        address: address.clone(),
                    });
                }
                Err(AddressFault::OutOfBounds) => {
                    return Err(CreateEventError::AddressOutOfBounds {
                        address: address.clone(),
                    });
                }
            }
        }
        let Ok(price) = u64::try_from(self.price_minor) else {
            return Err(CreateEventError::NegativePrice {
                price_minor: self.price_minor,
            });
        };
        if let Some((name, value)) = state.tags.first_invalid(&self.tags) {
            return Err(CreateEventError::TagsDoNotMatch {
                name: name.to_string(),
                value: value.to_string(),
            });
        }

        let event = state
            .create_event(EventDraft {
                title: self.title,
                category: self.category,
                ticket_cap: self.ticket_cap,
                price: Money::from_minor(price),
                venue_address,
                description: self.description,
                start: self.start,
                end: self.end,
                tags: self.tags,
            })
            .clone();

        let report = Report::new(
            "CREATE_EVENT_SUCCESS",
            Context::new()
                .with("eventNumber", event.number.get())
                .with("title", event.title.as_str())
                .with("category", event.category.to_string())
                .with("ticketCap", event.ticket_cap)
                .with("ticketPrice", event.price.minor())
                .with("start", event.start.to_rfc3339())
                .with("end", event.end.to_rfc3339())
                .with("tags", event.tags.to_string()),
        );
        Ok(Applied::new(event, report))
    }
}

// ============================================================================
// CancelEvent
// ============================================================================

/// Cancels a future event and refunds every active booking.
///
/// Refunded tickets are not returned to the event's stock: the event is
/// retired.
#[derive(Debug, Clone)]
pub struct CancelEvent {
    /// Event to cancel
    pub event_number: EventNumber,
    /// Message passed on to every booker
    pub reason: String,
}

/// Result of a provider cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelledEvent {
    /// Cancelled event
    pub event: EventNumber,
    /// Bookings moved to `CancelledByProvider`, in ledger order
    pub refunded: Vec<BookingNumber>,
}

/// Why an event could not be cancelled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelEventError {
    /// Logged-in user is not staff
    #[error("Only staff can cancel events (current user: {role})")]
    NotStaff {
        /// Role of the session user
        role: &'static str,
    },

    /// No reason given
    #[error("A cancellation reason is required")]
    BlankReason,

    /// No such event
    #[error("Event {event_number} not found")]
    EventNotFound {
        /// Requested event
        event_number: EventNumber,
    },

    /// Already cancelled
    #[error("Event {event_number} is not active")]
    EventNotActive {
        /// Requested event
        event_number: EventNumber,
    },

    /// Event has started
    #[error("Event {event_number} started at {start}")]
    AlreadyStarted {
        /// Requested event
        event_number: EventNumber,
        /// Event start
        start: DateTime<Utc>,
    },
}

impl Rejection for CancelEventError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStaff { .. } => "CANCEL_EVENT_USER_NOT_STAFF",
            Self::BlankReason => "CANCEL_EVENT_MESSAGE_MUST_NOT_BE_BLANK",
            Self::EventNotFound { .. } => "CANCEL_EVENT_EVENT_NOT_FOUND",
            Self::EventNotActive { .. } => "CANCEL_EVENT_NOT_ACTIVE",
            Self::AlreadyStarted { .. } => "CANCEL_EVENT_ALREADY_STARTED",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotStaff { role } => Context::new().with("currentUser", *role),
            Self::BlankReason => Context::new(),
            Self::EventNotFound { event_number } | Self::EventNotActive { event_number } => {
                Context::new().with("eventNumber", event_number.get())
            }
            Self::AlreadyStarted { event_number, start } => Context::new()
                .with("eventNumber", event_number.get())
                .with("start", start.to_rfc3339()),
        }
    }
}

impl Operation for CancelEvent {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = CancelledEvent;
    type Error = CancelEventError;

    const NAME: &'static str = "CancelEvent";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<CancelledEvent>, CancelEventError> {
        if state.current_staff().is_none() {
            return Err(CancelEventError::NotStaff {
                role: state.session_role(),
            });
        }
        if is_blank(&self.reason) {
            return Err(CancelEventError::BlankReason);
        }
        let event_number = self.event_number;
        let event = state
            .find_event(event_number)
            .ok_or(CancelEventError::EventNotFound { event_number })?;
        if !event.is_active() {
            return Err(CancelEventError::EventNotActive { event_number });
        }
        if env.now() >= event.start {
            return Err(CancelEventError::AlreadyStarted {
                event_number,
                start: event.start,
            });
        }
        let title = event.title.clone();

        // Collect refunds first; the ledger is only touched below
        let refunds: Vec<(BookingNumber, String, u32, Option<String>)> = state
            .bookings_for(event_number)
            .filter(|booking| booking.is_active())
            .map(|booking| {
                let phone = match state.users.get(&booking.booker) {
                    Some(User::Consumer(consumer)) => Some(consumer.phone.clone()),
                    _ => None,
                };
                (booking.number, booking.booker.clone(), booking.tickets, phone)
            })
            .collect();

        let mut effects = Vec::with_capacity(refunds.len() * 2);
        for (number, booker, tickets, phone) in &refunds {
            if let Some(booking) = state.find_booking_mut(*number) {
                booking.status = BookingStatus::CancelledByProvider;
            }
            effects.push(Effect::Report(Report::new(
                "CANCEL_EVENT_REFUND_BOOKING_SUCCESS",
                Context::new()
                    .with("bookingNumber", number.get())
                    .with("booker", booker.as_str())
                    .with("tickets", *tickets)
                    .with("reason", self.reason.as_str()),
            )));
            let mut notice = Notice::new(
                booker.as_str(),
                format!(
                    "Event \"{title}\" has been cancelled: {}. Booking {number} for {tickets} ticket(s) has been refunded.",
                    self.reason
                ),
            );
            if let Some(phone) = phone {
                notice = notice.with_contact(phone.as_str());
            }
            effects.push(Effect::Notify(notice));
        }
        if let Some(event) = state.find_event_mut(event_number) {
            event.status = EventStatus::Cancelled;
        }

        tracing::debug!(event = %event_number, refunds = refunds.len(), "Event cancelled");

        let output = CancelledEvent {
            event: event_number,
            refunded: refunds.iter().map(|(number, ..)| *number).collect(),
        };
        let report = Report::new(
            "CANCEL_EVENT_SUCCESS",
            Context::new()
                .with("eventNumber", event_number.get())
                .with("reason", self.reason.as_str())
                .with_serialized("refunded", &output.refunded),
        );
        Ok(Applied::new(output, report).with_effects(effects))
    }
}
