//! Booking ledger operations.
//!
//! Booking takes tickets out of an event's stock and cancelling by the
//! booker puts them back. Provider cancellation lives with the event
//! operations and never restores stock.

use crate::environment::TicketingEnvironment;
use crate::state::TicketingState;
use crate::types::{Booking, BookingNumber, BookingStatus, EventNumber};
use chrono::{DateTime, Utc};
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

// ============================================================================
// BookEvent
// ============================================================================

/// Books tickets for the logged-in consumer
#[derive(Debug, Clone, Copy)]
pub struct BookEvent {
    /// Event to book
    pub event_number: EventNumber,
    /// Requested quantity
    pub tickets: u32,
}

/// Why a booking was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookEventError {
    /// Logged-in user is not a consumer
    #[error("Only consumers can book events (current user: {role})")]
    NotConsumer {
        /// Role of the session user
        role: &'static str,
    },

    /// No such event
    #[error("Event {event_number} not found")]
    EventNotFound {
        /// Requested event
        event_number: EventNumber,
    },

    /// Quantity below one
    #[error("Cannot book {tickets} tickets")]
    InvalidQuantity {
        /// Requested quantity
        tickets: u32,
    },

    /// Event was cancelled
    #[error("Event {event_number} is not active")]
    EventNotActive {
        /// Requested event
        event_number: EventNumber,
    },

    /// Event has ended
    #[error("Event {event_number} ended at {end}")]
    EventAlreadyOver {
        /// Requested event
        event_number: EventNumber,
        /// Event end
        end: DateTime<Utc>,
    },

    /// Not enough stock
    #[error("Requested {requested} tickets but only {remaining} left")]
    NotEnoughTicketsLeft {
        /// Requested quantity
        requested: u32,
        /// Current stock
        remaining: u32,
    },
}

impl Rejection for BookEventError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConsumer { .. } => "BOOK_EVENT_USER_NOT_CONSUMER",
            Self::EventNotFound { .. } => "BOOK_EVENT_EVENT_NOT_FOUND",
            Self::InvalidQuantity { .. } => "BOOK_EVENT_INVALID_NUM_TICKETS",
            Self::EventNotActive { .. } => "BOOK_EVENT_EVENT_NOT_ACTIVE",
            Self::EventAlreadyOver { .. } => "BOOK_EVENT_ALREADY_OVER",
            Self::NotEnoughTicketsLeft { .. } => "BOOK_EVENT_NOT_ENOUGH_TICKETS_LEFT",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotConsumer { role } => Context::new().with("currentUser", *role),
            Self::EventNotFound { event_number } | Self::EventNotActive { event_number } => {
                Context::new().with("eventNumber", event_number.get())
            }
            Self::InvalidQuantity { tickets } => Context::new().with("numTicketsRequested", *tickets),
            Self::EventAlreadyOver { event_number, end } => Context::new()
                .with("eventNumber", event_number.get())
                .with("end", end.to_rfc3339()),
            Self::NotEnoughTicketsLeft { requested, remaining } => Context::new()
                .with("numTicketsRequested", *requested)
                .with("numTicketsLeft", *remaining),
        }
    }
}

impl Operation for BookEvent {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Booking;
    type Error = BookEventError;

    const NAME: &'static str = "BookEvent";

    fn execute(self, state: &mut TicketingState, env: &TicketingEnvironment) -> Result<Applied<Booking>, BookEventError> {
        let booker = state
            .current_consumer()
            .map(|consumer| consumer.email.clone())
            .ok_or_else(|| BookEventError::NotConsumer {
                role: state.session_role(),
            })?;
        let event_number = self.event_number;
        let event = state
            .find_event(event_number)
            .ok_or(BookEventError::EventNotFound { event_number })?;
        if self.tickets < 1 {
            return Err(BookEventError::InvalidQuantity { tickets: self.tickets });
        }
        if !event.is_active() {
            return Err(BookEventError::EventNotActive { event_number });
        }
        let now = env.now();
        if now >= event.end {
            return Err(BookEventError::EventAlreadyOver {
                event_number,
                end: event.end,
            });
        }
        if self.tickets > event.remaining_tickets {
            return Err(BookEventError::NotEnoughTicketsLeft {
                requested: self.tickets,
                remaining: event.remaining_tickets,
            });
        }

        let mut remaining = 0;
        if let Some(event) = state.find_event_mut(event_number) {
            event.remaining_tickets -= self.tickets;
            remaining = event.remaining_tickets;
        }
        let booking = state
            .add_booking(Booking {
                number: BookingNumber::FIRST,
                booker,
                event: event_number,
                tickets: self.tickets,
                created_at: now,
                status: BookingStatus::Active,
            })
            .clone();

        let report = Report::new(
            "BOOK_EVENT_SUCCESS",
            Context::new()
                .with("bookingNumber", booking.number.get())
                .with("eventNumber", event_number.get())
                .with("booker", booking.booker.as_str())
                .with("numTickets", booking.tickets)
                .with("numTicketsLeft", remaining),
        );
        Ok(Applied::new(booking, report))
    }
}

// ============================================================================
// CancelBooking
// ============================================================================

/// Cancels one of the logged-in consumer's bookings and restores stock
#[derive(Debug, Clone, Copy)]
pub struct CancelBooking {
    /// Booking to cancel
    pub booking_number: BookingNumber,
}

/// Why a cancellation was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelBookingError {
    /// Logged-in user is not a consumer
    #[error("Only consumers can cancel bookings (current user: {role})")]
    NotConsumer {
        /// Role of the session user
        role: &'static str,
    },

    /// No such booking
    #[error("Booking {booking_number} not found")]
    BookingNotFound {
        /// Requested booking
        booking_number: BookingNumber,
    },

    /// Booking belongs to someone else
    #[error("Booking {booking_number} belongs to another consumer")]
    NotBooker {
        /// Requested booking
        booking_number: BookingNumber,
    },

    /// Booking already cancelled
    #[error("Booking {booking_number} is not active")]
    NotActive {
        /// Requested booking
        booking_number: BookingNumber,
    },

    /// Event starts too soon
    #[error("Event starts at {start}, within the {window_hours}h cancellation window")]
    WithinCancellationWindow {
        /// Event start
        start: DateTime<Utc>,
        /// Configured window
        window_hours: i64,
    },
}

impl Rejection for CancelBookingError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConsumer { .. } => "CANCEL_BOOKING_USER_NOT_CONSUMER",
            Self::BookingNotFound { .. } => "CANCEL_BOOKING_BOOKING_NOT_FOUND",
            Self::NotBooker { .. } => "CANCEL_BOOKING_USER_IS_NOT_BOOKER",
            Self::NotActive { .. } => "CANCEL_BOOKING_BOOKING_NOT_ACTIVE",
            Self::WithinCancellationWindow { .. } => "CANCEL_BOOKING_WITHIN_CANCELLATION_WINDOW",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotConsumer { role } => Context::new().with("currentUser", *role),
            Self::BookingNotFound { booking_number }
            | Self::NotBooker { booking_number }
            | Self::NotActive { booking_number } => Context::new().with("bookingNumber", booking_number.get()),
            Self::WithinCancellationWindow { start, window_hours } => Context::new()
                .with("eventStart", start.to_rfc3339())
                .with("windowHours", *window_hours),
        }
    }
}

impl Operation for CancelBooking {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Booking;
    type Error = CancelBookingError;

    const NAME: &'static str = "CancelBooking";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<Booking>, CancelBookingError> {
        let consumer = state.current_consumer().ok_or_else(|| CancelBookingError::NotConsumer {
            role: state.session_role(),
        })?;
        let booking_number = self.booking_number;
        let booking = state
            .find_booking(booking_number)
            .ok_or(CancelBookingError::BookingNotFound { booking_number })?;
        if booking.booker != consumer.email {
            return Err(CancelBookingError::NotBooker { booking_number });
        }
        if !booking.is_active() {
            return Err(CancelBookingError::NotActive { booking_number });
        }
        let window = env.policy.cancellation_window;
        if let Some(start) = state.find_event(booking.event).map(|event| event.start) {
            if start - env.now() <= window {
                return Err(CancelBookingError::WithinCancellationWindow {
                    start,
                    window_hours: window.num_hours(),
                });
            }
        }
        let (event_number, tickets) = (booking.event, booking.tickets);

        let mut cancelled = None;
        if let Some(booking) = state.find_booking_mut(booking_number) {
            booking.status = BookingStatus::CancelledByConsumer;
            cancelled = Some(booking.clone());
        }
        let mut remaining = 0;
        if let Some(event) = state.find_event_mut(event_number) {
            event.remaining_tickets = event.remaining_tickets.saturating_add(tickets).min(event.ticket_cap);
            remaining = event.remaining_tickets;
        }
        let Some(booking) = cancelled else {
            return Err(CancelBookingError::BookingNotFound { booking_number });
        };

        let report = Report::new(
            "CANCEL_BOOKING_SUCCESS",
            Context::new()
                .with("bookingNumber", booking_number.get())
                .with("eventNumber", event_number.get())
                .with("numTicketsReturned", tickets)
                .with("numTicketsLeft", remaining),
        );
        Ok(Applied::new(booking, report))
    }
}
