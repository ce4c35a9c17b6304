//! Reviews of concluded events.

use crate::environment::TicketingEnvironment;
use crate::state::TicketingState;
use crate::types::{BookingStatus, EventNumber, Review};
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

/// Appends a review to a finished event
#[derive(Debug, Clone)]
pub struct ReviewEvent {
    /// Reviewed event
    pub event_number: EventNumber,
    /// Review text
    pub content: String,
}

/// Why a review was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewEventError {
    /// No such event
    #[error("Event {event_number} not found")]
    EventNotFound {
        /// Requested event
        event_number: EventNumber,
    },

    /// Event has not ended yet
    #[error("Event {event_number} ends at {end}")]
    NotOver {
        /// Requested event
        event_number: EventNumber,
        /// Event end
        end: DateTime<Utc>,
    },

    /// Logged-in user is not a consumer
    #[error("Only consumers can review events (current user: {role})")]
    NotConsumer {
        /// Role of the session user
        role: &'static str,
    },

    /// Consumer holds no booking that entitles a review
    #[error("{consumer} has no valid booking for event {event_number}")]
    NoValidBooking {
        /// Reviewer
        consumer: String,
        /// Requested event
        event_number: EventNumber,
    },
}

impl Rejection for ReviewEventError {
    fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound { .. } => "REVIEW_EVENT_EVENT_NOT_FOUND",
            Self::NotOver { .. } => "REVIEW_EVENT_NOT_OVER",
            Self::NotConsumer { .. } => "REVIEW_EVENT_USER_NOT_CONSUMER",
            Self::NoValidBooking { .. } => "REVIEW_EVENT_CONSUMER_HAS_NO_VALID_BOOKING",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::EventNotFound { event_number } => Context::new().with("eventNumber", event_number.get()),
            Self::NotOver { event_number, end } => Context::new()
                .with("eventNumber", event_number.get())
                .with("end", end.to_rfc3339()),
            Self::NotConsumer { role } => Context::new().with("currentUser", *role),
            Self::NoValidBooking { consumer, event_number } => Context::new()
                .with("consumer", consumer.as_str())
                .with("eventNumber", event_number.get()),
        }
    }
}

impl Operation for ReviewEvent {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Review;
    type Error = ReviewEventError;

    const NAME: &'static str = "ReviewEvent";

    fn execute(self, state: &mut TicketingState, env: &TicketingEnvironment) -> Result<Applied<Review>, ReviewEventError> {
        let event_number = self.event_number;
        let event = state
            .find_event(event_number)
            .ok_or(ReviewEventError::EventNotFound { event_number })?;
        let now = env.now();
        if now < event.end {
            return Err(ReviewEventError::NotOver {
                event_number,
                end: event.end,
            });
        }
        let consumer = state.current_consumer().ok_or_else(|| ReviewEventError::NotConsumer {
            role: state.session_role(),
        })?;
        // Provider refunds still count as attended
        let entitled = state
            .bookings_for(event_number)
            .any(|booking| booking.booker == consumer.email && booking.status != BookingStatus::CancelledByConsumer);
        if !entitled {
            return Err(ReviewEventError::NoValidBooking {
                consumer: consumer.email.clone(),
                event_number,
            });
        }

        let review = Review {
            author: consumer.email.clone(),
            event: event_number,
            created_at: now,
            content: self.content,
        };
        if let Some(event) = state.find_event_mut(event_number) {
            event.reviews.push(review.clone());
        }

        let report = Report::new(
            "REVIEW_EVENT_SUCCESS",
            Context::new()
                .with("eventNumber", event_number.get())
                .with("author", review.author.as_str()),
        );
        Ok(Applied::new(review, report))
    }
}

/// Every review of every event with the given title, in catalog order
#[derive(Debug, Clone)]
pub struct ListReviews {
    /// Event title, matched exactly
    pub title: String,
}

impl Operation for ListReviews {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Vec<Review>;
    type Error = Infallible;

    const NAME: &'static str = "ListEventReviews";

    fn execute(self, state: &mut TicketingState, _env: &TicketingEnvironment) -> Result<Applied<Vec<Review>>, Infallible> {
        let reviews: Vec<Review> = state
            .events
            .iter()
            .filter(|event| event.title == self.title)
            .flat_map(|event| event.reviews.iter().cloned())
            .collect();

        let report = Report::new(
            "LIST_EVENT_REVIEWS_SUCCESS",
            Context::new()
                .with("title", self.title.as_str())
                .with("count", reviews.len()),
        );
        Ok(Applied::new(reviews, report))
    }
}
