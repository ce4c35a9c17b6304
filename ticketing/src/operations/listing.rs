//! Catalog queries.
//!
//! Listings never change state but still run through the executor so every
//! query reports exactly one outcome.

use crate::environment::TicketingEnvironment;
use crate::filter::{filter_events, rank_by_distance, satisfies_preferences};
use crate::mapping::{MapError, TransportMode};
use crate::state::TicketingState;
use crate::types::{Event, User};
use chrono::NaiveDate;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

fn date_label(on_date: Option<NaiveDate>) -> String {
    on_date.map_or_else(|| "any".to_string(), |date| date.to_string())
}

fn numbers(events: &[Event]) -> Vec<u64> {
    events.iter().map(|event| event.number.get()).collect()
}

// ============================================================================
// ListEvents
// ============================================================================

/// Lists the catalog.
///
/// With `user_events_only`, staff still see every event while consumers see
/// only events matching their preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListEvents {
    /// Tailor the list to the logged-in user
    pub user_events_only: bool,
    /// Drop cancelled events
    pub active_only: bool,
    /// Keep events matching this date
    pub on_date: Option<NaiveDate>,
}

/// Why the catalog could not be listed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListEventsError {
    /// Tailored listing needs a session
    #[error("Log in to list your events")]
    NotLoggedIn,
}

impl Rejection for ListEventsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => "LIST_EVENTS_NOT_LOGGED_IN",
        }
    }

    fn context(&self) -> Context {
        Context::new().with("userEventsOnly", true)
    }
}

impl Operation for ListEvents {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Vec<Event>;
    type Error = ListEventsError;

    const NAME: &'static str = "ListEvents";

    fn execute(self, state: &mut TicketingState, _env: &TicketingEnvironment) -> Result<Applied<Vec<Event>>, ListEventsError> {
        let preferences = if self.user_events_only {
            match state.current_user() {
                None => return Err(ListEventsError::NotLoggedIn),
                Some(User::Staff(_)) => None,
                Some(User::Consumer(consumer)) => Some(&consumer.preferences),
            }
        } else {
            None
        };

        let candidates = state
            .events
            .iter()
            .filter(|event| preferences.is_none_or(|prefs| satisfies_preferences(&state.tags, prefs, event)));
        let events: Vec<Event> = filter_events(candidates, self.active_only, self.on_date)
            .into_iter()
            .cloned()
            .collect();

        let report = Report::new(
            "LIST_EVENTS_SUCCESS",
            Context::new()
                .with("userEventsOnly", self.user_events_only)
                .with("activeEventsOnly", self.active_only)
                .with("searchDate", date_label(self.on_date))
                .with("eventList", numbers(&events)),
        );
        Ok(Applied::new(events, report))
    }
}

// ============================================================================
// ListEventsByDistance
// ============================================================================

/// Lists events the logged-in consumer can reach within `max_distance_m`,
/// nearest first. The consumer's preferences always apply.
#[derive(Debug, Clone, Copy)]
pub struct ListEventsByDistance {
    /// Echoed in the report; preferences apply either way
    pub user_events_only: bool,
    /// Drop cancelled events
    pub active_only: bool,
    /// Keep events matching this date
    pub on_date: Option<NaiveDate>,
    /// How the consumer travels
    pub mode: TransportMode,
    /// Longest acceptable route in metres
    pub max_distance_m: f64,
}

/// Why a distance listing failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListEventsByDistanceError {
    /// Logged-in user is not a consumer
    #[error("Only consumers can list events by distance (current user: {role})")]
    NotConsumer {
        /// Role of the session user
        role: &'static str,
    },

    /// Consumer has no home address
    #[error("{consumer} has no address")]
    NoConsumerAddress {
        /// Consumer e-mail
        consumer: String,
    },

    /// The mapping service failed
    #[error("Routing failed: {0}")]
    RouteUnavailable(#[from] MapError),
}

impl Rejection for ListEventsByDistanceError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotConsumer { .. } => "LIST_EVENT_DISTANCE_USER_NOT_CONSUMER",
            Self::NoConsumerAddress { .. } => "LIST_EVENT_DISTANCE_CONSUMER_NO_ADDRESS",
            Self::RouteUnavailable(_) => "LIST_EVENT_DISTANCE_ROUTE_UNAVAILABLE",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotConsumer { role } => Context::new().with("currentUser", *role),
            Self::NoConsumerAddress { consumer } => Context::new().with("consumer", consumer.as_str()),
            Self::RouteUnavailable(error) => Context::new().with("reason", error.to_string()),
        }
    }
}

impl Operation for ListEventsByDistance {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Vec<Event>;
    type Error = ListEventsByDistanceError;

    const NAME: &'static str = "ListEventMaxDistance";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<Vec<Event>>, ListEventsByDistanceError> {
        let consumer = state
            .current_consumer()
            .ok_or_else(|| ListEventsByDistanceError::NotConsumer {
                role: state.session_role(),
            })?;
        let Some(address) = consumer.address.as_deref().filter(|a| !a.trim().is_empty()) else {
            return Err(ListEventsByDistanceError::NoConsumerAddress {
                consumer: consumer.email.clone(),
            });
        };
        let origin = env.map.to_coordinates(address)?;

        let preferred: Vec<&Event> = state
            .events
            .iter()
            .filter(|event| satisfies_preferences(&state.tags, &consumer.preferences, event))
            .collect();
        let ranked = rank_by_distance(preferred, env.map.as_ref(), self.mode, self.max_distance_m, origin)?;
        let events: Vec<Event> = filter_events(ranked.iter().map(|(event, _)| *event), self.active_only, self.on_date)
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!(
            mode = %self.mode,
            max_distance_m = self.max_distance_m,
            matched = events.len(),
            "Ranked events by route distance"
        );

        let report = Report::new(
            "LIST_EVENT_DISTANCE_SUCCESS",
            Context::new()
                .with("userEventsOnly", self.user_events_only)
                .with("activeEventsOnly", self.active_only)
                .with("searchDate", date_label(self.on_date))
                .with("transportMode", self.mode.as_str())
                .with("maxDistance", self.max_distance_m)
                .with("eventListResult", numbers(&events)),
        );
        Ok(Applied::new(events, report))
    }
}
