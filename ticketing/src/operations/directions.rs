//! Turn-by-turn directions from a consumer's address to a venue.

use crate::environment::TicketingEnvironment;
use crate::mapping::{MapError, TransportMode};
use crate::state::TicketingState;
use crate::types::EventNumber;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

/// Routes the logged-in consumer to an event's venue
#[derive(Debug, Clone, Copy)]
pub struct GetEventDirections {
    /// Destination event
    pub event_number: EventNumber,
    /// How the consumer travels
    pub mode: TransportMode,
}

/// Why no directions could be given
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GetEventDirectionsError {
    /// No such event
    #[error("Event {event_number} not found")]
    NoSuchEvent {
        /// Requested event
        event_number: EventNumber,
    },

    /// Event has no venue
    #[error("Event {event_number} has no venue address")]
    NoVenueAddress {
        /// Requested event
        event_number: EventNumber,
    },

    /// Logged-in user is not a consumer
    #[error("Only consumers can get directions (current user: {role})")]
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

impl Rejection for GetEventDirectionsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoSuchEvent { .. } => "GET_EVENT_DIRECTIONS_NO_SUCH_EVENT",
            Self::NoVenueAddress { .. } => "GET_EVENT_DIRECTIONS_NO_VENUE_ADDRESS",
            Self::NotConsumer { .. } => "GET_EVENT_DIRECTIONS_USER_NOT_CONSUMER",
            Self::NoConsumerAddress { .. } => "GET_EVENT_DIRECTIONS_NO_CONSUMER_ADDRESS",
            Self::RouteUnavailable(_) => "GET_EVENT_DIRECTIONS_ROUTE_UNAVAILABLE",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NoSuchEvent { event_number } | Self::NoVenueAddress { event_number } => {
                Context::new().with("eventNumber", event_number.get())
            }
            Self::NotConsumer { role } => Context::new().with("currentUser", *role),
            Self::NoConsumerAddress { consumer } => Context::new().with("consumer", consumer.as_str()),
            Self::RouteUnavailable(error) => Context::new().with("reason", error.to_string()),
        }
    }
}

impl Operation for GetEventDirections {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Vec<String>;
    type Error = GetEventDirectionsError;

    const NAME: &'static str = "GetEventDirections";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<Vec<String>>, GetEventDirectionsError> {
        let event_number = self.event_number;
        let event = state
            .find_event(event_number)
            .ok_or(GetEventDirectionsError::NoSuchEvent { event_number })?;
        let Some(venue) = event.venue_address.as_deref().filter(|a| !a.trim().is_empty()) else {
            return Err(GetEventDirectionsError::NoVenueAddress { event_number });
        };
        let consumer = state
            .current_consumer()
            .ok_or_else(|| GetEventDirectionsError::NotConsumer {
                role: state.session_role(),
            })?;
        let Some(home) = consumer.address.as_deref().filter(|a| !a.trim().is_empty()) else {
            return Err(GetEventDirectionsError::NoConsumerAddress {
                consumer: consumer.email.clone(),
            });
        };

        let from = env.map.to_coordinates(home)?;
        let to = env.map.to_coordinates(venue)?;
        let route = env.map.route(self.mode, from, to)?;
        let directions: Vec<String> = route
            .steps
            .iter()
            .map(|step| format!("distance {:.1} for instruction: {}", step.distance_m, step.instruction))
            .collect();

        let report = Report::new(
            "GET_EVENT_DIRECTIONS_SUCCESS",
            Context::new()
                .with("eventNumber", event_number.get())
                .with("consumer", consumer.email.as_str())
                .with("transportMode", self.mode.as_str())
                .with("directions", directions.clone()),
        );
        Ok(Applied::new(directions, report))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::fixtures::{self, ALICE, BOB, STAFF};
    use ticketbook_testing::OperationTest;

    fn directions(event_number: EventNumber) -> GetEventDirections {
        GetEventDirections {
            event_number,
            mode: TransportMode::Wheelchair,
        }
    }

    #[test]
    fn consumer_gets_formatted_steps() {
        let clock = fixtures::clock();
        let mut state = fixtures::populated();
        let event = fixtures::event_in(&mut state, "Gig", 48, 10);
        fixtures::login(&mut state, ALICE);

        OperationTest::new(directions(event))
            .with_env(fixtures::env(&clock))
            .given_state(state)
            .then_output(|steps| {
                assert!(!steps.is_empty());
                assert!(steps.iter().all(|s| s.starts_with("distance ") && s.contains(" for instruction: ")));
                assert!(steps.last().unwrap().ends_with("arrive at destination"));
            })
            .then_outcomes(&["GET_EVENT_DIRECTIONS_SUCCESS"])
            .run();
    }

    #[test]
    fn event_checks_come_before_user_checks() {
        let clock = fixtures::clock();
        let env = fixtures::env(&clock);
        let mut state = fixtures::populated();
        let event = fixtures::event_in(&mut state, "Gig", 48, 10);
        let no_venue = fixtures::event_in(&mut state, "Online", 48, 10);
        state.find_event_mut(no_venue).unwrap().venue_address = None;

        let err = directions(EventNumber::new(42)).execute(&mut state, &env).err().unwrap();
        assert_eq!(err.code(), "GET_EVENT_DIRECTIONS_NO_SUCH_EVENT");

        let err = directions(no_venue).execute(&mut state, &env).err().unwrap();
        assert_eq!(err.code(), "GET_EVENT_DIRECTIONS_NO_VENUE_ADDRESS");

        fixtures::login(&mut state, STAFF);
        let err = directions(event).execute(&mut state, &env).err().unwrap();
        assert_eq!(err, GetEventDirectionsError::NotConsumer { role: "staff" });

        fixtures::login(&mut state, BOB);
        let err = directions(event).execute(&mut state, &env).err().unwrap();
        assert_eq!(err.code(), "GET_EVENT_DIRECTIONS_NO_CONSUMER_ADDRESS");
    }
}
