//! Tag registration by staff.

use crate::environment::TicketingEnvironment;
use crate::state::TicketingState;
use crate::tags::{EventTag, TagError};
use std::collections::BTreeSet;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

/// Registers a new tag
#[derive(Debug, Clone)]
pub struct AddEventTag {
    /// Unique tag name
    pub name: String,
    /// Allowed values
    pub values: BTreeSet<String>,
    /// Default value, one of `values`
    pub default_value: String,
}

/// Why a tag could not be added
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddEventTagError {
    /// Logged-in user is not staff
    #[error("Only staff can add tags (current user: {role})")]
    NotStaff {
        /// Role of the session user
        role: &'static str,
    },

    /// Registry refused the tag
    #[error(transparent)]
    Registry(#[from] TagError),
}

impl Rejection for AddEventTagError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotStaff { .. } => "ADD_EVENT_TAG_USER_NOT_STAFF",
            Self::Registry(TagError::TagExists { .. }) => "ADD_EVENT_TAG_CLASHES_WITH_EXISTING_TAGS",
            Self::Registry(TagError::NotEnoughValues { .. }) => "ADD_EVENT_TAG_NOT_ENOUGH_TAG_VALUES",
            Self::Registry(TagError::DefaultNotAllowed { .. }) => "ADD_EVENT_TAG_DEFAULT_NOT_IN_VALUES",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::NotStaff { role } => Context::new().with("currentUser", *role),
            Self::Registry(TagError::TagExists { name }) => Context::new().with("tagName", name.as_str()),
            Self::Registry(TagError::NotEnoughValues { name, count }) => {
                Context::new().with("tagName", name.as_str()).with("valueCount", *count)
            }
            Self::Registry(TagError::DefaultNotAllowed { name, default_value }) => Context::new()
                .with("tagName", name.as_str())
                .with("defaultValue", default_value.as_str()),
        }
    }
}

impl Operation for AddEventTag {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = EventTag;
    type Error = AddEventTagError;

    const NAME: &'static str = "AddEventTag";

    fn execute(self, state: &mut TicketingState, _env: &TicketingEnvironment) -> Result<Applied<EventTag>, AddEventTagError> {
        if state.current_staff().is_none() {
            return Err(AddEventTagError::NotStaff {
                role: state.session_role(),
            });
        }

        let context = Context::new()
            .with("tagName", self.name.as_str())
            .with_serialized("tagValues", &self.values)
            .with("defaultValue", self.default_value.as_str());
        let tag = state.tags.register(self.name, self.values, self.default_value)?;

        Ok(Applied::new(tag, Report::new("ADD_EVENT_TAG_SUCCESS", context)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::values;
    use crate::types::{Password, Staff, User};
    use ticketbook_testing::OperationTest;

    fn staff_session() -> TicketingState {
        let mut state = TicketingState::new();
        state.users.insert(
            "boss@x.org".to_string(),
            User::Staff(Staff {
                email: "boss@x.org".to_string(),
                password: Password::new("pw"),
            }),
        );
        state.session = Some("boss@x.org".to_string());
        state
    }

    fn add(name: &str, allowed: BTreeSet<String>, default_value: &str) -> AddEventTag {
        AddEventTag {
            name: name.to_string(),
            values: allowed,
            default_value: default_value.to_string(),
        }
    }

    #[test]
    fn staff_can_add_tag() {
        OperationTest::new(add("outdoor", values(["yes", "no"]), "no"))
            .with_env(TicketingEnvironment::default())
            .given_state(staff_session())
            .then_output(|tag| assert_eq!(tag.default_value, "no"))
            .then_state(|state| assert!(state.tags.contains("outdoor")))
            .then_outcomes(&["ADD_EVENT_TAG_SUCCESS"])
            .run();
    }

    #[test]
    fn anonymous_user_cannot_add_tag() {
        OperationTest::new(add("outdoor", values(["yes", "no"]), "no"))
            .with_env(TicketingEnvironment::default())
            .given_state(TicketingState::new())
            .then_error(|e| assert_eq!(*e, AddEventTagError::NotStaff { role: "none" }))
            .then_state(|state| assert!(!state.tags.contains("outdoor")))
            .run();
    }

    #[test]
    fn registry_failures_map_to_codes() {
        OperationTest::new(add("venueCapacity", values(["a", "b"]), "a"))
            .with_env(TicketingEnvironment::default())
            .given_state(staff_session())
            .then_error(|e| assert_eq!(e.code(), "ADD_EVENT_TAG_CLASHES_WITH_EXISTING_TAGS"))
            .run();

        OperationTest::new(add("outdoor", values(["yes"]), "yes"))
            .with_env(TicketingEnvironment::default())
            .given_state(staff_session())
            .then_error(|e| assert_eq!(e.code(), "ADD_EVENT_TAG_NOT_ENOUGH_TAG_VALUES"))
            .run();

        OperationTest::new(add("outdoor", values(["yes", "no"]), "maybe"))
            .with_env(TicketingEnvironment::default())
            .given_state(staff_session())
            .then_error(|e| assert_eq!(e.code(), "ADD_EVENT_TAG_DEFAULT_NOT_IN_VALUES"))
            .then_outcomes(&["ADD_EVENT_TAG_DEFAULT_NOT_IN_VALUES"])
            .run();
    }
}
