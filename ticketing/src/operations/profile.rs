//! Profile updates. All-or-nothing: every check runs before any field changes.

use super::{check_address, is_blank, normalize_address, AddressFault};
use crate::environment::TicketingEnvironment;
use crate::state::TicketingState;
use crate::tags::EventTagCollection;
use crate::types::{Consumer, Password, Staff, User};
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

/// Checks shared by both profile updates, in order
fn authorize<'s, E>(
    state: &'s TicketingState,
    old_password: &str,
    new_email: &str,
    not_logged_in: E,
    wrong_password: E,
    email_taken: impl FnOnce() -> E,
) -> Result<&'s User, E> {
    let user = state.current_user().ok_or(not_logged_in)?;
    if !user.password().matches(old_password) {
        return Err(wrong_password);
    }
    if new_email != user.email() && state.users.contains_key(new_email) {
        return Err(email_taken());
    }
    Ok(user)
}

// ============================================================================
// UpdateConsumerProfile
// ============================================================================

/// Replaces every field of the logged-in consumer's profile
#[derive(Debug, Clone)]
pub struct UpdateConsumerProfile {
    /// Current password, required to authorize the change
    pub old_password: String,
    /// New display name
    pub name: String,
    /// New e-mail
    pub email: String,
    /// New phone number
    pub phone: String,
    /// New home "lat lng", blank for none
    pub address: Option<String>,
    /// New password
    pub new_password: Password,
    /// New tag preferences
    pub preferences: EventTagCollection,
}

/// Why a consumer profile update failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateConsumerProfileError {
    /// A required field is blank
    #[error("Field {field} must not be blank")]
    BlankField {
        /// Offending field
        field: &'static str,
    },

    /// No session
    #[error("Not logged in")]
    NotLoggedIn,

    /// Current password did not match
    #[error("Wrong password")]
    WrongPassword,

    /// New e-mail belongs to another account
    #[error("E-mail {email} is already registered")]
    EmailTaken {
        /// Requested e-mail
        email: String,
    },

    /// Logged-in user is not a consumer
    #[error("User is not a consumer")]
    NotConsumer,

    /// Address is not a "lat lng" pair
    #[error("Address {address} is not a \"lat lng\" pair")]
    InvalidAddress {
        /// Rejected address
        address: String,
    },

    /// Address is outside the map
    #[error("Address {address} is outside the map")]
    AddressOutOfBounds {
        /// Rejected address
        address: String,
    },

    /// A preference names an unknown tag or value
    #[error("Preference {name}={value} does not match any registered tag")]
    InvalidPreferences {
        /// Tag name
        name: String,
        /// Selected value
        value: String,
    },
}

impl Rejection for UpdateConsumerProfileError {
    fn code(&self) -> &'static str {
        match self {
            Self::BlankField { .. } => "USER_UPDATE_PROFILE_FIELDS_CANNOT_BE_BLANK",
            Self::NotLoggedIn => "USER_UPDATE_PROFILE_NOT_LOGGED_IN",
            Self::WrongPassword => "USER_UPDATE_PROFILE_WRONG_PASSWORD",
            Self::EmailTaken { .. } => "USER_UPDATE_PROFILE_EMAIL_ALREADY_IN_USE",
            Self::NotConsumer => "USER_UPDATE_PROFILE_NOT_CONSUMER",
            Self::InvalidAddress { .. } => "USER_UPDATE_PROFILE_INVALID_ADDRESS",
            Self::AddressOutOfBounds { .. } => "USER_UPDATE_PROFILE_POINT_OUT_OF_BOUNDS",
            Self::InvalidPreferences { .. } => "USER_UPDATE_PROFILE_TAGS_DO_NOT_MATCH",
        }
    }

    fn context(&self) -> Context {
        let base = Context::new().with_masked("oldPassword").with_masked("newPassword");
        match self {
            Self::BlankField { field } => base.with("field", *field),
            Self::NotLoggedIn | Self::WrongPassword | Self::NotConsumer => base,
            Self::EmailTaken { email } => base.with("email", email.as_str()),
            Self::InvalidAddress { address } | Self::AddressOutOfBounds { address } => {
                base.with("address", address.as_str())
            }
            Self::InvalidPreferences { name, value } => {
                base.with("tag", name.as_str()).with("value", value.as_str())
            }
        }
    }
}

impl Operation for UpdateConsumerProfile {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Consumer;
    type Error = UpdateConsumerProfileError;

    const NAME: &'static str = "UpdateConsumerProfile";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<Consumer>, UpdateConsumerProfileError> {
        for (field, value) in [
            ("oldPassword", self.old_password.as_str()),
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
        ] {
            if is_blank(value) {
                return Err(UpdateConsumerProfileError::BlankField { field });
            }
        }
        if self.new_password.is_blank() {
            return Err(UpdateConsumerProfileError::BlankField { field: "newPassword" });
        }

        let user = authorize(
            state,
            &self.old_password,
            &self.email,
            UpdateConsumerProfileError::NotLoggedIn,
            UpdateConsumerProfileError::WrongPassword,
            || UpdateConsumerProfileError::EmailTaken {
                email: self.email.clone(),
            },
        )?;
        let User::Consumer(current) = user else {
            return Err(UpdateConsumerProfileError::NotConsumer);
        };

        let address = normalize_address(self.address);
        if let Some(address) = &address {
            match check_address(env.map.as_ref(), address) {
                Ok(()) => {}
                Err(AddressFault::Invalid) => {
                    return Err(UpdateConsumerProfileError::InvalidAddress {
                        address: address.clone(),
                    });
                }
                Err(AddressFault::OutOfBounds) => {
                    return Err(UpdateConsumerProfileError::AddressOutOfBounds {
                        address: address.clone(),
                    });
                }
            }
        }
        if let Some((name, value)) = state.tags.first_invalid(&self.preferences) {
            return Err(UpdateConsumerProfileError::InvalidPreferences {
                name: name.to_string(),
                value: value.to_string(),
            });
        }

        let old_email = current.email.clone();
        let updated = Consumer {
            email: self.email,
            password: self.new_password,
            name: self.name,
            phone: self.phone,
            address,
            preferences: self.preferences,
            bookings: current.bookings.clone(),
        };
        state.replace_user(&old_email, User::Consumer(updated.clone()));

        let report = Report::new(
            "USER_UPDATE_PROFILE_SUCCESS",
            Context::new()
                .with("newName", updated.name.as_str())
                .with("newEmail", updated.email.as_str())
                .with("newPhone", updated.phone.as_str())
                .with("newAddress", updated.address.clone())
                .with("newPreferences", updated.preferences.to_string())
                .with_masked("newPassword"),
        );
        Ok(Applied::new(updated, report))
    }
}

// ============================================================================
// UpdateStaffProfile
// ============================================================================

/// Changes the logged-in staff member's e-mail and password
#[derive(Debug, Clone)]
pub struct UpdateStaffProfile {
    /// Current password, required to authorize the change
    pub old_password: String,
    /// New e-mail
    pub email: String,
    /// New password
    pub new_password: Password,
}

/// Why a staff profile update failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateStaffProfileError {
    /// A required field is blank
    #[error("Field {field} must not be blank")]
    BlankField {
        /// Offending field
        field: &'static str,
    },

    /// No session
    #[error("Not logged in")]
    NotLoggedIn,

    /// Current password did not match
    #[error("Wrong password")]
    WrongPassword,

    /// New e-mail belongs to another account
    #[error("E-mail {email} is already registered")]
    EmailTaken {
        /// Requested e-mail
        email: String,
    },

    /// Logged-in user is not staff
    #[error("User is not staff")]
    NotStaff,
}

impl Rejection for UpdateStaffProfileError {
    fn code(&self) -> &'static str {
        match self {
            Self::BlankField { .. } => "STAFF_UPDATE_PROFILE_FIELDS_CANNOT_BE_BLANK",
            Self::NotLoggedIn => "STAFF_UPDATE_PROFILE_NOT_LOGGED_IN",
            Self::WrongPassword => "STAFF_UPDATE_PROFILE_WRONG_PASSWORD",
            Self::EmailTaken { .. } => "STAFF_UPDATE_PROFILE_EMAIL_ALREADY_IN_USE",
            Self::NotStaff => "STAFF_UPDATE_PROFILE_NOT_STAFF",
        }
    }

    fn context(&self) -> Context {
        let base = Context::new().with_masked("oldPassword").with_masked("newPassword");
        match self {
            Self::BlankField { field } => base.with("field", *field),
            Self::EmailTaken { email } => base.with("email", email.as_str()),
            Self::NotLoggedIn | Self::WrongPassword | Self::NotStaff => base,
        }
    }
}

impl Operation for UpdateStaffProfile {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Staff;
    type Error = UpdateStaffProfileError;

    const NAME: &'static str = "UpdateStaffProfile";

    fn execute(
        self,
        state: &mut TicketingState,
        _env: &TicketingEnvironment,
    ) -> Result<Applied<Staff>, UpdateStaffProfileError> {
        if is_blank(&self.old_password) {
            return Err(UpdateStaffProfileError::BlankField { field: "oldPassword" });
        }
        if is_blank(&self.email) {
            return Err(UpdateStaffProfileError::BlankField { field: "email" });
        }
        if self.new_password.is_blank() {
            return Err(UpdateStaffProfileError::BlankField { field: "newPassword" });
        }

        let user = authorize(
            state,
            &self.old_password,
            &self.email,
            UpdateStaffProfileError::NotLoggedIn,
            UpdateStaffProfileError::WrongPassword,
            || UpdateStaffProfileError::EmailTaken {
                email: self.email.clone(),
            },
        )?;
        let User::Staff(current) = user else {
            return Err(UpdateStaffProfileError::NotStaff);
        };

        let old_email = current.email.clone();
        let updated = Staff {
            email: self.email,
            password: self.new_password,
        };
        state.replace_user(&old_email, User::Staff(updated.clone()));

        let report = Report::new(
            "STAFF_UPDATE_PROFILE_SUCCESS",
            Context::new()
                .with("newEmail", updated.email.as_str())
                .with_masked("newPassword"),
        );
        Ok(Applied::new(updated, report))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::session::{Logout, RegisterConsumer, RegisterStaff};
    use crate::types::{Booking, BookingNumber, BookingStatus, EventNumber};
    use chrono::Utc;
    use ticketbook_testing::OperationTest;

    fn with_consumer(env: &TicketingEnvironment) -> TicketingState {
        let mut state = TicketingState::new();
        RegisterConsumer {
            name: "Ana".to_string(),
            email: "ana@x.org".to_string(),
            phone: "0131".to_string(),
            address: None,
            password: Password::new("pw"),
        }
        .execute(&mut state, env)
        .unwrap();
        state
    }

    fn update(email: &str) -> UpdateConsumerProfile {
        UpdateConsumerProfile {
            old_password: "pw".to_string(),
            name: "Ana B".to_string(),
            email: email.to_string(),
            phone: "0141".to_string(),
            address: Some("55.95 -3.19".to_string()),
            new_password: Password::new("pw2"),
            preferences: EventTagCollection::new().with("hasAirFiltration", "true"),
        }
    }

    #[test]
    fn consumer_update_replaces_fields() {
        let env = TicketingEnvironment::default();
        OperationTest::new(update("ana@x.org"))
            .with_env(env.clone())
            .given_state(with_consumer(&env))
            .then_output(|consumer| {
                assert_eq!(consumer.name, "Ana B");
                assert!(consumer.password.matches("pw2"));
                assert_eq!(consumer.preferences.get("hasAirFiltration"), Some("true"));
            })
            .then_outcomes(&["USER_UPDATE_PROFILE_SUCCESS"])
            .run();
    }

    #[test]
    fn changing_email_rekeys_every_reference() {
        let env = TicketingEnvironment::default();
        let mut state = with_consumer(&env);
        state.add_booking(Booking {
            number: BookingNumber::new(0),
            booker: "ana@x.org".to_string(),
            event: EventNumber::FIRST,
            tickets: 1,
            created_at: Utc::now(),
            status: BookingStatus::Active,
        });

        update("ana.b@x.org").execute(&mut state, &env).unwrap();

        assert!(!state.users.contains_key("ana@x.org"));
        assert_eq!(state.session.as_deref(), Some("ana.b@x.org"));
        assert_eq!(state.bookings[0].booker, "ana.b@x.org");
        assert_eq!(
            state.current_consumer().map(|c| c.bookings.clone()),
            Some(vec![BookingNumber::FIRST])
        );
    }

    #[test]
    fn invalid_preferences_leave_profile_untouched() {
        let env = TicketingEnvironment::default();
        let state = with_consumer(&env);
        let before = state.clone();
        let mut op = update("ana.b@x.org");
        op.preferences = EventTagCollection::new().with("venueCapacity", "huge");

        OperationTest::new(op)
            .with_env(env)
            .given_state(state)
            .then_error(|e| assert_eq!(e.code(), "USER_UPDATE_PROFILE_TAGS_DO_NOT_MATCH"))
            .then_state(move |state| assert_eq!(*state, before))
            .run();
    }

    #[test]
    fn wrong_password_and_taken_email_are_refused() {
        let env = TicketingEnvironment::default();
        let mut state = with_consumer(&env);
        Logout.execute(&mut state, &env).unwrap();
        RegisterStaff {
            email: "boss@x.org".to_string(),
            password: Password::new("pw"),
            secret: env.policy.staff_secret.clone(),
        }
        .execute(&mut state, &env)
        .unwrap();

        let mut wrong = update("ana@x.org");
        wrong.old_password = "nope".to_string();
        assert_eq!(
            wrong.execute(&mut state, &env).err(),
            Some(UpdateConsumerProfileError::WrongPassword)
        );

        // Staff session: the e-mail check comes before the capability check
        assert_eq!(
            update("ana@x.org").execute(&mut state, &env).err(),
            Some(UpdateConsumerProfileError::EmailTaken {
                email: "ana@x.org".to_string()
            })
        );
        assert_eq!(
            update("new@x.org").execute(&mut state, &env).err(),
            Some(UpdateConsumerProfileError::NotConsumer)
        );
    }

    #[test]
    fn staff_update_needs_staff_session() {
        let env = TicketingEnvironment::default();
        let op = UpdateStaffProfile {
            old_password: "pw".to_string(),
            email: "boss2@x.org".to_string(),
            new_password: Password::new("pw2"),
        };

        OperationTest::new(op.clone())
            .with_env(env.clone())
            .given_state(TicketingState::new())
            .then_error(|e| assert_eq!(*e, UpdateStaffProfileError::NotLoggedIn))
            .run();

        OperationTest::new(op)
            .with_env(env.clone())
            .given_state(with_consumer(&env))
            .then_error(|e| assert_eq!(*e, UpdateStaffProfileError::NotStaff))
            .run();
    }

    #[test]
    fn staff_update_rekeys_session() {
        let env = TicketingEnvironment::default();
        let mut state = TicketingState::new();
        RegisterStaff {
            email: "boss@x.org".to_string(),
            password: Password::new("pw"),
            secret: env.policy.staff_secret.clone(),
        }
        .execute(&mut state, &env)
        .unwrap();

        UpdateStaffProfile {
            old_password: "pw".to_string(),
            email: "chief@x.org".to_string(),
            new_password: Password::new("pw2"),
        }
        .execute(&mut state, &env)
        .unwrap();

        assert_eq!(state.session.as_deref(), Some("chief@x.org"));
        assert!(state.current_staff().is_some_and(|s| s.password.matches("pw2")));
        assert_eq!(state.users.len(), 1);
    }
}
