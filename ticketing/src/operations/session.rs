//! Registration, login and logout.

use super::{check_address, is_blank, normalize_address, AddressFault};
use crate::environment::TicketingEnvironment;
use crate::state::TicketingState;
use crate::tags::EventTagCollection;
use crate::types::{Consumer, Password, Staff, User};
use std::convert::Infallible;
use thiserror::Error;
use ticketbook_core::operation::{Applied, Operation};
use ticketbook_core::outcome::{Context, Rejection, Report};

// ============================================================================
// RegisterStaff
// ============================================================================

/// Registers a staff member and logs them in
#[derive(Debug, Clone)]
pub struct RegisterStaff {
    /// Login e-mail
    pub email: String,
    /// Password
    pub password: Password,
    /// Organisation secret
    pub secret: Password,
}

/// Why staff registration failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterStaffError {
    /// Someone is already logged in
    #[error("Cannot register while {current} is logged in")]
    LoggedIn {
        /// Active session
        current: String,
    },

    /// A required field is blank
    #[error("Field {field} must not be blank")]
    BlankField {
        /// Offending field
        field: &'static str,
    },

    /// Organisation secret did not match
    #[error("Wrong staff registration secret")]
    WrongSecret,

    /// E-mail already registered
    #[error("E-mail {email} is already registered")]
    EmailTaken {
        /// Requested e-mail
        email: String,
    },
}

impl Rejection for RegisterStaffError {
    fn code(&self) -> &'static str {
        match self {
            Self::LoggedIn { .. } => "REGISTER_STAFF_LOGGED_IN",
            Self::BlankField { .. } => "REGISTER_STAFF_BLANK_FIELD",
            Self::WrongSecret => "REGISTER_STAFF_SECRET_NOT_MATCH",
            Self::EmailTaken { .. } => "REGISTER_STAFF_EMAIL_ALREADY_REGISTERED",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::LoggedIn { current } => Context::new().with("currentUser", current.as_str()),
            Self::BlankField { field } => Context::new().with("field", *field),
            Self::WrongSecret => Context::new().with_masked("secret"),
            Self::EmailTaken { email } => Context::new().with("email", email.as_str()),
        }
    }
}

impl Operation for RegisterStaff {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Staff;
    type Error = RegisterStaffError;

    const NAME: &'static str = "RegisterStaff";

    fn execute(self, state: &mut TicketingState, env: &TicketingEnvironment) -> Result<Applied<Staff>, RegisterStaffError> {
        if let Some(current) = &state.session {
            return Err(RegisterStaffError::LoggedIn {
                current: current.clone(),
            });
        }
        if is_blank(&self.email) {
            return Err(RegisterStaffError::BlankField { field: "email" });
        }
        if self.password.is_blank() {
            return Err(RegisterStaffError::BlankField { field: "password" });
        }
        if self.secret != env.policy.staff_secret {
            return Err(RegisterStaffError::WrongSecret);
        }
        if state.users.contains_key(&self.email) {
            return Err(RegisterStaffError::EmailTaken { email: self.email });
        }

        let staff = Staff {
            email: self.email,
            password: self.password,
        };
        state.users.insert(staff.email.clone(), User::Staff(staff.clone()));
        state.session = Some(staff.email.clone());

        let report = Report::new(
            "REGISTER_STAFF_SUCCESS",
            Context::new().with("email", staff.email.as_str()).with_masked("password"),
        );
        Ok(Applied::new(staff, report))
    }
}

// ============================================================================
// RegisterConsumer
// ============================================================================

/// Registers a consumer and logs them in
#[derive(Debug, Clone)]
pub struct RegisterConsumer {
    /// Display name
    pub name: String,
    /// Login e-mail
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Home "lat lng", blank for none
    pub address: Option<String>,
    /// Password
    pub password: Password,
}

/// Why consumer registration failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterConsumerError {
    /// Someone is already logged in
    #[error("Cannot register while {current} is logged in")]
    LoggedIn {
        /// Active session
        current: String,
    },

    /// A required field is blank
    #[error("Field {field} must not be blank")]
    BlankField {
        /// Offending field
        field: &'static str,
    },

    /// E-mail already registered
    #[error("E-mail {email} is already registered")]
    EmailTaken {
        /// Requested e-mail
        email: String,
    },

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
}

impl Rejection for RegisterConsumerError {
    fn code(&self) -> &'static str {
        match self {
            Self::LoggedIn { .. } => "REGISTER_CONSUMER_LOGGED_IN",
            Self::BlankField { .. } => "REGISTER_CONSUMER_BLANK_FIELD",
            Self::EmailTaken { .. } => "REGISTER_CONSUMER_EMAIL_ALREADY_REGISTERED",
            Self::InvalidAddress { .. } => "REGISTER_CONSUMER_INVALID_ADDRESS",
            Self::AddressOutOfBounds { .. } => "REGISTER_CONSUMER_ADDRESS_OUT_OF_BOUNDS",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::LoggedIn { current } => Context::new().with("currentUser", current.as_str()),
            Self::BlankField { field } => Context::new().with("field", *field),
            Self::EmailTaken { email } => Context::new().with("email", email.as_str()),
            Self::InvalidAddress { address } | Self::AddressOutOfBounds { address } => {
                Context::new().with("address", address.as_str())
            }
        }
    }
}

impl Operation for RegisterConsumer {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = Consumer;
    type Error = RegisterConsumerError;

    const NAME: &'static str = "RegisterConsumer";

    fn execute(
        self,
        state: &mut TicketingState,
        env: &TicketingEnvironment,
    ) -> Result<Applied<Consumer>, RegisterConsumerError> {
        if let Some(current) = &state.session {
            return Err(RegisterConsumerError::LoggedIn {
                current: current.clone(),
            });
        }
        for (field, value) in [("name", &self.name), ("email", &self.email), ("phone", &self.phone)] {
            if is_blank(value) {
                return Err(RegisterConsumerError::BlankField { field });
            }
        }
        if self.password.is_blank() {
            return Err(RegisterConsumerError::BlankField { field: "password" });
        }
        if state.users.contains_key(&self.email) {
            return Err(RegisterConsumerError::EmailTaken { email: self.email });
        }
        let address = normalize_address(self.address);
        if let Some(address) = &address {
            match check_address(env.map.as_ref(), address) {
                Ok(()) => {}
                Err(AddressFault::Invalid) => {
                    return Err(RegisterConsumerError::InvalidAddress {
                        address: address.clone(),
                    });
                }
                Err(AddressFault::OutOfBounds) => {
                    return Err(RegisterConsumerError::AddressOutOfBounds {
                        address: address.clone(),
                    });
                }
            }
        }

        let consumer = Consumer {
            email: self.email,
            password: self.password,
            name: self.name,
            phone: self.phone,
            address,
            preferences: EventTagCollection::new(),
            bookings: Vec::new(),
        };
        state.users.insert(consumer.email.clone(), User::Consumer(consumer.clone()));
        state.session = Some(consumer.email.clone());

        let report = Report::new(
            "REGISTER_CONSUMER_SUCCESS",
            Context::new()
                .with("name", consumer.name.as_str())
                .with("email", consumer.email.as_str())
                .with("phone", consumer.phone.as_str())
                .with("address", consumer.address.clone())
                .with_masked("password"),
        );
        Ok(Applied::new(consumer, report))
    }
}

// ============================================================================
// Login / Logout
// ============================================================================

/// Starts a session, replacing any active one
#[derive(Debug, Clone)]
pub struct Login {
    /// Login e-mail
    pub email: String,
    /// Password attempt
    pub password: String,
}

/// Why login failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// No such account
    #[error("E-mail {email} is not registered")]
    EmailNotRegistered {
        /// Attempted e-mail
        email: String,
    },

    /// Password did not match
    #[error("Wrong password for {email}")]
    WrongPassword {
        /// Attempted e-mail
        email: String,
    },
}

impl Rejection for LoginError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmailNotRegistered { .. } => "USER_LOGIN_EMAIL_NOT_REGISTERED",
            Self::WrongPassword { .. } => "USER_LOGIN_WRONG_PASSWORD",
        }
    }

    fn context(&self) -> Context {
        match self {
            Self::EmailNotRegistered { email } | Self::WrongPassword { email } => {
                Context::new().with("email", email.as_str()).with_masked("password")
            }
        }
    }
}

impl Operation for Login {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    type Output = User;
    type Error = LoginError;

    const NAME: &'static str = "Login";

    fn execute(self, state: &mut TicketingState, _env: &TicketingEnvironment) -> Result<Applied<User>, LoginError> {
        let Some(user) = state.users.get(&self.email) else {
            return Err(LoginError::EmailNotRegistered { email: self.email });
        };
        if !user.password().matches(&self.password) {
            return Err(LoginError::WrongPassword { email: self.email });
        }

        let user = user.clone();
        state.session = Some(self.email);

        let report = Report::new(
            "USER_LOGIN_SUCCESS",
            Context::new()
                .with("email", user.email())
                .with("role", user.role())
                .with_masked("password"),
        );
        Ok(Applied::new(user, report))
    }
}

/// Ends the session. Always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logout;

impl Operation for Logout {
    type State = TicketingState;
    type Environment = TicketingEnvironment;
    /// E-mail of the user that was logged in
    type Output = Option<String>;
    type Error = Infallible;

    const NAME: &'static str = "Logout";

    fn execute(self, state: &mut TicketingState, _env: &TicketingEnvironment) -> Result<Applied<Option<String>>, Infallible> {
        let previous = state.session.take();
        let report = Report::new("USER_LOGOUT_SUCCESS", Context::new().with("user", previous.clone()));
        Ok(Applied::new(previous, report))
    }
}
