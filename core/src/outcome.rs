//! Outcome reporting types.
//!
//! Every dispatched operation produces exactly one terminal [`Report`]: either
//! its success report or the failure code and context of its [`Rejection`].

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Value substituted for secrets in every context map
pub const MASKED: &str = "***";

/// Named values describing why an outcome fired.
///
/// Keys are ordered so rendered contexts are stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<&'static str, Value>);

impl Context {
    /// Creates an empty context
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a named value
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    /// Adds a named value that must never be echoed, e.g. a password
    #[must_use]
    pub fn with_masked(self, key: &'static str) -> Self {
        self.with(key, MASKED)
    }

    /// Adds any serializable value, falling back to its debug rendering
    #[must_use]
    pub fn with_serialized<T: Serialize + fmt::Debug>(self, key: &'static str, value: &T) -> Self {
        let rendered = serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{value:?}")));
        self.with(key, rendered)
    }

    /// Looks up a named value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the context carries no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// An outcome tag plus its context.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Stable outcome name, e.g. `BOOK_EVENT_SUCCESS`
    pub tag: &'static str,
    /// Values describing the outcome
    pub context: Context,
}

impl Report {
    /// Creates a report
    #[must_use]
    pub const fn new(tag: &'static str, context: Context) -> Self {
        Self { tag, context }
    }
}

/// Contract every operation failure type fulfils.
///
/// Each variant of an implementing enum is one named outcome.
pub trait Rejection: std::error::Error {
    /// Stable failure code reported to the result sink
    fn code(&self) -> &'static str;

    /// Decision data that explains the failure
    fn context(&self) -> Context;

    /// True for conditions that are not a validation outcome but an
    /// unrecoverable fault (I/O failure, corrupt input)
    fn is_fatal(&self) -> bool {
        false
    }
}

/// Operations that cannot fail (logout, review listing) use `Infallible`.
impl Rejection for std::convert::Infallible {
    fn code(&self) -> &'static str {
        match *self {}
    }

    fn context(&self) -> Context {
        match *self {}
    }
}
