//! Tag registry.
//!
//! A tag is a named attribute with an enumerated value set and a default. The
//! registry only grows: a name is never removed or redefined.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Registry entry: allowed values and the default
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTag {
    /// Allowed values, at least two
    pub values: BTreeSet<String>,
    /// Member of `values` assumed when an event does not declare the tag
    pub default_value: String,
}

/// Tag name to selected value.
///
/// Used both for an event's declared attributes and a consumer's preferences.
/// Carries no validation of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTagCollection(BTreeMap<String, String>);

impl EventTagCollection {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces a pair
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Selected value for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns true if nothing is selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pairs
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for EventTagCollection {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for EventTagCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Parses `name=value` pairs separated by commas, e.g.
/// `hasSocialDistancing=true,venueCapacity=200`. An empty string is an
/// empty collection.
impl FromStr for EventTagCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                pair.split_once('=')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                    .filter(|(name, value)| !name.is_empty() && !value.is_empty())
                    .ok_or_else(|| format!("malformed tag pair: {pair}"))
            })
            .collect()
    }
}

/// Why a tag could not be registered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Name already registered
    #[error("Tag {name} already exists")]
    TagExists {
        /// Requested name
        name: String,
    },

    /// Fewer than two allowed values
    #[error("Tag {name} needs at least two values, got {count}")]
    NotEnoughValues {
        /// Requested name
        name: String,
        /// Number of values supplied
        count: usize,
    },

    /// Default is not one of the allowed values
    #[error("Default value {default_value} is not an allowed value of {name}")]
    DefaultNotAllowed {
        /// Requested name
        name: String,
        /// Rejected default
        default_value: String,
    },
}

/// All registered tags, keyed by name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRegistry(BTreeMap<String, EventTag>);

impl Default for TagRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}

impl TagRegistry {
    /// Registry with no tags
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Registry holding the baseline venue tags
    #[must_use]
    pub fn seeded() -> Self {
        let yes_no = values(["true", "false"]);
        let mut tags = BTreeMap::new();
        tags.insert(
            "hasSocialDistancing".to_string(),
            EventTag {
                values: yes_no.clone(),
                default_value: "false".to_string(),
            },
        );
        tags.insert(
            "hasAirFiltration".to_string(),
            EventTag {
                values: yes_no,
                default_value: "false".to_string(),
            },
        );
        tags.insert(
            "venueCapacity".to_string(),
            EventTag {
                values: values(["<20", "20-100", "100-200", "200"]),
                default_value: "<20".to_string(),
            },
        );
        Self(tags)
    }

    /// Checks whether a tag could be registered without changing anything
    ///
    /// # Errors
    ///
    /// See [`TagRegistry::register`].
    pub fn check(&self, name: &str, allowed: &BTreeSet<String>, default_value: &str) -> Result<(), TagError> {
        if self.0.contains_key(name) {
            return Err(TagError::TagExists { name: name.to_string() });
        }
        if allowed.len() < 2 {
            return Err(TagError::NotEnoughValues {
                name: name.to_string(),
                count: allowed.len(),
            });
        }
        if !allowed.contains(default_value) {
            return Err(TagError::DefaultNotAllowed {
                name: name.to_string(),
                default_value: default_value.to_string(),
            });
        }
        Ok(())
    }

    /// Registers a new tag
    ///
    /// # Errors
    ///
    /// - [`TagError::TagExists`] if `name` is taken
    /// - [`TagError::NotEnoughValues`] if fewer than two values are allowed
    /// - [`TagError::DefaultNotAllowed`] if the default is not an allowed value
    pub fn register(
        &mut self,
        name: impl Into<String>,
        allowed: BTreeSet<String>,
        default_value: impl Into<String>,
    ) -> Result<EventTag, TagError> {
        let name = name.into();
        let default_value = default_value.into();
        self.check(&name, &allowed, &default_value)?;

        let tag = EventTag {
            values: allowed,
            default_value,
        };
        self.0.insert(name, tag.clone());
        Ok(tag)
    }

    /// Inserts an entry that is already known to be absent and well formed
    pub(crate) fn insert_unchecked(&mut self, name: String, tag: EventTag) {
        self.0.entry(name).or_insert(tag);
    }

    /// Looks up a tag
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EventTag> {
        self.0.get(name)
    }

    /// Returns true if `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Every pair names a registered tag and one of its allowed values.
    ///
    /// An empty collection always validates.
    #[must_use]
    pub fn validate(&self, collection: &EventTagCollection) -> bool {
        self.first_invalid(collection).is_none()
    }

    /// The first pair that does not validate, if any
    #[must_use]
    pub fn first_invalid<'a>(&self, collection: &'a EventTagCollection) -> Option<(&'a str, &'a str)> {
        collection.iter().find(|(name, value)| {
            self.0
                .get(*name)
                .is_none_or(|tag| !tag.values.contains(*value))
        })
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventTag)> {
        self.0.iter().map(|(name, tag)| (name.as_str(), tag))
    }

    /// Number of registered tags
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds a value set from string literals
#[must_use]
pub fn values<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
    items.iter().map(|v| (*v).to_string()).collect()
}
