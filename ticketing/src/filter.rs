//! Preference, date and distance filters. Pure functions over the catalog.

use crate::mapping::{GeoPoint, MapError, MapService, TransportMode};
use crate::tags::{EventTagCollection, TagRegistry};
use crate::types::Event;
use chrono::NaiveDate;

/// Whether `event` satisfies every stated preference.
///
/// A tag the event does not declare counts as its registered default. An
/// empty preference collection matches everything.
#[must_use]
pub fn satisfies_preferences(registry: &TagRegistry, preferences: &EventTagCollection, event: &Event) -> bool {
    preferences.iter().all(|(name, wanted)| match event.tags.get(name) {
        Some(declared) => declared == wanted,
        None => registry.get(name).is_some_and(|tag| tag.default_value == wanted),
    })
}

/// Date filter.
///
/// Matches if the event starts on `date`, ends after it, or `date` is before
/// the start or end date. The last two clauses overlap the second, so this
/// admits every event that has not finished before `date`.
#[must_use]
pub fn occurs_on(event: &Event, date: NaiveDate) -> bool {
    event.start_date() == date || event.end_date() > date || date < event.start_date() || date < event.end_date()
}

/// Applies the active-only and date filters, keeping catalog order
pub fn filter_events<'a, I>(events: I, active_only: bool, on_date: Option<NaiveDate>) -> Vec<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .filter(|event| !active_only || event.is_active())
        .filter(|event| on_date.is_none_or(|date| occurs_on(event, date)))
        .collect()
}

/// Keeps events whose route from `origin` is at most `max_distance_m` and
/// orders them nearest first. Events without a venue are dropped. Ties keep
/// catalog order.
///
/// # Errors
///
/// Returns the first mapping failure; nothing is retried.
pub fn rank_by_distance<'a>(
    events: Vec<&'a Event>,
    map: &dyn MapService,
    mode: TransportMode,
    max_distance_m: f64,
    origin: GeoPoint,
) -> Result<Vec<(&'a Event, f64)>, MapError> {
    let mut ranked = Vec::with_capacity(events.len());
    for event in events {
        let Some(address) = event.venue_address.as_deref() else {
            continue;
        };
        let venue = map.to_coordinates(address)?;
        let distance = map.route(mode, origin, venue)?.distance_m;
        if distance <= max_distance_m {
            ranked.push((event, distance));
        }
    }
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(ranked)
}
