//! Ticketing engine demo.
//!
//! Runs a short organiser/consumer session against a fresh state and saves a
//! snapshot of the result.

use anyhow::Context as _;
use chrono::{Duration, Utc};
use ticketbook_core::outcome::Rejection;
use ticketbook_runtime::metrics::MetricsServer;
use ticketing::mapping::TransportMode;
use ticketing::operations::{
    BookEvent, CancelBooking, CreateEvent, GetEventDirections, ListEventsByDistance, Login, Logout, RegisterConsumer,
    RegisterStaff, SaveSnapshot,
};
use ticketing::types::Password;
use ticketing::{Config, EventCategory, EventTagCollection, TicketingState, TicketingStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ORGANISER: &str = "organiser@example.org";
const CONSUMER: &str = "alice@example.org";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.filter)
                .unwrap_or_else(|_| "ticketing=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        snapshot_dir = %config.snapshots.dir.display(),
        cancellation_window_hours = config.policy.cancellation_window_hours,
        metrics = config.metrics.enabled,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new();
    if config.metrics.enabled {
        metrics.start().context("installing metrics recorder")?;
    }

    let store = TicketingStore::new(TicketingState::new(), config.environment());

    // Organiser publishes an event
    store
        .send(RegisterStaff {
            email: ORGANISER.to_string(),
            password: Password::new("organiser-password"),
            secret: config.policy.staff_secret.clone(),
        })
        .await?;
    let start = Utc::now() + Duration::days(7);
    let event = store
        .send(CreateEvent {
            title: "Evening Recital".to_string(),
            category: EventCategory::Music,
            ticket_cap: 120,
            price_minor: 1_850,
            venue_address: Some("55.9469 -3.2058".to_string()),
            description: "Chamber music in the main hall".to_string(),
            start,
            end: start + Duration::hours(2),
            tags: EventTagCollection::new().with("hasAirFiltration", "true"),
        })
        .await?;
    info!(event = %event.number, price = %event.price, "Event published");
    store.send(Logout).await?;

    // Consumer books, looks for directions, then changes their mind
    store
        .send(RegisterConsumer {
            name: "Alice".to_string(),
            email: CONSUMER.to_string(),
            phone: "0131 496 0000".to_string(),
            address: Some("55.9486 -3.1999".to_string()),
            password: Password::new("alice-password"),
        })
        .await?;

    if let Err(error) = store
        .send(BookEvent {
            event_number: event.number,
            tickets: 500,
        })
        .await
    {
        let code = error.rejection().map_or("SHUTDOWN", Rejection::code);
        warn!(code, "Oversized booking refused");
    }

    let booking = store
        .send(BookEvent {
            event_number: event.number,
            tickets: 2,
        })
        .await?;

    let nearby = store
        .send(ListEventsByDistance {
            user_events_only: true,
            active_only: true,
            on_date: None,
            mode: TransportMode::Foot,
            max_distance_m: 5_000.0,
        })
        .await?;
    info!(count = nearby.len(), "Events within walking distance");

    for line in store
        .send(GetEventDirections {
            event_number: event.number,
            mode: TransportMode::Foot,
        })
        .await?
    {
        info!("{line}");
    }

    store
        .send(CancelBooking {
            booking_number: booking.number,
        })
        .await?;
    store.send(Logout).await?;

    // Organiser takes a backup
    store
        .send(Login {
            email: ORGANISER.to_string(),
            password: "organiser-password".to_string(),
        })
        .await?;
    let bytes = store
        .send(SaveSnapshot {
            name: "demo.snapshot".to_string(),
        })
        .await?;
    info!(bytes, "Snapshot saved");

    let remaining = store.state(|state| state.remaining_tickets(event.number)).await;
    info!(?remaining, "Final inventory");

    if let Some(rendered) = metrics.render() {
        println!("{rendered}");
    }

    store.shutdown();
    Ok(())
}
