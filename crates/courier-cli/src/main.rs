//! courier-cli: in-memory demo of the delivery lifecycle.
//!
//! Registers a sender, a receiver and N riders, creates one delivery, lets all
//! riders race to accept it, then drives the winner through pickup and
//! drop-off. Prints the final delivery and status counts as JSON.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use courier_core::app::{Actor, CourierBuilder, CreateDelivery};
use courier_core::config::CourierConfig;
use courier_core::domain::{AddressPayload, Coordinates, ImageRef, Vehicle};
use courier_core::impls::UserCore;
use courier_core::ports::TracingEventSink;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(config: &CourierConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    let config = CourierConfig::from_env()?;
    init_tracing(&config);

    let riders = config.demo_riders.max(1);
    let courier = CourierBuilder::new(config)
        .with_event_sink(Arc::new(TracingEventSink))
        .with_store_latency(Duration::from_millis(2))
        .build()?;

    // (A) customers
    let (sender, sender_address_id) = courier
        .directory
        .register_customer(
            UserCore::new("Malee", "0811111111"),
            AddressPayload::new("12 Silom Rd, Bang Rak", Coordinates::new(13.7291, 100.5340)),
        )
        .await?;
    let (receiver, receiver_address_id) = courier
        .directory
        .register_customer(
            UserCore::new("Niran", "0822222222"),
            AddressPayload::new("7 Sukhumvit Soi 11", Coordinates::new(13.7445, 100.5560)),
        )
        .await?;
    courier.identity.issue("token-sender", sender.clone());

    // (B) riders, each resolved through a bearer token like a request would be
    let mut actors: Vec<Actor> = Vec::with_capacity(riders);
    for n in 0..riders {
        let phone = format!("089{n:07}");
        let rider = courier
            .directory
            .register_rider(
                UserCore::new(format!("Rider {n}"), phone.clone()),
                Vehicle {
                    registration: format!("{n}กข {n:04}"),
                    image: None,
                },
            )
            .await?;
        let token = format!("token-rider-{n}");
        courier.identity.issue(token.clone(), rider);
        let header = format!("Bearer {token}");
        actors.push(courier.sessions.resolve_header(Some(header.as_str())).await?);
    }

    // (C) one delivery
    let sender_actor = courier.sessions.resolve("token-sender").await?;
    let id = courier
        .lifecycle
        .create_delivery(CreateDelivery {
            sender_id: sender_actor.require_customer()?.clone(),
            receiver_id: receiver,
            sender_address_id,
            receiver_address_id,
            item_description: "Signed contract, A4 envelope".to_string(),
            item_image: ImageRef::new("items/contract.jpg"),
            rider_note_image: None,
        })
        .await?;
    info!(delivery_id = %id, riders, "delivery created, riders racing");

    // (D) every rider tries to claim it at once
    let handles: Vec<_> = actors
        .iter()
        .map(|actor| {
            let lifecycle = courier.lifecycle.clone();
            let actor = actor.clone();
            tokio::spawn(async move {
                let rider_id = actor.require_rider()?.clone();
                let result = lifecycle.accept_delivery(id, &rider_id).await;
                Ok::<_, Box<dyn Error + Send + Sync>>((rider_id, result))
            })
        })
        .collect();

    let mut winner = None;
    let mut conflicts = 0usize;
    for handle in handles {
        let (rider_id, result) = handle.await?.map_err(|err| err.to_string())?;
        match result {
            Ok(_) => winner = Some(rider_id),
            Err(err) if err.is_conflict() => conflicts += 1,
            Err(err) => warn!(rider_id = %rider_id, error = %err, "accept failed"),
        }
    }
    let winner = winner.ok_or("no rider managed to accept the delivery")?;
    info!(rider_id = %winner, conflicts, "claim settled");

    // (E) the winner finishes the job
    courier
        .lifecycle
        .confirm_pickup(id, &winner, ImageRef::new("pickup/contract.jpg"))
        .await?;
    let delivered = courier
        .lifecycle
        .confirm_delivery(id, &winner, ImageRef::new("delivered/contract.jpg"))
        .await?;

    let counts = courier.lifecycle.status_counts().await?;
    println!("{}", serde_json::to_string_pretty(&delivered)?);
    println!(
        "{}",
        serde_json::json!({
            "winner": winner,
            "conflicts": conflicts,
            "counts": counts,
        })
    );
    Ok(())
}
