// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::bidding::model::Vehicle;
use crate::error::AdminError;
use crate::hub::BroadcastHub;
use crate::ledger::{Ledger, NewVehicle};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
// endregion: --- Imports

// region:    --- Commands

/// Administrative insert of a vehicle into the catalog.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateVehicleCommand {
    pub admin_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starting_price: Decimal,
    pub auction_end: DateTime<Utc>,
}

async fn require_admin(ledger: &dyn Ledger, admin_id: i64) -> Result<(), AdminError> {
    match ledger.bidder(admin_id).await? {
        Some(identity) if identity.is_admin => Ok(()),
        _ => Err(AdminError::Unauthorized),
    }
}

/// Add a vehicle to the catalog and announce it to every observer.
pub async fn handle_create_vehicle(
    cmd: CreateVehicleCommand,
    ledger: &dyn Ledger,
    hub: &BroadcastHub,
) -> Result<Vehicle, AdminError> {
    info!("{:<12} --> create vehicle: {}", "Catalog", cmd.title);
    require_admin(ledger, cmd.admin_id).await?;
    if cmd.starting_price <= Decimal::ZERO {
        return Err(AdminError::InvalidStartingPrice);
    }

    let vehicle = ledger
        .create_vehicle(NewVehicle {
            title: cmd.title,
            description: cmd.description,
            image_url: cmd.image_url,
            starting_price: cmd.starting_price,
            auction_end: cmd.auction_end,
        })
        .await?;

    hub.broadcast(&AuctionEvent::LotAdded {
        vehicle: vehicle.snapshot(),
    })
    .await;
    Ok(vehicle)
}

/// Remove a vehicle (its bids cascade with it) and announce the removal.
pub async fn handle_remove_vehicle(
    admin_id: i64,
    vehicle_id: i64,
    ledger: &dyn Ledger,
    hub: &BroadcastHub,
) -> Result<(), AdminError> {
    info!("{:<12} --> remove vehicle: {}", "Catalog", vehicle_id);
    require_admin(ledger, admin_id).await?;

    if !ledger.remove_vehicle(vehicle_id).await? {
        return Err(AdminError::NotFound);
    }
    hub.broadcast(&AuctionEvent::LotRemoved { vehicle_id }).await;
    Ok(())
}

/// Move a vehicle's deadline. Past bids are not re-validated and no event
/// is published.
pub async fn handle_reschedule_vehicle(
    admin_id: i64,
    vehicle_id: i64,
    auction_end: DateTime<Utc>,
    ledger: &dyn Ledger,
) -> Result<Vehicle, AdminError> {
    info!(
        "{:<12} --> reschedule vehicle {} to {}",
        "Catalog", vehicle_id, auction_end
    );
    require_admin(ledger, admin_id).await?;

    ledger
        .reschedule_vehicle(vehicle_id, auction_end)
        .await?
        .ok_or(AdminError::NotFound)
}

// endregion: --- Commands

// region:    --- Tests


// endregion: --- Tests
