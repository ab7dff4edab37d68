use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// region:    --- Vehicle

/// A lot under auction. `version` is the optimistic-concurrency token: every
/// committed mutation bumps it, and a commit is only accepted against the
/// version that was read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starting_price: Decimal,
    pub current_price: Decimal,
    pub auction_end: DateTime<Utc>,
    pub is_open: bool,
    pub owner_id: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// Public view of a vehicle, as served by the listing endpoints and
    /// carried inside `LotAdded` events.
    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            starting_price: self.starting_price,
            current_price: self.current_price,
            auction_end: self.auction_end,
            is_open: self.is_open,
            owner_id: self.owner_id,
        }
    }
}

/// Vehicle as exposed at the API boundary (no version token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starting_price: Decimal,
    pub current_price: Decimal,
    pub auction_end: DateTime<Utc>,
    pub is_open: bool,
    pub owner_id: Option<i64>,
}

// endregion: --- Vehicle

// region:    --- Bid

/// An accepted bid. Append-only; never amended, and removed only by the
/// administrative cascade that deletes the owning vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub vehicle_id: i64,
    pub bidder_id: i64,
    pub amount: Decimal,
    pub placed_at: DateTime<Utc>,
}

// endregion: --- Bid

// region:    --- Bidder

/// Identity reference resolved from the ledger. Credentials and sessions are
/// managed elsewhere; the engine only needs existence, the admin flag, and a
/// display name for `BidAccepted` events.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bidder {
    pub id: i64,
    pub name: String,
    pub is_admin: bool,
}

// endregion: --- Bidder
