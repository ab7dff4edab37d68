// region:    --- Imports
use crate::bidding::model::{Bid, Bidder, Vehicle};
use crate::error::LedgerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
// endregion: --- Imports

pub mod memory;
pub mod postgres;
mod queries;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

// region:    --- Mutations

/// Mutations applied through `compare_and_commit`. Both carry their own
/// commit-time guard: a bid re-checks `is_open` and the deadline inside the
/// atomic unit, a finalization only applies while `is_open` is still true.
#[derive(Debug, Clone)]
pub enum VehicleMutation {
    /// Append a bid and raise `current_price` to its amount.
    AcceptBid {
        bidder_id: i64,
        amount: Decimal,
        placed_at: DateTime<Utc>,
    },
    /// Close the auction, awarding the vehicle if a winner exists.
    Finalize { owner_id: Option<i64> },
}

/// Result of a compare-and-commit attempt.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Applied. `vehicle` is the post-commit row; `bid` is the appended bid
    /// for `AcceptBid` mutations.
    Committed {
        vehicle: Vehicle,
        bid: Option<Bid>,
    },
    /// The version token no longer matched; the caller saw stale state.
    Conflict,
    /// The vehicle is missing or its commit-time guard failed (closed or
    /// past deadline while the token still matched).
    Gone,
}

// endregion: --- Mutations

// region:    --- Ledger Trait

/// The durable record of vehicles, bids and bidders. Exposes snapshot reads
/// with a version token and atomic compare-and-commit per vehicle; this is
/// the only suspension point in the bidding path.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current vehicle state, version token included.
    async fn read(&self, vehicle_id: i64) -> Result<Option<Vehicle>, LedgerError>;

    /// Atomically apply `mutation` if the vehicle's version still equals
    /// `expected_version` and the mutation's own guard holds.
    async fn compare_and_commit(
        &self,
        vehicle_id: i64,
        expected_version: i64,
        mutation: VehicleMutation,
    ) -> Result<CommitOutcome, LedgerError>;

    /// Open vehicles whose deadline has not passed, newest first.
    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError>;

    /// Open vehicles whose deadline has passed: the sweeper's worklist.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError>;

    /// Highest bid for a vehicle; ties (a symptom of an admission bug, not
    /// a normal state) break deterministically to the lowest bid id.
    async fn highest_bid(&self, vehicle_id: i64) -> Result<Option<Bid>, LedgerError>;

    /// All bids for a vehicle, most recent first.
    async fn bid_history(&self, vehicle_id: i64) -> Result<Vec<Bid>, LedgerError>;

    /// Administrative insert; `current_price` starts at `starting_price`.
    async fn create_vehicle(&self, new: NewVehicle) -> Result<Vehicle, LedgerError>;

    /// Administrative delete, cascading to dependent bids. Returns false if
    /// the vehicle did not exist.
    async fn remove_vehicle(&self, vehicle_id: i64) -> Result<bool, LedgerError>;

    /// Administrative deadline change; past bids are not re-validated.
    async fn reschedule_vehicle(
        &self,
        vehicle_id: i64,
        auction_end: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, LedgerError>;

    /// Resolve a bidder identity.
    async fn bidder(&self, bidder_id: i64) -> Result<Option<Bidder>, LedgerError>;
}

/// Fields supplied by the administrative create operation.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub starting_price: Decimal,
    pub auction_end: DateTime<Utc>,
}

// endregion: --- Ledger Trait
