// region:    --- Imports
use crate::bidding::model::{Bid, Bidder, Vehicle};
use crate::error::LedgerError;
use crate::ledger::{queries, CommitOutcome, Ledger, NewVehicle, VehicleMutation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;
// endregion: --- Imports

// region:    --- Postgres Ledger

/// Production ledger backed by Postgres. Compare-and-commit is a guarded
/// `UPDATE .. WHERE version = $expected` plus the dependent insert in a
/// single transaction.
pub struct PgLedger {
    pool: Arc<PgPool>,
}

impl PgLedger {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Create the schema if it does not exist yet.
    pub async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let schema_sql = include_str!("../sql/01-create-schema.sql");
        for query in schema_sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        info!("{:<12} --> schema ready", "Ledger");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A CAS update matched no row: either the token went stale or the
    /// guard failed while the token still matched. The distinction decides
    /// whether the caller retries.
    async fn classify_miss(&self, vehicle_id: i64, expected_version: i64) -> Result<CommitOutcome, LedgerError> {
        let version: Option<i64> = sqlx::query_scalar(queries::GET_VERSION)
            .bind(vehicle_id)
            .fetch_optional(&*self.pool)
            .await?;
        match version {
            Some(v) if v != expected_version => Ok(CommitOutcome::Conflict),
            Some(_) => Ok(CommitOutcome::Gone),
            None => Ok(CommitOutcome::Gone),
        }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn read(&self, vehicle_id: i64) -> Result<Option<Vehicle>, LedgerError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(queries::GET_VEHICLE)
            .bind(vehicle_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn compare_and_commit(
        &self,
        vehicle_id: i64,
        expected_version: i64,
        mutation: VehicleMutation,
    ) -> Result<CommitOutcome, LedgerError> {
        match mutation {
            VehicleMutation::AcceptBid {
                bidder_id,
                amount,
                placed_at,
            } => {
                let mut tx = self.pool.begin().await?;
                let vehicle = sqlx::query_as::<_, Vehicle>(queries::CAS_ACCEPT_BID)
                    .bind(vehicle_id)
                    .bind(expected_version)
                    .bind(amount)
                    .bind(placed_at)
                    .fetch_optional(&mut *tx)
                    .await?;
                let Some(vehicle) = vehicle else {
                    tx.rollback().await?;
                    return self.classify_miss(vehicle_id, expected_version).await;
                };
                let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                    .bind(vehicle_id)
                    .bind(bidder_id)
                    .bind(amount)
                    .bind(placed_at)
                    .fetch_one(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok(CommitOutcome::Committed {
                    vehicle,
                    bid: Some(bid),
                })
            }
            VehicleMutation::Finalize { owner_id } => {
                let vehicle = sqlx::query_as::<_, Vehicle>(queries::CAS_FINALIZE)
                    .bind(vehicle_id)
                    .bind(expected_version)
                    .bind(owner_id)
                    .fetch_optional(&*self.pool)
                    .await?;
                match vehicle {
                    Some(vehicle) => Ok(CommitOutcome::Committed { vehicle, bid: None }),
                    None => self.classify_miss(vehicle_id, expected_version).await,
                }
            }
        }
    }

    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(queries::LIST_ACTIVE)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(queries::LIST_EXPIRED)
            .bind(now)
            .fetch_all(&*self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn highest_bid(&self, vehicle_id: i64) -> Result<Option<Bid>, LedgerError> {
        let bid = sqlx::query_as::<_, Bid>(queries::HIGHEST_BID)
            .bind(vehicle_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(bid)
    }

    async fn bid_history(&self, vehicle_id: i64) -> Result<Vec<Bid>, LedgerError> {
        let bids = sqlx::query_as::<_, Bid>(queries::BID_HISTORY)
            .bind(vehicle_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(bids)
    }

    async fn create_vehicle(&self, new: NewVehicle) -> Result<Vehicle, LedgerError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(queries::INSERT_VEHICLE)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.image_url)
            .bind(new.starting_price)
            .bind(new.auction_end)
            .fetch_one(&*self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn remove_vehicle(&self, vehicle_id: i64) -> Result<bool, LedgerError> {
        let result = sqlx::query(queries::DELETE_VEHICLE)
            .bind(vehicle_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reschedule_vehicle(
        &self,
        vehicle_id: i64,
        auction_end: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, LedgerError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(queries::RESCHEDULE_VEHICLE)
            .bind(vehicle_id)
            .bind(auction_end)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn bidder(&self, bidder_id: i64) -> Result<Option<Bidder>, LedgerError> {
        let bidder = sqlx::query_as::<_, Bidder>(queries::GET_BIDDER)
            .bind(bidder_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(bidder)
    }
}

// endregion: --- Postgres Ledger
