// region:    --- Imports
use crate::ledger::{CommitOutcome, Ledger, VehicleMutation};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};
// endregion: --- Imports

// region:    --- Finalization Sweeper

/// Per-lot retry bound when a late bid bumps the version mid-finalization.
const MAX_FINALIZE_RETRIES: u32 = 4;

/// Closes expired auctions and awards vehicles to their highest bidders.
/// Each lot's closure is one compare-and-commit keyed on `is_open`, so a
/// crash or a concurrent sweep can never award twice, and re-running over
/// already-closed lots is a no-op.
pub struct FinalizationSweeper {
    ledger: Arc<dyn Ledger>,
}

impl FinalizationSweeper {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Spawn the fixed-interval sweep task.
    pub fn start(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                self.sweep(Utc::now()).await;
            }
        });
    }

    /// One pass over every open lot whose deadline has passed. Returns the
    /// ids that were finalized. Failures on one lot are logged and skipped;
    /// the rest of the sweep proceeds.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<i64> {
        let expired = match self.ledger.list_expired(now).await {
            Ok(expired) => expired,
            Err(e) => {
                error!("{:<12} --> failed to list expired lots: {:?}", "Sweeper", e);
                return Vec::new();
            }
        };

        let mut finalized = Vec::new();
        for vehicle in expired {
            match self.finalize_one(vehicle.id, vehicle.version).await {
                Ok(true) => finalized.push(vehicle.id),
                Ok(false) => {}
                Err(e) => {
                    error!(
                        "{:<12} --> failed to finalize vehicle {}: {:?}",
                        "Sweeper", vehicle.id, e
                    );
                }
            }
        }
        if !finalized.is_empty() {
            info!("{:<12} --> finalized {} lot(s)", "Sweeper", finalized.len());
        }
        finalized
    }

    /// Close a single lot, awarding it to the highest bidder if any bid
    /// exists. Retries a bounded number of times when a bid that slipped in
    /// before the deadline bumps the version under us.
    async fn finalize_one(
        &self,
        vehicle_id: i64,
        mut expected_version: i64,
    ) -> Result<bool, crate::error::LedgerError> {
        let mut retries = 0;
        loop {
            let winner = self.ledger.highest_bid(vehicle_id).await?;
            let owner_id = winner.as_ref().map(|bid| bid.bidder_id);

            let outcome = self
                .ledger
                .compare_and_commit(
                    vehicle_id,
                    expected_version,
                    VehicleMutation::Finalize { owner_id },
                )
                .await?;

            match outcome {
                CommitOutcome::Committed { vehicle, .. } => {
                    info!(
                        "{:<12} --> vehicle {} closed, owner: {:?}, final price: {}",
                        "Sweeper", vehicle.id, vehicle.owner_id, vehicle.current_price
                    );
                    return Ok(true);
                }
                CommitOutcome::Conflict if retries < MAX_FINALIZE_RETRIES => {
                    retries += 1;
                    match self.ledger.read(vehicle_id).await? {
                        Some(fresh) if fresh.is_open => expected_version = fresh.version,
                        _ => return Ok(false),
                    }
                }
                CommitOutcome::Conflict => {
                    warn!(
                        "{:<12} --> vehicle {} kept moving during finalization, deferring to next sweep",
                        "Sweeper", vehicle_id
                    );
                    return Ok(false);
                }
                CommitOutcome::Gone => {
                    // Already closed by a competing sweep, or removed.
                    debug!(
                        "{:<12} --> vehicle {} already finalized or gone",
                        "Sweeper", vehicle_id
                    );
                    return Ok(false);
                }
            }
        }
    }
}

// endregion: --- Finalization Sweeper

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
    use crate::hub::BroadcastHub;
    use crate::ledger::{MemoryLedger, NewVehicle};
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn vehicle_ending_at(
        ledger: &MemoryLedger,
        auction_end: DateTime<Utc>,
    ) -> crate::bidding::model::Vehicle {
        ledger
            .create_vehicle(NewVehicle {
                title: "Hatchback".to_string(),
                description: None,
                image_url: None,
                starting_price: dec!(1000),
                auction_end,
            })
            .await
            .unwrap()
    }

    async fn bid(ledger: &Arc<MemoryLedger>, vehicle_id: i64, bidder_id: i64, amount: Decimal) {
        let hub = BroadcastHub::new();
        handle_place_bid(
            PlaceBidCommand {
                vehicle_id,
                bidder_id,
                amount,
            },
            &**ledger,
            &hub,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn closes_an_expired_lot_with_no_bids_and_no_owner() {
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let deadline = Utc::now() - ChronoDuration::seconds(1);
        let v = vehicle_ending_at(&ledger, deadline).await;

        let sweeper = FinalizationSweeper::new(ledger.clone());
        let finalized = sweeper.sweep(deadline + ChronoDuration::seconds(1)).await;
        assert_eq!(finalized, vec![v.id]);

        let closed = ledger.read(v.id).await.unwrap().unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.owner_id, None);
        assert_eq!(closed.current_price, dec!(1000));
    }

    #[tokio::test]
    async fn awards_the_highest_bidder_and_keeps_the_final_price() {
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let alice = ledger.add_bidder("alice", false).await;
        let bob = ledger.add_bidder("bob", false).await;
        let deadline = Utc::now() + ChronoDuration::seconds(30);
        let v = vehicle_ending_at(&ledger, deadline).await;

        bid(&ledger, v.id, alice.id, dec!(1200)).await;
        bid(&ledger, v.id, bob.id, dec!(1500)).await;
        // dec!(1400) from anyone would now be rejected TooLow; simulate the
        // rejection path by asserting the price instead of forcing a bid.
        let before = ledger.read(v.id).await.unwrap().unwrap();
        assert_eq!(before.current_price, dec!(1500));

        let sweeper = FinalizationSweeper::new(ledger.clone());
        let finalized = sweeper.sweep(deadline + ChronoDuration::seconds(1)).await;
        assert_eq!(finalized, vec![v.id]);

        let closed = ledger.read(v.id).await.unwrap().unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.owner_id, Some(bob.id));
        assert_eq!(closed.current_price, dec!(1500));
    }

    #[tokio::test]
    async fn sweeping_twice_is_idempotent() {
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let deadline = Utc::now() - ChronoDuration::seconds(1);
        let v = vehicle_ending_at(&ledger, deadline).await;

        let sweeper = FinalizationSweeper::new(ledger.clone());
        let now = Utc::now();
        assert_eq!(sweeper.sweep(now).await, vec![v.id]);
        let after_first = ledger.read(v.id).await.unwrap().unwrap();

        assert!(sweeper.sweep(now).await.is_empty());
        let after_second = ledger.read(v.id).await.unwrap().unwrap();
        assert_eq!(after_first.version, after_second.version);
        assert_eq!(after_first.owner_id, after_second.owner_id);
    }

    #[tokio::test]
    async fn leaves_unexpired_lots_alone() {
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let v = vehicle_ending_at(&ledger, Utc::now() + ChronoDuration::hours(1)).await;

        let sweeper = FinalizationSweeper::new(ledger.clone());
        assert!(sweeper.sweep(Utc::now()).await.is_empty());
        assert!(ledger.read(v.id).await.unwrap().unwrap().is_open);
    }

    #[tokio::test]
    async fn concurrent_sweeps_award_exactly_once() {
        let ledger: Arc<MemoryLedger> = Arc::new(MemoryLedger::new());
        let alice = ledger.add_bidder("alice", false).await;
        let deadline = Utc::now() + ChronoDuration::seconds(30);
        let v = vehicle_ending_at(&ledger, deadline).await;
        bid(&ledger, v.id, alice.id, dec!(2000)).await;

        let now = deadline + ChronoDuration::seconds(1);
        let a = {
            let sweeper = FinalizationSweeper::new(ledger.clone());
            tokio::spawn(async move { sweeper.sweep(now).await })
        };
        let b = {
            let sweeper = FinalizationSweeper::new(ledger.clone());
            tokio::spawn(async move { sweeper.sweep(now).await })
        };

        let total = a.await.unwrap().len() + b.await.unwrap().len();
        assert_eq!(total, 1, "exactly one sweep may claim the finalization");

        let closed = ledger.read(v.id).await.unwrap().unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.owner_id, Some(alice.id));
    }
}

// endregion: --- Tests
