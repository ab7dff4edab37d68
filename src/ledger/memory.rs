// region:    --- Imports
use crate::bidding::model::{Bid, Bidder, Vehicle};
use crate::error::LedgerError;
use crate::ledger::{CommitOutcome, Ledger, NewVehicle, VehicleMutation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
// endregion: --- Imports

// region:    --- Memory Ledger

/// In-memory ledger. A single mutex over the whole store makes every
/// compare-and-commit trivially atomic; used by the test suite and suitable
/// for deployments that do not need durability.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    vehicles: BTreeMap<i64, Vehicle>,
    bids: Vec<Bid>,
    bidders: BTreeMap<i64, Bidder>,
    next_vehicle_id: i64,
    next_bid_id: i64,
    next_bidder_id: i64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bidder identity. Identity management proper lives outside
    /// this service; this exists so tests and demos can mint identities.
    pub async fn add_bidder(&self, name: &str, is_admin: bool) -> Bidder {
        let mut store = self.inner.lock().await;
        store.next_bidder_id += 1;
        let bidder = Bidder {
            id: store.next_bidder_id,
            name: name.to_string(),
            is_admin,
        };
        store.bidders.insert(bidder.id, bidder.clone());
        bidder
    }

    /// Append a bid without admission checks, for exercising the
    /// tie-break path that correct operation never produces.
    #[cfg(test)]
    pub(crate) async fn push_bid_unchecked(&self, bid: Bid) {
        self.inner.lock().await.bids.push(bid);
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn read(&self, vehicle_id: i64) -> Result<Option<Vehicle>, LedgerError> {
        Ok(self.inner.lock().await.vehicles.get(&vehicle_id).cloned())
    }

    async fn compare_and_commit(
        &self,
        vehicle_id: i64,
        expected_version: i64,
        mutation: VehicleMutation,
    ) -> Result<CommitOutcome, LedgerError> {
        let mut store = self.inner.lock().await;
        let bid_id = store.next_bid_id + 1;
        let Some(vehicle) = store.vehicles.get_mut(&vehicle_id) else {
            return Ok(CommitOutcome::Gone);
        };
        if vehicle.version != expected_version {
            return Ok(CommitOutcome::Conflict);
        }
        match mutation {
            VehicleMutation::AcceptBid {
                bidder_id,
                amount,
                placed_at,
            } => {
                // Commit-time re-check: the lot may have closed or expired
                // since the caller validated.
                if !vehicle.is_open || placed_at >= vehicle.auction_end {
                    return Ok(CommitOutcome::Gone);
                }
                vehicle.current_price = amount;
                vehicle.version += 1;
                let vehicle = vehicle.clone();
                let bid = Bid {
                    id: bid_id,
                    vehicle_id,
                    bidder_id,
                    amount,
                    placed_at,
                };
                store.next_bid_id = bid_id;
                store.bids.push(bid.clone());
                Ok(CommitOutcome::Committed {
                    vehicle,
                    bid: Some(bid),
                })
            }
            VehicleMutation::Finalize { owner_id } => {
                if !vehicle.is_open {
                    return Ok(CommitOutcome::Gone);
                }
                vehicle.is_open = false;
                vehicle.owner_id = owner_id;
                vehicle.version += 1;
                Ok(CommitOutcome::Committed {
                    vehicle: vehicle.clone(),
                    bid: None,
                })
            }
        }
    }

    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError> {
        let store = self.inner.lock().await;
        let mut vehicles: Vec<Vehicle> = store
            .vehicles
            .values()
            .filter(|v| v.is_open && v.auction_end > now)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(vehicles)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Vehicle>, LedgerError> {
        let store = self.inner.lock().await;
        let mut vehicles: Vec<Vehicle> = store
            .vehicles
            .values()
            .filter(|v| v.is_open && v.auction_end <= now)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.auction_end.cmp(&b.auction_end));
        Ok(vehicles)
    }

    async fn highest_bid(&self, vehicle_id: i64) -> Result<Option<Bid>, LedgerError> {
        let store = self.inner.lock().await;
        let best = store
            .bids
            .iter()
            .filter(|b| b.vehicle_id == vehicle_id)
            .fold(None::<&Bid>, |best, bid| match best {
                None => Some(bid),
                Some(current)
                    if bid.amount > current.amount
                        || (bid.amount == current.amount && bid.id < current.id) =>
                {
                    Some(bid)
                }
                Some(current) => Some(current),
            });
        Ok(best.cloned())
    }

    async fn bid_history(&self, vehicle_id: i64) -> Result<Vec<Bid>, LedgerError> {
        let store = self.inner.lock().await;
        let mut bids: Vec<Bid> = store
            .bids
            .iter()
            .filter(|b| b.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
        Ok(bids)
    }

    async fn create_vehicle(&self, new: NewVehicle) -> Result<Vehicle, LedgerError> {
        let mut store = self.inner.lock().await;
        store.next_vehicle_id += 1;
        let vehicle = Vehicle {
            id: store.next_vehicle_id,
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            starting_price: new.starting_price,
            current_price: new.starting_price,
            auction_end: new.auction_end,
            is_open: true,
            owner_id: None,
            version: 0,
            created_at: Utc::now(),
        };
        store.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn remove_vehicle(&self, vehicle_id: i64) -> Result<bool, LedgerError> {
        let mut store = self.inner.lock().await;
        let removed = store.vehicles.remove(&vehicle_id).is_some();
        if removed {
            // cascade, mirroring the foreign-key behaviour of the Postgres ledger
            store.bids.retain(|b| b.vehicle_id != vehicle_id);
        }
        Ok(removed)
    }

    async fn reschedule_vehicle(
        &self,
        vehicle_id: i64,
        auction_end: DateTime<Utc>,
    ) -> Result<Option<Vehicle>, LedgerError> {
        let mut store = self.inner.lock().await;
        Ok(store.vehicles.get_mut(&vehicle_id).map(|vehicle| {
            vehicle.auction_end = auction_end;
            vehicle.version += 1;
            vehicle.clone()
        }))
    }

    async fn bidder(&self, bidder_id: i64) -> Result<Option<Bidder>, LedgerError> {
        Ok(self.inner.lock().await.bidders.get(&bidder_id).cloned())
    }
}

// endregion: --- Memory Ledger

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    async fn open_vehicle(ledger: &MemoryLedger) -> Vehicle {
        ledger
            .create_vehicle(NewVehicle {
                title: "Sedan".to_string(),
                description: None,
                image_url: None,
                starting_price: dec!(1000),
                auction_end: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn accept_bid_bumps_price_and_version_and_appends() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;

        let outcome = ledger
            .compare_and_commit(
                v.id,
                v.version,
                VehicleMutation::AcceptBid {
                    bidder_id: 1,
                    amount: dec!(1200),
                    placed_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        match outcome {
            CommitOutcome::Committed { vehicle, bid } => {
                assert_eq!(vehicle.current_price, dec!(1200));
                assert_eq!(vehicle.version, v.version + 1);
                assert_eq!(bid.unwrap().amount, dec!(1200));
            }
            other => panic!("expected Committed, got {other:?}"),
        }
        assert_eq!(ledger.bid_history(v.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_token_is_a_conflict() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;

        let first = ledger
            .compare_and_commit(
                v.id,
                v.version,
                VehicleMutation::AcceptBid {
                    bidder_id: 1,
                    amount: dec!(1100),
                    placed_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(first, CommitOutcome::Committed { .. }));

        // Same token again: the store moved on.
        let second = ledger
            .compare_and_commit(
                v.id,
                v.version,
                VehicleMutation::AcceptBid {
                    bidder_id: 2,
                    amount: dec!(1300),
                    placed_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(matches!(second, CommitOutcome::Conflict));
    }

    #[tokio::test]
    async fn bid_commit_fails_once_the_deadline_passed() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;

        let outcome = ledger
            .compare_and_commit(
                v.id,
                v.version,
                VehicleMutation::AcceptBid {
                    bidder_id: 1,
                    amount: dec!(1200),
                    placed_at: v.auction_end + Duration::seconds(1),
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Gone));
    }

    #[tokio::test]
    async fn finalize_applies_exactly_once() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;

        let first = ledger
            .compare_and_commit(v.id, v.version, VehicleMutation::Finalize { owner_id: Some(9) })
            .await
            .unwrap();
        let closed = match first {
            CommitOutcome::Committed { vehicle, .. } => vehicle,
            other => panic!("expected Committed, got {other:?}"),
        };
        assert!(!closed.is_open);
        assert_eq!(closed.owner_id, Some(9));

        let second = ledger
            .compare_and_commit(
                closed.id,
                closed.version,
                VehicleMutation::Finalize { owner_id: Some(2) },
            )
            .await
            .unwrap();
        assert!(matches!(second, CommitOutcome::Gone));
    }

    #[tokio::test]
    async fn missing_vehicle_is_gone() {
        let ledger = MemoryLedger::new();
        let outcome = ledger
            .compare_and_commit(42, 0, VehicleMutation::Finalize { owner_id: None })
            .await
            .unwrap();
        assert!(matches!(outcome, CommitOutcome::Gone));
    }

    #[tokio::test]
    async fn highest_bid_breaks_ties_by_lowest_id() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;
        let now = Utc::now();

        for (id, bidder_id) in [(10, 1), (11, 2)] {
            ledger
                .push_bid_unchecked(Bid {
                    id,
                    vehicle_id: v.id,
                    bidder_id,
                    amount: dec!(2000),
                    placed_at: now,
                })
                .await;
        }

        let best = ledger.highest_bid(v.id).await.unwrap().unwrap();
        assert_eq!(best.id, 10);
        assert_eq!(best.bidder_id, 1);
    }

    #[tokio::test]
    async fn remove_vehicle_cascades_to_bids() {
        let ledger = MemoryLedger::new();
        let v = open_vehicle(&ledger).await;
        ledger
            .compare_and_commit(
                v.id,
                v.version,
                VehicleMutation::AcceptBid {
                    bidder_id: 1,
                    amount: dec!(1500),
                    placed_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert!(ledger.remove_vehicle(v.id).await.unwrap());
        assert!(ledger.bid_history(v.id).await.unwrap().is_empty());
        assert!(!ledger.remove_vehicle(v.id).await.unwrap());
    }
}

// endregion: --- Tests
