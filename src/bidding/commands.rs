// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::validator;
use crate::bidding::model::Bid;
use crate::error::{BidError, LedgerError};
use crate::hub::BroadcastHub;
use crate::ledger::{CommitOutcome, Ledger, VehicleMutation};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands

/// Bid placement request, as received at the boundary.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub vehicle_id: i64,
    pub bidder_id: i64,
    pub amount: Decimal,
}

/// Bounded optimistic retry before a conflict is surfaced to the caller.
const MAX_RETRIES: u32 = 100;

/// Place a bid: identity policy, validation against a snapshot, then an
/// atomic compare-and-commit keyed on the version read. A token mismatch
/// retries against fresh state; a lot that closed between validation and
/// commit fails with `Closed`/`Expired` on the re-read rather than slipping
/// through. The `BidAccepted` broadcast happens only after the commit and
/// its outcome never affects the result.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    ledger: &dyn Ledger,
    hub: &BroadcastHub,
) -> Result<Bid, BidError> {
    info!("{:<12} --> place bid: {:?}", "Command", cmd);

    let bidder = ledger
        .bidder(cmd.bidder_id)
        .await?
        .ok_or(BidError::Unauthorized("unknown bidder identity"))?;
    if bidder.is_admin {
        // Domain policy, not a technical limitation.
        return Err(BidError::Unauthorized("administrators cannot place bids"));
    }

    let mut retries = 0;
    while retries < MAX_RETRIES {
        let vehicle = ledger
            .read(cmd.vehicle_id)
            .await?
            .ok_or(BidError::NotFound)?;
        let now = Utc::now();
        validator::validate(&vehicle, cmd.amount, now)?;

        let outcome = ledger
            .compare_and_commit(
                vehicle.id,
                vehicle.version,
                VehicleMutation::AcceptBid {
                    bidder_id: bidder.id,
                    amount: cmd.amount,
                    placed_at: now,
                },
            )
            .await?;

        match outcome {
            CommitOutcome::Committed { vehicle, bid } => {
                let bid = bid.ok_or(LedgerError::MissingBid)?;
                info!(
                    "{:<12} --> bid {} accepted on vehicle {}, price now {}",
                    "Command", bid.id, vehicle.id, vehicle.current_price
                );
                hub.broadcast(&AuctionEvent::BidAccepted {
                    vehicle_id: vehicle.id,
                    current_price: vehicle.current_price,
                    bidder: bidder.name.clone(),
                })
                .await;
                return Ok(bid);
            }
            CommitOutcome::Conflict => {
                warn!(
                    "{:<12} --> version conflict on vehicle {}, retrying",
                    "Command", cmd.vehicle_id
                );
                retries += 1;
            }
            CommitOutcome::Gone => {
                // Closed, expired or removed under us; the next read
                // produces the precise rejection.
                retries += 1;
            }
        }
    }

    Err(BidError::Conflict)
}

// endregion: --- Commands

// region:    --- Tests


// endregion: --- Tests
