// region:    --- Imports
use crate::bidding::model::Vehicle;
use crate::error::BidError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
// endregion: --- Imports

// region:    --- Bid Validator

/// Pure admission check for a proposed bid against the vehicle state that
/// was read. No side effects; safe to call repeatedly. The caller handles
/// `NotFound` before this point.
///
/// Rejections are evaluated in order: `Closed`, `Expired`, `TooLow`. Expiry
/// is deadline-based, not flag-based: a bid at or past `auction_end` is
/// `Expired` even if the sweeper has not flipped `is_open` yet.
pub fn validate(vehicle: &Vehicle, amount: Decimal, now: DateTime<Utc>) -> Result<(), BidError> {
    if !vehicle.is_open {
        return Err(BidError::Closed);
    }
    if now >= vehicle.auction_end {
        return Err(BidError::Expired);
    }
    if amount <= vehicle.current_price {
        return Err(BidError::TooLow {
            current_price: vehicle.current_price,
        });
    }
    Ok(())
}

// endregion: --- Bid Validator

// region:    --- Tests


// endregion: --- Tests
