use crate::bidding::model::VehicleSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Events fanned out to every connected observer. Wire format is a single
/// JSON object tagged by `type`; server-to-client only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuctionEvent {
    /// A vehicle entered the catalog.
    LotAdded { vehicle: VehicleSnapshot },
    /// A vehicle left the catalog (its bids went with it).
    LotRemoved { vehicle_id: i64 },
    /// A bid was committed; `current_price` is the post-commit price.
    BidAccepted {
        vehicle_id: i64,
        current_price: Decimal,
        bidder: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bid_accepted_wire_format_is_type_tagged() {
        let event = AuctionEvent::BidAccepted {
            vehicle_id: 7,
            current_price: dec!(1500.50),
            bidder: "alice".to_string(),
        };
        let wire: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["type"], "BidAccepted");
        assert_eq!(wire["vehicle_id"], 7);
        assert_eq!(wire["bidder"], "alice");
    }

    #[test]
    fn lot_removed_carries_only_the_id() {
        let wire = serde_json::to_value(AuctionEvent::LotRemoved { vehicle_id: 3 }).unwrap();
        assert_eq!(wire["type"], "LotRemoved");
        assert_eq!(wire["vehicle_id"], 3);
        assert!(wire.get("vehicle").is_none());
    }
}
