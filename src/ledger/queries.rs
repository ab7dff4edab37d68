/// Vehicle lookup with version token
pub const GET_VEHICLE: &str = r#"
    SELECT id, title, description, image_url, starting_price, current_price,
           auction_end, is_open, owner_id, version, created_at
    FROM vehicles
    WHERE id = $1
"#;

/// Active listing: open and not yet past the deadline
pub const LIST_ACTIVE: &str = r#"
    SELECT id, title, description, image_url, starting_price, current_price,
           auction_end, is_open, owner_id, version, created_at
    FROM vehicles
    WHERE is_open AND auction_end > $1
    ORDER BY created_at DESC
"#;

/// Sweeper worklist: open but past the deadline
pub const LIST_EXPIRED: &str = r#"
    SELECT id, title, description, image_url, starting_price, current_price,
           auction_end, is_open, owner_id, version, created_at
    FROM vehicles
    WHERE is_open AND auction_end <= $1
    ORDER BY auction_end ASC
"#;

/// Compare-and-commit for a bid: version token plus commit-time re-check of
/// the open flag and the deadline, all one atomic statement
pub const CAS_ACCEPT_BID: &str = r#"
    UPDATE vehicles
    SET current_price = $3, version = version + 1
    WHERE id = $1 AND version = $2 AND is_open AND auction_end > $4
    RETURNING id, title, description, image_url, starting_price, current_price,
              auction_end, is_open, owner_id, version, created_at
"#;

/// Bid append, inside the same transaction as CAS_ACCEPT_BID
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (vehicle_id, bidder_id, amount, placed_at)
    VALUES ($1, $2, $3, $4)
    RETURNING id, vehicle_id, bidder_id, amount, placed_at
"#;

/// Compare-and-commit for finalization, keyed on is_open transitioning once
pub const CAS_FINALIZE: &str = r#"
    UPDATE vehicles
    SET is_open = FALSE, owner_id = $3, version = version + 1
    WHERE id = $1 AND version = $2 AND is_open
    RETURNING id, title, description, image_url, starting_price, current_price,
              auction_end, is_open, owner_id, version, created_at
"#;

/// Version probe used to tell a token conflict from a failed guard
pub const GET_VERSION: &str = "SELECT version FROM vehicles WHERE id = $1";

/// Highest bid; ties break to the lowest bid id
pub const HIGHEST_BID: &str = r#"
    SELECT id, vehicle_id, bidder_id, amount, placed_at
    FROM bids
    WHERE vehicle_id = $1
    ORDER BY amount DESC, id ASC
    LIMIT 1
"#;

/// Bid history, newest first
pub const BID_HISTORY: &str = r#"
    SELECT id, vehicle_id, bidder_id, amount, placed_at
    FROM bids
    WHERE vehicle_id = $1
    ORDER BY placed_at DESC, id DESC
"#;

/// Administrative insert; the price starts at the starting price
pub const INSERT_VEHICLE: &str = r#"
    INSERT INTO vehicles (title, description, image_url, starting_price,
                          current_price, auction_end)
    VALUES ($1, $2, $3, $4, $4, $5)
    RETURNING id, title, description, image_url, starting_price, current_price,
              auction_end, is_open, owner_id, version, created_at
"#;

/// Administrative delete; dependent bids cascade through the foreign key
pub const DELETE_VEHICLE: &str = "DELETE FROM vehicles WHERE id = $1";

/// Administrative deadline change; past bids are left untouched
pub const RESCHEDULE_VEHICLE: &str = r#"
    UPDATE vehicles
    SET auction_end = $2, version = version + 1
    WHERE id = $1
    RETURNING id, title, description, image_url, starting_price, current_price,
              auction_end, is_open, owner_id, version, created_at
"#;

/// Bidder identity lookup
pub const GET_BIDDER: &str = "SELECT id, name, is_admin FROM bidders WHERE id = $1";
