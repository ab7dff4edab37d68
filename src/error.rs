// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
// endregion: --- Imports

// region:    --- Ledger Errors

/// Infrastructure-level failures from the record store.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),

    /// A bid commit reported success but returned no appended bid row.
    #[error("commit did not return the appended bid")]
    MissingBid,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

// endregion: --- Ledger Errors

// region:    --- Bid Errors

/// Everything that can go wrong placing a bid. Validation reasons are listed
/// in their evaluation order.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("vehicle not found")]
    NotFound,

    #[error("auction has ended")]
    Closed,

    #[error("auction period has expired")]
    Expired,

    #[error("bid must be greater than current price {current_price}")]
    TooLow { current_price: Decimal },

    #[error("{0}")]
    Unauthorized(&'static str),

    /// Compare-and-commit lost against concurrent updates more times than
    /// the bounded retry allows.
    #[error("bid lost against concurrent updates, please retry")]
    Conflict,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl BidError {
    pub fn code(&self) -> &'static str {
        match self {
            BidError::NotFound => "NOT_FOUND",
            BidError::Closed => "ALREADY_ENDED",
            BidError::Expired => "EXPIRED",
            BidError::TooLow { .. } => "LOW_BID",
            BidError::Unauthorized(_) => "UNAUTHORIZED",
            BidError::Conflict => "CONFLICT",
            BidError::Ledger(_) => "LEDGER_FAILURE",
        }
    }
}

impl IntoResponse for BidError {
    fn into_response(self) -> Response {
        let status = match &self {
            BidError::NotFound => StatusCode::NOT_FOUND,
            BidError::Closed | BidError::Expired | BidError::TooLow { .. } => {
                StatusCode::BAD_REQUEST
            }
            BidError::Unauthorized(_) => StatusCode::FORBIDDEN,
            BidError::Conflict => StatusCode::CONFLICT,
            BidError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        if let BidError::TooLow { current_price } = &self {
            body["current_price"] = json!(current_price);
        }
        (status, Json(body)).into_response()
    }
}

// endregion: --- Bid Errors

// region:    --- Admin Errors

/// Failures of the administrative catalog operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("administrator identity required")]
    Unauthorized,

    #[error("vehicle not found")]
    NotFound,

    #[error("starting price must be greater than zero")]
    InvalidStartingPrice,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Unauthorized => StatusCode::FORBIDDEN,
            AdminError::NotFound => StatusCode::NOT_FOUND,
            AdminError::InvalidStartingPrice => StatusCode::BAD_REQUEST,
            AdminError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// endregion: --- Admin Errors
