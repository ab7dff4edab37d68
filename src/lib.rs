pub mod auction;
pub mod bidding;
pub mod catalog;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod ledger;
pub mod scheduler;
