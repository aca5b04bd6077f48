pub mod backend;
pub mod bid_request;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod scheduler;
