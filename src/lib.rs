//! Seat reservation ledger for movie showtimes.
//!
//! [`ledger::Ledger`] holds the booked seats per showing and is the only
//! place they change. [`evaluator::Evaluator`] validates requests and commits
//! them, [`recommend`] suggests the next free seat, and [`handle_client`]
//! puts all of it behind a line-delimited JSON socket.

pub mod args;
pub mod audit;
pub mod booking;
pub mod catalog;
pub mod evaluator;
pub mod handle_client;
pub mod ledger;
pub mod paths;
pub mod recommend;
