//! Next-seat suggestions.
//!
//! A seat counts as taken if it is booked for *any* showing, not just the one
//! the caller is looking at. A seat free for the 7:00 PM show is still skipped
//! when it is booked for 10:00 AM.

use crate::catalog::Catalog;
use crate::ledger::Ledger;
use serde::Serialize;

pub const GLOBAL_SCAN_NOTE: &str =
    "Recommendations skip any seat booked for any showtime, not only the one you picked.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Seat(String),
    NoneAvailable,
}

impl Recommendation {
    pub fn message(&self) -> String {
        match self {
            Self::Seat(seat) => format!("Recommended Seat: {seat}"),
            Self::NoneAvailable => "No seats available for recommendation!".to_owned(),
        }
    }
}

/// First catalog seat, in declared order, that no showing has booked.
pub async fn recommend(catalog: &Catalog, ledger: &Ledger) -> Recommendation {
    let occupied = ledger.occupied_seats().await;
    catalog
        .seats()
        .iter()
        .find(|seat| !occupied.contains(*seat))
        .map_or(Recommendation::NoneAvailable, |seat| {
            Recommendation::Seat(seat.clone())
        })
}
