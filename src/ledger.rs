use crate::booking::{Booking, BookingOutcome, SeatSet, ShowtimeKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::{broadcast, Mutex};

const CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub enum LedgerEvent {
    Committed(Booking),
    Cleared,
}

/// Authoritative record of which seats are booked for which showing.
///
/// Every operation takes the same lock, so a reader never sees a showing
/// halfway through a commit and two commits for the same showing can't both
/// pass the conflict check. Changes are announced while the lock is held, so
/// subscribers hear them in the order they were applied.
#[derive(Debug)]
pub struct Ledger {
    entries: Mutex<BTreeMap<ShowtimeKey, SeatSet>>,
    tx: broadcast::Sender<LedgerEvent>,
}

impl Default for Ledger {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self {
            entries: Mutex::new(BTreeMap::new()),
            tx,
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn announce(&self, event: LedgerEvent) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.tx.send(event) {
            tracing::warn!("Failed to broadcast ledger event: {:?}", e);
        }
    }

    /// Copy of the seats booked for `key`, empty if nothing was booked yet.
    pub async fn snapshot_seats(&self, key: &ShowtimeKey) -> SeatSet {
        self.entries
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Books `requested` for `key` unless any of them is already taken.
    ///
    /// On conflict nothing is written and the outcome lists each taken seat
    /// once, in the order it was requested.
    pub async fn try_commit(&self, key: &ShowtimeKey, requested: &[String]) -> BookingOutcome {
        let mut entries = self.entries.lock().await;

        if let Some(booked) = entries.get(key) {
            let mut seen = BTreeSet::new();
            let conflicts = requested
                .iter()
                .filter(|seat| booked.contains(*seat) && seen.insert(seat.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            if !conflicts.is_empty() {
                tracing::debug!("Rejected {:?} for {}", conflicts, key);
                return BookingOutcome::Rejected(conflicts);
            }
        }

        if !requested.is_empty() {
            entries
                .entry(key.clone())
                .or_default()
                .extend(requested.iter().cloned());
            self.announce(LedgerEvent::Committed(Booking::new(key, requested)));
        }

        BookingOutcome::Committed
    }

    /// Every showing with its booked seats, ordered by key.
    pub async fn all_entries(&self) -> Vec<(ShowtimeKey, SeatSet)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(key, seats)| (key.clone(), seats.clone()))
            .collect()
    }

    pub async fn clear_all(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.announce(LedgerEvent::Cleared);
    }

    /// Seat labels booked under at least one showing.
    pub async fn occupied_seats(&self) -> SeatSet {
        self.entries
            .lock()
            .await
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Total number of (showing, seat) bookings.
    pub async fn booked_count(&self) -> usize {
        self.entries.lock().await.values().map(SeatSet::len).sum()
    }
}
