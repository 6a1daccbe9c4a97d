use crate::audit::AuditHook;
use crate::booking::{BookingOutcome, ReservationRequest};
use crate::ledger::Ledger;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub use crate::ledger::LedgerEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Please select at least one seat.")]
    EmptySeatSelection,
}

/// Turns reservation requests into ledger commits.
///
/// The audit hook runs after a successful commit, outside the ledger lock,
/// and never on a rejection.
pub struct Evaluator {
    ledger: Arc<Ledger>,
    audit: Arc<dyn AuditHook>,
}

impl Evaluator {
    pub fn new(ledger: Arc<Ledger>, audit: Arc<dyn AuditHook>) -> Self {
        Self { ledger, audit }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub async fn submit(
        &self,
        request: &ReservationRequest,
    ) -> Result<BookingOutcome, RequestError> {
        if request.seats.is_empty() {
            return Err(RequestError::EmptySeatSelection);
        }

        let key = request.key();
        let outcome = self.ledger.try_commit(&key, &request.seats).await;

        match &outcome {
            BookingOutcome::Committed => {
                tracing::info!("Booked {:?} for {}", request.seats, key);
                self.audit
                    .record_booking(&request.movie, &request.showtime, &request.seats)
                    .await;
            }
            BookingOutcome::Rejected(conflicts) => {
                tracing::info!("Refused booking for {}: {:?} already taken", key, conflicts);
            }
        }

        Ok(outcome)
    }

    pub async fn clear_all(&self) {
        self.ledger.clear_all().await;
        tracing::info!("Cleared all bookings");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.ledger.subscribe()
    }
}
