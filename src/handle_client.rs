use crate::booking::{render_seats, BookingOutcome, ReservationRequest, ShowtimeKey};
use crate::catalog::Catalog;
use crate::evaluator::{Evaluator, LedgerEvent};
use crate::recommend::{recommend, Recommendation, GLOBAL_SCAN_NOTE};
use futures::{stream, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json as json;
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::broadcast::error::RecvError,
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON Error: {0}")]
    JsonError(#[from] json::Error),
    #[error("Codec Error: {0}")]
    CodecError(#[from] LinesCodecError),
}

/// Everything a connection needs: the catalog it validates against and the
/// evaluator that owns the ledger.
pub struct BoxOffice {
    catalog: Catalog,
    evaluator: Evaluator,
}

impl BoxOffice {
    pub fn new(catalog: Catalog, evaluator: Evaluator) -> Self {
        Self { catalog, evaluator }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Refusal message if the request names something the catalog doesn't list.
    fn refusal(&self, request: &ReservationRequest) -> Option<Notice> {
        if !self.catalog.has_movie(&request.movie) {
            return Some(Notice::new(format!("Unknown movie: {}", request.movie)));
        }
        if !self.catalog.has_showtime(&request.showtime) {
            return Some(Notice::new(format!(
                "Unknown showtime: {}",
                request.showtime
            )));
        }
        let unknown = self.catalog.unknown_seats(&request.seats);
        if !unknown.is_empty() {
            let seats = unknown.into_iter().map(str::to_owned).collect::<Vec<_>>();
            return Some(Notice::new(format!("Unknown seats: {}", render_seats(&seats))).seats(seats));
        }
        None
    }

    async fn book(&self, request: ReservationRequest) -> (ServerAction, Notice) {
        if let Some(refusal) = self.refusal(&request) {
            return (ServerAction::Refused, refusal);
        }
        match self.evaluator.submit(&request).await {
            Ok(outcome) => {
                let message = outcome.message();
                match outcome {
                    BookingOutcome::Committed => (
                        ServerAction::Booked,
                        Notice::new(message).seats(request.seats),
                    ),
                    BookingOutcome::Rejected(conflicts) => {
                        (ServerAction::Conflict, Notice::new(message).seats(conflicts))
                    }
                }
            }
            Err(e) => (ServerAction::Refused, Notice::new(e.to_string())),
        }
    }

    async fn display(&self) -> Vec<String> {
        self.evaluator
            .ledger()
            .all_entries()
            .await
            .into_iter()
            .map(|(key, seats)| format!("{}: {}", key, render_seats(&seats)))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
enum Action {
    Ping,
    Catalog,
    Book,
    Seats,
    Display,
    Clear,
    Recommend,
    Status,
    Listen,
}

#[derive(Debug, Deserialize)]
struct Request {
    action: Action,
    #[serde(default)]
    value: json::Value,
}

#[derive(Debug, Deserialize)]
struct Showing {
    movie: String,
    showtime: String,
}

#[derive(Debug, Serialize)]
enum ServerAction {
    Pong,
    Catalog,
    Booked,
    Conflict,
    Refused,
    Seats,
    Bookings,
    Cleared,
    Recommended,
    NoneAvailable,
    StatusAnswer,
    LedgerUpdate,
}

#[derive(Debug, Serialize)]
struct Response<T> {
    action: ServerAction,
    value: T,
}

#[derive(Debug, Serialize)]
struct Notice {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    seats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
}

impl Notice {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            seats: Vec::new(),
            note: None,
        }
    }

    fn seats(mut self, seats: Vec<String>) -> Self {
        self.seats = seats;
        self
    }

    fn note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }
}

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections forever, one task per client.
pub async fn serve(listener: TcpListener, office: Arc<BoxOffice>) {
    let incoming = stream::unfold(listener, |listener| async move {
        let accepted = listener.accept().await;
        Some((accepted, listener))
    });
    serve_incoming(Box::pin(incoming), office).await
}

/// Serves every accepted socket until `incoming` ends. A failed accept
/// (say, out of file descriptors) is logged and the loop carries on.
pub async fn serve_incoming<S>(mut incoming: S, office: Arc<BoxOffice>)
where
    S: Stream<Item = io::Result<(TcpStream, SocketAddr)>> + Unpin,
{
    while let Some(accepted) = incoming.next().await {
        let (socket, address) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!("Failed to accept a client: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        tracing::debug!("Accepted client@{}", address);
        let office = Arc::clone(&office);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, office).await {
                tracing::warn!("Connection with client@{} ended: {}", address, e);
            }
        });
    }
}

pub async fn handle_connection(
    socket: TcpStream,
    office: Arc<BoxOffice>,
) -> Result<(), ConnectionError> {
    let address = socket
        .peer_addr()
        .map(|address| address.to_string())
        .unwrap_or_else(|_| "?".into());

    let (reader, writer) = socket.into_split();
    let mut reader = FramedRead::new(reader, LinesCodec::new());
    let mut writer = FramedWrite::new(writer, LinesCodec::new());

    while let Some(line) = reader.next().await {
        let request_data: Request = json::from_str(&line?)?;

        match request_data.action {
            Action::Ping => {
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::Pong,
                        value: json::Value::Null,
                    })?)
                    .await?;
                tracing::info!("Sent Pong to client@{}", address);
            }
            Action::Catalog => {
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::Catalog,
                        value: office.catalog(),
                    })?)
                    .await?;
            }
            Action::Book => {
                let request: ReservationRequest = json::from_value(request_data.value)?;
                let (action, notice) = office.book(request).await;
                writer
                    .send(json::to_string(&Response {
                        action,
                        value: notice,
                    })?)
                    .await?;
            }
            Action::Seats => {
                let showing: Showing = json::from_value(request_data.value)?;
                let key = ShowtimeKey::new(showing.movie, showing.showtime);
                let seats = office.evaluator().ledger().snapshot_seats(&key).await;
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::Seats,
                        value: seats,
                    })?)
                    .await?;
            }
            Action::Display => {
                let lines = office.display().await;
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::Bookings,
                        value: lines,
                    })?)
                    .await?;
            }
            Action::Clear => {
                office.evaluator().clear_all().await;
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::Cleared,
                        value: Notice::new("Bookings cleared!"),
                    })?)
                    .await?;
                tracing::info!("Client@{} cleared all bookings", address);
            }
            Action::Recommend => {
                let recommendation =
                    recommend(office.catalog(), office.evaluator().ledger()).await;
                let message = recommendation.message();
                let (action, notice) = match recommendation {
                    Recommendation::Seat(seat) => {
                        (ServerAction::Recommended, Notice::new(message).seats(vec![seat]))
                    }
                    Recommendation::NoneAvailable => {
                        (ServerAction::NoneAvailable, Notice::new(message))
                    }
                };
                writer
                    .send(json::to_string(&Response {
                        action,
                        value: notice.note(GLOBAL_SCAN_NOTE),
                    })?)
                    .await?;
            }
            Action::Status => {
                let count = office.evaluator().ledger().booked_count().await;
                writer
                    .send(json::to_string(&Response {
                        action: ServerAction::StatusAnswer,
                        value: count,
                    })?)
                    .await?;
                tracing::info!("Sent status of {} to client@{}", count, address)
            }
            Action::Listen => {
                tracing::info!("Client@{} subscribed to updates.", address);

                let mut rx = office.evaluator().subscribe();

                loop {
                    let received = tokio::select! {
                        received = rx.recv() => received,
                        line = reader.next() => match line {
                            Some(Ok(_)) => {
                                tracing::debug!("Ignoring request from listening client@{}", address);
                                continue;
                            }
                            Some(Err(e)) => return Err(e.into()),
                            None => break,
                        },
                    };

                    match received {
                        Ok(event) => {
                            let notification = Response {
                                action: ServerAction::LedgerUpdate,
                                value: &event,
                            };
                            writer.send(json::to_string(&notification)?).await?;
                            if let LedgerEvent::Committed(booking) = &event {
                                tracing::debug!(
                                    "Forwarded booking {} to client@{}",
                                    booking.id,
                                    address
                                );
                            }
                        }
                        Err(RecvError::Lagged(e)) => {
                            tracing::warn!("Lag error: client@{} missed {} updates", address, e)
                        }
                        Err(_) => break,
                    }
                }

                tracing::info!("Client@{} stopped listening.", address);
                return Ok(());
            }
        };
    }

    tracing::debug!("Client@{} disconnected", address);
    Ok(())
}
