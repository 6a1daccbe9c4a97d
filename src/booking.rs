use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use uuid::Uuid;

/// Seats booked for a single showing. Membership is the only thing that matters.
pub type SeatSet = BTreeSet<String>;

/// Identity of one showing: a movie paired with a showtime label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShowtimeKey {
    movie: String,
    showtime: String,
}

impl ShowtimeKey {
    pub fn new(movie: impl Into<String>, showtime: impl Into<String>) -> Self {
        Self {
            movie: movie.into(),
            showtime: showtime.into(),
        }
    }

    pub fn movie(&self) -> &str {
        &self.movie
    }

    pub fn showtime(&self) -> &str {
        &self.showtime
    }
}

impl fmt::Display for ShowtimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.movie, self.showtime)
    }
}

/// A single attempt to reserve seats. Seats keep the order the caller picked them in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReservationRequest {
    pub movie: String,
    pub showtime: String,
    pub seats: Vec<String>,
}

impl ReservationRequest {
    pub fn new<S: Into<String>>(
        movie: impl Into<String>,
        showtime: impl Into<String>,
        seats: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            movie: movie.into(),
            showtime: showtime.into(),
            seats: seats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key(&self) -> ShowtimeKey {
        ShowtimeKey::new(self.movie.as_str(), self.showtime.as_str())
    }
}

impl fmt::Display for ReservationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Movie: {}", self.movie)?;
        writeln!(f, "Showtime: {}", self.showtime)?;
        write!(f, "Seats: {}", render_seats(&self.seats))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BookingOutcome {
    Committed,
    /// Every requested seat that was already taken for the showing, in request order.
    Rejected(Vec<String>),
}

impl BookingOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Human readable text for the outcome, naming every conflicting seat.
    pub fn message(&self) -> String {
        match self {
            Self::Committed => "Booking successful!".to_owned(),
            Self::Rejected(seats) => seats
                .iter()
                .map(|seat| format!("Seat {seat} is already booked for this showtime."))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A committed booking as announced to listeners.
#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub booked_at: DateTime<Local>,
    pub key: ShowtimeKey,
    pub seats: Vec<String>,
}

impl Booking {
    pub fn new(key: &ShowtimeKey, seats: &[String]) -> Self {
        Self {
            id: Uuid::new_v4(),
            booked_at: Local::now(),
            key: key.clone(),
            seats: seats.to_vec(),
        }
    }
}

/// Renders seats as `[A1, A2]`.
pub fn render_seats<'a>(seats: impl IntoIterator<Item = &'a String>) -> String {
    let joined = seats
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}
