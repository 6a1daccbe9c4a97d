use async_trait::async_trait;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::booking::render_seats;

pub const DEFAULT_AUDIT_LOG: &str = "bookings.txt";

const SEPARATOR: &str = "-------------------------";

/// Side effect run once for every committed booking.
///
/// Implementations must not fail the booking: problems are theirs to report.
#[async_trait]
pub trait AuditHook: Send + Sync {
    async fn record_booking(&self, movie: &str, showtime: &str, seats: &[String]);
}

/// Appends a four line block per booking to a text file.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, movie: &str, showtime: &str, seats: &[String]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let block = format!(
            "Movie: {movie}\nShowtime: {showtime}\nSeats: {}\n{SEPARATOR}\n",
            render_seats(seats)
        );
        file.write_all(block.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl AuditHook for FileAuditLog {
    async fn record_booking(&self, movie: &str, showtime: &str, seats: &[String]) {
        if let Err(e) = self.append(movie, showtime, seats).await {
            tracing::warn!(
                "Failed to write booking to {}: {:?}",
                self.path.display(),
                e
            );
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudit;

#[async_trait]
impl AuditHook for NoAudit {
    async fn record_booking(&self, _movie: &str, _showtime: &str, _seats: &[String]) {}
}
