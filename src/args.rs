use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    about = "Serves the movie seat reservation ledger",
    long_about = "Serves the movie seat reservation ledger over line-delimited JSON.\n\n\
                  Seat recommendations skip any seat that is booked for any showtime, \
                  not only for the showtime you are booking."
)]
pub struct Cli {
    /// At least 4 threads are used
    #[arg(short, long)]
    pub threads: Option<usize>,

    #[arg(short, long)]
    pub bind_address: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// catalog.json file, or a directory containing one
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// File every booking is appended to
    #[arg(short, long, default_value = crate::audit::DEFAULT_AUDIT_LOG)]
    pub audit_log: PathBuf,

    /// Don't write the audit log
    #[arg(long, conflicts_with = "audit_log")]
    pub no_audit: bool,
}
