use anyhow::Context as _;
use clap::Parser;
use seatd::{
    args::Cli,
    audit::{AuditHook, FileAuditLog, NoAudit},
    catalog::Catalog,
    evaluator::Evaluator,
    handle_client::{serve, BoxOffice},
    ledger::Ledger,
};
use std::{num::NonZero, process::ExitCode, sync::Arc, thread};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const LOWEST_THREADS: NonZero<usize> = match NonZero::new(4) {
    Some(threads) => threads,
    None => unreachable!(),
};
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "seatd=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let threads = cli
        .threads
        .and_then(NonZero::new)
        .unwrap_or_else(|| thread::available_parallelism().unwrap_or(LOWEST_THREADS))
        .max(LOWEST_THREADS);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name(concat!(env!("CARGO_PKG_NAME"), "-worker"))
        .worker_threads(threads.get())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Fatal: Failed to start tokio runtime: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(cli)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: main exited with: {:?} ", e);
            ExitCode::FAILURE
        }
    }
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let catalog = Catalog::load(cli.catalog.as_deref()).context("Failed to load catalog")?;

    let audit: Arc<dyn AuditHook> = if cli.no_audit {
        Arc::new(NoAudit)
    } else {
        tracing::info!("Appending bookings to {}", cli.audit_log.display());
        Arc::new(FileAuditLog::new(cli.audit_log))
    };

    let evaluator = Evaluator::new(Arc::new(Ledger::new()), audit);
    let office = Arc::new(BoxOffice::new(catalog, evaluator));

    let bind_address = cli.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS);
    let port = cli.port.unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind((bind_address, port))
        .await
        .with_context(|| format!("Failed to bind {bind_address}:{port}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    tokio::select! {
        _ = serve(listener, office) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to wait for ctrl-c")?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
