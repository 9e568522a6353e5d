//! Binary entry point: parses CLI flags, builds the engine, optionally
//! restores a snapshot, serves HTTP, and shuts down cooperatively on
//! SIGINT/SIGTERM — the Rust counterpart of `alaredis_server/main.go`'s
//! `flag.Parse` / `NewStorage` / `graceful.Close` sequence.

use std::sync::Arc;

use alaredis_engine::Storage;
use alaredis_server::http::{router, AppState};
use alaredis_server::{persister, Cli, Metrics};
use clap::Parser;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let runtime = if cli.threads == 0 {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()?
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(cli.threads)
            .enable_all()
            .build()?
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let storage = Storage::new(cli.buckets);

    if let Some(path) = &cli.restore_from {
        match persister::restore(&storage, path).await {
            Ok(count) => info!(count, path = %path.display(), "restored snapshot"),
            Err(e) => error!(error = %e, path = %path.display(), "failed to restore snapshot"),
        }
    }

    storage.run();

    if let Some(dir) = cli.persist_dir.clone() {
        std::fs::create_dir_all(&dir)?;
        let storage = storage.clone();
        let interval = std::time::Duration::from_secs(cli.persist_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = persister::persist(&storage, &dir).await {
                    error!(error = %e, "periodic snapshot failed");
                }
            }
        });
    }

    let state = AppState {
        dispatcher: storage.dispatcher().clone(),
        metrics: Arc::new(Metrics::new()),
    };
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, buckets = cli.buckets, "alaredis-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("alaredis-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::sync::Mutex::new(file)).init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
