use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;

use feed_harvester::db::{ItemStore, Repository};
use feed_harvester::feed::FeedFetcher;
use feed_harvester::harvest::Scheduler;
use feed_harvester::web::{create_router, serve, StatusService};
use feed_harvester::{logging, Config, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let (config, warnings) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.log_level);
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let feeds = config.resolve_feeds()?;
    let store: Arc<dyn ItemStore> = Arc::new(Repository::from_config(&config)?);
    let fetcher = Arc::new(FeedFetcher::new()?);

    let scheduler = Arc::new(
        Scheduler::new(fetcher, store.clone(), feeds, config.interval())
            .with_concurrency(config.fetch_concurrency),
    );
    let service = Arc::new(StatusService::new(scheduler.clone(), store));

    // Listen for signals before the first round so a stop waits for it.
    let signal = tokio::spawn(shutdown_signal());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let (server_stop_tx, mut server_stop_rx) = watch::channel(false);
    let server = tokio::spawn(serve(listener, create_router(service), async move {
        let _ = server_stop_rx.wait_for(|stop| *stop).await;
    }));

    if let Err(e) = scheduler.start().await {
        tracing::error!("Failed to start feed harvester: {}", e);
        let _ = server_stop_tx.send(true);
        let _ = server.await;
        return Err(e);
    }

    if let Err(e) = signal.await {
        tracing::error!("Signal listener failed: {}", e);
    }

    scheduler.stop().await?;

    let _ = server_stop_tx.send(true);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("HTTP server error: {}", e),
        Err(e) => tracing::error!("HTTP server task failed: {}", e),
    }

    tracing::info!("Feed harvester stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Termination signal received");
}
