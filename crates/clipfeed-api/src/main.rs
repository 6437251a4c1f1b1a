//! Process entry point, grounded on the teacher's `agent::main` (clap
//! args, a tracing subscriber over stderr, bind the listener before doing
//! anything slow, `ctrl_c`-driven graceful shutdown). The `rustls`
//! provider install and the `allocator`/jemalloc `extern crate` the
//! teacher's binary carries are both dropped here — this process makes no
//! outbound TLS connections of its own and has no allocator-pressure
//! profile that would justify jemalloc (see `DESIGN.md`).

mod auth;
mod config;
mod error;
mod extract;
mod routes;
mod state;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clipfeed_dialect::DialectHandle;
use clipfeed_ranking::LtrModel;
use clipfeed_security::RateLimiter;
use clipfeed_topics::TopicGraph;

use crate::config::{Cli, Command, Config};
use crate::storage::FilesystemObjectStore;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let cli = Cli::parse();

    let handle = DialectHandle::connect(&cli.config.database_url)
        .await
        .context("connecting to database")?;
    let applied = clipfeed_migrations::run(&handle).await.context("running migrations")?;
    tracing::info!(applied = ?applied, "migrations up to date");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(handle, cli.config).await,
        Command::Sweep => sweep_once(handle, cli.config).await,
    }
}

async fn sweep_once(handle: DialectHandle, config: Config) -> anyhow::Result<()> {
    let store = FilesystemObjectStore::new(&config.storage_dir, &config.public_base_url);
    let counts = clipfeed_lifecycle::sweep_once(&handle, config.storage_limit_bytes, &store)
        .await
        .context("running lifecycle sweep")?;
    tracing::info!(
        expired = counts.expired,
        evicted = counts.evicted,
        jobs_purged = counts.jobs_purged,
        "lifecycle sweep complete"
    );
    Ok(())
}

async fn serve(handle: DialectHandle, config: Config) -> anyhow::Result<()> {
    // Bind early, before any slower setup, so requests that dispatch as
    // soon as the process is up don't race an unbound port.
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context("failed to bind server port")?;

    let snapshot = clipfeed_topics::TopicGraph::empty();
    snapshot.refresh(&handle).await.context("loading initial topic graph")?;
    let topics = Arc::new(snapshot);

    let rate_limiter = RateLimiter::wrap(config.rate_limit, Duration::from_secs(config.rate_limit_window_secs));

    let fs_store = Arc::new(FilesystemObjectStore::new(&config.storage_dir, &config.public_base_url));
    let storage: Arc<dyn crate::storage::ObjectStore> = fs_store;

    let ltr_model = load_ltr_model(config.ltr_model_path.as_deref()).await?;

    let app = Arc::new(state::App::new(
        handle.clone(),
        topics.clone(),
        rate_limiter.clone(),
        storage,
        ltr_model,
        config,
    ));

    tokio::spawn(run_topic_refresh(topics, handle.clone()));
    tokio::spawn(rate_limiter.run_sweep_loop());

    let router = routes::build_router(app);

    let shutdown = Arc::new(tokio::sync::Notify::new());
    tokio::spawn(force_exit_after_deadline(shutdown.clone()));

    tracing::info!("listening");
    axum::serve(listener, router.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server exited with an error")?;

    tracing::info!("drained in-flight requests, exiting");
    Ok(())
}

async fn run_topic_refresh(topics: Arc<TopicGraph>, handle: DialectHandle) {
    topics.run_refresh_loop(handle).await;
}

/// Loads an LTR model from a serialized JSON file (§4.7). Ranking falls
/// back to the heuristic score when no path is configured.
async fn load_ltr_model(path: Option<&str>) -> anyhow::Result<Option<LtrModel>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading ltr model at {path}"))?;
    let model: LtrModel = serde_json::from_slice(&bytes).with_context(|| format!("parsing ltr model at {path}"))?;
    Ok(Some(model))
}

/// Resolves once SIGINT or SIGTERM is received, signalling both axum's
/// graceful drain and the hard-exit watchdog below.
async fn shutdown_signal(notify: Arc<tokio::sync::Notify>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
    notify.notify_waiters();
}

/// §6's process contract caps the drain at 10 seconds; axum's graceful
/// shutdown itself has no deadline, so this watchdog forces the exit if a
/// connection is still open past it.
async fn force_exit_after_deadline(notify: Arc<tokio::sync::Notify>) {
    notify.notified().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    tracing::warn!("graceful drain exceeded the 10s deadline; forcing exit");
    std::process::exit(0);
}
