mod cli;
mod error;
mod logging;

use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use comicglass_cache::DirectoryCache;
use comicglass_config::Config;
use comicglass_server::AppState;
use comicglass_storage::LocalScanner;
use exn::ResultExt;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be up yet (or may be what failed).
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref(), &args.overrides()).or_raise(|| ErrorKind::Config)?;
    logging::init(&config.log)?;
    let root = config.library.root.clone();
    tracing::info!(root = %root.display(), max_entries = config.cache.max_entries.get(), "Starting comicglass");
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "Library root is not a directory; every listing will fail until it exists");
    }

    let scanner = Arc::new(LocalScanner::new(config.extensions()));
    let cache = Arc::new(DirectoryCache::new(scanner, config.cache.max_entries));

    if config.prewarm.enabled {
        let cache = Arc::clone(&cache);
        let root = root.clone();
        let concurrency = config.prewarm.concurrency;
        // Requests are served while this runs; they simply miss (or wait on
        // the walker's scan of the same directory) until it gets there.
        tokio::spawn(async move {
            cache.prewarm(&root, concurrency).await;
        });
    }

    let state = AppState::new(cache, root, config.server.order).or_raise(|| ErrorKind::Server)?;
    let router = comicglass_server::router(state, config.server.inspect);
    let listener = comicglass_server::bind(config.server.listen).await.or_raise(|| ErrorKind::Server)?;
    comicglass_server::serve(listener, router, shutdown_signal()).await.or_raise(|| ErrorKind::Server)?;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received; finishing in-flight requests");
}
