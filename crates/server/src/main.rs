use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use troupe_server::api;
use troupe_server::bootstrap;
use troupe_server::cli::{self, Cli, Command, ConfigCommand};

fn main() {
    let cli = Cli::parse();

    let outcome = match &cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            run_server(&cli)
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            match cli::load_config(&cli.config) {
                Ok(config) => {
                    if cli::validate(&config) {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("configuration has errors"))
                    }
                }
                Err(e) => Err(e),
            }
        }
        Some(Command::Config(ConfigCommand::Show)) => match cli::load_config(&cli.config) {
            Ok(config) => {
                cli::show(&config);
                Ok(())
            }
            Err(e) => Err(e),
        },
        Some(Command::Version) => {
            println!("troupe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Structured logging with env-filter overrides.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,troupe_server=debug")),
        )
        .init();
}

fn run_server(cli: &Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    runtime.block_on(async {
        tracing::info!("troupe starting");

        let config = Arc::new(cli::load_config(&cli.config)?);
        let built = bootstrap::build(config.clone())?;

        let app = api::router(built.state);

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding to {addr}"))?;
        tracing::info!(addr = %addr, "troupe listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        tracing::info!("troupe stopped");
        Ok(())
    })
}

/// Resolve on SIGINT or SIGTERM; the server then drains and exits 0.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
