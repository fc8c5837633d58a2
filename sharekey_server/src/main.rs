//! Serves the recipient provisioning front door
//!
//! Configuration is read from the command line and the environment, after
//! loading a `.env` file if one is present. See `--help` for details.

#![warn(unused_import_braces, unused_imports, unused_qualifications)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::sync::Arc;

use clap::Parser;
use sharekey::Provisioner;
use sharekey_reqwest::CatalogClient;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;

use config::Opts;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();

    let client = reqwest::Client::builder()
        .timeout(opts.request_timeout())
        .build()?;
    let catalog = CatalogClient::new(client, &opts.catalog_config())?;
    let provisioner = Provisioner::new(catalog, opts.provisioning_config());
    tracing::info!(
        catalog = %provisioner.catalog().recipients_url(),
        issuer = %provisioner.config().issuer(),
        token_lifetime_secs = provisioner.config().token_lifetime_secs(),
        "provisioning recipients"
    );

    let app = sharekey_axum::router(Arc::new(provisioner));

    let listener = TcpListener::bind(opts.listen).await?;
    tracing::info!(addr = %opts.listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
