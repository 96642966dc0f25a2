use std::process;

use refolo::{
    config::{self, Settings},
    infra::{error::InfraError, telemetry},
    purge::{ContentChange, PurgeClient, purge_all},
};
use thiserror::Error;
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to build purge client: {0}")]
    Client(#[from] reqwest::Error),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Purge(args) => run_burst(settings, args.urls).await,
        config::Command::Bust(args) => {
            let change = ContentChange {
                content_url: args.content,
                home_url: args.home,
                feed_urls: args.feeds,
            };
            run_burst(settings, change.subject_urls()).await
        }
    }
}

/// Individual purge failures are reported through the logs and never
/// fail the process; only startup errors do.
async fn run_burst(settings: Settings, urls: Vec<String>) -> Result<(), AppError> {
    let client = PurgeClient::new()?;
    purge_all(
        &client,
        &settings.varnish.endpoint,
        settings.varnish.timeout,
        &urls,
    )
    .await;

    Ok(())
}
