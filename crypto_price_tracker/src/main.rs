use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use crypto_price_tracker::{
    Error,
    cli::{commands::Cli, params::priority_credentials},
    config::{load_config_path, locate_config},
    forward::priority::PriorityClient,
    pipeline::Pipeline,
    providers::coinmarketcap::CoinMarketCapProvider,
    rates::boi::BankOfIsraelSource,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let settings = cli.run_settings(Local::now().date_naive())?;

    let config_path = locate_config(cli.config.as_deref())?;
    let config = load_config_path(&config_path)?;
    info!(
        config = %config_path.display(),
        currencies = config.currencies.len(),
        window = %settings.window.label(),
        "starting run"
    );

    let mut pipeline = Pipeline::new(
        &settings,
        Box::new(CoinMarketCapProvider::new()?),
        Box::new(BankOfIsraelSource::new()?),
    );

    if let Some(endpoint) = cli.priority_endpoint {
        let credentials = priority_credentials(cli.priority_username, cli.priority_password)?;
        info!(%endpoint, user = %credentials.username, "forwarding to Priority");
        pipeline = pipeline.with_forwarder(Box::new(PriorityClient::new(endpoint, credentials)?));
    }

    let summary = pipeline.run(&config.currencies).await?;
    info!(
        appended = summary.appended(),
        cached_rates = pipeline.rates().cache().len(),
        "run finished"
    );

    if summary.has_failures() {
        return Err(Error::PartialFailure {
            failed: summary.failed.len(),
            total: config.currencies.len(),
        });
    }
    Ok(())
}
