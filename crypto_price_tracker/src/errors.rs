use shared_utils::env::MissingEnvVarError;
use thiserror::Error;

use crate::{
    config::ConfigError,
    forward::ForwardError,
    models::window::WindowError,
    pipeline::PipelineError,
    providers::ProviderInitError,
    rates::RateError,
};

/// The unified error type for the `crypto_price_tracker` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The currency list could not be located, read or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The report window given on the command line is unusable.
    #[error("Invalid report window: {0}")]
    Window(#[from] WindowError),

    /// The market-data client could not be set up.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderInitError),

    /// The exchange-rate client could not be set up.
    #[error("Rate source error: {0}")]
    Rates(#[from] RateError),

    /// The accounting client could not be set up.
    #[error("Forwarding error: {0}")]
    Forward(#[from] ForwardError),

    /// Accounting credentials are incomplete.
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVarError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// One or more currencies failed while the run kept going.
    #[error("{failed} of {total} currencies failed")]
    PartialFailure { failed: usize, total: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
