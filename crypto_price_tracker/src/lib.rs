#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod forward;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod providers;
pub mod rates;

pub use errors::{Error, Result};
