pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
pub mod model;
pub mod report;
pub mod server;
pub mod settlement;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use db::{LedgerStore, Mutation};
pub use error::{Error, ErrorType, IntoResult, Result};
