pub mod assertions;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod feature;
pub mod http;
pub mod report;
pub mod runner;
pub mod steps;

pub use config::Config;
pub use error::HarnessError;
pub use runner::Runner;
