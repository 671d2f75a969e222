//! Crate implementing the `vsd` command.

mod cli;
mod client;
mod config;
mod output;
mod run;

pub use self::cli::CliOpts;
pub use self::client::ConsoleClient;
pub use self::config::{LogTarget, Settings, VsdConfig};
pub use self::output::{Color, Output};
pub use self::run::evaluate_run;
