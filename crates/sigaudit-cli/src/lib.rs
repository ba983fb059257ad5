mod args;
mod commands;
mod handlers;
pub mod logging;

pub use args::{Cli, Commands, LogLevel};
pub use commands::run;
