// richtext command-line library exports

pub mod commands;
pub mod config;
pub mod input;

pub use commands::{Command, CommandProcessor, Invocation};
pub use config::Config;
