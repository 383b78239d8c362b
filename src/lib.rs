pub mod cli;
pub mod client;
pub mod encrypt;
pub mod load_config;
pub mod prompt;

pub use cli::{run, Cli, Commands};
