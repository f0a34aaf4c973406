//! # tgmenu-cli
//!
//! Argument parsing and the demo menu tree run by the `tgmenu` binary.

pub mod cli;
pub mod demo;

pub use cli::{load_config, Cli, Commands};
pub use demo::start_message;
