//! # tgmenu-telegram
//!
//! Telegram layer for tgmenu: teloxide adapters, the [`TelegramTransport`] implementation of
//! [`tgmenu_core::Transport`], env config and the update dispatcher.
//! Handles only Telegram connectivity; menu state lives in tgmenu-session.

mod adapters;
mod config;
mod runner;
mod transport;

pub use adapters::{
    callback_event, edit_markup, message_event, parse_command, poll_answer_event, reply_markup,
    user_name,
};
pub use config::{TelegramConfig, DEFAULT_LOG_FILE, DEFAULT_START_COMMAND};
pub use runner::{build_bot, run_dispatcher, run_menu_bot};
pub use transport::TelegramTransport;
