//! # tgmenu-core
//!
//! Core types and traits for menu-driven chat navigation: [`Button`], [`Keyboard`], the [`Message`]
//! capability and its [`Screen`] state, plus the [`Transport`], [`Scheduler`] and [`Clock`]
//! capabilities sessions are built on, and tracing initialization. Transport-agnostic; used by
//! tgmenu-session and tgmenu-telegram.

pub mod button;
pub mod clock;
pub mod error;
pub mod keyboard;
pub mod logger;
pub mod message;
pub mod scheduler;
pub mod transport;
pub mod types;

pub use button::{
    parse_web_url, Button, ButtonAction, ButtonArgs, ButtonKind, Callback, CallbackContext,
    PollRequest, BACK_LABEL, HOME_LABEL,
};
pub use clock::{Clock, SystemClock};
pub use error::{MenuError, Result};
pub use keyboard::{
    callback_data, parse_callback_data, InputField, Keyboard, Markup, MarkupButton,
    INLINE_ROW_CAPACITY, MAX_CALLBACK_DATA_LEN, REPLY_ROW_CAPACITY,
};
pub use logger::init_tracing;
pub use message::{Message, MessageOptions, Rendered, Screen, ScreenRef, DEFAULT_EXPIRY_MINUTES};
pub use scheduler::{JobId, OnceJob, RecurringJob, Scheduler};
pub use transport::Transport;
pub use types::{
    ChatAction, ChatId, ChatInfo, InboundEvent, MediaKind, MediaSource, MessageId, OutgoingMedia,
    OutgoingPoll, OutgoingText, UserId,
};
