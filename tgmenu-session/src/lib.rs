//! # tgmenu-session
//!
//! Per-chat menu sessions on top of tgmenu-core: the menu stack, app messages with expiry, the
//! single-slot poll exchange, and the [`Dispatcher`] that routes inbound events to sessions.
//! [`TokioScheduler`] runs scheduled jobs on the tokio runtime.

pub mod config;
pub mod dispatcher;
pub mod media;
pub mod poll;
pub mod scheduler;
pub mod session;

pub use config::{
    SessionConfig, DEFAULT_PICTURE, DEFAULT_POLL_DELETE_DELAY_SECS, DEFAULT_POLL_GRACE_SECS,
    DEFAULT_POLL_WINDOW_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
};
pub use dispatcher::{Dispatcher, StartMessage};
pub use media::{media_source, resolve_media};
pub use poll::PendingPoll;
pub use scheduler::TokioScheduler;
pub use session::{EditOutcome, Selection, Session, SessionDeps, SessionRef};
