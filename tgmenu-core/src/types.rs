//! Transport-neutral identities, outbound payloads and inbound events.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::keyboard::Markup;

/// Chat identity as assigned by the transport.
pub type ChatId = i64;
/// Message identity as assigned by the transport on send.
pub type MessageId = i32;
/// User identity as assigned by the transport.
pub type UserId = i64;

/// Who an inbound event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub user_name: Option<String>,
}

impl ChatInfo {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            user_id: None,
            user_name: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId, user_name: Option<String>) -> Self {
        self.user_id = Some(user_id);
        self.user_name = user_name;
        self
    }
}

/// Inbound event shapes the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/command` typed by the user; `command` has no leading slash and no `@bot` suffix.
    Command { chat: ChatInfo, command: String },
    /// Free text, including reply-keyboard button presses.
    Text { chat: ChatInfo, text: String },
    /// Inline button press; `data` is `"{message_label}.{button_label}"`.
    CallbackQuery {
        chat: ChatInfo,
        query_id: String,
        data: String,
    },
    /// Answer to a non-anonymous poll.
    PollAnswer {
        user_id: UserId,
        option_ids: Vec<usize>,
    },
    /// Payload posted back by a web app launched from a keyboard button.
    WebAppData {
        chat: ChatInfo,
        data: String,
        button_text: String,
    },
}

impl InboundEvent {
    /// Chat the event belongs to; poll answers only carry the voter.
    pub fn chat(&self) -> Option<&ChatInfo> {
        match self {
            InboundEvent::Command { chat, .. }
            | InboundEvent::Text { chat, .. }
            | InboundEvent::CallbackQuery { chat, .. }
            | InboundEvent::WebAppData { chat, .. } => Some(chat),
            InboundEvent::PollAnswer { .. } => None,
        }
    }
}

/// Status hint shown to the user while the bot works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

/// HTML text message with optional keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingText {
    pub content: String,
    pub markup: Option<Markup>,
    pub notify: bool,
}

impl OutgoingText {
    pub fn plain(content: impl Into<String>, notify: bool) -> Self {
        Self {
            content: content.into(),
            markup: None,
            notify,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Sticker,
}

/// Where an attachment is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(Url),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMedia {
    pub kind: MediaKind,
    pub source: MediaSource,
    pub notify: bool,
}

/// Non-anonymous poll that closes by itself after `open_period`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingPoll {
    pub question: String,
    pub options: Vec<String>,
    pub open_period: Duration,
}
