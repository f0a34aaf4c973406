//! Chat transport capability consumed by sessions.
//!
//! [`Transport`] is transport-agnostic; the teloxide implementation lives in `tgmenu-telegram`
//! and tests substitute recording fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatAction, ChatId, MessageId, OutgoingMedia, OutgoingPoll, OutgoingText};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a text message and returns the id the transport assigned to it.
    async fn send_message(&self, chat: ChatId, message: &OutgoingText) -> Result<MessageId>;

    /// Replaces text and inline keyboard of a sent message.
    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        message: &OutgoingText,
    ) -> Result<()>;

    /// Deletes a sent message. Callers treat failures as best-effort.
    async fn delete_message(&self, chat: ChatId, message_id: MessageId) -> Result<()>;

    /// Sends a photo or sticker.
    async fn send_media(&self, chat: ChatId, media: &OutgoingMedia) -> Result<MessageId>;

    /// Sends a poll and returns the id of the poll message.
    async fn send_poll(&self, chat: ChatId, poll: &OutgoingPoll) -> Result<MessageId>;

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> Result<()>;

    /// Acknowledges an inline button press; empty `text` shows no toast.
    async fn answer_callback(&self, query_id: &str, text: &str) -> Result<()>;
}
