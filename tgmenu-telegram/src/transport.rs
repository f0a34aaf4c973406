//! Wraps teloxide::Bot and implements [`tgmenu_core::Transport`]. Production sessions talk to
//! Telegram through this; tests substitute another Transport impl.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatAction as TgChatAction, ChatId as TgChatId, InputFile, InputPollOption,
    MessageId as TgMessageId, ParseMode,
};
use tgmenu_core::{
    ChatAction, ChatId, MediaKind, MediaSource, MenuError, MessageId, OutgoingMedia, OutgoingPoll,
    OutgoingText, Result, Transport,
};
use tracing::debug;

use crate::adapters::{edit_markup, reply_markup};

fn transport_error(e: teloxide::RequestError) -> MenuError {
    MenuError::Transport(e.to_string())
}

/// Thin wrapper around teloxide::Bot that implements tgmenu-core's Transport trait.
/// Text is sent as HTML.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: teloxide::Bot,
}

impl TelegramTransport {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

fn input_file(source: &MediaSource) -> InputFile {
    match source {
        MediaSource::Url(url) => InputFile::url(url.clone()),
        MediaSource::File(path) => InputFile::file(path.clone()),
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, chat: ChatId, message: &OutgoingText) -> Result<MessageId> {
        let mut request = self
            .bot
            .send_message(TgChatId(chat), message.content.clone())
            .parse_mode(ParseMode::Html)
            .disable_notification(!message.notify);
        if let Some(markup) = &message.markup {
            request = request.reply_markup(reply_markup(markup));
        }
        let sent = request.await.map_err(transport_error)?;
        Ok(sent.id.0)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        message: &OutgoingText,
    ) -> Result<()> {
        let mut request = self
            .bot
            .edit_message_text(TgChatId(chat), TgMessageId(message_id), message.content.clone())
            .parse_mode(ParseMode::Html);
        if let Some(markup) = message.markup.as_ref().and_then(edit_markup) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message_id: MessageId) -> Result<()> {
        self.bot
            .delete_message(TgChatId(chat), TgMessageId(message_id))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send_media(&self, chat: ChatId, media: &OutgoingMedia) -> Result<MessageId> {
        let file = input_file(&media.source);
        let sent = match media.kind {
            MediaKind::Photo => self
                .bot
                .send_photo(TgChatId(chat), file)
                .disable_notification(!media.notify)
                .await
                .map_err(transport_error)?,
            MediaKind::Sticker => self
                .bot
                .send_sticker(TgChatId(chat), file)
                .disable_notification(!media.notify)
                .await
                .map_err(transport_error)?,
        };
        Ok(sent.id.0)
    }

    async fn send_poll(&self, chat: ChatId, poll: &OutgoingPoll) -> Result<MessageId> {
        let open_period = u16::try_from(poll.open_period.as_secs()).unwrap_or(u16::MAX);
        let sent = self
            .bot
            .send_poll(
                TgChatId(chat),
                poll.question.clone(),
                poll.options.iter().cloned().map(InputPollOption::new),
            )
            .is_anonymous(false)
            .open_period(open_period)
            .await
            .map_err(transport_error)?;
        Ok(sent.id.0)
    }

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> Result<()> {
        let action = match action {
            ChatAction::Typing => TgChatAction::Typing,
            ChatAction::UploadPhoto => TgChatAction::UploadPhoto,
        };
        self.bot
            .send_chat_action(TgChatId(chat), action)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, text: &str) -> Result<()> {
        let request = self
            .bot
            .answer_callback_query(CallbackQueryId(query_id.to_owned()));
        let request = if text.is_empty() {
            request
        } else {
            debug!(query_id = %query_id, text = %text, "Answering callback with notification");
            request.text(text.to_owned())
        };
        request.await.map_err(transport_error)?;
        Ok(())
    }
}
