//! Adapters between teloxide types and tgmenu-core types.
//! Depends only on teloxide and tgmenu_core type definitions.

use teloxide::types::{
    ButtonRequest, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, MaybeAnonymousUser, Message, PollAnswer, ReplyMarkup, User, WebAppInfo,
};
use tgmenu_core::{ChatInfo, InboundEvent, Markup, MarkupButton};

/// Reply or inline markup for a send.
pub fn reply_markup(markup: &Markup) -> ReplyMarkup {
    match markup {
        Markup::Inline { rows } => ReplyMarkup::InlineKeyboard(inline_keyboard(rows)),
        Markup::Reply { rows, placeholder } => {
            let keyboard = KeyboardMarkup::new(
                rows.iter()
                    .map(|row| row.iter().map(keyboard_button).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
            )
            .resize_keyboard();
            let keyboard = match placeholder {
                Some(text) => keyboard.input_field_placeholder(text.clone()),
                None => keyboard,
            };
            ReplyMarkup::Keyboard(keyboard)
        }
    }
}

/// Inline markup for an edit; Telegram only accepts inline keyboards on edited messages.
pub fn edit_markup(markup: &Markup) -> Option<InlineKeyboardMarkup> {
    match markup {
        Markup::Inline { rows } => Some(inline_keyboard(rows)),
        Markup::Reply { .. } => None,
    }
}

fn inline_keyboard(rows: &[Vec<MarkupButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| match &b.web_app {
                Some(url) => {
                    InlineKeyboardButton::web_app(b.text.clone(), WebAppInfo { url: url.clone() })
                }
                None => InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone()),
            })
            .collect::<Vec<_>>()
    }))
}

fn keyboard_button(button: &MarkupButton) -> KeyboardButton {
    let key = KeyboardButton::new(button.text.clone());
    match &button.web_app {
        Some(url) => key.request(ButtonRequest::WebApp(WebAppInfo { url: url.clone() })),
        None => key,
    }
}

/// Display name: username, or first name when there is none.
pub fn user_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

fn chat_info(chat_id: i64, user: Option<&User>) -> ChatInfo {
    let chat = ChatInfo::new(chat_id);
    match user {
        Some(user) => chat.with_user(user.id.0 as i64, Some(user_name(user))),
        None => chat,
    }
}

/// `"/start@my_bot arg"` → `"start"`. Returns `None` for text that is not a command.
pub fn parse_command(text: &str) -> Option<String> {
    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    let command = word.split('@').next().unwrap_or(word);
    (!command.is_empty()).then(|| command.to_string())
}

/// Command, web-app payload or plain text; other message kinds yield `None`.
pub fn message_event(msg: &Message) -> Option<InboundEvent> {
    let chat = chat_info(msg.chat.id.0, msg.from.as_ref());
    if let Some(web_app) = msg.web_app_data() {
        return Some(InboundEvent::WebAppData {
            chat,
            data: web_app.data.clone(),
            button_text: web_app.button_text.clone(),
        });
    }
    let text = msg.text()?;
    Some(match parse_command(text) {
        Some(command) => InboundEvent::Command { chat, command },
        None => InboundEvent::Text {
            chat,
            text: text.to_string(),
        },
    })
}

/// Inline button press. Presses without data (game buttons) yield `None`.
pub fn callback_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let data = q.data.clone()?;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id.0)
        .unwrap_or(q.from.id.0 as i64);
    Some(InboundEvent::CallbackQuery {
        chat: chat_info(chat_id, Some(&q.from)),
        query_id: q.id.0.clone(),
        data,
    })
}

/// Poll answer from a user. Anonymous (chat) votes yield `None`.
pub fn poll_answer_event(answer: &PollAnswer) -> Option<InboundEvent> {
    match &answer.voter {
        MaybeAnonymousUser::User(user) => Some(InboundEvent::PollAnswer {
            user_id: user.id.0 as i64,
            option_ids: answer.option_ids.iter().map(|&id| id as usize).collect(),
        }),
        MaybeAnonymousUser::Chat(_) => None,
    }
}
