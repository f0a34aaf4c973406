//! Message capability and the per-message state a session tracks.
//!
//! Applications implement [`Message`]: `render` fills a fresh keyboard and returns HTML content,
//! `on_text` receives free text typed while the message is the most recently active one.
//! [`Screen`] wraps a message with its options, transport id, activity stamp and the snapshot used
//! to skip no-op edits. Menus and app messages are the same type, told apart by
//! [`MessageOptions::inlined`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::button::Button;
use crate::keyboard::{InputField, Keyboard, Markup};
use crate::types::MessageId;

/// Default lifetime of a message without activity.
pub const DEFAULT_EXPIRY_MINUTES: i64 = 12;

pub trait Message: Send + 'static {
    /// Returns the content and fills `keyboard`, which is always empty on entry.
    fn render(&mut self, keyboard: &mut Keyboard) -> String;

    /// Free text typed while this message was the most recently active one.
    fn on_text(&mut self, _text: &str) {}

    /// Called right before an app message is reclaimed.
    fn on_expire(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOptions {
    pub label: String,
    /// App message with an inline keyboard instead of a menu with a reply keyboard.
    pub inlined: bool,
    /// Go back to the home menu after the message is sent.
    pub home_after: bool,
    pub notify: bool,
    pub expiry_period: Duration,
    pub input_field: InputField,
}

impl MessageOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inlined: false,
            home_after: false,
            notify: true,
            expiry_period: Duration::minutes(DEFAULT_EXPIRY_MINUTES),
            input_field: InputField::Auto,
        }
    }

    pub fn inlined(mut self) -> Self {
        self.inlined = true;
        self
    }

    pub fn home_after(mut self) -> Self {
        self.home_after = true;
        self
    }

    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn expiry(mut self, period: Duration) -> Self {
        self.expiry_period = period;
        self
    }

    pub fn input_field(mut self, input_field: InputField) -> Self {
        self.input_field = input_field;
        self
    }
}

/// Shared handle to a screen; the same screen may sit in a keyboard and in a session at once.
pub type ScreenRef = Arc<Mutex<Screen>>;

/// Content and keyboard labels as last delivered to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    content: String,
    labels: Vec<String>,
}

/// Output of one render.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub content: String,
    pub markup: Option<Markup>,
}

pub struct Screen {
    options: MessageOptions,
    label: String,
    composed: bool,
    keyboard: Keyboard,
    message_id: Option<MessageId>,
    last_activity: Option<DateTime<Utc>>,
    snapshot: Option<Snapshot>,
    inner: Box<dyn Message>,
}

impl Screen {
    pub fn new<M: Message>(options: MessageOptions, message: M) -> Self {
        Self {
            label: options.label.clone(),
            keyboard: Keyboard::new(options.inlined),
            options,
            composed: false,
            message_id: None,
            last_activity: None,
            snapshot: None,
            inner: Box::new(message),
        }
    }

    pub fn shared<M: Message>(options: MessageOptions, message: M) -> ScreenRef {
        Arc::new(Mutex::new(Self::new(options, message)))
    }

    /// Current label; for app messages this is the composite `base_trigger` label once sent.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn base_label(&self) -> &str {
        &self.options.label
    }

    pub fn options(&self) -> &MessageOptions {
        &self.options
    }

    pub fn is_inlined(&self) -> bool {
        self.options.inlined
    }

    pub fn home_after(&self) -> bool {
        self.options.home_after
    }

    pub fn notify(&self) -> bool {
        self.options.notify
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// Derives `"{base}_{trigger}"` the first time; later calls keep the composed label.
    pub fn compose_label(&mut self, trigger: &str) -> &str {
        if !self.composed {
            self.label = format!("{}_{}", self.options.label, trigger);
            self.composed = true;
        }
        &self.label
    }

    /// Rebuilds the keyboard from scratch and returns fresh content.
    pub fn refresh(&mut self) -> String {
        let mut keyboard = Keyboard::new(self.options.inlined);
        let content = self.inner.render(&mut keyboard);
        self.keyboard = keyboard;
        content
    }

    /// Renders the keyboard built by the last [`Screen::refresh`].
    pub fn markup(&self, inline: bool) -> Option<Markup> {
        self.keyboard
            .render(&self.label, inline, &self.options.input_field)
    }

    /// Refresh plus markup.
    pub fn render(&mut self, inline: bool) -> Rendered {
        let content = self.refresh();
        Rendered {
            markup: self.markup(inline),
            content,
        }
    }

    pub fn find_button(&self, label: &str) -> Option<Button> {
        self.keyboard.find(label).cloned()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
    }

    /// True once `last_activity + expiry_period` is in the past. Never-sent screens do not expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.last_activity
            .map(|at| at + self.options.expiry_period < now)
            .unwrap_or(false)
    }

    pub fn mark_sent(&mut self, message_id: MessageId) {
        self.message_id = Some(message_id);
    }

    /// True when `content` or the keyboard labels differ from the last snapshot.
    pub fn has_changed(&self, content: &str) -> bool {
        match &self.snapshot {
            Some(snapshot) => {
                snapshot.content != content || snapshot.labels != self.keyboard.labels()
            }
            None => true,
        }
    }

    pub fn take_snapshot(&mut self, content: &str) {
        self.snapshot = Some(Snapshot {
            content: content.to_string(),
            labels: self.keyboard.labels(),
        });
    }

    pub fn text_input(&mut self, text: &str) {
        self.inner.on_text(text);
    }

    /// Runs the expire hook and forgets the transport id.
    pub fn expire(&mut self) -> Option<MessageId> {
        debug!(label = %self.label, message_id = ?self.message_id, "Remove message");
        self.inner.on_expire();
        self.message_id.take()
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("label", &self.label)
            .field("inlined", &self.options.inlined)
            .field("message_id", &self.message_id)
            .field("last_activity", &self.last_activity)
            .finish_non_exhaustive()
    }
}
