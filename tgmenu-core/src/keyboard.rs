//! Keyboard: ordered rows of buttons, and its transport-neutral rendering.

use reqwest::Url;
use tracing::warn;

use crate::button::Button;
use crate::error::{MenuError, Result};

/// Buttons per row on reply keyboards.
pub const REPLY_ROW_CAPACITY: usize = 2;
/// Buttons per row on inline keyboards.
pub const INLINE_ROW_CAPACITY: usize = 4;
/// Telegram rejects callback data longer than this.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

/// Placeholder shown in the text input while a reply keyboard is open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputField {
    /// First button label of the first row.
    #[default]
    Auto,
    Disabled,
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Keyboard {
    rows: Vec<Vec<Button>>,
    row_capacity: usize,
}

impl Keyboard {
    /// Empty keyboard sized for inline (4 per row) or reply (2 per row) rendering.
    pub fn new(inlined: bool) -> Self {
        Self::with_capacity(if inlined {
            INLINE_ROW_CAPACITY
        } else {
            REPLY_ROW_CAPACITY
        })
    }

    pub fn with_capacity(row_capacity: usize) -> Self {
        Self {
            rows: Vec::new(),
            row_capacity: row_capacity.max(1),
        }
    }

    /// Appends to the last row, or starts a new row when asked to or when the last row is full.
    /// A label already present is skipped so lookups stay unambiguous.
    pub fn add_button(&mut self, button: Button, new_row: bool) -> &mut Self {
        if self.find(button.label()).is_some() {
            warn!(label = %button.label(), "Duplicate button label skipped");
            return self;
        }
        match self.rows.last_mut() {
            Some(row) if !new_row && row.len() < self.row_capacity => row.push(button),
            _ => self.rows.push(vec![button]),
        }
        self
    }

    pub fn add(&mut self, button: Button) -> &mut Self {
        self.add_button(button, false)
    }

    pub fn add_row(&mut self, button: Button) -> &mut Self {
        self.add_button(button, true)
    }

    pub fn add_back(&mut self) -> &mut Self {
        self.add(Button::back())
    }

    pub fn add_home(&mut self) -> &mut Self {
        self.add(Button::home())
    }

    /// First button with `label`, scanning rows in order.
    pub fn find(&self, label: &str) -> Option<&Button> {
        self.rows.iter().flatten().find(|b| b.label() == label)
    }

    /// All labels in row-major order.
    pub fn labels(&self) -> Vec<String> {
        self.rows
            .iter()
            .flatten()
            .map(|b| b.label().to_string())
            .collect()
    }

    pub fn rows(&self) -> &[Vec<Button>] {
        &self.rows
    }

    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Renders the keyboard for a message labeled `message_label`. Empty keyboards render to `None`.
    pub fn render(&self, message_label: &str, inline: bool, input_field: &InputField) -> Option<Markup> {
        if self.is_empty() {
            return None;
        }
        let rows: Vec<Vec<MarkupButton>> = self
            .rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.iter()
                    .map(|b| MarkupButton::from_button(message_label, b))
                    .collect()
            })
            .collect();

        if inline {
            return Some(Markup::Inline { rows });
        }
        let placeholder = match input_field {
            InputField::Disabled => None,
            InputField::Text(text) => Some(text.clone()),
            InputField::Auto => rows
                .first()
                .and_then(|row| row.first())
                .map(|b| b.text.clone()),
        };
        Some(Markup::Reply { rows, placeholder })
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new(false)
    }
}

/// One rendered button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupButton {
    pub text: String,
    pub callback_data: String,
    /// Web app opened instead of sending callback data.
    pub web_app: Option<Url>,
}

impl MarkupButton {
    fn from_button(message_label: &str, button: &Button) -> Self {
        let callback_data = callback_data(message_label, button.label());
        if callback_data.len() > MAX_CALLBACK_DATA_LEN {
            warn!(
                callback_data = %callback_data,
                len = callback_data.len(),
                "Callback data exceeds transport limit"
            );
        }
        Self {
            text: button.label().to_string(),
            callback_data,
            web_app: button.web_app_url().cloned(),
        }
    }
}

/// Keyboard as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline {
        rows: Vec<Vec<MarkupButton>>,
    },
    Reply {
        rows: Vec<Vec<MarkupButton>>,
        placeholder: Option<String>,
    },
}

impl Markup {
    pub fn rows(&self) -> &[Vec<MarkupButton>] {
        match self {
            Markup::Inline { rows } | Markup::Reply { rows, .. } => rows,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Markup::Inline { .. })
    }
}

/// Encodes the callback data of a button.
pub fn callback_data(message_label: &str, button_label: &str) -> String {
    format!("{}.{}", message_label, button_label)
}

/// Splits callback data on the first `.` into (message label, button label).
pub fn parse_callback_data(data: &str) -> Result<(&str, &str)> {
    match data.split_once('.') {
        Some((message, button)) if !message.is_empty() && !button.is_empty() => {
            Ok((message, button))
        }
        _ => Err(MenuError::InvalidCallbackData(data.to_string())),
    }
}
