//! Button: one selectable action on a message keyboard.
//!
//! A [`Button`] is built once per render and never mutated afterwards. What happens on press is
//! described by [`ButtonAction`]: either open another message or invoke a callback, whose result is
//! interpreted according to [`ButtonKind`].

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::ScreenRef;

/// Reserved label: go back one menu.
pub const BACK_LABEL: &str = "Back";
/// Reserved label: return to the home menu.
pub const HOME_LABEL: &str = "Home";

/// How the result of a button callback is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ButtonKind {
    /// Callback result is shown as a transient acknowledgement.
    #[default]
    Notification,
    /// Callback result is sent as a new text message.
    Message,
    /// Callback returns a picture path or URL.
    Picture,
    /// Callback returns a sticker path or URL.
    Sticker,
    /// A poll is sent; the callback runs with the chosen option text.
    Poll,
}

/// Question and options of a poll button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
}

impl PollRequest {
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Payload handed to a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonArgs {
    Value(serde_json::Value),
    Poll(PollRequest),
}

/// What a callback sees when it runs.
#[derive(Debug, Clone, Copy)]
pub struct CallbackContext<'a> {
    /// Arguments attached to the button.
    pub args: Option<&'a ButtonArgs>,
    /// Poll answer text or web-app payload, when the press carried one.
    pub input: Option<&'a str>,
}

impl<'a> CallbackContext<'a> {
    pub fn new(args: Option<&'a ButtonArgs>, input: Option<&'a str>) -> Self {
        Self { args, input }
    }
}

/// Application callback. The returned string is the notification text, message body, or media
/// path depending on [`ButtonKind`].
pub type Callback = Arc<dyn Fn(CallbackContext<'_>) -> String + Send + Sync>;

/// What pressing a button does.
#[derive(Clone)]
pub enum ButtonAction {
    /// Open another message: pushed as a menu, or sent as an app message when inlined.
    Navigate(ScreenRef),
    Invoke(Callback),
}

impl fmt::Debug for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonAction::Navigate(_) => f.write_str("Navigate(..)"),
            ButtonAction::Invoke(_) => f.write_str("Invoke(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Button {
    label: String,
    action: Option<ButtonAction>,
    kind: ButtonKind,
    args: Option<ButtonArgs>,
    notify: bool,
    web_url: Option<Url>,
}

impl Button {
    /// Button with no action; `Back` and `Home` are interpreted by the session.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: None,
            kind: ButtonKind::Notification,
            args: None,
            notify: false,
            web_url: None,
        }
    }

    pub fn back() -> Self {
        Self::new(BACK_LABEL)
    }

    pub fn home() -> Self {
        Self::new(HOME_LABEL)
    }

    /// Opens `screen` when pressed.
    pub fn navigate(mut self, screen: ScreenRef) -> Self {
        self.action = Some(ButtonAction::Navigate(screen));
        self
    }

    /// Runs `callback` when pressed.
    pub fn invoke<F>(mut self, callback: F) -> Self
    where
        F: Fn(CallbackContext<'_>) -> String + Send + Sync + 'static,
    {
        self.action = Some(ButtonAction::Invoke(Arc::new(callback)));
        self
    }

    /// Sends a poll; `callback` runs with the chosen option text.
    pub fn poll<F>(self, request: PollRequest, callback: F) -> Self
    where
        F: Fn(CallbackContext<'_>) -> String + Send + Sync + 'static,
    {
        self.invoke(callback)
            .kind(ButtonKind::Poll)
            .args(ButtonArgs::Poll(request))
    }

    pub fn kind(mut self, kind: ButtonKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn args(mut self, args: ButtonArgs) -> Self {
        self.args = Some(args);
        self
    }

    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    /// Attaches a web app. Only absolute http(s) URLs are kept; anything else is dropped with a
    /// warning and the button renders as a plain button.
    pub fn web_url(mut self, url: &str) -> Self {
        self.web_url = parse_web_url(url);
        if self.web_url.is_none() {
            warn!(label = %self.label, url = %url, "Ignoring invalid web app URL");
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn action(&self) -> Option<&ButtonAction> {
        self.action.as_ref()
    }

    pub fn button_kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn button_args(&self) -> Option<&ButtonArgs> {
        self.args.as_ref()
    }

    pub fn notifies(&self) -> bool {
        self.notify
    }

    pub fn web_app_url(&self) -> Option<&Url> {
        self.web_url.as_ref()
    }

    /// Poll request attached via [`Button::poll`] or [`ButtonArgs::Poll`].
    pub fn poll_request(&self) -> Option<&PollRequest> {
        match &self.args {
            Some(ButtonArgs::Poll(request)) => Some(request),
            _ => None,
        }
    }

    /// Runs the callback, if any, with this button's args.
    pub fn call(&self, input: Option<&str>) -> Option<String> {
        match &self.action {
            Some(ButtonAction::Invoke(callback)) => {
                Some(callback(CallbackContext::new(self.args.as_ref(), input)))
            }
            _ => None,
        }
    }
}

/// Parses an absolute http(s) URL.
pub fn parse_web_url(url: &str) -> Option<Url> {
    Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
}
