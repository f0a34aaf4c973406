//! Per-chat session: menu stack, app-message queue, button dispatch and expiry sweep.
//!
//! A [`Session`] is only ever touched through its [`SessionRef`] mutex, so inbound events,
//! scheduled sweeps and poll timeouts for one chat run one at a time. Screens are locked one at a
//! time and never nested.

use std::sync::{Arc, Weak};

use futures::FutureExt;
use tgmenu_core::{
    parse_callback_data, Button, ButtonAction, ButtonKind, ChatAction, ChatId, ChatInfo, Clock,
    JobId, MediaKind, MenuError, MessageId, OutgoingMedia, OutgoingText, RecurringJob, Result,
    Scheduler, ScreenRef, SystemClock, Transport, BACK_LABEL, HOME_LABEL,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::media::resolve_media;
use crate::poll::PendingPoll;

pub type SessionRef = Arc<Mutex<Session>>;

/// Capabilities a session is built on.
#[derive(Clone)]
pub struct SessionDeps {
    pub transport: Arc<dyn Transport>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
}

impl SessionDeps {
    /// Uses the wall clock.
    pub fn new(transport: Arc<dyn Transport>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            transport,
            scheduler,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Result of [`Session::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A menu was sent (or home was already showing); id of that message.
    Menu(MessageId),
    /// An inlined message was sent as an app message.
    AppMessage(MessageId),
    /// A callback ran.
    Invoked,
    /// The button has no action.
    Ignored,
    /// No button matched; the text went to the most recently active message.
    TextInput,
}

/// Result of re-rendering a sent message in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// Content and keyboard labels match the last delivered version; nothing was sent.
    Unchanged,
    NotFound,
    /// The transport rejected the edit; the previous content stays visible.
    Failed,
}

pub struct Session {
    chat: ChatInfo,
    pub(crate) deps: SessionDeps,
    pub(crate) config: SessionConfig,
    menu_stack: Vec<ScreenRef>,
    app_messages: Vec<ScreenRef>,
    pub(crate) pending_poll: Option<PendingPoll>,
    pub(crate) poll_seq: u64,
    sweep_job: Option<JobId>,
    pub(crate) handle: Weak<Mutex<Session>>,
}

impl Session {
    /// Creates the session and schedules its recurring expiry sweep.
    pub fn spawn(chat: ChatInfo, deps: SessionDeps, config: SessionConfig) -> SessionRef {
        Arc::new_cyclic(|handle: &Weak<Mutex<Session>>| {
            let sweep_job = schedule_sweep(deps.scheduler.as_ref(), &config, handle.clone());
            info!(
                chat_id = chat.chat_id,
                user = ?chat.user_name,
                "Opening chat session"
            );
            Mutex::new(Session {
                chat,
                deps,
                config,
                menu_stack: Vec::new(),
                app_messages: Vec::new(),
                pending_poll: None,
                poll_seq: 0,
                sweep_job: Some(sweep_job),
                handle: handle.clone(),
            })
        })
    }

    pub fn chat(&self) -> &ChatInfo {
        &self.chat
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat.chat_id
    }

    pub fn depth(&self) -> usize {
        self.menu_stack.len()
    }

    pub fn menu_stack(&self) -> &[ScreenRef] {
        &self.menu_stack
    }

    pub fn app_messages(&self) -> &[ScreenRef] {
        &self.app_messages
    }

    pub fn sweep_job(&self) -> Option<JobId> {
        self.sweep_job
    }

    /// Labels of outstanding app messages, oldest first.
    pub async fn app_message_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.app_messages.len());
        for screen in &self.app_messages {
            labels.push(screen.lock().await.label().to_string());
        }
        labels
    }

    /// Cancels scheduled jobs owned by this session.
    pub fn shutdown(&mut self) {
        if let Some(job) = self.sweep_job.take() {
            self.deps.scheduler.cancel(job);
        }
        if let Some(job) = self.pending_poll.as_mut().and_then(|p| p.timeout_job.take()) {
            self.deps.scheduler.cancel(job);
        }
        debug!(chat_id = self.chat.chat_id, "Session jobs cancelled");
    }

    /// Sends `screen` as a new menu message and pushes it on the stack.
    #[instrument(skip(self, screen), fields(chat_id = self.chat.chat_id))]
    pub async fn goto_menu(&mut self, screen: ScreenRef) -> Result<MessageId> {
        let message_id = self.send_menu(&screen).await?;
        self.menu_stack.push(screen);
        Ok(message_id)
    }

    /// Sends home again as a new message, then drops every menu above it. The stack is left as is
    /// when the send fails.
    #[instrument(skip(self), fields(chat_id = self.chat.chat_id))]
    pub async fn goto_home(&mut self) -> Result<MessageId> {
        match self.menu_stack.len() {
            0 => Err(MenuError::EmptyMenuStack),
            1 => self.home_message_id().await,
            _ => {
                let home = self.menu_stack[0].clone();
                let message_id = self.send_menu(&home).await?;
                self.menu_stack.truncate(1);
                Ok(message_id)
            }
        }
    }

    /// Sends the menu below the current one again, then drops the current one.
    #[instrument(skip(self), fields(chat_id = self.chat.chat_id))]
    pub async fn select_back(&mut self) -> Result<MessageId> {
        match self.menu_stack.len() {
            0 => Err(MenuError::EmptyMenuStack),
            1 => self.home_message_id().await,
            depth => {
                let below = self.menu_stack[depth - 2].clone();
                let message_id = self.send_menu(&below).await?;
                self.menu_stack.pop();
                Ok(message_id)
            }
        }
    }

    /// Handles a reply-keyboard press or free text.
    ///
    /// `Back` and `Home` navigate. Otherwise the menu stack is searched from the top for a button
    /// with this label; text matching no button goes to the most recently active message.
    #[instrument(skip(self), fields(chat_id = self.chat.chat_id))]
    pub async fn select(&mut self, label: &str) -> Result<Selection> {
        match label {
            BACK_LABEL => return self.select_back().await.map(Selection::Menu),
            HOME_LABEL => return self.goto_home().await.map(Selection::Menu),
            _ => {}
        }

        let mut found = None;
        for screen in self.menu_stack.iter().rev() {
            if let Some(button) = screen.lock().await.find_button(label) {
                found = Some(button);
                break;
            }
        }

        let Some(button) = found else {
            self.capture_text_input(label).await;
            return Ok(Selection::TextInput);
        };

        match button.action() {
            Some(ButtonAction::Navigate(target)) => self.open(target.clone(), label).await,
            Some(ButtonAction::Invoke(_)) => {
                button.call(None);
                Ok(Selection::Invoked)
            }
            None => Ok(Selection::Ignored),
        }
    }

    /// Sends `target` as an app message when it is inlined (then goes home if it asks to),
    /// otherwise pushes it as a menu.
    async fn open(&mut self, target: ScreenRef, trigger: &str) -> Result<Selection> {
        let (inlined, home_after) = {
            let screen = target.lock().await;
            (screen.is_inlined(), screen.home_after())
        };
        if !inlined {
            return self.goto_menu(target).await.map(Selection::Menu);
        }
        let message_id = self.send_app_message(target, trigger).await?;
        if home_after {
            self.goto_home().await?;
        }
        Ok(Selection::AppMessage(message_id))
    }

    /// Sends an inlined message labeled `"{base}_{trigger}"`, replacing an outstanding app message
    /// with the same label.
    #[instrument(skip(self, screen), fields(chat_id = self.chat.chat_id))]
    pub async fn send_app_message(&mut self, screen: ScreenRef, trigger: &str) -> Result<MessageId> {
        let label = screen.lock().await.compose_label(trigger).to_string();
        info!(label = %label, "Send app message");

        if let Some(index) = self.app_message_index(&label).await {
            let previous = self.app_messages.remove(index);
            self.discard(&previous).await;
        }

        let now = self.deps.clock.now();
        let message_id = {
            let mut s = screen.lock().await;
            let rendered = s.render(true);
            let outgoing = OutgoingText {
                content: rendered.content.clone(),
                markup: rendered.markup,
                notify: s.notify(),
            };
            let message_id = self
                .deps
                .transport
                .send_message(self.chat.chat_id, &outgoing)
                .await?;
            s.mark_sent(message_id);
            s.touch(now);
            s.take_snapshot(&rendered.content);
            message_id
        };
        self.app_messages.push(screen);
        Ok(message_id)
    }

    /// Re-renders the app message labeled `label` and edits it when something changed.
    pub async fn edit_app_message(&self, label: &str) -> EditOutcome {
        match self.app_message_index(label).await {
            Some(index) => self.edit_screen(&self.app_messages[index]).await,
            None => {
                debug!(label = %label, "No app message to edit");
                EditOutcome::NotFound
            }
        }
    }

    /// Re-renders a sent screen and edits it in place. Edit failures are logged, not returned.
    pub async fn edit_screen(&self, screen: &ScreenRef) -> EditOutcome {
        let mut s = screen.lock().await;
        let Some(message_id) = s.message_id() else {
            return EditOutcome::NotFound;
        };
        let content = s.refresh();
        if !s.has_changed(&content) {
            return EditOutcome::Unchanged;
        }
        let outgoing = OutgoingText {
            content,
            markup: s.markup(s.is_inlined()),
            notify: s.notify(),
        };
        match self
            .deps
            .transport
            .edit_message(self.chat.chat_id, message_id, &outgoing)
            .await
        {
            Ok(()) => {
                s.take_snapshot(&outgoing.content);
                EditOutcome::Edited
            }
            Err(e) => {
                error!(error = %e, label = %s.label(), message_id, "Failed to edit message");
                EditOutcome::Failed
            }
        }
    }

    /// Handles an inline button press. `data` is `"{message_label}.{button_label}"`.
    ///
    /// The query is always answered. Returns the outcome of re-editing the originating message, or
    /// `None` when the message or button could not be resolved.
    #[instrument(skip(self), fields(chat_id = self.chat.chat_id))]
    pub async fn on_callback(&mut self, data: &str, query_id: &str) -> Option<EditOutcome> {
        let (message_label, button_label) = match parse_callback_data(data) {
            Ok(parts) => parts,
            Err(e) => {
                error!(error = %e, "Malformed callback data");
                self.answer_callback(query_id, "").await;
                return None;
            }
        };

        let Some(screen) = self.find_screen(message_label).await else {
            warn!(label = %message_label, "Callback for unknown message");
            self.answer_callback(query_id, "").await;
            return None;
        };
        let button = screen.lock().await.find_button(button_label);
        let Some(button) = button else {
            warn!(label = %message_label, button = %button_label, "Callback for unknown button");
            self.answer_callback(query_id, "").await;
            return None;
        };

        let notification = self.run_button(&button).await;
        self.answer_callback(query_id, notification.as_deref().unwrap_or(""))
            .await;

        let now = self.deps.clock.now();
        screen.lock().await.touch(now);
        Some(self.edit_screen(&screen).await)
    }

    /// Delivers a web-app payload to the button that launched the app.
    #[instrument(skip(self, data), fields(chat_id = self.chat.chat_id))]
    pub async fn on_web_app_data(&mut self, data: &str, button_text: &str) {
        let mut found = None;
        for screen in self.menu_stack.iter().rev().chain(self.app_messages.iter().rev()) {
            if let Some(button) = screen.lock().await.find_button(button_text) {
                found = Some(button);
                break;
            }
        }
        let Some(button) = found else {
            warn!(button = %button_text, "Web app data for unknown button");
            return;
        };

        match button.action() {
            Some(ButtonAction::Navigate(target)) => {
                if let Err(e) = self.open(target.clone(), button_text).await {
                    error!(error = %e, button = %button_text, "Failed to open web app target");
                }
            }
            Some(ButtonAction::Invoke(_)) => {
                let reply = button.call(Some(data)).unwrap_or_default();
                if !reply.is_empty() {
                    self.send_text(&reply, button.notifies()).await;
                }
            }
            None => debug!(button = %button_text, "Web app button has no action"),
        }
    }

    /// Runs an inline button according to its kind. Returns the notification text, if any.
    async fn run_button(&mut self, button: &Button) -> Option<String> {
        let callback = match button.action() {
            None => return None,
            Some(ButtonAction::Navigate(target)) => {
                if let Err(e) = self.open(target.clone(), button.label()).await {
                    error!(error = %e, button = %button.label(), "Failed to open message");
                }
                return None;
            }
            Some(ButtonAction::Invoke(callback)) => callback.clone(),
        };

        match button.button_kind() {
            ButtonKind::Picture | ButtonKind::Sticker => {
                self.chat_action(ChatAction::UploadPhoto).await;
                let path = button.call(None).unwrap_or_default();
                let requested = if button.button_kind() == ButtonKind::Sticker {
                    MediaKind::Sticker
                } else {
                    MediaKind::Photo
                };
                let (kind, source) =
                    resolve_media(&path, requested, &self.config.default_picture).await;
                let media = OutgoingMedia {
                    kind,
                    source,
                    notify: button.notifies(),
                };
                if let Err(e) = self.deps.transport.send_media(self.chat.chat_id, &media).await {
                    error!(error = %e, button = %button.label(), "Failed to send media");
                }
                None
            }
            ButtonKind::Message => {
                self.chat_action(ChatAction::Typing).await;
                let text = button.call(None).unwrap_or_default();
                if !text.is_empty() {
                    self.send_text(&text, button.notifies()).await;
                }
                None
            }
            ButtonKind::Poll => {
                match button.poll_request() {
                    Some(request) => {
                        if let Err(e) = self.start_poll(request.clone(), callback).await {
                            error!(error = %e, button = %button.label(), "Failed to start poll");
                        }
                    }
                    None => error!(button = %button.label(), "Poll button without poll request"),
                }
                None
            }
            ButtonKind::Notification => button.call(None),
        }
    }

    /// Deletes expired app messages, and returns home when the current menu expired.
    pub async fn sweep_expired(&mut self) {
        let now = self.deps.clock.now();

        let mut kept = Vec::with_capacity(self.app_messages.len());
        for screen in std::mem::take(&mut self.app_messages) {
            let expired = screen.lock().await.is_expired(now);
            if expired {
                self.discard(&screen).await;
            } else {
                kept.push(screen);
            }
        }
        self.app_messages = kept;

        if self.menu_stack.len() >= 2 {
            let top_expired = self.menu_stack[self.menu_stack.len() - 1]
                .lock()
                .await
                .is_expired(now);
            if top_expired {
                info!(chat_id = self.chat.chat_id, "Menu expired, returning home");
                if let Err(e) = self.goto_home().await {
                    error!(error = %e, chat_id = self.chat.chat_id, "Failed to return home");
                }
            }
        }
    }

    /// Best-effort delete; failures (message already gone) are logged and swallowed.
    pub async fn delete_message(&self, message_id: MessageId) -> bool {
        match self
            .deps
            .transport
            .delete_message(self.chat.chat_id, message_id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, message_id, "Failed to delete message");
                false
            }
        }
    }

    async fn send_menu(&self, screen: &ScreenRef) -> Result<MessageId> {
        let now = self.deps.clock.now();
        let mut s = screen.lock().await;
        let rendered = s.render(false);
        info!(label = %s.label(), "Opening menu");
        let outgoing = OutgoingText {
            content: rendered.content.clone(),
            markup: rendered.markup,
            notify: s.notify(),
        };
        let message_id = self
            .deps
            .transport
            .send_message(self.chat.chat_id, &outgoing)
            .await?;
        s.mark_sent(message_id);
        s.touch(now);
        s.take_snapshot(&rendered.content);
        Ok(message_id)
    }

    async fn home_message_id(&self) -> Result<MessageId> {
        let home = self.menu_stack[0].lock().await;
        match home.message_id() {
            Some(message_id) => Ok(message_id),
            None => Err(MenuError::NotSent(home.label().to_string())),
        }
    }

    async fn discard(&self, screen: &ScreenRef) {
        let message_id = screen.lock().await.expire();
        if let Some(message_id) = message_id {
            self.delete_message(message_id).await;
        }
    }

    async fn app_message_index(&self, label: &str) -> Option<usize> {
        for (index, screen) in self.app_messages.iter().enumerate() {
            if screen.lock().await.label() == label {
                return Some(index);
            }
        }
        None
    }

    /// App messages first (newest first), then the menu stack from the top.
    async fn find_screen(&self, label: &str) -> Option<ScreenRef> {
        for screen in self.app_messages.iter().rev().chain(self.menu_stack.iter().rev()) {
            if screen.lock().await.label() == label {
                return Some(screen.clone());
            }
        }
        None
    }

    async fn capture_text_input(&self, text: &str) {
        let Some(menu) = self.menu_stack.last() else {
            warn!(chat_id = self.chat.chat_id, "Text input before any menu was opened");
            return;
        };
        let mut target = menu.clone();
        let mut target_at = menu.lock().await.last_activity();
        for screen in &self.app_messages {
            let at = screen.lock().await.last_activity();
            if at > target_at {
                target = screen.clone();
                target_at = at;
            }
        }
        target.lock().await.text_input(text);
    }

    async fn send_text(&self, text: &str, notify: bool) {
        let outgoing = OutgoingText::plain(text, notify);
        if let Err(e) = self
            .deps
            .transport
            .send_message(self.chat.chat_id, &outgoing)
            .await
        {
            error!(error = %e, chat_id = self.chat.chat_id, "Failed to send message");
        }
    }

    async fn chat_action(&self, action: ChatAction) {
        if let Err(e) = self
            .deps
            .transport
            .send_chat_action(self.chat.chat_id, action)
            .await
        {
            debug!(error = %e, ?action, "Failed to send chat action");
        }
    }

    async fn answer_callback(&self, query_id: &str, text: &str) {
        if let Err(e) = self.deps.transport.answer_callback(query_id, text).await {
            warn!(error = %e, query_id = %query_id, "Failed to answer callback query");
        }
    }
}

fn schedule_sweep(
    scheduler: &dyn Scheduler,
    config: &SessionConfig,
    handle: Weak<Mutex<Session>>,
) -> JobId {
    let job: RecurringJob = Arc::new(move || {
        let handle = handle.clone();
        async move {
            if let Some(session) = handle.upgrade() {
                session.lock().await.sweep_expired().await;
            }
        }
        .boxed()
    });
    scheduler.schedule_recurring(config.sweep_interval, job)
}
