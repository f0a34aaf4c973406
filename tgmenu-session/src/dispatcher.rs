//! Routes inbound events to per-chat sessions, creating a session on first contact.

use std::collections::HashMap;
use std::sync::Arc;

use tgmenu_core::{ChatId, ChatInfo, InboundEvent, MenuError, Result, ScreenRef, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SessionConfig;
use crate::session::{Session, SessionDeps, SessionRef};

/// Builds the home screen of a new session.
pub type StartMessage = Arc<dyn Fn(&ChatInfo) -> ScreenRef + Send + Sync>;

/// Process-wide chat → session registry.
pub struct Dispatcher {
    deps: SessionDeps,
    config: SessionConfig,
    start_command: String,
    start_message: StartMessage,
    sessions: Mutex<HashMap<ChatId, SessionRef>>,
    voters: RwLock<HashMap<UserId, ChatId>>,
}

impl Dispatcher {
    /// Fails on an invalid config or a start command that is empty or contains whitespace.
    /// A leading `/` is accepted and stripped.
    pub fn new<F>(
        deps: SessionDeps,
        config: SessionConfig,
        start_command: &str,
        start_message: F,
    ) -> Result<Self>
    where
        F: Fn(&ChatInfo) -> ScreenRef + Send + Sync + 'static,
    {
        config.validate()?;
        let start_command = start_command.trim_start_matches('/');
        if start_command.is_empty() || start_command.chars().any(char::is_whitespace) {
            return Err(MenuError::Config(format!(
                "invalid start command '{}'",
                start_command
            )));
        }
        Ok(Self {
            deps,
            config,
            start_command: start_command.to_string(),
            start_message: Arc::new(start_message),
            sessions: Mutex::new(HashMap::new()),
            voters: RwLock::new(HashMap::new()),
        })
    }

    pub fn start_command(&self) -> &str {
        &self.start_command
    }

    pub async fn session(&self, chat_id: ChatId) -> Option<SessionRef> {
        self.sessions.lock().await.get(&chat_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Handles one inbound event to completion.
    #[instrument(skip(self, event))]
    pub async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        if let Some(chat) = event.chat() {
            self.remember_voter(chat).await;
        }

        match event {
            InboundEvent::Command { chat, command } => {
                if command == self.start_command {
                    self.start_session(chat).await?;
                } else if self.session_or_start(&chat).await?.is_some() {
                    debug!(chat_id = chat.chat_id, command = %command, "Ignoring unknown command");
                }
            }
            InboundEvent::Text { chat, text } => {
                if let Some(mut session) = self.session_or_start(&chat).await? {
                    session.select(&text).await?;
                }
            }
            InboundEvent::CallbackQuery {
                chat,
                query_id,
                data,
            } => {
                if let Some(mut session) = self.session_or_start(&chat).await? {
                    session.on_callback(&data, &query_id).await;
                }
            }
            InboundEvent::WebAppData {
                chat,
                data,
                button_text,
            } => {
                if let Some(mut session) = self.session_or_start(&chat).await? {
                    session.on_web_app_data(&data, &button_text).await;
                }
            }
            InboundEvent::PollAnswer {
                user_id,
                option_ids,
            } => self.poll_answer(user_id, &option_ids).await,
        }
        Ok(())
    }

    /// Opens a fresh session with the home screen, replacing the chat's current session.
    #[instrument(skip(self, chat), fields(chat_id = chat.chat_id))]
    pub async fn start_session(&self, chat: ChatInfo) -> Result<SessionRef> {
        let session = Session::spawn(chat.clone(), self.deps.clone(), self.config.clone());
        let mut guard = session.clone().lock_owned().await;
        let previous = self
            .sessions
            .lock()
            .await
            .insert(chat.chat_id, session.clone());
        if let Some(previous) = previous {
            info!("Replacing existing session");
            previous.lock().await.shutdown();
            self.forget_voters(chat.chat_id, chat.user_id).await;
        }
        self.open_home(&chat, &session, &mut guard).await?;
        Ok(session)
    }

    /// Locks the chat's session, or opens one (sending the home screen) and returns `None` so the
    /// triggering event is not processed further.
    async fn session_or_start(&self, chat: &ChatInfo) -> Result<Option<OwnedMutexGuard<Session>>> {
        let (session, mut guard) = {
            let mut sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(&chat.chat_id).cloned() {
                drop(sessions);
                return Ok(Some(session.lock_owned().await));
            }
            let session = Session::spawn(chat.clone(), self.deps.clone(), self.config.clone());
            let guard = session.clone().lock_owned().await;
            sessions.insert(chat.chat_id, session.clone());
            (session, guard)
        };
        self.open_home(chat, &session, &mut guard).await?;
        Ok(None)
    }

    /// Sends the home screen; on failure the session is dropped from the registry.
    async fn open_home(
        &self,
        chat: &ChatInfo,
        handle: &SessionRef,
        session: &mut Session,
    ) -> Result<()> {
        let home = (self.start_message)(chat);
        if let Err(e) = session.goto_menu(home).await {
            error!(error = %e, chat_id = chat.chat_id, "Failed to send start message");
            session.shutdown();
            let mut sessions = self.sessions.lock().await;
            if sessions
                .get(&chat.chat_id)
                .is_some_and(|current| Arc::ptr_eq(current, handle))
            {
                sessions.remove(&chat.chat_id);
                drop(sessions);
                self.forget_voters(chat.chat_id, None).await;
            }
            return Err(e);
        }
        Ok(())
    }

    async fn remember_voter(&self, chat: &ChatInfo) {
        if let Some(user_id) = chat.user_id {
            let known = self.voters.read().await.get(&user_id) == Some(&chat.chat_id);
            if !known {
                self.voters.write().await.insert(user_id, chat.chat_id);
            }
        }
    }

    /// Drops voter entries that point at `chat_id`, except `keep`. Users re-register on their
    /// next event in that chat.
    async fn forget_voters(&self, chat_id: ChatId, keep: Option<UserId>) {
        let mut voters = self.voters.write().await;
        let before = voters.len();
        voters.retain(|user_id, chat| *chat != chat_id || Some(*user_id) == keep);
        if voters.len() != before {
            debug!(chat_id, pruned = before - voters.len(), "Pruned voters");
        }
    }

    /// Number of users whose poll answers can be routed to a chat.
    pub async fn voter_count(&self) -> usize {
        self.voters.read().await.len()
    }

    async fn poll_answer(&self, user_id: UserId, option_ids: &[usize]) {
        let chat_id = self
            .voters
            .read()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or(user_id);
        let Some(session) = self.session(chat_id).await else {
            warn!(user_id, "Poll answer from user without session");
            return;
        };
        let Some(&index) = option_ids.first() else {
            debug!(user_id, "Poll vote retracted");
            return;
        };
        session.lock().await.on_poll_answer(index).await;
    }
}
