//! Test doubles for session tests: a recording transport, a manually driven scheduler and clock,
//! and a configurable message.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tgmenu_core::{
    Button, ChatAction, ChatId, ChatInfo, Clock, JobId, Keyboard, Markup, MenuError, Message,
    MessageId, MessageOptions, OnceJob, OutgoingMedia, OutgoingPoll, OutgoingText, RecurringJob,
    Result, Scheduler, Screen, ScreenRef, Transport,
};
use tgmenu_session::{Session, SessionConfig, SessionDeps, SessionRef};

/// One call made to [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        chat: ChatId,
        message_id: MessageId,
        message: OutgoingText,
    },
    Edit {
        chat: ChatId,
        message_id: MessageId,
        message: OutgoingText,
    },
    Delete {
        chat: ChatId,
        message_id: MessageId,
    },
    Media {
        chat: ChatId,
        message_id: MessageId,
        media: OutgoingMedia,
    },
    Poll {
        chat: ChatId,
        message_id: MessageId,
        poll: OutgoingPoll,
    },
    Action {
        chat: ChatId,
        action: ChatAction,
    },
    Answer {
        query_id: String,
        text: String,
    },
}

/// Records every call and hands out increasing message ids starting at 1.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    pub fail_send: AtomicBool,
    pub fail_edit: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl RecordingTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<(MessageId, OutgoingText)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send {
                    message_id,
                    message,
                    ..
                } => Some((message_id, message)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, m)| m.content).collect()
    }

    pub fn edits(&self) -> Vec<(MessageId, OutgoingText)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit {
                    message_id,
                    message,
                    ..
                } => Some((message_id, message)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { message_id, .. } => Some(message_id),
                _ => None,
            })
            .collect()
    }

    pub fn polls(&self) -> Vec<(MessageId, OutgoingPoll)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Poll {
                    message_id, poll, ..
                } => Some((message_id, poll)),
                _ => None,
            })
            .collect()
    }

    pub fn media(&self) -> Vec<OutgoingMedia> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Media { media, .. } => Some(media),
                _ => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<ChatAction> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Action { action, .. } => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Answer { query_id, text } => Some((query_id, text)),
                _ => None,
            })
            .collect()
    }

    fn next_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, chat: ChatId, message: &OutgoingText) -> Result<MessageId> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(MenuError::Transport("send rejected".into()));
        }
        let message_id = self.next_id();
        self.record(Call::Send {
            chat,
            message_id,
            message: message.clone(),
        });
        Ok(message_id)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        message: &OutgoingText,
    ) -> Result<()> {
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(MenuError::Transport("message to edit not found".into()));
        }
        self.record(Call::Edit {
            chat,
            message_id,
            message: message.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message_id: MessageId) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(MenuError::Transport("message to delete not found".into()));
        }
        self.record(Call::Delete { chat, message_id });
        Ok(())
    }

    async fn send_media(&self, chat: ChatId, media: &OutgoingMedia) -> Result<MessageId> {
        let message_id = self.next_id();
        self.record(Call::Media {
            chat,
            message_id,
            media: media.clone(),
        });
        Ok(message_id)
    }

    async fn send_poll(&self, chat: ChatId, poll: &OutgoingPoll) -> Result<MessageId> {
        let message_id = self.next_id();
        self.record(Call::Poll {
            chat,
            message_id,
            poll: poll.clone(),
        });
        Ok(message_id)
    }

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> Result<()> {
        self.record(Call::Action { chat, action });
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str, text: &str) -> Result<()> {
        self.record(Call::Answer {
            query_id: query_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

enum Job {
    Recurring(Duration, RecurringJob),
    Once(Duration, OnceJob),
}

/// Keeps jobs until the test runs them.
#[derive(Default)]
pub struct ManualScheduler {
    next_id: AtomicU64,
    jobs: Mutex<Vec<(JobId, Job)>>,
    cancelled: Mutex<Vec<JobId>>,
}

impl ManualScheduler {
    /// Runs one tick of every recurring job.
    pub async fn tick(&self) {
        let jobs: Vec<RecurringJob> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, job)| match job {
                Job::Recurring(_, job) => Some(job.clone()),
                Job::Once(..) => None,
            })
            .collect();
        for job in jobs {
            job().await;
        }
    }

    /// Runs and removes every pending one-shot job, in scheduling order.
    pub async fn run_once_jobs(&self) -> usize {
        let once: Vec<OnceJob> = {
            let mut jobs = self.jobs.lock().unwrap();
            let (once, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *jobs)
                .into_iter()
                .partition(|(_, job)| matches!(job, Job::Once(..)));
            *jobs = kept;
            once.into_iter()
                .filter_map(|(_, job)| match job {
                    Job::Once(_, job) => Some(job),
                    Job::Recurring(..) => None,
                })
                .collect()
        };
        let count = once.len();
        for job in once {
            job.await;
        }
        count
    }

    pub fn recurring_intervals(&self) -> Vec<Duration> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, job)| match job {
                Job::Recurring(interval, _) => Some(*interval),
                Job::Once(..) => None,
            })
            .collect()
    }

    pub fn once_delays(&self) -> Vec<Duration> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, job)| match job {
                Job::Once(delay, _) => Some(*delay),
                Job::Recurring(..) => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.cancelled.lock().unwrap().clone()
    }

    fn push(&self, job: Job) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().push((id, job));
        id
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_recurring(&self, interval: Duration, job: RecurringJob) -> JobId {
        self.push(Job::Recurring(interval, job))
    }

    fn schedule_once(&self, delay: Duration, job: OnceJob) -> JobId {
        self.push(Job::Once(delay, job))
    }

    fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|(job_id, _)| *job_id != id);
        let removed = jobs.len() != before;
        if removed {
            self.cancelled.lock().unwrap().push(id);
        }
        removed
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Shared view into a [`TestMessage`] after it was moved into a screen.
#[derive(Clone, Default)]
pub struct Probe {
    pub content: Arc<Mutex<String>>,
    pub texts: Arc<Mutex<Vec<String>>>,
    pub expired: Arc<Mutex<usize>>,
}

impl Probe {
    pub fn set_content(&self, content: &str) {
        *self.content.lock().unwrap() = content.to_string();
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn expired(&self) -> usize {
        *self.expired.lock().unwrap()
    }
}

/// Message whose content comes from its probe and whose buttons are fixed.
pub struct TestMessage {
    probe: Probe,
    buttons: Vec<Button>,
}

impl TestMessage {
    pub fn new(content: &str) -> (Self, Probe) {
        let probe = Probe::default();
        probe.set_content(content);
        (
            Self {
                probe: probe.clone(),
                buttons: Vec::new(),
            },
            probe,
        )
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn screen(self, options: MessageOptions) -> ScreenRef {
        Screen::shared(options, self)
    }
}

impl Message for TestMessage {
    fn render(&mut self, keyboard: &mut Keyboard) -> String {
        for button in &self.buttons {
            keyboard.add(button.clone());
        }
        self.probe.content.lock().unwrap().clone()
    }

    fn on_text(&mut self, text: &str) {
        self.probe.texts.lock().unwrap().push(text.to_string());
    }

    fn on_expire(&mut self) {
        *self.probe.expired.lock().unwrap() += 1;
    }
}

pub const CHAT_ID: ChatId = 42;
pub const USER_ID: i64 = 7;

pub struct Harness {
    pub transport: Arc<RecordingTransport>,
    pub scheduler: Arc<ManualScheduler>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(RecordingTransport::default()),
            scheduler: Arc::new(ManualScheduler::default()),
            clock: Arc::new(ManualClock::new()),
        }
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps::new(self.transport.clone(), self.scheduler.clone()).with_clock(self.clock.clone())
    }

    pub fn chat(&self) -> ChatInfo {
        ChatInfo::new(CHAT_ID).with_user(USER_ID, Some("Tester".to_string()))
    }

    pub fn session(&self) -> SessionRef {
        Session::spawn(self.chat(), self.deps(), SessionConfig::default())
    }
}

/// Labels of the rendered keyboard, row-major.
pub fn markup_labels(markup: &Option<Markup>) -> Vec<String> {
    markup
        .iter()
        .flat_map(|m| m.rows().iter().flatten())
        .map(|b| b.text.clone())
        .collect()
}
