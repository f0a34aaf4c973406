//! Single-slot poll exchange: `idle -> awaiting_answer -> idle`.
//!
//! At most one poll is pending per session. Starting a new poll removes the previous one; an answer
//! runs the stored callback with the chosen option text; the timeout removes the poll without
//! running anything.

use std::time::Duration;

use futures::FutureExt;
use tgmenu_core::{
    Callback, CallbackContext, ButtonArgs, JobId, MessageId, OutgoingPoll, PollRequest, Result,
};
use tracing::{debug, error, info};

use crate::session::Session;

/// Poll waiting for its answer.
pub struct PendingPoll {
    /// Distinguishes this poll from later ones when its timeout fires.
    pub(crate) token: u64,
    pub(crate) message_id: MessageId,
    pub(crate) request: PollRequest,
    pub(crate) callback: Callback,
    pub(crate) timeout_job: Option<JobId>,
}

impl PendingPoll {
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn request(&self) -> &PollRequest {
        &self.request
    }
}

impl std::fmt::Debug for PendingPoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPoll")
            .field("token", &self.token)
            .field("message_id", &self.message_id)
            .field("question", &self.request.question)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn has_pending_poll(&self) -> bool {
        self.pending_poll.is_some()
    }

    pub fn pending_poll(&self) -> Option<&PendingPoll> {
        self.pending_poll.as_ref()
    }

    /// Sends a poll and waits for its answer, replacing any pending poll.
    pub async fn start_poll(&mut self, request: PollRequest, callback: Callback) -> Result<MessageId> {
        self.cancel_poll().await;

        let outgoing = OutgoingPoll {
            question: request.question.clone(),
            options: request.options.clone(),
            open_period: self.config.poll_window,
        };
        let message_id = self
            .deps
            .transport
            .send_poll(self.chat_id(), &outgoing)
            .await?;

        self.poll_seq += 1;
        let token = self.poll_seq;
        let handle = self.handle.clone();
        let timeout_job = self.deps.scheduler.schedule_once(
            self.config.poll_timeout(),
            async move {
                if let Some(session) = handle.upgrade() {
                    session.lock().await.expire_poll(token).await;
                }
            }
            .boxed(),
        );

        info!(chat_id = self.chat_id(), message_id, question = %request.question, "Poll sent");
        self.pending_poll = Some(PendingPoll {
            token,
            message_id,
            request,
            callback,
            timeout_job: Some(timeout_job),
        });
        Ok(message_id)
    }

    /// Removes the pending poll, if any, without running its callback.
    pub async fn cancel_poll(&mut self) -> bool {
        let Some(mut poll) = self.pending_poll.take() else {
            return false;
        };
        if let Some(job) = poll.timeout_job.take() {
            self.deps.scheduler.cancel(job);
        }
        debug!(message_id = poll.message_id, "Cancelling pending poll");
        self.delete_message(poll.message_id).await;
        true
    }

    /// Runs the pending poll's callback with the chosen option and schedules the poll's removal.
    ///
    /// Returns false, with an error logged, when no poll is pending or the index is out of range.
    pub async fn on_poll_answer(&mut self, option_index: usize) -> bool {
        let Some(poll) = self.pending_poll.as_ref() else {
            error!(chat_id = self.chat_id(), option_index, "Poll answer without pending poll");
            return false;
        };
        let Some(answer) = poll.request.options.get(option_index).cloned() else {
            error!(
                chat_id = self.chat_id(),
                option_index,
                options = poll.request.options.len(),
                "Poll answer out of range"
            );
            return false;
        };
        let Some(mut poll) = self.pending_poll.take() else {
            return false;
        };

        if let Some(job) = poll.timeout_job.take() {
            self.deps.scheduler.cancel(job);
        }

        let args = ButtonArgs::Poll(poll.request.clone());
        let reply = (poll.callback)(CallbackContext::new(Some(&args), Some(&answer)));
        info!(chat_id = self.chat_id(), answer = %answer, "Poll answered");
        if !reply.is_empty() {
            debug!(reply = %reply, "Poll callback returned");
        }

        self.schedule_delete(poll.message_id, self.config.poll_delete_delay);
        true
    }

    /// Timeout of poll `token`: deletes it if it is still the pending one.
    pub async fn expire_poll(&mut self, token: u64) {
        match &self.pending_poll {
            Some(poll) if poll.token == token => {}
            _ => return,
        }
        if let Some(poll) = self.pending_poll.take() {
            info!(chat_id = self.chat_id(), message_id = poll.message_id, "Poll expired");
            self.delete_message(poll.message_id).await;
        }
    }

    fn schedule_delete(&self, message_id: MessageId, delay: Duration) {
        let handle = self.handle.clone();
        self.deps.scheduler.schedule_once(
            delay,
            async move {
                if let Some(session) = handle.upgrade() {
                    session.lock().await.delete_message(message_id).await;
                }
            }
            .boxed(),
        );
    }
}
