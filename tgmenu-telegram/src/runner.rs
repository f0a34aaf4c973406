//! Runs the teloxide dispatcher: every update is converted to an [`InboundEvent`] and handed to the
//! session [`Dispatcher`].

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, PollAnswer};
use tgmenu_core::{init_tracing, ChatInfo, InboundEvent, ScreenRef};
use tgmenu_session::{Dispatcher as SessionDispatcher, SessionDeps, TokioScheduler};
use tracing::{debug, error, info, instrument};

use crate::adapters::{callback_event, message_event, poll_answer_event};
use crate::config::TelegramConfig;
use crate::transport::TelegramTransport;

/// Builds the teloxide Bot, pointing it at TELEGRAM_API_URL when set.
pub fn build_bot(config: &TelegramConfig) -> Bot {
    let bot = Bot::new(config.bot_token.clone());
    if let Some(ref url_str) = config.telegram_api_url {
        match reqwest::Url::parse(url_str) {
            Ok(url) => bot.set_api_url(url),
            Err(e) => {
                error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                bot
            }
        }
    } else {
        bot
    }
}

async fn handle(sessions: &SessionDispatcher, event: Option<InboundEvent>) {
    let Some(event) = event else {
        debug!("Ignoring unsupported update");
        return;
    };
    let chat_id = event.chat().map(|c| c.chat_id);
    if let Err(e) = sessions.dispatch(event).await {
        error!(error = %e, chat_id = ?chat_id, "Failed to handle update");
    }
}

/// Dispatches messages, inline button presses and poll answers until Ctrl-C.
#[instrument(skip(bot, sessions))]
pub async fn run_dispatcher(bot: Bot, sessions: Arc<SessionDispatcher>) -> Result<()> {
    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            info!(username = %username, "Bot connected");
        }
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(
            |msg: Message, sessions: Arc<SessionDispatcher>| async move {
                info!(chat_id = msg.chat.id.0, "Received message");
                handle(&sessions, message_event(&msg)).await;
                respond(())
            },
        ))
        .branch(Update::filter_callback_query().endpoint(
            |q: CallbackQuery, sessions: Arc<SessionDispatcher>| async move {
                debug!(data = ?q.data, "Received callback query");
                handle(&sessions, callback_event(&q)).await;
                respond(())
            },
        ))
        .branch(Update::filter_poll_answer().endpoint(
            |answer: PollAnswer, sessions: Arc<SessionDispatcher>| async move {
                handle(&sessions, poll_answer_event(&answer)).await;
                respond(())
            },
        ));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Validates the config, initializes tracing, wires transport, scheduler and session registry, and
/// runs until Ctrl-C. `start_message` builds the home menu of every new chat.
#[instrument(skip(config, start_message))]
pub async fn run_menu_bot<F>(config: TelegramConfig, start_message: F) -> Result<()>
where
    F: Fn(&ChatInfo) -> ScreenRef + Send + Sync + 'static,
{
    config.validate()?;
    init_tracing(&config.log_file)?;

    info!(
        start_command = %config.start_command,
        sweep_interval_secs = config.session.sweep_interval.as_secs(),
        poll_window_secs = config.session.poll_window.as_secs(),
        "Initializing menu bot"
    );

    let bot = build_bot(&config);
    let deps = SessionDeps::new(
        Arc::new(TelegramTransport::new(bot.clone())),
        Arc::new(TokioScheduler::new()),
    );
    let sessions = SessionDispatcher::new(
        deps,
        config.session.clone(),
        &config.start_command,
        start_message,
    )?;

    info!("Bot started successfully");
    run_dispatcher(bot, Arc::new(sessions)).await
}
