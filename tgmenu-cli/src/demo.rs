//! Demo menu tree: a home menu with an options sub-menu, an inline stats message with one button
//! of every kind, a note that returns home after it is sent, and a web-app button.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;
use tgmenu_core::{
    Button, ButtonArgs, ButtonKind, CallbackContext, ChatInfo, InputField, Keyboard, Message,
    MessageOptions, PollRequest, Screen, ScreenRef,
};
use tracing::info;

pub const DEMO_WEB_APP_URL: &str = "https://webappcontent.telegram.org/cafe";
pub const DEMO_STICKER_URL: &str = "https://www.gstatic.com/webp/gallery/1.webp";
pub const DEMO_PICTURE: &str = "resources/stats_default.png";

/// Per-chat state shared by the demo screens.
#[derive(Debug, Default)]
struct DemoState {
    likes: AtomicU32,
    alerts: AtomicBool,
    last_vote: Mutex<Option<String>>,
    last_note: Mutex<Option<String>>,
}

impl DemoState {
    fn last_vote(&self) -> Option<String> {
        self.last_vote.lock().ok().and_then(|v| v.clone())
    }

    fn last_note(&self) -> Option<String> {
        self.last_note.lock().ok().and_then(|v| v.clone())
    }
}

/// Builds the home menu of a new chat session.
pub fn start_message(chat: &ChatInfo) -> ScreenRef {
    let state = Arc::new(DemoState::default());
    let user = chat
        .user_name
        .clone()
        .unwrap_or_else(|| "there".to_string());
    info!(chat_id = chat.chat_id, user = %user, "Building demo menu");

    let options = Screen::shared(
        MessageOptions::new("options").input_field(InputField::Text("Pick a setting".to_string())),
        OptionsMenu {
            state: state.clone(),
        },
    );
    let stats = Screen::shared(
        MessageOptions::new("stats").inlined(),
        StatsMessage {
            state: state.clone(),
        },
    );
    let note = Screen::shared(
        MessageOptions::new("note").inlined().home_after().notify(false),
        NoteMessage {
            state: state.clone(),
        },
    );

    Screen::shared(
        MessageOptions::new("home"),
        HomeMenu {
            user,
            started: Utc::now().format("%H:%M UTC").to_string(),
            options,
            stats,
            note,
        },
    )
}

struct HomeMenu {
    user: String,
    started: String,
    options: ScreenRef,
    stats: ScreenRef,
    note: ScreenRef,
}

impl Message for HomeMenu {
    fn render(&mut self, keyboard: &mut Keyboard) -> String {
        keyboard
            .add(Button::new("Options").navigate(self.options.clone()))
            .add(Button::new("Stats").navigate(self.stats.clone()))
            .add(Button::new("Note").navigate(self.note.clone()))
            .add_row(
                Button::new("Open app")
                    .web_url(DEMO_WEB_APP_URL)
                    .kind(ButtonKind::Message)
                    .invoke(|ctx: CallbackContext<'_>| match ctx.input {
                        Some(data) if !data.is_empty() => format!("App sent: <code>{}</code>", data),
                        _ => String::new(),
                    }),
            );
        format!(
            "Hello <b>{}</b>! Session started at {}.\nPick an item below.",
            self.user, self.started
        )
    }
}

struct OptionsMenu {
    state: Arc<DemoState>,
}

impl Message for OptionsMenu {
    fn render(&mut self, keyboard: &mut Keyboard) -> String {
        let state = self.state.clone();
        keyboard
            .add(Button::new("Toggle alerts").invoke(move |_| {
                let enabled = !state.alerts.fetch_xor(true, Ordering::SeqCst);
                if enabled {
                    "Alerts enabled".to_string()
                } else {
                    "Alerts disabled".to_string()
                }
            }))
            .add_row(Button::back())
            .add(Button::home());
        let alerts = if self.state.alerts.load(Ordering::SeqCst) {
            "on"
        } else {
            "off"
        };
        format!("<b>Options</b>\nAlerts are {}.", alerts)
    }
}

struct StatsMessage {
    state: Arc<DemoState>,
}

impl Message for StatsMessage {
    fn render(&mut self, keyboard: &mut Keyboard) -> String {
        let likes = self.state.clone();
        let votes = self.state.clone();
        keyboard
            .add(Button::new("Like").invoke(move |_| {
                let total = likes.likes.fetch_add(1, Ordering::SeqCst) + 1;
                format!("Thanks! {} likes so far", total)
            }))
            .add(
                Button::new("Picture")
                    .kind(ButtonKind::Picture)
                    .invoke(|_| DEMO_PICTURE.to_string()),
            )
            .add(
                Button::new("Sticker")
                    .kind(ButtonKind::Sticker)
                    .invoke(|_| DEMO_STICKER_URL.to_string()),
            )
            .add(
                Button::new("Fact")
                    .kind(ButtonKind::Message)
                    .notify(true)
                    .args(ButtonArgs::Value(json!({ "topic": "keyboards", "rows": 4 })))
                    .invoke(fact),
            )
            .add_row(Button::new("Vote").poll(
                PollRequest::new("How do you like this bot?", ["Great", "Fine", "Meh"]),
                move |ctx| {
                    if let (Some(answer), Ok(mut last)) = (ctx.input, votes.last_vote.lock()) {
                        *last = Some(answer.to_string());
                    }
                    String::new()
                },
            ));

        let mut content = format!(
            "<b>Stats</b>\nLikes: {}",
            self.state.likes.load(Ordering::SeqCst)
        );
        if let Some(vote) = self.state.last_vote() {
            content.push_str(&format!("\nLast vote: {}", vote));
        }
        content
    }

    fn on_text(&mut self, text: &str) {
        info!(text = %text, "Stats received text");
    }

    fn on_expire(&mut self) {
        info!(
            likes = self.state.likes.load(Ordering::SeqCst),
            "Stats message expired"
        );
    }
}

fn fact(ctx: CallbackContext<'_>) -> String {
    match ctx.args {
        Some(ButtonArgs::Value(value)) => format!(
            "Inline keyboards hold up to {} buttons per row ({}).",
            value["rows"],
            value["topic"].as_str().unwrap_or("general")
        ),
        _ => "No fact today.".to_string(),
    }
}

struct NoteMessage {
    state: Arc<DemoState>,
}

impl Message for NoteMessage {
    fn render(&mut self, _keyboard: &mut Keyboard) -> String {
        match self.state.last_note() {
            Some(note) => format!("Your last note: <i>{}</i>", note),
            None => "Type anything to leave a note.".to_string(),
        }
    }

    fn on_text(&mut self, text: &str) {
        if let Ok(mut note) = self.state.last_note.lock() {
            *note = Some(text.to_string());
        }
    }
}
