//! Menu stack transitions: goto_menu, goto_home, select_back and select.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{markup_labels, Harness, TestMessage};
use tgmenu_core::{Button, Markup, MenuError, MessageOptions, ScreenRef};
use tgmenu_session::Selection;

fn menu(label: &str, content: &str, buttons: Vec<Button>) -> ScreenRef {
    let (mut message, _) = TestMessage::new(content);
    for button in buttons {
        message = message.button(button);
    }
    message.screen(MessageOptions::new(label))
}

fn counting(label: &str, counter: &Arc<AtomicUsize>) -> Button {
    let counter = counter.clone();
    Button::new(label).invoke(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        String::new()
    })
}

/// Home with an "Options" submenu; the submenu has Back, Home and a "Deeper" submenu.
fn menu_tree() -> ScreenRef {
    let deeper = menu("deeper", "Deeper", vec![Button::back(), Button::home()]);
    let options = menu(
        "options",
        "Options",
        vec![
            Button::new("Deeper").navigate(deeper),
            Button::back(),
            Button::home(),
        ],
    );
    menu(
        "home",
        "Home",
        vec![Button::new("Options").navigate(options), Button::new("Idle")],
    )
}

#[tokio::test]
async fn test_goto_menu_sends_reply_keyboard_and_pushes() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    let id = s.goto_menu(menu_tree()).await.unwrap();

    assert_eq!(s.depth(), 1);
    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, id);
    assert_eq!(sent[0].1.content, "Home");
    assert!(sent[0].1.notify);
    match &sent[0].1.markup {
        Some(Markup::Reply { rows, placeholder }) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0][0].callback_data, "home.Options");
            assert_eq!(placeholder.as_deref(), Some("Options"));
        }
        other => panic!("expected reply keyboard, got {:?}", other),
    }

    let home = s.menu_stack()[0].lock().await;
    assert_eq!(home.message_id(), Some(id));
    assert!(home.last_activity().is_some());
}

/// **Test: n pushes followed by goto_home leave exactly the base screen.**
///
/// **Setup:** Home plus three further menus pushed.
/// **Action:** `goto_home()`.
/// **Expected:** depth 1, the surviving screen is the original home, home is sent again.
#[tokio::test]
async fn test_goto_home_truncates_to_base() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    let home = menu_tree();
    let first_id = s.goto_menu(home.clone()).await.unwrap();
    for i in 0..3 {
        s.goto_menu(menu(&format!("m{}", i), "Other", vec![Button::back()]))
            .await
            .unwrap();
    }
    assert_eq!(s.depth(), 4);

    let home_id = s.goto_home().await.unwrap();

    assert_eq!(s.depth(), 1);
    assert!(Arc::ptr_eq(&s.menu_stack()[0], &home));
    assert_ne!(home_id, first_id);
    assert_eq!(harness.transport.sent_contents().last().unwrap(), "Home");
    assert_eq!(home.lock().await.message_id(), Some(home_id));
}

#[tokio::test]
async fn test_back_and_home_at_base_are_idempotent() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    let id = s.goto_menu(menu_tree()).await.unwrap();
    harness.transport.clear();

    assert_eq!(s.select_back().await.unwrap(), id);
    assert_eq!(s.select_back().await.unwrap(), id);
    assert_eq!(s.goto_home().await.unwrap(), id);
    assert_eq!(s.select("Back").await.unwrap(), Selection::Menu(id));

    assert_eq!(s.depth(), 1);
    assert!(harness.transport.calls().is_empty());
}

#[tokio::test]
async fn test_empty_stack_navigation_fails() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    assert!(matches!(s.goto_home().await, Err(MenuError::EmptyMenuStack)));
    assert!(matches!(s.select_back().await, Err(MenuError::EmptyMenuStack)));
}

#[tokio::test]
async fn test_select_navigates_down_and_back() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;
    s.goto_menu(menu_tree()).await.unwrap();

    let options_id = match s.select("Options").await.unwrap() {
        Selection::Menu(id) => id,
        other => panic!("unexpected selection {:?}", other),
    };
    assert_eq!(s.depth(), 2);
    assert_eq!(
        markup_labels(&harness.transport.sent()[1].1.markup),
        vec!["Deeper", "Back", "Home"]
    );

    s.select("Deeper").await.unwrap();
    assert_eq!(s.depth(), 3);

    let back_id = match s.select("Back").await.unwrap() {
        Selection::Menu(id) => id,
        other => panic!("unexpected selection {:?}", other),
    };
    assert_eq!(s.depth(), 2);
    assert_ne!(back_id, options_id);
    assert_eq!(harness.transport.sent_contents().last().unwrap(), "Options");

    s.select("Home").await.unwrap();
    assert_eq!(s.depth(), 1);
    assert_eq!(harness.transport.sent_contents().last().unwrap(), "Home");
}

#[tokio::test]
async fn test_select_prefers_topmost_screen() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    let home_hits = Arc::new(AtomicUsize::new(0));
    let top_hits = Arc::new(AtomicUsize::new(0));
    s.goto_menu(menu("home", "Home", vec![counting("Info", &home_hits)]))
        .await
        .unwrap();
    s.goto_menu(menu("sub", "Sub", vec![counting("Info", &top_hits)]))
        .await
        .unwrap();

    assert_eq!(s.select("Info").await.unwrap(), Selection::Invoked);
    assert_eq!(top_hits.load(Ordering::SeqCst), 1);
    assert_eq!(home_hits.load(Ordering::SeqCst), 0);
    assert_eq!(s.depth(), 2);
}

#[tokio::test]
async fn test_button_without_action_is_ignored() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;
    s.goto_menu(menu_tree()).await.unwrap();
    harness.transport.clear();

    assert_eq!(s.select("Idle").await.unwrap(), Selection::Ignored);
    assert!(harness.transport.calls().is_empty());
}

#[tokio::test]
async fn test_unmatched_text_goes_to_top_menu() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;

    let (home, home_probe) = TestMessage::new("Home");
    let (sub, sub_probe) = TestMessage::new("Sub");
    s.goto_menu(home.screen(MessageOptions::new("home"))).await.unwrap();
    s.goto_menu(sub.screen(MessageOptions::new("sub"))).await.unwrap();

    assert_eq!(s.select("hello there").await.unwrap(), Selection::TextInput);
    assert_eq!(sub_probe.texts(), vec!["hello there"]);
    assert!(home_probe.texts().is_empty());
}

#[tokio::test]
async fn test_failed_send_leaves_stack_unchanged() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;
    s.goto_menu(menu_tree()).await.unwrap();

    harness.transport.fail_send.store(true, Ordering::SeqCst);
    let result = s.select("Options").await;

    assert!(matches!(result, Err(MenuError::Transport(_))));
    assert_eq!(s.depth(), 1);
}

/// **Test: Home and Back keep the stack when the re-send fails.**
///
/// Setup: home → Options → Deeper (depth 3).
/// Action: fail sends, then select "Home" and "Back".
/// Expected: both return a transport error and depth stays 3; once sends work again Home
/// brings depth to 1.
#[tokio::test]
async fn test_failed_home_and_back_leave_stack_unchanged() {
    let harness = Harness::new();
    let session = harness.session();
    let mut s = session.lock().await;
    s.goto_menu(menu_tree()).await.unwrap();
    s.select("Options").await.unwrap();
    s.select("Deeper").await.unwrap();
    assert_eq!(s.depth(), 3);

    harness.transport.fail_send.store(true, Ordering::SeqCst);
    assert!(matches!(s.select("Home").await, Err(MenuError::Transport(_))));
    assert_eq!(s.depth(), 3);
    assert!(matches!(s.select("Back").await, Err(MenuError::Transport(_))));
    assert_eq!(s.depth(), 3);

    harness.transport.fail_send.store(false, Ordering::SeqCst);
    s.select("Home").await.unwrap();
    assert_eq!(s.depth(), 1);
}
