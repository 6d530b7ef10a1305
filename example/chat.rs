//! terminal client for the chat endpoint, driving the same `ChatWidget` the
//! browser binding uses.
//! - `CALMPAGE_BASE_URL` (default `http://127.0.0.1:5000`) points at the server.
//! - `RUST_LOG=calmpage=debug` for request logging.
//! - type a message per line; `/end` ends the chat, ctrl-d quits.
//!
//! the server keys conversations on a session cookie, so expect
//! `No active session.` unless it is configured to accept anonymous users.

use calmpage::{Author, Bubble, BubbleId, ChatConfig, ChatView, ChatWidget, HttpTransport, fulfil};
use calmpage::ChatTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

// ---------------------- terminal view ----------------------

#[derive(Default)]
struct TerminalView;

fn print_bubble(author: Author, text: &str) {
    match author {
        Author::User => println!("you> {text}"),
        Author::Bot => println!("bot> {text}"),
    }
}

impl ChatView for TerminalView {
    fn append_bubble(&mut self, bubble: &Bubble) {
        print_bubble(bubble.author, &bubble.text);
    }
    // a terminal can't rewrite the placeholder line, so print the resolution
    fn set_bubble_text(&mut self, _id: BubbleId, text: &str) {
        print_bubble(Author::Bot, text);
    }
    fn clear_input(&mut self) {}
    fn scroll_to_end(&mut self) {}
}

// ---------------------- main ----------------------

#[tokio::main]
async fn main() {
    calmpage::logging::init(None);

    let base_url = std::env::var("CALMPAGE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
    let config = ChatConfig::default();
    let transport = HttpTransport::new(base_url.clone(), &config);
    let mut widget = ChatWidget::new(TerminalView, config);
    info!(target: "calmpage", "chat client -> {}", transport.url(&widget.config().endpoint));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim() == "/end" {
            let outcome = transport.end_chat().await;
            let ended = outcome.is_ok();
            if let Some(url) = widget.end_chat(outcome) {
                println!("(next: {base_url}{url})");
            }
            if ended {
                break;
            }
            continue;
        }

        let Some(pending) = widget.submit(&line) else { continue };
        let tx = widget.inbox().sender();
        fulfil(&transport, pending, &tx).await;
        widget.drain();
    }
}
