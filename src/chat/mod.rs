//! chat widget: message log state + reply inbox.
//!
//! - `ChatLog` is the source of truth for bubbles; a `ChatView` mirrors it.
//! - every submission gets a `RequestId` bound to its placeholder bubble, so
//!   overlapping requests resolve their own bubble whatever order they land in.
//! - transports never touch the widget: they push completions into an
//!   inbox which the owner drains on its own turn of the event loop. the inbox
//!   is unbounded; every outstanding placeholder has exactly one reply coming.

pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use std::collections::HashMap;

use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::RequestError;

pub use transport::{ChatTransport, EndChat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// who authored a bubble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Author {
    User,
    Bot,
}

impl Author {
    /// css tag used on the bubble row.
    pub fn tag(self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Bot => "bot",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bubble {
    pub id: BubbleId,
    pub author: Author,
    pub text: String,
}

/// what a transport has to send for one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingReply {
    pub request: RequestId,
    pub message: String,
}

/// how a completion landed in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// the request's own placeholder now carries the text.
    Replaced(BubbleId),
    /// the placeholder was gone; a fresh bot bubble was appended.
    Appended(BubbleId),
}

/// ordered bubbles plus the request → placeholder bindings.
#[derive(Debug, Default)]
pub struct ChatLog {
    bubbles: Vec<Bubble>,
    pending: HashMap<RequestId, BubbleId>,
    next_bubble: u64,
    next_request: u64,
}

impl ChatLog {
    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request: RequestId) -> bool {
        self.pending.contains_key(&request)
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        // ids are handed out in order and bubbles are never removed
        self.bubbles
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|i| &self.bubbles[i])
    }

    pub fn push(&mut self, author: Author, text: impl Into<String>) -> BubbleId {
        let id = BubbleId(self.next_bubble);
        self.next_bubble += 1;
        self.bubbles.push(Bubble { id, author, text: text.into() });
        id
    }

    /// appends a bot placeholder and binds a fresh request id to it.
    pub fn open_request(&mut self, placeholder: &str) -> (RequestId, BubbleId) {
        let bubble = self.push(Author::Bot, placeholder);
        let request = RequestId(self.next_request);
        self.next_request += 1;
        self.pending.insert(request, bubble);
        (request, bubble)
    }

    /// writes `text` into the placeholder bound to `request`, or appends a new
    /// bot bubble when that binding no longer exists.
    pub fn settle(&mut self, request: RequestId, text: impl Into<String>) -> Resolution {
        let text = text.into();
        match self.pending.remove(&request) {
            Some(id) => {
                if let Ok(i) = self.bubbles.binary_search_by_key(&id, |b| b.id) {
                    self.bubbles[i].text = text;
                    return Resolution::Replaced(id);
                }
                Resolution::Appended(self.push(Author::Bot, text))
            }
            None => Resolution::Appended(self.push(Author::Bot, text)),
        }
    }
}

/// rendering seam for the chat widget.
pub trait ChatView {
    fn append_bubble(&mut self, bubble: &Bubble);
    fn set_bubble_text(&mut self, id: BubbleId, text: &str);
    fn clear_input(&mut self);
    /// force the newest bubble into view.
    fn scroll_to_end(&mut self);
    /// called with `true` while any reply is outstanding.
    fn set_busy(&mut self, _busy: bool) {}
}

/// one settled request, as delivered by a transport.
#[derive(Debug)]
pub struct ReplyMsg {
    pub request: RequestId,
    pub outcome: Result<String, RequestError>,
}

/// cross-task inbox; transports send, the widget owner drains.
#[derive(Clone)]
pub struct ReplyInbox {
    tx: Sender<ReplyMsg>,
    rx: Receiver<ReplyMsg>,
}

impl Default for ReplyInbox {
    fn default() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }
}

impl ReplyInbox {
    pub fn sender(&self) -> Sender<ReplyMsg> {
        self.tx.clone()
    }
}

/// send to inbox; only fails once the widget owning the receiver is gone
pub fn deliver(tx: &Sender<ReplyMsg>, request: RequestId, outcome: Result<String, RequestError>) {
    if let Err(err) = tx.try_send(ReplyMsg { request, outcome }) {
        warn!(target: "calmpage", "deliver: dropping reply for {:?}: {}", request, err);
    }
}

/// runs one request through a transport and delivers the outcome.
pub async fn fulfil<T: ChatTransport + ?Sized>(
    transport: &T,
    pending: PendingReply,
    tx: &Sender<ReplyMsg>,
) {
    let outcome = transport.send(&pending.message).await;
    match &outcome {
        Ok(reply) => info!(target: "calmpage", "reply for {:?}: len={}", pending.request, reply.len()),
        Err(err) => warn!(target: "calmpage", "request {:?} failed: {}", pending.request, err),
    }
    deliver(tx, pending.request, outcome);
}

pub struct ChatWidget<V: ChatView> {
    log: ChatLog,
    view: V,
    config: ChatConfig,
    inbox: ReplyInbox,
}

impl<V: ChatView> ChatWidget<V> {
    pub fn new(view: V, config: ChatConfig) -> Self {
        Self { log: ChatLog::default(), view, config, inbox: ReplyInbox::default() }
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn inbox(&self) -> &ReplyInbox {
        &self.inbox
    }

    pub fn is_busy(&self) -> bool {
        self.log.pending_count() > 0
    }

    fn append(&mut self, author: Author, text: &str) -> BubbleId {
        let id = self.log.push(author, text);
        if let Some(b) = self.log.get(id) {
            self.view.append_bubble(b);
        }
        self.view.scroll_to_end();
        id
    }

    /// shows a bot bubble that is not tied to any request.
    pub fn notify(&mut self, text: &str) -> BubbleId {
        self.append(Author::Bot, text)
    }

    /// applies the outcome of an end-chat call. returns the url to navigate
    /// to; without one, the server's message (or the failure text) is shown
    /// as a bot bubble.
    pub fn end_chat(&mut self, outcome: Result<EndChat, RequestError>) -> Option<String> {
        match outcome {
            Ok(EndChat { redirect_url: Some(url), .. }) => {
                info!(target: "calmpage", "end chat: redirecting to {}", url);
                Some(url)
            }
            Ok(EndChat { message, redirect_url: None }) => {
                if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
                    self.notify(&message);
                }
                None
            }
            Err(err) => {
                warn!(target: "calmpage", "end chat failed: {}", err);
                let text = err.user_message(&self.config.fallback).to_string();
                self.notify(&text);
                None
            }
        }
    }

    /// handles a form submission. returns the request to send, or `None` when
    /// nothing should go out (blank input, or single-flight and busy).
    pub fn submit(&mut self, raw: &str) -> Option<PendingReply> {
        let message = raw.trim();
        if message.is_empty() {
            return None;
        }
        if self.config.single_flight && self.is_busy() {
            debug!(target: "calmpage", "submit: refused, {} reply(s) outstanding", self.log.pending_count());
            return None;
        }

        self.append(Author::User, message);
        self.view.clear_input();

        let (request, bubble) = self.log.open_request(&self.config.placeholder);
        if let Some(b) = self.log.get(bubble) {
            self.view.append_bubble(b);
        }
        self.view.scroll_to_end();
        self.view.set_busy(true);

        info!(target: "calmpage", "submit -> {:?} (len={})", request, message.len());
        Some(PendingReply { request, message: message.to_string() })
    }

    /// applies one settled request.
    pub fn resolve(&mut self, request: RequestId, outcome: Result<String, RequestError>) -> Resolution {
        let text = match &outcome {
            Ok(reply) => reply.as_str(),
            Err(err) => err.user_message(&self.config.fallback),
        }
        .to_string();

        let resolution = self.log.settle(request, text);
        match resolution {
            Resolution::Replaced(id) => {
                if let Some(b) = self.log.get(id) {
                    let text = b.text.clone();
                    self.view.set_bubble_text(id, &text);
                }
            }
            Resolution::Appended(id) => {
                if let Some(b) = self.log.get(id) {
                    self.view.append_bubble(b);
                }
                self.view.scroll_to_end();
            }
        }
        self.view.set_busy(self.is_busy());
        resolution
    }

    /// applies everything transports have delivered so far.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.inbox.rx.try_recv() {
                Ok(ReplyMsg { request, outcome }) => {
                    self.resolve(request, outcome);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}
