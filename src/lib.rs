//! calmpage: the scripted parts of the calm landing/chat pages.
//!
//! - `chat`: chat widget posting to `/get_response`; each submission gets its
//!   own request id bound to its "Thinking..." placeholder, replies land in
//!   an inbox and are applied with `ChatWidget::drain`.
//! - `landing`: navbar shrink, active nav section, reveal-on-scroll, ripple,
//!   magnetic buttons, timeline progress, mood label, breathing reset.
//!   geometry lives in plain functions, dom glue in `landing::dom`.
//! - everything is configurable through `Config` (json from the host page),
//!   and logs through `tracing` under the `calmpage` target.
//!
//! browser usage (after `wasm-bindgen --target web`):
//!
//! ```js
//! import init, { start_with_config } from "./calmpage.js";
//! await init();
//! start_with_config(JSON.stringify({ chat: { single_flight: true } }));
//! ```
//!
//! on native targets the chat state model and an http transport are
//! available; see `example/chat.rs`.

pub mod chat;
pub mod config;
pub mod error;
pub mod landing;
pub mod logging;

pub use chat::{
    Author, Bubble, BubbleId, ChatLog, ChatTransport, ChatView, ChatWidget, EndChat, PendingReply, ReplyInbox,
    ReplyMsg, RequestId, Resolution, deliver, fulfil,
};
pub use config::{ChatConfig, Config, LandingConfig, TimelineGeometry};
pub use error::{ConfigError, RequestError};
pub use landing::{Rect, mood_label, timeline_progress};

#[cfg(not(target_arch = "wasm32"))]
pub use chat::transport::HttpTransport;

#[cfg(target_arch = "wasm32")]
pub use web::{start, start_with_config};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;

    use tracing::{info, warn};
    use wasm_bindgen::prelude::*;

    use crate::chat::dom::ChatBinding;
    use crate::config::Config;
    use crate::landing::dom::LandingEnhancer;

    /// everything bound on the page; kept for the page lifetime.
    struct Page {
        _chat: Option<ChatBinding>,
        _landing: LandingEnhancer,
    }

    thread_local! {
        static PAGE: RefCell<Option<Page>> = const { RefCell::new(None) };
    }

    /// binds both widgets with the default configuration.
    #[wasm_bindgen]
    pub fn start() -> Result<(), JsValue> {
        start_with_config("")
    }

    /// binds both widgets; `json` is a (partial) `Config`.
    /// calling it again after a successful start does nothing.
    #[wasm_bindgen]
    pub fn start_with_config(json: &str) -> Result<(), JsValue> {
        let config = Config::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        crate::logging::init(config.log_level.as_deref());

        if PAGE.with(|p| p.borrow().is_some()) {
            warn!(target: "calmpage", "start: already started, ignoring");
            return Ok(());
        }

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

        let chat = ChatBinding::init(&document, &config.chat);
        let landing = LandingEnhancer::init(&window, &document, &config.landing);
        info!(target: "calmpage", "start: chat={} landing={:?}",
            chat.is_some(), landing.bound().collect::<Vec<_>>());

        PAGE.with(|p| *p.borrow_mut() = Some(Page { _chat: chat, _landing: landing }));
        Ok(())
    }
}
