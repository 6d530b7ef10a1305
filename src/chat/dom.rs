//! browser binding for the chat widget.
//!
//! markup per bubble: `<div class="chat-msg {user|bot}"><p>text</p></div>`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlElement, HtmlInputElement};

use super::transport::{ChatTransport, FetchTransport};
use super::{Bubble, BubbleId, ChatView, ChatWidget, fulfil};
use crate::config::ChatConfig;

pub struct DomChatView {
    document: Document,
    log: HtmlElement,
    input: HtmlInputElement,
    rows: HashMap<BubbleId, Element>,
    lock_input: bool,
}

impl DomChatView {
    pub fn new(document: Document, log: HtmlElement, input: HtmlInputElement, lock_input: bool) -> Self {
        Self { document, log, input, rows: HashMap::new(), lock_input }
    }
}

impl ChatView for DomChatView {
    fn append_bubble(&mut self, bubble: &Bubble) {
        let build = || -> Result<Element, JsValue> {
            let row = self.document.create_element("div")?;
            row.set_class_name(&format!("chat-msg {}", bubble.author.tag()));
            let p = self.document.create_element("p")?;
            p.set_text_content(Some(&bubble.text));
            row.append_child(&p)?;
            self.log.append_child(&row)?;
            Ok(p)
        };
        match build() {
            Ok(p) => {
                self.rows.insert(bubble.id, p);
            }
            Err(err) => warn!(target: "calmpage", "append_bubble failed: {:?}", err),
        }
    }

    fn set_bubble_text(&mut self, id: BubbleId, text: &str) {
        if let Some(p) = self.rows.get(&id) {
            p.set_text_content(Some(text));
        }
    }

    fn clear_input(&mut self) {
        self.input.set_value("");
    }

    fn scroll_to_end(&mut self) {
        self.log.set_scroll_top(self.log.scroll_height());
    }

    fn set_busy(&mut self, busy: bool) {
        if self.lock_input {
            self.input.set_disabled(busy);
        }
    }
}

/// keeps the widget and its listeners alive.
pub struct ChatBinding {
    pub widget: Rc<RefCell<ChatWidget<DomChatView>>>,
    _closures: Vec<Closure<dyn FnMut(Event)>>,
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id).and_then(|el| el.dyn_into::<T>().ok())
}

impl ChatBinding {
    /// binds the chat form. `None` when the page has no chat widget.
    pub fn init(document: &Document, config: &ChatConfig) -> Option<Self> {
        let transport: Rc<dyn ChatTransport> = Rc::new(FetchTransport::from_config(config));
        Self::init_with(document, config, transport)
    }

    pub fn init_with(document: &Document, config: &ChatConfig, transport: Rc<dyn ChatTransport>) -> Option<Self> {
        let (Some(form), Some(input), Some(log)) = (
            document.get_element_by_id(&config.form_id),
            by_id::<HtmlInputElement>(document, &config.input_id),
            by_id::<HtmlElement>(document, &config.log_id),
        ) else {
            debug!(target: "calmpage", "chat: form/input/log missing, widget disabled");
            return None;
        };

        let view = DomChatView::new(document.clone(), log, input.clone(), config.single_flight);
        let widget = Rc::new(RefCell::new(ChatWidget::new(view, config.clone())));
        let mut closures = Vec::new();

        let on_submit = {
            let widget = widget.clone();
            let transport = transport.clone();
            Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
                ev.prevent_default();
                let Some(pending) = widget.borrow_mut().submit(&input.value()) else {
                    return;
                };
                let tx = widget.borrow().inbox().sender();
                let widget = widget.clone();
                let transport = transport.clone();
                spawn_local(async move {
                    fulfil(transport.as_ref(), pending, &tx).await;
                    widget.borrow_mut().drain();
                });
            })
        };
        if let Err(err) = form.add_event_listener_with_callback("submit", on_submit.as_ref().unchecked_ref()) {
            warn!(target: "calmpage", "chat: could not bind submit: {:?}", err);
            return None;
        }
        closures.push(on_submit);

        if let Some(button) = document.get_element_by_id(&config.end_chat_button_id) {
            let on_end = {
                let widget = widget.clone();
                let transport = transport.clone();
                Closure::<dyn FnMut(Event)>::new(move |_ev: Event| {
                    let widget = widget.clone();
                    let transport = transport.clone();
                    spawn_local(async move { end_chat(&widget, transport.as_ref()).await });
                })
            };
            match button.add_event_listener_with_callback("click", on_end.as_ref().unchecked_ref()) {
                Ok(()) => closures.push(on_end),
                Err(err) => warn!(target: "calmpage", "chat: could not bind end chat: {:?}", err),
            }
        }

        info!(target: "calmpage", "chat widget bound (endpoint={})", config.endpoint);
        Some(Self { widget, _closures: closures })
    }
}

async fn end_chat(widget: &Rc<RefCell<ChatWidget<DomChatView>>>, transport: &dyn ChatTransport) {
    let outcome = transport.end_chat().await;
    let Some(url) = widget.borrow_mut().end_chat(outcome) else { return };
    let navigated = web_sys::window().map(|w| w.location().set_href(&url));
    if let Some(Err(err)) = navigated {
        warn!(target: "calmpage", "end chat: redirect failed: {:?}", err);
    }
}
