//! browser glue for the landing page behaviors.
//!
//! each `bind_*` returns `None` when the elements it needs are not on the
//! page; the rest of the page keeps working.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Array;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement,
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, MouseEvent, Window,
};

use super::{
    ActiveSections, Rect, RevealSet, TRANSLATE_RESET, TargetId, VisibilityEntry, VisibilityNotifier, magnetic_offset,
    mood_label, navbar_shrunk, ripple_dot, step_active, timeline_progress, translate_css,
};
use crate::config::LandingConfig;

type Listener = Closure<dyn FnMut(Event)>;
type ObserverCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// a behavior's listeners/observers; dropping it unbinds nothing but frees the
/// closures, so it has to live as long as the page.
#[derive(Default)]
struct Binding {
    _listeners: Vec<Listener>,
    observers: Vec<(IntersectionObserver, ObserverCallback)>,
}

pub struct LandingEnhancer {
    bindings: Vec<(&'static str, Binding)>,
}

impl LandingEnhancer {
    pub fn init(window: &Window, document: &Document, cfg: &LandingConfig) -> Self {
        let reduced = prefers_reduced_motion(window);
        let candidates: [(&'static str, Option<Binding>); 8] = [
            ("navbar", bind_navbar(window, document, cfg)),
            ("sections", bind_sections(document, cfg)),
            ("reveal", bind_reveal(document, cfg, reduced)),
            ("ripple", bind_ripple(document, cfg, reduced)),
            ("magnetic", bind_magnetic(document, cfg, reduced)),
            ("timeline", bind_timeline(window, document, cfg)),
            ("mood", bind_mood(document, cfg)),
            ("breath", bind_breath(document, cfg)),
        ];
        let mut bindings = Vec::new();
        for (name, b) in candidates {
            match b {
                Some(b) => bindings.push((name, b)),
                None => debug!(target: "calmpage", "landing: {} skipped", name),
            }
        }
        info!(target: "calmpage", "landing: bound {:?} (reduced_motion={})",
            bindings.iter().map(|(n, _)| *n).collect::<Vec<_>>(), reduced);
        Self { bindings }
    }

    pub fn bound(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(n, _)| *n)
    }
}

impl Drop for LandingEnhancer {
    fn drop(&mut self) {
        for (_, b) in &self.bindings {
            for (observer, _) in &b.observers {
                observer.disconnect();
            }
        }
    }
}

// ---------------------- helpers ----------------------

fn prefers_reduced_motion(window: &Window) -> bool {
    window
        .match_media("(prefers-reduced-motion: reduce)")
        .ok()
        .flatten()
        .map(|m| m.matches())
        .unwrap_or(false)
}

fn rect_of(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

fn view_height(window: &Window) -> f64 {
    window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id).and_then(|el| el.dyn_into::<T>().ok())
}

fn select_all<T: JsCast>(document: &Document, selector: &str) -> Vec<T> {
    let Ok(list) = document.query_selector_all(selector) else {
        warn!(target: "calmpage", "landing: bad selector {:?}", selector);
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|n| n.dyn_into::<T>().ok())
        .collect()
}

fn toggle(el: &Element, class: &str, on: bool) {
    if let Err(err) = el.class_list().toggle_with_force(class, on) {
        warn!(target: "calmpage", "toggle {:?} failed: {:?}", class, err);
    }
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    if let Err(err) = el.style().set_property(prop, value) {
        warn!(target: "calmpage", "style {}={} failed: {:?}", prop, value, err);
    }
}

fn listen(
    target: &EventTarget,
    event: &str,
    passive: bool,
    f: impl FnMut(Event) + 'static,
) -> Option<Listener> {
    let cb = Closure::<dyn FnMut(Event)>::new(f);
    let opts = AddEventListenerOptions::new();
    opts.set_passive(passive);
    match target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        cb.as_ref().unchecked_ref(),
        &opts,
    ) {
        Ok(()) => Some(cb),
        Err(err) => {
            warn!(target: "calmpage", "listen {:?} failed: {:?}", event, err);
            None
        }
    }
}

/// `IntersectionObserver` seen through the `VisibilityNotifier` seam.
struct DomNotifier<'a> {
    observer: &'a IntersectionObserver,
    elements: &'a [Element],
}

impl VisibilityNotifier for DomNotifier<'_> {
    fn observe(&mut self, target: TargetId) {
        if let Some(el) = self.elements.get(target.0) {
            self.observer.observe(el);
        }
    }
    fn unobserve(&mut self, target: TargetId) {
        if let Some(el) = self.elements.get(target.0) {
            self.observer.unobserve(el);
        }
    }
}

fn entries_of(entries: &Array, elements: &[Element], threshold: f64) -> Vec<VisibilityEntry> {
    entries
        .iter()
        .filter_map(|v| v.dyn_into::<IntersectionObserverEntry>().ok())
        .filter_map(|entry| {
            let el = entry.target();
            let i = elements.iter().position(|e| *e == el)?;
            Some(VisibilityEntry::observed(
                TargetId(i),
                entry.intersection_ratio(),
                entry.is_intersecting(),
                threshold,
            ))
        })
        .collect()
}

fn observer_for(
    elements: Rc<Vec<Element>>,
    threshold: f64,
    mut on_entries: impl FnMut(&[VisibilityEntry], &mut DomNotifier<'_>) + 'static,
) -> Option<(IntersectionObserver, ObserverCallback)> {
    let cb = {
        let elements = elements.clone();
        Closure::<dyn FnMut(Array, IntersectionObserver)>::new(move |entries: Array, observer: IntersectionObserver| {
            let batch = entries_of(&entries, &elements, threshold);
            let mut notifier = DomNotifier { observer: &observer, elements: &elements };
            on_entries(&batch, &mut notifier);
        })
    };
    let init = IntersectionObserverInit::new();
    init.set_threshold(&JsValue::from_f64(threshold));
    match IntersectionObserver::new_with_options(cb.as_ref().unchecked_ref(), &init) {
        Ok(observer) => Some((observer, cb)),
        Err(err) => {
            warn!(target: "calmpage", "IntersectionObserver unavailable: {:?}", err);
            None
        }
    }
}

// ---------------------- behaviors ----------------------

fn bind_navbar(window: &Window, document: &Document, cfg: &LandingConfig) -> Option<Binding> {
    let navbar = document.get_element_by_id(&cfg.navbar_id)?;
    let class = cfg.shrink_class.clone();
    let threshold = cfg.shrink_threshold;
    let apply = {
        let window = window.clone();
        move || toggle(&navbar, &class, navbar_shrunk(window.scroll_y().unwrap_or(0.0), threshold))
    };
    apply();
    let listener = listen(window, "scroll", true, move |_| apply())?;
    Some(Binding { _listeners: vec![listener], ..Default::default() })
}

fn bind_sections(document: &Document, cfg: &LandingConfig) -> Option<Binding> {
    let links: Vec<Element> = select_all(document, &cfg.nav_link_selector);
    let hrefs: Vec<String> = links.iter().map(|l| l.get_attribute("href").unwrap_or_default()).collect();

    let (ids, elements): (Vec<String>, Vec<Element>) = ActiveSections::section_ids(&hrefs)
        .into_iter()
        .filter_map(|id| document.get_element_by_id(&id).map(|el| (id, el)))
        .unzip();
    if elements.is_empty() {
        return None;
    }

    let state = Rc::new(RefCell::new(ActiveSections::new(hrefs, ids)));
    let elements = Rc::new(elements);
    let class = cfg.active_class.clone();
    let (observer, cb) = observer_for(elements.clone(), cfg.section_threshold, {
        let state = state.clone();
        move |batch: &[VisibilityEntry], _: &mut DomNotifier<'_>| {
            let mut state = state.borrow_mut();
            if state.apply(batch) {
                for (link, on) in links.iter().zip(state.link_flags()) {
                    toggle(link, &class, on);
                }
            }
        }
    })?;
    let mut notifier = DomNotifier { observer: &observer, elements: &elements };
    for t in state.borrow().targets() {
        notifier.observe(t);
    }
    Some(Binding { observers: vec![(observer, cb)], ..Default::default() })
}

fn bind_reveal(document: &Document, cfg: &LandingConfig, reduced: bool) -> Option<Binding> {
    let elements: Vec<Element> = select_all(document, &cfg.reveal_selector);
    if elements.is_empty() {
        return None;
    }
    let set = RevealSet::new(elements.len(), reduced);
    if reduced {
        for t in set.revealed() {
            toggle(&elements[t.0], &cfg.reveal_class, true);
        }
        return Some(Binding::default());
    }

    let elements = Rc::new(elements);
    let set = Rc::new(RefCell::new(set));
    let class = cfg.reveal_class.clone();
    let (observer, cb) = observer_for(elements.clone(), cfg.reveal_threshold, {
        let set = set.clone();
        let elements = elements.clone();
        move |batch: &[VisibilityEntry], notifier: &mut DomNotifier<'_>| {
            for t in set.borrow_mut().apply(batch, notifier) {
                toggle(&elements[t.0], &class, true);
            }
        }
    })?;
    set.borrow().observe_pending(&mut DomNotifier { observer: &observer, elements: &elements });
    Some(Binding { observers: vec![(observer, cb)], ..Default::default() })
}

fn spawn_ripple(document: &Document, target: &Element, ev: &MouseEvent, class: &str, scale: f64) -> Result<(), JsValue> {
    let dot = ripple_dot(rect_of(target), ev.client_x() as f64, ev.client_y() as f64, scale);
    let span: HtmlElement = document.create_element("span")?.dyn_into()?;
    span.set_class_name(class);
    let size = format!("{}px", dot.size);
    let style = span.style();
    style.set_property("width", &size)?;
    style.set_property("height", &size)?;
    style.set_property("left", &format!("{}px", dot.left))?;
    style.set_property("top", &format!("{}px", dot.top))?;
    target.append_child(&span)?;

    let opts = AddEventListenerOptions::new();
    opts.set_once(true);
    let remove = {
        let span = span.clone();
        Closure::once_into_js(move || span.remove())
    };
    span.add_event_listener_with_callback_and_add_event_listener_options("animationend", remove.unchecked_ref(), &opts)
}

fn bind_ripple(document: &Document, cfg: &LandingConfig, reduced: bool) -> Option<Binding> {
    if reduced {
        return None;
    }
    let targets: Vec<Element> = select_all(document, &cfg.ripple_selector);
    let listeners: Vec<Listener> = targets
        .into_iter()
        .filter_map(|target| {
            let document = document.clone();
            let class = cfg.ripple_dot_class.clone();
            let scale = cfg.ripple_scale;
            let el = target.clone();
            listen(&target, "click", false, move |ev| {
                let Some(ev) = ev.dyn_ref::<MouseEvent>() else { return };
                if let Err(err) = spawn_ripple(&document, &el, ev, &class, scale) {
                    warn!(target: "calmpage", "ripple failed: {:?}", err);
                }
            })
        })
        .collect();
    (!listeners.is_empty()).then(|| Binding { _listeners: listeners, ..Default::default() })
}

fn bind_magnetic(document: &Document, cfg: &LandingConfig, reduced: bool) -> Option<Binding> {
    if reduced {
        return None;
    }
    let buttons: Vec<HtmlElement> = select_all(document, &cfg.magnetic_selector);
    let strength = cfg.magnetic_strength;
    let mut listeners = Vec::with_capacity(buttons.len() * 2);
    for btn in buttons {
        let moved = {
            let el = btn.clone();
            listen(&btn, "mousemove", true, move |ev| {
                let Some(ev) = ev.dyn_ref::<MouseEvent>() else { return };
                let offset = magnetic_offset(rect_of(&el), ev.client_x() as f64, ev.client_y() as f64, strength);
                set_style(&el, "transform", &translate_css(offset));
            })
        };
        let left = {
            let el = btn.clone();
            listen(&btn, "mouseleave", true, move |_| set_style(&el, "transform", TRANSLATE_RESET))
        };
        listeners.extend(moved);
        listeners.extend(left);
    }
    (!listeners.is_empty()).then(|| Binding { _listeners: listeners, ..Default::default() })
}

fn bind_timeline(window: &Window, document: &Document, cfg: &LandingConfig) -> Option<Binding> {
    let timeline = document.get_element_by_id(&cfg.timeline_id)?;
    let progress: HtmlElement = by_id(document, &cfg.timeline_progress_id)?;
    let steps: Vec<Element> = select_all(document, &cfg.step_selector);
    let geo = cfg.timeline;
    let class = cfg.active_class.clone();

    let update: Rc<dyn Fn()> = {
        let window = window.clone();
        Rc::new(move || {
            let vh = view_height(&window);
            let percent = timeline_progress(rect_of(&timeline), vh, &geo);
            set_style(&progress, "height", &format!("{percent}%"));
            for step in &steps {
                toggle(step, &class, step_active(rect_of(step), vh, &geo));
            }
        })
    };
    update();

    let on_scroll = {
        let update = update.clone();
        listen(window, "scroll", true, move |_| update())
    };
    let on_resize = listen(window, "resize", false, move |_| update());
    let listeners: Vec<Listener> = on_scroll.into_iter().chain(on_resize).collect();
    Some(Binding { _listeners: listeners, ..Default::default() })
}

fn bind_mood(document: &Document, cfg: &LandingConfig) -> Option<Binding> {
    let input: HtmlInputElement = by_id(document, &cfg.mood_input_id)?;
    let label = document.get_element_by_id(&cfg.mood_label_id)?;
    let cfg = cfg.clone();
    let apply = {
        let input = input.clone();
        move || label.set_text_content(Some(mood_label(&input.value(), &cfg)))
    };
    apply();
    let listener = listen(&input, "input", false, move |_| apply())?;
    Some(Binding { _listeners: vec![listener], ..Default::default() })
}

fn bind_breath(document: &Document, cfg: &LandingConfig) -> Option<Binding> {
    let circle: HtmlElement = by_id(document, &cfg.breath_circle_id)?;
    let button = document.get_element_by_id(&cfg.breath_reset_id)?;
    let class = cfg.resetting_class.clone();
    let listener = listen(&button, "click", false, move |_| {
        toggle(&circle, &class, true);
        // reading layout forces a reflow so the keyframes restart
        let _ = circle.offset_width();
        toggle(&circle, &class, false);
    })?;
    Some(Binding { _listeners: vec![listener], ..Default::default() })
}
