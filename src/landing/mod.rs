//! landing page enhancer.
//!
//! the behaviors are independent; each one is a pure function of the current
//! viewport/element geometry here, and the browser glue in `dom` only reads
//! geometry, calls these, and writes classes/styles back.

pub mod visibility;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use crate::config::{LandingConfig, TimelineGeometry};

pub use visibility::{ActiveSections, RevealSet, SimulatedNotifier, TargetId, VisibilityEntry, VisibilityNotifier};

/// client-space box, as returned by `getBoundingClientRect`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

pub fn navbar_shrunk(scroll_y: f64, threshold: f64) -> bool {
    scroll_y > threshold
}

/// size and element-relative position of a ripple dot, in px.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RippleDot {
    pub size: f64,
    pub left: f64,
    pub top: f64,
}

pub fn ripple_dot(rect: Rect, client_x: f64, client_y: f64, scale: f64) -> RippleDot {
    RippleDot {
        size: rect.width.max(rect.height) * scale,
        left: client_x - rect.left,
        top: client_y - rect.top,
    }
}

/// translation applied to a magnetic button for a pointer at `(x, y)`.
pub fn magnetic_offset(rect: Rect, client_x: f64, client_y: f64, strength: f64) -> (f64, f64) {
    let dx = client_x - rect.left - rect.width / 2.0;
    let dy = client_y - rect.top - rect.height / 2.0;
    (dx * strength, dy * strength)
}

pub fn translate_css((x, y): (f64, f64)) -> String {
    format!("translate({x}px, {y}px)")
}

pub const TRANSLATE_RESET: &str = "translate(0, 0)";

/// percentage (0..=100) of the timeline the reader has scrolled past.
pub fn timeline_progress(timeline: Rect, view_height: f64, geo: &TimelineGeometry) -> f64 {
    let total = timeline.height + view_height * geo.tail;
    if total <= 0.0 {
        return 0.0;
    }
    let covered = (view_height * geo.progress_anchor - timeline.top).max(0.0).min(total);
    (covered / total * 100.0).clamp(0.0, 100.0)
}

/// a step is active while it overlaps the reading band of the viewport.
pub fn step_active(step: Rect, view_height: f64, geo: &TimelineGeometry) -> bool {
    step.top < view_height * geo.band_bottom && step.bottom() > view_height * geo.band_top
}

/// label for a mood slider value. keys are the exact strings `"1"`, `"2"`, ...;
/// anything else gets the default.
pub fn mood_label<'a>(value: &str, cfg: &'a LandingConfig) -> &'a str {
    cfg.mood_labels
        .iter()
        .enumerate()
        .find(|(i, _)| value == (i + 1).to_string())
        .map(|(_, label)| label.as_str())
        .unwrap_or(&cfg.mood_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> TimelineGeometry {
        TimelineGeometry::default()
    }

    #[test]
    fn navbar_threshold_is_exclusive() {
        assert!(!navbar_shrunk(0.0, 16.0));
        assert!(!navbar_shrunk(16.0, 16.0));
        assert!(navbar_shrunk(16.5, 16.0));
    }

    #[test]
    fn mood_labels() {
        let cfg = LandingConfig::default();
        let got: Vec<_> = ["1", "2", "3", "4", "5"].iter().map(|v| mood_label(v, &cfg)).collect();
        assert_eq!(got, ["Struggling", "Low", "Balanced", "Better", "Calm"]);
        for v in ["99", "0", "", "-1", "abc", "2.5", "+1", "01", " 1", "5 "] {
            assert_eq!(mood_label(v, &cfg), "Balanced", "value {v:?}");
        }
    }

    #[test]
    fn ripple_is_relative_to_element() {
        let dot = ripple_dot(Rect::new(100.0, 50.0, 200.0, 40.0), 150.0, 60.0, 0.45);
        assert_eq!(dot, RippleDot { size: 90.0, left: 50.0, top: 10.0 });
    }

    #[test]
    fn magnetic_pull_is_eight_percent_of_offset() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(magnetic_offset(rect, 50.0, 25.0, 0.08), (0.0, 0.0));
        let (x, y) = magnetic_offset(rect, 100.0, 0.0, 0.08);
        assert!((x - 4.0).abs() < 1e-9 && (y + 2.0).abs() < 1e-9);
        assert_eq!(translate_css((4.0, -2.0)), "translate(4px, -2px)");
    }

    #[test]
    fn timeline_progress_bounds() {
        let vh = 1000.0;
        // far below the fold
        assert_eq!(timeline_progress(Rect::new(0.0, 5000.0, 0.0, 800.0), vh, &geo()), 0.0);
        // scrolled far past
        assert_eq!(timeline_progress(Rect::new(0.0, -5000.0, 0.0, 800.0), vh, &geo()), 100.0);
        // top at the anchor line: nothing covered yet
        assert_eq!(timeline_progress(Rect::new(0.0, 720.0, 0.0, 800.0), vh, &geo()), 0.0);
        // halfway: total = 1000, covered = 500
        let p = timeline_progress(Rect::new(0.0, 220.0, 0.0, 800.0), vh, &geo());
        assert!((p - 50.0).abs() < 1e-9);
    }

    #[test]
    fn timeline_progress_is_monotonic_while_scrolling() {
        let vh = 900.0;
        let mut last = -1.0;
        let mut top = 2000.0;
        while top > -3000.0 {
            let p = timeline_progress(Rect::new(0.0, top, 0.0, 1200.0), vh, &geo());
            assert!((0.0..=100.0).contains(&p));
            assert!(p >= last, "progress went back at top={top}");
            last = p;
            top -= 37.0;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn degenerate_timeline_is_zero() {
        assert_eq!(timeline_progress(Rect::default(), 0.0, &geo()), 0.0);
    }

    #[test]
    fn step_band() {
        let vh = 1000.0;
        // band is 280..660
        assert!(step_active(Rect::new(0.0, 300.0, 10.0, 100.0), vh, &geo()));
        assert!(step_active(Rect::new(0.0, 200.0, 10.0, 100.0), vh, &geo()));
        assert!(!step_active(Rect::new(0.0, 100.0, 10.0, 180.0), vh, &geo()));
        assert!(!step_active(Rect::new(0.0, 660.0, 10.0, 100.0), vh, &geo()));
    }
}
