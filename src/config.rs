//! page configuration.
//!
//! every field has a default matching the markup the widgets ship with, so a
//! host page only has to pass the keys it wants to change, e.g.
//! `{"chat": {"endpoint": "/api/chat"}}`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub landing: LandingConfig,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"calmpage=debug"`.
    pub log_level: Option<String>,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub form_id: String,
    pub input_id: String,
    pub log_id: String,
    pub end_chat_button_id: String,
    /// POST target for chat messages.
    pub endpoint: String,
    /// POST target that closes the session server side.
    pub end_chat_endpoint: String,
    pub placeholder: String,
    /// shown when a reply could not be produced.
    pub fallback: String,
    /// refuse new submissions while a reply is outstanding.
    pub single_flight: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            form_id: "chatForm".into(),
            input_id: "chatInput".into(),
            log_id: "chatMessages".into(),
            end_chat_button_id: "endChatBtn".into(),
            endpoint: "/get_response".into(),
            end_chat_endpoint: "/end_chat".into(),
            placeholder: "Thinking...".into(),
            fallback: "Unable to respond right now. Please try again.".into(),
            single_flight: false,
        }
    }
}

/// fractions of the viewport height driving the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineGeometry {
    /// viewport line the progress bar fills up to.
    pub progress_anchor: f64,
    /// extra scroll distance added to the timeline height.
    pub tail: f64,
    /// upper edge of the band in which steps are active.
    pub band_top: f64,
    /// lower edge of that band.
    pub band_bottom: f64,
}

impl Default for TimelineGeometry {
    fn default() -> Self {
        Self { progress_anchor: 0.72, tail: 0.2, band_top: 0.28, band_bottom: 0.66 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingConfig {
    pub navbar_id: String,
    pub nav_link_selector: String,
    pub reveal_selector: String,
    pub ripple_selector: String,
    pub magnetic_selector: String,
    pub timeline_id: String,
    pub timeline_progress_id: String,
    pub step_selector: String,
    pub mood_input_id: String,
    pub mood_label_id: String,
    pub breath_circle_id: String,
    pub breath_reset_id: String,

    pub shrink_class: String,
    pub active_class: String,
    pub reveal_class: String,
    pub ripple_dot_class: String,
    pub resetting_class: String,

    /// scroll offset in px past which the navbar shrinks.
    pub shrink_threshold: f64,
    pub section_threshold: f64,
    pub reveal_threshold: f64,
    /// ripple diameter as a fraction of the larger element side.
    pub ripple_scale: f64,
    /// fraction of the pointer offset applied to magnetic buttons.
    pub magnetic_strength: f64,
    pub timeline: TimelineGeometry,
    /// labels for slider values 1..=5.
    pub mood_labels: Vec<String>,
    pub mood_default: String,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            navbar_id: "lp-navbar".into(),
            nav_link_selector: ".lp-nav-link".into(),
            reveal_selector: ".lp-observe".into(),
            ripple_selector: ".lp-ripple".into(),
            magnetic_selector: ".lp-btn-magnetic".into(),
            timeline_id: "lp-timeline".into(),
            timeline_progress_id: "lp-timeline-progress".into(),
            step_selector: ".lp-step".into(),
            mood_input_id: "lpMood".into(),
            mood_label_id: "lpMoodLabel".into(),
            breath_circle_id: "lpBreathCircle".into(),
            breath_reset_id: "lpResetBreath".into(),
            shrink_class: "shrink".into(),
            active_class: "active".into(),
            reveal_class: "in-view".into(),
            ripple_dot_class: "lp-ripple-dot".into(),
            resetting_class: "resetting".into(),
            shrink_threshold: 16.0,
            section_threshold: 0.45,
            reveal_threshold: 0.2,
            ripple_scale: 0.45,
            magnetic_strength: 0.08,
            timeline: TimelineGeometry::default(),
            mood_labels: ["Struggling", "Low", "Balanced", "Better", "Calm"]
                .into_iter()
                .map(String::from)
                .collect(),
            mood_default: "Balanced".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(Config::from_json("").unwrap(), Config::default());
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = Config::from_json(
            r#"{"chat": {"endpoint": "/api/chat", "single_flight": true},
                "landing": {"timeline": {"tail": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(cfg.chat.endpoint, "/api/chat");
        assert!(cfg.chat.single_flight);
        assert_eq!(cfg.chat.placeholder, "Thinking...");
        assert_eq!(cfg.landing.timeline.tail, 0.5);
        assert_eq!(cfg.landing.timeline.progress_anchor, 0.72);
        assert_eq!(cfg.landing.shrink_threshold, 16.0);
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(Config::from_json("{chat:").is_err());
    }
}
