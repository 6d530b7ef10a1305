//! visibility notifications and the two behaviors built on them.
//!
//! a `VisibilityNotifier` watches registered targets and reports a
//! `VisibilityEntry` whenever a target's visible fraction crosses its
//! threshold. in the browser that is an `IntersectionObserver`; in tests,
//! `SimulatedNotifier` computes the same entries from injected geometry.

use std::collections::{BTreeMap, BTreeSet};

use super::Rect;

/// index of an observed element in the table the binding captured at init.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityEntry {
    pub target: TargetId,
    pub ratio: f64,
    pub intersecting: bool,
}

impl VisibilityEntry {
    /// builds an entry from what an observer reported. `intersecting` is only
    /// set at or above `threshold`: browsers report `isIntersecting` for any
    /// non-zero overlap, including on the way out and on the first callback.
    pub fn observed(target: TargetId, ratio: f64, is_intersecting: bool, threshold: f64) -> Self {
        let intersecting = is_intersecting && ratio > 0.0 && ratio >= threshold;
        Self { target, ratio, intersecting }
    }
}

pub trait VisibilityNotifier {
    fn observe(&mut self, target: TargetId);
    fn unobserve(&mut self, target: TargetId);
}

/// geometry-driven notifier for non-browser targets.
#[derive(Debug)]
pub struct SimulatedNotifier {
    threshold: f64,
    regions: BTreeMap<TargetId, Rect>,
    observed: BTreeSet<TargetId>,
    // last reported side of the threshold; absent until the first report
    state: BTreeMap<TargetId, bool>,
}

impl SimulatedNotifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, regions: BTreeMap::new(), observed: BTreeSet::new(), state: BTreeMap::new() }
    }

    /// positions a target in page coordinates.
    pub fn place(&mut self, target: TargetId, rect: Rect) {
        self.regions.insert(target, rect);
    }

    pub fn is_observed(&self, target: TargetId) -> bool {
        self.observed.contains(&target)
    }

    fn ratio(region: &Rect, viewport: &Rect) -> f64 {
        let area = region.width * region.height;
        if area <= 0.0 {
            return 0.0;
        }
        let w = (region.right().min(viewport.right()) - region.left.max(viewport.left)).max(0.0);
        let h = (region.bottom().min(viewport.bottom()) - region.top.max(viewport.top)).max(0.0);
        w * h / area
    }

    /// moves the viewport and returns the entries an observer would deliver:
    /// one for every newly observed target, plus one per threshold crossing.
    pub fn view(&mut self, viewport: Rect) -> Vec<VisibilityEntry> {
        let mut out = Vec::new();
        for &target in &self.observed {
            let Some(region) = self.regions.get(&target) else { continue };
            let ratio = Self::ratio(region, &viewport);
            let entry = VisibilityEntry::observed(target, ratio, ratio > 0.0, self.threshold);
            if self.state.insert(target, entry.intersecting) != Some(entry.intersecting) {
                out.push(entry);
            }
        }
        out
    }
}

impl VisibilityNotifier for SimulatedNotifier {
    fn observe(&mut self, target: TargetId) {
        self.observed.insert(target);
    }
    fn unobserve(&mut self, target: TargetId) {
        self.observed.remove(&target);
        self.state.remove(&target);
    }
}

/// nav highlighting: which section the reader is in.
#[derive(Clone, Debug, Default)]
pub struct ActiveSections {
    /// `href` of every nav link, in document order.
    links: Vec<String>,
    /// element id of each observed section, indexed by `TargetId`.
    sections: Vec<String>,
    active: Option<usize>,
}

impl ActiveSections {
    pub fn new(links: Vec<String>, sections: Vec<String>) -> Self {
        Self { links, sections, active: None }
    }

    /// section ids referenced by `#hash` links, in link order, deduplicated.
    pub fn section_ids(links: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        links
            .iter()
            .filter_map(|href| href.strip_prefix('#'))
            .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
            .map(String::from)
            .collect()
    }

    pub fn targets(&self) -> impl Iterator<Item = TargetId> + '_ {
        (0..self.sections.len()).map(TargetId)
    }

    pub fn active_section(&self) -> Option<&str> {
        self.active.and_then(|i| self.sections.get(i)).map(String::as_str)
    }

    /// applies a batch of entries; the last intersecting one wins.
    /// returns `true` when the active section changed.
    pub fn apply(&mut self, entries: &[VisibilityEntry]) -> bool {
        let before = self.active;
        for e in entries {
            if e.intersecting && e.target.0 < self.sections.len() {
                self.active = Some(e.target.0);
            }
        }
        before != self.active
    }

    /// per-link active flag, parallel to the links passed to `new`.
    pub fn link_flags(&self) -> Vec<bool> {
        let hash = self.active_section().map(|id| format!("#{id}"));
        self.links
            .iter()
            .map(|href| hash.as_deref() == Some(href.as_str()))
            .collect()
    }
}

/// one-shot reveal bookkeeping.
#[derive(Clone, Debug)]
pub struct RevealSet {
    revealed: Vec<bool>,
}

impl RevealSet {
    /// with `reduced_motion` every target starts revealed and nothing is observed.
    pub fn new(count: usize, reduced_motion: bool) -> Self {
        Self { revealed: vec![reduced_motion; count] }
    }

    pub fn is_revealed(&self, target: TargetId) -> bool {
        self.revealed.get(target.0).copied().unwrap_or(false)
    }

    pub fn revealed(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.revealed.iter().enumerate().filter(|(_, r)| **r).map(|(i, _)| TargetId(i))
    }

    /// registers every target still waiting for its reveal.
    pub fn observe_pending(&self, notifier: &mut impl VisibilityNotifier) -> usize {
        let mut n = 0;
        for (i, _) in self.revealed.iter().enumerate().filter(|(_, r)| !**r) {
            notifier.observe(TargetId(i));
            n += 1;
        }
        n
    }

    /// reveals intersecting targets and stops observing them.
    /// returns the targets revealed by this batch.
    pub fn apply(&mut self, entries: &[VisibilityEntry], notifier: &mut impl VisibilityNotifier) -> Vec<TargetId> {
        let mut newly = Vec::new();
        for e in entries.iter().filter(|e| e.intersecting) {
            if let Some(slot) = self.revealed.get_mut(e.target.0)
                && !*slot
            {
                *slot = true;
                notifier.unobserve(e.target);
                newly.push(e.target);
            }
        }
        newly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VH: f64 = 800.0;

    fn viewport(scroll: f64) -> Rect {
        Rect::new(0.0, scroll, 1200.0, VH)
    }

    fn links() -> Vec<String> {
        ["#about", "#how", "#contact", "/login"].into_iter().map(String::from).collect()
    }

    /// three stacked 1000px sections starting at y=800.
    fn sections_notifier(sections: &ActiveSections) -> SimulatedNotifier {
        let mut n = SimulatedNotifier::new(0.45);
        for t in sections.targets() {
            n.place(t, Rect::new(0.0, 800.0 + 1000.0 * t.0 as f64, 1200.0, 1000.0));
            n.observe(t);
        }
        n
    }

    #[test]
    fn section_ids_from_links() {
        let links: Vec<String> = ["#a", "/page", "#", "#b", "#a"].into_iter().map(String::from).collect();
        let ids = ActiveSections::section_ids(&links);
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn scrolling_into_section_activates_exactly_one_link() {
        let links = links();
        let mut active = ActiveSections::new(links.clone(), ActiveSections::section_ids(&links));
        let mut n = sections_notifier(&active);

        // hero only: nothing active
        active.apply(&n.view(viewport(0.0)));
        assert_eq!(active.link_flags(), vec![false, false, false, false]);

        // 500px of "how" (y 1800..2800) visible = 50%
        assert!(active.apply(&n.view(viewport(1800.0 + 500.0 - VH))));
        assert_eq!(active.active_section(), Some("how"));
        assert_eq!(active.link_flags(), vec![false, true, false, false]);
        assert_eq!(active.link_flags().iter().filter(|f| **f).count(), 1);
    }

    #[test]
    fn below_threshold_does_not_activate() {
        let links = links();
        let mut active = ActiveSections::new(links.clone(), ActiveSections::section_ids(&links));
        let mut n = sections_notifier(&active);
        // 400px of "about" = 40%
        active.apply(&n.view(viewport(400.0)));
        assert_eq!(active.active_section(), None);
    }

    #[test]
    fn last_intersecting_entry_wins() {
        let mut active = ActiveSections::new(links(), vec!["about".into(), "how".into()]);
        let entries = [
            VisibilityEntry { target: TargetId(0), ratio: 0.5, intersecting: true },
            VisibilityEntry { target: TargetId(1), ratio: 0.6, intersecting: true },
        ];
        active.apply(&entries);
        assert_eq!(active.active_section(), Some("how"));
    }

    #[test]
    fn section_leaving_below_threshold_stays_inactive() {
        let mut active = ActiveSections::new(links(), vec!["about".into(), "how".into()]);
        // scrolling up: "about" is 70% in view, "how" still shows 30%
        let batch = [
            VisibilityEntry::observed(TargetId(0), 0.7, true, 0.45),
            VisibilityEntry::observed(TargetId(1), 0.3, true, 0.45),
        ];
        assert!(!batch[1].intersecting);
        active.apply(&batch);
        assert_eq!(active.active_section(), Some("about"));
    }

    #[test]
    fn first_callback_below_threshold_does_not_reveal() {
        let mut set = RevealSet::new(1, false);
        let mut n = SimulatedNotifier::new(0.2);
        set.observe_pending(&mut n);
        let batch = [VisibilityEntry::observed(TargetId(0), 0.05, true, 0.2)];
        assert!(set.apply(&batch, &mut n).is_empty());
        assert!(n.is_observed(TargetId(0)));

        let batch = [VisibilityEntry::observed(TargetId(0), 0.2, true, 0.2)];
        assert_eq!(set.apply(&batch, &mut n), vec![TargetId(0)]);
    }

    #[test]
    fn reveal_fires_once_and_unobserves() {
        let mut set = RevealSet::new(2, false);
        let mut n = SimulatedNotifier::new(0.2);
        n.place(TargetId(0), Rect::new(0.0, 900.0, 100.0, 100.0));
        n.place(TargetId(1), Rect::new(0.0, 3000.0, 100.0, 100.0));
        assert_eq!(set.observe_pending(&mut n), 2);

        assert!(set.apply(&n.view(viewport(0.0)), &mut n).is_empty());

        // 30px of target 0 visible
        let got = set.apply(&n.view(viewport(130.0)), &mut n);
        assert_eq!(got, vec![TargetId(0)]);
        assert!(set.is_revealed(TargetId(0)));
        assert!(!n.is_observed(TargetId(0)));
        assert!(n.is_observed(TargetId(1)));

        // scrolling away and back does not fire again
        assert!(set.apply(&n.view(viewport(0.0)), &mut n).is_empty());
        assert!(set.apply(&n.view(viewport(200.0)), &mut n).is_empty());
    }

    #[test]
    fn reduced_motion_reveals_without_observing() {
        let set = RevealSet::new(3, true);
        let mut n = SimulatedNotifier::new(0.2);
        assert_eq!(set.observe_pending(&mut n), 0);
        assert_eq!(set.revealed().collect::<Vec<_>>(), vec![TargetId(0), TargetId(1), TargetId(2)]);
        assert!((0..3).all(|i| !n.is_observed(TargetId(i))));
    }
}
