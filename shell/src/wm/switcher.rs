//! Alt+Tab window switcher.
//!
//! Holding the modifier and pressing Tab shows an overlay over a snapshot of
//! the eligible windows. Each further Tab advances the highlight, wrapping at
//! the end. Releasing the modifier commits the highlighted window.

use shared_types::SwitcherView;

#[derive(Debug, Default, Clone)]
pub struct WindowSwitcher {
    modifier_held: bool,
    visible: bool,
    selected: usize,
    snapshot: Vec<String>,
}

impl WindowSwitcher {
    pub fn modifier_down(&mut self) {
        self.modifier_held = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Tab pressed. Returns true when the overlay changed.
    ///
    /// The first Tab of a session snapshots `eligible` and selects the window
    /// after the active one. Later Tabs advance through the same snapshot.
    pub fn advance(&mut self, eligible: Vec<String>, active: Option<&str>) -> bool {
        if !self.modifier_held {
            return false;
        }

        if !self.visible {
            if eligible.is_empty() {
                return false;
            }
            let start = active
                .and_then(|id| eligible.iter().position(|w| w == id))
                .map(|i| (i + 1) % eligible.len())
                .unwrap_or(0);
            self.snapshot = eligible;
            self.selected = start;
            self.visible = true;
            return true;
        }

        if self.snapshot.is_empty() {
            return false;
        }
        self.selected = (self.selected + 1) % self.snapshot.len();
        true
    }

    /// Modifier released. Returns the window to focus, if the overlay was up.
    pub fn modifier_up(&mut self) -> Option<String> {
        self.modifier_held = false;
        if !self.visible {
            return None;
        }
        let target = self.snapshot.get(self.selected).cloned();
        self.reset();
        target
    }

    /// Drops windows that are no longer eligible. Returns true when the
    /// overlay changed.
    pub fn retain<F>(&mut self, mut still_eligible: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        if !self.visible {
            return false;
        }

        let before = self.snapshot.len();
        let selected_id = self.snapshot.get(self.selected).cloned();
        self.snapshot.retain(|id| still_eligible(id));
        if self.snapshot.len() == before {
            return false;
        }

        if self.snapshot.is_empty() {
            self.reset();
            return true;
        }

        // Keep the highlight on the same window when it survived, otherwise
        // stay at the same slot.
        self.selected = selected_id
            .and_then(|id| self.snapshot.iter().position(|w| *w == id))
            .unwrap_or(self.selected)
            % self.snapshot.len();
        true
    }

    pub fn view(&self) -> SwitcherView {
        SwitcherView {
            visible: self.visible,
            selected_index: self.selected,
            window_ids: if self.visible {
                self.snapshot.clone()
            } else {
                Vec::new()
            },
        }
    }

    fn reset(&mut self) {
        self.visible = false;
        self.selected = 0;
        self.snapshot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tab_without_modifier_is_ignored() {
        let mut s = WindowSwitcher::default();
        assert!(!s.advance(ids(&["a", "b"]), None));
        assert!(!s.is_visible());
    }

    #[test]
    fn test_cycle_wraps_and_commits() {
        let mut s = WindowSwitcher::default();
        s.modifier_down();
        assert!(s.advance(ids(&["a", "b", "c"]), Some("a")));
        assert_eq!(s.view().selected_index, 1);
        s.advance(ids(&["a", "b", "c"]), Some("a"));
        assert_eq!(s.view().selected_index, 2);
        s.advance(ids(&["a", "b", "c"]), Some("a"));
        assert_eq!(s.view().selected_index, 0);
        assert_eq!(s.modifier_up().as_deref(), Some("a"));
        assert!(!s.view().visible);
    }

    #[test]
    fn test_empty_eligible_set_stays_hidden() {
        let mut s = WindowSwitcher::default();
        s.modifier_down();
        assert!(!s.advance(Vec::new(), None));
        assert_eq!(s.modifier_up(), None);
    }

    #[test]
    fn test_release_without_tab_commits_nothing() {
        let mut s = WindowSwitcher::default();
        s.modifier_down();
        assert_eq!(s.modifier_up(), None);
    }

    #[test]
    fn test_retain_prunes_and_hides_when_empty() {
        let mut s = WindowSwitcher::default();
        s.modifier_down();
        s.advance(ids(&["a", "b", "c"]), Some("a"));
        assert!(s.retain(|id| id != "b"));
        let view = s.view();
        assert_eq!(view.window_ids, ids(&["a", "c"]));
        assert!(view.selected_index < view.window_ids.len());

        assert!(s.retain(|_| false));
        assert!(!s.is_visible());
        assert_eq!(s.modifier_up(), None);
    }
}
