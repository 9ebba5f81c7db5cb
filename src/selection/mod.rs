//! Client-side selection state.
//!
//! Tracks the character currently navigated to, an independent multi-selection set and the
//! view mode. Every transition swaps in a new immutable snapshot and notifies observers when
//! something actually changed. The current character and the multi-selection are never
//! reconciled with each other.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

const CHARACTERS_PATH_PREFIX: &str = "/characters/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Column,
    #[default]
    Graph,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Column => ViewMode::Graph,
            ViewMode::Graph => ViewMode::Column,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Column => "column",
            ViewMode::Graph => "graph",
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "column" => Ok(ViewMode::Column),
            "graph" | "visualizer" => Ok(ViewMode::Graph),
            _ => Err(format!("unknown view mode {}", value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SelectionSnapshot {
    pub current_character: Option<String>,
    pub multi_selection: HashSet<String>,
    pub view_mode: ViewMode,
}

impl SelectionSnapshot {
    pub fn is_in_multi_selection(&self, slug: &str) -> bool {
        self.multi_selection.contains(slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    CurrentCharacter,
    MultiSelection,
    ViewMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(SelectionChange, &SelectionSnapshot)>;

/// Extracts `<slug>` from `/characters/<slug>[/...]`.
pub fn character_slug_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(CHARACTERS_PATH_PREFIX)?;
    let slug = rest.split('/').next().unwrap_or_default();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Selection container for one session. Hand it to consumers by reference.
pub struct SelectionState {
    snapshot: Arc<SelectionSnapshot>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer_id: u64,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(SelectionSnapshot::default()),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    pub fn snapshot(&self) -> Arc<SelectionSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn current_character(&self) -> Option<&str> {
        self.snapshot.current_character.as_deref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.snapshot.view_mode
    }

    pub fn subscribe(
        &mut self,
        observer: impl FnMut(SelectionChange, &SelectionSnapshot) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    /// Paths outside `/characters/<slug>` clear the current character.
    pub fn set_current_from_path(&mut self, path: &str) {
        let slug = character_slug_from_path(path).map(str::to_string);
        debug!(path, slug = slug.as_deref().unwrap_or("(no selection)"), "path sync");
        self.apply(SelectionChange::CurrentCharacter, |next| {
            next.current_character = slug;
        });
    }

    pub fn add_to_multi_selection(&mut self, slug: &str) {
        self.apply(SelectionChange::MultiSelection, |next| {
            next.multi_selection.insert(slug.to_string());
        });
    }

    pub fn remove_from_multi_selection(&mut self, slug: &str) {
        self.apply(SelectionChange::MultiSelection, |next| {
            next.multi_selection.remove(slug);
        });
    }

    pub fn set_multi_selection<I, S>(&mut self, slugs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slugs: HashSet<String> = slugs.into_iter().map(Into::into).collect();
        self.apply(SelectionChange::MultiSelection, |next| {
            next.multi_selection = slugs;
        });
    }

    pub fn clear_multi_selection(&mut self) {
        self.apply(SelectionChange::MultiSelection, |next| {
            next.multi_selection.clear();
        });
    }

    pub fn is_in_multi_selection(&self, slug: &str) -> bool {
        self.snapshot.is_in_multi_selection(slug)
    }

    pub fn toggle_view_mode(&mut self) {
        self.apply(SelectionChange::ViewMode, |next| {
            next.view_mode = next.view_mode.toggled();
        });
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.apply(SelectionChange::ViewMode, |next| {
            next.view_mode = mode;
        });
    }

    fn apply(&mut self, change: SelectionChange, update: impl FnOnce(&mut SelectionSnapshot)) {
        let mut next = SelectionSnapshot::clone(&self.snapshot);
        update(&mut next);
        if next == *self.snapshot {
            return;
        }
        self.snapshot = Arc::new(next);
        debug!(?change, snapshot = ?self.snapshot, "selection changed");
        for (_, observer) in self.observers.iter_mut() {
            observer(change, &self.snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(state: &mut SelectionState) -> (ObserverId, Rc<RefCell<Vec<SelectionChange>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = state.subscribe(move |change, _| sink.borrow_mut().push(change));
        (id, seen)
    }

    #[test]
    fn path_prefix_selects_current_character() {
        let mut state = SelectionState::new();
        state.set_current_from_path("/characters/luna-lovegood/vitals");
        assert_eq!(state.current_character(), Some("luna-lovegood"));

        state.set_current_from_path("/characters/harry-potter");
        assert_eq!(state.current_character(), Some("harry-potter"));

        state.set_current_from_path("/about");
        assert_eq!(state.current_character(), None);
    }

    #[test]
    fn malformed_paths_mean_no_selection() {
        assert_eq!(character_slug_from_path("/characters/"), None);
        assert_eq!(character_slug_from_path("/characters"), None);
        assert_eq!(character_slug_from_path("characters/ron-weasley"), None);
        assert_eq!(character_slug_from_path("/characters//vitals"), None);
        assert_eq!(character_slug_from_path(""), None);
        assert_eq!(
            character_slug_from_path("/characters/ron-weasley/relationships/4"),
            Some("ron-weasley")
        );
    }

    #[test]
    fn multi_selection_is_idempotent() {
        let mut state = SelectionState::new();
        state.add_to_multi_selection("a");
        state.add_to_multi_selection("a");
        assert_eq!(state.snapshot().multi_selection.len(), 1);

        state.remove_from_multi_selection("a");
        assert!(!state.is_in_multi_selection("a"));
        state.remove_from_multi_selection("a");
        assert!(state.snapshot().multi_selection.is_empty());
    }

    #[test]
    fn set_and_clear_replace_wholesale() {
        let mut state = SelectionState::new();
        state.add_to_multi_selection("draco-malfoy");
        state.set_multi_selection(["harry-potter", "ron-weasley", "harry-potter"]);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.multi_selection.len(), 2);
        assert!(!snapshot.is_in_multi_selection("draco-malfoy"));
        assert!(snapshot.is_in_multi_selection("ron-weasley"));

        state.clear_multi_selection();
        assert!(state.snapshot().multi_selection.is_empty());
        assert!(snapshot.is_in_multi_selection("ron-weasley"));
    }

    #[test]
    fn axes_stay_independent() {
        let mut state = SelectionState::new();
        state.set_current_from_path("/characters/harry-potter");
        state.add_to_multi_selection("ron-weasley");

        assert_eq!(state.current_character(), Some("harry-potter"));
        assert!(!state.is_in_multi_selection("harry-potter"));

        state.set_current_from_path("/");
        assert!(state.is_in_multi_selection("ron-weasley"));
    }

    #[test]
    fn view_mode_defaults_to_graph_and_survives_navigation() {
        let mut state = SelectionState::new();
        assert_eq!(state.view_mode(), ViewMode::Graph);

        state.toggle_view_mode();
        assert_eq!(state.view_mode(), ViewMode::Column);
        state.set_current_from_path("/characters/luna-lovegood");
        assert_eq!(state.view_mode(), ViewMode::Column);

        state.set_view_mode(ViewMode::Graph);
        state.toggle_view_mode();
        state.toggle_view_mode();
        assert_eq!(state.view_mode(), ViewMode::Graph);
    }

    #[test]
    fn observers_hear_only_real_changes() {
        let mut state = SelectionState::new();
        let (_, seen) = recorder(&mut state);

        state.add_to_multi_selection("a");
        state.add_to_multi_selection("a");
        state.set_current_from_path("/about");
        state.set_current_from_path("/characters/a");
        state.set_view_mode(ViewMode::Graph);
        state.toggle_view_mode();

        assert_eq!(
            *seen.borrow(),
            [
                SelectionChange::MultiSelection,
                SelectionChange::CurrentCharacter,
                SelectionChange::ViewMode,
            ]
        );
    }

    #[test]
    fn observers_receive_the_new_snapshot() {
        let mut state = SelectionState::new();
        let current = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&current);
        state.subscribe(move |_, snapshot| {
            *sink.borrow_mut() = snapshot.current_character.clone();
        });

        state.set_current_from_path("/characters/draco-malfoy/relationships");
        assert_eq!(current.borrow().as_deref(), Some("draco-malfoy"));
    }

    #[test]
    fn unsubscribed_observers_go_quiet() {
        let mut state = SelectionState::new();
        let (first, first_seen) = recorder(&mut state);
        let (_, second_seen) = recorder(&mut state);

        assert!(state.unsubscribe(first));
        assert!(!state.unsubscribe(first));
        state.toggle_view_mode();

        assert!(first_seen.borrow().is_empty());
        assert_eq!(second_seen.borrow().len(), 1);
    }

    #[test]
    fn view_mode_parses_legacy_name() {
        assert_eq!("visualizer".parse::<ViewMode>().unwrap(), ViewMode::Graph);
        assert_eq!("column".parse::<ViewMode>().unwrap(), ViewMode::Column);
        assert!("grid".parse::<ViewMode>().is_err());
    }
}
