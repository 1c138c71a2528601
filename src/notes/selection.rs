use indexmap::IndexSet;

use super::model::NoteId;

/// Notes marked during a bulk-edit session, kept in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: IndexSet<NoteId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first(id: NoteId) -> Self {
        let mut selection = Self::new();
        selection.insert(id);
        selection
    }

    pub fn insert(&mut self, id: NoteId) -> bool {
        self.ids.insert(id)
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, id: NoteId) -> bool {
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Selects every id in `all_ids`, unless exactly that set is already
    /// selected, in which case the selection is cleared.
    pub fn select_all<I>(&mut self, all_ids: I)
    where
        I: IntoIterator<Item = NoteId>,
    {
        let everything: IndexSet<NoteId> = all_ids.into_iter().collect();
        if self.ids.len() == everything.len() && self.ids.iter().all(|id| everything.contains(id))
        {
            self.ids.clear();
        } else {
            self.ids = everything;
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.ids.iter().copied()
    }

    pub fn retain_existing<F>(&mut self, mut exists: F)
    where
        F: FnMut(NoteId) -> bool,
    {
        self.ids.retain(|id| exists(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<NoteId> {
        vec![NoteId(1), NoteId(2), NoteId(3)]
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(NoteId(2)));
        assert!(selection.contains(NoteId(2)));
        assert!(!selection.toggle(NoteId(2)));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_toggles_between_everything_and_nothing() {
        let mut selection = SelectionSet::with_first(NoteId(1));
        selection.select_all(all());
        assert_eq!(selection.len(), 3);
        selection.select_all(all());
        assert_eq!(selection.len(), 0);
        selection.select_all(all());
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn select_all_compares_membership_not_size() {
        let mut selection = SelectionSet::new();
        selection.insert(NoteId(1));
        selection.insert(NoteId(2));
        selection.insert(NoteId(42));
        selection.select_all(all());
        assert_eq!(selection.ids().collect::<Vec<_>>(), all());
    }

    #[test]
    fn keeps_selection_order() {
        let mut selection = SelectionSet::new();
        selection.toggle(NoteId(3));
        selection.toggle(NoteId(1));
        selection.toggle(NoteId(2));
        selection.toggle(NoteId(1));
        assert_eq!(
            selection.ids().collect::<Vec<_>>(),
            vec![NoteId(3), NoteId(2)]
        );
    }

    #[test]
    fn retain_existing_drops_vanished_ids() {
        let mut selection = SelectionSet::new();
        selection.select_all(all());
        selection.retain_existing(|id| id != NoteId(2));
        assert_eq!(selection.len(), 2);
        assert!(!selection.contains(NoteId(2)));
    }
}
