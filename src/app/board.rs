use crate::app::actions::{Intent, Outcome};
use crate::notes::{Note, NoteFields, NoteId, NoteStore, SelectionSet, StoreError};
use crate::search;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardMode {
    Browsing,
    /// Bulk-edit session; the selection lives and dies with it.
    Editing(SelectionSet),
}

/// Owns the note store plus the session state around it (bulk-edit mode and
/// search query). Front ends talk to it only through [`Board::dispatch`].
#[derive(Debug)]
pub struct Board {
    store: NoteStore,
    mode: BoardMode,
    query: String,
}

impl Board {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store,
            mode: BoardMode::Browsing,
            query: String::new(),
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn mode(&self) -> &BoardMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, BoardMode::Editing(_))
    }

    pub fn selection(&self) -> Option<&SelectionSet> {
        match &self.mode {
            BoardMode::Editing(selection) => Some(selection),
            BoardMode::Browsing => None,
        }
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.selection()
            .map(|selection| selection.contains(id))
            .unwrap_or(false)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn visible(&self) -> Vec<&Note> {
        search::filter(self.store.all(), &self.query)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.store.get(id)
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.store.flush()
    }

    pub fn dispatch(&mut self, intent: Intent) -> Result<Outcome, StoreError> {
        tracing::trace!(intent = intent.kind(), "dispatching");
        match intent {
            Intent::Create {
                title,
                body,
                starred,
                images,
            } => {
                let note = self.store.create_with(&title, &body, starred, images)?;
                Ok(Outcome::Created(note))
            }
            Intent::Update {
                id,
                title,
                body,
                starred,
                images,
            } => {
                let note = self.store.update(
                    id,
                    NoteFields {
                        title,
                        body,
                        starred,
                        images,
                    },
                )?;
                Ok(Outcome::Updated(note))
            }
            Intent::Delete { id } => {
                let result = self.store.delete(id);
                self.forget_missing();
                result?;
                Ok(Outcome::Deleted { removed: 1 })
            }
            Intent::SetStarred { id, starred } => {
                let note = self.store.set_starred(id, starred)?;
                Ok(Outcome::Updated(note))
            }
            Intent::Search { query } => {
                if query == self.query {
                    return Ok(Outcome::Unchanged);
                }
                self.query = query;
                Ok(Outcome::Changed)
            }
            Intent::ClearSearch => {
                if self.query.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                self.query.clear();
                Ok(Outcome::Changed)
            }
            Intent::BeginSelection { id } => {
                if self.is_editing() || !self.store.contains(id) {
                    return Ok(Outcome::Unchanged);
                }
                tracing::debug!(note_id = %id, "entering bulk edit");
                self.mode = BoardMode::Editing(SelectionSet::with_first(id));
                Ok(Outcome::Changed)
            }
            Intent::CancelSelection => {
                if !self.is_editing() {
                    return Ok(Outcome::Unchanged);
                }
                tracing::debug!("leaving bulk edit");
                self.mode = BoardMode::Browsing;
                Ok(Outcome::Changed)
            }
            Intent::Tap { id } => match &mut self.mode {
                BoardMode::Browsing => {
                    if self.store.contains(id) {
                        Ok(Outcome::Open(id))
                    } else {
                        Err(StoreError::NotFound(id))
                    }
                }
                BoardMode::Editing(_) if !self.store.contains(id) => {
                    Err(StoreError::NotFound(id))
                }
                BoardMode::Editing(selection) => {
                    selection.toggle(id);
                    Ok(Outcome::Changed)
                }
            },
            Intent::ToggleSelection { id } => match &mut self.mode {
                BoardMode::Editing(_) if !self.store.contains(id) => {
                    Err(StoreError::NotFound(id))
                }
                BoardMode::Editing(selection) => {
                    selection.toggle(id);
                    Ok(Outcome::Changed)
                }
                BoardMode::Browsing => Ok(Outcome::Unchanged),
            },
            Intent::SelectAll => match &mut self.mode {
                BoardMode::Editing(selection) => {
                    selection.select_all(self.store.ids());
                    Ok(Outcome::Changed)
                }
                BoardMode::Browsing => Ok(Outcome::Unchanged),
            },
            Intent::DeleteSelected => {
                let BoardMode::Editing(selection) = &self.mode else {
                    return Ok(Outcome::Unchanged);
                };
                if selection.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                let doomed: Vec<NoteId> = selection.ids().collect();
                self.mode = BoardMode::Browsing;
                let removed = self.store.delete_many(&doomed)?;
                tracing::info!(removed, "deleted selected notes");
                Ok(Outcome::Deleted { removed })
            }
            Intent::Reorder { dragged, target } => {
                if self.store.move_before(dragged, target)? {
                    Ok(Outcome::Changed)
                } else {
                    Ok(Outcome::Unchanged)
                }
            }
        }
    }

    fn forget_missing(&mut self) {
        if let BoardMode::Editing(selection) = &mut self.mode {
            let store = &self.store;
            selection.retain_existing(|id| store.contains(id));
        }
    }
}
