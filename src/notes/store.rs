use std::collections::HashSet;

use super::error::{PersistenceError, StoreError};
use super::model::{now_unix, IdAllocator, ImageRef, Note, NoteFields, NoteId};
use super::reorder;
use crate::storage::NoteRepository;

/// The ordered note collection and its persistence round trip. Every
/// mutation rewrites the whole sequence through the repository.
pub struct NoteStore {
    notes: Vec<Note>,
    repository: Box<dyn NoteRepository>,
    ids: IdAllocator,
    dirty: bool,
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("notes", &self.notes.len())
            .field("repository", &self.repository.location())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl NoteStore {
    /// Loads the persisted sequence, or starts from `seed` when nothing has
    /// been stored yet. The seed is only written once something changes.
    pub fn open(
        mut repository: Box<dyn NoteRepository>,
        seed: Vec<Note>,
    ) -> Result<Self, PersistenceError> {
        let notes = match repository.load()? {
            Some(notes) => {
                tracing::info!(
                    count = notes.len(),
                    location = %repository.location(),
                    "loaded notes"
                );
                dedupe_ids(notes)
            }
            None => {
                tracing::info!(location = %repository.location(), "no stored notes, using seed");
                seed
            }
        };
        Ok(Self::from_parts(notes, repository))
    }

    pub fn with_notes(notes: Vec<Note>, repository: Box<dyn NoteRepository>) -> Self {
        Self::from_parts(dedupe_ids(notes), repository)
    }

    fn from_parts(notes: Vec<Note>, repository: Box<dyn NoteRepository>) -> Self {
        let ids = IdAllocator::starting_after(notes.iter().map(|note| &note.id));
        Self {
            notes,
            repository,
            ids,
            dirty: false,
        }
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.notes.iter().map(|note| note.id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// True while the last write failed and nothing has replaced it yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn location(&self) -> String {
        self.repository.location()
    }

    pub fn create(
        &mut self,
        title: &str,
        body: &str,
        images: Vec<ImageRef>,
    ) -> Result<Note, StoreError> {
        self.create_with(title, body, false, images)
    }

    /// Like [`NoteStore::create`] but with the star already applied, in a
    /// single write.
    pub fn create_with(
        &mut self,
        title: &str,
        body: &str,
        starred: bool,
        images: Vec<ImageRef>,
    ) -> Result<Note, StoreError> {
        let note = Note {
            id: self.ids.next_id(),
            title: title.to_string(),
            body: body.to_string(),
            updated_at: now_unix(),
            starred,
            images,
        };
        self.notes.insert(0, note.clone());
        tracing::debug!(note_id = %note.id, "created note");
        self.persist()?;
        Ok(note)
    }

    pub fn update(&mut self, id: NoteId, fields: NoteFields) -> Result<Note, StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let note = &mut self.notes[index];
        note.title = fields.title;
        note.body = fields.body;
        note.starred = fields.starred;
        note.images = fields.images;
        note.updated_at = now_unix();
        let updated = note.clone();
        tracing::debug!(note_id = %id, "updated note");
        self.persist()?;
        Ok(updated)
    }

    pub fn set_starred(&mut self, id: NoteId, starred: bool) -> Result<Note, StoreError> {
        let current = self.get(id).ok_or(StoreError::NotFound(id))?;
        let fields = NoteFields {
            starred,
            ..NoteFields::from(current)
        };
        self.update(id, fields)
    }

    pub fn delete(&mut self, id: NoteId) -> Result<(), StoreError> {
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        self.notes.remove(index);
        tracing::debug!(note_id = %id, "deleted note");
        self.persist()?;
        Ok(())
    }

    /// Removes every listed note that exists; unknown ids are ignored. The
    /// sequence is written once, even when nothing matched.
    pub fn delete_many<'a, I>(&mut self, ids: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a NoteId>,
    {
        let doomed: HashSet<NoteId> = ids.into_iter().copied().collect();
        let before = self.notes.len();
        self.notes.retain(|note| !doomed.contains(&note.id));
        let removed = before - self.notes.len();
        tracing::debug!(removed, requested = doomed.len(), "deleted notes in bulk");
        self.persist()?;
        Ok(removed)
    }

    /// Applies a drag reorder. Nothing is written when the order is unchanged.
    pub fn move_before(&mut self, dragged: NoteId, target: NoteId) -> Result<bool, StoreError> {
        if !reorder::apply_move(&mut self.notes, dragged, target) {
            return Ok(false);
        }
        tracing::debug!(%dragged, %target, "reordered notes");
        self.persist()?;
        Ok(true)
    }

    /// Retries the write after an earlier persistence failure.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.persist()
    }

    fn position(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        match self.repository.save(&self.notes) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.dirty = true;
                tracing::error!(?err, location = %self.repository.location(), "persisting notes failed");
                Err(StoreError::Persistence(err))
            }
        }
    }
}

fn dedupe_ids(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let mut unique = Vec::with_capacity(notes.len());
    for note in notes {
        if seen.insert(note.id) {
            unique.push(note);
        } else {
            tracing::warn!(note_id = %note.id, "dropping note with duplicate id");
        }
    }
    unique
}
