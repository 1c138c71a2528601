use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl NoteId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NoteId {
    fn from(value: i64) -> Self {
        NoteId(value)
    }
}

/// Opaque reference to an image attached to a note. The store only keeps and
/// orders these; producing and resolving them is the image loader's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        ImageRef(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub body: String,
    /// Unix seconds of the last save (creation counts as a save).
    pub updated_at: i64,
    pub starred: bool,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

impl Note {
    pub fn display_title<'a>(&'a self, untitled: &'a str) -> &'a str {
        if self.title.trim().is_empty() {
            untitled
        } else {
            &self.title
        }
    }

    pub fn thumbnail(&self) -> Option<&ImageRef> {
        self.images.first()
    }
}

/// Replacement field values for an in-place update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub body: String,
    pub starred: bool,
    pub images: Vec<ImageRef>,
}

impl From<&Note> for NoteFields {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            body: note.body.clone(),
            starred: note.starred,
            images: note.images.clone(),
        }
    }
}

/// Hands out ids derived from the wall clock in milliseconds, bumped forward
/// whenever the clock would repeat or go backwards.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last_issued: i64,
}

impl IdAllocator {
    pub fn starting_after<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a NoteId>,
    {
        let last_issued = existing.into_iter().map(|id| id.0).max().unwrap_or(0);
        Self { last_issued }
    }

    pub fn next_id(&mut self) -> NoteId {
        let now_ms = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        self.issue_at(now_ms)
    }

    fn issue_at(&mut self, now_ms: i64) -> NoteId {
        let id = now_ms.max(self.last_issued + 1);
        self.last_issued = id;
        NoteId(id)
    }
}

pub(crate) fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
