use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notes::{ImageRef, Note, NoteId, PersistenceError};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct DocumentOut<'a> {
    schema_version: u32,
    notes: &'a [Note],
}

#[derive(Deserialize)]
struct DocumentIn {
    schema_version: u32,
    notes: Vec<Note>,
}

/// Record layout written by the browser version: a bare array, `content`
/// instead of `body`, a display-only `date` string and an optional thumbnail.
#[derive(Deserialize)]
struct LegacyNote {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    starred: bool,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    images: Option<Vec<String>>,
}

impl LegacyNote {
    fn upgrade(self, loaded_at: i64) -> Note {
        let mut images: Vec<ImageRef> = self
            .images
            .unwrap_or_default()
            .into_iter()
            .map(ImageRef::new)
            .collect();
        if images.is_empty() {
            if let Some(thumbnail) = self.thumbnail.filter(|t| !t.is_empty()) {
                images.push(ImageRef::new(thumbnail));
            }
        }
        Note {
            id: NoteId(self.id),
            title: self.title,
            body: self.content,
            updated_at: loaded_at,
            starred: self.starred,
            images,
        }
    }
}

pub fn encode(notes: &[Note]) -> Result<String, PersistenceError> {
    serde_json::to_string(&DocumentOut {
        schema_version: SCHEMA_VERSION,
        notes,
    })
    .map_err(PersistenceError::Encode)
}

pub fn decode(raw: &str, loaded_at: i64) -> Result<Vec<Note>, PersistenceError> {
    let value: Value = serde_json::from_str(raw).map_err(PersistenceError::Decode)?;
    if value.is_array() {
        let legacy: Vec<LegacyNote> =
            serde_json::from_value(value).map_err(PersistenceError::Decode)?;
        tracing::info!(count = legacy.len(), "upgrading legacy note list");
        return Ok(legacy
            .into_iter()
            .map(|note| note.upgrade(loaded_at))
            .collect());
    }

    let found = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if found > u64::from(SCHEMA_VERSION) {
        return Err(PersistenceError::UnsupportedVersion {
            found: u32::try_from(found).unwrap_or(u32::MAX),
            supported: SCHEMA_VERSION,
        });
    }
    let document: DocumentIn = serde_json::from_value(value).map_err(PersistenceError::Decode)?;
    tracing::debug!(schema_version = document.schema_version, "decoded note document");
    Ok(document.notes)
}
