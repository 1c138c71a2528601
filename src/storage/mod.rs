use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{ConfigPaths, StorageBackend, StorageOptions};
use crate::notes::{ImageRef, Note, NoteId, PersistenceError};

pub mod document;
mod schema;

const DOCUMENT_TMP_EXTENSION: &str = "json.tmp";

/// Where the serialized note sequence lives. Backends only move an opaque
/// document around; encoding and schema upgrades happen in [`document`].
pub trait NoteRepository {
    fn location(&self) -> String;

    fn read_document(&mut self) -> Result<Option<String>, PersistenceError>;

    fn write_document(&mut self, document: &str) -> Result<(), PersistenceError>;

    fn load(&mut self) -> Result<Option<Vec<Note>>, PersistenceError> {
        match self.read_document()? {
            Some(raw) => document::decode(&raw, crate::notes::now_unix()).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, notes: &[Note]) -> Result<(), PersistenceError> {
        let raw = document::encode(notes)?;
        self.write_document(&raw)
    }
}

#[derive(Clone)]
pub struct SqliteRepository {
    db_path: Arc<PathBuf>,
    key: Arc<str>,
    options: Arc<StorageOptions>,
}

impl SqliteRepository {
    pub fn open(options: &StorageOptions) -> Result<Self> {
        let db_path = &options.database_path;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?;
        prepare_connection(&conn, options).context("configuring sqlite connection")?;
        schema::apply(&conn).context("applying schema migrations")?;
        Ok(Self {
            db_path: Arc::new(db_path.clone()),
            key: Arc::from(options.storage_key.as_str()),
            options: Arc::new(options.clone()),
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, PersistenceError> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }
}

impl NoteRepository for SqliteRepository {
    fn location(&self) -> String {
        format!("{}#{}", self.db_path.display(), self.key)
    }

    fn read_document(&mut self) -> Result<Option<String>, PersistenceError> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![&*self.key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_document(&mut self, document: &str) -> Result<(), PersistenceError> {
        let conn = self.connect()?;
        let now = crate::notes::now_unix();
        conn.execute(
            "INSERT INTO kv_store (key, value, written_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at",
            params![&*self.key, document, now],
        )?;
        Ok(())
    }
}

/// A single JSON file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NoteRepository for JsonFileRepository {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read_document(&mut self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistenceError::io(&self.path, err)),
        }
    }

    fn write_document(&mut self, document: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| PersistenceError::io(parent, err))?;
        }
        let tmp_path = self.path.with_extension(DOCUMENT_TMP_EXTENSION);
        fs::write(&tmp_path, document).map_err(|err| PersistenceError::io(&tmp_path, err))?;
        fs::rename(&tmp_path, &self.path).map_err(|err| PersistenceError::io(&self.path, err))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySlot {
    document: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-process repository. Clones share the same slot, so a test can keep a
/// handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    slot: Rc<RefCell<MemorySlot>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.slot.borrow_mut().fail_writes = fail;
    }

    pub fn write_count(&self) -> usize {
        self.slot.borrow().writes
    }

    pub fn document(&self) -> Option<String> {
        self.slot.borrow().document.clone()
    }

    pub fn stored_notes(&self) -> Result<Option<Vec<Note>>, PersistenceError> {
        match self.document() {
            Some(raw) => document::decode(&raw, 0).map(Some),
            None => Ok(None),
        }
    }
}

impl NoteRepository for MemoryRepository {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn read_document(&mut self) -> Result<Option<String>, PersistenceError> {
        Ok(self.slot.borrow().document.clone())
    }

    fn write_document(&mut self, document: &str) -> Result<(), PersistenceError> {
        let mut slot = self.slot.borrow_mut();
        if slot.fail_writes {
            return Err(PersistenceError::Rejected("storage quota exceeded".into()));
        }
        slot.document = Some(document.to_string());
        slot.writes += 1;
        Ok(())
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<Box<dyn NoteRepository>> {
    paths.ensure_directories()?;
    let repository: Box<dyn NoteRepository> = match storage.backend {
        StorageBackend::Sqlite => Box::new(SqliteRepository::open(storage)?),
        StorageBackend::JsonFile => Box::new(JsonFileRepository::new(storage.document_path.clone())),
    };
    tracing::debug!(location = %repository.location(), "storage ready");
    Ok(repository)
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    Ok(())
}

/// First-run content shown until the user changes something.
pub fn seed_notes(now: i64) -> Vec<Note> {
    let day = 86_400;
    let notes = [
        (
            1,
            "Autumn city walks",
            "Old town lanes, riverside parks and the hill temple: three routes worth a weekend.",
            now - day,
            false,
            Some("https://images.unsplash.com/photo-1508193638397-1c4234db14d9?w=120&h=120&fit=crop"),
        ),
        (
            2,
            "Test",
            "Long-press a note (or press v) to select several at once.",
            now - day,
            false,
            None,
        ),
        (
            3,
            "Call the landlord",
            "Ask about the heating and the spare key.",
            now - 4 * day,
            true,
            None,
        ),
        (4, "Keep it short", "Say less, mean more.", now - 4 * day, false, None),
        (
            5,
            "Shift at 8:30",
            "Morning shift starts at 8:30 all week.",
            now - 13 * day,
            true,
            None,
        ),
        (
            6,
            "Drag to reorder",
            "In selection mode, drag a note onto another to move it there.",
            now - 13 * day,
            false,
            None,
        ),
    ];
    notes
        .into_iter()
        .map(|(id, title, body, updated_at, starred, thumbnail)| Note {
            id: NoteId(id),
            title: title.to_string(),
            body: body.to_string(),
            updated_at,
            starred,
            images: thumbnail.map(ImageRef::new).into_iter().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::config::ConfigPaths;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            database_path: data_dir.join("memo.db"),
            document_path: data_dir.join("notes.json"),
        }
    }

    fn storage_options(paths: &ConfigPaths, backend: StorageBackend) -> StorageOptions {
        let mut options = StorageOptions::default();
        options.backend = backend;
        options.database_path = paths.database_path.clone();
        options.document_path = paths.document_path.clone();
        options
    }

    fn sample() -> Vec<Note> {
        seed_notes(1_700_000_000)
    }

    #[test]
    fn sqlite_round_trips_under_storage_key() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let options = storage_options(&paths, StorageBackend::Sqlite);
        let mut repo = init(&paths, &options)?;
        assert!(repo.load()?.is_none());

        repo.save(&sample())?;
        let mut reopened = init(&paths, &options)?;
        assert_eq!(reopened.load()?, Some(sample()));

        let mut other_key = options.clone();
        other_key.storage_key = "archive".into();
        let mut other = SqliteRepository::open(&other_key)?;
        assert!(other.load()?.is_none());
        Ok(())
    }

    #[test]
    fn sqlite_overwrites_whole_document() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let options = storage_options(&paths, StorageBackend::Sqlite);
        let mut repo = SqliteRepository::open(&options)?;
        repo.save(&sample())?;
        repo.save(&sample()[..2])?;
        assert_eq!(repo.load()?.map(|notes| notes.len()), Some(2));
        Ok(())
    }

    #[test]
    fn json_file_writes_atomically() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        let options = storage_options(&paths, StorageBackend::JsonFile);
        let mut repo = init(&paths, &options)?;
        assert!(repo.load()?.is_none());
        repo.save(&sample())?;
        assert!(paths.document_path.exists());
        assert!(!paths.document_path.with_extension("json.tmp").exists());
        assert_eq!(repo.load()?, Some(sample()));
        Ok(())
    }

    #[test]
    fn json_file_reads_browser_export() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.json");
        fs::write(
            &path,
            r#"[{"id": 3, "title": "Old", "content": "from the browser", "date": "Oct 20", "starred": true}]"#,
        )?;
        let mut repo = JsonFileRepository::new(path);
        let notes = repo.load()?.expect("notes present");
        assert_eq!(notes[0].id, NoteId(3));
        assert_eq!(notes[0].body, "from the browser");
        assert!(notes[0].starred);
        Ok(())
    }

    #[test]
    fn memory_repository_can_refuse_writes() {
        let repo = MemoryRepository::new();
        repo.fail_writes(true);
        let mut handle = repo.clone();
        assert!(handle.save(&sample()).is_err());
        assert_eq!(repo.write_count(), 0);
        assert!(repo.document().is_none());
    }

    #[test]
    fn seed_has_unique_ids_and_two_starred() {
        let seed = sample();
        let ids: HashSet<NoteId> = seed.iter().map(|note| note.id).collect();
        assert_eq!(seed.len(), 6);
        assert_eq!(ids.len(), seed.len());
        assert_eq!(seed.iter().filter(|note| note.starred).count(), 2);
        assert_eq!(seed[0].images.len(), 1);
    }
}
