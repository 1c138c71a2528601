pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod media;
pub mod notes;
pub mod search;
pub mod storage;
pub mod ui;

pub use app::{Board, Intent, Outcome};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use notes::{Note, NoteId, NoteStore, SelectionSet};
