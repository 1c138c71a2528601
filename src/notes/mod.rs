mod error;
mod model;
pub mod reorder;
mod selection;
mod store;

pub use error::{PersistenceError, StoreError};
pub use model::{IdAllocator, ImageRef, Note, NoteFields, NoteId};
pub use reorder::{apply_move, move_before};
pub use selection::SelectionSet;
pub use store::NoteStore;
pub(crate) use model::now_unix;
