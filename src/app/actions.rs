use strum::IntoStaticStr;

use crate::notes::{ImageRef, Note, NoteId};

/// Everything a front end can ask the board to do.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Intent {
    Create {
        title: String,
        body: String,
        starred: bool,
        images: Vec<ImageRef>,
    },
    Update {
        id: NoteId,
        title: String,
        body: String,
        starred: bool,
        images: Vec<ImageRef>,
    },
    Delete {
        id: NoteId,
    },
    SetStarred {
        id: NoteId,
        starred: bool,
    },
    Search {
        query: String,
    },
    ClearSearch,
    BeginSelection {
        id: NoteId,
    },
    CancelSelection,
    Tap {
        id: NoteId,
    },
    ToggleSelection {
        id: NoteId,
    },
    SelectAll,
    DeleteSelected,
    Reorder {
        dragged: NoteId,
        target: NoteId,
    },
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to re-render.
    Unchanged,
    /// The visible list or mode changed.
    Changed,
    Created(Note),
    Updated(Note),
    /// A browsing tap: the front end should open this note for editing.
    Open(NoteId),
    Deleted { removed: usize },
}

impl Outcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::Unchanged | Outcome::Open(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_kinds_are_kebab_case() {
        assert_eq!(Intent::SelectAll.kind(), "select-all");
        assert_eq!(
            Intent::Reorder {
                dragged: NoteId(1),
                target: NoteId(2)
            }
            .kind(),
            "reorder"
        );
    }
}
