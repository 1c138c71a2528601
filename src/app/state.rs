use time::OffsetDateTime;

use crate::app::board::Board;
use crate::app::dates::date_label;
use crate::app::draft::{NoteDraft, TextField};
use crate::config::DisplayOptions;
use crate::notes::{Note, NoteId};

/// One rendered row of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCard {
    pub id: NoteId,
    pub title: String,
    pub date: String,
    pub starred: bool,
    pub image_count: usize,
    pub preview: Vec<String>,
    /// The preview is the empty-body label rather than note text.
    pub placeholder: bool,
    /// `Some(checked)` while bulk editing.
    pub checkbox: Option<bool>,
    pub dragging: bool,
    pub drop_target: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub active: bool,
    pub input: TextField,
}

#[derive(Debug, Clone)]
pub struct EditorOverlay {
    pub draft: NoteDraft,
    /// Open while the user types an image path.
    pub image_path: Option<TextField>,
    pub pending_images: usize,
}

#[derive(Debug, Clone)]
pub struct ConfirmDeleteOverlay {
    pub note_id: NoteId,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmBulkDeleteOverlay {
    pub count: usize,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Editor(EditorOverlay),
    ConfirmDelete(ConfirmDeleteOverlay),
    ConfirmBulkDelete(ConfirmBulkDeleteOverlay),
}

/// Presentation state derived from the board plus the UI-only bits
/// (highlight, overlays, search input, status line).
#[derive(Debug, Clone, Default)]
pub struct AppState {
    cards: Vec<NoteCard>,
    pub highlighted: usize,
    pub total: usize,
    pub editing: bool,
    pub selected_count: usize,
    pub search: SearchState,
    overlay: Option<OverlayState>,
    status_message: Option<String>,
    next_token: u64,
}

impl AppState {
    pub fn rebuild(
        &mut self,
        board: &Board,
        display: &DisplayOptions,
        preview_lines: usize,
        drag: Option<(NoteId, Option<NoteId>)>,
        now: OffsetDateTime,
    ) {
        let keep = self.highlighted_id();
        self.cards = board
            .visible()
            .into_iter()
            .map(|note| {
                let mut card = card_for(note, display, preview_lines, now);
                if board.is_editing() {
                    card.checkbox = Some(board.is_selected(note.id));
                }
                if let Some((dragged, over)) = drag {
                    card.dragging = dragged == note.id;
                    card.drop_target = over == Some(note.id) && dragged != note.id;
                }
                card
            })
            .collect();
        self.total = board.store().len();
        self.editing = board.is_editing();
        self.selected_count = board.selection().map(|s| s.len()).unwrap_or(0);
        match keep {
            Some(id) => self.highlight_id(id),
            None => self.clamp_highlight(),
        }
    }

    pub fn cards(&self) -> &[NoteCard] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn highlighted_card(&self) -> Option<&NoteCard> {
        self.cards.get(self.highlighted)
    }

    pub fn highlighted_id(&self) -> Option<NoteId> {
        self.highlighted_card().map(|card| card.id)
    }

    pub fn card_at(&self, index: usize) -> Option<&NoteCard> {
        self.cards.get(index)
    }

    /// The visible neighbour `delta` rows away from the highlighted card.
    pub fn neighbour_id(&self, delta: isize) -> Option<NoteId> {
        let index = self.highlighted.checked_add_signed(delta)?;
        self.cards.get(index).map(|card| card.id)
    }

    pub fn highlight_id(&mut self, id: NoteId) {
        if let Some(index) = self.cards.iter().position(|card| card.id == id) {
            self.highlighted = index;
        } else {
            self.clamp_highlight();
        }
    }

    pub fn move_highlight(&mut self, delta: isize) {
        if self.cards.is_empty() {
            return;
        }
        let last = self.cards.len() - 1;
        self.highlighted = self
            .highlighted
            .checked_add_signed(delta)
            .unwrap_or(0)
            .min(last);
    }

    fn clamp_highlight(&mut self) {
        self.highlighted = self.highlighted.min(self.cards.len().saturating_sub(1));
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) -> Option<OverlayState> {
        self.overlay.take()
    }

    pub fn open_new_note(&mut self) {
        let token = self.issue_token();
        self.overlay = Some(OverlayState::Editor(EditorOverlay {
            draft: NoteDraft::blank(token),
            image_path: None,
            pending_images: 0,
        }));
    }

    pub fn open_note(&mut self, note: &Note) {
        let token = self.issue_token();
        self.overlay = Some(OverlayState::Editor(EditorOverlay {
            draft: NoteDraft::from_note(note, token),
            image_path: None,
            pending_images: 0,
        }));
    }

    pub fn open_confirm_delete(&mut self, note_id: NoteId, title: String) {
        self.overlay = Some(OverlayState::ConfirmDelete(ConfirmDeleteOverlay {
            note_id,
            title,
        }));
    }

    pub fn open_confirm_bulk_delete(&mut self, count: usize) {
        self.overlay = Some(OverlayState::ConfirmBulkDelete(ConfirmBulkDeleteOverlay {
            count,
        }));
    }

    pub fn editor(&self) -> Option<&EditorOverlay> {
        match &self.overlay {
            Some(OverlayState::Editor(editor)) => Some(editor),
            _ => None,
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorOverlay> {
        match &mut self.overlay {
            Some(OverlayState::Editor(editor)) => Some(editor),
            _ => None,
        }
    }

    /// Token of the open draft, used to discard image loads for closed ones.
    pub fn draft_token(&self) -> Option<u64> {
        self.editor().map(|editor| editor.draft.token())
    }

    fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

fn card_for(
    note: &Note,
    display: &DisplayOptions,
    preview_lines: usize,
    now: OffsetDateTime,
) -> NoteCard {
    let body = note.body.trim();
    let (preview, placeholder) = if body.is_empty() {
        (vec![display.empty_body_label.clone()], true)
    } else {
        (
            body.lines()
                .filter(|line| !line.trim().is_empty())
                .take(preview_lines.max(1))
                .map(str::to_string)
                .collect(),
            false,
        )
    };
    NoteCard {
        id: note.id,
        title: note.display_title(&display.untitled_label).to_string(),
        date: date_label(note.updated_at, now),
        starred: note.starred,
        image_count: note.images.len(),
        preview,
        placeholder,
        checkbox: None,
        dragging: false,
        drop_target: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::actions::Intent;
    use crate::notes::{ImageRef, NoteStore};
    use crate::storage::MemoryRepository;
    use time::macros::datetime;

    fn note(id: i64, title: &str, body: &str) -> Note {
        Note {
            id: NoteId(id),
            title: title.to_string(),
            body: body.to_string(),
            updated_at: datetime!(2024-10-30 09:00 UTC).unix_timestamp(),
            starred: id == 2,
            images: if id == 3 {
                vec![ImageRef::new("/tmp/x.png")]
            } else {
                Vec::new()
            },
        }
    }

    fn board() -> Board {
        let store = NoteStore::with_notes(
            vec![
                note(1, "Shopping", "milk\n\neggs\nbread"),
                note(2, "", "just a body"),
                note(3, "Photo", ""),
            ],
            Box::new(MemoryRepository::new()),
        );
        Board::new(store)
    }

    fn rebuild(state: &mut AppState, board: &Board) {
        state.rebuild(
            board,
            &DisplayOptions::default(),
            2,
            None,
            datetime!(2024-10-30 18:00 UTC),
        );
    }

    #[test]
    fn cards_carry_labels_and_previews() {
        let board = board();
        let mut state = AppState::default();
        rebuild(&mut state, &board);

        let cards = state.cards();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].preview, vec!["milk", "eggs"]);
        assert_eq!(cards[0].date, "Today");
        assert_eq!(cards[1].title, "Untitled");
        assert!(cards[1].starred);
        assert!(cards[2].placeholder);
        assert_eq!(cards[2].preview, vec!["No content"]);
        assert_eq!(cards[2].image_count, 1);
        assert!(cards.iter().all(|card| card.checkbox.is_none()));
    }

    #[test]
    fn highlight_follows_note_across_filtering() -> anyhow::Result<()> {
        let mut board = board();
        let mut state = AppState::default();
        rebuild(&mut state, &board);
        state.move_highlight(2);
        assert_eq!(state.highlighted_id(), Some(NoteId(3)));

        board.dispatch(Intent::Search {
            query: "photo".into(),
        })?;
        rebuild(&mut state, &board);
        assert_eq!(state.highlighted, 0);
        assert_eq!(state.highlighted_id(), Some(NoteId(3)));
        Ok(())
    }

    #[test]
    fn editing_cards_show_checkboxes() -> anyhow::Result<()> {
        let mut board = board();
        board.dispatch(Intent::BeginSelection { id: NoteId(2) })?;
        let mut state = AppState::default();
        rebuild(&mut state, &board);
        let checks: Vec<_> = state.cards().iter().map(|card| card.checkbox).collect();
        assert_eq!(checks, vec![Some(false), Some(true), Some(false)]);
        assert_eq!(state.selected_count, 1);
        assert!(state.editing);
        Ok(())
    }

    #[test]
    fn move_highlight_clamps() {
        let board = board();
        let mut state = AppState::default();
        rebuild(&mut state, &board);
        state.move_highlight(-5);
        assert_eq!(state.highlighted, 0);
        state.move_highlight(10);
        assert_eq!(state.highlighted, 2);
        assert_eq!(state.neighbour_id(1), None);
        assert_eq!(state.neighbour_id(-1), Some(NoteId(2)));
    }

    #[test]
    fn every_editor_session_gets_a_fresh_token() {
        let mut state = AppState::default();
        state.open_new_note();
        let first = state.draft_token();
        state.close_overlay();
        assert_eq!(state.draft_token(), None);
        state.open_new_note();
        assert_ne!(state.draft_token(), first);
    }
}
