use unicode_segmentation::UnicodeSegmentation;

use crate::app::actions::Intent;
use crate::notes::{ImageRef, Note, NoteId};

/// Single-line or multi-line text buffer with a grapheme-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    text: String,
    cursor: usize,
}

impl TextField {
    pub fn with_text(text: &str) -> Self {
        let cursor = text.graphemes(true).count();
        Self {
            text: text.to_string(),
            cursor,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Cursor position in graphemes.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_offset(&self, grapheme: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme)
            .map(|(offset, _)| offset)
            .unwrap_or(self.text.len())
    }

    pub fn insert(&mut self, ch: char) {
        let before = self.text.graphemes(true).count();
        let at = self.byte_offset(self.cursor);
        self.text.insert(at, ch);
        // A combining mark joins the previous grapheme instead of adding one.
        if self.text.graphemes(true).count() > before {
            self.cursor += 1;
        }
    }

    pub fn insert_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.insert(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_offset(self.cursor - 1);
        let end = self.byte_offset(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        if start < end {
            self.text.replace_range(start..end, "");
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        let len = self.text.graphemes(true).count();
        self.cursor = (self.cursor + 1).min(len);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.graphemes(true).count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Body,
}

/// An open edit session for one note, new or existing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub editing: Option<NoteId>,
    pub title: TextField,
    pub body: TextField,
    pub starred: bool,
    pub images: Vec<ImageRef>,
    pub focus: DraftField,
    token: u64,
}

impl NoteDraft {
    pub fn blank(token: u64) -> Self {
        Self {
            editing: None,
            title: TextField::default(),
            body: TextField::default(),
            starred: false,
            images: Vec::new(),
            focus: DraftField::Title,
            token,
        }
    }

    pub fn from_note(note: &Note, token: u64) -> Self {
        Self {
            editing: Some(note.id),
            title: TextField::with_text(&note.title),
            body: TextField::with_text(&note.body),
            starred: note.starred,
            images: note.images.clone(),
            focus: DraftField::Body,
            token,
        }
    }

    /// Identifies this session to the image loader.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            DraftField::Title => &mut self.title,
            DraftField::Body => &mut self.body,
        }
    }

    pub fn switch_field(&mut self) {
        self.focus = match self.focus {
            DraftField::Title => DraftField::Body,
            DraftField::Body => DraftField::Title,
        };
    }

    pub fn toggle_star(&mut self) {
        self.starred = !self.starred;
    }

    pub fn add_image(&mut self, image: ImageRef) {
        self.images.push(image);
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageRef> {
        (index < self.images.len()).then(|| self.images.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_blank() && self.body.is_blank() && self.images.is_empty()
    }

    /// The intent that saves this draft, or `None` when there is nothing to
    /// keep. An emptied existing note is discarded too, not deleted.
    pub fn finish(self) -> Option<Intent> {
        if self.is_empty() {
            return None;
        }
        let title = self.title.as_str().trim().to_string();
        let body = self.body.as_str().trim().to_string();
        Some(match self.editing {
            Some(id) => Intent::Update {
                id,
                title,
                body,
                starred: self.starred,
                images: self.images,
            },
            None => Intent::Create {
                title,
                body,
                starred: self.starred,
                images: self.images,
            },
        })
    }
}
