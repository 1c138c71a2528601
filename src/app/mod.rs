use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use time::UtcOffset;

use crate::config::themes::{Palette, ThemeRegistry};
use crate::config::AppConfig;
use crate::media::ImageLoader;
use crate::notes::{NoteId, StoreError};
use crate::ui;

pub mod actions;
pub mod board;
pub mod dates;
pub mod draft;
pub mod gesture;
pub mod state;

pub use actions::{Intent, Outcome};
pub use board::{Board, BoardMode};
pub use gesture::{Gesture, GestureTracker, Modality, Position};
pub use state::{AppState, NoteCard, OverlayState};

use draft::{DraftField, TextField};

enum Action {
    Quit,
    HighlightNext,
    HighlightPrevious,
    Open,
    NewNote,
    StartSearch,
    ToggleSelectionMode,
    ToggleSelection,
    SelectAll,
    Delete,
    ToggleStar,
    MoveDown,
    MoveUp,
    Cancel,
    Flush,
}

pub struct App {
    pub config: Arc<AppConfig>,
    board: Board,
    state: AppState,
    list_state: ListState,
    gestures: GestureTracker,
    images: ImageLoader,
    palette: Palette,
    offset: UtcOffset,
    list_area: Rect,
    should_quit: bool,
    quit_armed: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, board: Board) -> Self {
        let palette = ThemeRegistry::default().palette(&config.theme);
        let gestures = GestureTracker::new(&config.gestures);
        let mut app = Self {
            config,
            board,
            state: AppState::default(),
            list_state: ListState::default(),
            gestures,
            images: ImageLoader::new(),
            palette,
            offset: dates::local_offset(),
            list_area: Rect::default(),
            should_quit: false,
            quit_armed: false,
            tick_rate: Duration::from_millis(100),
        };
        app.refresh();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let preview_lines = self.config.preview_lines as usize;
            terminal
                .draw(|frame| {
                    if self.state.is_empty() {
                        self.list_state.select(None);
                    } else {
                        self.list_state.select(Some(self.state.highlighted));
                    }
                    self.list_area = ui::draw_app(
                        frame,
                        &self.state,
                        &mut self.list_state,
                        &self.palette,
                        preview_lines,
                    );
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::FocusLost => {
                        if let Some(gesture) = self.gestures.cancel() {
                            self.handle_gesture(gesture);
                        }
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn refresh(&mut self) {
        let drag = self.gestures.drag();
        self.state.rebuild(
            &self.board,
            &self.config.display,
            self.config.preview_lines as usize,
            drag,
            dates::now_in(self.offset),
        );
    }

    /// Runs an intent through the board and reports failures on the status
    /// line. Memory is updated even when the write fails.
    fn apply(&mut self, intent: Intent) -> Option<Outcome> {
        let result = self.board.dispatch(intent);
        self.refresh();
        match result {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                self.report_store_error(&err);
                None
            }
        }
    }

    fn report_store_error(&mut self, err: &StoreError) {
        match err {
            StoreError::NotFound(id) => {
                tracing::warn!(note_id = %id, "note no longer exists");
                self.state
                    .set_status_message(Some("That memo no longer exists"));
            }
            StoreError::Persistence(source) => {
                tracing::error!(error = %source, "failed to persist notes");
                self.state.set_status_message(Some(format!(
                    "Not saved: {source}. Ctrl-s retries."
                )));
            }
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(gesture) = self.gestures.tick(now) {
            self.handle_gesture(gesture);
        }
        let loaded = self.images.drain(self.state.draft_token());
        for completion in loaded {
            let Some(editor) = self.state.editor_mut() else {
                break;
            };
            editor.pending_images = editor.pending_images.saturating_sub(1);
            match completion.result {
                Ok(image) => {
                    editor.draft.add_image(image);
                    self.state.set_status_message(Some("Image added"));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "image rejected");
                    self.state.set_status_message(Some(err.to_string()));
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_action(Action::Quit);
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.search.active {
            self.handle_search_key(key);
            return;
        }

        let plain = is_plain(&key);
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::HighlightNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::HighlightPrevious),
            KeyCode::Enter => Some(Action::Open),
            KeyCode::Char('n') if plain => Some(Action::NewNote),
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('v') if plain => Some(Action::ToggleSelectionMode),
            KeyCode::Char(' ') if plain => Some(Action::ToggleSelection),
            KeyCode::Char('a') if plain => Some(Action::SelectAll),
            KeyCode::Char('d') | KeyCode::Delete if plain => Some(Action::Delete),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Flush)
            }
            KeyCode::Char('s') if plain => Some(Action::ToggleStar),
            KeyCode::Char('J') => Some(Action::MoveDown),
            KeyCode::Char('K') => Some(Action::MoveUp),
            KeyCode::Esc => Some(Action::Cancel),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        if !matches!(action, Action::Quit) {
            self.quit_armed = false;
        }
        match action {
            Action::Quit => self.quit(),
            Action::HighlightNext => self.state.move_highlight(1),
            Action::HighlightPrevious => self.state.move_highlight(-1),
            Action::Open => {
                if let Some(id) = self.state.highlighted_id() {
                    self.activate(id);
                }
            }
            Action::NewNote => {
                if self.board.is_editing() {
                    self.state
                        .set_status_message(Some("Finish selecting first (Esc)"));
                } else {
                    self.state.open_new_note();
                    self.state.set_status_message(None::<String>);
                }
            }
            Action::StartSearch => {
                self.state.search.active = true;
            }
            Action::ToggleSelectionMode => {
                if self.board.is_editing() {
                    self.apply(Intent::CancelSelection);
                } else if let Some(id) = self.state.highlighted_id() {
                    self.begin_selection(id);
                }
            }
            Action::ToggleSelection => {
                if let Some(id) = self.state.highlighted_id() {
                    self.apply(Intent::ToggleSelection { id });
                }
            }
            Action::SelectAll => {
                self.apply(Intent::SelectAll);
            }
            Action::Delete => self.request_delete(),
            Action::ToggleStar => {
                let Some(card) = self.state.highlighted_card() else {
                    return;
                };
                let (id, starred) = (card.id, !card.starred);
                if self.apply(Intent::SetStarred { id, starred }).is_some() {
                    let message = if starred { "Starred" } else { "Unstarred" };
                    self.state.set_status_message(Some(message));
                }
            }
            Action::MoveDown => self.move_highlighted(1),
            Action::MoveUp => self.move_highlighted(-1),
            Action::Cancel => {
                if self.board.is_editing() {
                    self.apply(Intent::CancelSelection);
                } else if !self.board.query().is_empty() {
                    self.state.search.input.clear();
                    self.apply(Intent::ClearSearch);
                }
                self.state.set_status_message(None::<String>);
            }
            Action::Flush => match self.board.flush() {
                Ok(()) => self.state.set_status_message(Some("Saved")),
                Err(err) => self.report_store_error(&err),
            },
        }
    }

    fn quit(&mut self) {
        if !self.board.store().is_dirty() || self.quit_armed {
            self.should_quit = true;
            return;
        }
        match self.board.flush() {
            Ok(()) => self.should_quit = true,
            Err(err) => {
                self.report_store_error(&err);
                self.quit_armed = true;
                self.state.set_status_message(Some(
                    "Unsaved changes could not be written. Press q again to quit anyway.",
                ));
            }
        }
    }

    fn activate(&mut self, id: NoteId) {
        if let Some(Outcome::Open(id)) = self.apply(Intent::Tap { id }) {
            if let Some(note) = self.board.note(id) {
                self.state.open_note(note);
            }
        }
    }

    fn begin_selection(&mut self, id: NoteId) {
        if let Some(outcome) = self.apply(Intent::BeginSelection { id }) {
            if outcome.is_change() {
                self.state.set_status_message(None::<String>);
            }
        }
    }

    fn request_delete(&mut self) {
        if self.board.is_editing() {
            let count = self.state.selected_count;
            if count == 0 {
                self.state.set_status_message(Some("Nothing selected"));
            } else {
                self.state.open_confirm_bulk_delete(count);
            }
            return;
        }
        if let Some(card) = self.state.highlighted_card() {
            let (id, title) = (card.id, card.title.clone());
            self.state.open_confirm_delete(id, title);
        }
    }

    fn move_highlighted(&mut self, delta: isize) {
        let (Some(dragged), Some(target)) =
            (self.state.highlighted_id(), self.state.neighbour_id(delta))
        else {
            return;
        };
        if let Some(Outcome::Changed) = self.apply(Intent::Reorder { dragged, target }) {
            self.state.highlight_id(dragged);
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let input = &mut self.state.search.input;
        match key.code {
            KeyCode::Esc => {
                input.clear();
                self.state.search.active = false;
                self.apply(Intent::ClearSearch);
                return;
            }
            KeyCode::Enter => {
                self.state.search.active = false;
                return;
            }
            KeyCode::Backspace => input.backspace(),
            KeyCode::Delete => input.delete(),
            KeyCode::Left => input.left(),
            KeyCode::Right => input.right(),
            KeyCode::Home => input.home(),
            KeyCode::End => input.end(),
            KeyCode::Char(ch) if is_plain(&key) => input.insert(ch),
            _ => return,
        }
        let query = self.state.search.input.as_str().to_string();
        self.apply(Intent::Search { query });
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::Editor(_)) => {
                self.handle_editor_key(key);
                true
            }
            Some(OverlayState::ConfirmDelete(confirm)) => {
                let id = confirm.note_id;
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') => {
                        self.state.close_overlay();
                        if self.apply(Intent::Delete { id }).is_some() {
                            self.state.set_status_message(Some("Memo deleted"));
                        }
                    }
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::ConfirmBulkDelete(_)) => {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') => {
                        self.state.close_overlay();
                        if let Some(Outcome::Deleted { removed }) =
                            self.apply(Intent::DeleteSelected)
                        {
                            self.state
                                .set_status_message(Some(format!("Deleted {removed} memo(s)")));
                        }
                    }
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let plain = is_plain(&key);
        let Some(editor) = self.state.editor_mut() else {
            return;
        };

        if let Some(path) = editor.image_path.as_mut() {
            match key.code {
                KeyCode::Esc => editor.image_path = None,
                KeyCode::Enter => {
                    let requested = path.as_str().trim().to_string();
                    editor.image_path = None;
                    if !requested.is_empty() {
                        editor.pending_images += 1;
                        let token = editor.draft.token();
                        self.images.request(token, requested);
                    }
                }
                KeyCode::Backspace => path.backspace(),
                KeyCode::Left => path.left(),
                KeyCode::Right => path.right(),
                KeyCode::Char(ch) if plain => path.insert(ch),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                self.state.close_overlay();
                self.state.set_status_message(Some("Closed without saving"));
            }
            KeyCode::Char('s') if ctrl => self.save_draft(),
            KeyCode::Char('t') if ctrl => editor.draft.toggle_star(),
            KeyCode::Char('o') if ctrl => editor.image_path = Some(TextField::default()),
            KeyCode::Char('x') if ctrl => {
                let last = editor.draft.images.len().checked_sub(1);
                if let Some(index) = last {
                    editor.draft.remove_image(index);
                }
            }
            KeyCode::Char('d') if ctrl => {
                if let Some(id) = editor.draft.editing {
                    let title = editor.draft.title.as_str().to_string();
                    self.state.open_confirm_delete(id, title);
                }
            }
            KeyCode::Tab | KeyCode::BackTab => editor.draft.switch_field(),
            KeyCode::Enter => match editor.draft.focus {
                DraftField::Title => editor.draft.switch_field(),
                DraftField::Body => editor.draft.body.insert('\n'),
            },
            KeyCode::Backspace => editor.draft.focused_mut().backspace(),
            KeyCode::Delete => editor.draft.focused_mut().delete(),
            KeyCode::Left => editor.draft.focused_mut().left(),
            KeyCode::Right => editor.draft.focused_mut().right(),
            KeyCode::Home => editor.draft.focused_mut().home(),
            KeyCode::End => editor.draft.focused_mut().end(),
            KeyCode::Char(ch) if plain => editor.draft.focused_mut().insert(ch),
            _ => {}
        }
    }

    fn save_draft(&mut self) {
        let Some(OverlayState::Editor(editor)) = self.state.close_overlay() else {
            return;
        };
        let Some(intent) = editor.draft.finish() else {
            self.state.set_status_message(Some("Empty memo discarded"));
            return;
        };
        match self.apply(intent) {
            Some(Outcome::Created(note)) => {
                self.state.highlight_id(note.id);
                self.state.set_status_message(Some("Memo created"));
            }
            Some(Outcome::Updated(note)) => {
                self.state.highlight_id(note.id);
                self.state.set_status_message(Some("Memo saved"));
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.state.overlay().is_some() {
            return;
        }
        let now = Instant::now();
        let position = Position::new(f32::from(mouse.column), f32::from(mouse.row));
        let hovered = self.card_at(mouse.column, mouse.row);
        let gesture = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = hovered {
                    self.state.highlight_id(id);
                    let editing = self.board.is_editing();
                    self.gestures
                        .press(Modality::Pointer, id, position, editing, now);
                }
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => self.gestures.motion(position, hovered, now),
            MouseEventKind::Up(MouseButton::Left) => self.gestures.release(hovered, now),
            MouseEventKind::ScrollDown => {
                self.state.move_highlight(1);
                None
            }
            MouseEventKind::ScrollUp => {
                self.state.move_highlight(-1);
                None
            }
            _ => None,
        };
        if let Some(gesture) = gesture {
            self.handle_gesture(gesture);
        }
    }

    fn card_at(&self, column: u16, row: u16) -> Option<NoteId> {
        let height = ui::card_height(self.config.preview_lines as usize);
        let index = card_index_at(self.list_area, self.list_state.offset(), height, column, row)?;
        self.state.card_at(index).map(|card| card.id)
    }

    fn handle_gesture(&mut self, gesture: Gesture) {
        tracing::trace!(?gesture, "gesture");
        match gesture {
            Gesture::LongPress(id) => self.begin_selection(id),
            Gesture::Tap(id) => self.activate(id),
            Gesture::Drop { dragged, target } => {
                self.apply(Intent::Reorder { dragged, target });
                self.state.highlight_id(dragged);
            }
            Gesture::DragStarted(_) | Gesture::DragOver { .. } | Gesture::Cancelled => {
                self.refresh()
            }
        }
    }
}

fn is_plain(key: &KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

/// Index of the card under a cell, given the list's inner area and scroll
/// offset. Cards all have the same height.
fn card_index_at(area: Rect, offset: usize, card_height: u16, column: u16, row: u16) -> Option<usize> {
    if card_height == 0
        || column < area.x
        || column >= area.right()
        || row < area.y
        || row >= area.bottom()
    {
        return None;
    }
    Some(offset + usize::from((row - area.y) / card_height))
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("creating terminal backend")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leaving alternate screen")?;
    terminal.show_cursor().context("showing cursor")?;
    Ok(())
}
