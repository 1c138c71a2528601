use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::draft::{DraftField, TextField};
use crate::app::state::{AppState, EditorOverlay, NoteCard, OverlayState};
use crate::config::themes::Palette;
use crate::highlight::{build_highlight_regex, split_matches};

/// Rows one card occupies: header, preview lines, separator.
pub fn card_height(preview_lines: usize) -> u16 {
    (preview_lines.max(1) + 2) as u16
}

/// Draws the board and returns the inner area of the card list, which the
/// mouse handler needs for hit testing.
pub fn draw_app(
    frame: &mut Frame,
    state: &AppState,
    list_state: &mut ListState,
    palette: &Palette,
    preview_lines: usize,
) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    frame.render_widget(Paragraph::new(build_header(state, palette)), vertical[0]);
    render_search(frame, state, palette, vertical[1]);

    let regex = build_highlight_regex(state.search.input.as_str());
    let preview_lines = preview_lines.max(1);
    let mut items: Vec<ListItem> = state
        .cards()
        .iter()
        .map(|card| ListItem::new(card_lines(card, regex.as_ref(), palette, preview_lines)))
        .collect();
    if items.is_empty() {
        let message = if state.total == 0 {
            "No memos yet. Press `n` to write one."
        } else {
            "No memos match the search."
        };
        items.push(ListItem::new(Span::styled(
            message,
            Style::default().fg(palette.muted),
        )));
    }

    let block = Block::default()
        .title(if state.editing { "Select" } else { "Memos" })
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner = block.inner(vertical[2]);
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .fg(palette.selection_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, vertical[2], list_state);

    frame.render_widget(Paragraph::new(build_status_line(state, palette)), vertical[3]);

    render_overlay(frame, state, palette);
    inner
}

fn build_header(state: &AppState, palette: &Palette) -> Line<'static> {
    if state.editing {
        return Line::from(vec![
            Span::styled(
                format!("{} selected", state.selected_count),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  Space toggle • a all • d delete • Esc done",
                Style::default().fg(palette.muted),
            ),
        ]);
    }
    Line::from(vec![
        Span::styled("Memos", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  {} notes", state.total),
            Style::default().fg(palette.muted),
        ),
    ])
}

fn render_search(frame: &mut Frame, state: &AppState, palette: &Palette, area: Rect) {
    let query = state.search.input.as_str();
    let text = if query.is_empty() && !state.search.active {
        Span::styled("Press / to search", Style::default().fg(palette.muted))
    } else {
        Span::raw(query.to_string())
    };
    let border = if state.search.active {
        palette.accent
    } else {
        palette.muted
    };
    let search = Paragraph::new(Line::from(text)).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(search, area);
    if state.search.active && state.overlay().is_none() {
        let (_, col) = cursor_offset(&state.search.input);
        frame.set_cursor(area.x + 1 + col, area.y + 1);
    }
}

fn card_lines(
    card: &NoteCard,
    regex: Option<&Regex>,
    palette: &Palette,
    preview_lines: usize,
) -> Vec<Line<'static>> {
    let highlight = Style::default()
        .fg(palette.highlight)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let mut header = Vec::new();
    if card.drop_target {
        header.push(Span::styled("→ ", Style::default().fg(palette.accent)));
    }
    if let Some(checked) = card.checkbox {
        let mark = if checked { "[x] " } else { "[ ] " };
        header.push(Span::styled(mark, Style::default().fg(palette.accent)));
    }
    if card.starred {
        header.push(Span::styled(
            "★ ",
            Style::default()
                .fg(palette.star)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let mut title_style = Style::default().add_modifier(Modifier::BOLD);
    if card.dragging {
        title_style = title_style.add_modifier(Modifier::DIM | Modifier::ITALIC);
    }
    header.extend(styled_runs(&card.title, regex, title_style, highlight));
    header.push(Span::styled(
        format!("  {}", card.date),
        Style::default().fg(palette.muted),
    ));
    if card.image_count > 0 {
        header.push(Span::styled(
            format!("  [{} img]", card.image_count),
            Style::default().fg(palette.muted),
        ));
    }

    let mut lines = Vec::with_capacity(preview_lines + 2);
    lines.push(Line::from(header));
    for index in 0..preview_lines {
        let line = match card.preview.get(index) {
            Some(text) if card.placeholder => Line::from(Span::styled(
                text.clone(),
                Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::ITALIC),
            )),
            Some(text) => Line::from(styled_runs(text, regex, Style::default(), highlight)),
            None => Line::from(""),
        };
        lines.push(line);
    }
    lines.push(Line::from(""));
    lines
}

fn styled_runs(
    text: &str,
    regex: Option<&Regex>,
    base: Style,
    highlight: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|(run, matched)| Span::styled(run.to_string(), if matched { highlight } else { base }))
        .collect()
}

fn build_status_line(state: &AppState, palette: &Palette) -> Line<'static> {
    if let Some(message) = state.status_message() {
        return Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(palette.accent),
        ));
    }
    let hint = if state.editing {
        "Space toggle • a all • d delete • drag to reorder • Esc done"
    } else {
        "n new • Enter open • s star • v select • J/K move • / search • q quit"
    };
    Line::from(Span::styled(hint, Style::default().fg(palette.muted)))
}

/// Row and display column of the cursor inside a text field.
fn cursor_offset(field: &TextField) -> (u16, u16) {
    let mut row = 0u16;
    let mut col = 0usize;
    for grapheme in field.as_str().graphemes(true).take(field.cursor()) {
        if grapheme == "\n" {
            row += 1;
            col = 0;
        } else {
            col += UnicodeWidthStr::width(grapheme);
        }
    }
    (row, col as u16)
}

fn render_overlay(frame: &mut Frame, state: &AppState, palette: &Palette) {
    match state.overlay() {
        Some(OverlayState::Editor(editor)) => render_editor(frame, editor, palette),
        Some(OverlayState::ConfirmDelete(confirm)) => {
            render_confirm(
                frame,
                palette,
                "Delete memo",
                format!("Delete \"{}\"? This cannot be undone.", confirm.title),
            );
        }
        Some(OverlayState::ConfirmBulkDelete(confirm)) => {
            render_confirm(
                frame,
                palette,
                "Delete selected",
                format!("Delete {} selected memo(s)? This cannot be undone.", confirm.count),
            );
        }
        None => {}
    }
}

fn render_confirm(frame: &mut Frame, palette: &Palette, title: &str, message: String) {
    let area = centered_rect(60, 25, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            message,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter/y to delete • Esc/n to cancel",
            Style::default().fg(palette.muted),
        )),
    ])
    .block(
        Block::default()
            .title(title.to_string())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.danger)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_editor(frame: &mut Frame, editor: &EditorOverlay, palette: &Palette) {
    let area = centered_rect(80, 80, frame.size());
    frame.render_widget(Clear, area);
    let draft = &editor.draft;
    let title = if draft.editing.is_some() {
        "Edit memo"
    } else {
        "New memo"
    };
    let outer = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let field_style = |field: DraftField| {
        if draft.focus == field {
            Style::default().fg(palette.accent)
        } else {
            Style::default().fg(palette.muted)
        }
    };

    let star = if draft.starred { "★ starred" } else { "☆" };
    let title_block = Block::default()
        .title(Line::from(vec![
            Span::raw("Title "),
            Span::styled(star, Style::default().fg(palette.star)),
        ]))
        .borders(Borders::ALL)
        .border_style(field_style(DraftField::Title));
    frame.render_widget(
        Paragraph::new(draft.title.as_str().to_string()).block(title_block),
        rows[0],
    );

    let body_block = Block::default()
        .title("Body")
        .borders(Borders::ALL)
        .border_style(field_style(DraftField::Body));
    frame.render_widget(
        Paragraph::new(Text::raw(draft.body.as_str().to_string())).block(body_block),
        rows[1],
    );

    let mut image_spans = Vec::new();
    if let Some(path) = &editor.image_path {
        image_spans.push(Span::styled("Path: ", Style::default().fg(palette.accent)));
        image_spans.push(Span::raw(path.as_str().to_string()));
    } else if draft.images.is_empty() {
        image_spans.push(Span::styled(
            "No images",
            Style::default().fg(palette.muted),
        ));
    } else {
        for (index, image) in draft.images.iter().enumerate() {
            let name = std::path::Path::new(image.as_str())
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.as_str().to_string());
            image_spans.push(Span::raw(format!("{}:{name}  ", index + 1)));
        }
    }
    if editor.pending_images > 0 {
        image_spans.push(Span::styled(
            format!(" (loading {})", editor.pending_images),
            Style::default().fg(palette.muted),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(image_spans)).block(
            Block::default()
                .title("Images")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted)),
        ),
        rows[2],
    );

    let mut help = String::from("Tab field • Ctrl-s save • Ctrl-t star • Ctrl-o image • Ctrl-x drop image");
    if draft.editing.is_some() {
        help.push_str(" • Ctrl-d delete");
    }
    help.push_str(" • Esc close");
    frame.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(palette.muted))),
        rows[3],
    );

    let (target, field) = match (&editor.image_path, draft.focus) {
        (Some(path), _) => (rows[2], path),
        (None, DraftField::Title) => (rows[0], &draft.title),
        (None, DraftField::Body) => (rows[1], &draft.body),
    };
    let (row, col) = cursor_offset(field);
    let prefix = if editor.image_path.is_some() { 6 } else { 0 };
    let x = (target.x + 1 + prefix + col).min(target.right().saturating_sub(2));
    let y = (target.y + 1 + row).min(target.bottom().saturating_sub(2));
    frame.set_cursor(x, y);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::themes::ThemeRegistry;
    use crate::config::ThemeName;
    use crate::notes::NoteId;

    fn card() -> NoteCard {
        NoteCard {
            id: NoteId(1),
            title: "Weekly plan".into(),
            date: "Today".into(),
            starred: true,
            image_count: 2,
            preview: vec!["plan the week".into()],
            placeholder: false,
            checkbox: Some(true),
            dragging: false,
            drop_target: false,
        }
    }

    fn flatten(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn card_is_padded_to_fixed_height() {
        let palette = ThemeRegistry::default().palette(&ThemeName::Dark);
        let lines = card_lines(&card(), None, &palette, 3);
        assert_eq!(lines.len(), card_height(3) as usize);
        assert_eq!(flatten(&lines[0]), "[x] ★ Weekly plan  Today  [2 img]");
        assert_eq!(flatten(&lines[1]), "plan the week");
    }

    #[test]
    fn query_matches_are_split_into_spans() {
        let palette = ThemeRegistry::default().palette(&ThemeName::Dark);
        let regex = build_highlight_regex("plan");
        let lines = card_lines(&card(), regex.as_ref(), &palette, 1);
        let preview: Vec<_> = lines[1]
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(preview, vec!["plan", " the week"]);
    }

    #[test]
    fn cursor_offset_counts_wide_graphemes() {
        let mut field = TextField::with_text("ab\n日本");
        assert_eq!(cursor_offset(&field), (1, 4));
        field.home();
        field.right();
        assert_eq!(cursor_offset(&field), (0, 1));
    }
}
