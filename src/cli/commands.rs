use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::app::dates::date_label;
use crate::app::draft::NoteDraft;
use crate::app::{Board, Intent, Outcome};
use crate::config::DisplayOptions;
use crate::media;
use crate::notes::{Note, NoteId};

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only list memos whose title or body contains this text
    #[arg()]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Memo identifier
    pub id: i64,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Title for the memo (prompted if omitted and nothing else is given)
    #[arg()]
    pub title: Option<String>,
    /// Provide the body inline. If omitted, reads from stdin when piped.
    #[arg(long)]
    pub body: Option<String>,
    /// Star the new memo
    #[arg(long)]
    pub star: bool,
    /// Attach an image file (repeatable)
    #[arg(long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Memo identifier
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub body: Option<String>,
    #[arg(long, conflicts_with = "unstar")]
    pub star: bool,
    #[arg(long)]
    pub unstar: bool,
    /// Attach an image file (repeatable)
    #[arg(long = "image", value_name = "PATH")]
    pub images: Vec<PathBuf>,
    /// Drop all attached images before adding new ones
    #[arg(long)]
    pub clear_images: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Memo identifier
    pub id: i64,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteManyArgs {
    /// Memo identifiers
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<i64>,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Memo to move
    pub dragged: i64,
    /// Memo whose position it takes
    pub target: i64,
}

pub fn list_notes(
    board: &mut Board,
    args: &ListArgs,
    display: &DisplayOptions,
    now: OffsetDateTime,
) -> Result<String> {
    let query = args.query.join(" ");
    board.dispatch(Intent::Search { query })?;
    let visible = board.visible();
    if visible.is_empty() {
        return Ok(if board.store().is_empty() {
            "No memos yet.\n".to_string()
        } else {
            "No matches found.\n".to_string()
        });
    }
    let mut out = String::new();
    for note in visible {
        let mut headline = format!("#{}  ", note.id);
        if note.starred {
            headline.push_str("★ ");
        }
        headline.push_str(note.display_title(&display.untitled_label));
        let _ = write!(headline, "  ({})", date_label(note.updated_at, now));
        if !note.images.is_empty() {
            let _ = write!(headline, "  [{} img]", note.images.len());
        }
        let _ = writeln!(out, "{headline}");
        let _ = writeln!(out, "    {}", build_snippet(note, display));
    }
    Ok(out)
}

pub fn show_note(
    board: &Board,
    args: &ShowArgs,
    display: &DisplayOptions,
    now: OffsetDateTime,
) -> Result<String> {
    let note = find(board, args.id)?;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "#{}  {}",
        note.id,
        note.display_title(&display.untitled_label)
    );
    let _ = writeln!(
        out,
        "updated  {} ({})",
        date_label(note.updated_at, now),
        format_timestamp(note.updated_at)
    );
    let _ = writeln!(out, "starred  {}", if note.starred { "yes" } else { "no" });
    for image in &note.images {
        let _ = writeln!(out, "image    {image}");
    }
    out.push('\n');
    if note.body.trim().is_empty() {
        let _ = writeln!(out, "{}", display.empty_body_label);
    } else {
        let _ = writeln!(out, "{}", note.body);
    }
    Ok(out)
}

pub fn new_note(board: &mut Board, args: NewArgs) -> Result<String> {
    let piped = if args.body.is_none() {
        read_stdin()?
    } else {
        None
    };
    let title = match args.title {
        Some(title) => title,
        None if args.body.is_none() && piped.is_none() && args.images.is_empty() => {
            prompt("Title")?
        }
        None => String::new(),
    };

    let mut draft = NoteDraft::blank(0);
    draft.title.insert_str(&title);
    draft
        .body
        .insert_str(args.body.as_deref().or(piped.as_deref()).unwrap_or(""));
    draft.starred = args.star;
    for path in &args.images {
        draft.add_image(media::resolve(path).with_context(|| format!("attaching {}", path.display()))?);
    }

    let Some(intent) = draft.finish() else {
        bail!("nothing to save: title, body and images are all empty");
    };
    match board.dispatch(intent).context("creating memo")? {
        Outcome::Created(note) => Ok(format!(
            "Created memo #{}{}\n",
            note.id,
            if note.starred { " (starred)" } else { "" }
        )),
        other => bail!("unexpected outcome while creating memo: {other:?}"),
    }
}

pub fn edit_note(board: &mut Board, args: EditArgs) -> Result<String> {
    let note = find(board, args.id)?;
    let mut draft = NoteDraft::from_note(note, 0);
    if let Some(title) = &args.title {
        draft.title.clear();
        draft.title.insert_str(title);
    }
    if let Some(body) = &args.body {
        draft.body.clear();
        draft.body.insert_str(body);
    }
    if args.star {
        draft.starred = true;
    }
    if args.unstar {
        draft.starred = false;
    }
    if args.clear_images {
        draft.images.clear();
    }
    for path in &args.images {
        draft.add_image(media::resolve(path).with_context(|| format!("attaching {}", path.display()))?);
    }

    let Some(intent) = draft.finish() else {
        bail!(
            "memo #{} would be left empty; use `memo delete {}` instead",
            args.id,
            args.id
        );
    };
    board.dispatch(intent).context("saving memo")?;
    Ok(format!("Updated memo #{}\n", args.id))
}

pub fn delete_note<F>(board: &mut Board, args: &DeleteArgs, confirm: F) -> Result<String>
where
    F: FnOnce(&str) -> Result<bool>,
{
    let title = find(board, args.id)?.title.clone();
    if !args.yes && !confirm(&format!("Delete memo #{} \"{}\"?", args.id, title))? {
        return Ok("Aborted.\n".to_string());
    }
    board
        .dispatch(Intent::Delete {
            id: NoteId(args.id),
        })
        .context("deleting memo")?;
    Ok(format!("Deleted memo #{}\n", args.id))
}

pub fn delete_many<F>(board: &mut Board, args: &DeleteManyArgs, confirm: F) -> Result<String>
where
    F: FnOnce(&str) -> Result<bool>,
{
    let present: Vec<NoteId> = args
        .ids
        .iter()
        .map(|id| NoteId(*id))
        .filter(|id| board.store().contains(*id))
        .collect();
    let Some((first, rest)) = present.split_first() else {
        return Ok("Nothing deleted.\n".to_string());
    };
    board.dispatch(Intent::BeginSelection { id: *first })?;
    for id in rest {
        if !board.is_selected(*id) {
            board.dispatch(Intent::ToggleSelection { id: *id })?;
        }
    }
    let count = board.selection().map(|selection| selection.len()).unwrap_or(0);
    if !args.yes && !confirm(&format!("Delete {count} memo(s)?"))? {
        board.dispatch(Intent::CancelSelection)?;
        return Ok("Aborted.\n".to_string());
    }
    match board
        .dispatch(Intent::DeleteSelected)
        .context("deleting memos")?
    {
        Outcome::Deleted { removed } => Ok(format!("Deleted {removed} memo(s)\n")),
        _ => Ok("Nothing deleted.\n".to_string()),
    }
}

pub fn move_note(board: &mut Board, args: &MoveArgs) -> Result<String> {
    find(board, args.dragged)?;
    find(board, args.target)?;
    let outcome = board
        .dispatch(Intent::Reorder {
            dragged: NoteId(args.dragged),
            target: NoteId(args.target),
        })
        .context("reordering memos")?;
    if outcome.is_change() {
        Ok(format!(
            "Moved memo #{} to the position of #{}\n",
            args.dragged, args.target
        ))
    } else {
        Ok("Order unchanged.\n".to_string())
    }
}

fn find(board: &Board, id: i64) -> Result<&Note> {
    board
        .note(NoteId(id))
        .with_context(|| format!("no memo with id {id}"))
}

/// y/N prompt on the terminal. Piped input never confirms.
pub fn confirm_on_terminal(question: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        bail!("refusing to delete without --yes when stdin is not a terminal");
    }
    let answer = prompt(&format!("{question} [y/N]"))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn build_snippet(note: &Note, display: &DisplayOptions) -> String {
    let snippet = note
        .body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if snippet.is_empty() {
        return display.empty_body_label.clone();
    }
    snippet.chars().take(160).collect()
}

fn format_timestamp(epoch: i64) -> String {
    OffsetDateTime::from_unix_timestamp(epoch)
        .map(|dt| dt.format(&Rfc3339).unwrap_or_else(|_| epoch.to_string()))
        .unwrap_or_else(|_| epoch.to_string())
}
