use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{dates, App, Board};
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::notes::{now_unix, NoteStore};
use crate::storage;

pub mod commands;

use self::commands::{DeleteArgs, DeleteManyArgs, EditArgs, ListArgs, MoveArgs, NewArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(name = "memo", version, about = "Local-first memo board for the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over MEMO_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MEMO_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive board (default)
    Tui,
    /// Print memos in board order, optionally filtered
    List(ListArgs),
    /// Print one memo in full
    Show(ShowArgs),
    /// Create a memo at the top of the board
    New(NewArgs),
    /// Change a memo's fields
    Edit(EditArgs),
    /// Delete one memo
    Delete(DeleteArgs),
    /// Delete several memos at once
    DeleteMany(DeleteManyArgs),
    /// Move a memo to another memo's position
    Move(MoveArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    // Resolved before any worker thread exists.
    let offset = dates::local_offset();

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let repository = storage::init(&paths, &config.storage)?;
    let store = NoteStore::open(repository, storage::seed_notes(now_unix()))
        .context("loading stored memos")?;
    let mut board = Board::new(store);

    let config = Arc::new(config);
    let now = dates::now_in(offset);
    let output = match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let mut app = App::new(config, board);
            return app.run();
        }
        Commands::List(args) => commands::list_notes(&mut board, &args, &config.display, now)?,
        Commands::Show(args) => commands::show_note(&board, &args, &config.display, now)?,
        Commands::New(args) => commands::new_note(&mut board, args)?,
        Commands::Edit(args) => commands::edit_note(&mut board, args)?,
        Commands::Delete(args) => {
            commands::delete_note(&mut board, &args, commands::confirm_on_terminal)?
        }
        Commands::DeleteMany(args) => {
            commands::delete_many(&mut board, &args, commands::confirm_on_terminal)?
        }
        Commands::Move(args) => commands::move_note(&mut board, &args)?,
    };
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_tui_without_subcommand() {
        let cli = Cli::parse_from(["memo"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn parses_edit_flags() {
        let cli = Cli::parse_from([
            "memo", "edit", "7", "--title", "New", "--unstar", "--image", "a.png", "--image",
            "b.jpg",
        ]);
        let Some(Commands::Edit(args)) = cli.command else {
            panic!("expected edit command");
        };
        assert_eq!(args.id, 7);
        assert_eq!(args.title.as_deref(), Some("New"));
        assert!(args.unstar && !args.star);
        assert_eq!(args.images.len(), 2);
    }

    #[test]
    fn star_and_unstar_conflict() {
        let result = Cli::try_parse_from(["memo", "edit", "1", "--star", "--unstar"]);
        assert!(result.is_err());
    }

    #[test]
    fn delete_many_needs_ids() {
        assert!(Cli::try_parse_from(["memo", "delete-many"]).is_err());
        let cli = Cli::parse_from(["memo", "delete-many", "1", "2", "--yes"]);
        let Some(Commands::DeleteMany(args)) = cli.command else {
            panic!("expected delete-many command");
        };
        assert_eq!(args.ids, vec![1, 2]);
        assert!(args.yes);
    }
}
