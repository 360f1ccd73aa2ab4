//! Command-line entry point for daily routines.
//!
//! Every command prints JSON on success; failures go to stderr with exit code 1.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "routine_cli", version, about = "Daily routine CLI")]
struct Cli {
    /// SQLite database file. Overrides `[storage] db_path` and `ROUTINE_DB_PATH`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the routine for a date with every slot pending
    Create(commands::routine::CreateArgs),
    /// Show one day's routine
    Show(commands::routine::DayArgs),
    /// Edit slot text; locked slots keep their content
    Edit(commands::routine::EditArgs),
    /// Move one pending slot to submitted, completed or missed
    Mark(commands::routine::MarkArgs),
    /// List a user's routines, newest first
    List(commands::routine::ListArgs),
    /// Journal entries
    Journal {
        #[command(subcommand)]
        action: commands::journal::JournalAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = commands::CliContext::load(cli.db, cli.config).and_then(|ctx| match cli.command {
        Commands::Create(args) => commands::routine::create(&ctx, args),
        Commands::Show(args) => commands::routine::show(&ctx, args),
        Commands::Edit(args) => commands::routine::edit(&ctx, args),
        Commands::Mark(args) => commands::routine::mark(&ctx, args),
        Commands::List(args) => commands::routine::list(&ctx, args),
        Commands::Journal { action } => commands::journal::run(&ctx, action),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn parses_edit_with_global_db() {
        let cli = Cli::try_parse_from([
            "routine_cli",
            "edit",
            "--user",
            "u1",
            "--date",
            "2024-05-01",
            "--morning",
            "gym",
            "--expected-version",
            "3",
            "--db",
            "/tmp/routine.sqlite3",
        ])
        .unwrap();

        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/routine.sqlite3")));
        match cli.command {
            Commands::Edit(args) => {
                assert_eq!(args.target.user, "u1");
                assert_eq!(args.morning.as_deref(), Some("gym"));
                assert_eq!(args.evening, None);
                assert_eq!(args.expected_version, Some(3));
            }
            _ => panic!("expected edit command"),
        }
    }

    #[test]
    fn mark_requires_slot_and_status() {
        assert!(Cli::try_parse_from(["routine_cli", "mark", "--user", "u1"]).is_err());
    }

    #[test]
    fn parses_journal_add() {
        let cli = Cli::try_parse_from([
            "routine_cli",
            "journal",
            "add",
            "--user",
            "u1",
            "--title",
            "Gratitude",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Journal { .. }));
    }
}
