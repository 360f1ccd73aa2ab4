//! Journal subcommands.

use super::{date_or_today, print_json, CliContext, CliResult};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum JournalAction {
    /// Add an entry
    Add {
        #[arg(long)]
        user: String,
        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    /// List entries for one date
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Entry counts for the seven days ending on a date
    Week {
        #[arg(long)]
        user: String,
        #[arg(long)]
        today: Option<String>,
    },
}

pub fn run(ctx: &CliContext, action: JournalAction) -> CliResult {
    match action {
        JournalAction::Add {
            user,
            date,
            title,
            body,
        } => {
            let date = date_or_today(date.as_deref())?;
            let entry = ctx.with_journal_service(|service| {
                Ok(service.add_entry(&user, date, &title, &body)?)
            })?;
            print_json(&entry)
        }
        JournalAction::List { user, date } => {
            let date = date_or_today(date.as_deref())?;
            let entries =
                ctx.with_journal_service(|service| Ok(service.entries_for_date(&user, date)?))?;
            print_json(&entries)
        }
        JournalAction::Week { user, today } => {
            let today = date_or_today(today.as_deref())?;
            let days = ctx.with_journal_service(|service| Ok(service.week_strip(&user, today)?))?;
            print_json(&days)
        }
    }
}
