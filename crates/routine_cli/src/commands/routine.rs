//! Routine subcommands: create, show, edit, mark, list.

use super::{date_or_today, print_json, CliContext, CliResult};
use chrono::NaiveDate;
use clap::Args;
use routine_core::{
    parse_routine_date, EditRoutineRequest, MarkSlotRequest, RoutineListQuery,
    RoutineRepository, RoutineService, SlotContents, SlotKind, SlotStatus,
};

/// Selects one user's routine for one date.
#[derive(Args, Debug)]
pub struct DayArgs {
    #[arg(long)]
    pub user: String,
    /// Date as YYYY-MM-DD (defaults to today)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub target: DayArgs,
    #[arg(long, default_value = "")]
    pub morning: String,
    #[arg(long, default_value = "")]
    pub day: String,
    #[arg(long, default_value = "")]
    pub evening: String,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: DayArgs,
    /// New morning text (keeps the stored text when omitted)
    #[arg(long)]
    pub morning: Option<String>,
    #[arg(long)]
    pub day: Option<String>,
    #[arg(long)]
    pub evening: Option<String>,
    /// Full edit payload as JSON, instead of per-slot flags
    #[arg(long, conflicts_with_all = ["morning", "day", "evening"])]
    pub payload: Option<String>,
    /// Version last read; a stale value fails with a conflict
    #[arg(long)]
    pub expected_version: Option<i64>,
}

#[derive(Args, Debug)]
pub struct MarkArgs {
    #[command(flatten)]
    pub target: DayArgs,
    /// morning, day or evening
    #[arg(long)]
    pub slot: String,
    /// submitted, completed or missed
    #[arg(long)]
    pub status: String,
    #[arg(long)]
    pub expected_version: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub user: String,
    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
    /// Maximum rows (default 31, max 366)
    #[arg(long)]
    pub limit: Option<u32>,
}

pub fn create(ctx: &CliContext, args: CreateArgs) -> CliResult {
    let date = date_or_today(args.target.date.as_deref())?;
    let plan = SlotContents::new(args.morning, args.day, args.evening);
    let record = ctx.with_routine_service(|service| {
        Ok(service.create_daily_routine(&args.target.user, date, &plan)?)
    })?;
    print_json(&record)
}

pub fn show(ctx: &CliContext, args: DayArgs) -> CliResult {
    let date = date_or_today(args.date.as_deref())?;
    let record =
        ctx.with_routine_service(|service| Ok(service.get_daily_routine(&args.user, date)?))?;
    print_json(&record)
}

pub fn edit(ctx: &CliContext, args: EditArgs) -> CliResult {
    let date = date_or_today(args.target.date.as_deref())?;
    let record = ctx.with_routine_service(|service| {
        let request = build_edit_request(service, &args, date)?;
        Ok(service.edit_daily_routine(&request)?)
    })?;
    print_json(&record)
}

/// Builds the edit intent. Flag-based edits are pinned to the version the
/// stored text was read at, so a write landing in between is a conflict.
fn build_edit_request<R: RoutineRepository>(
    service: &RoutineService<R>,
    args: &EditArgs,
    date: NaiveDate,
) -> CliResult<EditRoutineRequest> {
    let (proposed, expected_version) = match args.payload.as_deref() {
        Some(raw) => (SlotContents::from_json_str(raw)?, args.expected_version),
        None => {
            let current = service.get_daily_routine(&args.target.user, date)?;
            (
                overlay_slot_flags(current.contents(), args),
                args.expected_version.or(Some(current.version)),
            )
        }
    };
    Ok(EditRoutineRequest {
        user_id: args.target.user.clone(),
        date,
        proposed,
        expected_version,
    })
}

pub fn mark(ctx: &CliContext, args: MarkArgs) -> CliResult {
    let date = date_or_today(args.target.date.as_deref())?;
    let slot = SlotKind::parse(&args.slot).ok_or_else(|| {
        format!("unknown slot `{}`; expected morning|day|evening", args.slot)
    })?;
    let status = SlotStatus::parse(&args.status).ok_or_else(|| {
        format!(
            "unknown status `{}`; expected submitted|completed|missed",
            args.status
        )
    })?;

    let request = MarkSlotRequest {
        user_id: args.target.user,
        date,
        slot,
        status,
        expected_version: args.expected_version,
    };
    let record = ctx.with_routine_service(|service| Ok(service.mark_slot(&request)?))?;
    print_json(&record)
}

pub fn list(ctx: &CliContext, args: ListArgs) -> CliResult {
    let query = RoutineListQuery {
        user_id: args.user,
        from: args.from.as_deref().map(parse_routine_date).transpose()?,
        to: args.to.as_deref().map(parse_routine_date).transpose()?,
        limit: args.limit,
    };
    let records = ctx.with_routine_service(|service| Ok(service.list_daily_routines(&query)?))?;
    print_json(&records)
}

/// Replaces stored slot text with whichever slot flags were given.
fn overlay_slot_flags(mut base: SlotContents, args: &EditArgs) -> SlotContents {
    for kind in SlotKind::ALL {
        let flag = match kind {
            SlotKind::Morning => &args.morning,
            SlotKind::Day => &args.day,
            SlotKind::Evening => &args.evening,
        };
        if let Some(text) = flag {
            *base.get_mut(kind) = text.clone();
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::{
        build_edit_request, create, edit, mark, overlay_slot_flags, CreateArgs, DayArgs, EditArgs,
        MarkArgs,
    };
    use crate::commands::CliContext;
    use chrono::NaiveDate;
    use routine_core::{
        CoreConfig, EditRoutineRequest, RoutineServiceError, SlotContents, SlotStatus,
    };

    fn target() -> DayArgs {
        DayArgs {
            user: "u1".to_string(),
            date: Some("2024-05-01".to_string()),
        }
    }

    fn edit_args() -> EditArgs {
        EditArgs {
            target: target(),
            morning: None,
            day: None,
            evening: None,
            payload: None,
            expected_version: None,
        }
    }

    #[test]
    fn overlay_keeps_unflagged_slots() {
        let mut args = edit_args();
        args.evening = Some("read".to_string());

        let proposed = overlay_slot_flags(SlotContents::new("run", "work", "rest"), &args);
        assert_eq!(proposed, SlotContents::new("run", "work", "read"));
    }

    #[test]
    fn commands_drive_the_shared_database() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext {
            config: CoreConfig::default(),
            db_path: dir.path().join("routine.sqlite3"),
        };

        create(
            &ctx,
            CreateArgs {
                target: target(),
                morning: "run".to_string(),
                day: "work".to_string(),
                evening: "rest".to_string(),
            },
        )
        .unwrap();
        mark(
            &ctx,
            MarkArgs {
                target: target(),
                slot: "morning".to_string(),
                status: "completed".to_string(),
                expected_version: Some(1),
            },
        )
        .unwrap();

        let mut args = edit_args();
        args.morning = Some("gym".to_string());
        args.day = Some("meetings".to_string());
        edit(&ctx, args).unwrap();

        let stored = ctx
            .with_routine_service(|service| {
                Ok(service.get_daily_routine("u1", "2024-05-01".parse().unwrap())?)
            })
            .unwrap();
        assert_eq!(stored.morning.content, "run");
        assert_eq!(stored.morning.status, SlotStatus::Completed);
        assert_eq!(stored.day.content, "meetings");
        assert_eq!(stored.version, 3);
    }

    #[test]
    fn flag_edit_conflicts_with_write_after_its_read() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext {
            config: CoreConfig::default(),
            db_path: dir.path().join("routine.sqlite3"),
        };
        create(
            &ctx,
            CreateArgs {
                target: target(),
                morning: "run".to_string(),
                day: "work".to_string(),
                evening: "rest".to_string(),
            },
        )
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        ctx.with_routine_service(|service| {
            let mut args = edit_args();
            args.morning = Some("gym".to_string());
            let request = build_edit_request(service, &args, date)?;
            assert_eq!(request.expected_version, Some(1));

            service.edit_daily_routine(&EditRoutineRequest {
                proposed: SlotContents::new("run", "meetings", "rest"),
                expected_version: None,
                ..request.clone()
            })?;

            let err = service.edit_daily_routine(&request).unwrap_err();
            assert!(matches!(
                err,
                RoutineServiceError::Conflict {
                    expected: 1,
                    actual: 2
                }
            ));
            let stored = service.get_daily_routine("u1", date)?;
            assert_eq!(stored.day.content, "meetings");
            assert_eq!(stored.morning.content, "run");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn payload_edit_keeps_caller_version() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext {
            config: CoreConfig::default(),
            db_path: dir.path().join("routine.sqlite3"),
        };
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        ctx.with_routine_service(|service| {
            let mut args = edit_args();
            args.payload = Some(r#"{"morning": "a", "day": "b", "evening": "c"}"#.to_string());
            let request = build_edit_request(service, &args, date)?;
            assert_eq!(request.expected_version, None);
            assert_eq!(request.proposed, SlotContents::new("a", "b", "c"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn mark_rejects_unknown_status() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CliContext {
            config: CoreConfig::default(),
            db_path: dir.path().join("routine.sqlite3"),
        };
        let err = mark(
            &ctx,
            MarkArgs {
                target: target(),
                slot: "day".to_string(),
                status: "finished".to_string(),
                expected_version: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown status"));
    }
}
