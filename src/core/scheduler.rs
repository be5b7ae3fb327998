//! Persisted scheduler for hooks that run once or on a cadence.
//!
//! Events live in the `scheduled_events` table so they survive restarts. A
//! `(hook, args)` pair is registered at most once; scheduling it again while it
//! is pending is a no-op. [`run_due`] executes what is due and either deletes
//! the event (single runs) or moves it to its next slot (recurring runs).

use crate::{
    core::{jobs::JobContext, settings::NotificationTarget},
    entities::{ScheduledEvent, scheduled_event},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::{fmt, str::FromStr};
use tracing::{debug, error, info, instrument, warn};

/// Prefix shared by every hook this service registers
pub const HOOK_PREFIX: &str = "inactive_guard_";

/// Named callbacks the scheduler knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Daily sweep disabling inactive accounts
    BulkDisable,
    /// Daily sweep queueing reminder emails
    SendReminders,
    /// Email about one disabled account
    SendDisabledNotification,
    /// Aggregate email about a bulk pass
    SendBulkDisabledNotification,
    /// Reminder email for one account
    SendReminderNotification,
}

impl Hook {
    /// Every hook this service registers
    pub const ALL: [Self; 5] = [
        Self::BulkDisable,
        Self::SendReminders,
        Self::SendDisabledNotification,
        Self::SendBulkDisabledNotification,
        Self::SendReminderNotification,
    ];

    /// Full hook name, including [`HOOK_PREFIX`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BulkDisable => "inactive_guard_bulk_disable",
            Self::SendReminders => "inactive_guard_send_reminders",
            Self::SendDisabledNotification => "inactive_guard_send_disabled_notification",
            Self::SendBulkDisabledNotification => "inactive_guard_send_bulk_disabled_notification",
            Self::SendReminderNotification => "inactive_guard_send_reminder_notification",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hook {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| Error::Config {
                message: format!("Unknown scheduled hook '{s}'"),
            })
    }
}

/// How often a recurring event repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Every hour
    Hourly,
    /// Every twelve hours
    TwiceDaily,
    /// Every day
    Daily,
    /// Every week
    Weekly,
}

impl Recurrence {
    /// Cadence name as stored
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::TwiceDaily => "twicedaily",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    /// Time between two runs
    #[must_use]
    pub fn interval(self) -> Duration {
        match self {
            Self::Hourly => Duration::hours(1),
            Self::TwiceDaily => Duration::hours(12),
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::weeks(1),
        }
    }
}

impl FromStr for Recurrence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "twicedaily" => Ok(Self::TwiceDaily),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(Error::Config {
                message: format!("Unknown recurrence '{other}'"),
            }),
        }
    }
}

/// A hook together with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Run the bulk disable pass
    BulkDisable,
    /// Run the reminder pass
    SendReminders,
    /// Notify about one disabled account
    DisabledNotification {
        /// The disabled account
        account_id: i64,
        /// Recipients
        send_to: NotificationTarget,
    },
    /// Notify the administrator about a bulk pass
    BulkDisabledNotification {
        /// Accounts disabled by the pass
        account_ids: Vec<i64>,
    },
    /// Remind one account it is about to be disabled
    ReminderNotification {
        /// The account to remind
        account_id: i64,
    },
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("Invalid account id '{raw}' in scheduled event: {e}"),
    })
}

impl Job {
    /// The hook this job runs under
    #[must_use]
    pub const fn hook(&self) -> Hook {
        match self {
            Self::BulkDisable => Hook::BulkDisable,
            Self::SendReminders => Hook::SendReminders,
            Self::DisabledNotification { .. } => Hook::SendDisabledNotification,
            Self::BulkDisabledNotification { .. } => Hook::SendBulkDisabledNotification,
            Self::ReminderNotification { .. } => Hook::SendReminderNotification,
        }
    }

    /// Arguments as stored in the `args` column
    #[must_use]
    pub fn args(&self) -> String {
        match self {
            Self::BulkDisable | Self::SendReminders => String::new(),
            Self::DisabledNotification {
                account_id,
                send_to,
            } => format!("{account_id}:{send_to}"),
            Self::BulkDisabledNotification { account_ids } => account_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
            Self::ReminderNotification { account_id } => account_id.to_string(),
        }
    }

    /// Reconstructs a job from a stored hook name and arguments.
    pub fn from_parts(hook: &str, args: &str) -> Result<Self> {
        match hook.parse::<Hook>()? {
            Hook::BulkDisable => Ok(Self::BulkDisable),
            Hook::SendReminders => Ok(Self::SendReminders),
            Hook::SendDisabledNotification => {
                let (id, send_to) = args.split_once(':').ok_or_else(|| Error::Config {
                    message: format!("Malformed disabled notification arguments '{args}'"),
                })?;
                Ok(Self::DisabledNotification {
                    account_id: parse_id(id)?,
                    send_to: send_to.parse()?,
                })
            }
            Hook::SendBulkDisabledNotification => Ok(Self::BulkDisabledNotification {
                account_ids: args
                    .split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(parse_id)
                    .collect::<Result<_>>()?,
            }),
            Hook::SendReminderNotification => Ok(Self::ReminderNotification {
                account_id: parse_id(args)?,
            }),
        }
    }
}

/// Whether `job` (same hook and arguments) is already pending.
pub async fn is_scheduled<C>(db: &C, job: &Job) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = ScheduledEvent::find()
        .filter(scheduled_event::Column::Hook.eq(job.hook().as_str()))
        .filter(scheduled_event::Column::Args.eq(job.args()))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Earliest pending run of `hook`, whatever its arguments.
pub async fn next_scheduled<C>(db: &C, hook: Hook) -> Result<Option<DateTime<Utc>>>
where
    C: ConnectionTrait,
{
    Ok(ScheduledEvent::find()
        .filter(scheduled_event::Column::Hook.eq(hook.as_str()))
        .order_by_asc(scheduled_event::Column::NextRun)
        .one(db)
        .await?
        .map(|event| event.next_run))
}

/// Registers `job` to run at `at`, then every `recurrence` if given.
///
/// Returns `false` without touching anything if the job is already pending.
#[instrument(skip(db), fields(hook = %job.hook()))]
pub async fn schedule<C>(
    db: &C,
    job: &Job,
    at: DateTime<Utc>,
    recurrence: Option<Recurrence>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if is_scheduled(db, job).await? {
        debug!("Already scheduled, skipping");
        return Ok(false);
    }

    scheduled_event::ActiveModel {
        hook: Set(job.hook().as_str().to_string()),
        args: Set(job.args()),
        next_run: Set(at),
        recurrence: Set(recurrence.map(|r| r.as_str().to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(%at, ?recurrence, "Scheduled");
    Ok(true)
}

/// Registers `job` to run once at `at`.
pub async fn schedule_single<C>(db: &C, job: &Job, at: DateTime<Utc>) -> Result<bool>
where
    C: ConnectionTrait,
{
    schedule(db, job, at, None).await
}

/// Removes every pending event of `hook`; returns how many were removed.
#[instrument(skip(db))]
pub async fn unschedule<C>(db: &C, hook: Hook) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ScheduledEvent::delete_many()
        .filter(scheduled_event::Column::Hook.eq(hook.as_str()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Removes every pending event registered by this service. Events of other
/// hooks sharing the table are left alone.
#[instrument(skip(db))]
pub async fn unschedule_all<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = ScheduledEvent::delete_many()
        .filter(scheduled_event::Column::Hook.is_in(Hook::ALL.map(Hook::as_str)))
        .exec(db)
        .await?;
    info!(removed = result.rows_affected, "Unscheduled all events");
    Ok(result.rows_affected)
}

/// Events whose `next_run` is at or before `now`, oldest first.
pub async fn due_events<C>(db: &C, now: DateTime<Utc>) -> Result<Vec<scheduled_event::Model>>
where
    C: ConnectionTrait,
{
    ScheduledEvent::find()
        .filter(scheduled_event::Column::NextRun.lte(now))
        .order_by_asc(scheduled_event::Column::NextRun)
        .order_by_asc(scheduled_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// First slot of `recurrence` after `now`, counted from `last_run`.
fn next_slot(last_run: DateTime<Utc>, recurrence: Recurrence, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut next = last_run + recurrence.interval();
    while next <= now {
        next += recurrence.interval();
    }
    next
}

async fn reschedule(
    db: &DatabaseConnection,
    event: scheduled_event::Model,
    now: DateTime<Utc>,
) -> Result<()> {
    let recurrence = match event.recurrence.as_deref().map(str::parse::<Recurrence>) {
        Some(Ok(recurrence)) => recurrence,
        Some(Err(e)) => {
            warn!(hook = %event.hook, "Dropping event with bad recurrence: {e}");
            ScheduledEvent::delete_by_id(event.id).exec(db).await?;
            return Ok(());
        }
        None => {
            ScheduledEvent::delete_by_id(event.id).exec(db).await?;
            return Ok(());
        }
    };

    let next_run = next_slot(event.next_run, recurrence, now);
    let mut active_model: scheduled_event::ActiveModel = event.into();
    active_model.next_run = Set(next_run);
    active_model.update(db).await?;
    Ok(())
}

/// Runs every due event once. Failing jobs are logged and still rescheduled or
/// removed, so one bad event cannot block the others.
///
/// Returns how many events ran.
pub async fn run_due(ctx: &JobContext, now: DateTime<Utc>) -> Result<usize> {
    let events = due_events(&ctx.database, now).await?;
    let count = events.len();

    for event in events {
        match Job::from_parts(&event.hook, &event.args) {
            Ok(job) => {
                if let Err(e) = crate::core::jobs::run_job(ctx, &job, now).await {
                    error!(hook = %event.hook, args = %event.args, "Scheduled job failed: {e}");
                }
            }
            Err(e) => warn!(hook = %event.hook, "Skipping unreadable event: {e}"),
        }
        reschedule(&ctx.database, event, now).await?;
    }

    if count > 0 {
        debug!(count, "Ran due events");
    }
    Ok(count)
}

/// Checks for due events every `tick` until the process exits.
pub async fn run_forever(ctx: JobContext, tick: std::time::Duration) {
    let mut interval = tokio::time::interval(tick);
    info!(?tick, "Scheduler started");
    loop {
        interval.tick().await;
        if let Err(e) = run_due(&ctx, Utc::now()).await {
            error!("Scheduler pass failed: {e}");
        }
    }
}
