//! Local reminder scheduling for task due dates.
//!
//! Timing rules: "due_soon" fires at 18:00 the day before the due date and
//! "due_today" at 09:00 on the due date; both are dropped when the
//! computed fire time is already in the past. Overdue tasks found during a
//! bulk sync get an immediate reminder instead. Everything previously
//! scheduled for a task is canceled before anything new is scheduled, so
//! at most one reminder of each kind is pending per task.

use crate::error::ClientError;
use crate::notify::Notifier;
use crate::session;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tarefa_core::{TaskResponse, TaskStatus};
use uuid::Uuid;

const LEDGER_FILE_NAME: &str = "reminders.json";
const DUE_SOON_HOUR: u32 = 18;
const DUE_TODAY_HOUR: u32 = 9;
/// Bulk sync refreshes reminders for tasks due within this many days.
const UPCOMING_WINDOW_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DueSoon,
    DueToday,
    Overdue,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::DueSoon => "due_soon",
            ReminderKind::DueToday => "due_today",
            ReminderKind::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub task_id: Uuid,
    pub kind: ReminderKind,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Local>,
}

// ── Timing ─────────────────────────────────────────────────────

/// Local wall-clock time on `date`. None when DST skips that hour.
fn at_hour(date: NaiveDate, hour: u32) -> Option<DateTime<Local>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    match naive.and_local_timezone(Local) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

fn reminder_for(task: &TaskResponse, kind: ReminderKind, fire_at: DateTime<Local>) -> Reminder {
    let (title, body) = match kind {
        ReminderKind::DueSoon => (
            "Task due tomorrow".to_string(),
            format!("\"{}\" is due tomorrow.", task.title),
        ),
        ReminderKind::DueToday => (
            "Task due today".to_string(),
            format!("\"{}\" is due today. Don't forget to finish it.", task.title),
        ),
        ReminderKind::Overdue => (
            "Task overdue".to_string(),
            format!("\"{}\" is past its due date.", task.title),
        ),
    };
    Reminder { task_id: task.id, kind, title, body, fire_at }
}

/// Future reminders for a task's due date. Fire times already in the past
/// are dropped, not clamped.
pub fn plan_reminders(task: &TaskResponse, now: DateTime<Local>) -> Vec<Reminder> {
    let Some(due) = task.due_date else {
        return Vec::new();
    };
    let due_day = due.with_timezone(&Local).date_naive();
    let mut planned = Vec::new();

    if let Some(fire_at) = due_day.pred_opt().and_then(|d| at_hour(d, DUE_SOON_HOUR)) {
        if fire_at > now {
            planned.push(reminder_for(task, ReminderKind::DueSoon, fire_at));
        }
    }
    if let Some(fire_at) = at_hour(due_day, DUE_TODAY_HOUR) {
        if fire_at > now {
            planned.push(reminder_for(task, ReminderKind::DueToday, fire_at));
        }
    }
    planned
}

/// Immediate nudge for a task that is already past its due date.
pub fn overdue_reminder(task: &TaskResponse, now: DateTime<Local>) -> Reminder {
    reminder_for(task, ReminderKind::Overdue, now + Duration::seconds(1))
}

fn days_until(due: DateTime<Utc>, now: DateTime<Local>) -> i64 {
    let secs = (due.with_timezone(&Local) - now).num_seconds();
    (secs as f64 / 86_400.0).ceil() as i64
}

// ── Ledger ─────────────────────────────────────────────────────

/// Persistent (taskId, kind) → platform-id map, so reminders scheduled by
/// an earlier run can still be canceled individually.
#[derive(Debug)]
pub struct ReminderLedger {
    path: PathBuf,
    entries: HashMap<Uuid, HashMap<ReminderKind, String>>,
}

impl ReminderLedger {
    pub fn open_default() -> Result<Self, ClientError> {
        Self::open(session::data_dir()?.join(LEDGER_FILE_NAME))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ClientError::Storage(e.to_string()))?;
            serde_json::from_str(&content).map_err(|e| ClientError::Storage(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(ReminderLedger { path, entries })
    }

    /// Remember the platform id for (task, kind), replacing any previous
    /// one for the same pair.
    pub fn record(
        &mut self,
        task_id: Uuid,
        kind: ReminderKind,
        platform_id: String,
    ) -> Result<(), ClientError> {
        self.entries.entry(task_id).or_default().insert(kind, platform_id);
        self.save()
    }

    /// Remove and return every recorded id for the task.
    pub fn take(&mut self, task_id: Uuid) -> Result<Vec<String>, ClientError> {
        match self.entries.remove(&task_id) {
            Some(ids) => {
                self.save()?;
                Ok(ids.into_values().collect())
            }
            None => Ok(Vec::new()),
        }
    }

    pub fn pending_kinds(&self, task_id: Uuid) -> Vec<ReminderKind> {
        self.entries
            .get(&task_id)
            .map(|ids| ids.keys().copied().collect())
            .unwrap_or_default()
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| ClientError::Storage(e.to_string()))
    }
}

// ── Scheduler ──────────────────────────────────────────────────

/// Drives the notifier from task state. Scheduling is fire-and-forget:
/// failures are logged and swallowed, never surfaced to the operation that
/// triggered them.
pub struct ReminderScheduler<N: Notifier> {
    notifier: N,
    ledger: ReminderLedger,
}

impl<N: Notifier> ReminderScheduler<N> {
    pub fn new(notifier: N, ledger: ReminderLedger) -> Self {
        ReminderScheduler { notifier, ledger }
    }

    /// Cancel whatever is pending for the task, then schedule fresh
    /// reminders for its due date. Completed tasks only cancel.
    pub fn reschedule(&mut self, task: &TaskResponse, now: DateTime<Local>) {
        self.cancel_all(task.id);
        if task.status == TaskStatus::Concluida {
            return;
        }
        for planned in plan_reminders(task, now) {
            self.schedule_one(planned);
        }
    }

    pub fn cancel_all(&mut self, task_id: Uuid) {
        match self.ledger.take(task_id) {
            Ok(ids) => {
                for id in ids {
                    self.notifier.cancel(&id);
                }
            }
            Err(err) => tracing::warn!(task = %task_id, %err, "failed to read reminder ledger"),
        }
    }

    /// Bulk pass over the user's tasks, typically after a list sync.
    /// Tasks due within two days get their reminders refreshed; overdue
    /// ones get an immediate nudge.
    pub fn sync_upcoming(&mut self, tasks: &[TaskResponse], now: DateTime<Local>) {
        for task in tasks {
            if task.status == TaskStatus::Concluida {
                continue;
            }
            let Some(due) = task.due_date else { continue };

            let days = days_until(due, now);
            if (0..=UPCOMING_WINDOW_DAYS).contains(&days) {
                self.reschedule(task, now);
            } else if days < 0 {
                self.cancel_all(task.id);
                self.schedule_one(overdue_reminder(task, now));
            }
        }
    }

    fn schedule_one(&mut self, planned: Reminder) {
        let task_id = planned.task_id;
        let kind = planned.kind;
        match self.notifier.schedule(&planned) {
            Ok(platform_id) => {
                if let Err(err) = self.ledger.record(task_id, kind, platform_id) {
                    tracing::warn!(task = %task_id, %err, "failed to persist reminder id");
                }
            }
            Err(err) => {
                tracing::warn!(task = %task_id, kind = kind.as_str(), %err, "failed to schedule reminder");
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
