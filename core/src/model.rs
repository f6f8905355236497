//! Domain entities shared by server and client.
//!
//! Status and priority are deliberately two separate enums even though the
//! source domain overlaps their value spaces — a task is "em-andamento"
//! *and* "alta", never one or the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;

/// Task lifecycle: pendente → em-andamento → concluida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pendente,
    EmAndamento,
    Concluida,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pendente,
        TaskStatus::EmAndamento,
        TaskStatus::Concluida,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Baixa,
    Media,
    Alta,
}

/// A task — the unit of work.
///
/// `creator` is set once at creation and never changes. `completed_at` is
/// stamped only when status transitions into Concluida, never cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub creator: Uuid,
    pub responsible: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A task is visible to its creator and its responsible, nobody else.
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.creator == user_id || self.responsible == Some(user_id)
    }

    /// Past its due date and not completed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => self.status != TaskStatus::Concluida && now > due,
            None => false,
        }
    }

    /// Whole days until the due date, rounded up. 0 = due within the day,
    /// negative = overdue. None without a due date.
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        let due = self.due_date?;
        let secs = (due - now).num_seconds();
        Some((secs as f64 / 86_400.0).ceil() as i64)
    }
}

/// Public identity of a user as embedded in task responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if title.chars().count() > TITLE_MAX {
        return Err(format!("Title must be at most {TITLE_MAX} characters"));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(format!(
            "Description must be at most {DESCRIPTION_MAX} characters"
        ));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────
