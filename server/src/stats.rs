//! Read-side aggregation over a user's visible tasks. Pure folds,
//! recomputed on every request — no caching, no incremental maintenance.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tarefa_core::{DashboardStats, StatusCount, Task, TaskStatus, UserStats};

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    // Day 1 of the current month always exists.
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0).unwrap()
}

pub fn user_stats(tasks: &[Task], now: DateTime<Utc>) -> UserStats {
    let total = tasks.len() as u64;
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Concluida)
        .count() as u64;
    let pending = tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Pendente | TaskStatus::EmAndamento))
        .count() as u64;
    let overdue = tasks.iter().filter(|t| t.is_overdue(now)).count() as u64;

    let completion_rate = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };

    let month_start = start_of_month(now);
    let created_this_month = tasks.iter().filter(|t| t.created_at >= month_start).count() as u64;

    UserStats {
        total_tasks: total,
        completed_tasks: completed,
        pending_tasks: pending,
        overdue_tasks: overdue,
        completion_rate,
        created_this_month,
    }
}

pub fn dashboard(tasks: &[Task], now: DateTime<Utc>) -> DashboardStats {
    let mut status_stats = Vec::new();
    for status in TaskStatus::ALL {
        let count = tasks.iter().filter(|t| t.status == status).count() as u64;
        if count > 0 {
            status_stats.push(StatusCount { status, count });
        }
    }

    DashboardStats {
        status_stats,
        overdue_tasks: tasks.iter().filter(|t| t.is_overdue(now)).count() as u64,
        total_tasks: tasks.len() as u64,
    }
}

// ── Tests ──────────────────────────────────────────────────────
