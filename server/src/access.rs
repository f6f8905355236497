//! Field-level permissions for task mutation. Pure — callers resolve the
//! acting user and referenced records first; nothing here touches storage.
//!
//! Creator: everything. Responsible: status and priority only. A request
//! from a non-creator carrying any creator-only field is rejected whole;
//! tags from a non-creator are dropped silently (they are not part of the
//! protected set).

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use tarefa_core::{validate_description, validate_title, Task, TaskStatus, UpdateTaskRequest};
use uuid::Uuid;

/// Fields only the creator may change.
fn has_creator_only_changes(changes: &UpdateTaskRequest) -> bool {
    changes.title.is_some()
        || changes.description.is_some()
        || changes.responsible.is_some()
        || changes.due_date.is_some()
}

/// Apply `changes` to `task` on behalf of `actor`. All-or-nothing: on any
/// error the task must not be persisted.
///
/// `completed_at` is stamped exactly when status transitions into
/// Concluida; re-completing leaves the original stamp untouched.
pub fn apply_update(
    task: &mut Task,
    changes: &UpdateTaskRequest,
    actor: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let is_creator = task.creator == actor;

    if !is_creator && has_creator_only_changes(changes) {
        return Err(ApiError::Forbidden(
            "Only the creator may edit title, description, responsible and due date".to_string(),
        ));
    }

    if is_creator {
        if let Some(title) = &changes.title {
            validate_title(title).map_err(ApiError::Validation)?;
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            validate_description(description).map_err(ApiError::Validation)?;
            task.description = description.clone();
        }
        if let Some(responsible) = changes.responsible {
            task.responsible = Some(responsible);
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(tags) = &changes.tags {
            task.tags = tags.clone();
        }
    }

    if let Some(status) = changes.status {
        if status == TaskStatus::Concluida && task.status != TaskStatus::Concluida {
            task.completed_at = Some(now);
        }
        task.status = status;
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }

    task.updated_at = now;
    Ok(())
}

/// Delete is creator-only. Callers collapse a false into the same NotFound
/// as a missing task.
pub fn can_delete(task: &Task, actor: Uuid) -> bool {
    task.creator == actor
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tarefa_core::Priority;

    fn base_task(creator: Uuid, responsible: Option<Uuid>) -> Task {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            title: "Prepare slides".to_string(),
            description: "For the Thursday review".to_string(),
            status: TaskStatus::Pendente,
            priority: Priority::Media,
            tags: vec!["work".to_string()],
            creator,
            responsible,
            due_date: None,
            completed_at: None,
            created_at: t0,
            updated_at: t0,
        }
    }

    #[test]
    fn creator_may_change_everything() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let mut task = base_task(creator, None);
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap();

        let changes = UpdateTaskRequest {
            title: Some("New title".to_string()),
            description: Some("New description".to_string()),
            status: Some(TaskStatus::EmAndamento),
            priority: Some(Priority::Alta),
            responsible: Some(delegate),
            due_date: Some(Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()),
            tags: Some(vec!["urgent".to_string()]),
        };
        apply_update(&mut task, &changes, creator, now).unwrap();

        assert_eq!(task.title, "New title");
        assert_eq!(task.description, "New description");
        assert_eq!(task.status, TaskStatus::EmAndamento);
        assert_eq!(task.priority, Priority::Alta);
        assert_eq!(task.responsible, Some(delegate));
        assert!(task.due_date.is_some());
        assert_eq!(task.tags, vec!["urgent".to_string()]);
        assert_eq!(task.updated_at, now);
    }

    #[test]
    fn responsible_may_complete() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let mut task = base_task(creator, Some(delegate));
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap();

        let changes = UpdateTaskRequest {
            status: Some(TaskStatus::Concluida),
            ..Default::default()
        };
        apply_update(&mut task, &changes, delegate, now).unwrap();

        assert_eq!(task.status, TaskStatus::Concluida);
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn non_creator_with_protected_field_is_rejected_whole() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let mut task = base_task(creator, Some(delegate));
        let now = Utc::now();

        // Valid status change riding along with a forbidden title change:
        // nothing may be applied.
        let changes = UpdateTaskRequest {
            title: Some("Hijacked".to_string()),
            status: Some(TaskStatus::Concluida),
            ..Default::default()
        };
        let err = apply_update(&mut task, &changes, delegate, now).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        assert_eq!(task.title, "Prepare slides");
        assert_eq!(task.status, TaskStatus::Pendente);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn non_creator_tags_dropped_silently() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let mut task = base_task(creator, Some(delegate));
        let now = Utc::now();

        let changes = UpdateTaskRequest {
            tags: Some(vec!["sneaky".to_string()]),
            priority: Some(Priority::Baixa),
            ..Default::default()
        };
        apply_update(&mut task, &changes, delegate, now).unwrap();

        assert_eq!(task.tags, vec!["work".to_string()]);
        assert_eq!(task.priority, Priority::Baixa);
    }

    #[test]
    fn completed_at_stamped_only_on_transition() {
        let creator = Uuid::new_v4();
        let mut task = base_task(creator, None);
        let first = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();

        let complete = UpdateTaskRequest {
            status: Some(TaskStatus::Concluida),
            ..Default::default()
        };
        apply_update(&mut task, &complete, creator, first).unwrap();
        assert_eq!(task.completed_at, Some(first));

        // Completing again must not move the stamp.
        apply_update(&mut task, &complete, creator, later).unwrap();
        assert_eq!(task.completed_at, Some(first));
        assert_eq!(task.updated_at, later);
    }

    #[test]
    fn title_bounds_enforced_on_update() {
        let creator = Uuid::new_v4();
        let mut task = base_task(creator, None);

        let changes = UpdateTaskRequest {
            title: Some("x".repeat(201)),
            ..Default::default()
        };
        let err = apply_update(&mut task, &changes, creator, Utc::now()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(task.title, "Prepare slides");
    }

    #[test]
    fn delete_is_creator_only() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let task = base_task(creator, Some(delegate));

        assert!(can_delete(&task, creator));
        assert!(!can_delete(&task, delegate));
        assert!(!can_delete(&task, Uuid::new_v4()));
    }
}
