//! Task endpoints. Every handler resolves visibility through the same
//! predicate before anything else; existence and invisibility are reported
//! identically so unauthorized callers learn nothing.

use crate::access;
use crate::auth::SharedState;
use crate::error::ApiError;
use crate::stats;
use crate::store::{Store, User};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use tarefa_core::{
    validate_description, validate_title, CreateTaskRequest, DashboardStats, MessageResponse,
    Task, TaskEnvelope, TaskFilters, TaskListResponse, TaskResponse, TaskStatus,
    UpdateTaskRequest,
};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: u32 = 10;

// Expand related users and compute derived fields for the wire.
fn task_to_response(task: Task, store: &Store, now: DateTime<Utc>) -> Result<TaskResponse, ApiError> {
    let creator = store
        .get_user(task.creator)?
        .ok_or_else(|| ApiError::Internal(format!("task {} has no creator record", task.id)))?;

    let responsible = match task.responsible {
        Some(id) => store.get_user(id)?.map(|u| u.to_ref()),
        None => None,
    };

    Ok(TaskResponse {
        id: task.id,
        is_overdue: task.is_overdue(now),
        days_until_due: task.days_until_due(now),
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        tags: task.tags,
        creator: creator.to_ref(),
        responsible,
        due_date: task.due_date,
        completed_at: task.completed_at,
        created_at: task.created_at,
        updated_at: task.updated_at,
    })
}

// Visibility plus the optional equality and search filters from the query.
fn matches_filters(task: &Task, filters: &TaskFilters, actor: Uuid) -> bool {
    if !task.is_visible_to(actor) {
        return false;
    }
    if let Some(status) = filters.status {
        if task.status != status {
            return false;
        }
    }
    if let Some(priority) = filters.priority {
        if task.priority != priority {
            return false;
        }
    }
    if let Some(responsible) = filters.responsible {
        if task.responsible != Some(responsible) {
            return false;
        }
    }
    if let Some(search) = &filters.search {
        let needle = search.to_lowercase();
        if !needle.is_empty()
            && !task.title.to_lowercase().contains(&needle)
            && !task.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    true
}

fn page_bounds(filters: &TaskFilters) -> (u32, u32) {
    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    (page, limit)
}

fn total_pages(total: u64, limit: u32) -> u32 {
    ((total + limit as u64 - 1) / limit as u64) as u32
}

fn not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

// ── Handlers ───────────────────────────────────────────────────

// GET /tasks
pub async fn list_tasks(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Query(filters): Query<TaskFilters>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let now = Utc::now();
    let (page, limit) = page_bounds(&filters);

    // list_tasks() is already newest-first.
    let visible: Vec<Task> = state
        .store
        .list_tasks()?
        .into_iter()
        .filter(|t| matches_filters(t, &filters, user.id))
        .collect();

    let total = visible.len() as u64;
    let tasks = visible
        .into_iter()
        .skip((page as usize - 1).saturating_mul(limit as usize))
        .take(limit as usize)
        .map(|t| task_to_response(t, &state.store, now))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(TaskListResponse {
        tasks,
        total_pages: total_pages(total, limit),
        current_page: page,
        total,
    }))
}

// GET /tasks/:id
pub async fn get_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.get_task(id)?.ok_or_else(not_found)?;
    if !task.is_visible_to(user.id) {
        return Err(not_found());
    }
    Ok(Json(task_to_response(task, &state.store, Utc::now())?))
}

// POST /tasks
pub async fn create_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    validate_title(&payload.title).map_err(ApiError::Validation)?;
    validate_description(&payload.description).map_err(ApiError::Validation)?;

    if let Some(responsible) = payload.responsible {
        if state.store.get_user(responsible)?.is_none() {
            return Err(ApiError::InvalidReference(
                "Responsible user not found".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        title: payload.title,
        description: payload.description,
        status: payload.status,
        priority: payload.priority,
        tags: payload.tags,
        creator: user.id,
        responsible: payload.responsible,
        due_date: payload.due_date,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store.create_task(&task)?;
    tracing::debug!(task = %task.id, creator = %user.id, "task created");

    let response = task_to_response(task, &state.store, now)?;
    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope { message: "Task created".to_string(), task: response }),
    ))
}

// PUT /tasks/:id
pub async fn update_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UpdateTaskRequest>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let mut task = state.store.get_task(id)?.ok_or_else(not_found)?;
    if !task.is_visible_to(user.id) {
        return Err(not_found());
    }

    // A newly named responsible must exist. Non-creators fail the
    // permission check inside apply_update before this matters.
    if let Some(responsible) = changes.responsible {
        if task.creator == user.id
            && task.responsible != Some(responsible)
            && state.store.get_user(responsible)?.is_none()
        {
            return Err(ApiError::InvalidReference(
                "Responsible user not found".to_string(),
            ));
        }
    }

    access::apply_update(&mut task, &changes, user.id, Utc::now())?;
    state.store.update_task(&task)?;

    let response = task_to_response(task, &state.store, Utc::now())?;
    Ok(Json(TaskEnvelope { message: "Task updated".to_string(), task: response }))
}

// DELETE /tasks/:id
pub async fn delete_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let task = state.store.get_task(id)?.ok_or_else(not_found)?;
    if !access::can_delete(&task, user.id) {
        // Non-creators get the same answer as for a missing task.
        return Err(not_found());
    }

    state.store.delete_task(id)?;
    tracing::debug!(task = %id, "task deleted");
    Ok(Json(MessageResponse { message: "Task deleted".to_string() }))
}

// POST /tasks/:id/complete
pub async fn complete_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let mut task = state.store.get_task(id)?.ok_or_else(not_found)?;
    if !task.is_visible_to(user.id) {
        return Err(not_found());
    }

    let now = Utc::now();
    // Stamp only on the transition; completing twice changes nothing.
    if task.status != TaskStatus::Concluida {
        task.status = TaskStatus::Concluida;
        task.completed_at = Some(now);
        task.updated_at = now;
        state.store.update_task(&task)?;
    }

    let response = task_to_response(task, &state.store, now)?;
    Ok(Json(TaskEnvelope { message: "Task completed".to_string(), task: response }))
}

// GET /tasks/stats/dashboard
pub async fn dashboard_stats(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardStats>, ApiError> {
    let visible = state.store.tasks_visible_to(user.id)?;
    Ok(Json(stats::dashboard(&visible, Utc::now())))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tarefa_core::{Priority, TaskStatus};

    fn task(creator: Uuid, title: &str, description: &str) -> Task {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pendente,
            priority: Priority::Media,
            tags: vec![],
            creator,
            responsible: None,
            due_date: None,
            completed_at: None,
            created_at: t0,
            updated_at: t0,
        }
    }

    #[test]
    fn filters_enforce_visibility_first() {
        let creator = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let t = task(creator, "Mine", "private notes");

        let filters = TaskFilters::default();
        assert!(matches_filters(&t, &filters, creator));
        assert!(!matches_filters(&t, &filters, stranger));
    }

    #[test]
    fn equality_filters_are_anded_in() {
        let creator = Uuid::new_v4();
        let delegate = Uuid::new_v4();
        let mut t = task(creator, "Report", "quarterly numbers");
        t.status = TaskStatus::EmAndamento;
        t.priority = Priority::Alta;
        t.responsible = Some(delegate);

        let hit = TaskFilters {
            status: Some(TaskStatus::EmAndamento),
            priority: Some(Priority::Alta),
            responsible: Some(delegate),
            ..Default::default()
        };
        assert!(matches_filters(&t, &hit, creator));

        let miss = TaskFilters {
            status: Some(TaskStatus::Concluida),
            ..Default::default()
        };
        assert!(!matches_filters(&t, &miss, creator));
    }

    #[test]
    fn search_is_case_insensitive_on_title_or_description() {
        let creator = Uuid::new_v4();
        let t = task(creator, "Buy GROCERIES", "milk and eggs");

        let by_title = TaskFilters { search: Some("groceries".to_string()), ..Default::default() };
        let by_description = TaskFilters { search: Some("EGGS".to_string()), ..Default::default() };
        let no_match = TaskFilters { search: Some("laundry".to_string()), ..Default::default() };

        assert!(matches_filters(&t, &by_title, creator));
        assert!(matches_filters(&t, &by_description, creator));
        assert!(!matches_filters(&t, &no_match, creator));
    }

    #[test]
    fn pagination_math() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);

        let defaults = page_bounds(&TaskFilters::default());
        assert_eq!(defaults, (1, DEFAULT_PAGE_SIZE));

        // Nonsense values are clamped rather than rejected.
        let clamped = page_bounds(&TaskFilters {
            page: Some(0),
            limit: Some(0),
            ..Default::default()
        });
        assert_eq!(clamped, (1, 1));
    }

    // ── Handler flows against a real store ─────────────────────

    use crate::auth::AppState;
    use crate::settings::Settings;
    use crate::store::Store;
    use chrono::Duration;
    use std::fs;
    use std::sync::Arc;

    fn temp_state(name: &str) -> (SharedState, String) {
        let path = format!("/tmp/tarefa_test_api_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path);
        let store = Store::open(&path).unwrap();
        (
            Arc::new(AppState { store, settings: Settings::default() }),
            path,
        )
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn add_user(state: &SharedState, name: &str, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            created_at: Utc::now(),
        };
        state.store.create_user(&user).unwrap();
        user
    }

    fn create_request(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: "details".to_string(),
            status: TaskStatus::Pendente,
            priority: Priority::Media,
            responsible: None,
            due_date: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_sets_creator() {
        let (state, path) = temp_state("create");
        let ana = add_user(&state, "Ana", "ana@example.com");

        let (status, body) = create_task(
            State(state.clone()),
            Extension(ana.clone()),
            Json(create_request("Buy groceries")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        let created = &body.0.task;
        assert_eq!(created.status, TaskStatus::Pendente);
        assert_eq!(created.priority, Priority::Media);
        assert_eq!(created.creator.id, ana.id);
        assert!(created.completed_at.is_none());

        cleanup(&path);
    }

    #[tokio::test]
    async fn create_rejects_unknown_responsible() {
        let (state, path) = temp_state("badref");
        let ana = add_user(&state, "Ana", "ana@example.com");

        let mut request = create_request("Delegated");
        request.responsible = Some(Uuid::new_v4());
        let err = create_task(State(state.clone()), Extension(ana), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidReference(_)));

        cleanup(&path);
    }

    #[tokio::test]
    async fn invisible_task_reads_as_missing() {
        let (state, path) = temp_state("invisible");
        let ana = add_user(&state, "Ana", "ana@example.com");
        let carla = add_user(&state, "Carla", "carla@example.com");

        let (_, body) = create_task(
            State(state.clone()),
            Extension(ana),
            Json(create_request("Private")),
        )
        .await
        .unwrap();
        let id = body.0.task.id;

        let err = get_task(State(state.clone()), Extension(carla.clone()), Path(id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // Same answer as for a task that truly does not exist.
        let missing = get_task(State(state.clone()), Extension(carla), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), missing.public_message());

        cleanup(&path);
    }

    #[tokio::test]
    async fn responsible_completes_but_cannot_retitle() {
        let (state, path) = temp_state("delegate");
        let ana = add_user(&state, "Ana", "ana@example.com");
        let bruno = add_user(&state, "Bruno", "bruno@example.com");

        let mut request = create_request("Shared work");
        request.responsible = Some(bruno.id);
        let (_, body) = create_task(State(state.clone()), Extension(ana), Json(request))
            .await
            .unwrap();
        let id = body.0.task.id;

        // Status+title in one request: rejected whole, nothing applied.
        let err = update_task(
            State(state.clone()),
            Extension(bruno.clone()),
            Path(id),
            Json(UpdateTaskRequest {
                title: Some("Hijacked".to_string()),
                status: Some(TaskStatus::Concluida),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let stored = state.store.get_task(id).unwrap().unwrap();
        assert_eq!(stored.title, "Shared work");
        assert_eq!(stored.status, TaskStatus::Pendente);

        // Status alone goes through and stamps completion.
        let updated = update_task(
            State(state.clone()),
            Extension(bruno),
            Path(id),
            Json(UpdateTaskRequest {
                status: Some(TaskStatus::Concluida),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.0.task.status, TaskStatus::Concluida);
        assert!(updated.0.task.completed_at.is_some());

        cleanup(&path);
    }

    #[tokio::test]
    async fn complete_is_idempotent() {
        let (state, path) = temp_state("complete");
        let ana = add_user(&state, "Ana", "ana@example.com");

        let (_, body) = create_task(
            State(state.clone()),
            Extension(ana.clone()),
            Json(create_request("Finish twice")),
        )
        .await
        .unwrap();
        let id = body.0.task.id;

        let first = complete_task(State(state.clone()), Extension(ana.clone()), Path(id))
            .await
            .unwrap();
        let stamp = first.0.task.completed_at.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let second = complete_task(State(state.clone()), Extension(ana), Path(id))
            .await
            .unwrap();
        assert_eq!(second.0.task.completed_at, Some(stamp));

        cleanup(&path);
    }

    #[tokio::test]
    async fn delete_is_creator_only_and_removes_for_everyone() {
        let (state, path) = temp_state("delete");
        let ana = add_user(&state, "Ana", "ana@example.com");
        let bruno = add_user(&state, "Bruno", "bruno@example.com");

        let mut request = create_request("Doomed");
        request.responsible = Some(bruno.id);
        let (_, body) = create_task(State(state.clone()), Extension(ana.clone()), Json(request))
            .await
            .unwrap();
        let id = body.0.task.id;

        // The responsible sees it but may not delete it.
        let err = delete_task(State(state.clone()), Extension(bruno.clone()), Path(id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        delete_task(State(state.clone()), Extension(ana.clone()), Path(id))
            .await
            .unwrap();

        for viewer in [ana, bruno] {
            let listing = list_tasks(
                State(state.clone()),
                Extension(viewer),
                Query(TaskFilters::default()),
            )
            .await
            .unwrap();
            assert_eq!(listing.0.total, 0);
            assert!(listing.0.tasks.is_empty());
        }

        cleanup(&path);
    }

    #[tokio::test]
    async fn list_paginates_newest_first() {
        let (state, path) = temp_state("paging");
        let ana = add_user(&state, "Ana", "ana@example.com");

        for i in 0..12 {
            let mut t = task(ana.id, &format!("task {i}"), "d");
            t.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + Duration::hours(i);
            state.store.create_task(&t).unwrap();
        }

        let page1 = list_tasks(
            State(state.clone()),
            Extension(ana.clone()),
            Query(TaskFilters { limit: Some(5), ..Default::default() }),
        )
        .await
        .unwrap();
        assert_eq!(page1.0.total, 12);
        assert_eq!(page1.0.total_pages, 3);
        assert_eq!(page1.0.current_page, 1);
        assert_eq!(page1.0.tasks.len(), 5);
        assert_eq!(page1.0.tasks[0].title, "task 11"); // newest first

        let page3 = list_tasks(
            State(state.clone()),
            Extension(ana),
            Query(TaskFilters { page: Some(3), limit: Some(5), ..Default::default() }),
        )
        .await
        .unwrap();
        assert_eq!(page3.0.tasks.len(), 2);
        assert_eq!(page3.0.tasks[1].title, "task 0"); // oldest last

        cleanup(&path);
    }
}
