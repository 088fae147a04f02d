//! In-memory backend for tests and offline demos.
//!
//! [`LoopbackBackend`] behaves like the real task server: it keeps users,
//! tokens and tasks in memory, validates input, filters and paginates
//! lists. Tests can queue failures and latencies per [`Operation`] and
//! inspect the [`Call`] log to assert which requests were issued.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use taskdeck_proto::auth::{AuthPayload, Credentials, Registration, User};
use taskdeck_proto::filter::{FilterSet, SortBy, SortDirection};
use taskdeck_proto::task::{Task, TaskDraft, TaskId, TaskListMeta, TaskPage, TaskPatch};
use uuid::Uuid;

use super::{ApiError, Backend};

const INVALID_DATA: &str = "The given data was invalid.";

/// A REST operation, used to target injected failures and latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    Logout,
    Profile,
    ListTasks,
    GetTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
}

/// One request received by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Which endpoint was hit.
    pub operation: Operation,
    /// The addressed task, for per-task endpoints.
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Default)]
struct LoopbackState {
    users: Vec<(User, String)>,
    tokens: HashMap<String, String>,
    tasks: Vec<Task>,
    next_task_id: u64,
    failures: HashMap<Operation, VecDeque<ApiError>>,
    latencies: HashMap<Operation, VecDeque<Duration>>,
    calls: Vec<Call>,
}

impl LoopbackState {
    fn user_for(&self, token: Option<&str>) -> Result<User, ApiError> {
        let user_id = token
            .and_then(|t| self.tokens.get(t))
            .ok_or_else(|| ApiError::Unauthorized {
                message: "Unauthenticated.".into(),
            })?;
        self.users
            .iter()
            .find(|(user, _)| &user.id == user_id)
            .map(|(user, _)| user.clone())
            .ok_or_else(|| ApiError::Unauthorized {
                message: "Unauthenticated.".into(),
            })
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = Uuid::now_v7().simple().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn add_user(&mut self, name: &str, email: &str, password: &str) -> User {
        let user = User {
            id: (self.users.len() + 1).to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.users.push((user.clone(), password.to_string()));
        user
    }

    fn task_index(&self, id: &TaskId) -> Result<usize, ApiError> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| ApiError::NotFound {
                message: "Task not found".into(),
            })
    }
}

/// An in-memory task server. Clones share the same server state.
#[derive(Debug, Default, Clone)]
pub struct LoopbackBackend {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackBackend {
    /// An empty server with no users or tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user directly.
    pub fn add_user(&self, name: &str, email: &str, password: &str) -> User {
        self.state.lock().add_user(name, email, password)
    }

    /// Ensures a demo user exists and returns a fresh token for it.
    pub fn seed_session(&self) -> String {
        let mut state = self.state.lock();
        let user_id = match state.users.first() {
            Some((user, _)) => user.id.clone(),
            None => state.add_user("Demo", "demo@example.com", "password").id,
        };
        state.issue_token(&user_id)
    }

    /// Inserts a task as if it had been created earlier, returning it.
    pub fn seed_task(&self, draft: TaskDraft) -> Task {
        let mut state = self.state.lock();
        state.next_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: TaskId::new(state.next_task_id.to_string()),
            name: draft.name,
            description: draft.description,
            status: draft.status,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        task
    }

    /// Server-side tasks in creation order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Server-side copy of one task.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.lock().tasks.iter().find(|t| &t.id == id).cloned()
    }

    /// Invalidates every issued token.
    pub fn expire_tokens(&self) {
        self.state.lock().tokens.clear();
    }

    /// Makes the next `operation` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Delays the next `operation` by `latency` before it is processed.
    pub fn delay_next(&self, operation: Operation, latency: Duration) {
        self.state
            .lock()
            .latencies
            .entry(operation)
            .or_default()
            .push_back(latency);
    }

    /// Every request received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Number of requests received for `operation`.
    #[must_use]
    pub fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Records the call, waits out any queued latency, then surfaces any
    /// queued failure.
    async fn arrive(&self, operation: Operation, task_id: Option<&TaskId>) -> Result<(), ApiError> {
        let (latency, failure) = {
            let mut state = self.state.lock();
            state.calls.push(Call {
                operation,
                task_id: task_id.cloned(),
            });
            let latency = state
                .latencies
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);
            let failure = state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);
            (latency, failure)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        tracing::trace!(?operation, ?task_id, injected_failure = failure.is_some(), "loopback call");
        failure.map_or(Ok(()), Err)
    }
}

fn validation(field: &str, message: &str) -> ApiError {
    ApiError::Validation {
        message: INVALID_DATA.into(),
        errors: std::iter::once((field.to_string(), message.to_string())).collect(),
    }
}

fn check_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(validation("name", "The name field is required."));
    }
    if name.chars().count() > taskdeck_proto::task::MAX_TASK_NAME_LENGTH {
        return Err(validation(
            "name",
            "The name field must not be greater than 255 characters.",
        ));
    }
    Ok(())
}

fn matches_filters(task: &Task, filters: &FilterSet) -> bool {
    if filters.status.is_some_and(|s| s != task.status) {
        return false;
    }
    if let Some(search) = filters.search.as_deref().map(str::to_lowercase) {
        let in_name = task.name.to_lowercase().contains(&search);
        let in_description = task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&search));
        if !in_name && !in_description {
            return false;
        }
    }
    let after_from = filters
        .due_date_from
        .is_none_or(|from| task.due_date.is_some_and(|due| due >= from));
    let before_to = filters
        .due_date_to
        .is_none_or(|to| task.due_date.is_some_and(|due| due <= to));
    after_from && before_to
}

fn sort_tasks(tasks: &mut [Task], sort_by: SortBy, direction: SortDirection) {
    tasks.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::CreatedAt => a
                .created_at
                .cmp(&b.created_at)
                .then(a.id.as_str().len().cmp(&b.id.as_str().len()))
                .then(a.id.cmp(&b.id)),
            SortBy::DueDate => a.due_date.cmp(&b.due_date),
            SortBy::Name => a.name.cmp(&b.name),
            SortBy::Status => a.status.column_index().cmp(&b.status.column_index()),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn paginate(mut tasks: Vec<Task>, filters: &FilterSet) -> TaskPage {
    sort_tasks(&mut tasks, filters.sort_by, filters.sort_direction);
    let per_page = u64::from(filters.per_page.max(1));
    let total = tasks.len() as u64;
    let total_pages = total.div_ceil(per_page).max(1);
    let current_page = u64::from(filters.page.max(1));
    let skip = usize::try_from((current_page - 1) * per_page).unwrap_or(usize::MAX);
    let take = usize::try_from(per_page).unwrap_or(usize::MAX);
    let data: Vec<Task> = tasks.into_iter().skip(skip).take(take).collect();
    TaskPage {
        meta: TaskListMeta {
            total,
            count: data.len() as u64,
            per_page,
            current_page,
            total_pages,
        },
        data,
    }
}

impl Backend for LoopbackBackend {
    async fn register(&self, registration: &Registration) -> Result<AuthPayload, ApiError> {
        self.arrive(Operation::Register, None).await?;
        if registration.password != registration.password_confirmation {
            return Err(validation(
                "password",
                "The password field confirmation does not match.",
            ));
        }
        let mut state = self.state.lock();
        if state.users.iter().any(|(u, _)| u.email == registration.email) {
            return Err(validation("email", "The email has already been taken."));
        }
        let user = state.add_user(&registration.name, &registration.email, &registration.password);
        let access_token = state.issue_token(&user.id);
        Ok(AuthPayload {
            user: Some(user),
            access_token,
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        self.arrive(Operation::Login, None).await?;
        let mut state = self.state.lock();
        let user = state
            .users
            .iter()
            .find(|(u, password)| u.email == credentials.email && password == &credentials.password)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| ApiError::Unauthorized {
                message: "Invalid credentials".into(),
            })?;
        let access_token = state.issue_token(&user.id);
        Ok(AuthPayload {
            user: Some(user),
            access_token,
        })
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        self.arrive(Operation::Logout, None).await?;
        let mut state = self.state.lock();
        state.user_for(token)?;
        if let Some(token) = token {
            state.tokens.remove(token);
        }
        Ok(())
    }

    async fn profile(&self, token: Option<&str>) -> Result<User, ApiError> {
        self.arrive(Operation::Profile, None).await?;
        self.state.lock().user_for(token)
    }

    async fn list_tasks(&self, token: Option<&str>, filters: &FilterSet) -> Result<TaskPage, ApiError> {
        self.arrive(Operation::ListTasks, None).await?;
        let matching: Vec<Task> = {
            let state = self.state.lock();
            state.user_for(token)?;
            state
                .tasks
                .iter()
                .filter(|t| matches_filters(t, filters))
                .cloned()
                .collect()
        };
        Ok(paginate(matching, filters))
    }

    async fn get_task(&self, token: Option<&str>, id: &TaskId) -> Result<Task, ApiError> {
        self.arrive(Operation::GetTask, Some(id)).await?;
        let state = self.state.lock();
        state.user_for(token)?;
        let index = state.task_index(id)?;
        Ok(state.tasks[index].clone())
    }

    async fn create_task(&self, token: Option<&str>, draft: &TaskDraft) -> Result<Task, ApiError> {
        self.arrive(Operation::CreateTask, None).await?;
        self.state.lock().user_for(token)?;
        check_name(&draft.name)?;
        Ok(self.seed_task(draft.clone()))
    }

    async fn update_task(
        &self,
        token: Option<&str>,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, ApiError> {
        self.arrive(Operation::UpdateTask, Some(id)).await?;
        if let Some(name) = &patch.name {
            check_name(name)?;
        }
        let mut state = self.state.lock();
        state.user_for(token)?;
        let index = state.task_index(id)?;
        let task = &mut state.tasks[index];
        patch.apply_to(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, token: Option<&str>, id: &TaskId) -> Result<(), ApiError> {
        self.arrive(Operation::DeleteTask, Some(id)).await?;
        let mut state = self.state.lock();
        state.user_for(token)?;
        let index = state.task_index(id)?;
        state.tasks.remove(index);
        Ok(())
    }
}
