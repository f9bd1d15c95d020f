//! Task service - task CRUD with cached reads and tag invalidation

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::task::{NewTask, Task, TaskId, TaskRepository, TaskStatus};
use crate::domain::user::UserId;
use crate::domain::DomainError;

use super::cache_policy::{TaskCacheInvalidation, TaskCachePolicy, TaskListFilter};

/// List name for the tasks a user created or is assigned to
pub const USER_TASKS_ALL: &str = "user_tasks_all";

/// List name for the tasks of an explicitly requested user
pub const USER_TASKS_SPECIFIC: &str = "user_tasks_specific";

/// Request to create a new task
#[derive(Debug, Clone, Default)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

/// Request to update an existing task; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
}

/// Task operations on behalf of an acting user
#[derive(Debug, Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    cache: TaskCachePolicy,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, cache: TaskCachePolicy) -> Self {
        Self { tasks, cache }
    }

    pub async fn create(&self, actor: UserId, request: CreateTaskRequest) -> Result<Task, DomainError> {
        validate_title(&request.title)?;

        let task = self
            .tasks
            .create(NewTask {
                title: request.title,
                description: request.description,
                status: request.status.unwrap_or_default(),
                created_by: actor,
                assigned_to: request.assigned_to,
                due_date: request.due_date,
            })
            .await?;

        let invalidation = TaskCacheInvalidation::new(task.id())
            .with_user(actor)
            .with_user(task.assigned_to())
            .with_status(task.status());
        self.cache.invalidate(&invalidation).await?;

        info!(task_id = %task.id(), actor = %actor, "Task created");
        Ok(task)
    }

    pub async fn update(
        &self,
        actor: UserId,
        task_id: TaskId,
        request: UpdateTaskRequest,
    ) -> Result<Task, DomainError> {
        let mut task = self.editable(actor, task_id).await?;
        let old_status = task.status();
        let old_assignee = task.assigned_to();

        if let Some(title) = request.title {
            validate_title(&title)?;
            task.set_title(title);
        }

        if let Some(description) = request.description {
            task.set_description(Some(description));
        }

        if let Some(status) = request.status {
            task.set_status(status);
        }

        if let Some(assignee) = request.assigned_to {
            task.set_assigned_to(Some(assignee));
        }

        if let Some(due_date) = request.due_date {
            task.set_due_date(Some(due_date));
        }

        let task = self.tasks.update(task).await?;

        let mut invalidation = TaskCacheInvalidation::new(task_id)
            .with_user(actor)
            .with_status(old_status);

        if task.status() != old_status {
            invalidation = invalidation.with_status(task.status());
        }

        if task.assigned_to() != old_assignee {
            invalidation = invalidation
                .with_user(task.assigned_to())
                .with_user(old_assignee);
        }

        self.cache.invalidate(&invalidation).await?;

        info!(task_id = %task_id, actor = %actor, "Task updated");
        Ok(task)
    }

    pub async fn delete(&self, actor: UserId, task_id: TaskId) -> Result<(), DomainError> {
        let task = self.editable(actor, task_id).await?;

        self.tasks.delete(task_id).await?;

        let mut invalidation = TaskCacheInvalidation::new(task_id)
            .with_user(actor)
            .with_status(task.status());

        if task.assigned_to() != Some(actor) {
            invalidation = invalidation.with_user(task.assigned_to());
        }

        self.cache.invalidate(&invalidation).await?;

        info!(task_id = %task_id, actor = %actor, "Task deleted");
        Ok(())
    }

    /// Reads a task through the cache; only its creator or assignee may view it
    pub async fn get_by_id(&self, actor: UserId, task_id: TaskId) -> Result<Task, DomainError> {
        let task: Option<Task> = self
            .cache
            .cache_task(task_id, || self.tasks.find(task_id))
            .await?;

        let task = task.ok_or_else(|| task_not_found(task_id))?;

        if !task.is_participant(actor) {
            return Err(DomainError::permission_denied(
                "task",
                "You do not have permission to view this task",
            ));
        }

        Ok(task)
    }

    /// Tasks created by or assigned to the actor, newest first
    pub async fn get_all(&self, actor: UserId) -> Result<Vec<Task>, DomainError> {
        self.cache
            .cache_task_list(USER_TASKS_ALL, &TaskListFilter::for_user(actor), || {
                self.tasks.list_for_user(actor)
            })
            .await
    }

    /// Tasks of `user_id`; users may only list their own
    pub async fn get_all_by_user_id(
        &self,
        actor: UserId,
        user_id: UserId,
    ) -> Result<Vec<Task>, DomainError> {
        if actor != user_id {
            return Err(DomainError::permission_denied(
                "user",
                "You can only view your own tasks",
            ));
        }

        self.cache
            .cache_task_list(USER_TASKS_SPECIFIC, &TaskListFilter::for_user(user_id), || {
                self.tasks.list_for_user(user_id)
            })
            .await
    }

    pub async fn assign(
        &self,
        actor: UserId,
        task_id: TaskId,
        assignee: UserId,
    ) -> Result<Task, DomainError> {
        let mut task = self.editable(actor, task_id).await?;
        let previous = task.assigned_to();

        task.set_assigned_to(Some(assignee));
        let task = self.tasks.update(task).await?;

        let mut invalidation = TaskCacheInvalidation::new(task_id)
            .with_user(actor)
            .with_user(assignee);

        if previous != Some(assignee) {
            invalidation = invalidation.with_user(previous);
        }

        self.cache.invalidate(&invalidation).await?;

        info!(task_id = %task_id, assignee = %assignee, "Task assigned");
        Ok(task)
    }

    pub async fn update_status(
        &self,
        actor: UserId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, DomainError> {
        let mut task = self.editable(actor, task_id).await?;
        let old_status = task.status();

        task.set_status(status);
        let task = self.tasks.update(task).await?;

        let invalidation = TaskCacheInvalidation::new(task_id)
            .with_user(actor)
            .with_status(old_status)
            .with_status(status);
        self.cache.invalidate(&invalidation).await?;

        info!(task_id = %task_id, from = %old_status, to = %status, "Task status changed");
        Ok(task)
    }

    /// Loads a task from the repository, checking the actor may modify it
    async fn editable(&self, actor: UserId, task_id: TaskId) -> Result<Task, DomainError> {
        let task = self
            .tasks
            .find(task_id)
            .await?
            .ok_or_else(|| task_not_found(task_id))?;

        if !task.is_participant(actor) {
            return Err(DomainError::permission_denied(
                "task",
                "You do not have permission to modify this task",
            ));
        }

        Ok(task)
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title", "Title is required"));
    }

    Ok(())
}

fn task_not_found(task_id: TaskId) -> DomainError {
    DomainError::not_found("task", format!("Task '{}' not found", task_id))
}
