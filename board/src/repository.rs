// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use common::{NewTask, Priority, SubTaskSuggestion, Task, TaskFields, TaskId, TaskStatus};
use tracing::{debug, error, info, warn};

use crate::error::BoardError;
use crate::store::{PersistentStore, SlotBackend, TASKS_KEY};

/// The authoritative in-memory task collection.
///
/// Every mutation is applied in memory first and then written through to the
/// store. A failed write is logged and remembered in [`last_save_error`], but
/// the in-memory change stands.
///
/// [`last_save_error`]: TaskRepository::last_save_error
#[derive(Debug)]
pub struct TaskRepository<B> {
    tasks: Vec<Task>,
    store: PersistentStore<B>,
    last_save_error: Option<String>,
}

impl<B: SlotBackend> TaskRepository<B> {
    /// Loads the collection from the `tasks` slot (empty if missing or corrupted).
    pub fn open(mut store: PersistentStore<B>) -> Self {
        let loaded: Vec<Task> = store.load(TASKS_KEY, Vec::new());
        let tasks = sanitize(loaded);
        info!("Loaded {} tasks from storage.", tasks.len());
        Self {
            tasks,
            store,
            last_save_error: None,
        }
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks with the given status, newest first.
    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        let mut column: Vec<&Task> = self.tasks.iter().filter(|t| t.status == status).collect();
        column.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        column
    }

    pub fn create(&mut self, new_task: NewTask) -> Result<Task, BoardError> {
        let fields = normalize(new_task.fields)?;
        let task = Task {
            id: self.fresh_id(),
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            priority: fields.priority,
            status: new_task.status.unwrap_or_default(),
            created_at: Utc::now(),
        };
        debug!("Creating task '{}' with ID {}", task.title, task.id);

        self.tasks.push(task.clone());
        self.persist();

        info!("Task created successfully with ID: {}", task.id);
        Ok(task)
    }

    /// Replaces title, description, due date and priority; `status` is only
    /// changed when given. Unknown ids are reported as [`BoardError::NotFound`].
    pub fn update(
        &mut self,
        id: TaskId,
        fields: TaskFields,
        status: Option<TaskStatus>,
    ) -> Result<Task, BoardError> {
        let fields = normalize(fields)?;
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(BoardError::NotFound(id))?;

        task.title = fields.title;
        task.description = fields.description;
        task.due_date = fields.due_date;
        task.priority = fields.priority;
        if let Some(status) = status {
            task.status = status;
        }
        let updated = task.clone();
        self.persist();

        info!("Task with ID {} updated.", id);
        Ok(updated)
    }

    /// Deletes the task if present. Returns whether anything was removed.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        let removed = self.tasks.len() != before;
        self.persist();

        if removed {
            info!("Task with ID {} deleted successfully.", id);
        } else {
            debug!("Task with ID {} was already gone.", id);
        }
        removed
    }

    /// Moves a task to another column. Returns `None` for unknown ids.
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.status = status;
        let moved = task.clone();
        self.persist();

        info!("Task with ID {} moved to {}.", id, status.label());
        Some(moved)
    }

    /// Turns accepted suggestions into `ToDo` tasks with `Medium` priority,
    /// all due on `due_date`. The collection is written once.
    pub fn bulk_create(
        &mut self,
        suggestions: &[SubTaskSuggestion],
        due_date: Option<NaiveDate>,
    ) -> Vec<Task> {
        let created_at = Utc::now();
        let mut created = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            let title = suggestion.title.trim();
            if title.is_empty() {
                debug!("Skipping suggestion with an empty title.");
                continue;
            }
            let task = Task {
                id: self.fresh_id(),
                title: title.to_string(),
                description: non_empty(suggestion.description.clone()),
                due_date,
                priority: Some(Priority::Medium),
                status: TaskStatus::ToDo,
                created_at,
            };
            self.tasks.push(task.clone());
            created.push(task);
        }
        self.persist();

        info!("Created {} tasks from suggestions.", created.len());
        created
    }

    /// The most recent failed write, cleared by the next successful one.
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn store(&self) -> &PersistentStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PersistentStore<B> {
        &mut self.store
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::new();
            if self.get(id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) {
        match self.store.save(TASKS_KEY, &self.tasks) {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                error!("Failed to persist tasks: {}", e);
                self.last_save_error = Some(e.to_string());
            }
        }
    }
}

fn normalize(mut fields: TaskFields) -> Result<TaskFields, BoardError> {
    let title = fields.title.trim();
    if title.is_empty() {
        return Err(BoardError::empty_title());
    }
    fields.title = title.to_string();
    fields.description = non_empty(fields.description);
    Ok(fields)
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|s| !s.trim().is_empty())
}

/// Keeps the first task for each id and drops tasks without a title.
fn sanitize(loaded: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    loaded
        .into_iter()
        .filter(|task| {
            if task.title.trim().is_empty() {
                warn!("Dropping stored task {} with an empty title.", task.id);
                return false;
            }
            if !seen.insert(task.id) {
                warn!("Dropping stored task with duplicate ID {}.", task.id);
                return false;
            }
            true
        })
        .collect()
}
