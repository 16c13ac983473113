use std::collections::VecDeque;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use tokio::sync::mpsc;

use crate::client::api::TaskApi;
use crate::client::notice::{Notice, NoticeKind};
use crate::client::reminder::ReminderScheduler;
use crate::client::view::{self, Filters};
use crate::domain::error::TaskError;
use crate::domain::task::{DueDate, NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};

const MAX_NOTICES: usize = 5;

/// The text inputs behind the add and edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub priority: Priority,
}

impl TaskForm {
    /// A blank form due tomorrow at 09:00.
    pub fn new_for(today: NaiveDate) -> Self {
        TaskForm {
            date: (today + Duration::days(1)).format("%Y-%m-%d").to_string(),
            time: "09:00".into(),
            ..Default::default()
        }
    }

    pub fn from_task(task: &Task) -> Self {
        let due = task.due_date.naive();
        TaskForm {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            date: due.format("%Y-%m-%d").to_string(),
            time: due.format("%H:%M").to_string(),
            priority: task.priority,
        }
    }

    fn validated(&self) -> Result<(String, String, DueDate), TaskError> {
        let title = self.title.trim();
        if title.is_empty() || self.date.trim().is_empty() || self.time.trim().is_empty() {
            return Err(TaskError::validation("Please fill in all required fields"));
        }
        let due_date = DueDate::from_parts(&self.date, &self.time)?;
        Ok((title.to_string(), self.description.trim().to_string(), due_date))
    }

    pub fn to_new_task(&self) -> Result<NewTask, TaskError> {
        let (title, description, due_date) = self.validated()?;
        Ok(NewTask {
            title,
            description: Some(description),
            due_date,
            priority: self.priority,
            status: TaskStatus::Pending,
        })
    }

    pub fn to_patch(&self) -> Result<TaskPatch, TaskError> {
        let (title, description, due_date) = self.validated()?;
        Ok(TaskPatch {
            title: Some(title),
            description: Some(Some(description)),
            due_date: Some(due_date),
            priority: Some(self.priority),
            ..Default::default()
        })
    }
}

/// Client-side owner of the task list.
///
/// Local state only changes after the backend confirms a mutation; failures
/// become error notices and leave `tasks` untouched.
pub struct TaskListManager<A: TaskApi> {
    api: A,
    tasks: Vec<Task>,
    pub filters: Filters,
    editing: Option<TaskId>,
    pub edit_form: TaskForm,
    reminders: ReminderScheduler,
    reminder_rx: mpsc::UnboundedReceiver<Notice>,
    notices: VecDeque<Notice>,
}

impl<A: TaskApi> TaskListManager<A> {
    pub fn new(api: A) -> Self {
        let (tx, reminder_rx) = mpsc::unbounded_channel();
        Self {
            api,
            tasks: Vec::new(),
            filters: Filters::default(),
            editing: None,
            edit_form: TaskForm::default(),
            reminders: ReminderScheduler::new(tx),
            reminder_rx,
            notices: VecDeque::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] { &self.tasks }

    pub fn task(&self, id: &TaskId) -> Option<&Task> { self.tasks.iter().find(|t| &t.id == id) }

    pub fn editing(&self) -> Option<&TaskId> { self.editing.as_ref() }

    pub fn reminders(&mut self) -> &mut ReminderScheduler { &mut self.reminders }

    pub fn visible(&self, now: NaiveDateTime) -> Vec<&Task> { view::visible_tasks(&self.tasks, &self.filters, now) }

    /// Replaces the local list with the server's. On failure the last good list stays.
    pub async fn load(&mut self, now: NaiveDateTime) {
        match self.api.list().await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.reminders.reschedule_all(&self.tasks, now);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load tasks");
                self.notify(Notice::error("Failed to load tasks. Please check if the server is running."));
            }
        }
    }

    pub async fn add(&mut self, form: &TaskForm, now: NaiveDateTime) -> bool {
        let input = match form.to_new_task() {
            Ok(input) => input,
            Err(e) => { self.notify(Notice::error(e.to_string())); return false; }
        };
        match self.api.create(&input).await {
            Ok(task) => {
                self.reminders.schedule(&task, now);
                self.tasks.push(task);
                self.notify(Notice::success("Task added successfully!"));
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to add task");
                self.notify(Notice::error("Failed to add task. Please try again."));
                false
            }
        }
    }

    pub async fn toggle_status(&mut self, id: &TaskId, now: NaiveDateTime) -> bool {
        let Some(task) = self.task(id) else { return false };
        let status = task.status.toggled();
        match self.api.update(id, &TaskPatch::status_change(status, Utc::now())).await {
            Ok(updated) => {
                self.reminders.schedule(&updated, now);
                self.put(updated);
                let message = match status {
                    TaskStatus::Completed => "Task marked as completed!",
                    TaskStatus::Pending => "Task marked as pending!",
                };
                self.notify(Notice::success(message));
                true
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to update task");
                self.notify(Notice::error("Failed to update task. Please try again."));
                false
            }
        }
    }

    pub async fn delete(&mut self, id: &TaskId) -> bool {
        match self.api.delete(id).await {
            Ok(()) => {
                self.tasks.retain(|t| &t.id != id);
                self.reminders.cancel(id);
                if self.editing.as_ref() == Some(id) { self.close_editor(); }
                self.notify(Notice::success("Task deleted successfully!"));
                true
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to delete task");
                self.notify(Notice::error("Failed to delete task. Please try again."));
                false
            }
        }
    }

    pub fn open_editor(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.task(id) else { return false };
        self.edit_form = TaskForm::from_task(task);
        self.editing = Some(id.clone());
        true
    }

    pub fn close_editor(&mut self) {
        self.editing = None;
        self.edit_form = TaskForm::default();
    }

    /// Sends the edit form for the task being edited. No-op without an open editor.
    pub async fn save_edit(&mut self, now: NaiveDateTime) -> bool {
        let Some(id) = self.editing.clone() else { return false };
        let patch = match self.edit_form.to_patch() {
            Ok(patch) => patch,
            Err(e) => { self.notify(Notice::error(e.to_string())); return false; }
        };
        match self.api.update(&id, &patch).await {
            Ok(updated) => {
                self.reminders.schedule(&updated, now);
                self.put(updated);
                self.notify(Notice::success("Task updated successfully!"));
                self.close_editor();
                true
            }
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "failed to save task");
                self.notify(Notice::error("Failed to update task. Please try again."));
                false
            }
        }
    }

    /// Records the aggregate overdue warning, once per call.
    pub fn check_overdue(&mut self, now: NaiveDateTime) -> usize {
        let count = view::overdue_count(&self.tasks, now);
        if let Some(message) = view::overdue_message(count) { self.notify(Notice::warning(message)); }
        count
    }

    /// Moves fired reminders into the notice queue.
    pub fn poll_reminders(&mut self) -> usize {
        let mut fired = 0;
        while let Ok(notice) = self.reminder_rx.try_recv() {
            self.notify(notice);
            fired += 1;
        }
        fired
    }

    /// Oldest first.
    pub fn notices(&self) -> impl DoubleEndedIterator<Item = &Notice> { self.notices.iter() }

    pub fn latest_notice(&self) -> Option<&Notice> { self.notices.back() }

    fn notify(&mut self, notice: Notice) {
        match notice.kind {
            NoticeKind::Error => tracing::warn!(message = %notice.message, "notice"),
            _ => tracing::info!(message = %notice.message, "notice"),
        }
        if self.notices.len() == MAX_NOTICES { self.notices.pop_front(); }
        self.notices.push_back(notice);
    }

    fn put(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }
}
