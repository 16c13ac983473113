use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::client::notice::Notice;
use crate::domain::task::{Task, TaskId};

pub const REMINDER_LEAD_MINUTES: i64 = 15;
pub const OVERDUE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long until a reminder should fire, or `None` if its moment has passed.
pub fn reminder_delay(due: NaiveDateTime, now: NaiveDateTime) -> Option<Duration> {
    let fire_at = due - chrono::Duration::minutes(REMINDER_LEAD_MINUTES);
    (fire_at - now).to_std().ok().filter(|delay| !delay.is_zero())
}

/// One-shot reminder timers keyed by task id. Fired reminders are sent down
/// the notice channel.
pub struct ReminderScheduler {
    timers: HashMap<TaskId, JoinHandle<()>>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl ReminderScheduler {
    pub fn new(notices: mpsc::UnboundedSender<Notice>) -> Self {
        Self { timers: HashMap::new(), notices }
    }

    /// Replaces any timer already held for `task`. Completed tasks and tasks
    /// inside the lead window end up with no timer.
    pub fn schedule(&mut self, task: &Task, now: NaiveDateTime) -> Option<Duration> {
        self.cancel(&task.id);
        self.prune();
        if !task.is_pending() { return None; }
        let delay = reminder_delay(task.due_date.naive(), now)?;

        let notices = self.notices.clone();
        let id = task.id.clone();
        let title = task.title.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(task_id = %id, "reminder fired");
            let _ = notices.send(Notice::warning(format!("Reminder: \"{title}\" is due soon!")));
        });
        tracing::debug!(task_id = %task.id, delay_secs = delay.as_secs(), "reminder scheduled");
        self.timers.insert(task.id.clone(), handle);
        Some(delay)
    }

    pub fn cancel(&mut self, id: &TaskId) -> bool {
        match self.timers.remove(id) {
            Some(handle) => { handle.abort(); true }
            None => false,
        }
    }

    /// Rebuilds every timer from scratch, e.g. after the task list is reloaded.
    pub fn reschedule_all(&mut self, tasks: &[Task], now: NaiveDateTime) {
        self.cancel_all();
        for task in tasks { self.schedule(task, now); }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.timers.drain() { handle.abort(); }
    }

    pub fn is_scheduled(&self, id: &TaskId) -> bool {
        self.timers.get(id).is_some_and(|handle| !handle.is_finished())
    }

    pub fn pending(&mut self) -> usize {
        self.prune();
        self.timers.len()
    }

    fn prune(&mut self) { self.timers.retain(|_, handle| !handle.is_finished()); }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) { self.cancel_all(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{DueDate, NewTask, Priority, TaskStatus};
    use chrono::{NaiveDate, Utc};

    fn now() -> NaiveDateTime { NaiveDate::from_ymd_opt(2025, 1, 10).unwrap().and_hms_opt(9, 0, 0).unwrap() }

    fn due_in(minutes: i64, title: &str) -> Task {
        let input = NewTask {
            title: title.into(),
            description: None,
            due_date: DueDate::new(now() + chrono::Duration::minutes(minutes)),
            priority: Priority::Medium,
            status: TaskStatus::Pending,
        };
        Task::new(TaskId::from("1"), input, Utc::now())
    }

    #[test]
    fn delay_is_due_minus_lead() {
        let due = now() + chrono::Duration::minutes(20);
        assert_eq!(reminder_delay(due, now()), Some(Duration::from_secs(5 * 60)));
        assert_eq!(reminder_delay(now() + chrono::Duration::minutes(10), now()), None);
        assert_eq!(reminder_delay(now() + chrono::Duration::minutes(15), now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = ReminderScheduler::new(tx);
        let start = tokio::time::Instant::now();
        assert_eq!(scheduler.schedule(&due_in(20, "Pay bills"), now()), Some(Duration::from_secs(300)));

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice, Notice::warning("Reminder: \"Pay bills\" is due soon!"));
        assert!(start.elapsed() >= Duration::from_secs(300));
        tokio::task::yield_now().await;
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_scheduled_inside_lead_window() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = ReminderScheduler::new(tx);
        let task = due_in(10, "Soon");
        assert_eq!(scheduler.schedule(&task, now()), None);
        assert!(!scheduler.is_scheduled(&task.id));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_old_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = ReminderScheduler::new(tx);
        let start = tokio::time::Instant::now();
        scheduler.schedule(&due_in(20, "old"), now());
        scheduler.schedule(&due_in(30, "new"), now());
        assert_eq!(scheduler.pending(), 1);

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.message, "Reminder: \"new\" is due soon!");
        assert!(start.elapsed() >= Duration::from_secs(15 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_tasks_drop_their_timer() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = ReminderScheduler::new(tx);
        let mut task = due_in(20, "a");
        scheduler.schedule(&task, now());
        task.status = TaskStatus::Completed;
        assert_eq!(scheduler.schedule(&task, now()), None);
        assert!(!scheduler.is_scheduled(&task.id));
        assert!(!scheduler.cancel(&task.id));
    }
}
