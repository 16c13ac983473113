//! Pure list logic: filtering, ordering and due-date presentation.
//!
//! Everything here takes `now` explicitly and works on local wall-clock
//! time, matching how due dates are entered.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDateTime};

use crate::domain::task::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter { #[default] All, Only(Priority) }

impl PriorityFilter {
    pub fn cycle(self) -> Self {
        match self {
            PriorityFilter::All => PriorityFilter::Only(Priority::Low),
            PriorityFilter::Only(Priority::High) => PriorityFilter::All,
            PriorityFilter::Only(p) => PriorityFilter::Only(p.next()),
        }
    }

    pub fn label(self) -> &'static str {
        match self { PriorityFilter::All => "all", PriorityFilter::Only(p) => p.as_str() }
    }

    fn matches(self, task: &Task) -> bool {
        match self { PriorityFilter::All => true, PriorityFilter::Only(p) => task.priority == p }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter { #[default] All, Only(TaskStatus) }

impl StatusFilter {
    pub fn cycle(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(TaskStatus::Pending),
            StatusFilter::Only(TaskStatus::Pending) => StatusFilter::Only(TaskStatus::Completed),
            StatusFilter::Only(TaskStatus::Completed) => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self { StatusFilter::All => "all", StatusFilter::Only(s) => s.as_str() }
    }

    fn matches(self, task: &Task) -> bool {
        match self { StatusFilter::All => true, StatusFilter::Only(s) => task.status == s }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateBucket { #[default] All, Today, Tomorrow, ThisWeek, Overdue, DueSoon }

impl DateBucket {
    pub fn cycle(self) -> Self {
        match self {
            DateBucket::All => DateBucket::Today,
            DateBucket::Today => DateBucket::Tomorrow,
            DateBucket::Tomorrow => DateBucket::ThisWeek,
            DateBucket::ThisWeek => DateBucket::Overdue,
            DateBucket::Overdue => DateBucket::DueSoon,
            DateBucket::DueSoon => DateBucket::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateBucket::All => "all",
            DateBucket::Today => "today",
            DateBucket::Tomorrow => "tomorrow",
            DateBucket::ThisWeek => "this-week",
            DateBucket::Overdue => "overdue",
            DateBucket::DueSoon => "due-soon",
        }
    }

    pub fn matches(self, task: &Task, now: NaiveDateTime) -> bool {
        let due = task.due_date.naive();
        let day = due.date();
        let today = now.date();
        match self {
            DateBucket::All => true,
            DateBucket::Today => day == today,
            DateBucket::Tomorrow => day == today + Duration::days(1),
            DateBucket::ThisWeek => day >= today && day <= today + Duration::days(7),
            DateBucket::Overdue => task.is_overdue(now),
            DateBucket::DueSoon => task.is_pending() && due > now && due <= now + Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filters {
    pub priority: PriorityFilter,
    pub status: StatusFilter,
    pub date: DateBucket,
}

/// Narrows by priority, then status, then date bucket.
pub fn filter_tasks<'a>(tasks: &'a [Task], filters: &Filters, now: NaiveDateTime) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| filters.priority.matches(t))
        .filter(|t| filters.status.matches(t))
        .filter(|t| filters.date.matches(t, now))
        .collect()
}

/// Pending before completed, then high before low priority, then earliest due.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let done = |t: &Task| t.status == TaskStatus::Completed;
    done(a)
        .cmp(&done(b))
        .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
        .then_with(|| a.due_date.cmp(&b.due_date))
}

pub fn sort_tasks(tasks: &mut [&Task]) { tasks.sort_by(|a, b| compare_tasks(a, b)); }

pub fn visible_tasks<'a>(tasks: &'a [Task], filters: &Filters, now: NaiveDateTime) -> Vec<&'a Task> {
    let mut visible = filter_tasks(tasks, filters, now);
    sort_tasks(&mut visible);
    visible
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueClass { Overdue, DueSoon, Normal }

pub fn due_class(task: &Task, now: NaiveDateTime) -> DueClass {
    let due = task.due_date.naive();
    if task.is_overdue(now) {
        DueClass::Overdue
    } else if task.is_pending() && due > now && due - now < Duration::hours(24) {
        DueClass::DueSoon
    } else {
        DueClass::Normal
    }
}

/// Relative due text, counted in calendar days rather than elapsed hours.
pub fn format_due(due: NaiveDateTime, now: NaiveDateTime) -> String {
    let days = (due.date() - now.date()).num_days();
    let time = due.format("%H:%M");
    match days {
        d if d < 0 => format!("Overdue by {} day{}", -d, plural(-d)),
        0 => format!("Due today at {time}"),
        1 => format!("Due tomorrow at {time}"),
        d => format!("Due in {d} days at {time}"),
    }
}

pub fn overdue_count(tasks: &[Task], now: NaiveDateTime) -> usize {
    tasks.iter().filter(|t| t.is_overdue(now)).count()
}

pub fn overdue_message(count: usize) -> Option<String> {
    (count > 0).then(|| format!("You have {count} overdue task{}!", plural(count as i64)))
}

fn plural(n: i64) -> &'static str { if n == 1 { "" } else { "s" } }
