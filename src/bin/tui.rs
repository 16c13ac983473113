use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal, widgets::{Block, Borders, List, ListItem, Paragraph, ListState}, layout::{Layout, Constraint, Direction}, style::{Style, Modifier, Color}};

use task_reminder::{
    client::{
        api::{HttpTaskApi, TaskApi},
        manager::{TaskForm, TaskListManager},
        notice::NoticeKind,
        reminder::OVERDUE_SWEEP_INTERVAL,
        view::{self, DueClass},
    },
    config::ClientConfig,
    domain::task::{TaskId, TaskStatus},
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = ClientConfig::from_env();
    let mut manager = TaskListManager::new(HttpTaskApi::new(config.api_url.clone()));
    manager.load(local_now()).await;
    manager.check_overdue(local_now());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, manager, &config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn local_now() -> NaiveDateTime { Local::now().naive_local() }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode { View, Create, Edit }

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field { Title, Description, Date, Time, Priority }

impl Field {
    fn next(self) -> Self {
        match self { Field::Title => Field::Description, Field::Description => Field::Date, Field::Date => Field::Time, Field::Time => Field::Priority, Field::Priority => Field::Title }
    }

    fn label(self) -> &'static str {
        match self { Field::Title => "Title", Field::Description => "Desc", Field::Date => "Date", Field::Time => "Time", Field::Priority => "Priority" }
    }
}

struct App<A: TaskApi> {
    manager: TaskListManager<A>,
    selected: usize,
    list_state: ListState,
    mode: Mode,
    field: Field,
    draft: TaskForm,
    last_sweep: Instant,
}

impl<A: TaskApi> App<A> {
    fn selected_id(&self, now: NaiveDateTime) -> Option<TaskId> {
        self.manager.visible(now).get(self.selected).map(|t| t.id.clone())
    }

    fn clamp_selection(&mut self, now: NaiveDateTime) {
        let len = self.manager.visible(now).len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    fn form_mut(&mut self) -> &mut TaskForm {
        match self.mode { Mode::Edit => &mut self.manager.edit_form, _ => &mut self.draft }
    }

    fn form(&self) -> &TaskForm {
        match self.mode { Mode::Edit => &self.manager.edit_form, _ => &self.draft }
    }
}

fn edit_field(form: &mut TaskForm, field: Field, key: KeyCode) {
    let text = match field {
        Field::Title => &mut form.title,
        Field::Description => &mut form.description,
        Field::Date => &mut form.date,
        Field::Time => &mut form.time,
        Field::Priority => {
            if matches!(key, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) { form.priority = form.priority.next(); }
            return;
        }
    };
    match key {
        KeyCode::Backspace => { text.pop(); }
        KeyCode::Char(c) => text.push(c),
        _ => {}
    }
}

async fn run_app<A: TaskApi>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, manager: TaskListManager<A>, config: &ClientConfig) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App { manager, selected: 0, list_state: ListState::default(), mode: Mode::View, field: Field::Title, draft: TaskForm::default(), last_sweep: Instant::now() };

    loop {
        let now = local_now();
        app.manager.poll_reminders();
        if app.last_sweep.elapsed() >= OVERDUE_SWEEP_INTERVAL {
            app.last_sweep = Instant::now();
            app.manager.check_overdue(now);
        }
        app.clamp_selection(now);

        let visible = app.manager.visible(now);
        let mut rows: Vec<ListItem> = visible.iter().map(|t| {
            let mark = match t.status { TaskStatus::Pending => "[ ]", TaskStatus::Completed => "[x]" };
            let style = match view::due_class(t, now) {
                DueClass::Overdue => Style::default().fg(Color::Red),
                DueClass::DueSoon => Style::default().fg(Color::Yellow),
                DueClass::Normal if t.status == TaskStatus::Completed => Style::default().fg(Color::DarkGray),
                DueClass::Normal => Style::default(),
            };
            ListItem::new(format!("{} {:<6} {}  ({})", mark, t.priority.as_str(), t.title, view::format_due(t.due_date.naive(), now))).style(style)
        }).collect();
        if visible.is_empty() {
            let placeholder = if app.manager.tasks().is_empty() {
                "No tasks found. Add your first task to get started!"
            } else {
                "No tasks match your current filters."
            };
            rows.push(ListItem::new(placeholder).style(Style::default().fg(Color::DarkGray)));
        }
        let detail = match app.selected_id(now).and_then(|id| app.manager.task(&id).cloned()) {
            Some(t) => format!(
                "Title:\n{}\n\nStatus: {}\nPriority: {}\nDue: {}\n\nDescription:\n{}",
                t.title, t.status.as_str(), t.priority.as_str(), t.due_date,
                t.description.clone().filter(|d| !d.is_empty()).unwrap_or_else(|| "(no description)".to_string()),
            ),
            None => String::new(),
        };
        let filters = app.manager.filters;
        let list_title = format!("tasks [priority={} status={} date={}]", filters.priority.label(), filters.status.label(), filters.date.label());
        let footer_text = match app.mode {
            Mode::View => {
                // newest first, two lines fit the footer
                let recent: Vec<&str> = app.manager.notices().rev().take(2).map(|n| n.message.as_str()).collect();
                if recent.is_empty() { format!("TASKS_API_URL={}", config.api_url) } else { recent.join("\n") }
            }
            Mode::Create | Mode::Edit => {
                let form = app.form();
                let value = match app.field {
                    Field::Title => form.title.clone(),
                    Field::Description => form.description.clone(),
                    Field::Date => form.date.clone(),
                    Field::Time => form.time.clone(),
                    Field::Priority => form.priority.as_str().to_string(),
                };
                format!("{}: {}_  |  (Tab to switch, Space cycles priority, Enter to save, Esc to cancel)", app.field.label(), value)
            }
        };
        let footer_style = match (app.mode, app.manager.latest_notice().map(|n| n.kind)) {
            (Mode::View, Some(NoticeKind::Error)) => Style::default().fg(Color::Red),
            (Mode::View, Some(NoticeKind::Warning)) => Style::default().fg(Color::Yellow),
            (Mode::View, Some(NoticeKind::Success)) => Style::default().fg(Color::Green),
            _ => Style::default(),
        };

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(4)])
                .split(f.size());

            let header = Paragraph::new("Tasks (Enter: complete/undo, n: new, e: edit, d: delete, p/s/f: filters, r: reload, q: quit)")
                .block(Block::default().borders(Borders::ALL).title("task-reminder"));
            f.render_widget(header, chunks[0]);

            let middle = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            let list = List::new(rows)
                .block(Block::default().borders(Borders::ALL).title(list_title))
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
                .highlight_symbol(">> ");
            f.render_stateful_widget(list, middle[0], &mut app.list_state);

            let details = Paragraph::new(detail)
                .block(Block::default().borders(Borders::ALL).title("details"));
            f.render_widget(details, middle[1]);

            let footer = Paragraph::new(footer_text)
                .style(footer_style)
                .block(Block::default().borders(Borders::ALL).title(match app.mode { Mode::View => "info", Mode::Create => "create", Mode::Edit => "edit" }));
            f.render_widget(footer, chunks[2]);
        })?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind != KeyEventKind::Press { continue; }
                match app.mode {
                    Mode::View => match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::Up => { if app.selected > 0 { app.selected -= 1; } }
                        KeyCode::Down => { let len = app.manager.visible(now).len(); if app.selected + 1 < len { app.selected += 1; } }
                        KeyCode::Enter => {
                            if let Some(id) = app.selected_id(now) { app.manager.toggle_status(&id, now).await; }
                        }
                        KeyCode::Char('n') => {
                            app.mode = Mode::Create;
                            app.field = Field::Title;
                            app.draft = TaskForm::new_for(now.date());
                        }
                        KeyCode::Char('e') => {
                            if let Some(id) = app.selected_id(now) {
                                if app.manager.open_editor(&id) { app.mode = Mode::Edit; app.field = Field::Title; }
                            }
                        }
                        KeyCode::Char('d') => {
                            if let Some(id) = app.selected_id(now) {
                                if app.manager.delete(&id).await && app.selected > 0 { app.selected -= 1; }
                            }
                        }
                        KeyCode::Char('p') => app.manager.filters.priority = app.manager.filters.priority.cycle(),
                        KeyCode::Char('s') => app.manager.filters.status = app.manager.filters.status.cycle(),
                        KeyCode::Char('f') => app.manager.filters.date = app.manager.filters.date.cycle(),
                        KeyCode::Char('r') => app.manager.load(now).await,
                        _ => {}
                    },
                    Mode::Create | Mode::Edit => match key.code {
                        KeyCode::Esc => {
                            if app.mode == Mode::Edit { app.manager.close_editor(); }
                            app.mode = Mode::View;
                            app.draft = TaskForm::default();
                        }
                        KeyCode::Enter => {
                            let saved = match app.mode {
                                Mode::Edit => app.manager.save_edit(now).await,
                                _ => { let draft = app.draft.clone(); app.manager.add(&draft, now).await }
                            };
                            if saved { app.mode = Mode::View; app.draft = TaskForm::default(); }
                        }
                        KeyCode::Tab => { app.field = app.field.next(); }
                        code => { let field = app.field; edit_field(app.form_mut(), field, code); }
                    },
                }
            }
        }
    }
    Ok(())
}
