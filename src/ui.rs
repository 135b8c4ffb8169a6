use crate::api::ApiClient;
use crate::app::{App, Command, ComposeField, InputMode};
use crate::auth::{LoginField, SignupField};
use crate::models::{Filter, Priority, Todo};
use crate::routes::Route;
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key_hint(keys: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(keys, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(route: Route, input_mode: InputMode) -> Text<'static> {
    let hints: Vec<[Span<'static>; 2]> = match (route, input_mode) {
        (Route::Signup, _) => vec![
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Enter ", ": Sign Up "),
            key_hint(" F2 ", ": Login "),
            key_hint(" F5 ", ": Test Backend Connection "),
            key_hint(" Esc ", ": Quit "),
        ],
        (Route::Login, _) => vec![
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Enter ", ": Login "),
            key_hint(" F2 ", ": Sign Up "),
            key_hint(" Esc ", ": Quit "),
        ],
        (_, InputMode::Normal) => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Down/Up "),
            key_hint(" a ", ": Add "),
            key_hint(" Space ", ": Toggle "),
            key_hint(" e ", ": Edit "),
            key_hint(" d ", ": Delete "),
            key_hint(" f/1/2/3 ", ": Filter "),
            key_hint(" r ", ": Refresh "),
            key_hint(" L ", ": Logout "),
        ],
        (_, InputMode::Compose) => vec![
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Space ", ": Cycle Priority "),
            key_hint(" F3 ", ": Quick-add "),
            key_hint(" Enter ", ": Add Task "),
            key_hint(" Esc ", ": Close "),
        ],
        (_, InputMode::Editing) => vec![
            key_hint(" Enter ", ": Save "),
            key_hint(" Esc ", ": Cancel "),
        ],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Medium => Style::default().fg(Color::Yellow),
        Priority::Low => Style::default().fg(Color::Green),
    }
}

fn due_label(todo: &Todo) -> Option<String> {
    todo.due_day().map(|day| day.format("%b %-d, %Y").to_string())
}

pub async fn run_app<B: Backend, C: ApiClient>(
    terminal: &mut Terminal<B>,
    mut app: App<C>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        // Draw first so the screen shows the request as in flight.
        if app.pending.is_some() {
            app.run_pending().await;
            continue;
        }
        if app.should_quit {
            return Ok(());
        }

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
}

fn draw<C: ApiClient>(f: &mut Frame, app: &mut App<C>) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    let header = Line::from(vec![
        Span::styled(
            " Todo Pro ",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.route.path(), Style::default().fg(Color::DarkGray)),
        Span::styled(
            if app.session.current_user().is_some() {
                "  signed in"
            } else {
                ""
            },
            Style::default().fg(Color::Green),
        ),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    match app.route {
        Route::Signup => draw_signup(f, app, chunks[1]),
        Route::Login => draw_login(f, app, chunks[1]),
        Route::Board => draw_board(f, app, chunks[1]),
        Route::Root => {}
    }

    let status = match (&app.pending, &app.status) {
        (Some(_), _) => Span::styled(" Working...", Style::default().fg(Color::Cyan)),
        (None, Some(message)) => Span::styled(
            format!(" {}", message),
            Style::default().fg(Color::Yellow),
        ),
        (None, None) => Span::raw(""),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[2]);

    let legend = Paragraph::new(get_legend(app.route, app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[3]);
}

fn field_line(label: &'static str, value: String, focused: bool) -> Line<'static> {
    let value_style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("{}{}", value, cursor), value_style),
    ])
}

fn masked(secret: &str) -> String {
    "*".repeat(secret.chars().count())
}

fn error_line(error: &Option<String>) -> Line<'static> {
    match error {
        Some(message) => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(""),
    }
}

fn draw_signup<C: ApiClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let form = &app.signup;
    let submit = if app.pending == Some(Command::Signup) {
        "Creating Account..."
    } else {
        "[ Enter ] Sign Up"
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("API URL: ", Style::default().fg(Color::Blue)),
            Span::raw(app.client.base_url().to_string()),
        ]),
        Line::from(Span::styled(
            app.probe_result.clone().unwrap_or_default(),
            Style::default().fg(Color::Blue),
        )),
        error_line(&form.error),
        field_line("Name:     ", form.name.clone(), form.focus == SignupField::Name),
        field_line("Email:    ", form.email.clone(), form.focus == SignupField::Email),
        field_line(
            "Password: ",
            masked(&form.password),
            form.focus == SignupField::Password,
        ),
        Line::from(""),
        Line::from(Span::styled(submit, Style::default().fg(Color::Magenta))),
    ];
    lines.push(Line::from(Span::styled(
        "Already have an account? Press F2 to log in.",
        Style::default().fg(Color::DarkGray),
    )));

    let popup_area = centered_rect_absolute(64, lines.len() as u16 + 2, area);
    let block = Block::default()
        .title("Sign Up")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Magenta));
    f.render_widget(Clear, popup_area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn draw_login<C: ApiClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let form = &app.login;
    let submit = if app.pending == Some(Command::Login) {
        "Logging in..."
    } else {
        "[ Enter ] Login"
    };

    let lines = vec![
        error_line(&form.error),
        field_line("Email:    ", form.email.clone(), form.focus == LoginField::Email),
        field_line(
            "Password: ",
            masked(&form.password),
            form.focus == LoginField::Password,
        ),
        Line::from(""),
        Line::from(Span::styled(submit, Style::default().fg(Color::Magenta))),
        Line::from(Span::styled(
            "No account yet? Press F2 to sign up.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let popup_area = centered_rect_absolute(64, lines.len() as u16 + 2, area);
    let block = Block::default()
        .title("Login")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Magenta));
    f.render_widget(Clear, popup_area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn filter_bar<C: ApiClient>(app: &App<C>) -> Line<'static> {
    let mut spans = Vec::new();
    for filter in [Filter::All, Filter::Pending, Filter::Completed] {
        let label = format!(" {} ({}) ", filter.label(), app.board.count(filter));
        let style = if app.board.filter() == filter {
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn todo_row(todo: &Todo, editing: Option<&str>) -> ListItem<'static> {
    if let Some(text) = editing {
        return ListItem::new(Line::from(vec![
            Span::styled("edit> ", Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("{}_", text),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }

    let check = if todo.completed { "[x] " } else { "[ ] " };
    let text_style = if todo.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw(check),
        Span::styled(todo.text.clone(), text_style),
        Span::raw(" "),
        Span::styled(
            todo.priority.as_str().to_uppercase(),
            priority_style(todo.priority),
        ),
    ];
    if let Some(due) = due_label(todo) {
        spans.push(Span::styled(
            format!("  Due: {}", due),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn draw_board<C: ApiClient>(f: &mut Frame, app: &mut App<C>, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
        .split(area);
    f.render_widget(Paragraph::new(filter_bar(app)), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)].as_ref())
        .split(rows[1]);

    let list_title = format!("Todos ({})", app.board.filter().label());
    let visible = app.board.visible();
    let editing = app.board.editing();

    let tasks_widget = if !visible.is_empty() {
        let items: Vec<ListItem> = visible
            .iter()
            .map(|todo| {
                let edit_text = editing
                    .filter(|edit| edit.id == todo.id)
                    .map(|edit| edit.text.as_str());
                todo_row(todo, edit_text)
            })
            .collect();

        List::new(items)
            .block(Block::default().borders(Borders::ALL).title(list_title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    } else {
        List::new(vec![ListItem::new(app.board.filter().empty_message())])
            .block(Block::default().borders(Borders::ALL).title(list_title))
    };

    let selected = app
        .state
        .selected()
        .and_then(|i| visible.get(i))
        .map(|todo| (*todo).clone());

    f.render_stateful_widget(tasks_widget, chunks[0], &mut app.state);

    // Right panel: details of the highlighted todo
    let detail_block = Block::default().borders(Borders::ALL).title("Details");
    match selected {
        Some(todo) => {
            let bold = Style::default().add_modifier(Modifier::BOLD);
            let lines = vec![
                Line::from(vec![Span::styled("Task: ", bold), Span::raw(todo.text.clone())]),
                Line::from(vec![
                    Span::styled("Status: ", bold),
                    Span::raw(if todo.completed { "Completed" } else { "Pending" }),
                ]),
                Line::from(vec![
                    Span::styled("Priority: ", bold),
                    Span::styled(todo.priority.as_str(), priority_style(todo.priority)),
                ]),
                Line::from(vec![
                    Span::styled("Due Date: ", bold),
                    Span::raw(due_label(&todo).unwrap_or_else(|| "No due date".to_string())),
                ]),
            ];
            f.render_widget(
                Paragraph::new(lines)
                    .block(detail_block)
                    .wrap(Wrap { trim: true }),
                chunks[1],
            );
        }
        None => {
            f.render_widget(
                Paragraph::new("Press a to add a task")
                    .block(detail_block)
                    .wrap(Wrap { trim: true }),
                chunks[1],
            );
        }
    }

    if app.input_mode == InputMode::Compose {
        draw_compose(f, app, area);
    }
}

fn draw_compose<C: ApiClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let compose = &app.board.compose;
    let popup_width = (area.width * 60 / 100).saturating_sub(2).max(20);

    let text_lines = std::cmp::max(
        calculate_wrapped_lines(&compose.text, popup_width.saturating_sub(6)),
        1,
    ) as u16;
    // text + due date + priority + hint, plus borders
    let popup_height = std::cmp::min(text_lines + 3 + 2, area.height.saturating_sub(2));
    let popup_area = centered_rect_absolute(popup_width + 2, popup_height, area);

    let focus = app.compose_field;
    let lines = vec![
        field_line("Task: ", compose.text.clone(), focus == ComposeField::Text),
        field_line(
            "Due (YYYY-MM-DD): ",
            compose.due_date.clone(),
            focus == ComposeField::DueDate,
        ),
        field_line(
            "Priority: ",
            format!("< {} >", compose.priority),
            focus == ComposeField::Priority,
        ),
        Line::from(Span::styled(
            if compose.quick_add {
                "Quick-add on (F3): !high !medium !low due:YYYY-MM-DD"
            } else {
                "Quick-add off (F3): title is sent as typed"
            },
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let popup_block = Block::default()
        .title("New Task (Press Enter to Submit)")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));

    f.render_widget(Clear, popup_area);
    f.render_widget(
        Paragraph::new(lines)
            .block(popup_block)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn calculate_wrapped_lines(text: &str, max_width: u16) -> usize {
    let max_width = max_width.max(1) as usize;
    let mut line_count = 0;
    for line in text.lines() {
        let line_width = line.chars().count();
        line_count += std::cmp::max(line_width.div_ceil(max_width), 1);
    }
    line_count
}
