use crate::api::ApiClient;
use crate::auth::{LoginForm, SignupForm};
use crate::board::{BoardError, TaskBoard};
use crate::models::Filter;
use crate::routes::{self, Route};
use crate::session::Session;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Compose,
    Editing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposeField {
    Text,
    DueDate,
    Priority,
}

/// Network work queued by a key press, run after the next redraw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Load,
    Create,
    Toggle(String),
    SaveEdit(String),
    Delete(String),
    Signup,
    Login,
    Probe,
}

pub struct App<C> {
    pub route: Route,
    pub session: Session,
    pub client: C,
    pub board: TaskBoard,
    pub signup: SignupForm,
    pub login: LoginForm,
    pub state: ListState,
    pub input_mode: InputMode,
    pub compose_field: ComposeField,
    pub status: Option<String>,
    pub probe_result: Option<String>,
    pub pending: Option<Command>,
    pub should_quit: bool,
}

impl<C: ApiClient> App<C> {
    pub fn new(session: Session, client: C, start: Route) -> App<C> {
        let mut app = App {
            route: Route::Root,
            session,
            client,
            board: TaskBoard::new(),
            signup: SignupForm::default(),
            login: LoginForm::default(),
            state: ListState::default(),
            input_mode: InputMode::Normal,
            compose_field: ComposeField::Text,
            status: None,
            probe_result: None,
            pending: None,
            should_quit: false,
        };
        app.navigate(start);
        app
    }

    /// Moves to `route`, letting the guard pick where we actually land.
    pub fn navigate(&mut self, route: Route) {
        let landed = routes::resolve(route, &self.session);
        if landed != route {
            tracing::info!(requested = route.path(), landed = landed.path(), "navigation redirected");
        }
        self.route = landed;
        self.input_mode = InputMode::Normal;
        if landed.is_protected() {
            self.pending = Some(Command::Load);
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.board.clear();
        self.state.select(None);
        self.status = None;
        // re-check the current view against the emptied session
        self.navigate(self.route);
    }

    pub fn selected_id(&self) -> Option<String> {
        let visible = self.board.visible();
        self.state
            .selected()
            .and_then(|i| visible.get(i))
            .map(|todo| todo.id.clone())
    }

    pub fn next(&mut self) {
        let len = self.board.visible().len();
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.board.visible().len();
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn clamp_selection(&mut self) {
        let len = self.board.visible().len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            Some(_) => {}
        }
    }

    fn set_filter(&mut self, filter: Filter) {
        self.board.set_filter(filter);
        self.state.select(None);
        self.clamp_selection();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.pending.is_some() {
            return;
        }
        match self.route {
            Route::Signup => self.handle_signup_key(key),
            Route::Login => self.handle_login_key(key),
            Route::Board => self.handle_board_key(key),
            Route::Root => self.navigate(Route::Root),
        }
    }

    fn handle_signup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.signup.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.signup.previous_field(),
            KeyCode::Enter => self.pending = Some(Command::Signup),
            KeyCode::F(2) => self.navigate(Route::Login),
            KeyCode::F(5) => self.pending = Some(Command::Probe),
            KeyCode::Backspace => {
                self.signup.focused_mut().pop();
            }
            KeyCode::Char(c) => self.signup.focused_mut().push(c),
            _ => {}
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.login.next_field()
            }
            KeyCode::Enter => self.pending = Some(Command::Login),
            KeyCode::F(2) => self.navigate(Route::Signup),
            KeyCode::Backspace => {
                self.login.focused_mut().pop();
            }
            KeyCode::Char(c) => self.login.focused_mut().push(c),
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('a') => {
                    self.input_mode = InputMode::Compose;
                    self.compose_field = ComposeField::Text;
                }
                KeyCode::Char(' ') | KeyCode::Char('x') => {
                    if let Some(id) = self.selected_id() {
                        self.pending = Some(Command::Toggle(id));
                    }
                }
                KeyCode::Char('e') => {
                    if let Some(id) = self.selected_id() {
                        if self.board.start_edit(&id) {
                            self.input_mode = InputMode::Editing;
                        }
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = self.selected_id() {
                        self.pending = Some(Command::Delete(id));
                    }
                }
                KeyCode::Char('f') => self.set_filter(self.board.filter().next()),
                KeyCode::Char('1') => self.set_filter(Filter::All),
                KeyCode::Char('2') => self.set_filter(Filter::Pending),
                KeyCode::Char('3') => self.set_filter(Filter::Completed),
                KeyCode::Char('r') => self.pending = Some(Command::Load),
                KeyCode::Char('L') => self.logout(),
                _ => {}
            },
            InputMode::Compose => match key.code {
                KeyCode::Esc => self.input_mode = InputMode::Normal,
                KeyCode::Enter => self.pending = Some(Command::Create),
                KeyCode::F(3) => self.board.compose.quick_add = !self.board.compose.quick_add,
                KeyCode::Tab => {
                    self.compose_field = match self.compose_field {
                        ComposeField::Text => ComposeField::DueDate,
                        ComposeField::DueDate => ComposeField::Priority,
                        ComposeField::Priority => ComposeField::Text,
                    };
                }
                _ => match self.compose_field {
                    ComposeField::Text => edit_line(&mut self.board.compose.text, key.code),
                    ComposeField::DueDate => {
                        edit_line(&mut self.board.compose.due_date, key.code)
                    }
                    ComposeField::Priority => {
                        if matches!(
                            key.code,
                            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right
                        ) {
                            self.board.compose.priority = self.board.compose.priority.next();
                        }
                    }
                },
            },
            InputMode::Editing => match key.code {
                KeyCode::Esc => {
                    self.board.cancel_edit();
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Enter => {
                    if let Some(edit) = self.board.editing() {
                        self.pending = Some(Command::SaveEdit(edit.id.clone()));
                    }
                }
                code => {
                    if let Some(text) = self.board.edit_text_mut() {
                        edit_line(text, code);
                    }
                }
            },
        }
    }

    /// Runs whatever the last key press queued.
    pub async fn run_pending(&mut self) {
        let Some(command) = self.pending.take() else {
            return;
        };
        tracing::debug!(?command, "running command");

        match command {
            Command::Load => {
                if self.board.load(&self.client).await.is_err() {
                    self.status = Some("Could not refresh todos; showing last known list.".into());
                } else {
                    self.status = None;
                }
                self.clamp_selection();
            }
            Command::Create => {
                let result = self.board.create(&self.client).await;
                if result.is_ok() {
                    self.input_mode = InputMode::Normal;
                    self.compose_field = ComposeField::Text;
                }
                self.report(result);
                self.clamp_selection();
            }
            Command::Toggle(id) => {
                let result = self.board.toggle(&self.client, &id).await;
                self.report(result);
                self.clamp_selection();
            }
            Command::SaveEdit(id) => {
                let result = self.board.save_edit(&self.client, &id).await;
                if result.is_ok() {
                    self.input_mode = InputMode::Normal;
                }
                self.report(result);
            }
            Command::Delete(id) => {
                let result = self.board.delete(&self.client, &id).await;
                self.report(result);
                self.clamp_selection();
            }
            Command::Signup => {
                if let Some(next) = self.signup.submit(&self.client).await {
                    self.status = Some("Account created. Please log in.".into());
                    self.navigate(next);
                }
            }
            Command::Login => {
                if let Some(next) = self.login.submit(&self.client, &mut self.session).await {
                    self.status = None;
                    self.navigate(next);
                }
            }
            Command::Probe => {
                self.probe_result = Some(match self.client.probe().await {
                    Ok(status) => format!("Backend responded with {}", status),
                    Err(err) => format!("Backend unreachable: {}", err),
                });
            }
        }
    }

    // Board failures stay quiet apart from the status line.
    fn report(&mut self, result: Result<(), BoardError>) {
        self.status = match result {
            Ok(()) => None,
            Err(BoardError::Request(_)) => Some("Request failed; nothing was changed.".into()),
            Err(err) => Some(err.to_string()),
        };
    }
}

fn edit_line(buffer: &mut String, code: KeyCode) {
    match code {
        KeyCode::Char(c) => buffer.push(c),
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::FakeAuthApi;
    use crate::board::tests::{todo, FakeTodoApi};
    use crate::error::RequestError;
    use crate::models::{LoginRequest, LoginResponse, NewTodo, Priority, SignupRequest, Todo};
    use crate::api::{AuthApi, TodoApi};
    use crate::token_store::{MemoryTokenStore, TokenStore};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeBackend {
        auth: FakeAuthApi,
        todos: FakeTodoApi,
    }

    impl AuthApi for FakeBackend {
        async fn signup(&self, request: &SignupRequest) -> Result<(), RequestError> {
            self.auth.signup(request).await
        }

        async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, RequestError> {
            self.auth.login(request).await
        }
    }

    impl TodoApi for FakeBackend {
        async fn list_todos(&self) -> Result<Vec<Todo>, RequestError> {
            self.todos.list_todos().await
        }

        async fn create_todo(&self, new: &NewTodo) -> Result<Todo, RequestError> {
            self.todos.create_todo(new).await
        }

        async fn toggle_todo(&self, id: &str) -> Result<Todo, RequestError> {
            self.todos.toggle_todo(id).await
        }

        async fn update_todo_text(&self, id: &str, text: &str) -> Result<Todo, RequestError> {
            self.todos.update_todo_text(id, text).await
        }

        async fn delete_todo(&self, id: &str) -> Result<(), RequestError> {
            self.todos.delete_todo(id).await
        }
    }

    impl ApiClient for FakeBackend {
        fn base_url(&self) -> &str {
            "http://fake.test"
        }

        async fn probe(&self) -> Result<u16, RequestError> {
            Ok(200)
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App<FakeBackend>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app_with(store: Arc<MemoryTokenStore>, todos: Vec<Todo>, start: Route) -> App<FakeBackend> {
        let backend = FakeBackend {
            todos: FakeTodoApi::with(todos),
            ..FakeBackend::default()
        };
        App::new(Session::new(store), backend, start)
    }

    #[test]
    fn test_starts_on_signup_from_root() {
        let app = app_with(Arc::new(MemoryTokenStore::default()), vec![], Route::Root);
        assert_eq!(app.route, Route::Signup);
        assert_eq!(app.pending, None);
    }

    #[test]
    fn test_board_without_token_lands_on_login() {
        let app = app_with(Arc::new(MemoryTokenStore::default()), vec![], Route::Board);
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_restored_session_loads_board() {
        let store = Arc::new(MemoryTokenStore::with_token("saved"));
        let mut app = app_with(store, vec![todo("a", "Buy milk", false)], Route::Board);
        assert_eq!(app.route, Route::Board);
        assert_eq!(app.pending, Some(Command::Load));

        app.run_pending().await;
        assert_eq!(app.board.todos().len(), 1);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[tokio::test]
    async fn test_login_flow_reaches_board() {
        let store = Arc::new(MemoryTokenStore::default());
        let mut app = app_with(store.clone(), vec![todo("a", "Buy milk", false)], Route::Login);

        type_text(&mut app, "ada@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "secret");
        app.handle_key(key(KeyCode::Enter));
        app.run_pending().await;

        assert_eq!(app.route, Route::Board);
        assert!(store.get().is_some());
        app.run_pending().await;
        assert_eq!(app.board.todos().len(), 1);
    }

    #[tokio::test]
    async fn test_signup_then_login_screen() {
        let mut app = app_with(Arc::new(MemoryTokenStore::default()), vec![], Route::Signup);
        type_text(&mut app, "Ada");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "ada@example.com");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "pw");
        app.handle_key(key(KeyCode::Enter));
        app.run_pending().await;

        assert_eq!(app.route, Route::Login);
        assert!(!app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_compose_toggle_edit_delete_on_board() {
        let store = Arc::new(MemoryTokenStore::with_token("saved"));
        let mut app = app_with(store, vec![], Route::Board);
        app.run_pending().await;

        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(key(KeyCode::F(3)));
        type_text(&mut app, "Buy milk !high");
        app.handle_key(key(KeyCode::Enter));
        app.run_pending().await;
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.board.todos()[0].text, "Buy milk");
        assert_eq!(app.board.todos()[0].priority, Priority::High);

        app.handle_key(key(KeyCode::Char(' ')));
        app.run_pending().await;
        assert!(app.board.todos()[0].completed);

        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.input_mode, InputMode::Editing);
        for _ in 0.."milk".len() {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_text(&mut app, "oat milk");
        app.handle_key(key(KeyCode::Enter));
        app.run_pending().await;
        assert_eq!(app.board.todos()[0].text, "Buy oat milk");
        assert_eq!(app.board.editing(), None);

        app.handle_key(key(KeyCode::Char('d')));
        app.run_pending().await;
        assert!(app.board.todos().is_empty());
        assert_eq!(app.state.selected(), None);
    }

    #[tokio::test]
    async fn test_failed_load_sets_status_and_keeps_list() {
        let store = Arc::new(MemoryTokenStore::with_token("saved"));
        let mut app = app_with(store, vec![todo("a", "one", false)], Route::Board);
        app.run_pending().await;

        app.client.todos.offline.set(true);
        app.handle_key(key(KeyCode::Char('r')));
        app.run_pending().await;

        assert_eq!(app.board.todos().len(), 1);
        assert!(app.status.is_some());
    }

    #[tokio::test]
    async fn test_logout_revokes_board() {
        let store = Arc::new(MemoryTokenStore::with_token("saved"));
        let mut app = app_with(store.clone(), vec![todo("a", "one", false)], Route::Board);
        app.run_pending().await;

        app.handle_key(key(KeyCode::Char('L')));
        assert_eq!(app.route, Route::Login);
        assert!(app.board.todos().is_empty());
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn test_filter_keys_do_not_touch_server() {
        let store = Arc::new(MemoryTokenStore::with_token("saved"));
        let mut app = app_with(
            store,
            vec![todo("a", "one", false), todo("b", "two", true)],
            Route::Board,
        );
        app.run_pending().await;
        let calls = app.client.todos.calls.get();

        app.handle_key(key(KeyCode::Char('3')));
        assert_eq!(app.board.filter(), Filter::Completed);
        assert_eq!(app.selected_id().as_deref(), Some("b"));
        app.handle_key(key(KeyCode::Char('f')));
        assert_eq!(app.board.filter(), Filter::All);
        assert_eq!(app.pending, None);
        assert_eq!(app.client.todos.calls.get(), calls);
        assert_eq!(app.board.todos().len(), 2);
    }
}
