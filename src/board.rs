use crate::api::TodoApi;
use crate::error::RequestError;
use crate::models::{Filter, NewTodo, Priority, Todo};
use crate::parser::{parse_todo_input, ParsedTodo};
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("todo text cannot be empty")]
    EmptyText,
    #[error("invalid due date `{0}` (expected YYYY-MM-DD)")]
    InvalidDueDate(String),
    #[error("no todo is being edited")]
    NotEditing,
    #[error(transparent)]
    Request(#[from] RequestError),
}

#[derive(Debug, Default, PartialEq)]
pub struct ComposeForm {
    pub text: String,
    pub due_date: String,
    pub priority: Priority,
    /// Read `!high`/`due:` markers out of the title. Off unless asked for.
    pub quick_add: bool,
}

impl ComposeForm {
    fn reset(&mut self) {
        self.text.clear();
        self.due_date.clear();
        self.priority = Priority::Medium;
    }

    /// Builds the create request. The title goes out as typed unless
    /// quick-add is on, in which case the markers it used are taken out.
    pub fn to_request(&self) -> Result<NewTodo, BoardError> {
        let parsed = if self.quick_add {
            parse_todo_input(&self.text)
        } else {
            ParsedTodo {
                text: self.text.clone(),
                priority: None,
                due_date: None,
            }
        };
        if parsed.text.trim().is_empty() {
            return Err(BoardError::EmptyText);
        }

        let typed_due = self.due_date.trim();
        let due_date = if typed_due.is_empty() {
            parsed.due_date
        } else {
            Some(
                NaiveDate::parse_from_str(typed_due, "%Y-%m-%d")
                    .map_err(|_| BoardError::InvalidDueDate(typed_due.to_string()))?,
            )
        };

        Ok(NewTodo {
            text: parsed.text,
            due_date: due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            priority: parsed.priority.unwrap_or(self.priority),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub id: String,
    pub text: String,
}

/// Local copy of the user's todos plus the board's form state.
///
/// The collection only ever changes to what the server sent back: a failed
/// call leaves it exactly as it was.
#[derive(Debug, Default)]
pub struct TaskBoard {
    todos: Vec<Todo>,
    pub compose: ComposeForm,
    editing: Option<EditState>,
    filter: Filter,
}

impl TaskBoard {
    pub fn new() -> TaskBoard {
        TaskBoard::default()
    }

    #[cfg(test)]
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn visible(&self) -> Vec<&Todo> {
        self.todos
            .iter()
            .filter(|todo| self.filter.matches(todo))
            .collect()
    }

    pub fn count(&self, filter: Filter) -> usize {
        self.todos.iter().filter(|todo| filter.matches(todo)).count()
    }

    pub fn editing(&self) -> Option<&EditState> {
        self.editing.as_ref()
    }

    pub fn edit_text_mut(&mut self) -> Option<&mut String> {
        self.editing.as_mut().map(|edit| &mut edit.text)
    }

    /// Drops everything, used on logout.
    pub fn clear(&mut self) {
        *self = TaskBoard::default();
    }

    pub async fn load<A: TodoApi>(&mut self, api: &A) -> Result<usize, BoardError> {
        match api.list_todos().await {
            Ok(todos) => {
                self.todos = todos;
                tracing::debug!(count = self.todos.len(), "todos loaded");
                Ok(self.todos.len())
            }
            Err(err) => {
                tracing::error!(error = %err, "error fetching todos");
                Err(err.into())
            }
        }
    }

    pub async fn create<A: TodoApi>(&mut self, api: &A) -> Result<(), BoardError> {
        let request = self.compose.to_request()?;
        match api.create_todo(&request).await {
            Ok(todo) => {
                tracing::debug!(id = %todo.id, "todo created");
                self.todos.push(todo);
                self.compose.reset();
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "error adding todo");
                Err(err.into())
            }
        }
    }

    pub async fn toggle<A: TodoApi>(&mut self, api: &A, id: &str) -> Result<(), BoardError> {
        match api.toggle_todo(id).await {
            Ok(todo) => {
                self.replace(todo);
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, error = %err, "error toggling todo");
                Err(err.into())
            }
        }
    }

    /// Puts the row for `id` into edit mode seeded with its current text.
    pub fn start_edit(&mut self, id: &str) -> bool {
        match self.todos.iter().find(|todo| todo.id == id) {
            Some(todo) => {
                self.editing = Some(EditState {
                    id: todo.id.clone(),
                    text: todo.text.clone(),
                });
                true
            }
            None => false,
        }
    }

    pub async fn save_edit<A: TodoApi>(&mut self, api: &A, id: &str) -> Result<(), BoardError> {
        let text = match &self.editing {
            Some(edit) if edit.id == id => edit.text.clone(),
            _ => return Err(BoardError::NotEditing),
        };
        if text.trim().is_empty() {
            return Err(BoardError::EmptyText);
        }

        match api.update_todo_text(id, &text).await {
            Ok(todo) => {
                self.replace(todo);
                self.editing = None;
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, error = %err, "error updating todo");
                Err(err.into())
            }
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub async fn delete<A: TodoApi>(&mut self, api: &A, id: &str) -> Result<(), BoardError> {
        match api.delete_todo(id).await {
            Ok(()) => {
                self.todos.retain(|todo| todo.id != id);
                if self.editing.as_ref().is_some_and(|edit| edit.id == id) {
                    self.editing = None;
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, error = %err, "error deleting todo");
                Err(err.into())
            }
        }
    }

    fn replace(&mut self, updated: Todo) {
        if let Some(slot) = self.todos.iter_mut().find(|todo| todo.id == updated.id) {
            *slot = updated;
        }
    }
}
